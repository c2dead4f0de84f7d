//! Application context built once per invocation.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fabdeploy_client::ResourceClient;
use fabdeploy_client::auth::{CredentialCache, LayeredTokenSource, TokenSource};
use fabdeploy_client::jobs::JobPoller;
use fabdeploy_client::rest::RestControlPlane;
use fabdeploy_core::Settings;
use fabdeploy_flow::Orchestrator;
use fabdeploy_flow::embed::{BrowserViewer, NoViewer, Viewer};

use crate::Config;

/// Loads settings and applies the global flags.
///
/// # Errors
///
/// Returns an error if a settings layer cannot be read.
pub fn load_settings(config: &Config) -> Result<Settings> {
    let mut settings = Settings::load(config.config_file.as_deref(), config.secrets_dir.as_deref())
        .context("Failed to load settings")?;
    if config.non_interactive {
        settings.interaction.non_interactive = true;
    }
    Ok(settings)
}

/// Everything a command needs to talk to the control plane.
#[derive(Debug)]
pub struct AppContext {
    settings: Arc<Settings>,
    client: ResourceClient,
    cancel: CancellationToken,
    refresh: JoinHandle<()>,
}

impl AppContext {
    /// Primes credentials, starts the background token refresh and builds
    /// the resource client.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential source fails.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let settings = Arc::new(settings);
        let source: Arc<dyn TokenSource> =
            Arc::new(LayeredTokenSource::from_credentials(&settings.credentials));
        let credentials = CredentialCache::prime(source)
            .await
            .context("Failed to acquire credentials")?;

        let cancel = CancellationToken::new();
        let refresh = credentials.spawn_refresh(
            settings.polling.token_refresh_interval(),
            cancel.child_token(),
        );

        let operations = JobPoller::new(
            settings.polling.provisioning_poll_interval(),
            settings.polling.job_timeout(),
            cancel.clone(),
        );
        let plane = RestControlPlane::new(
            settings.endpoints.clone(),
            credentials,
            settings.principals.profile_id,
            operations,
        );
        let client = ResourceClient::new(Arc::new(plane), Arc::clone(&settings), cancel.clone());

        Ok(Self {
            settings,
            client,
            cancel,
            refresh,
        })
    }

    /// Resolved settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resource client acting as the provisioning identity.
    #[must_use]
    pub fn client(&self) -> &ResourceClient {
        &self.client
    }

    /// Viewer for workspace links and generated pages.
    #[must_use]
    pub fn viewer(&self) -> Arc<dyn Viewer> {
        viewer_for(&self.settings)
    }

    /// Orchestrator over this context's client.
    #[must_use]
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.client.clone()).with_viewer(self.viewer())
    }

    /// Stops the background refresh and waits for it.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(error) = self.refresh.await {
            tracing::debug!(%error, "credential refresh task ended abnormally");
        }
    }
}

fn viewer_for(settings: &Settings) -> Arc<dyn Viewer> {
    if !settings.interaction.viewer_enabled() {
        return Arc::new(NoViewer);
    }
    let viewer = settings
        .interaction
        .browser_command
        .as_deref()
        .and_then(BrowserViewer::from_command_line)
        .unwrap_or_else(BrowserViewer::system_default);
    Arc::new(viewer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_flag_wins_over_settings() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fabdeploy.yaml");
        std::fs::write(&file, "interaction:\n  open_browser: true\n").unwrap();

        let settings = load_settings(&Config {
            config_file: Some(file),
            non_interactive: true,
            ..Config::default()
        })
        .unwrap();

        assert!(settings.interaction.non_interactive);
        assert!(!settings.interaction.viewer_enabled());
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_settings(&Config {
            config_file: Some(dir.path().join("absent.yaml")),
            ..Config::default()
        });
        assert!(result.is_err());
    }
}
