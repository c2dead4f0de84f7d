//! Layered runtime settings.
//!
//! Settings are resolved once at startup, later layers winning:
//!
//! 1. compiled defaults
//! 2. an optional YAML file (`--config` / `FABDEPLOY_CONFIG`)
//! 3. `FABDEPLOY_*` environment variables
//! 4. a directory secret store (`--secrets-dir` / `FABDEPLOY_SECRETS_DIR`)
//!
//! The result is an immutable record handed to the application context; no
//! layer is consulted again after [`Settings::load`] returns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::{CapacityId, PrincipalId, ProfileId};
use crate::identity::AuthenticationMode;
use crate::observability::Redacted;
use crate::secrets::{DirectorySecretStore, keys};

/// Environment variable naming the YAML settings file.
pub const CONFIG_FILE_ENV: &str = "FABDEPLOY_CONFIG";
/// Environment variable naming the secret store directory.
pub const SECRETS_DIR_ENV: &str = "FABDEPLOY_SECRETS_DIR";

/// Fully resolved settings for one process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base URLs of the remote surfaces.
    pub endpoints: Endpoints,
    /// Capacity new workspaces are assigned to.
    pub capacity_id: Option<CapacityId>,
    /// Identity used for provisioning.
    pub auth_mode: AuthenticationMode,
    /// Tenant and application credentials.
    pub credentials: Credentials,
    /// Principals granted roles on created resources.
    pub principals: Principals,
    /// Local template and output folders.
    pub paths: Paths,
    /// Polling intervals and deadlines.
    pub polling: Polling,
    /// Interactive behaviour.
    pub interaction: Interaction,
}

/// Base URLs of the two control-plane surfaces and the storage endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Endpoints {
    /// Workspace and item provisioning API.
    pub fabric_api: String,
    /// Legacy report and dataset API.
    pub powerbi_api: String,
    /// OneLake storage endpoint.
    pub onelake: String,
    /// Web portal root, used to build workspace links.
    pub portal: String,
    /// Embed URL handed to the generated page.
    pub embed_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            fabric_api: "https://api.fabric.microsoft.com/v1".to_string(),
            powerbi_api: "https://api.powerbi.com".to_string(),
            onelake: "https://onelake.dfs.fabric.microsoft.com".to_string(),
            portal: "https://app.powerbi.com".to_string(),
            embed_url: "https://app.powerbi.com/reportEmbed".to_string(),
        }
    }
}

impl Endpoints {
    /// Portal URL of a workspace.
    #[must_use]
    pub fn workspace_url(&self, workspace_id: impl std::fmt::Display) -> String {
        format!("{}/groups/{workspace_id}", self.portal.trim_end_matches('/'))
    }
}

/// Application credentials and token sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Credentials {
    /// Directory tenant of the application.
    pub tenant_id: Option<String>,
    /// Client (application) id.
    pub client_id: Option<String>,
    /// Client secret; used for service-principal backed storage connections.
    pub client_secret: Option<Redacted<String>>,
    /// Pre-acquired token for the service principal.
    pub service_principal_token: Option<Redacted<String>>,
    /// Pre-acquired token for the delegated user.
    pub user_token: Option<Redacted<String>>,
    /// Pre-acquired token for the service principal profile. Defaults to the
    /// service principal token when absent.
    pub profile_token: Option<Redacted<String>>,
    /// Command printing a service principal token on stdout.
    pub service_principal_token_command: Option<Vec<String>>,
    /// Command printing a delegated user token on stdout.
    pub user_token_command: Option<Vec<String>>,
}

impl Credentials {
    /// Returns true when some source can produce a service principal token.
    #[must_use]
    pub fn has_service_principal_source(&self) -> bool {
        self.service_principal_token.is_some() || self.service_principal_token_command.is_some()
    }

    /// Returns true when some source can produce a delegated user token.
    #[must_use]
    pub fn has_user_source(&self) -> bool {
        self.user_token.is_some() || self.user_token_command.is_some()
    }
}

/// Principals referenced by role assignments and embedding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Principals {
    /// Object id of the user to make workspace admin.
    pub admin_user_id: Option<PrincipalId>,
    /// Object id of the service principal.
    pub service_principal_object_id: Option<PrincipalId>,
    /// Service principal profile used for embedding.
    pub profile_id: Option<ProfileId>,
}

/// Local folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Paths {
    /// Item template folders (`<name>.<Type>/` with a `.platform` file).
    pub item_templates: PathBuf,
    /// Single-file templates (notebooks, models, reports).
    pub template_files: PathBuf,
    /// Web page templates.
    pub web_templates: PathBuf,
    /// Output folder for generated pages.
    pub web_pages: PathBuf,
    /// PBIX packages.
    pub pbix: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            item_templates: PathBuf::from("templates/items"),
            template_files: PathBuf::from("templates/files"),
            web_templates: PathBuf::from("templates/web"),
            web_pages: PathBuf::from("web-pages"),
            pbix: PathBuf::from("templates/pbix"),
        }
    }
}

/// Polling intervals and deadlines, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Polling {
    /// Interval between job status polls.
    pub job_poll_interval_secs: u64,
    /// Interval between dataset refresh and import status polls.
    pub refresh_poll_interval_secs: u64,
    /// Delay before the single retry of a failed dataset refresh.
    pub refresh_retry_delay_secs: u64,
    /// Interval between provisioning status polls.
    pub provisioning_poll_interval_secs: u64,
    /// Deadline for any single job.
    pub job_timeout_secs: u64,
    /// Interval of the background token refresh.
    pub token_refresh_interval_secs: u64,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            job_poll_interval_secs: 5,
            refresh_poll_interval_secs: 2,
            refresh_retry_delay_secs: 15,
            provisioning_poll_interval_secs: 5,
            job_timeout_secs: 30 * 60,
            token_refresh_interval_secs: 45 * 60,
        }
    }
}

impl Polling {
    /// Job poll interval.
    #[must_use]
    pub const fn job_poll_interval(&self) -> Duration {
        Duration::from_secs(self.job_poll_interval_secs)
    }

    /// Refresh/import poll interval.
    #[must_use]
    pub const fn refresh_poll_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_poll_interval_secs)
    }

    /// Refresh retry delay.
    #[must_use]
    pub const fn refresh_retry_delay(&self) -> Duration {
        Duration::from_secs(self.refresh_retry_delay_secs)
    }

    /// Provisioning poll interval.
    #[must_use]
    pub const fn provisioning_poll_interval(&self) -> Duration {
        Duration::from_secs(self.provisioning_poll_interval_secs)
    }

    /// Job deadline.
    #[must_use]
    pub const fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Token refresh interval.
    #[must_use]
    pub const fn token_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.token_refresh_interval_secs)
    }
}

/// Interactive behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Interaction {
    /// Batch mode: never open a viewer, never prompt.
    pub non_interactive: bool,
    /// Open generated pages and workspace links in a viewer.
    pub open_browser: bool,
    /// Viewer command; the URL is appended as the last argument.
    pub browser_command: Option<Vec<String>>,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            non_interactive: false,
            open_browser: true,
            browser_command: None,
        }
    }
}

impl Interaction {
    /// Returns true when a viewer may be launched.
    #[must_use]
    pub const fn viewer_enabled(&self) -> bool {
        self.open_browser && !self.non_interactive
    }
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// `file` and `secrets_dir` override `FABDEPLOY_CONFIG` and
    /// `FABDEPLOY_SECRETS_DIR` respectively.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be read or holds an invalid value.
    pub fn load(file: Option<&Path>, secrets_dir: Option<&Path>) -> Result<Self> {
        Self::load_with(file, secrets_dir, &|name| std::env::var(name).ok())
    }

    /// Loads settings with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer cannot be read or holds an invalid value.
    pub fn load_with(
        file: Option<&Path>,
        secrets_dir: Option<&Path>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = file
            .map(Path::to_path_buf)
            .or_else(|| env_string(env, CONFIG_FILE_ENV).map(PathBuf::from));
        let mut settings = match file {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };

        settings.apply_env(env)?;

        let secrets_dir = secrets_dir
            .map(Path::to_path_buf)
            .or_else(|| env_string(env, SECRETS_DIR_ENV).map(PathBuf::from));
        if let Some(dir) = secrets_dir {
            settings.apply_secrets(&DirectorySecretStore::open(dir)?)?;
        }

        settings.normalize();
        Ok(settings)
    }

    /// Parses a YAML settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
        serde_yaml::from_str(&content).map_err(|e| {
            Error::configuration(format!("invalid settings file {}: {e}", path.display()))
        })
    }

    fn apply_env(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = env_string(env, "FABDEPLOY_FABRIC_API_URL") {
            self.endpoints.fabric_api = v;
        }
        if let Some(v) = env_string(env, "FABDEPLOY_POWERBI_API_URL") {
            self.endpoints.powerbi_api = v;
        }
        if let Some(v) = env_string(env, "FABDEPLOY_ONELAKE_URL") {
            self.endpoints.onelake = v;
        }
        if let Some(v) = env_string(env, "FABDEPLOY_CAPACITY_ID") {
            self.capacity_id = Some(parse_env("FABDEPLOY_CAPACITY_ID", &v)?);
        }
        if let Some(v) = env_string(env, "FABDEPLOY_AUTH_MODE") {
            self.auth_mode = v.parse()?;
        }

        if let Some(v) = env_string(env, "FABDEPLOY_TENANT_ID") {
            self.credentials.tenant_id = Some(v);
        }
        if let Some(v) = env_string(env, "FABDEPLOY_CLIENT_ID") {
            self.credentials.client_id = Some(v);
        }
        if let Some(v) = env_string(env, "FABDEPLOY_CLIENT_SECRET") {
            self.credentials.client_secret = Some(Redacted::new(v));
        }
        if let Some(v) = env_string(env, "FABDEPLOY_SERVICE_PRINCIPAL_TOKEN") {
            self.credentials.service_principal_token = Some(Redacted::new(v));
        }
        if let Some(v) = env_string(env, "FABDEPLOY_USER_TOKEN") {
            self.credentials.user_token = Some(Redacted::new(v));
        }
        if let Some(v) = env_string(env, "FABDEPLOY_SERVICE_PRINCIPAL_TOKEN_COMMAND") {
            self.credentials.service_principal_token_command = Some(split_command(&v));
        }
        if let Some(v) = env_string(env, "FABDEPLOY_USER_TOKEN_COMMAND") {
            self.credentials.user_token_command = Some(split_command(&v));
        }

        if let Some(v) = env_string(env, "FABDEPLOY_ADMIN_USER_ID") {
            self.principals.admin_user_id = Some(parse_env("FABDEPLOY_ADMIN_USER_ID", &v)?);
        }
        if let Some(v) = env_string(env, "FABDEPLOY_SERVICE_PRINCIPAL_OBJECT_ID") {
            self.principals.service_principal_object_id =
                Some(parse_env("FABDEPLOY_SERVICE_PRINCIPAL_OBJECT_ID", &v)?);
        }
        if let Some(v) = env_string(env, "FABDEPLOY_PROFILE_ID") {
            self.principals.profile_id = Some(parse_env("FABDEPLOY_PROFILE_ID", &v)?);
        }

        if let Some(v) = env_string(env, "FABDEPLOY_ITEM_TEMPLATES_DIR") {
            self.paths.item_templates = PathBuf::from(v);
        }
        if let Some(v) = env_string(env, "FABDEPLOY_TEMPLATE_FILES_DIR") {
            self.paths.template_files = PathBuf::from(v);
        }
        if let Some(v) = env_string(env, "FABDEPLOY_WEB_TEMPLATES_DIR") {
            self.paths.web_templates = PathBuf::from(v);
        }
        if let Some(v) = env_string(env, "FABDEPLOY_WEB_PAGES_DIR") {
            self.paths.web_pages = PathBuf::from(v);
        }
        if let Some(v) = env_string(env, "FABDEPLOY_PBIX_DIR") {
            self.paths.pbix = PathBuf::from(v);
        }

        if let Some(v) = env_u64(env, "FABDEPLOY_JOB_POLL_INTERVAL_SECS")? {
            self.polling.job_poll_interval_secs = v;
        }
        if let Some(v) = env_u64(env, "FABDEPLOY_REFRESH_POLL_INTERVAL_SECS")? {
            self.polling.refresh_poll_interval_secs = v;
        }
        if let Some(v) = env_u64(env, "FABDEPLOY_REFRESH_RETRY_DELAY_SECS")? {
            self.polling.refresh_retry_delay_secs = v;
        }
        if let Some(v) = env_u64(env, "FABDEPLOY_PROVISIONING_POLL_INTERVAL_SECS")? {
            self.polling.provisioning_poll_interval_secs = v;
        }
        if let Some(v) = env_u64(env, "FABDEPLOY_JOB_TIMEOUT_SECS")? {
            self.polling.job_timeout_secs = v;
        }
        if let Some(v) = env_u64(env, "FABDEPLOY_TOKEN_REFRESH_INTERVAL_SECS")? {
            self.polling.token_refresh_interval_secs = v;
        }

        if let Some(v) = env_bool(env, "FABDEPLOY_NON_INTERACTIVE")? {
            self.interaction.non_interactive = v;
        }
        if let Some(v) = env_bool(env, "FABDEPLOY_OPEN_BROWSER")? {
            self.interaction.open_browser = v;
        }
        if let Some(v) = env_string(env, "FABDEPLOY_BROWSER_COMMAND") {
            self.interaction.browser_command = Some(split_command(&v));
        }

        Ok(())
    }

    fn apply_secrets(&mut self, store: &DirectorySecretStore) -> Result<()> {
        if let Some(secret) = store.get(keys::CLIENT_SECRET)? {
            self.credentials.client_secret = Some(secret);
        }
        if let Some(secret) = store.get(keys::SERVICE_PRINCIPAL_TOKEN)? {
            self.credentials.service_principal_token = Some(secret);
        }
        if let Some(secret) = store.get(keys::USER_TOKEN)? {
            self.credentials.user_token = Some(secret);
        }
        if let Some(secret) = store.get(keys::PROFILE_TOKEN)? {
            self.credentials.profile_token = Some(secret);
        }
        Ok(())
    }

    /// Nil identifiers stand for "not configured".
    fn normalize(&mut self) {
        self.capacity_id = self.capacity_id.filter(|id| !id.is_nil());
        self.principals.admin_user_id = self.principals.admin_user_id.filter(|id| !id.is_nil());
        self.principals.service_principal_object_id = self
            .principals
            .service_principal_object_id
            .filter(|id| !id.is_nil());
        self.principals.profile_id = self.principals.profile_id.filter(|id| !id.is_nil());
    }

    /// Validates everything a deployment needs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.validate_credentials()?;
        self.require_capacity()?;
        Ok(())
    }

    /// Validates the settings needed for read-only listing commands.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid setting.
    pub fn validate_credentials(&self) -> Result<()> {
        for (name, secs) in [
            ("job_poll_interval_secs", self.polling.job_poll_interval_secs),
            ("refresh_poll_interval_secs", self.polling.refresh_poll_interval_secs),
            (
                "provisioning_poll_interval_secs",
                self.polling.provisioning_poll_interval_secs,
            ),
            ("job_timeout_secs", self.polling.job_timeout_secs),
            ("token_refresh_interval_secs", self.polling.token_refresh_interval_secs),
        ] {
            if secs == 0 {
                return Err(Error::configuration(format!("{name} must be greater than zero")));
            }
        }

        match self.auth_mode {
            AuthenticationMode::ServicePrincipal if !self.credentials.has_service_principal_source() => {
                Err(Error::configuration(
                    "service principal authentication requires FABDEPLOY_SERVICE_PRINCIPAL_TOKEN, \
                     a service-principal-token secret or FABDEPLOY_SERVICE_PRINCIPAL_TOKEN_COMMAND",
                ))
            }
            AuthenticationMode::User if !self.credentials.has_user_source() => Err(Error::configuration(
                "user authentication requires FABDEPLOY_USER_TOKEN, a user-token secret \
                 or FABDEPLOY_USER_TOKEN_COMMAND",
            )),
            _ => Ok(()),
        }
    }

    /// Returns the configured capacity.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no capacity is configured.
    pub fn require_capacity(&self) -> Result<CapacityId> {
        self.capacity_id
            .ok_or_else(|| Error::configuration("FABDEPLOY_CAPACITY_ID is required"))
    }
}

fn env_string(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name).and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u64(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(env, name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::configuration(format!("{name} must be a u64: {e}")))
}

fn env_bool(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(env, name) else {
        return Ok(None);
    };
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(Error::configuration(format!("{name} must be a boolean"))),
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    value
        .parse()
        .map_err(|e| Error::configuration(format!("{name}: {e}")))
}

fn split_command(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CAPACITY: &str = "9b0a7c1e-5d2f-4e8a-b3c6-1f0e2d3c4b5a";

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::load_with(None, None, &env_from(&[])).unwrap();
        assert_eq!(settings.endpoints.fabric_api, "https://api.fabric.microsoft.com/v1");
        assert_eq!(settings.polling.job_poll_interval(), Duration::from_secs(5));
        assert_eq!(settings.polling.job_timeout(), Duration::from_secs(1800));
        assert_eq!(settings.paths.web_pages, PathBuf::from("web-pages"));
        assert!(settings.capacity_id.is_none());
        assert!(settings.interaction.viewer_enabled());
    }

    #[test]
    fn env_overrides_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fabdeploy.yaml");
        std::fs::write(
            &file,
            "auth_mode: user\npolling:\n  job_timeout_secs: 60\n",
        )
        .unwrap();

        let settings = Settings::load_with(
            Some(&file),
            None,
            &env_from(&[
                ("FABDEPLOY_JOB_TIMEOUT_SECS", "120"),
                ("FABDEPLOY_CAPACITY_ID", CAPACITY),
            ]),
        )
        .unwrap();

        assert_eq!(settings.auth_mode, AuthenticationMode::User);
        assert_eq!(settings.polling.job_timeout_secs, 120);
        assert_eq!(settings.capacity_id.unwrap().to_string(), CAPACITY);
    }

    #[test]
    fn secrets_override_env() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("service-principal-token"), "from-store\n").unwrap();

        let settings = Settings::load_with(
            None,
            Some(dir.path()),
            &env_from(&[("FABDEPLOY_SERVICE_PRINCIPAL_TOKEN", "from-env")]),
        )
        .unwrap();

        assert_eq!(
            settings.credentials.service_principal_token.unwrap().expose(),
            "from-store"
        );
    }

    #[test]
    fn nil_principals_mean_not_configured() {
        let settings = Settings::load_with(
            None,
            None,
            &env_from(&[
                ("FABDEPLOY_ADMIN_USER_ID", "00000000-0000-0000-0000-000000000000"),
                ("FABDEPLOY_CAPACITY_ID", "00000000-0000-0000-0000-000000000000"),
            ]),
        )
        .unwrap();
        assert!(settings.principals.admin_user_id.is_none());
        assert!(settings.capacity_id.is_none());
    }

    #[test]
    fn malformed_uuid_is_configuration_error() {
        let err = Settings::load_with(
            None,
            None,
            &env_from(&[("FABDEPLOY_PROFILE_ID", "not-a-guid")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("FABDEPLOY_PROFILE_ID"));
    }

    #[test]
    fn validate_requires_capacity_and_credentials() {
        let mut settings = Settings::default();
        assert!(settings.validate_credentials().is_err());

        settings.credentials.service_principal_token = Some(Redacted::new("t".into()));
        assert!(settings.validate_credentials().is_ok());
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("FABDEPLOY_CAPACITY_ID"));

        settings.capacity_id = Some(CAPACITY.parse().unwrap());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut settings = Settings::default();
        settings.credentials.service_principal_token = Some(Redacted::new("t".into()));
        settings.polling.job_poll_interval_secs = 0;
        let err = settings.validate_credentials().unwrap_err();
        assert!(err.to_string().contains("job_poll_interval_secs"));
    }

    #[test]
    fn user_mode_needs_user_token() {
        let settings = Settings {
            auth_mode: AuthenticationMode::User,
            ..Settings::default()
        };
        assert!(settings.validate_credentials().is_err());
    }

    #[test]
    fn non_interactive_disables_viewer() {
        let settings = Settings::load_with(
            None,
            None,
            &env_from(&[("FABDEPLOY_NON_INTERACTIVE", "true")]),
        )
        .unwrap();
        assert!(!settings.interaction.viewer_enabled());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut settings = Settings::default();
        settings.credentials.client_secret = Some(Redacted::new("hunter2".into()));
        let debug = format!("{settings:?}");
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn workspace_url_uses_portal() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.workspace_url("abc"),
            "https://app.powerbi.com/groups/abc"
        );
    }
}
