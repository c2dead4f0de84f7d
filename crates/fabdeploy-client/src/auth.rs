//! Bearer credentials per execution identity.
//!
//! Token acquisition itself is delegated to a [`TokenSource`]. The
//! [`CredentialCache`] is primed in its constructor, so a cache that exists
//! is ready to serve, and refreshed by a background task that fetches new
//! tokens outside the lock and swaps them in with a single write.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fabdeploy_core::config::Credentials;
use fabdeploy_core::{ExecutionIdentity, Redacted};

use crate::error::{Error, Result};

/// A bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Token value.
    pub token: Redacted<String>,
    /// Expiry, when known.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates a token without a known expiry.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Redacted::new(token.into()),
            expires_at: None,
        }
    }

    /// `Authorization` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.token.expose())
    }
}

/// Produces tokens for identities.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetches a token for `identity`, or `None` if this source has no
    /// credentials for it.
    async fn fetch(&self, identity: ExecutionIdentity) -> Result<Option<AccessToken>>;
}

/// Tokens acquired out of band and supplied through configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenSource {
    tokens: HashMap<ExecutionIdentity, Redacted<String>>,
}

impl StaticTokenSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token for an identity.
    #[must_use]
    pub fn with_token(mut self, identity: ExecutionIdentity, token: impl Into<String>) -> Self {
        self.tokens.insert(identity, Redacted::new(token.into()));
        self
    }

    /// Builds a source from configured credentials. The profile identity
    /// reuses the service principal token unless a profile token is given.
    #[must_use]
    pub fn from_credentials(credentials: &Credentials) -> Self {
        let mut tokens = HashMap::new();
        if let Some(token) = &credentials.service_principal_token {
            tokens.insert(ExecutionIdentity::ServicePrincipal, token.clone());
        }
        if let Some(token) = &credentials.user_token {
            tokens.insert(ExecutionIdentity::DelegatedUser, token.clone());
        }
        if let Some(token) = credentials
            .profile_token
            .as_ref()
            .or(credentials.service_principal_token.as_ref())
        {
            tokens.insert(ExecutionIdentity::ServicePrincipalProfile, token.clone());
        }
        Self { tokens }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch(&self, identity: ExecutionIdentity) -> Result<Option<AccessToken>> {
        Ok(self.tokens.get(&identity).map(|token| AccessToken {
            token: token.clone(),
            expires_at: None,
        }))
    }
}

/// Runs an external command per identity and reads the token from stdout.
#[derive(Debug, Default, Clone)]
pub struct CommandTokenSource {
    commands: HashMap<ExecutionIdentity, Vec<String>>,
}

impl CommandTokenSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command (program followed by arguments) for an identity.
    #[must_use]
    pub fn with_command(mut self, identity: ExecutionIdentity, argv: Vec<String>) -> Self {
        if !argv.is_empty() {
            self.commands.insert(identity, argv);
        }
        self
    }

    /// Builds a source from configured credentials. The profile identity
    /// runs the service principal command.
    #[must_use]
    pub fn from_credentials(credentials: &Credentials) -> Self {
        let mut source = Self::new();
        if let Some(argv) = &credentials.service_principal_token_command {
            source = source
                .with_command(ExecutionIdentity::ServicePrincipal, argv.clone())
                .with_command(ExecutionIdentity::ServicePrincipalProfile, argv.clone());
        }
        if let Some(argv) = &credentials.user_token_command {
            source = source.with_command(ExecutionIdentity::DelegatedUser, argv.clone());
        }
        source
    }
}

#[async_trait]
impl TokenSource for CommandTokenSource {
    async fn fetch(&self, identity: ExecutionIdentity) -> Result<Option<AccessToken>> {
        let Some((program, args)) = self.commands.get(&identity).and_then(|argv| argv.split_first())
        else {
            return Ok(None);
        };

        let operation = format!("token command for {identity}");
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Transport {
                operation: operation.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::Transport {
                operation,
                message: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(Error::malformed(operation, "command printed no token"));
        }
        Ok(Some(AccessToken::new(token)))
    }
}

/// Tries each source in order; the first one with credentials wins.
#[derive(Clone, Default)]
pub struct LayeredTokenSource {
    sources: Vec<Arc<dyn TokenSource>>,
}

impl LayeredTokenSource {
    /// Creates a layered source.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    /// Static tokens first, then commands.
    #[must_use]
    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(vec![
            Arc::new(StaticTokenSource::from_credentials(credentials)),
            Arc::new(CommandTokenSource::from_credentials(credentials)),
        ])
    }
}

#[async_trait]
impl TokenSource for LayeredTokenSource {
    async fn fetch(&self, identity: ExecutionIdentity) -> Result<Option<AccessToken>> {
        for source in &self.sources {
            if let Some(token) = source.fetch(identity).await? {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }
}

/// Current token per identity.
pub struct CredentialCache {
    source: Arc<dyn TokenSource>,
    tokens: RwLock<HashMap<ExecutionIdentity, Arc<AccessToken>>>,
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let identities: Vec<ExecutionIdentity> = self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        f.debug_struct("CredentialCache")
            .field("identities", &identities)
            .finish_non_exhaustive()
    }
}

impl CredentialCache {
    /// Fetches a token for every identity the source knows.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails. Identities the source has no
    /// credentials for are left unprimed and fail later with
    /// [`Error::IdentityUnavailable`].
    pub async fn prime(source: Arc<dyn TokenSource>) -> Result<Arc<Self>> {
        let tokens = fetch_all(source.as_ref()).await?;
        tracing::debug!(identities = tokens.len(), "primed credential cache");
        Ok(Arc::new(Self {
            source,
            tokens: RwLock::new(tokens),
        }))
    }

    /// Returns the current token for an identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentityUnavailable`] if the identity was never primed.
    pub fn bearer(&self, identity: ExecutionIdentity) -> Result<Arc<AccessToken>> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&identity)
            .cloned()
            .ok_or(Error::IdentityUnavailable { identity })
    }

    /// Returns true if the identity has a token.
    #[must_use]
    pub fn has(&self, identity: ExecutionIdentity) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&identity)
    }

    /// Fetches fresh tokens and swaps them in.
    ///
    /// Identities the source no longer answers for keep their previous token.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails; the cache is left unchanged.
    pub async fn refresh(&self) -> Result<()> {
        let fresh = fetch_all(self.source.as_ref()).await?;
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.extend(fresh);
        Ok(())
    }

    /// Spawns the periodic refresh task. It stops when `cancel` fires.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(interval) => {}
                }
                match cache.refresh().await {
                    Ok(()) => tracing::debug!("refreshed credentials"),
                    Err(error) => tracing::warn!(%error, "credential refresh failed"),
                }
            }
        })
    }
}

async fn fetch_all(
    source: &dyn TokenSource,
) -> Result<HashMap<ExecutionIdentity, Arc<AccessToken>>> {
    let mut tokens = HashMap::new();
    for identity in ExecutionIdentity::ALL {
        if let Some(token) = source.fetch(identity).await? {
            tokens.insert(identity, Arc::new(token));
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch(&self, identity: ExecutionIdentity) -> Result<Option<AccessToken>> {
            if identity != ExecutionIdentity::ServicePrincipal {
                return Ok(None);
            }
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(AccessToken::new(format!("token-{n}"))))
        }
    }

    #[tokio::test]
    async fn unprimed_identity_is_unavailable() {
        let source = StaticTokenSource::new().with_token(ExecutionIdentity::ServicePrincipal, "spn");
        let cache = CredentialCache::prime(Arc::new(source)).await.unwrap();

        assert_eq!(
            cache.bearer(ExecutionIdentity::ServicePrincipal).unwrap().token.expose(),
            "spn"
        );
        assert!(matches!(
            cache.bearer(ExecutionIdentity::DelegatedUser),
            Err(Error::IdentityUnavailable {
                identity: ExecutionIdentity::DelegatedUser
            })
        ));
    }

    #[tokio::test]
    async fn profile_defaults_to_service_principal_token() {
        let credentials = Credentials {
            service_principal_token: Some(Redacted::new("spn".into())),
            ..Credentials::default()
        };
        let source = StaticTokenSource::from_credentials(&credentials);
        let token = source
            .fetch(ExecutionIdentity::ServicePrincipalProfile)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(token.token.expose(), "spn");
    }

    #[tokio::test]
    async fn refresh_swaps_tokens_and_keeps_old_arcs_valid() {
        let cache = CredentialCache::prime(Arc::new(CountingSource {
            calls: AtomicU32::new(0),
        }))
        .await
        .unwrap();

        let before = cache.bearer(ExecutionIdentity::ServicePrincipal).unwrap();
        cache.refresh().await.unwrap();
        let after = cache.bearer(ExecutionIdentity::ServicePrincipal).unwrap();

        assert_eq!(before.token.expose(), "token-0");
        assert_eq!(after.token.expose(), "token-1");
    }

    #[tokio::test(start_paused = true)]
    async fn background_refresh_runs_until_cancelled() {
        let cache = CredentialCache::prime(Arc::new(CountingSource {
            calls: AtomicU32::new(0),
        }))
        .await
        .unwrap();
        let cancel = CancellationToken::new();
        let handle = cache.spawn_refresh(Duration::from_secs(60), cancel.clone());

        tokio::time::sleep(Duration::from_secs(130)).await;
        let token = cache.bearer(ExecutionIdentity::ServicePrincipal).unwrap();
        assert_eq!(token.token.expose(), "token-2");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn layered_source_prefers_first_match() {
        let first = StaticTokenSource::new().with_token(ExecutionIdentity::DelegatedUser, "static");
        let second = StaticTokenSource::new()
            .with_token(ExecutionIdentity::DelegatedUser, "shadowed")
            .with_token(ExecutionIdentity::ServicePrincipal, "fallback");
        let layered = LayeredTokenSource::new(vec![Arc::new(first), Arc::new(second)]);

        let user = layered.fetch(ExecutionIdentity::DelegatedUser).await.unwrap().unwrap();
        let spn = layered.fetch(ExecutionIdentity::ServicePrincipal).await.unwrap().unwrap();
        assert_eq!(user.token.expose(), "static");
        assert_eq!(spn.token.expose(), "fallback");
    }

    #[test]
    fn header_value_is_bearer() {
        assert_eq!(AccessToken::new("abc").header_value(), "Bearer abc");
        assert_eq!(format!("{:?}", AccessToken::new("abc").token), "[REDACTED]");
    }
}
