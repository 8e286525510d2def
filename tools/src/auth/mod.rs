//! Credential resolution for Google APIs
//!
//! Two paths produce a [`Credential`]:
//! - domain-wide: a service-account key, optionally delegated to a user
//! - end user: the cached token file, refreshed or re-authorized as needed,
//!   then written back to disk
//!
//! Optional backends sit behind cargo features. [`CredentialResolver::new`]
//! checks for them up front so a missing one fails before any I/O.

mod error;
#[cfg(feature = "installed-app")]
mod flow;
mod oauth;
mod resource;
#[cfg(feature = "service-account")]
mod service_account;
mod token_store;
mod types;

pub use error::CredentialError;
#[cfg(feature = "installed-app")]
pub use flow::{ClientSecrets, ConsentPrompt, InstalledAppFlow, TerminalPrompt};
pub use oauth::OAuthClient;
pub use resource::{ResourceService, build_resource_service};
#[cfg(feature = "service-account")]
pub use service_account::ServiceAccountCredential;
pub use types::{AuthorizedUserCredential, Credential};

use std::path::PathBuf;
#[cfg(feature = "installed-app")]
use std::sync::Arc;

use chrono::Utc;
use tracing::Instrument;

use crate::core::constants::{
    DEFAULT_CLIENT_SECRETS_FILE, DEFAULT_REDIRECT_HOST, DEFAULT_SCOPES, DEFAULT_SERVICE_ACCOUNT_FILE,
    DEFAULT_SERVICE_SCOPES, DEFAULT_TOKEN_FILE,
};

/// Inputs for credential resolution
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialConfig {
    pub token_file: PathBuf,
    pub client_secrets_file: PathBuf,
    pub service_account_file: PathBuf,
    /// `None` selects the default scope set for the chosen path
    pub scopes: Option<Vec<String>>,
    pub use_domain_wide: bool,
    pub delegated_user: Option<String>,
    pub redirect_host: String,
    /// 0 picks an ephemeral port
    pub redirect_port: u16,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            client_secrets_file: PathBuf::from(DEFAULT_CLIENT_SECRETS_FILE),
            service_account_file: PathBuf::from(DEFAULT_SERVICE_ACCOUNT_FILE),
            scopes: None,
            use_domain_wide: false,
            delegated_user: None,
            redirect_host: DEFAULT_REDIRECT_HOST.to_string(),
            redirect_port: 0,
        }
    }
}

impl CredentialConfig {
    pub fn user_scopes(&self) -> Vec<String> {
        self.scopes
            .clone()
            .unwrap_or_else(|| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect())
    }

    pub fn service_scopes(&self) -> Vec<String> {
        self.scopes
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVICE_SCOPES.iter().map(|s| s.to_string()).collect())
    }
}

pub struct CredentialResolver {
    config: CredentialConfig,
    oauth: OAuthClient,
    #[cfg(feature = "installed-app")]
    prompt: Arc<dyn ConsentPrompt>,
    span: tracing::Span,
}

impl CredentialResolver {
    /// Fails with `DependencyMissing` when the backend `config` needs was
    /// compiled out.
    pub fn new(config: CredentialConfig) -> Result<Self, CredentialError> {
        check_capabilities(&config)?;
        let span = tracing::info_span!(
            "credentials",
            domain_wide = config.use_domain_wide,
            token_file = %config.token_file.display()
        );
        Ok(Self {
            config,
            oauth: OAuthClient::new()?,
            #[cfg(feature = "installed-app")]
            prompt: Arc::new(TerminalPrompt),
            span,
        })
    }

    /// Replace how the consent URL is shown to the user
    #[cfg(feature = "installed-app")]
    pub fn with_prompt(mut self, prompt: Arc<dyn ConsentPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn config(&self) -> &CredentialConfig {
        &self.config
    }

    pub async fn resolve(&self) -> Result<Credential, CredentialError> {
        let span = self.span.clone();
        async {
            if self.config.use_domain_wide {
                return self.service_account().await;
            }
            self.authorized_user().await.map(Credential::User)
        }
        .instrument(span)
        .await
    }

    #[cfg(feature = "service-account")]
    async fn service_account(&self) -> Result<Credential, CredentialError> {
        let credential = ServiceAccountCredential::from_file(
            &self.config.service_account_file,
            self.config.service_scopes(),
            self.config.delegated_user.clone(),
        )
        .await?;
        tracing::info!(delegated_user = ?credential.subject(), "Using service account");
        Ok(Credential::ServiceAccount(credential))
    }

    #[cfg(not(feature = "service-account"))]
    async fn service_account(&self) -> Result<Credential, CredentialError> {
        Err(CredentialError::dependency_missing("gcp_auth", "service-account"))
    }

    async fn authorized_user(&self) -> Result<AuthorizedUserCredential, CredentialError> {
        let scopes = self.config.user_scopes();
        let cached = token_store::load(&self.config.token_file, &scopes).await?;

        let credential = match cached {
            Some(credential) if credential.is_valid(Utc::now()) => {
                tracing::debug!("Cached token is valid");
                return Ok(credential);
            }
            Some(mut credential) if credential.can_refresh() => {
                tracing::info!("Cached token expired, refreshing");
                self.oauth.refresh(&mut credential).await?;
                credential
            }
            _ => {
                tracing::info!("No usable cached token, starting authorization flow");
                self.interactive(scopes).await?
            }
        };

        token_store::save(&self.config.token_file, &credential).await?;
        Ok(credential)
    }

    #[cfg(feature = "installed-app")]
    async fn interactive(&self, scopes: Vec<String>) -> Result<AuthorizedUserCredential, CredentialError> {
        let secrets = ClientSecrets::load(&self.config.client_secrets_file).await?;
        InstalledAppFlow::new(secrets, scopes, self.prompt.clone(), self.oauth.clone())
            .with_redirect(self.config.redirect_host.clone(), self.config.redirect_port)
            .run()
            .await
    }

    #[cfg(not(feature = "installed-app"))]
    async fn interactive(&self, _scopes: Vec<String>) -> Result<AuthorizedUserCredential, CredentialError> {
        Err(CredentialError::dependency_missing("axum", "installed-app"))
    }
}

fn check_capabilities(config: &CredentialConfig) -> Result<(), CredentialError> {
    if config.use_domain_wide {
        if !cfg!(feature = "service-account") {
            return Err(CredentialError::dependency_missing("gcp_auth", "service-account"));
        }
    } else if !cfg!(feature = "installed-app") {
        return Err(CredentialError::dependency_missing("axum", "installed-app"));
    }
    Ok(())
}

/// Resolve a credential for `config` with the default consent prompt
pub async fn resolve_credentials(config: &CredentialConfig) -> Result<Credential, CredentialError> {
    CredentialResolver::new(config.clone())?.resolve().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use httpmock::prelude::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_token(path: &std::path::Path, token_uri: &str, expiry: chrono::DateTime<Utc>) {
        let body = json!({
            "token": "cached-access",
            "refresh_token": "cached-refresh",
            "token_uri": token_uri,
            "client_id": "client-id",
            "client_secret": "client-secret",
            "scopes": ["https://www.googleapis.com/auth/calendar"],
            "expiry": expiry.to_rfc3339()
        });
        std::fs::write(path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
    }

    fn config(dir: &TempDir) -> CredentialConfig {
        CredentialConfig {
            token_file: dir.path().join("token.json"),
            client_secrets_file: dir.path().join("credentials.json"),
            service_account_file: dir.path().join("service_account.json"),
            redirect_host: "127.0.0.1".to_string(),
            ..Default::default()
        }
    }

    async fn token_mock(server: &MockServer) -> httpmock::Mock<'_> {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200).json_body(json!({
                    "access_token": "new-access",
                    "expires_in": 3600
                }));
            })
            .await
    }

    #[tokio::test]
    async fn test_valid_cached_token_makes_no_calls() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let mock = token_mock(&server).await;
        let config = config(&dir);
        write_token(&config.token_file, &server.url("/token"), Utc::now() + Duration::hours(1));
        let before = std::fs::read(&config.token_file).unwrap();

        let credential = resolve_credentials(&config).await.unwrap();

        mock.assert_hits_async(0).await;
        assert_eq!(std::fs::read(&config.token_file).unwrap(), before);
        assert_eq!(credential.kind(), "authorized_user");
        assert_eq!(credential.access_token().await.unwrap(), "cached-access");
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_once_and_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let mock = token_mock(&server).await;
        let config = config(&dir);
        write_token(&config.token_file, &server.url("/token"), Utc::now() - Duration::hours(1));
        let before = std::fs::read_to_string(&config.token_file).unwrap();

        let credential = resolve_credentials(&config).await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(credential.access_token().await.unwrap(), "new-access");
        let after = std::fs::read_to_string(&config.token_file).unwrap();
        assert_ne!(after, before);
        let saved: AuthorizedUserCredential = serde_json::from_str(&after).unwrap();
        assert_eq!(saved.token.as_deref(), Some("new-access"));
        assert_eq!(saved.refresh_token.as_deref(), Some("cached-refresh"));
    }

    #[tokio::test]
    async fn test_refresh_only_token_is_refreshed_not_reconsented() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let mock = token_mock(&server).await;
        let config = config(&dir);
        let body = json!({
            "refresh_token": "cached-refresh",
            "token_uri": server.url("/token"),
            "client_id": "client-id",
            "client_secret": "client-secret",
            "scopes": ["https://www.googleapis.com/auth/calendar"]
        });
        std::fs::write(&config.token_file, body.to_string()).unwrap();

        let credential = resolve_credentials(&config).await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(credential.access_token().await.unwrap(), "new-access");
        let saved: AuthorizedUserCredential =
            serde_json::from_str(&std::fs::read_to_string(&config.token_file).unwrap()).unwrap();
        assert_eq!(saved.token.as_deref(), Some("new-access"));
        assert!(saved.expiry.is_some());
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(400).json_body(json!({"error": "invalid_grant"}));
            })
            .await;
        let config = config(&dir);
        write_token(&config.token_file, &server.url("/token"), Utc::now() - Duration::hours(1));
        let before = std::fs::read(&config.token_file).unwrap();

        let err = resolve_credentials(&config).await.unwrap_err();

        assert!(matches!(err, CredentialError::Authentication { ref reason } if reason == "invalid_grant"));
        assert_eq!(std::fs::read(&config.token_file).unwrap(), before);
    }

    #[tokio::test]
    async fn test_configured_scopes_replace_stored() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let mut config = config(&dir);
        config.scopes = Some(vec!["scope-x".to_string()]);
        write_token(&config.token_file, &server.url("/token"), Utc::now() + Duration::hours(1));

        let credential = resolve_credentials(&config).await.unwrap();
        assert_eq!(credential.scopes(), ["scope-x".to_string()]);
    }

    #[cfg(feature = "installed-app")]
    #[tokio::test]
    async fn test_missing_token_runs_flow_and_persists() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200).json_body(json!({
                    "access_token": "flow-access",
                    "refresh_token": "flow-refresh",
                    "expires_in": 3600
                }));
            })
            .await;
        let config = config(&dir);
        std::fs::write(
            &config.client_secrets_file,
            json!({"installed": {
                "client_id": "client-id",
                "client_secret": "client-secret",
                "auth_uri": "https://accounts.example.com/o/oauth2/auth",
                "token_uri": server.url("/token")
            }})
            .to_string(),
        )
        .unwrap();

        let resolver = CredentialResolver::new(config.clone())
            .unwrap()
            .with_prompt(Arc::new(flow::tests::RedirectingPrompt::approve()));
        let credential = resolver.resolve().await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(credential.access_token().await.unwrap(), "flow-access");
        let saved: AuthorizedUserCredential =
            serde_json::from_str(&std::fs::read_to_string(&config.token_file).unwrap()).unwrap();
        assert_eq!(saved.refresh_token.as_deref(), Some("flow-refresh"));
        assert_eq!(saved.scopes, DEFAULT_SCOPES);
    }

    #[cfg(feature = "installed-app")]
    #[tokio::test]
    async fn test_missing_client_secrets_fails() {
        let dir = TempDir::new().unwrap();
        let err = resolve_credentials(&config(&dir)).await.unwrap_err();
        assert!(matches!(err, CredentialError::Authentication { .. }));
        assert!(!dir.path().join("token.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_token_file_is_not_ignored() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        std::fs::write(&config.token_file, "{").unwrap();
        let err = resolve_credentials(&config).await.unwrap_err();
        assert!(matches!(err, CredentialError::InvalidTokenFile { .. }));
    }

    #[cfg(feature = "service-account")]
    #[tokio::test]
    async fn test_domain_wide_missing_key_is_io() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.use_domain_wide = true;
        config.delegated_user = Some("user@example.com".to_string());

        let err = resolve_credentials(&config).await.unwrap_err();
        assert!(matches!(err, CredentialError::Io { .. }));
        assert!(!config.token_file.exists());
    }

    #[test]
    fn test_default_scopes_per_path() {
        let config = CredentialConfig::default();
        assert_eq!(config.user_scopes(), DEFAULT_SCOPES);
        assert_eq!(config.service_scopes(), DEFAULT_SERVICE_SCOPES);

        let config = CredentialConfig {
            scopes: Some(vec!["s".to_string()]),
            ..Default::default()
        };
        assert_eq!(config.user_scopes(), vec!["s"]);
        assert_eq!(config.service_scopes(), vec!["s"]);
    }

    #[cfg(all(feature = "installed-app", feature = "service-account"))]
    #[test]
    fn test_capabilities_with_default_features() {
        assert!(check_capabilities(&CredentialConfig::default()).is_ok());
        let config = CredentialConfig {
            use_domain_wide: true,
            ..Default::default()
        };
        assert!(check_capabilities(&config).is_ok());
    }
}
