//! Installed-application authorization-code flow
//!
//! A one-shot axum listener on the loopback interface receives the OAuth
//! redirect. The consent URL is handed to a [`ConsentPrompt`]; the code from
//! the redirect is exchanged (with its PKCE verifier) at the token endpoint.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use super::error::CredentialError;
use super::oauth::OAuthClient;
use super::types::{AuthorizedUserCredential, default_token_uri};
use crate::core::constants::{DEFAULT_REDIRECT_HOST, GOOGLE_AUTH_URI};

const SUCCESS_PAGE: &str =
    "<html><body>The authentication flow has completed. You may close this window.</body></html>";

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

/// OAuth client descriptor from `credentials.json`
#[derive(Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(json: &str, path: &Path) -> Result<Self, CredentialError> {
        let invalid = |reason: String| CredentialError::InvalidClientSecrets {
            path: path.to_path_buf(),
            reason,
        };
        let file: ClientSecretsFile = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
        file.installed
            .or(file.web)
            .ok_or_else(|| invalid("expected an 'installed' or 'web' client".to_string()))
    }

    /// Read the secrets file. A missing file means no flow can run.
    pub async fn load(path: &Path) -> Result<Self, CredentialError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CredentialError::authentication(format!(
                    "Client secrets file not found: {}",
                    path.display()
                ))
            } else {
                CredentialError::io(path, e)
            }
        })?;
        Self::from_json(&json, path)
    }
}

/// Presents the consent URL to the user
pub trait ConsentPrompt: Send + Sync {
    fn present(&self, auth_url: &str);
}

/// Prints the consent URL to stdout
pub struct TerminalPrompt;

impl ConsentPrompt for TerminalPrompt {
    fn present(&self, auth_url: &str) {
        println!("Please visit this URL to authorize this application:\n\n    {}\n", auth_url);
    }
}

pub struct InstalledAppFlow {
    secrets: ClientSecrets,
    scopes: Vec<String>,
    redirect_host: String,
    redirect_port: u16,
    prompt: Arc<dyn ConsentPrompt>,
    oauth: OAuthClient,
}

impl InstalledAppFlow {
    pub fn new(
        secrets: ClientSecrets,
        scopes: Vec<String>,
        prompt: Arc<dyn ConsentPrompt>,
        oauth: OAuthClient,
    ) -> Self {
        Self {
            secrets,
            scopes,
            redirect_host: DEFAULT_REDIRECT_HOST.to_string(),
            redirect_port: 0,
            prompt,
            oauth,
        }
    }

    pub fn with_redirect(mut self, host: impl Into<String>, port: u16) -> Self {
        self.redirect_host = host.into();
        self.redirect_port = port;
        self
    }

    /// Run the flow to completion (blocks until the redirect arrives)
    pub async fn run(&self) -> Result<AuthorizedUserCredential, CredentialError> {
        let listener = TcpListener::bind(("127.0.0.1", self.redirect_port))
            .await
            .map_err(|e| {
                CredentialError::authentication(format!("Failed to bind redirect listener: {}", e))
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| CredentialError::authentication(format!("Redirect listener: {}", e)))?
            .port();
        let redirect_uri = format!("http://{}:{}/", self.redirect_host, port);

        let state = random_string(32);
        let verifier = random_string(64);
        let auth_url = self.authorization_url(&redirect_uri, &state, &code_challenge(&verifier))?;

        let (params_tx, mut params_rx) = mpsc::channel::<HashMap<String, String>>(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = Router::new().route("/", get(redirect_handler)).with_state(params_tx);
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tracing::info!(port, "Waiting for OAuth redirect");
        self.prompt.present(&auth_url);

        let params = params_rx.recv().await;
        let _ = shutdown_tx.send(());
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Redirect listener failed"),
            Err(e) => tracing::warn!(error = %e, "Redirect listener task failed"),
        }

        let params = params
            .ok_or_else(|| CredentialError::authentication("Redirect listener closed early"))?;
        let code = authorization_code(&params, &state)?;

        let response = self
            .oauth
            .exchange_code(&self.secrets, code, &redirect_uri, &verifier)
            .await?;

        let scopes = response.granted_scopes().unwrap_or_else(|| self.scopes.clone());
        tracing::info!("Authorization code exchanged");
        Ok(AuthorizedUserCredential {
            expiry: response
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
            token: Some(response.access_token),
            refresh_token: response.refresh_token,
            token_uri: self.secrets.token_uri.clone(),
            client_id: self.secrets.client_id.clone(),
            client_secret: self.secrets.client_secret.clone(),
            scopes,
        })
    }

    fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        challenge: &str,
    ) -> Result<String, CredentialError> {
        let scope = self.scopes.join(" ");
        let url = reqwest::Url::parse_with_params(
            &self.secrets.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
                ("code_challenge", challenge),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|e| CredentialError::authentication(format!("Invalid auth_uri: {}", e)))?;
        Ok(url.into())
    }
}

async fn redirect_handler(
    State(tx): State<mpsc::Sender<HashMap<String, String>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    let _ = tx.try_send(params);
    Html(SUCCESS_PAGE)
}

/// Validate the redirect query and pull out the authorization code
fn authorization_code<'a>(
    params: &'a HashMap<String, String>,
    expected_state: &str,
) -> Result<&'a str, CredentialError> {
    if let Some(error) = params.get("error") {
        return Err(CredentialError::authentication(format!(
            "Authorization denied: {}",
            error
        )));
    }
    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(CredentialError::authentication(
            "State mismatch in authorization response",
        ));
    }
    params
        .get("code")
        .map(String::as_str)
        .ok_or_else(|| CredentialError::authentication("Authorization response has no code"))
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// PKCE S256 challenge
fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
