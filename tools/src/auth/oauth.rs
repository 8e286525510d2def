//! OAuth 2.0 token endpoint client

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use super::error::CredentialError;
#[cfg(feature = "installed-app")]
use super::flow::ClientSecrets;
use super::types::AuthorizedUserCredential;
use crate::core::constants::TOKEN_HTTP_TIMEOUT_SECS;

/// Successful token endpoint response
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Space-delimited granted scopes
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    pub fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new() -> Result<Self, CredentialError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(TOKEN_HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http })
    }

    /// Refresh `credential` in place. Exactly one request is made.
    pub async fn refresh(&self, credential: &mut AuthorizedUserCredential) -> Result<(), CredentialError> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| CredentialError::authentication("Credential has no refresh token"))?;

        let response = self
            .post_token(
                &credential.token_uri,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                    ("client_id", credential.client_id.as_str()),
                    ("client_secret", credential.client_secret.as_str()),
                ],
            )
            .await?;

        if let Some(scopes) = response.granted_scopes() {
            credential.scopes = scopes;
        }
        credential.expiry = response
            .expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));
        credential.token = Some(response.access_token);
        // Google only returns a refresh token when it rotates it
        if let Some(rotated) = response.refresh_token {
            credential.refresh_token = Some(rotated);
        }

        tracing::info!(expiry = ?credential.expiry, "Refreshed access token");
        Ok(())
    }

    /// Exchange an authorization code (PKCE) for tokens
    #[cfg(feature = "installed-app")]
    pub(crate) async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, CredentialError> {
        self.post_token(
            &secrets.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("code_verifier", code_verifier),
            ],
        )
        .await
    }

    async fn post_token(
        &self,
        token_uri: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, CredentialError> {
        let response = self.http.post(token_uri).form(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(ErrorResponse {
                    error,
                    error_description: Some(description),
                }) => format!("{}: {}", error, description),
                Ok(ErrorResponse { error, .. }) => error,
                Err(_) => format!("token endpoint returned {}", status),
            };
            tracing::warn!(status = %status, reason = %reason, "Token request rejected");
            return Err(CredentialError::Authentication { reason });
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}
