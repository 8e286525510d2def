//! Service-account credentials (optionally with domain-wide delegation)

use std::path::Path;
use std::sync::Arc;

use gcp_auth::{CustomServiceAccount, TokenProvider};

use super::error::CredentialError;

/// Service-account key plus the scopes to request. Tokens are minted (and
/// cached) by `gcp_auth` on demand; nothing is persisted locally.
#[derive(Clone)]
pub struct ServiceAccountCredential {
    account: Arc<CustomServiceAccount>,
    scopes: Vec<String>,
    subject: Option<String>,
}

impl std::fmt::Debug for ServiceAccountCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredential")
            .field("account", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("subject", &self.subject)
            .finish()
    }
}

impl ServiceAccountCredential {
    /// Read a service-account key; `subject` impersonates that user.
    pub async fn from_file(
        path: &Path,
        scopes: Vec<String>,
        subject: Option<String>,
    ) -> Result<Self, CredentialError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CredentialError::io(path, e))?;
        Self::from_json(&json, path, scopes, subject)
    }

    fn from_json(
        json: &str,
        path: &Path,
        scopes: Vec<String>,
        subject: Option<String>,
    ) -> Result<Self, CredentialError> {
        let mut account = CustomServiceAccount::from_json(json).map_err(|e| {
            CredentialError::authentication(format!(
                "Invalid service account file {}: {}",
                path.display(),
                e
            ))
        })?;
        if let Some(user) = &subject {
            account = account.with_subject(user.clone());
        }
        tracing::debug!(
            path = %path.display(),
            delegated = subject.is_some(),
            "Loaded service account"
        );
        Ok(Self {
            account: Arc::new(account),
            scopes,
            subject,
        })
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Delegated user, if any
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub async fn access_token(&self) -> Result<String, CredentialError> {
        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        let token = self.account.token(&scopes).await.map_err(|e| {
            CredentialError::authentication(format!("Service account token request failed: {}", e))
        })?;
        Ok(token.as_str().to_string())
    }
}
