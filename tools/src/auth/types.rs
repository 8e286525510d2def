use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::CredentialError;
#[cfg(feature = "service-account")]
use super::service_account::ServiceAccountCredential;
use crate::core::constants::{GOOGLE_TOKEN_URI, TOKEN_REFRESH_THRESHOLD_SECS};

pub(crate) fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// End-user OAuth credential in the Google "authorized user" JSON layout
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedUserCredential {
    #[serde(default, alias = "access_token", skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AuthorizedUserCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUserCredential")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl AuthorizedUserCredential {
    /// Expired once `now` is within the refresh threshold of `expiry`.
    /// A credential without an expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| now >= expiry - Duration::seconds(TOKEN_REFRESH_THRESHOLD_SECS))
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some() && !self.is_expired(now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// A resolved credential ready to authorize API requests
#[derive(Debug, Clone)]
pub enum Credential {
    User(AuthorizedUserCredential),
    #[cfg(feature = "service-account")]
    ServiceAccount(ServiceAccountCredential),
}

impl Credential {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "authorized_user",
            #[cfg(feature = "service-account")]
            Self::ServiceAccount(_) => "service_account",
        }
    }

    pub fn scopes(&self) -> &[String] {
        match self {
            Self::User(c) => &c.scopes,
            #[cfg(feature = "service-account")]
            Self::ServiceAccount(c) => c.scopes(),
        }
    }

    /// `None` for service accounts, whose tokens are minted on demand
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::User(c) => c.expiry,
            #[cfg(feature = "service-account")]
            Self::ServiceAccount(_) => None,
        }
    }

    /// Bearer token for the next request.
    ///
    /// User credentials are not refreshed here: an expired one is an error.
    pub async fn access_token(&self) -> Result<String, CredentialError> {
        match self {
            Self::User(c) => match &c.token {
                Some(token) if !c.is_expired(Utc::now()) => Ok(token.clone()),
                Some(_) => Err(CredentialError::authentication(
                    "Access token has expired; resolve credentials again",
                )),
                None => Err(CredentialError::authentication(
                    "Credential has no access token",
                )),
            },
            #[cfg(feature = "service-account")]
            Self::ServiceAccount(c) => c.access_token().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expiry: Option<DateTime<Utc>>) -> AuthorizedUserCredential {
        AuthorizedUserCredential {
            token: Some("ya29.access".to_string()),
            refresh_token: Some("1//refresh".to_string()),
            token_uri: default_token_uri(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/calendar".to_string()],
            expiry,
        }
    }

    #[test]
    fn test_expiry_threshold() {
        let now = Utc::now();
        assert!(!credential(None).is_expired(now));
        assert!(!credential(Some(now + Duration::hours(1))).is_expired(now));
        assert!(credential(Some(now + Duration::seconds(60))).is_expired(now));
        assert!(credential(Some(now - Duration::seconds(1))).is_expired(now));
    }

    #[test]
    fn test_valid_requires_token() {
        let now = Utc::now();
        let mut c = credential(Some(now + Duration::hours(1)));
        assert!(c.is_valid(now));
        c.token = None;
        assert!(!c.is_valid(now));
    }

    #[test]
    fn test_can_refresh() {
        let mut c = credential(None);
        assert!(c.can_refresh());
        c.refresh_token = Some(String::new());
        assert!(!c.can_refresh());
        c.refresh_token = None;
        assert!(!c.can_refresh());
    }

    #[test]
    fn test_debug_redacts() {
        let debug = format!("{:?}", credential(None));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("ya29.access"));
        assert!(!debug.contains("1//refresh"));
        assert!(!debug.contains("client-secret"));
        assert!(debug.contains("client-id"));
    }

    #[test]
    fn test_deserialize_google_layout() {
        let json = r#"{
            "token": "ya29.a0",
            "refresh_token": "1//0g",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "123.apps.googleusercontent.com",
            "client_secret": "GOCSPX-x",
            "scopes": ["https://www.googleapis.com/auth/calendar"],
            "universe_domain": "googleapis.com",
            "account": "",
            "expiry": "2024-01-15T10:00:00.123456Z"
        }"#;
        let c: AuthorizedUserCredential = serde_json::from_str(json).unwrap();
        assert_eq!(c.token.as_deref(), Some("ya29.a0"));
        assert_eq!(c.scopes.len(), 1);
        assert_eq!(
            c.expiry.unwrap().to_rfc3339(),
            "2024-01-15T10:00:00.123456+00:00"
        );
    }

    #[test]
    fn test_deserialize_access_token_alias_and_defaults() {
        let json = r#"{"access_token": "abc", "client_id": "id", "client_secret": "s"}"#;
        let c: AuthorizedUserCredential = serde_json::from_str(json).unwrap();
        assert_eq!(c.token.as_deref(), Some("abc"));
        assert_eq!(c.token_uri, GOOGLE_TOKEN_URI);
        assert!(c.refresh_token.is_none());
        assert!(c.scopes.is_empty());
        assert!(c.expiry.is_none());
    }

    #[tokio::test]
    async fn test_access_token_rejects_expired() {
        let c = Credential::User(credential(Some(Utc::now() - Duration::minutes(5))));
        let err = c.access_token().await.unwrap_err();
        assert!(matches!(err, CredentialError::Authentication { .. }));

        let c = Credential::User(credential(Some(Utc::now() + Duration::hours(1))));
        assert_eq!(c.access_token().await.unwrap(), "ya29.access");
        assert_eq!(c.kind(), "authorized_user");
    }
}
