//! Authorized client for a Google REST resource (e.g. Calendar v3)

use reqwest::{Method, RequestBuilder, Url};

use super::error::CredentialError;
use super::types::Credential;
use super::{CredentialConfig, resolve_credentials};
use crate::core::constants::GOOGLE_API_BASE_URL;

pub struct ResourceService {
    http: reqwest::Client,
    base_url: Url,
    credential: Credential,
}

impl ResourceService {
    pub fn new(
        credential: Credential,
        service_name: &str,
        service_version: &str,
    ) -> Result<Self, CredentialError> {
        Self::with_api_root(credential, GOOGLE_API_BASE_URL, service_name, service_version)
    }

    /// Target `<api_root>/<service>/<version>/` instead of the public API host
    pub fn with_api_root(
        credential: Credential,
        api_root: &str,
        service_name: &str,
        service_version: &str,
    ) -> Result<Self, CredentialError> {
        let base = format!(
            "{}/{}/{}/",
            api_root.trim_end_matches('/'),
            service_name,
            service_version
        );
        let base_url = Url::parse(&base).map_err(|e| {
            CredentialError::authentication(format!("Invalid API base URL {}: {}", base, e))
        })?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            credential,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Start a request for `path` (relative to the base URL) carrying a
    /// bearer token.
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, CredentialError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| CredentialError::authentication(format!("Invalid resource path {}: {}", path, e)))?;
        let token = self.credential.access_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }
}

/// Build a resource client, resolving credentials from `config` when none
/// are supplied.
pub async fn build_resource_service(
    credential: Option<Credential>,
    service_name: &str,
    service_version: &str,
    config: &CredentialConfig,
) -> Result<ResourceService, CredentialError> {
    let credential = match credential {
        Some(credential) => credential,
        None => resolve_credentials(config).await?,
    };
    tracing::debug!(
        service = service_name,
        version = service_version,
        kind = credential.kind(),
        "Building resource service"
    );
    ResourceService::new(credential, service_name, service_version)
}
