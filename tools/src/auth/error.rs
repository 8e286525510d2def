use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error(
        "Missing optional dependency '{package}': rebuild agentkit with `--features {feature}`"
    )]
    DependencyMissing {
        package: &'static str,
        feature: &'static str,
    },

    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid token file {}: {source}", path.display())]
    InvalidTokenFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid client secrets file {}: {reason}", path.display())]
    InvalidClientSecrets { path: PathBuf, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CredentialError {
    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn dependency_missing(package: &'static str, feature: &'static str) -> Self {
        Self::DependencyMissing { package, feature }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_missing_names_feature() {
        let err = CredentialError::dependency_missing("gcp_auth", "service-account");
        let msg = err.to_string();
        assert!(msg.contains("gcp_auth"));
        assert!(msg.contains("--features service-account"));
    }

    #[test]
    fn test_io_keeps_source() {
        let err = CredentialError::io(
            Path::new("/tmp/token.json"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().starts_with("IO error on /tmp/token.json"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
