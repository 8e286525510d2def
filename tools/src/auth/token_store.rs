//! On-disk token cache
//!
//! The cache is read once per resolution and fully replaced on write. There
//! is no locking: two processes refreshing at once both write, and the last
//! rename wins.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::error::CredentialError;
use super::types::AuthorizedUserCredential;

/// Load a cached credential, replacing its scopes with `scopes`.
///
/// A missing file is `Ok(None)`; an unreadable or malformed one is an error.
pub async fn load(
    path: &Path,
    scopes: &[String],
) -> Result<Option<AuthorizedUserCredential>, CredentialError> {
    let json = match tokio::fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No cached token file");
            return Ok(None);
        }
        Err(e) => return Err(CredentialError::io(path, e)),
    };

    let mut credential: AuthorizedUserCredential =
        serde_json::from_str(&json).map_err(|source| CredentialError::InvalidTokenFile {
            path: path.to_path_buf(),
            source,
        })?;
    credential.scopes = scopes.to_vec();

    tracing::debug!(path = %path.display(), expiry = ?credential.expiry, "Loaded cached token");
    Ok(Some(credential))
}

/// Overwrite the cache with `credential` (temp file, then rename).
pub async fn save(path: &Path, credential: &AuthorizedUserCredential) -> Result<(), CredentialError> {
    let json = serde_json::to_string_pretty(credential).map_err(|source| {
        CredentialError::InvalidTokenFile {
            path: path.to_path_buf(),
            source,
        }
    })?;
    atomic_write(path, &json)
        .await
        .map_err(|e| CredentialError::io(path, e))?;

    tracing::debug!(path = %path.display(), "Saved token file");
    Ok(())
}

async fn atomic_write(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = tmp_path(path);
    tokio::fs::write(&tmp_path, contents).await?;
    restrict_permissions(&tmp_path).await?;
    tokio::fs::rename(&tmp_path, path).await
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample() -> AuthorizedUserCredential {
        AuthorizedUserCredential {
            token: Some("access".to_string()),
            refresh_token: Some("refresh".to_string()),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec!["scope-a".to_string()],
            expiry: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = load(&dir.path().join("token.json"), &[]).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_replaces_scopes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("token.json");
        save(&path, &sample()).await.unwrap();

        let scopes = vec!["scope-b".to_string(), "scope-c".to_string()];
        let loaded = load(&path, &scopes).await.unwrap().unwrap();
        assert_eq!(loaded.scopes, scopes);
        assert_eq!(loaded.token.as_deref(), Some("access"));
        assert_eq!(loaded.expiry, sample().expiry);
        assert!(!tmp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{\"stale\": true, \"padding\": \"xxxxxxxxxxxxxxxxxxxxxxxxxxxxxx\"}")
            .unwrap();

        save(&path, &sample()).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("stale"));
        assert!(raw.contains("\"token\": \"access\""));
        assert!(raw.contains("\"expiry\": \"2030-01-01T00:00:00Z\""));
    }

    #[tokio::test]
    async fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let err = load(&path, &[]).await.unwrap_err();
        assert!(matches!(err, CredentialError::InvalidTokenFile { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        save(&path, &sample()).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_tmp_path_appends_suffix() {
        assert_eq!(tmp_path(Path::new("a/token.json")), PathBuf::from("a/token.json.tmp"));
        assert_eq!(tmp_path(Path::new("token")), PathBuf::from("token.tmp"));
    }
}
