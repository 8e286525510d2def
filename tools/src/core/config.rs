use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::auth::CredentialConfig;
use crate::utils::file::{expand, expand_path};
use crate::utils::time::parse_timezone;

use super::cli::CliConfig;
use super::constants::{APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_MAX_ROWS, DEFAULT_STORE_PATH};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Google credential section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct GoogleFileConfig {
    pub token_file: Option<String>,
    pub client_secrets_file: Option<String>,
    pub service_account_file: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub domain_wide: Option<bool>,
    pub delegated_user: Option<String>,
    pub redirect_host: Option<String>,
    pub redirect_port: Option<u16>,
}

/// Entity store section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StoreFileConfig {
    pub path: Option<String>,
    pub max_rows: Option<usize>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub google: Option<GoogleFileConfig>,
    pub store: Option<StoreFileConfig>,
    pub timezone: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(google) = other.google {
            let current = self.google.get_or_insert_with(GoogleFileConfig::default);
            merge_field(&mut current.token_file, google.token_file, "google.token_file");
            merge_field(
                &mut current.client_secrets_file,
                google.client_secrets_file,
                "google.client_secrets_file",
            );
            merge_field(
                &mut current.service_account_file,
                google.service_account_file,
                "google.service_account_file",
            );
            merge_field(&mut current.scopes, google.scopes, "google.scopes");
            merge_field(&mut current.domain_wide, google.domain_wide, "google.domain_wide");
            merge_field(
                &mut current.delegated_user,
                google.delegated_user,
                "google.delegated_user",
            );
            merge_field(&mut current.redirect_host, google.redirect_host, "google.redirect_host");
            merge_field(&mut current.redirect_port, google.redirect_port, "google.redirect_port");
        }

        if let Some(store) = other.store {
            let current = self.store.get_or_insert_with(StoreFileConfig::default);
            merge_field(&mut current.path, store.path, "store.path");
            merge_field(&mut current.max_rows, store.max_rows, "store.max_rows");
        }

        merge_field(&mut self.timezone, other.timezone, "timezone");
    }
}

fn merge_field<T: std::fmt::Debug>(current: &mut Option<T>, other: Option<T>, name: &str) {
    if other.is_some() {
        tracing::trace!(field = name, value = ?other, "Merging config field");
        *current = other;
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// `None` returns every matching row
    pub max_rows: Option<usize>,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub google: CredentialConfig,
    pub store: StoreConfig,
    /// `None` uses the process's local timezone
    pub timezone: Option<String>,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.agentkit/agentkit.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        Self::load_with_profile(cli, get_profile_config_path())
    }

    fn load_with_profile(cli: &CliConfig, profile_path: Option<PathBuf>) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Profile dir - skip if not exists
        if let Some(profile_path) = profile_path
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand(path);
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        // 3. Layer configs: defaults -> file config -> CLI/env overrides
        let file_google = file_config.google.unwrap_or_default();
        let file_store = file_config.store.unwrap_or_default();
        let defaults = CredentialConfig::default();

        let google = CredentialConfig {
            token_file: layer_path(&cli.token_file, file_google.token_file, defaults.token_file),
            client_secrets_file: layer_path(
                &cli.client_secrets_file,
                file_google.client_secrets_file,
                defaults.client_secrets_file,
            ),
            service_account_file: layer_path(
                &cli.service_account_file,
                file_google.service_account_file,
                defaults.service_account_file,
            ),
            scopes: cli.scopes.clone().or(file_google.scopes),
            // --domain-wide can only switch delegation on
            use_domain_wide: cli.domain_wide || file_google.domain_wide.unwrap_or(false),
            delegated_user: cli.delegated_user.clone().or(file_google.delegated_user),
            redirect_host: file_google.redirect_host.unwrap_or(defaults.redirect_host),
            redirect_port: cli
                .redirect_port
                .or(file_google.redirect_port)
                .unwrap_or(defaults.redirect_port),
        };

        let max_rows = cli
            .max_rows
            .or(file_store.max_rows)
            .unwrap_or(DEFAULT_MAX_ROWS);
        let store = StoreConfig {
            path: layer_path(
                &cli.store_path,
                file_store.path,
                PathBuf::from(DEFAULT_STORE_PATH),
            ),
            max_rows: (max_rows > 0).then_some(max_rows),
        };

        let timezone = cli.timezone.clone().or(file_config.timezone);

        let config = Self {
            google,
            store,
            timezone,
        };
        config.validate()?;

        tracing::debug!(
            token_file = %config.google.token_file.display(),
            domain_wide = config.google.use_domain_wide,
            store = %config.store.path.display(),
            max_rows = ?config.store.max_rows,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(scopes) = &self.google.scopes
            && scopes.iter().all(|s| s.trim().is_empty())
        {
            anyhow::bail!("At least one OAuth scope is required");
        }

        if let Some(ref tz) = self.timezone {
            parse_timezone(tz).with_context(|| "Invalid timezone in configuration")?;
        }

        if self.google.delegated_user.is_some() && !self.google.use_domain_wide {
            tracing::warn!("delegated_user is ignored without domain-wide delegation");
        }

        Ok(())
    }
}

/// CLI path, then file path (with `~` expansion), then default
fn layer_path(cli: &Option<PathBuf>, file: Option<String>, default: PathBuf) -> PathBuf {
    match (cli, file) {
        (Some(path), _) => expand(path),
        (None, Some(path)) => expand_path(&path),
        (None, None) => default,
    }
}

/// Get the profile config path (~/.agentkit/agentkit.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
