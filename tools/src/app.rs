//! Core application

use anyhow::{Context, Result};

use crate::auth::{ResourceService, build_resource_service};
use crate::core::cli::{self, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{
    APP_NAME_LOWER, DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_VERSION, ENV_LOG,
};
use crate::data::duckdb::DuckdbStore;
use crate::data::duckdb::filters::parse_conditions;
use crate::domain::EntityGetTool;
use crate::utils::time::parse_and_format_datetime;

pub struct CoreApp {
    pub config: AppConfig,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let app = Self {
            config: AppConfig::load(&cli_config)?,
        };
        app.execute(command).await
    }

    pub async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Auth => {
                let summary = self.auth().await?;
                println!("{}", summary);
            }
            Commands::Entities { table, conditions } => {
                println!("{}", self.entities(&table, &conditions)?);
            }
            Commands::Datetime { start, end } => {
                let (start, end, timezone) = self.datetime(&start, &end)?;
                println!("{}\n{}\n{}", start, end, timezone);
            }
        }
        Ok(())
    }

    /// Resolve credentials for the calendar API and describe them
    async fn auth(&self) -> Result<String> {
        let service = build_resource_service(
            None,
            DEFAULT_SERVICE_NAME,
            DEFAULT_SERVICE_VERSION,
            &self.config.google,
        )
        .await
        .context("Failed to resolve Google credentials")?;
        Ok(credential_summary(&service))
    }

    fn entities(&self, table: &str, conditions: &str) -> Result<String> {
        let conditions = parse_conditions(conditions).context("Invalid --conditions")?;
        let path = &self.config.store.path;
        let store = DuckdbStore::open_read_only(path)
            .with_context(|| format!("Failed to open entity store: {}", path.display()))?;

        let tool = EntityGetTool::new(store).with_max_rows(self.config.store.max_rows);
        Ok(tool.get_entities(table, &conditions)?)
    }

    fn datetime(&self, start: &str, end: &str) -> Result<(String, String, String)> {
        Ok(parse_and_format_datetime(
            start,
            end,
            self.config.timezone.as_deref(),
        )?)
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}

/// Human-readable credential summary; never includes token material
fn credential_summary(service: &ResourceService) -> String {
    let credential = service.credential();
    let expiry = credential
        .expiry()
        .map(|e| e.to_rfc3339())
        .unwrap_or_else(|| "minted on demand".to_string());
    format!(
        "Credential: {}\nScopes:     {}\nExpires:    {}\nEndpoint:   {}",
        credential.kind(),
        credential.scopes().join(" "),
        expiry,
        service.base_url()
    )
}
