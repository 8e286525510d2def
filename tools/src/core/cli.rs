use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CLIENT_SECRETS_FILE, ENV_CONFIG, ENV_DELEGATED_USER, ENV_DOMAIN_WIDE, ENV_MAX_ROWS,
    ENV_REDIRECT_PORT, ENV_SCOPES, ENV_SERVICE_ACCOUNT_FILE, ENV_STORE_PATH, ENV_TIMEZONE,
    ENV_TOKEN_FILE,
};

#[derive(Parser)]
#[command(name = "agentkit")]
#[command(version, about = "Calendar credentials and entity lookup tools for agents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // Google credential options
    /// Cached OAuth token file
    #[arg(long, global = true, env = ENV_TOKEN_FILE)]
    pub token_file: Option<PathBuf>,

    /// OAuth client secrets file (installed-app flow)
    #[arg(long, global = true, env = ENV_CLIENT_SECRETS_FILE)]
    pub client_secrets_file: Option<PathBuf>,

    /// Service account key file (domain-wide flow)
    #[arg(long, global = true, env = ENV_SERVICE_ACCOUNT_FILE)]
    pub service_account_file: Option<PathBuf>,

    /// OAuth scopes, comma separated
    #[arg(long, global = true, env = ENV_SCOPES, value_delimiter = ',')]
    pub scopes: Option<Vec<String>>,

    /// Authenticate with the service account instead of a user token
    #[arg(long, global = true, env = ENV_DOMAIN_WIDE)]
    pub domain_wide: bool,

    /// User to impersonate with domain-wide delegation
    #[arg(long, global = true, env = ENV_DELEGATED_USER)]
    pub delegated_user: Option<String>,

    /// Local port for the OAuth redirect (0 = any free port)
    #[arg(long, global = true, env = ENV_REDIRECT_PORT)]
    pub redirect_port: Option<u16>,

    // Entity store options
    /// DuckDB database holding entity tables
    #[arg(long, global = true, env = ENV_STORE_PATH)]
    pub store_path: Option<PathBuf>,

    /// Maximum rows returned per lookup (0 = unlimited)
    #[arg(long, global = true, env = ENV_MAX_ROWS)]
    pub max_rows: Option<usize>,

    /// IANA timezone for calendar datetimes (defaults to the local zone)
    #[arg(long, global = true, env = ENV_TIMEZONE)]
    pub timezone: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Resolve Google credentials and print a summary
    Auth,
    /// Look up entities in a table
    Entities {
        /// Table to query
        table: String,
        /// Filter conditions as a JSON array of {field, operator, value}
        #[arg(long, default_value = "[]")]
        conditions: String,
    },
    /// Attach a timezone to a naive datetime range
    Datetime {
        /// Start, YYYY-MM-DDTHH:MM:SS
        start: String,
        /// End, YYYY-MM-DDTHH:MM:SS
        end: String,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    pub client_secrets_file: Option<PathBuf>,
    pub service_account_file: Option<PathBuf>,
    pub scopes: Option<Vec<String>>,
    pub domain_wide: bool,
    pub delegated_user: Option<String>,
    pub redirect_port: Option<u16>,
    pub store_path: Option<PathBuf>,
    pub max_rows: Option<usize>,
    pub timezone: Option<String>,
}

impl Cli {
    /// Split into layered-config inputs and the command to run
    pub fn into_parts(self) -> (CliConfig, Commands) {
        let config = CliConfig {
            config: self.config,
            token_file: self.token_file,
            client_secrets_file: self.client_secrets_file,
            service_account_file: self.service_account_file,
            scopes: self.scopes,
            domain_wide: self.domain_wide,
            delegated_user: self.delegated_user,
            redirect_port: self.redirect_port,
            store_path: self.store_path,
            max_rows: self.max_rows,
            timezone: self.timezone,
        };
        (config, self.command)
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    Cli::parse().into_parts()
}
