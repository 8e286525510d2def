// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "agentkit";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".agentkit";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "agentkit.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "AGENTKIT_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "AGENTKIT_LOG";

// =============================================================================
// Environment Variables - Google credentials
// =============================================================================

pub const ENV_TOKEN_FILE: &str = "AGENTKIT_TOKEN_FILE";
pub const ENV_CLIENT_SECRETS_FILE: &str = "AGENTKIT_CLIENT_SECRETS_FILE";
pub const ENV_SERVICE_ACCOUNT_FILE: &str = "AGENTKIT_SERVICE_ACCOUNT_FILE";
pub const ENV_SCOPES: &str = "AGENTKIT_SCOPES";
pub const ENV_DOMAIN_WIDE: &str = "AGENTKIT_DOMAIN_WIDE";
pub const ENV_DELEGATED_USER: &str = "AGENTKIT_DELEGATED_USER";
pub const ENV_REDIRECT_PORT: &str = "AGENTKIT_REDIRECT_PORT";

// =============================================================================
// Environment Variables - Entity store
// =============================================================================

pub const ENV_STORE_PATH: &str = "AGENTKIT_STORE_PATH";
pub const ENV_MAX_ROWS: &str = "AGENTKIT_MAX_ROWS";

/// Environment variable for the default calendar timezone
pub const ENV_TIMEZONE: &str = "AGENTKIT_TIMEZONE";

// =============================================================================
// Google OAuth Defaults
// =============================================================================

/// Scopes requested by the interactive user flow
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

/// Scopes requested by the service-account flow
pub const DEFAULT_SERVICE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/calendar.events",
];

/// Cached user token (written after every acquisition or refresh)
pub const DEFAULT_TOKEN_FILE: &str = "token.json";

/// OAuth client descriptor for the installed-app flow
pub const DEFAULT_CLIENT_SECRETS_FILE: &str = "credentials.json";

/// Service-account key
pub const DEFAULT_SERVICE_ACCOUNT_FILE: &str = "service_account.json";

pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Base URL for discovery-style REST resources (`{base}/{service}/{version}/`)
pub const GOOGLE_API_BASE_URL: &str = "https://www.googleapis.com";

pub const DEFAULT_SERVICE_NAME: &str = "calendar";
pub const DEFAULT_SERVICE_VERSION: &str = "v3";

/// Host written into the redirect URI of the local consent flow
pub const DEFAULT_REDIRECT_HOST: &str = "localhost";

/// Tokens this close to expiry are treated as expired
pub const TOKEN_REFRESH_THRESHOLD_SECS: i64 = 225;

/// HTTP timeout for token endpoint calls
pub const TOKEN_HTTP_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Entity Store Defaults
// =============================================================================

/// DuckDB database file holding entity tables
pub const DEFAULT_STORE_PATH: &str = "entities.duckdb";

/// Rows returned per query unless configured otherwise (0 = unlimited)
pub const DEFAULT_MAX_ROWS: usize = 10;

/// Column holding the embedding; never displayed
pub const VECTOR_COLUMN: &str = "vector";

/// Maximum size of condition JSON in bytes (64KB)
pub const MAX_CONDITION_JSON_SIZE: usize = 64 * 1024;

/// Maximum number of conditions per query
pub const MAX_CONDITIONS: usize = 50;
