//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Default URL for new HTTP requests
pub const DEFAULT_HTTP_URL: &str = "https://httpbin.org/get";

/// Directory under the user's home holding Freeman data
pub const DATA_DIR_NAME: &str = ".freeman";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "FREEMAN_HOME";

/// Configuration file name inside the data directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Sub-directory holding one file per collection
pub const COLLECTIONS_DIR: &str = "collections";

/// File holding every environment
pub const ENVIRONMENTS_FILE: &str = "environments.yaml";

/// Extension of persisted units
pub const UNIT_EXTENSION: &str = "yaml";

/// Log file written by [`crate::logging::init`]
pub const LOG_FILE: &str = "freeman.log";

/// Default whole-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default redirect limit
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Maximum number of history entries kept in memory
pub const MAX_HISTORY: usize = 50;

/// Application name
pub const APP_NAME: &str = "Freeman";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default User-Agent sent by the engine
pub fn default_user_agent() -> String {
    format!("{}/{}", APP_NAME.to_lowercase(), APP_VERSION)
}
