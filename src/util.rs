//! Environment variable overrides
//!
//! Credentials and the database location can be supplied through the
//! environment (or a `.env` file) instead of the configuration file.

pub const ZABBIX_URL: &str = "ZABBIX_URL";

pub const ZABBIX_USER: &str = "ZABBIX_USER";

pub const ZABBIX_PASSWORD: &str = "ZABBIX_PASSWORD";

pub const MONITOR_DB_PATH: &str = "MONITOR_DB_PATH";

/// Load a `.env` file from the working directory if there is one
pub fn load_dotenv() {
    if let Ok(path) = dotenv::dotenv() {
        tracing::debug!("loaded environment from {}", path.display());
    }
}

/// Read a non-empty environment variable
pub fn get_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
