use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::util;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// SQLite database (default for most deployments)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
    // Future: MySQL, PostgreSQL
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./monitor.db")
}

/// Connection settings for the monitoring API
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SourceConfig {
    /// Frontend base URL, e.g. `http://zabbix.local/zabbix`
    #[serde(default = "default_source_url")]
    pub url: String,
    #[serde(default = "default_source_user")]
    pub user: String,
    #[serde(default = "default_source_password")]
    pub password: String,
    /// HTTP request timeout in seconds
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            user: default_source_user(),
            password: default_source_password(),
            timeout_secs: default_source_timeout(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_source_url() -> String {
    "http://localhost/zabbix".to_string()
}

fn default_source_user() -> String {
    "Admin".to_string()
}

fn default_source_password() -> String {
    "zabbix".to_string()
}

fn default_source_timeout() -> u64 {
    30
}

/// Scheduling of sync runs
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SyncConfig {
    /// Seconds between scheduled runs
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Length of the trailing history window fetched per item
    #[serde(default = "default_window")]
    pub window_secs: u64,

    /// Deadline for a whole run, `0` disables it
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,

    /// Run once immediately instead of waiting for the first interval
    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            window_secs: default_window(),
            run_timeout_secs: default_run_timeout(),
            run_on_start: default_run_on_start(),
        }
    }
}

fn default_interval() -> u64 {
    300
}

fn default_window() -> u64 {
    3600
}

fn default_run_timeout() -> u64 {
    600
}

fn default_run_on_start() -> bool {
    true
}

/// HTTP API settings
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    pub token: Option<String>,
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_enable_cors() -> bool {
    true
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    /// API configuration (optional - no HTTP server when absent)
    pub api: Option<ApiSection>,
}

impl Config {
    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(util::get_env);
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(util::ZABBIX_URL) {
            self.source.url = url;
        }
        if let Some(user) = lookup(util::ZABBIX_USER) {
            self.source.user = user;
        }
        if let Some(password) = lookup(util::ZABBIX_PASSWORD) {
            self.source.password = password;
        }
        if let Some(path) = lookup(util::MONITOR_DB_PATH) {
            self.storage = StorageConfig::Sqlite {
                path: PathBuf::from(path),
            };
        }
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config: &Config| trace!("loaded config for source {}", config.source.url))
}
