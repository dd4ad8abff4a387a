use serde::{Deserialize, Serialize};

/// Default storage key for the task blob
pub const TASKS_STORAGE_KEY: &str = "momentum_tasks";

/// How long a command waits for another `mo` holding the data directory
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Configuration from momentum.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key the task blob is stored under
    #[serde(default = "default_key")]
    pub key: String,
    /// Milliseconds to wait for the data directory's write lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            key: default_key(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

fn default_key() -> String {
    TASKS_STORAGE_KEY.to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

/// External capability commands. Each is run through `sh -c` with a JSON
/// request on stdin and must print a JSON response on stdout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub ingest_command: Option<String>,
    #[serde(default)]
    pub suggest_command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Fallback filter when MOMENTUM_LOG is unset (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}
