//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub incremental: IncrementalConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Match store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_matches_file")]
    pub matches_file: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("rift").to_string_lossy().to_string())
        .unwrap_or_else(|| "./rift_data".to_string())
}

fn default_matches_file() -> String {
    "matches.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            matches_file: default_matches_file(),
        }
    }
}

impl StoreConfig {
    /// Full path to the JSON match file
    pub fn matches_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.matches_file)
    }

    /// Full path to the checkpoint file
    pub fn checkpoints_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("checkpoints.json")
    }
}

/// Query optimizer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    #[serde(default = "default_cache_evict_batch")]
    pub cache_evict_batch: usize,
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_cache_max_entries() -> usize {
    1000
}

fn default_cache_evict_batch() -> usize {
    100
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            cache_max_entries: default_cache_max_entries(),
            cache_evict_batch: default_cache_evict_batch(),
        }
    }
}

impl QueryConfig {
    /// Convert to the query layer's cache settings
    pub fn cache_config(&self) -> crate::query::QueryCacheConfig {
        crate::query::QueryCacheConfig {
            ttl: std::time::Duration::from_secs(self.cache_ttl_secs),
            max_entries: self.cache_max_entries,
            evict_batch: self.cache_evict_batch,
        }
    }
}

/// Batch processor configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchConfig {
    /// Worker cap; unset means `min(32, cpus + 4)`
    #[serde(default)]
    pub max_workers: Option<usize>,
}

/// Incremental updater configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IncrementalConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    #[serde(default = "default_checkpoint_max_age_days")]
    pub checkpoint_max_age_days: i64,
}

fn default_batch_size() -> usize {
    50
}

fn default_lookback_days() -> i64 {
    365
}

fn default_checkpoint_max_age_days() -> i64 {
    90
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            lookback_days: default_lookback_days(),
            checkpoint_max_age_days: default_checkpoint_max_age_days(),
        }
    }
}

impl IncrementalConfig {
    /// Convert to the updater's settings
    pub fn updater_config(&self) -> crate::incremental::IncrementalUpdaterConfig {
        crate::incremental::IncrementalUpdaterConfig {
            batch_size: self.batch_size,
            lookback_days: self.lookback_days,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("rift").join("config.toml")),
            Some(PathBuf::from("/etc/rift/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(data_dir) = std::env::var("RIFT_DATA_DIR") {
            self.store.data_dir = data_dir;
        }
        if let Ok(matches_file) = std::env::var("RIFT_MATCHES_FILE") {
            self.store.matches_file = matches_file;
        }

        if let Ok(ttl) = std::env::var("RIFT_CACHE_TTL_SECS") {
            if let Ok(secs) = ttl.parse() {
                self.query.cache_ttl_secs = secs;
            }
        }

        if let Ok(workers) = std::env::var("RIFT_MAX_WORKERS") {
            if let Ok(n) = workers.parse() {
                self.batch.max_workers = Some(n);
            }
        }

        if let Ok(level) = std::env::var("RIFT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("RIFT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            query: QueryConfig::default(),
            batch: BatchConfig::default(),
            incremental: IncrementalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Rift Configuration
#
# Environment variables override these settings:
# - RIFT_DATA_DIR
# - RIFT_MATCHES_FILE
# - RIFT_CACHE_TTL_SECS
# - RIFT_MAX_WORKERS
# - RIFT_LOG_LEVEL
# - RIFT_LOG_FORMAT

[store]
# Directory for match data and checkpoints
data_dir = "~/.local/share/rift"

# JSON match file within the data directory
matches_file = "matches.json"

[query]
# Result cache time-to-live (seconds)
cache_ttl_secs = 300

# Result cache entry cap
cache_max_entries = 1000

# Entries dropped when the cap is exceeded
cache_evict_batch = 100

[batch]
# Worker cap; comment out for min(32, cpus + 4)
# max_workers = 8

[incremental]
# Matches per processing batch
batch_size = 50

# Lookback window for player enumeration (days)
lookback_days = 365

# Age after which inactive checkpoints are cleaned up (days)
checkpoint_max_age_days = 90

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
