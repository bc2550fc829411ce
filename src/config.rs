//! Configuration management for the backup tool.
//!
//! Loads configuration from an optional TOML file; command-line flags
//! override file values, which override the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub redis: RedisConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory that receives the timestamped backup files
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    /// strftime template applied to the data file's modification time
    #[serde(default = "default_filename_template")]
    pub filename_template: String,

    /// Maximum number of backups to keep per file kind
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Seconds to wait for the background save to finish
    #[serde(default = "default_bgsave_timeout")]
    pub bgsave_timeout_secs: u64,

    /// Also back up the append-only file
    #[serde(default)]
    pub with_aof: bool,

    /// AOF filename inside the server's data directory
    #[serde(default = "default_aof_filename")]
    pub aof_filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis host (name or IP address)
    #[serde(default = "default_redis_host")]
    pub host: String,

    /// Redis port
    #[serde(default = "default_redis_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path; stdout when unset
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// Default values
fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}

fn default_filename_template() -> String {
    "redis_dump_%Y-%m-%d_%H%M%S".to_string()
}

fn default_max_backups() -> usize {
    10
}

fn default_bgsave_timeout() -> u64 {
    60
}

fn default_aof_filename() -> String {
    "appendonly.aof".to_string()
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            filename_template: default_filename_template(),
            max_backups: default_max_backups(),
            bgsave_timeout_secs: default_bgsave_timeout(),
            with_aof: false,
            aof_filename: default_aof_filename(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
