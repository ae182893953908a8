//! Configuration
//!
//! Poll cache settings, loaded from a JSON5 file. Every field has a default,
//! so an empty file (or no file at all) is a valid configuration.

pub mod schema;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "POLLSYNC_CONFIG";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Poll cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollsConfig {
    /// Buffer size of the poll-changed notification channel
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
    /// Page size used when listing voters without an explicit limit
    #[serde(default = "default_votes_page_limit")]
    pub votes_page_limit: u32,
    /// Prefix of the reply label
    #[serde(default = "default_reply_emoji")]
    pub reply_emoji: String,
    /// Reply label text used when a poll has no question
    #[serde(default = "default_reply_fallback")]
    pub reply_fallback: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_notification_capacity() -> usize {
    256
}

fn default_votes_page_limit() -> u32 {
    20
}

fn default_reply_emoji() -> String {
    "📊".to_string()
}

fn default_reply_fallback() -> String {
    "poll".to_string()
}

impl Default for PollsConfig {
    fn default() -> Self {
        Self {
            notification_capacity: default_notification_capacity(),
            votes_page_limit: default_votes_page_limit(),
            reply_emoji: default_reply_emoji(),
            reply_fallback: default_reply_fallback(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PollsConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notification_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notificationCapacity must be greater than 0".to_string(),
            ));
        }
        if self.votes_page_limit == 0 {
            return Err(ConfigError::Invalid(
                "votesPageLimit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a configuration from JSON5 text
pub fn parse_config(raw: &str, path: &Path) -> Result<PollsConfig, ConfigError> {
    let config: PollsConfig = json5::from_str(raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a configuration file
pub fn load_config(path: &Path) -> Result<PollsConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw, path)
}

/// Load `path`, else the file named by `POLLSYNC_CONFIG`, else defaults
pub fn load_config_or_default(path: Option<&Path>) -> Result<PollsConfig, ConfigError> {
    let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    match path.map(Path::to_path_buf).or(env_path) {
        Some(path) => load_config(&path),
        None => Ok(PollsConfig::default()),
    }
}
