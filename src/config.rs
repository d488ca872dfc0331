//! Configuration file parser for ~/.config/episode-sync/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged as warnings, since they are usually
//! typos. Environment variables override file values.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default feed endpoint; the channel id is appended as a query parameter.
pub const DEFAULT_FEED_BASE_URL: &str = "https://www.youtube.com/feeds/videos.xml";

/// Overrides `channel_id`.
pub const CHANNEL_ID_ENV: &str = "EPISODE_SYNC_CHANNEL_ID";
/// Overrides `database_path`.
pub const DATABASE_ENV: &str = "EPISODE_SYNC_DATABASE";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Deployment configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Channel whose feed is synchronized. Required for `sync`.
    pub channel_id: Option<String>,

    /// Feed endpoint the channel id is appended to.
    pub feed_base_url: String,

    /// SQLite file holding the episode store. Defaults to the config directory.
    pub database_path: Option<PathBuf>,

    /// HTTP timeout for the feed request, in seconds. 0 disables the timeout.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_id: None,
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            database_path: None,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 4] = [
        "channel_id",
        "feed_base_url",
        "database_path",
        "request_timeout_secs",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            channel_id = config.channel_id.as_deref().unwrap_or("<unset>"),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Applies environment overrides. Blank values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(channel_id) = non_blank(CHANNEL_ID_ENV) {
            self.channel_id = Some(channel_id.trim().to_string());
        }
        if let Some(path) = non_blank(DATABASE_ENV) {
            self.database_path = Some(PathBuf::from(path));
        }
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
