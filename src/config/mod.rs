//! Configuration management.
//!
//! Configuration is read from `~/.config/channelrank/config.toml` at
//! startup. If the file doesn't exist, a default configuration with comments
//! is created. Missing fields fall back to defaults, so a config file only
//! needs the credentials the operator actually has.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::connector::gate::{
    RateGate, DEFAULT_ATTEMPTS, DEFAULT_BACKOFF_MS, DEFAULT_PERMITS, DEFAULT_TIMEOUT_SECS,
};
use crate::discovery::DiscoveryTuning;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub youtube: YouTubeConfig,
    pub twitch: TwitchConfig,
    pub gate: GateConfig,
    pub discovery: DiscoveryConfig,
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Overrides the default database location.
    pub path: Option<PathBuf>,
}

/// Absent credentials are not an error: the connector runs keyless and
/// every call returns empty results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TwitchConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub permits: usize,
    pub attempts: usize,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            permits: DEFAULT_PERMITS,
            attempts: DEFAULT_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GateConfig {
    pub fn build(&self) -> RateGate {
        RateGate::new(
            self.permits,
            self.attempts,
            Duration::from_millis(self.backoff_ms),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub rapid_threshold: i64,
    pub discovery_workers: usize,
    pub snapshot_workers: usize,
    pub stale_after_days: i64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let tuning = DiscoveryTuning::default();
        Self {
            rapid_threshold: tuning.rapid_threshold,
            discovery_workers: tuning.discovery_workers,
            snapshot_workers: tuning.snapshot_workers,
            stale_after_days: tuning.stale_after_days,
        }
    }
}

impl DiscoveryConfig {
    pub fn tuning(&self) -> DiscoveryTuning {
        DiscoveryTuning {
            rapid_threshold: self.rapid_threshold,
            discovery_workers: self.discovery_workers,
            snapshot_workers: self.snapshot_workers,
            stale_after_days: self.stale_after_days,
            ..DiscoveryTuning::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Minutes between discovery ticks.
    pub tick_mins: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { tick_mins: 15 }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/channelrank/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("channelrank").join("config.toml"))
    }

    /// Database location, honoring the config override.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(data_dir.join("channelrank").join("channelrank.db"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# channelrank configuration
#
# Without credentials the matching connector still loads, but every call
# returns empty results instead of failing.

[database]
# Overrides the default database location
# path = "/var/lib/channelrank/channelrank.db"

[youtube]
# YouTube Data API v3 key
# api_key = "..."

[twitch]
# Twitch Helix application credentials
# client_id = "..."
# client_secret = "..."

[gate]
# Maximum in-flight platform API calls, shared across discovery and snapshots
permits = 5

# Retry attempts for transient failures
attempts = 3

# Fixed backoff between retries (milliseconds)
backoff_ms = 800

# Per-call timeout (seconds)
timeout_secs = 10

[discovery]
# Channel count below which rapid discovery stays active
rapid_threshold = 1000

# Concurrent discovery searches
discovery_workers = 8

# Concurrent snapshot fetches
snapshot_workers = 4

# A channel is stale once its latest snapshot is older than this many days
stale_after_days = 1

[daemon]
# Minutes between discovery ticks
tick_mins = 15
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.gate.permits, DEFAULT_PERMITS);
        assert_eq!(config.discovery.rapid_threshold, 1000);
        assert_eq!(config.daemon.tick_mins, 15);
        assert!(config.youtube.api_key.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[youtube]
api_key = "secret"

[gate]
permits = 2
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.youtube.api_key.as_deref(), Some("secret"));
        assert_eq!(config.gate.permits, 2);
        // Untouched sections keep their defaults
        assert_eq!(config.gate.attempts, DEFAULT_ATTEMPTS);
        assert_eq!(config.discovery.discovery_workers, 8);
    }

    #[test]
    fn test_database_path_override() {
        let mut config = Config::default();
        config.database.path = Some(PathBuf::from("/tmp/test.db"));
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/test.db"));
    }
}
