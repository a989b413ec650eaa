//! # Market Configuration
//!
//! Settings for the database, cart holds and the expiry sweeper.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SKINBAY_DATABASE_PATH=/var/lib/skinbay/market.db                   │
//! │     SKINBAY_RESERVATION_WINDOW_SECS=600                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/skinbay/market.toml (Linux)                              │
//! │     ~/Library/Application Support/com.skinbay.market/market.toml       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     15 minute holds, sweep every 30 s, 500 rows per pass               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # market.toml
//! [database]
//! path = "./skinbay.db"
//! max_connections = 5
//!
//! [reservations]
//! window_secs = 900    # 0 = holds never expire
//!
//! [sweeper]
//! enabled = true
//! interval_ms = 30000
//! batch_limit = 500
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use skinbay_core::{DEFAULT_RESERVATION_WINDOW_SECS, DEFAULT_SWEEP_BATCH_LIMIT, DEFAULT_SWEEP_INTERVAL_MS};
use skinbay_db::DbConfig;

use crate::error::{JobError, JobResult};

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, created on first start.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./skinbay.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Reservation Settings
// =============================================================================

/// Cart hold lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationSettings {
    /// Seconds a hold survives after it is placed. 0 disables deadlines.
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
}

fn default_window_secs() -> i64 {
    DEFAULT_RESERVATION_WINDOW_SECS
}

impl Default for ReservationSettings {
    fn default() -> Self {
        ReservationSettings {
            window_secs: default_window_secs(),
        }
    }
}

impl ReservationSettings {
    /// The window as a duration, `None` when holds never expire.
    pub fn window(&self) -> Option<chrono::Duration> {
        (self.window_secs > 0).then(|| chrono::Duration::seconds(self.window_secs))
    }
}

// =============================================================================
// Sweeper Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Milliseconds between passes.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Most rows one pass touches per table.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: i64,
}

fn default_true() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

fn default_batch_limit() -> i64 {
    DEFAULT_SWEEP_BATCH_LIMIT
}

impl Default for SweeperSettings {
    fn default() -> Self {
        SweeperSettings {
            enabled: true,
            interval_ms: default_interval_ms(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl SweeperSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete marketplace configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub reservations: ReservationSettings,

    #[serde(default)]
    pub sweeper: SweeperSettings,
}

impl MarketConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (market.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> JobResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading market config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file without applying environment overrides.
    pub fn from_file(path: &std::path::Path) -> JobResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> JobResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> JobResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(JobError::InvalidConfig("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(JobError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.reservations.window_secs < 0 {
            return Err(JobError::InvalidConfig(
                "reservations.window_secs must not be negative".into(),
            ));
        }
        if self.sweeper.interval_ms == 0 {
            return Err(JobError::InvalidConfig(
                "sweeper.interval_ms must be greater than 0".into(),
            ));
        }
        if self.sweeper.batch_limit <= 0 {
            return Err(JobError::InvalidConfig(
                "sweeper.batch_limit must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Applies `SKINBAY_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("SKINBAY_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("SKINBAY_DATABASE_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %max, "Ignoring invalid SKINBAY_DATABASE_MAX_CONNECTIONS"),
            }
        }

        if let Some(secs) = var("SKINBAY_RESERVATION_WINDOW_SECS") {
            match secs.parse::<i64>() {
                Ok(secs) => {
                    debug!(window_secs = secs, "Overriding reservation window from environment");
                    self.reservations.window_secs = secs;
                }
                Err(_) => warn!(value = %secs, "Ignoring invalid SKINBAY_RESERVATION_WINDOW_SECS"),
            }
        }

        if let Some(enabled) = var("SKINBAY_SWEEPER_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.sweeper.enabled = true,
                "0" | "false" | "no" | "off" => self.sweeper.enabled = false,
                _ => warn!(value = %enabled, "Ignoring invalid SKINBAY_SWEEPER_ENABLED"),
            }
        }

        if let Some(ms) = var("SKINBAY_SWEEPER_INTERVAL_MS") {
            match ms.parse::<u64>() {
                Ok(ms) => self.sweeper.interval_ms = ms,
                Err(_) => warn!(value = %ms, "Ignoring invalid SKINBAY_SWEEPER_INTERVAL_MS"),
            }
        }

        if let Some(limit) = var("SKINBAY_SWEEPER_BATCH_LIMIT") {
            match limit.parse::<i64>() {
                Ok(limit) => self.sweeper.batch_limit = limit,
                Err(_) => warn!(value = %limit, "Ignoring invalid SKINBAY_SWEEPER_BATCH_LIMIT"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "skinbay", "market")
            .map(|dirs| dirs.config_dir().join("market.toml"))
    }

    /// Database settings in the shape the pool expects.
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .reservation_window(self.reservations.window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = MarketConfig::default();
        assert_eq!(config.reservations.window_secs, 900);
        assert_eq!(config.sweeper.interval_ms, 30_000);
        assert_eq!(config.sweeper.batch_limit, 500);
        assert!(config.sweeper.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MarketConfig::from_toml(
            r#"
            [reservations]
            window_secs = 0

            [sweeper]
            interval_ms = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.reservations.window(), None);
        assert_eq!(config.sweeper.interval(), Duration::from_secs(1));
        assert_eq!(config.sweeper.batch_limit, 500);
        assert_eq!(config.database.path, PathBuf::from("./skinbay.db"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = MarketConfig::from_toml("[sweeper]\ninterval_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, JobError::ConfigLoadFailed(_)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = MarketConfig::default();

        config.sweeper.batch_limit = 0;
        assert!(config.validate().is_err());

        config.sweeper.batch_limit = 10;
        config.sweeper.interval_ms = 0;
        assert!(config.validate().is_err());

        config.sweeper.interval_ms = 10;
        config.reservations.window_secs = -1;
        assert!(config.validate().is_err());

        config.reservations.window_secs = 60;
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SKINBAY_DATABASE_PATH", "/tmp/market.db"),
            ("SKINBAY_RESERVATION_WINDOW_SECS", "60"),
            ("SKINBAY_SWEEPER_ENABLED", "off"),
            ("SKINBAY_SWEEPER_BATCH_LIMIT", "many"),
        ]
        .into_iter()
        .collect();

        let mut config = MarketConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/market.db"));
        assert_eq!(config.reservations.window(), Some(chrono::Duration::seconds(60)));
        assert!(!config.sweeper.enabled);
        // Unparseable values leave the previous setting alone.
        assert_eq!(config.sweeper.batch_limit, 500);
    }

    #[test]
    fn test_to_db_config() {
        let mut config = MarketConfig::default();
        config.database.max_connections = 3;
        config.reservations.window_secs = 0;

        let db = config.to_db_config();
        assert_eq!(db.max_connections, 3);
        assert_eq!(db.policy.reservation_window, None);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&MarketConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[sweeper]"));
    }
}
