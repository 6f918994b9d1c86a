//! # CLI Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DEPOT_DB_PATH=/srv/depot/depot.db                                  │
//! │     DEPOT_MAX_CONNECTIONS=8                                            │
//! │     DEPOT_LOG_LEVEL=debug                                              │
//! │     DEPOT_OPERATOR=<user id>                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/depot/depot.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.depot.depot/depot.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # depot.toml
//! operator = "6f1c0e2a-..."   # default operator for write commands
//!
//! [database]
//! path = "/srv/depot/depot.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [log]
//! level = "info"   # any EnvFilter directive, e.g. "depot_db=debug,info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use depot_db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

/// Store location and pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; created on first use.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the SQLite write lock.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("depot.db"))
        .unwrap_or_else(|| PathBuf::from("./depot.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Log filter used when `RUST_LOG` is not set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: default_log_level(),
        }
    }
}

// =============================================================================
// Depot Config
// =============================================================================

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepotConfig {
    /// Operator recorded on write commands that omit `--operator`.
    #[serde(default)]
    pub operator: Option<String>,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub log: LogSettings,
}

impl DepotConfig {
    /// Loads configuration from file and environment.
    ///
    /// ## Arguments
    /// * `config_path` - Explicit file; it must exist. When `None`, the
    ///   platform config file is used if present.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies `DEPOT_*` overrides read through `lookup`.
    fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup("DEPOT_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("DEPOT_MAX_CONNECTIONS") {
            self.database.max_connections = max
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DEPOT_MAX_CONNECTIONS".to_string()))?;
        }

        if let Some(level) = lookup("DEPOT_LOG_LEVEL") {
            self.log.level = level;
        }

        if let Some(operator) = lookup("DEPOT_OPERATOR") {
            self.operator = Some(operator);
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if EnvFilter::try_new(&self.log.level).is_err() {
            return Err(ConfigError::Invalid(format!(
                "log.level is not a valid filter: {}",
                self.log.level
            )));
        }

        if matches!(&self.operator, Some(op) if op.trim().is_empty()) {
            return Err(ConfigError::Invalid("operator must not be blank".into()));
        }

        Ok(())
    }

    /// Pool settings for [`depot_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .min_connections(1)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("depot.toml"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "depot", "depot")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = DepotConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.log.level, "info");
        assert!(config.operator.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: DepotConfig = toml::from_str(
            r#"
            operator = "keeper"

            [database]
            path = "/tmp/depot.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.operator.as_deref(), Some("keeper"));
        assert_eq!(config.database.path, PathBuf::from("/tmp/depot.db"));
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DepotConfig::default();
        config
            .apply_env_overrides(env(&[
                ("DEPOT_DB_PATH", "/srv/depot.db"),
                ("DEPOT_MAX_CONNECTIONS", "8"),
                ("DEPOT_LOG_LEVEL", "depot_db=debug"),
                ("DEPOT_OPERATOR", "op-1"),
            ]))
            .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/srv/depot.db"));
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.log.level, "depot_db=debug");
        assert_eq!(config.operator.as_deref(), Some("op-1"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_max_connections_override() {
        let mut config = DepotConfig::default();
        let err = config
            .apply_env_overrides(env(&[("DEPOT_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for DEPOT_MAX_CONNECTIONS");
    }

    #[test]
    fn test_validation() {
        let mut config = DepotConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 1;
        config.operator = Some("  ".to_string());
        assert!(config.validate().is_err());

        config.operator = None;
        config.log.level = "depot=loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depot.toml");
        std::fs::write(&path, "[database]\nmax_connections = 3\n").unwrap();

        let config = DepotConfig::from_file(&path).unwrap();
        assert_eq!(config.database.max_connections, 3);

        let err = DepotConfig::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_db_config() {
        let mut config = DepotConfig::default();
        config.database.path = PathBuf::from("/tmp/x.db");
        config.database.busy_timeout_ms = 250;

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
        assert!(db.run_migrations);
    }
}
