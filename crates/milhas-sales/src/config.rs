//! # Engine Configuration
//!
//! Settings are layered, each layer overriding the one before:
//!
//! ```text
//! defaults ──► milhas.toml ──► MILHAS_* environment variables
//!
//! milhas.toml lives in the platform config dir, e.g.
//!   ~/.config/milhas-desk/milhas.toml
//!   ~/Library/Application Support/br.milhas.milhas-desk/milhas.toml
//!
//! MILHAS_DB_PATH               database.path
//! MILHAS_DB_MAX_CONNECTIONS    database.max_connections
//! MILHAS_ACCESS_MAX_ATTEMPTS   access.max_attempts
//! MILHAS_LOG                   logging.filter
//! ```
//!
//! ## Example File
//! ```toml
//! [database]
//! path = "/var/lib/milhas/milhas.db"
//! max_connections = 5
//!
//! [access]
//! max_attempts = 3
//! initial_backoff_ms = 250
//! max_backoff_secs = 5
//!
//! [logging]
//! filter = "info,milhas=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::access::RetryPolicy;
use crate::error::{SalesError, SalesResult};
use crate::telemetry::DEFAULT_LOG_FILTER;
use milhas_db::DbConfig;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file; created on first start.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("br", "milhas", "milhas-desk")
        .map(|dirs| dirs.data_dir().join("milhas.db"))
        .unwrap_or_else(|| PathBuf::from("milhas.db"))
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
// Access Settings
// =============================================================================

/// Retry budget for the subscription check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSettings {
    /// Total attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    250
}
fn default_max_backoff() -> u64 {
    5
}

impl Default for AccessSettings {
    fn default() -> Self {
        AccessSettings {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives; `RUST_LOG` still wins at runtime.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Engine Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub access: AccessSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Defaults, then `config_path` (or the platform default) if it exists,
    /// then the environment. The result is validated.
    pub fn load(config_path: Option<PathBuf>) -> SalesResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Like [`EngineConfig::load`], falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!(error = %e, "Engine config unusable, falling back to defaults");
            Self::default()
        })
    }

    /// Writes the config as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> SalesResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SalesError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    pub fn validate(&self) -> SalesResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(SalesError::Config("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(SalesError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.access.max_attempts == 0 {
            return Err(SalesError::Config(
                "access.max_attempts must be greater than 0".into(),
            ));
        }
        if self.access.initial_backoff_ms > self.access.max_backoff_secs.saturating_mul(1000) {
            return Err(SalesError::Config(
                "access.initial_backoff_ms exceeds access.max_backoff_secs".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("MILHAS_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("MILHAS_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid MILHAS_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(attempts) = var("MILHAS_ACCESS_MAX_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(n) => self.access.max_attempts = n,
                Err(_) => warn!(value = %attempts, "Ignoring invalid MILHAS_ACCESS_MAX_ATTEMPTS"),
            }
        }

        if let Some(filter) = var("MILHAS_LOG") {
            self.logging.filter = filter;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("br", "milhas", "milhas-desk")
            .map(|dirs| dirs.config_dir().join("milhas.toml"))
    }

    // =========================================================================
    // Derived settings
    // =========================================================================

    /// Pool configuration for [`milhas_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.access.max_attempts,
            initial_backoff: Duration::from_millis(self.access.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.access.max_backoff_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("milhas-{}-{name}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.access.max_attempts, 3);
        assert_eq!(config.logging.filter, "info,milhas=debug,sqlx=warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(SalesError::Config(_))));

        config.database.max_connections = 1;
        config.access.max_attempts = 0;
        assert!(config.validate().is_err());

        config.access.max_attempts = 1;
        config.access.initial_backoff_ms = 10_000;
        config.access.max_backoff_secs = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/vendas.db"

            [access]
            max_attempts = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/vendas.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.access.max_attempts, 7);
        assert_eq!(config.access.initial_backoff_ms, 250);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MILHAS_DB_PATH", "/srv/milhas.db"),
            ("MILHAS_DB_MAX_CONNECTIONS", "not-a-number"),
            ("MILHAS_ACCESS_MAX_ATTEMPTS", "6"),
            ("MILHAS_LOG", "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/srv/milhas.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.access.max_attempts, 6);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_save_and_load_file() {
        let path = temp_path("milhas.toml");
        let mut config = EngineConfig::default();
        config.database.path = PathBuf::from("/data/milhas.db");
        config.access.max_backoff_secs = 30;

        config.save(Some(path.clone())).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[database]"));
        assert!(contents.contains("[access]"));

        let loaded: EngineConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let path = temp_path("broken.toml");
        std::fs::write(&path, "[database\npath = ").unwrap();

        let err = EngineConfig::load(Some(path.clone())).unwrap_err();
        assert!(matches!(err, SalesError::Config(_)));

        assert_eq!(EngineConfig::load_or_default(Some(path.clone())).access.max_attempts, 3);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = EngineConfig::default().retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
        assert_eq!(policy.max_backoff, Duration::from_secs(5));
    }
}
