//! # Settings
//!
//! Layered configuration: an optional TOML file, overridden by environment
//! variables prefixed with `TRADING_HISTORY` and separated by `__`. A `.env`
//! file is loaded into the environment first.
//!
//! ```text
//! TRADING_HISTORY__STORAGE__MODE=replicated
//! TRADING_HISTORY__STORAGE__RELATIONAL__CONNECTION_STRING=postgres://...
//! TRADING_HISTORY__STORAGE__TABLE_STORE__KIND=redis
//! TRADING_HISTORY__STORAGE__TABLE_STORE__CONNECTION_STRING=redis://...
//! ```
//!
//! # Examples
//!
//! ```
//! use trading_history::config::{Settings, StorageMode};
//!
//! let settings = Settings::from_toml(r#"
//!     [storage]
//!     mode = "table_store"
//!     [storage.table_store]
//!     kind = "in_memory"
//! "#).unwrap();
//! assert_eq!(settings.storage.mode, StorageMode::TableStore);
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default settings file, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "trading-history";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TRADING_HISTORY";

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_QUEUE_CAPACITY: usize = 1_024;

/// Error while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// The storage mode needs a section that is not configured.
    #[error("Storage mode {mode:?} requires the [storage.{section}] section")]
    MissingSection {
        /// Configured mode.
        mode: StorageMode,
        /// Missing section.
        section: &'static str,
    },

    /// A value is present but unusable.
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Which backends serve reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// PostgreSQL only.
    #[default]
    Relational,
    /// Table store only.
    TableStore,
    /// Reads from PostgreSQL; writes to PostgreSQL, then the table store.
    Replicated,
}

/// Table store implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStoreKind {
    /// Process-local storage.
    #[default]
    InMemory,
    /// Redis.
    Redis,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

/// PostgreSQL settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelationalSettings {
    /// Connection URL.
    pub connection_string: String,
    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Deadline of every storage operation, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl RelationalSettings {
    /// Returns the operation deadline.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Table store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableStoreSettings {
    /// Implementation.
    #[serde(default)]
    pub kind: TableStoreKind,
    /// Connection URL, required for Redis.
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Deadline of every storage operation, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl TableStoreSettings {
    /// Returns the operation deadline.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageSettings {
    /// Backend selection.
    #[serde(default)]
    pub mode: StorageMode,
    /// PostgreSQL section.
    #[serde(default)]
    pub relational: Option<RelationalSettings>,
    /// Table store section.
    #[serde(default)]
    pub table_store: Option<TableStoreSettings>,
    /// Capacity of the commission follow-up queue.
    #[serde(default = "default_queue_capacity")]
    pub commission_queue_capacity: usize,
}

impl StorageSettings {
    /// Returns the PostgreSQL section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSection` if it is not configured.
    pub fn relational(&self) -> Result<&RelationalSettings, ConfigError> {
        self.relational.as_ref().ok_or(ConfigError::MissingSection {
            mode: self.mode,
            section: "relational",
        })
    }

    /// Returns the table store section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSection` if it is not configured.
    pub fn table_store(&self) -> Result<&TableStoreSettings, ConfigError> {
        self.table_store.as_ref().ok_or(ConfigError::MissingSection {
            mode: self.mode,
            section: "table_store",
        })
    }

    /// Checks that the selected mode has what it needs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first missing or invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.mode, StorageMode::Relational | StorageMode::Replicated) {
            let relational = self.relational()?;
            if relational.connection_string.trim().is_empty() {
                return Err(ConfigError::Invalid("relational.connection_string is blank".into()));
            }
            if relational.max_connections == 0 {
                return Err(ConfigError::Invalid("relational.max_connections must be > 0".into()));
            }
            if relational.operation_timeout_ms == 0 {
                return Err(ConfigError::Invalid("relational.operation_timeout_ms must be > 0".into()));
            }
        }
        if matches!(self.mode, StorageMode::TableStore | StorageMode::Replicated) {
            let table_store = self.table_store()?;
            if table_store.kind == TableStoreKind::Redis
                && table_store
                    .connection_string
                    .as_deref()
                    .is_none_or(|s| s.trim().is_empty())
            {
                return Err(ConfigError::Invalid(
                    "table_store.connection_string is required for redis".into(),
                ));
            }
            if table_store.operation_timeout_ms == 0 {
                return Err(ConfigError::Invalid("table_store.operation_timeout_ms must be > 0".into()));
            }
        }
        if self.commission_queue_capacity == 0 {
            return Err(ConfigError::Invalid("commission_queue_capacity must be > 0".into()));
        }
        Ok(())
    }
}

/// Log output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LogSettings {
    /// Emit JSON lines instead of plain text.
    #[serde(default)]
    pub json: bool,
    /// Filter directives; `RUST_LOG` takes precedence.
    #[serde(default)]
    pub filter: Option<String>,
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Storage backends.
    pub storage: StorageSettings,
    /// Logging.
    #[serde(default)]
    pub log: LogSettings,
}

impl Settings {
    /// Loads `.env`, the settings file and the environment.
    ///
    /// Without `path`, `trading-history.{toml,...}` in the working directory
    /// is used if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source is malformed or the result does
    /// not validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(ConfigError::Invalid(format!(".env: {e}")));
            }
        }

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };
        let raw = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Self::from_config(raw)
    }

    /// Parses settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is malformed or does not
    /// validate.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        let raw = config::Config::builder()
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?;
        Self::from_config(raw)
    }

    fn from_config(raw: config::Config) -> Result<Self, ConfigError> {
        let settings: Self = raw.try_deserialize()?;
        settings.storage.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod parsing {
        use super::*;

        #[test]
        fn relational_with_defaults() {
            let settings = Settings::from_toml(
                r#"
                [storage]
                mode = "relational"
                [storage.relational]
                connection_string = "postgres://localhost/history"
                "#,
            )
            .unwrap();
            let relational = settings.storage.relational().unwrap();
            assert_eq!(relational.max_connections, DEFAULT_MAX_CONNECTIONS);
            assert_eq!(relational.operation_timeout(), Duration::from_secs(5));
            assert_eq!(settings.storage.commission_queue_capacity, DEFAULT_QUEUE_CAPACITY);
            assert!(!settings.log.json);
        }

        #[test]
        fn replicated_with_redis() {
            let settings = Settings::from_toml(
                r#"
                [storage]
                mode = "replicated"
                commission_queue_capacity = 16
                [storage.relational]
                connection_string = "postgres://localhost/history"
                operation_timeout_ms = 250
                [storage.table_store]
                kind = "redis"
                connection_string = "redis://localhost:6379"
                [log]
                json = true
                "#,
            )
            .unwrap();
            assert_eq!(settings.storage.mode, StorageMode::Replicated);
            assert_eq!(settings.storage.table_store().unwrap().kind, TableStoreKind::Redis);
            assert_eq!(
                settings.storage.relational().unwrap().operation_timeout(),
                Duration::from_millis(250)
            );
            assert!(settings.log.json);
        }

        #[test]
        fn mode_defaults_to_relational() {
            let err = Settings::from_toml("[storage]\ncommission_queue_capacity = 8\n").unwrap_err();
            assert!(matches!(
                err,
                ConfigError::MissingSection {
                    mode: StorageMode::Relational,
                    section: "relational"
                }
            ));
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn replicated_requires_table_store() {
            let err = Settings::from_toml(
                r#"
                [storage]
                mode = "replicated"
                [storage.relational]
                connection_string = "postgres://localhost/history"
                "#,
            )
            .unwrap_err();
            assert!(err.to_string().contains("table_store"));
        }

        #[test]
        fn redis_requires_connection_string() {
            let err = Settings::from_toml(
                r#"
                [storage]
                mode = "table_store"
                [storage.table_store]
                kind = "redis"
                "#,
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
        }

        #[test]
        fn zero_operation_timeout_is_rejected() {
            let relational = Settings::from_toml(
                r#"
                [storage]
                mode = "relational"
                [storage.relational]
                connection_string = "postgres://localhost/history"
                operation_timeout_ms = 0
                "#,
            )
            .unwrap_err();
            assert!(relational.to_string().contains("relational.operation_timeout_ms"));

            let table_store = Settings::from_toml(
                r#"
                [storage]
                mode = "table_store"
                [storage.table_store]
                kind = "in_memory"
                operation_timeout_ms = 0
                "#,
            )
            .unwrap_err();
            assert!(table_store.to_string().contains("table_store.operation_timeout_ms"));
        }

        #[test]
        fn unknown_mode_is_a_load_error() {
            let err = Settings::from_toml("[storage]\nmode = \"sharded\"\n").unwrap_err();
            assert!(matches!(err, ConfigError::Load(_)));
        }
    }
}
