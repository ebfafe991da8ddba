//! Storage configuration.
//!
//! Configuration is loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `TABLESTORE_DATA_DIRECTORY`: Directory holding one sub-directory per database (default: `./data`)
//! - `TABLESTORE_DATABASE`: Database used by the demo binary (default: `demo`)
//! - `TABLESTORE_SYNC_WRITES`: `true`/`false`, fsync after every mutating operation (default: `false`)
//!
//! # Invariants
//!
//! - `data_directory` is always a valid path (may not exist yet)
//! - `database` is never empty and never contains a path separator

use std::path::PathBuf;

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory where databases live.
    /// Each table is stored at `{data_directory}/{database}/{table}.HAD`.
    pub data_directory: PathBuf,
    /// Database the demo binary works against.
    pub database: String,
    /// Whether to fsync the table file after every insert, update and delete.
    pub sync_writes: bool,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from(Self::DEFAULT_DATA_DIRECTORY),
            database: Self::DEFAULT_DATABASE.to_string(),
            sync_writes: false,
        }
    }
}

impl StorageConfig {
    /// Default data directory.
    pub const DEFAULT_DATA_DIRECTORY: &'static str = "./data";
    /// Default database name.
    pub const DEFAULT_DATABASE: &'static str = "demo";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `TABLESTORE_DATABASE` is set but empty or contains a path separator
    /// - `TABLESTORE_SYNC_WRITES` is set but not a boolean
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_directory = lookup("TABLESTORE_DATA_DIRECTORY")
            .map_or_else(|| PathBuf::from(Self::DEFAULT_DATA_DIRECTORY), PathBuf::from);
        let database = Self::parse_database(lookup("TABLESTORE_DATABASE"))?;
        let sync_writes = Self::parse_sync_writes(lookup("TABLESTORE_SYNC_WRITES"))?;

        Ok(Self {
            data_directory,
            database,
            sync_writes,
        })
    }

    fn parse_database(value: Option<String>) -> Result<String, ConfigError> {
        let Some(name) = value else {
            return Ok(Self::DEFAULT_DATABASE.to_string());
        };

        if name.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "TABLESTORE_DATABASE".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                name: "TABLESTORE_DATABASE".to_string(),
                message: format!("'{name}' must not contain a path separator"),
            });
        }

        Ok(name)
    }

    fn parse_sync_writes(value: Option<String>) -> Result<bool, ConfigError> {
        match value.as_deref() {
            None => Ok(false),
            Some("1" | "true" | "TRUE" | "yes") => Ok(true),
            Some("0" | "false" | "FALSE" | "no") => Ok(false),
            Some(other) => Err(ConfigError::InvalidValue {
                name: "TABLESTORE_SYNC_WRITES".to_string(),
                message: format!("'{other}' is not a boolean"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = StorageConfig::from_lookup(lookup(&[])).expect("defaults");
        assert_eq!(config, StorageConfig::default());
        assert_eq!(config.data_directory, PathBuf::from("./data"));
        assert_eq!(config.database, "demo");
        assert!(!config.sync_writes);
    }

    #[test]
    fn test_overrides() {
        let config = StorageConfig::from_lookup(lookup(&[
            ("TABLESTORE_DATA_DIRECTORY", "/tmp/tables"),
            ("TABLESTORE_DATABASE", "shop"),
            ("TABLESTORE_SYNC_WRITES", "true"),
        ]))
        .expect("valid config");
        assert_eq!(config.data_directory, PathBuf::from("/tmp/tables"));
        assert_eq!(config.database, "shop");
        assert!(config.sync_writes);
    }

    #[test]
    fn test_invalid_values() {
        let err = StorageConfig::from_lookup(lookup(&[("TABLESTORE_DATABASE", "a/b")]))
            .expect_err("separator rejected");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = StorageConfig::from_lookup(lookup(&[("TABLESTORE_SYNC_WRITES", "maybe")]))
            .expect_err("non-boolean rejected");
        assert_eq!(
            err.to_string(),
            "invalid value for TABLESTORE_SYNC_WRITES: 'maybe' is not a boolean"
        );
    }
}
