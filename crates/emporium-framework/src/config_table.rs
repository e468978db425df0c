//! Request-scoped application configuration.
//!
//! Option files are TOML documents under `system/config/`. Each load merges
//! the file's top-level keys into the table, so later loads override earlier
//! keys with the same name. Table iteration keeps file order.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use toml::{Table, Value};

use crate::route::RouteId;

/// Errors raised while loading option files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The option name sanitised to nothing.
    #[error("invalid option file name '{name}'")]
    InvalidName {
        /// Name as requested.
        name: String,
    },
    /// The option file does not exist.
    #[error("could not load config '{name}': {path} does not exist")]
    Missing {
        /// Name as requested.
        name: String,
        /// Path that was probed.
        path: Utf8PathBuf,
    },
    /// The option file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Read {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The option file is not valid TOML.
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        /// Path that was parsed.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Hierarchical key/value store with additive loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTable {
    values: Table,
}

impl ConfigTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a table from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let values = text.parse::<Table>().map_err(|source| ConfigError::Parse {
            path: Utf8PathBuf::from("<inline>"),
            source,
        })?;
        Ok(Self { values })
    }

    /// Loads `<dir>/<name>.toml` and merges it over the current values.
    ///
    /// The name is sanitised like a route so it cannot leave `dir`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the name is empty after sanitising or
    /// the file is missing, unreadable, or malformed.
    pub fn load(&mut self, dir: &Utf8Path, name: &str) -> Result<(), ConfigError> {
        let file_name = RouteId::sanitize(name).ok_or_else(|| ConfigError::InvalidName {
            name: name.to_owned(),
        })?;
        let path = dir.join(format!("{}.toml", file_name.as_str()));
        if !path.is_file() {
            return Err(ConfigError::Missing {
                name: name.to_owned(),
                path,
            });
        }
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let table = text
            .parse::<Table>()
            .map_err(|source| ConfigError::Parse { path, source })?;
        self.merge(table);
        Ok(())
    }

    /// Merges top-level keys of `table`, overriding existing keys.
    pub fn merge(&mut self, table: Table) {
        for (key, value) in table {
            self.values.insert(key, value);
        }
    }

    /// Returns `true` when `key` is present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Stores `value` under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the string stored under `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns the integer stored under `key`.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_integer)
    }

    /// Evaluates `key` as a switch.
    ///
    /// Missing keys, `false`, zero, empty strings, `"0"`, and empty
    /// collections are off; everything else is on.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        match self.get(key) {
            None => false,
            Some(Value::Boolean(flag)) => *flag,
            Some(Value::Integer(number)) => *number != 0,
            Some(Value::Float(number)) => number.is_normal(),
            Some(Value::String(text)) => !text.is_empty() && text != "0",
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Table(table)) => !table.is_empty(),
            Some(Value::Datetime(_)) => true,
        }
    }

    /// Returns the string items of the array stored under `key`.
    ///
    /// A single string is treated as a one-item list. Non-string items are
    /// skipped.
    #[must_use]
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            Some(Value::String(text)) => vec![text.clone()],
            _ => Vec::new(),
        }
    }

    /// Returns the nested table stored under `key`.
    #[must_use]
    pub fn get_table(&self, key: &str) -> Option<&Table> {
        self.get(key).and_then(Value::as_table)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
