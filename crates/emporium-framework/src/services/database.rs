//! Database driver interface.
//!
//! The framework ships no driver of its own. A [`DatabaseConnector`] is
//! registered per driver name and opens one [`Database`] handle per request
//! when `db_autostart` is on.

use camino::Utf8PathBuf;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config_table::ConfigTable;

/// Driver name used when `db_engine` is not configured.
pub const DEFAULT_DRIVER: &str = "mysqli";

/// Errors raised by database drivers.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// No connector is registered for the driver.
    #[error("database driver '{driver}' is not available")]
    UnknownDriver {
        /// Requested driver name.
        driver: String,
    },
    /// The driver could not connect.
    #[error("could not connect to database '{database}' on {hostname}: {message}")]
    Connect {
        /// Host that was contacted.
        hostname: String,
        /// Database that was opened.
        database: String,
        /// Driver supplied description.
        message: String,
    },
    /// A statement failed.
    #[error("query failed: {message}")]
    Query {
        /// Driver supplied description.
        message: String,
        /// Statement that failed.
        sql: String,
    },
    /// A file-backed driver could not write its output.
    #[error("failed to write '{path}': {source}")]
    Io {
        /// File being written.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

impl DatabaseError {
    /// Creates a query failure.
    pub fn query(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: sql.into(),
        }
    }
}

/// Rows and counters returned by a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Result rows; empty for statements that return none.
    pub rows: Vec<Map<String, Value>>,
    /// Rows changed by the statement.
    pub affected: u64,
}

impl QueryResult {
    /// First row, if any.
    #[must_use]
    pub fn row(&self) -> Option<&Map<String, Value>> {
        self.rows.first()
    }

    /// Number of result rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Open database handle.
#[cfg_attr(test, mockall::automock)]
pub trait Database: Send {
    /// Runs one statement.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the statement fails.
    fn query(&mut self, sql: &str) -> Result<QueryResult, DatabaseError>;

    /// Escapes a value for use inside a single-quoted SQL literal.
    fn escape(&self, value: &str) -> String;

    /// Identifier generated by the most recent insert.
    fn last_id(&self) -> u64;
}

/// Connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbParams {
    /// Driver name.
    pub driver: String,
    /// Host name.
    pub hostname: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Database name.
    pub database: String,
    /// TCP port.
    pub port: u16,
}

impl Default for DbParams {
    fn default() -> Self {
        Self {
            driver: String::from(DEFAULT_DRIVER),
            hostname: String::from("localhost"),
            username: String::new(),
            password: String::new(),
            database: String::new(),
            port: 3306,
        }
    }
}

impl DbParams {
    /// Reads `db_engine`, `db_hostname`, `db_username`, `db_password`,
    /// `db_database`, and `db_port`, keeping defaults for missing keys.
    #[must_use]
    pub fn from_config(config: &ConfigTable) -> Self {
        let defaults = Self::default();
        let text = |key: &str, fallback: String| {
            config.get_str(key).map_or(fallback, str::to_owned)
        };
        Self {
            driver: text("db_engine", defaults.driver),
            hostname: text("db_hostname", defaults.hostname),
            username: text("db_username", defaults.username),
            password: text("db_password", defaults.password),
            database: text("db_database", defaults.database),
            port: config
                .get_int("db_port")
                .and_then(|port| u16::try_from(port).ok())
                .unwrap_or(defaults.port),
        }
    }
}

/// Opens database handles for one driver.
pub trait DatabaseConnector: Send + Sync {
    /// Connects using `params`.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`] when the connection cannot be made.
    fn connect(&self, params: &DbParams) -> Result<Box<dyn Database>, DatabaseError>;
}

impl<F> DatabaseConnector for F
where
    F: Fn(&DbParams) -> Result<Box<dyn Database>, DatabaseError> + Send + Sync,
{
    fn connect(&self, params: &DbParams) -> Result<Box<dyn Database>, DatabaseError> {
        self(params)
    }
}

/// Escapes a value the way MySQL's `real_escape_string` does.
#[must_use]
pub fn escape_sql_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\u{1a}' => escaped.push_str("\\Z"),
            other => escaped.push(other),
        }
    }
    escaped
}
