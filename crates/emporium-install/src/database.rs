//! Database drivers available to the installer.
//!
//! The built-in `script` driver does not talk to a server. It appends every
//! statement to `system/storage/install.sql` so the import can be replayed
//! with a database client.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use emporium_config::SitePaths;
use emporium_framework::services::{
    Database, DatabaseConnector, DatabaseError, DbParams, QueryResult, escape_sql_literal,
};
use tracing::debug;

/// Name of the built-in script driver.
pub const SCRIPT_DRIVER: &str = "script";

/// File the script driver writes below the storage directory.
pub const SCRIPT_FILE: &str = "install.sql";

/// Drivers selectable with `--db_driver`.
#[derive(Clone, Default)]
pub struct DriverSet {
    connectors: HashMap<String, Arc<dyn DatabaseConnector>>,
}

impl DriverSet {
    /// The drivers shipped with the installer, writing below `paths`.
    #[must_use]
    pub fn builtin(paths: &SitePaths) -> Self {
        let script = paths.storage().join(SCRIPT_FILE);
        let connector = move |_: &DbParams| -> Result<Box<dyn Database>, DatabaseError> {
            let database = ScriptDatabase::create(&script)?;
            Ok(Box::new(database))
        };
        Self::default().with_driver(SCRIPT_DRIVER, Arc::new(connector))
    }

    /// Registers a connector under `name`.
    #[must_use]
    pub fn with_driver(mut self, name: impl Into<String>, connector: Arc<dyn DatabaseConnector>) -> Self {
        self.connectors.insert(name.into(), connector);
        self
    }

    /// Returns `true` when `name` has a connector.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.connectors.contains_key(name)
    }

    /// Opens a handle with the driver named in `params`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::UnknownDriver`] for unregistered drivers and
    /// the connector's error when it cannot connect.
    pub fn connect(&self, params: &DbParams) -> Result<Box<dyn Database>, DatabaseError> {
        let connector = self
            .connectors
            .get(&params.driver)
            .ok_or_else(|| DatabaseError::UnknownDriver {
                driver: params.driver.clone(),
            })?;
        connector.connect(params)
    }
}

impl std::fmt::Debug for DriverSet {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("DriverSet")
            .field("drivers", &self.connectors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Driver that records statements in a SQL script.
///
/// `last_id` counts the `INSERT` statements written for the table touched
/// by the most recent insert, which matches the auto-increment value a
/// fresh table would hand out.
#[derive(Debug)]
pub struct ScriptDatabase {
    path: Utf8PathBuf,
    file: File,
    inserts: HashMap<String, u64>,
    last_table: Option<String>,
}

impl ScriptDatabase {
    /// Truncates or creates the script at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Io`] when the file cannot be created.
    pub fn create(path: &Utf8Path) -> Result<Self, DatabaseError> {
        let io_error = |source| DatabaseError::Io {
            path: path.to_owned(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(io_error)?;
        Ok(Self {
            path: path.to_owned(),
            file,
            inserts: HashMap::new(),
            last_table: None,
        })
    }

    /// Script location.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Database for ScriptDatabase {
    fn query(&mut self, sql: &str) -> Result<QueryResult, DatabaseError> {
        let statement = sql.trim().trim_end_matches(';');
        writeln!(self.file, "{statement};").map_err(|source| DatabaseError::Io {
            path: self.path.clone(),
            source,
        })?;
        if let Some(table) = inserted_table(statement) {
            *self.inserts.entry(table.to_owned()).or_default() += 1;
            self.last_table = Some(table.to_owned());
        }
        debug!(target: "emporium::install", script = %self.path, "statement recorded");
        Ok(QueryResult::default())
    }

    fn escape(&self, value: &str) -> String {
        escape_sql_literal(value)
    }

    fn last_id(&self) -> u64 {
        self.last_table
            .as_ref()
            .and_then(|table| self.inserts.get(table))
            .copied()
            .unwrap_or_default()
    }
}

/// Table named by an `INSERT INTO` statement.
fn inserted_table(statement: &str) -> Option<&str> {
    let rest = statement.strip_prefix("INSERT INTO ")?;
    let name = rest.split_whitespace().next()?;
    Some(name.trim_matches('`'))
}
