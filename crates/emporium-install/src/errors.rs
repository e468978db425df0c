//! Error types for the installer runtime.

use std::io;

use camino::Utf8PathBuf;
use emporium_config::SitePathsError;
use emporium_framework::services::DatabaseError;
use thiserror::Error;

/// Errors that stop an installation.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Arguments could not be parsed.
    #[error("{0}")]
    CliUsage(#[from] clap::Error),
    /// Required options were absent or malformed.
    #[error("FAILED! Following inputs were missing or invalid: {}", names.join(", "))]
    MissingOptions {
        /// Option names in validation order.
        names: Vec<&'static str>,
    },
    /// A pre-installation check failed.
    #[error("FAILED! Pre-installation check failed: {reason}")]
    Requirement {
        /// The first failing check.
        reason: String,
    },
    /// The installation root could not be resolved.
    #[error("FAILED!: {0}")]
    Root(#[from] SitePathsError),
    /// The schema file could not be read.
    #[error("FAILED!: could not load sql file '{path}': {source}")]
    Schema {
        /// Schema path.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// The database rejected a statement or could not be opened.
    #[error("FAILED!: {0}")]
    Database(#[from] DatabaseError),
    /// A configuration file could not be written.
    #[error("FAILED!: could not write '{path}': {source}")]
    WriteConfig {
        /// Target path.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// Storage permissions could not be applied.
    #[error("FAILED!: could not make '{path}' writable: {source}")]
    Permissions {
        /// Directory or file being changed.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    /// Creates a pre-installation failure.
    pub fn requirement(reason: impl Into<String>) -> Self {
        Self::Requirement {
            reason: reason.into(),
        }
    }

    /// Process exit status for the error.
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        match self {
            Self::CliUsage(_) => 2,
            _ => 1,
        }
    }
}
