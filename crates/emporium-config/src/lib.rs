//! Process settings shared by the emporium binaries.
//!
//! [`Settings`] is layered by `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path` or `EMPORIUM_CONFIG_PATH`), then
//! `EMPORIUM_*` environment variables, then command-line flags. These are the
//! knobs of the process itself. The per-request option files that drive
//! dispatch live under [`SitePaths::config`] and are read by the framework.

mod defaults;
mod logging;
mod paths;

use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_REDIRECTS, default_application, default_log_filter,
    default_log_format, default_max_redirects, default_root_dir,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use paths::{Application, SitePaths, SitePathsError, with_trailing_slash};

/// Resolved process settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "EMPORIUM")]
pub struct Settings {
    /// Installation root holding `system/`, `catalog/` and `admin/`.
    #[serde(default = "default_root_dir")]
    pub root_dir: Utf8PathBuf,
    /// Application served by this process.
    #[serde(default = "default_application")]
    pub application: Application,
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Redirect hops a single dispatch may follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            application: default_application(),
            log_filter: default_log_filter(),
            log_format: default_log_format(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl Settings {
    /// Directory layout below [`Self::root_dir`].
    #[must_use]
    pub fn site_paths(&self) -> SitePaths {
        SitePaths::new(self.root_dir.clone())
    }

    /// Filter expression handed to the subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Selected log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Abstraction over settings loading so binaries can be driven from tests.
pub trait SettingsLoader: Send + Sync {
    /// Loads the process settings.
    ///
    /// # Errors
    ///
    /// Returns the aggregated `ortho_config` error when a layer is malformed.
    fn load(&self) -> Result<Settings, Arc<OrthoError>>;
}

/// Loader reading the real process arguments and environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSettingsLoader;

impl SettingsLoader for SystemSettingsLoader {
    fn load(&self) -> Result<Settings, Arc<OrthoError>> {
        Settings::load()
    }
}

/// Loader returning a fixed value.
#[derive(Debug, Default, Clone)]
pub struct StaticSettingsLoader {
    settings: Settings,
}

impl StaticSettingsLoader {
    /// Wraps pre-built settings.
    #[must_use]
    pub const fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl SettingsLoader for StaticSettingsLoader {
    fn load(&self) -> Result<Settings, Arc<OrthoError>> {
        Ok(self.settings.clone())
    }
}
