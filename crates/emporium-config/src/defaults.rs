use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::paths::Application;

/// Log filter used when neither file, environment, nor flags supply one.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Upper bound on redirect hops followed by one dispatch.
pub const DEFAULT_MAX_REDIRECTS: usize = 8;

/// Owned log filter for serde defaults.
#[must_use]
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default log output format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Installation root used when none is configured: the working directory.
#[must_use]
pub fn default_root_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

/// Application served when none is configured.
#[must_use]
pub const fn default_application() -> Application {
    Application::Catalog
}

/// Redirect bound for serde defaults.
#[must_use]
pub const fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}
