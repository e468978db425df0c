//! Directory layout of an installation.
//!
//! The installer writes the `DIR_*` constants into the generated config files
//! and the framework resolves option, language, and storage files from the
//! same layout, so both sides derive their paths from [`SitePaths`].

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// The two applications sharing one installation.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Application {
    /// The public storefront.
    #[default]
    Catalog,
    /// The back office.
    Admin,
}

impl Application {
    /// Directory name of the application under the installation root.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Admin => "admin",
        }
    }
}

/// Canonical paths below an installation root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    root: Utf8PathBuf,
}

impl SitePaths {
    /// Wraps an installation root.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The installation root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Code and assets of one application.
    #[must_use]
    pub fn application(&self, application: Application) -> Utf8PathBuf {
        self.root.join(application.dir_name())
    }

    /// Language files of one application.
    #[must_use]
    pub fn language(&self, application: Application) -> Utf8PathBuf {
        self.application(application).join("language")
    }

    /// Templates of one application.
    #[must_use]
    pub fn template(&self, application: Application) -> Utf8PathBuf {
        match application {
            Application::Catalog => self.application(application).join("view/theme"),
            Application::Admin => self.application(application).join("view/template"),
        }
    }

    /// Shared system directory.
    #[must_use]
    pub fn system(&self) -> Utf8PathBuf {
        self.root.join("system")
    }

    /// Database driver directory.
    #[must_use]
    pub fn database(&self) -> Utf8PathBuf {
        self.system().join("database")
    }

    /// Named option files loaded into the config table.
    #[must_use]
    pub fn config(&self) -> Utf8PathBuf {
        self.system().join("config")
    }

    /// Product and category images.
    #[must_use]
    pub fn image(&self) -> Utf8PathBuf {
        self.root.join("image")
    }

    /// Mutable runtime data.
    #[must_use]
    pub fn storage(&self) -> Utf8PathBuf {
        self.system().join("storage")
    }

    /// A named directory below [`Self::storage`].
    #[must_use]
    pub fn storage_dir(&self, name: &str) -> Utf8PathBuf {
        self.storage().join(name)
    }

    /// Directories the web server must be able to write to.
    #[must_use]
    pub fn writable_dirs(&self) -> Vec<Utf8PathBuf> {
        let mut dirs = vec![self.image()];
        dirs.extend(
            ["download", "upload", "cache", "logs", "modification"]
                .iter()
                .map(|name| self.storage_dir(name)),
        );
        dirs
    }

    /// The `DIR_*` constants of one application, in file order.
    ///
    /// Every value carries a trailing slash so consumers can append file
    /// names directly.
    #[must_use]
    pub fn constants(&self, application: Application) -> Vec<(&'static str, String)> {
        let mut constants = vec![
            ("DIR_APPLICATION", self.application(application)),
            ("DIR_SYSTEM", self.system()),
            ("DIR_DATABASE", self.database()),
            ("DIR_LANGUAGE", self.language(application)),
            ("DIR_TEMPLATE", self.template(application)),
            ("DIR_CONFIG", self.config()),
            ("DIR_IMAGE", self.image()),
            ("DIR_CACHE", self.storage_dir("cache")),
            ("DIR_DOWNLOAD", self.storage_dir("download")),
            ("DIR_UPLOAD", self.storage_dir("upload")),
            ("DIR_MODIFICATION", self.storage_dir("modification")),
            ("DIR_SESSION", self.storage_dir("session")),
            ("DIR_LOGS", self.storage_dir("logs")),
        ];
        if application == Application::Admin {
            constants.push(("DIR_CATALOG", self.application(Application::Catalog)));
        }
        constants
            .into_iter()
            .map(|(name, path)| (name, with_trailing_slash(path.as_str())))
            .collect()
    }

    /// Resolves the root to an absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`SitePathsError`] when the root does not exist or is not
    /// valid UTF-8 once canonicalised.
    pub fn canonicalize(&self) -> Result<Self, SitePathsError> {
        let resolved =
            fs::canonicalize(self.root.as_std_path()).map_err(|source| SitePathsError::Resolve {
                path: self.root.clone(),
                source,
            })?;
        let root = Utf8PathBuf::from_path_buf(resolved).map_err(|path| {
            SitePathsError::NonUtf8 {
                path: path.to_string_lossy().into_owned(),
            }
        })?;
        Ok(Self { root })
    }
}

/// Appends `/` unless the text already ends with one.
#[must_use]
pub fn with_trailing_slash(text: &str) -> String {
    if text.ends_with('/') {
        text.to_owned()
    } else {
        format!("{text}/")
    }
}

/// Errors raised while resolving an installation root.
#[derive(Debug, Error)]
pub enum SitePathsError {
    /// The root could not be canonicalised.
    #[error("failed to resolve installation root '{path}': {source}")]
    Resolve {
        /// Root as configured.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The canonical root is not valid UTF-8.
    #[error("installation root '{path}' is not valid UTF-8")]
    NonUtf8 {
        /// Lossy rendering of the offending path.
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_constants_end_with_slash() {
        let paths = SitePaths::new("/srv/shop");
        let constants = paths.constants(Application::Catalog);
        assert!(constants.iter().all(|(_, value)| value.ends_with('/')));
        assert!(
            constants
                .iter()
                .any(|(name, value)| *name == "DIR_APPLICATION" && value == "/srv/shop/catalog/")
        );
        assert!(!constants.iter().any(|(name, _)| *name == "DIR_CATALOG"));
    }

    #[test]
    fn admin_constants_point_back_to_catalog() {
        let paths = SitePaths::new("/srv/shop");
        let constants = paths.constants(Application::Admin);
        assert!(
            constants
                .iter()
                .any(|(name, value)| *name == "DIR_TEMPLATE"
                    && value == "/srv/shop/admin/view/template/")
        );
        assert!(
            constants
                .iter()
                .any(|(name, value)| *name == "DIR_CATALOG" && value == "/srv/shop/catalog/")
        );
    }

    #[test]
    fn writable_dirs_cover_image_and_storage() {
        let paths = SitePaths::new("/srv/shop");
        let dirs = paths.writable_dirs();
        assert_eq!(dirs.len(), 6);
        assert_eq!(dirs.first().map(|dir| dir.as_str()), Some("/srv/shop/image"));
    }

    #[test]
    fn trailing_slash_is_idempotent() {
        assert_eq!(with_trailing_slash("http://localhost/oc"), "http://localhost/oc/");
        assert_eq!(with_trailing_slash("http://localhost/oc/"), "http://localhost/oc/");
    }
}
