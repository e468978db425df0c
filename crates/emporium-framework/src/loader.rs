//! Named resources a controller can load on demand.
//!
//! Libraries and models come from a [`ResourceCatalog`] of factories
//! registered at startup. Option files and language files come from the
//! installation directory layout.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use emporium_config::{Application, SitePaths};
use thiserror::Error;

use crate::config_table::ConfigError;
use crate::context::Context;
use crate::route::RouteId;

/// Errors raised while loading resources.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing of this kind is registered under the name.
    #[error("could not load {kind} '{name}': not registered")]
    Unknown {
        /// Resource kind.
        kind: &'static str,
        /// Requested name.
        name: String,
    },
    /// A resource file does not exist.
    #[error("could not load '{path}': file does not exist")]
    Missing {
        /// Path that was probed.
        path: Utf8PathBuf,
    },
    /// A resource file could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// A resource file is not valid TOML.
    #[error("failed to parse '{path}': {source}")]
    Parse {
        /// Path that was parsed.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
    /// An option file failed to load.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A factory could not build its resource.
    #[error("could not build {kind} '{name}': {message}")]
    Build {
        /// Resource kind.
        kind: &'static str,
        /// Requested name.
        name: String,
        /// Factory supplied description.
        message: String,
    },
    /// A factory panicked while building its resource.
    #[error("{kind} '{name}' panicked while loading: {message}")]
    Panicked {
        /// Resource kind.
        kind: &'static str,
        /// Requested name.
        name: String,
        /// Panic payload rendered as text.
        message: String,
    },
}

impl LoadError {
    /// Creates an unknown-resource error.
    pub fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Unknown {
            kind,
            name: name.into(),
        }
    }

    /// Returns `true` when the error means the file does not exist.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(
            self,
            Self::Missing { .. } | Self::Config(ConfigError::Missing { .. })
        )
    }
}

/// Type-erased factory building a library or model instance.
pub type Factory = Arc<dyn Fn(&mut Context) -> Result<Box<dyn Any>, LoadError> + Send + Sync>;

/// Factories for libraries and models, frozen at startup.
#[derive(Default)]
pub struct ResourceCatalog {
    libraries: HashMap<String, Factory>,
    models: HashMap<String, Factory>,
}

impl ResourceCatalog {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> ResourceCatalogBuilder {
        ResourceCatalogBuilder::default()
    }

    fn library(&self, name: &str) -> Option<Factory> {
        self.libraries.get(name).cloned()
    }

    fn model(&self, route: &str) -> Option<Factory> {
        self.models.get(route).cloned()
    }
}

impl fmt::Debug for ResourceCatalog {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut libraries: Vec<&str> = self.libraries.keys().map(String::as_str).collect();
        let mut models: Vec<&str> = self.models.keys().map(String::as_str).collect();
        libraries.sort_unstable();
        models.sort_unstable();
        formatter
            .debug_struct("ResourceCatalog")
            .field("libraries", &libraries)
            .field("models", &models)
            .finish()
    }
}

/// Collects resource factories.
#[derive(Default)]
pub struct ResourceCatalogBuilder {
    libraries: HashMap<String, Factory>,
    models: HashMap<String, Factory>,
}

impl ResourceCatalogBuilder {
    /// Registers a library factory under a sanitised route-like name.
    #[must_use]
    pub fn library<T, F>(mut self, name: &str, factory: F) -> Self
    where
        T: Any,
        F: Fn(&mut Context) -> Result<T, LoadError> + Send + Sync + 'static,
    {
        if let Some(name) = RouteId::sanitize(name) {
            self.libraries.insert(name.to_string(), erase(factory));
        }
        self
    }

    /// Registers a model factory under a sanitised route.
    #[must_use]
    pub fn model<T, F>(mut self, route: &str, factory: F) -> Self
    where
        T: Any,
        F: Fn(&mut Context) -> Result<T, LoadError> + Send + Sync + 'static,
    {
        if let Some(route) = RouteId::sanitize(route) {
            self.models.insert(route.to_string(), erase(factory));
        }
        self
    }

    /// Freezes the catalog.
    #[must_use]
    pub fn build(self) -> ResourceCatalog {
        ResourceCatalog {
            libraries: self.libraries,
            models: self.models,
        }
    }
}

fn erase<T, F>(factory: F) -> Factory
where
    T: Any,
    F: Fn(&mut Context) -> Result<T, LoadError> + Send + Sync + 'static,
{
    Arc::new(move |ctx: &mut Context| factory(ctx).map(|value| Box::new(value) as Box<dyn Any>))
}

/// Registry name for a loaded library: its final path segment.
#[must_use]
pub fn library_key(name: &RouteId) -> String {
    name.split_last()
        .map_or_else(|| name.to_string(), |(_, last)| last.to_owned())
}

/// Registry name for a loaded model: `model_` plus the route with `/`
/// replaced by `_`.
#[must_use]
pub fn model_key(route: &RouteId) -> String {
    format!("model_{}", route.as_str().replace('/', "_"))
}

/// Resolves resources for one application.
#[derive(Debug, Clone)]
pub struct Loader {
    catalog: Arc<ResourceCatalog>,
    paths: SitePaths,
    application: Application,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(
            Arc::new(ResourceCatalog::default()),
            SitePaths::new("."),
            Application::Catalog,
        )
    }
}

impl Loader {
    /// Creates a loader over a catalog and an installation layout.
    #[must_use]
    pub fn new(catalog: Arc<ResourceCatalog>, paths: SitePaths, application: Application) -> Self {
        Self {
            catalog,
            paths,
            application,
        }
    }

    /// Installation layout.
    #[must_use]
    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    /// Application being served.
    #[must_use]
    pub const fn application(&self) -> Application {
        self.application
    }

    /// Factory for a library.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Unknown`] when no factory is registered.
    pub fn library_factory(&self, name: &RouteId) -> Result<Factory, LoadError> {
        self.catalog
            .library(name.as_str())
            .ok_or_else(|| LoadError::unknown("library", name.as_str()))
    }

    /// Factory for a model.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Unknown`] when no factory is registered.
    pub fn model_factory(&self, route: &RouteId) -> Result<Factory, LoadError> {
        self.catalog
            .model(route.as_str())
            .ok_or_else(|| LoadError::unknown("model", route.as_str()))
    }

    /// Path of a language file: `<app>/language/<code>/<name>.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Unknown`] when the code or name sanitise to
    /// nothing.
    pub fn language_file(&self, code: &str, name: &str) -> Result<Utf8PathBuf, LoadError> {
        let code = sanitize_language_code(code)
            .ok_or_else(|| LoadError::unknown("language", code))?;
        let name = RouteId::sanitize(name).ok_or_else(|| LoadError::unknown("language", name))?;
        Ok(self
            .paths
            .language(self.application)
            .join(code)
            .join(format!("{}.toml", name.as_str())))
    }

    /// Reads and parses a language file.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when the file is missing, unreadable, or
    /// malformed.
    pub fn read_language(&self, code: &str, name: &str) -> Result<toml::Table, LoadError> {
        let path = self.language_file(code, name)?;
        if !path.is_file() {
            return Err(LoadError::Missing { path });
        }
        let text = fs::read_to_string(&path).map_err(|source| LoadError::Read {
            path: path.clone(),
            source,
        })?;
        text.parse::<toml::Table>()
            .map_err(|source| LoadError::Parse { path, source })
    }
}

fn sanitize_language_code(code: &str) -> Option<String> {
    let kept: String = code
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!kept.is_empty()).then_some(kept)
}
