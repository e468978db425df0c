//! Named store for request-scoped extension services.
//!
//! Core services live in typed fields of [`crate::Context`]. Anything a
//! module, library, or model wants to share with later code is stored here
//! under a name. Storing under an existing name replaces the previous value.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Errors raised when retrieving a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Nothing is stored under the name.
    #[error("no service registered as '{name}'")]
    NotFound {
        /// Name that was looked up.
        name: String,
    },
    /// An entry exists but holds a different type.
    #[error("service '{name}' is not a {expected}")]
    TypeMismatch {
        /// Name that was looked up.
        name: String,
        /// Type the caller asked for.
        expected: &'static str,
    },
}

impl RegistryError {
    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    fn type_mismatch<T>(name: &str) -> Self {
        Self::TypeMismatch {
            name: name.to_owned(),
            expected: type_name::<T>(),
        }
    }
}

/// Type-erased, last-writer-wins service store.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<String, Box<dyn Any>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name`, replacing any previous entry.
    pub fn set<T: Any>(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), Box::new(value));
    }

    /// Stores an already boxed value under `name`.
    pub fn set_boxed(&mut self, name: impl Into<String>, value: Box<dyn Any>) {
        self.entries.insert(name.into(), value);
    }

    /// Borrows the entry stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the name is unknown and
    /// [`RegistryError::TypeMismatch`] when the entry holds another type.
    pub fn get<T: Any>(&self, name: &str) -> Result<&T, RegistryError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::not_found(name))?;
        (**entry)
            .downcast_ref::<T>()
            .ok_or_else(|| RegistryError::type_mismatch::<T>(name))
    }

    /// Mutably borrows the entry stored under `name`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::get`].
    pub fn get_mut<T: Any>(&mut self, name: &str) -> Result<&mut T, RegistryError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| RegistryError::not_found(name))?;
        (**entry)
            .downcast_mut::<T>()
            .ok_or_else(|| RegistryError::type_mismatch::<T>(name))
    }

    /// Returns `true` when something is stored under `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Removes the entry stored under `name`, reporting whether one existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored names in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        formatter
            .debug_struct("Registry")
            .field("names", &names)
            .finish()
    }
}
