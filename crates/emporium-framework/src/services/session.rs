//! Session state keyed by a cookie-carried identifier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::Value;
use thiserror::Error;

/// Length of generated session identifiers.
const ID_LENGTH: usize = 26;

/// Errors raised by session stores.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backing store failed.
    #[error("session store failed: {message}")]
    Store {
        /// Store supplied description.
        message: String,
    },
}

/// Stored session values.
pub type SessionData = HashMap<String, Value>;

/// Persistence engine for session data.
pub trait SessionStore: Send + Sync {
    /// Reads the data stored for `id`; unknown ids yield empty data.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the store cannot be read.
    fn read(&self, id: &str) -> Result<SessionData, SessionError>;

    /// Replaces the data stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the store cannot be written.
    fn write(&self, id: &str, data: &SessionData) -> Result<(), SessionError>;

    /// Drops everything stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the store cannot be written.
    fn destroy(&self, id: &str) -> Result<(), SessionError>;
}

/// Process-local store. Sessions live as long as the store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, SessionData>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self, id: &str) -> Result<SessionData, SessionError> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(sessions.get(id).cloned().unwrap_or_default())
    }

    fn write(&self, id: &str, data: &SessionData) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.insert(id.to_owned(), data.clone());
        Ok(())
    }

    fn destroy(&self, id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(id);
        Ok(())
    }
}

/// Session attached to the current request.
pub struct Session {
    id: String,
    data: SessionData,
    fresh: bool,
    store: Arc<dyn SessionStore>,
}

impl Session {
    /// Resumes the session named by `cookie`, or starts a new one when the
    /// cookie is absent or malformed.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when existing data cannot be read.
    pub fn start(store: Arc<dyn SessionStore>, cookie: Option<&str>) -> Result<Self, SessionError> {
        match cookie.filter(|id| is_valid_id(id)) {
            Some(id) => {
                let data = store.read(id)?;
                Ok(Self {
                    id: id.to_owned(),
                    data,
                    fresh: false,
                    store,
                })
            }
            None => Ok(Self {
                id: generate_id(),
                data: SessionData::new(),
                fresh: true,
                store,
            }),
        }
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `true` when the identifier was generated for this request.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.fresh
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Stores `value` under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Writes the data back to the store.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the store rejects the write.
    pub fn save(&self) -> Result<(), SessionError> {
        self.store.write(&self.id, &self.data)
    }

    /// Clears the data and removes it from the store.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] when the store rejects the removal.
    pub fn destroy(&mut self) -> Result<(), SessionError> {
        self.data.clear();
        self.store.destroy(&self.id)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Session")
            .field("id", &self.id)
            .field("fresh", &self.fresh)
            .field("keys", &self.data.len())
            .finish_non_exhaustive()
    }
}

fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

fn is_valid_id(id: &str) -> bool {
    (22..=52).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ',' || c == '-')
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn new_sessions_get_a_generated_id() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let session = Session::start(store, None).expect("start");
        assert!(session.is_new());
        assert_eq!(session.id().len(), ID_LENGTH);
        assert!(is_valid_id(session.id()));
    }

    #[test]
    fn saved_data_is_resumed_from_the_cookie() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let mut first = Session::start(Arc::clone(&store), None).expect("start");
        first.set("currency", json!("EUR"));
        first.save().expect("save");

        let resumed = Session::start(store, Some(first.id())).expect("resume");
        assert!(!resumed.is_new());
        assert_eq!(resumed.get("currency"), Some(&json!("EUR")));
    }

    #[test]
    fn malformed_cookies_start_a_new_session() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let session = Session::start(store, Some("../../etc/passwd")).expect("start");
        assert!(session.is_new());
        assert_ne!(session.id(), "../../etc/passwd");
    }
}
