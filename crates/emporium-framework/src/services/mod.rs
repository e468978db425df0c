//! Collaborator services attached to the request context.
//!
//! These are the seams to engines the framework does not implement itself:
//! database drivers, session persistence, cache storage. Each seam is a
//! trait with a small default implementation where one is useful in
//! production or in tests.

mod cache;
mod database;
mod document;
mod language;
mod links;
mod session;

pub use cache::{Cache, CacheBackend, DEFAULT_BACKEND, DEFAULT_EXPIRE, MemoryCacheBackend};
pub use database::{
    DEFAULT_DRIVER, Database, DatabaseConnector, DatabaseError, DbParams, QueryResult,
    escape_sql_literal,
};
pub use document::{Document, Link, Style};
pub use language::{DEFAULT_LANGUAGE, Language};
pub use links::Url;
pub use session::{MemorySessionStore, Session, SessionData, SessionError, SessionStore};

#[cfg(test)]
pub(crate) use database::MockDatabase;
