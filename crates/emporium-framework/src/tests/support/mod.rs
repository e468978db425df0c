//! Shared fixtures for the framework test suites.

mod reporter;
mod site;

pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use site::TestSite;
