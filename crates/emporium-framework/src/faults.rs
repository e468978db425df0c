//! Recovered runtime faults.
//!
//! A fault is anything that goes wrong below the dispatch boundary without
//! aborting the request: a failing listener, a controller that returned an
//! error, a contained panic. The [`FaultHandler`] decides per request whether
//! faults are logged and whether they are shown to the visitor, and keeps
//! every reported fault for the caller to inspect.

use std::fmt;

use strum::Display;
use tracing::{error, info, warn};

use crate::config_table::ConfigTable;
use crate::markup::escape_html;

/// Tracing target for fault reports.
pub(crate) const FAULTS_TARGET: &str = "emporium::faults";

/// Fault classes mirroring the classic notice, warning, and fatal split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Severity {
    /// Informational.
    Notice,
    /// Something was wrong but the request carried on unchanged.
    Warning,
    /// A unit of work could not complete; its output was replaced.
    #[strum(serialize = "Fatal Error")]
    Fatal,
    /// Unclassified.
    Unknown,
}

/// One recovered fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    severity: Severity,
    message: String,
    location: String,
    suppressed: bool,
}

impl Fault {
    /// Creates a fault without a location.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: String::new(),
            suppressed: false,
        }
    }

    /// Names where the fault happened, usually a route.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Marks the fault as silenced: it will be neither logged, shown, nor
    /// recorded.
    #[must_use]
    pub const fn suppressed(mut self) -> Self {
        self.suppressed = true;
        self
    }

    /// Severity class.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Location, empty when unknown.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns `true` when the fault was silenced.
    #[must_use]
    pub const fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// HTML rendition shown to the visitor when display is enabled.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<b>{}</b>: {}",
            self.severity,
            escape_html(&self.message)
        );
        if !self.location.is_empty() {
            html.push_str(&format!(" in <b>{}</b>", escape_html(&self.location)));
        }
        html
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.severity, self.message)?;
        if !self.location.is_empty() {
            write!(formatter, " in {}", self.location)?;
        }
        Ok(())
    }
}

/// Per-request fault policy and record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultHandler {
    log: bool,
    display: bool,
    recorded: Vec<Fault>,
}

impl Default for FaultHandler {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl FaultHandler {
    /// Creates a handler with explicit switches.
    #[must_use]
    pub const fn new(log: bool, display: bool) -> Self {
        Self {
            log,
            display,
            recorded: Vec::new(),
        }
    }

    /// Reads `error_log` and `error_display` from the config table.
    #[must_use]
    pub fn from_config(config: &ConfigTable) -> Self {
        Self::new(config.get_bool("error_log"), config.get_bool("error_display"))
    }

    /// Returns `true` when faults are written to the log.
    #[must_use]
    pub const fn logs(&self) -> bool {
        self.log
    }

    /// Returns `true` when faults are shown to the visitor.
    #[must_use]
    pub const fn displays(&self) -> bool {
        self.display
    }

    /// Handles one fault and returns the markup to show, if any.
    pub fn report(&mut self, fault: Fault) -> Option<String> {
        if fault.is_suppressed() {
            return None;
        }
        if self.log {
            match fault.severity() {
                Severity::Fatal => error!(target: FAULTS_TARGET, location = fault.location(), "{fault}"),
                Severity::Warning | Severity::Unknown => {
                    warn!(target: FAULTS_TARGET, location = fault.location(), "{fault}");
                }
                Severity::Notice => info!(target: FAULTS_TARGET, location = fault.location(), "{fault}"),
            }
        }
        let html = self.display.then(|| fault.to_html());
        self.recorded.push(fault);
        html
    }

    /// Faults reported so far, oldest first.
    #[must_use]
    pub fn recorded(&self) -> &[Fault] {
        &self.recorded
    }

    /// Consumes the handler, returning the recorded faults.
    #[must_use]
    pub fn into_recorded(self) -> Vec<Fault> {
        self.recorded
    }
}
