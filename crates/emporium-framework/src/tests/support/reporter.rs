//! Test double for [`HealthReporter`] that records lifecycle events for
//! assertions.

use std::sync::Mutex;

use emporium_config::Settings;

use crate::bootstrap::{BootstrapError, Stage};
use crate::front::DispatchReport;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    /// Framework assembled with the given number of routes.
    FrameworkReady(usize),
    /// Request bootstrap started.
    BootstrapStarting,
    /// A bootstrap stage completed.
    StageCompleted(Stage),
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// Dispatch finished with the given status.
    DispatchCompleted(u16),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Stages completed so far, in order.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HealthEvent::StageCompleted(stage) => Some(stage),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn framework_ready(&self, _settings: &Settings, routes: usize) {
        self.record(HealthEvent::FrameworkReady(routes));
    }

    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn stage_completed(&self, stage: Stage) {
        self.record(HealthEvent::StageCompleted(stage));
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn dispatch_completed(&self, _report: &DispatchReport, status: u16) {
        self.record(HealthEvent::DispatchCompleted(status));
    }
}
