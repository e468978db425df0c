//! Structured health reporting for framework lifecycle events.

use std::sync::Arc;

use emporium_config::Settings;

use crate::bootstrap::{BootstrapError, Stage};
use crate::front::DispatchReport;

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked once the framework is assembled and ready for requests.
    fn framework_ready(&self, settings: &Settings, routes: usize);

    /// Invoked before a request's bootstrap begins.
    fn bootstrap_starting(&self);

    /// Invoked after each bootstrap stage.
    fn stage_completed(&self, stage: Stage);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after dispatch with the final status.
    fn dispatch_completed(&self, report: &DispatchReport, status: u16);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn framework_ready(&self, settings: &Settings, routes: usize) {
        (**self).framework_ready(settings, routes);
    }

    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn stage_completed(&self, stage: Stage) {
        (**self).stage_completed(stage);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn dispatch_completed(&self, report: &DispatchReport, status: u16) {
        (**self).dispatch_completed(report, status);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn framework_ready(&self, settings: &Settings, routes: usize) {
        tracing::info!(
            target: "emporium::health",
            event = "framework_ready",
            root = %settings.root_dir,
            application = %settings.application,
            max_redirects = settings.max_redirects,
            routes,
            "framework ready"
        );
    }

    fn bootstrap_starting(&self) {
        tracing::debug!(
            target: "emporium::health",
            event = "bootstrap_starting",
            "starting request bootstrap"
        );
    }

    fn stage_completed(&self, stage: Stage) {
        tracing::trace!(
            target: "emporium::health",
            event = "stage_completed",
            stage = %stage,
            "bootstrap stage completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "emporium::health",
            event = "bootstrap_failed",
            error = %error,
            "request bootstrap failed"
        );
    }

    fn dispatch_completed(&self, report: &DispatchReport, status: u16) {
        tracing::info!(
            target: "emporium::health",
            event = "dispatch_completed",
            route = report.routes.last().map_or("", String::as_str),
            status,
            error_action = report.error_action_used,
            short_circuited = report.short_circuited,
            "request dispatched"
        );
    }
}
