//! Front controller: pre-actions, the primary action, and the error action.
//!
//! Dispatch runs the pre-actions in registration order, then follows the
//! primary action through at most `max_redirects` redirect hops. Any failure
//! moves dispatch to the error action, which runs at most once. When the
//! error action cannot produce a page either, a built-in page ends the
//! request.

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::action::{Action, ActionError, DISPATCH_TARGET, Outcome};
use crate::context::Context;
use crate::event::EventResult;
use crate::faults::{Fault, Severity};

/// Body of the built-in page for unresolvable routes.
pub const NOT_FOUND_PAGE: &str = "<h1>404 Not Found</h1>";
/// Body of the built-in page for every other failure.
pub const INTERNAL_ERROR_PAGE: &str = "<h1>500 Internal Server Error</h1>";

/// What happened during one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Routes dispatched in order, including ones that failed.
    pub routes: Vec<String>,
    /// A pre-action produced the response.
    pub short_circuited: bool,
    /// The error action ran.
    pub error_action_used: bool,
    /// The built-in page was rendered.
    pub terminal_page: bool,
    /// Failures in the order they happened.
    pub failures: Vec<String>,
}

/// Orchestrates one request's actions.
#[derive(Debug, Clone, Default)]
pub struct FrontController {
    pre_actions: Vec<Action>,
    max_redirects: usize,
}

enum Stage {
    Primary(Action),
    Error(ActionError),
}

impl FrontController {
    /// Creates a controller that follows at most `max_redirects` hops.
    #[must_use]
    pub const fn new(max_redirects: usize) -> Self {
        Self {
            pre_actions: Vec::new(),
            max_redirects,
        }
    }

    /// Appends a pre-action.
    pub fn add_pre_action(&mut self, action: Action) {
        self.pre_actions.push(action);
    }

    /// Registered pre-actions in order.
    #[must_use]
    pub fn pre_actions(&self) -> &[Action] {
        &self.pre_actions
    }

    /// Redirect bound.
    #[must_use]
    pub const fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Runs the request's actions and writes the final output to the
    /// response.
    pub fn dispatch(&self, ctx: &mut Context, router: &Action, error: &Action) -> DispatchReport {
        let mut report = DispatchReport::default();

        let stage = match self.run_pre_actions(ctx, &mut report) {
            PreActions::Responded => return report,
            PreActions::Replaced(action) => Stage::Primary(action),
            PreActions::Failed(failure) => Stage::Error(failure),
            PreActions::Finished => Stage::Primary(router.clone()),
        };

        let failure = match stage {
            Stage::Primary(action) => match self.follow(ctx, action, &mut report) {
                Ok(outcome) => {
                    write_output(ctx, &outcome);
                    return report;
                }
                Err(failure) => failure,
            },
            Stage::Error(failure) => failure,
        };

        report.error_action_used = true;
        match self.follow(ctx, error.clone(), &mut report) {
            Ok(outcome) => write_output(ctx, &outcome),
            Err(error_failure) => {
                let status = if error_failure.is_not_found() {
                    failure.status_code()
                } else {
                    500
                };
                render_terminal_page(ctx, status);
                report.terminal_page = true;
            }
        }
        report
    }

    fn run_pre_actions(&self, ctx: &mut Context, report: &mut DispatchReport) -> PreActions {
        for action in &self.pre_actions {
            match run(ctx, action, report) {
                Ok(Outcome::Respond(body)) if !body.is_empty() => {
                    debug!(target: DISPATCH_TARGET, route = action.route(), "pre-action produced the response");
                    ctx.response_mut().set_output(body);
                    report.short_circuited = true;
                    return PreActions::Responded;
                }
                Ok(Outcome::Redirect(route)) => return PreActions::Replaced(Action::new(route)),
                Ok(_) => {}
                Err(failure) => return PreActions::Failed(failure),
            }
        }
        PreActions::Finished
    }

    /// Runs `action`, following redirects up to the bound.
    fn follow(
        &self,
        ctx: &mut Context,
        mut action: Action,
        report: &mut DispatchReport,
    ) -> Result<Outcome, ActionError> {
        let mut hops = 0;
        loop {
            match run(ctx, &action, report)? {
                Outcome::Redirect(route) => {
                    if hops == self.max_redirects {
                        let failure = ActionError::redirect_limit(self.max_redirects, route);
                        record(ctx, action.route(), &failure, report);
                        return Err(failure);
                    }
                    hops += 1;
                    debug!(target: DISPATCH_TARGET, from = action.route(), to = %route, hops, "following redirect");
                    action = Action::new(route);
                }
                outcome => return Ok(outcome),
            }
        }
    }
}

enum PreActions {
    Responded,
    Replaced(Action),
    Failed(ActionError),
    Finished,
}

/// Runs one action wrapped in its `before` and `after` controller events.
///
/// A non-empty `Respond` from a `before` listener replaces the action; one
/// from an `after` listener replaces its result.
fn run(ctx: &mut Context, action: &Action, report: &mut DispatchReport) -> Result<Outcome, ActionError> {
    report.routes.push(action.route().to_owned());
    let Some(route) = action.route_id() else {
        let failure = ActionError::not_found(action.route());
        record(ctx, action.route(), &failure, report);
        return Err(failure);
    };

    let before = format!("controller/{route}/before");
    if let Some(body) = first_response(ctx.trigger(&before, action.args())) {
        return Ok(Outcome::Respond(body));
    }

    let outcome = match action.execute(ctx) {
        Ok(outcome) => outcome,
        Err(failure) => {
            record(ctx, route.as_str(), &failure, report);
            return Err(failure);
        }
    };

    let after = format!("controller/{route}/after");
    let output: Value = json!(outcome.response_body().unwrap_or_default());
    Ok(first_response(ctx.trigger(&after, &[output]))
        .map_or(outcome, Outcome::Respond))
}

fn first_response(results: Vec<EventResult>) -> Option<String> {
    results
        .iter()
        .find_map(|result| result.response_body().map(str::to_owned))
}

fn record(ctx: &mut Context, route: &str, failure: &ActionError, report: &mut DispatchReport) {
    warn!(target: DISPATCH_TARGET, route, error = %failure, "action failed");
    report.failures.push(failure.to_string());
    if matches!(failure, ActionError::NotFound { .. } | ActionError::Rejected { .. }) {
        return;
    }
    let severity = match failure {
        ActionError::RedirectLimit { .. } => Severity::Warning,
        _ => Severity::Fatal,
    };
    ctx.report(Fault::new(severity, failure.to_string()).with_location(route));
}

fn write_output(ctx: &mut Context, outcome: &Outcome) {
    if let Some(body) = outcome.response_body() {
        ctx.response_mut().set_output(body);
    }
}

fn render_terminal_page(ctx: &mut Context, status: u16) {
    let body = if status == 404 {
        NOT_FOUND_PAGE
    } else {
        INTERNAL_ERROR_PAGE
    };
    let response = ctx.response_mut();
    response.set_status(status);
    response.set_output(body);
}
