//! Addressable units of work.
//!
//! An [`Action`] pairs a route with bound arguments. Executing it sanitises
//! the route, resolves it against the [`RouteTable`] held by the context, and
//! calls the registered handler. The handler's [`Outcome`] tells the caller
//! whether to continue, redirect, or take its body as the response.

mod table;

use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config_table::ConfigError;
use crate::context::Context;
use crate::loader::LoadError;
use crate::registry::RegistryError;
use crate::route::RouteId;
use crate::services::DatabaseError;

pub(crate) use table::event_routes;
pub use table::{Resolved, RouteTable, RouteTableBuilder, RouteTableError, UnresolvedRoute};

/// Tracing target for action resolution and dispatch.
pub(crate) const DISPATCH_TARGET: &str = "emporium::dispatch";

/// Method invoked when a route names a controller without a method.
pub const DEFAULT_METHOD: &str = "index";

/// Control value returned by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to report; move on to the next stage.
    Continue,
    /// Dispatch the named route in place of the current one.
    Redirect(String),
    /// Use this body as the response output.
    Respond(String),
    /// End the current event chain. Elsewhere this behaves like `Continue`.
    Stop,
}

impl Outcome {
    /// Builds a redirect to `route`.
    pub fn redirect(route: impl Into<String>) -> Self {
        Self::Redirect(route.into())
    }

    /// Builds a response body.
    pub fn respond(body: impl Into<String>) -> Self {
        Self::Respond(body.into())
    }

    /// Returns the body of a non-empty `Respond`.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Respond(body) if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}

/// Errors surfaced while resolving or executing an action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No controller or method is registered for the route.
    #[error("could not call {route}: no such controller or method")]
    NotFound {
        /// Route as requested.
        route: String,
    },
    /// The method name is reserved.
    #[error("calls to reserved method '{method}' are not allowed")]
    Rejected {
        /// Offending method name.
        method: String,
    },
    /// The handler reported a failure.
    #[error("{message}")]
    Failed {
        /// Handler supplied description.
        message: String,
    },
    /// The handler panicked; the panic was contained.
    #[error("controller {route} panicked: {message}")]
    Panicked {
        /// Route whose handler panicked.
        route: String,
        /// Panic payload rendered as text.
        message: String,
    },
    /// A redirect chain exceeded the configured bound.
    #[error("redirect limit of {limit} exceeded at {route}")]
    RedirectLimit {
        /// Configured bound.
        limit: usize,
        /// Route that would have been the next hop.
        route: String,
    },
    /// A registry lookup failed inside the handler.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// An option file failed to load inside the handler.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A resource failed to load inside the handler.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// A database call failed inside the handler.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ActionError {
    /// Creates a not found error.
    pub fn not_found(route: impl Into<String>) -> Self {
        Self::NotFound {
            route: route.into(),
        }
    }

    /// Creates a handler failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates a redirect limit error.
    pub fn redirect_limit(limit: usize, route: impl Into<String>) -> Self {
        Self::RedirectLimit {
            limit,
            route: route.into(),
        }
    }

    /// Returns `true` when the route could not be resolved.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Rejected { .. })
    }

    /// HTTP status matching the failure class.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        if self.is_not_found() { 404 } else { 500 }
    }
}

/// Callable registered under a controller method.
pub trait Handler: Send + Sync {
    /// Runs the handler against the request context.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] when the handler cannot complete.
    fn call(&self, ctx: &mut Context, args: &[Value]) -> Result<Outcome, ActionError>;
}

impl<F> Handler for F
where
    F: Fn(&mut Context, &[Value]) -> Result<Outcome, ActionError> + Send + Sync,
{
    fn call(&self, ctx: &mut Context, args: &[Value]) -> Result<Outcome, ActionError> {
        self(ctx, args)
    }
}

/// A route plus the arguments bound to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    route: String,
    args: Vec<Value>,
}

impl Action {
    /// Creates an action without bound arguments.
    pub fn new(route: impl Into<String>) -> Self {
        Self::with_args(route, Vec::new())
    }

    /// Creates an action with bound arguments.
    pub fn with_args(route: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            route: route.into(),
            args,
        }
    }

    /// The route as supplied, before sanitising.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// The sanitised route, if anything survives sanitising.
    #[must_use]
    pub fn route_id(&self) -> Option<RouteId> {
        RouteId::sanitize(&self.route)
    }

    /// Bound arguments.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Executes the action with its bound arguments.
    ///
    /// # Errors
    ///
    /// See [`Self::execute_with`].
    pub fn execute(&self, ctx: &mut Context) -> Result<Outcome, ActionError> {
        self.execute_with(ctx, &[])
    }

    /// Executes the action with `extra` appended to the bound arguments.
    ///
    /// A panic inside the handler is contained and reported as
    /// [`ActionError::Panicked`].
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NotFound`] when the route does not resolve,
    /// [`ActionError::Rejected`] for reserved method names, and whatever the
    /// handler itself returns.
    pub fn execute_with(&self, ctx: &mut Context, extra: &[Value]) -> Result<Outcome, ActionError> {
        let route = self
            .route_id()
            .ok_or_else(|| ActionError::not_found(&self.route))?;
        let routes = ctx.routes();
        let resolved = routes.resolve(&route)?;

        debug!(
            target: DISPATCH_TARGET,
            route = route.as_str(),
            controller = resolved.controller(),
            method = resolved.method(),
            "executing action"
        );

        let mut args = self.args.clone();
        args.extend_from_slice(extra);
        let handler = resolved.handler();
        panic::catch_unwind(AssertUnwindSafe(|| handler.call(ctx, &args))).unwrap_or_else(
            |payload| {
                Err(ActionError::Panicked {
                    route: route.to_string(),
                    message: panic_message(payload.as_ref()),
                })
            },
        )
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        String::from("non-string panic payload")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config_table::ConfigTable;

    fn context_with(builder: RouteTableBuilder) -> Context {
        let routes = builder.build().expect("valid route table");
        Context::new(Arc::new(routes), ConfigTable::new())
    }

    #[test]
    fn full_route_naming_a_controller_calls_index() {
        let mut ctx = context_with(RouteTable::builder().handle(
            "common/home",
            "index",
            |_, _| Ok(Outcome::respond("home")),
        ));
        let outcome = Action::new("common/home").execute(&mut ctx).expect("resolves");
        assert_eq!(outcome, Outcome::respond("home"));
    }

    #[test]
    fn final_segment_selects_the_method() {
        let mut ctx = context_with(RouteTable::builder().handle(
            "checkout/cart",
            "add",
            |_, args| Ok(Outcome::respond(format!("added {}", args.len()))),
        ));
        let action = Action::with_args("checkout/cart/add", vec![json!(42)]);
        let outcome = action.execute_with(&mut ctx, &[json!("extra")]).expect("resolves");
        assert_eq!(outcome, Outcome::respond("added 2"));
    }

    #[test]
    fn unsanitisable_routes_are_not_found() {
        let mut ctx = context_with(RouteTable::builder());
        let error = Action::new("../../..").execute(&mut ctx).expect_err("not found");
        assert!(error.is_not_found());
        assert_eq!(error.status_code(), 404);
    }

    #[test]
    fn panics_are_contained() {
        let mut ctx = context_with(RouteTable::builder().handle(
            "common/crash",
            "index",
            |_, _| panic!("boom"),
        ));
        let error = Action::new("common/crash").execute(&mut ctx).expect_err("panicked");
        match error {
            ActionError::Panicked { route, message } => {
                assert_eq!(route, "common/crash");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_respond_has_no_body() {
        assert_eq!(Outcome::respond("").response_body(), None);
        assert_eq!(Outcome::respond("x").response_body(), Some("x"));
        assert_eq!(Outcome::Continue.response_body(), None);
    }
}
