//! Request bootstrap and front-controller dispatch for the emporium
//! storefront.
//!
//! A [`Framework`] is assembled once per process from a [`RouteTable`] of
//! controllers, a [`ResourceCatalog`] of library and model factories, and
//! the named engines in [`Collaborators`]. Assembly validates every route
//! the option files wire into the pipeline, so a misspelt controller is a
//! startup error rather than a runtime 404.
//!
//! Each request then gets its own [`Context`]. [`Framework::handle`] fills it
//! in a fixed stage order (option files, pre-config hook, fault handler,
//! event listeners, loader, response, database, session, cache, links,
//! language, document, autoloads) before the [`FrontController`] runs the
//! pre-actions, the router, and if needed the error action.
//!
//! ## Dispatch contract
//!
//! Handlers return an [`Outcome`]. `Continue` moves on, `Redirect` names the
//! next route, and `Respond` supplies the body. Redirect chains are bounded
//! by `max_redirects`; exceeding the bound, an unresolvable route, a handler
//! error, or a panic all move dispatch to the error action. If that fails
//! too, a built-in 404 or 500 page ends the request. A single request's
//! fault never takes the process down.

mod action;
mod bootstrap;
mod config_table;
mod context;
mod event;
mod faults;
mod front;
mod health;
mod loader;
mod markup;
mod registry;
mod request;
mod response;
mod route;
pub mod services;
pub mod storefront;
mod telemetry;

pub use action::{
    Action, ActionError, DEFAULT_METHOD, Handler, Outcome, Resolved, RouteTable,
    RouteTableBuilder, RouteTableError, UnresolvedRoute,
};
pub use bootstrap::{
    BootstrapError, Collaborators, Components, DEFAULT_ERROR, DEFAULT_ROUTER,
    DEFAULT_SESSION_ENGINE, DEFAULT_SESSION_NAME, Framework, Handled, Stage, bootstrap_with,
};
pub use config_table::{ConfigError, ConfigTable};
pub use context::Context;
pub use event::{EventBus, EventResult};
pub use faults::{Fault, FaultHandler, Severity};
pub use front::{DispatchReport, FrontController, INTERNAL_ERROR_PAGE, NOT_FOUND_PAGE};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use loader::{
    Factory, LoadError, Loader, ResourceCatalog, ResourceCatalogBuilder, library_key, model_key,
};
pub use markup::escape_html;
pub use registry::{Registry, RegistryError};
pub use request::{ROUTE_PARAMETER, Request};
pub use response::{DEFAULT_CONTENT_TYPE, Rendered, Response, reason_phrase};
pub use route::RouteId;
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as init_telemetry};

#[cfg(test)]
mod tests;
