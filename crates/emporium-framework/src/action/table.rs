//! Registered mapping from controllers and methods to handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::{ActionError, DEFAULT_METHOD, Handler, Outcome};
use crate::config_table::ConfigTable;
use crate::context::Context;
use crate::route::RouteId;

/// Config keys naming routes that must resolve at startup.
const REQUIRED_ROUTE_KEYS: &[&str] = &["action_router", "action_default"];

/// Errors raised while building a [`RouteTable`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTableError {
    /// A controller path is empty or not in sanitised form.
    #[error("invalid controller path '{controller}'")]
    InvalidController {
        /// Offending controller path.
        controller: String,
    },
    /// A method name is empty, contains `/`, or is reserved.
    #[error("invalid method name '{method}' on controller '{controller}'")]
    InvalidMethod {
        /// Controller the method was registered on.
        controller: String,
        /// Offending method name.
        method: String,
    },
    /// The same controller method was registered twice.
    #[error("method '{method}' on controller '{controller}' is already registered")]
    Duplicate {
        /// Controller path.
        controller: String,
        /// Method name.
        method: String,
    },
}

/// A configured route that does not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRoute {
    /// Config key that named the route.
    pub key: String,
    /// The route as configured.
    pub route: String,
}

#[derive(Default)]
struct ControllerEntry {
    methods: HashMap<String, Arc<dyn Handler>>,
}

/// Controller and method resolved from a route.
pub struct Resolved<'a> {
    controller: &'a str,
    method: &'a str,
    handler: &'a Arc<dyn Handler>,
}

impl Resolved<'_> {
    /// Controller path.
    #[must_use]
    pub const fn controller(&self) -> &str {
        self.controller
    }

    /// Method name.
    #[must_use]
    pub const fn method(&self) -> &str {
        self.method
    }

    /// Registered handler.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn Handler> {
        Arc::clone(self.handler)
    }
}

/// Frozen route table shared by every request.
#[derive(Default)]
pub struct RouteTable {
    controllers: HashMap<String, ControllerEntry>,
}

impl RouteTable {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Returns `true` when `controller` is a registered controller path.
    #[must_use]
    pub fn is_controller(&self, controller: &str) -> bool {
        self.controllers.contains_key(controller)
    }

    /// Number of registered controller methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers
            .values()
            .map(|entry| entry.methods.len())
            .sum()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Resolves a sanitised route to a handler.
    ///
    /// A route naming a controller calls its `index` method; otherwise the
    /// final segment is the method and the prefix the controller.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Rejected`] for methods starting with `__` and
    /// [`ActionError::NotFound`] when nothing matches.
    pub fn resolve<'a>(&'a self, route: &RouteId) -> Result<Resolved<'a>, ActionError> {
        if let Some((controller, entry)) = self.controllers.get_key_value(route.as_str()) {
            return entry
                .methods
                .get_key_value(DEFAULT_METHOD)
                .map(|(method, handler)| Resolved {
                    controller,
                    method,
                    handler,
                })
                .ok_or_else(|| ActionError::not_found(route.as_str()));
        }

        let (controller_path, method_name) = route
            .split_last()
            .ok_or_else(|| ActionError::not_found(route.as_str()))?;
        if method_name.starts_with("__") {
            return Err(ActionError::Rejected {
                method: method_name.to_owned(),
            });
        }
        let (controller, entry) = self
            .controllers
            .get_key_value(controller_path)
            .ok_or_else(|| ActionError::not_found(route.as_str()))?;
        let (method, handler) = entry
            .methods
            .get_key_value(method_name)
            .ok_or_else(|| ActionError::not_found(route.as_str()))?;
        Ok(Resolved {
            controller,
            method,
            handler,
        })
    }

    /// Returns `true` when the raw route sanitises and resolves.
    #[must_use]
    pub fn contains(&self, raw: &str) -> bool {
        RouteId::sanitize(raw).is_some_and(|route| self.resolve(&route).is_ok())
    }

    /// Checks every route the config wires into the pipeline.
    ///
    /// Covers `action_router`, `action_default`, `action_pre_action`, and
    /// `action_event`. `action_error` is left out: dispatch has a built-in
    /// page for an unresolvable error route.
    #[must_use]
    pub fn validate(&self, config: &ConfigTable) -> Vec<UnresolvedRoute> {
        let mut unresolved = Vec::new();
        let mut check = |key: String, route: &str| {
            if !self.contains(route) {
                unresolved.push(UnresolvedRoute {
                    key,
                    route: route.to_owned(),
                });
            }
        };

        for key in REQUIRED_ROUTE_KEYS {
            if let Some(route) = config.get_str(key) {
                check((*key).to_owned(), route);
            }
        }
        for route in config.get_str_list("action_pre_action") {
            check(String::from("action_pre_action"), &route);
        }
        if let Some(events) = config.get_table("action_event") {
            for (trigger, value) in events {
                for route in event_routes(value) {
                    check(format!("action_event.{trigger}"), route);
                }
            }
        }
        unresolved
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut controllers: Vec<&str> = self.controllers.keys().map(String::as_str).collect();
        controllers.sort_unstable();
        formatter
            .debug_struct("RouteTable")
            .field("controllers", &controllers)
            .finish()
    }
}

/// Routes listed for one `action_event` trigger: a string or a list of them.
pub(crate) fn event_routes(value: &toml::Value) -> Vec<&str> {
    match value {
        toml::Value::String(route) => vec![route.as_str()],
        toml::Value::Array(items) => items.iter().filter_map(toml::Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Collects handler registrations and validates names on [`Self::build`].
#[derive(Default)]
pub struct RouteTableBuilder {
    controllers: HashMap<String, ControllerEntry>,
    errors: Vec<RouteTableError>,
}

impl RouteTableBuilder {
    /// Registers a closure as `controller`'s `method`.
    #[must_use]
    pub fn handle<F>(self, controller: &str, method: &str, handler: F) -> Self
    where
        F: Fn(&mut Context, &[Value]) -> Result<Outcome, ActionError> + Send + Sync + 'static,
    {
        self.handle_arc(controller, method, Arc::new(handler))
    }

    /// Registers a shared handler as `controller`'s `method`.
    #[must_use]
    pub fn handle_arc(mut self, controller: &str, method: &str, handler: Arc<dyn Handler>) -> Self {
        if !RouteId::is_canonical(controller) {
            self.errors.push(RouteTableError::InvalidController {
                controller: controller.to_owned(),
            });
            return self;
        }
        if !RouteId::is_canonical(method) || method.contains('/') || method.starts_with("__") {
            self.errors.push(RouteTableError::InvalidMethod {
                controller: controller.to_owned(),
                method: method.to_owned(),
            });
            return self;
        }

        let entry = self.controllers.entry(controller.to_owned()).or_default();
        if entry.methods.contains_key(method) {
            self.errors.push(RouteTableError::Duplicate {
                controller: controller.to_owned(),
                method: method.to_owned(),
            });
            return self;
        }
        entry.methods.insert(method.to_owned(), handler);
        self
    }

    /// Merges every registration of `other` into this builder.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.errors.extend(other.errors);
        for (controller, entry) in other.controllers {
            for (method, handler) in entry.methods {
                self = self.handle_arc(&controller, &method, handler);
            }
        }
        self
    }

    /// Freezes the table.
    ///
    /// # Errors
    ///
    /// Returns the first invalid or duplicate registration.
    pub fn build(self) -> Result<RouteTable, RouteTableError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }
        Ok(RouteTable {
            controllers: self.controllers,
        })
    }
}
