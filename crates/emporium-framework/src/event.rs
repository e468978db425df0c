//! Event bus keyed by trigger strings.
//!
//! Listeners are actions appended under a key. Triggering runs a snapshot
//! of the key's listeners in registration order, so a listener may register
//! further listeners without changing the run in progress.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::action::{Action, ActionError, DISPATCH_TARGET, Outcome};
use crate::context::Context;

/// Result of one listener.
#[derive(Debug)]
pub struct EventResult {
    /// Listener route.
    pub route: String,
    /// What the listener returned.
    pub result: Result<Outcome, ActionError>,
}

impl EventResult {
    /// Body of a successful non-empty `Respond`.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        self.result.as_ref().ok().and_then(Outcome::response_body)
    }
}

/// Ordered listener lists per trigger key.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    listeners: HashMap<String, Vec<Action>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `action` to the listeners of `key`.
    pub fn register(&mut self, key: impl Into<String>, action: Action) {
        self.listeners.entry(key.into()).or_default().push(action);
    }

    /// Removes every listener of `key` with the given route, returning how
    /// many were removed.
    pub fn unregister(&mut self, key: &str, route: &str) -> usize {
        let Some(actions) = self.listeners.get_mut(key) else {
            return 0;
        };
        let before = actions.len();
        actions.retain(|action| action.route() != route);
        let removed = before - actions.len();
        if actions.is_empty() {
            self.listeners.remove(key);
        }
        removed
    }

    /// Listeners of `key` in registration order.
    #[must_use]
    pub fn listeners(&self, key: &str) -> &[Action] {
        self.listeners.get(key).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Runs every listener of `key` with `args`.
    ///
    /// A missing key yields no results. A failing listener is recorded and
    /// the chain continues; a listener returning [`Outcome::Stop`] is
    /// recorded and ends the chain.
    pub fn trigger(ctx: &mut Context, key: &str, args: &[Value]) -> Vec<EventResult> {
        let snapshot = ctx.events().listeners(key).to_vec();
        let mut results = Vec::with_capacity(snapshot.len());
        for action in snapshot {
            let result = action.execute_with(ctx, args);
            let stop = matches!(result, Ok(Outcome::Stop));
            if let Err(error) = &result {
                warn!(
                    target: DISPATCH_TARGET,
                    event = key,
                    listener = action.route(),
                    error = %error,
                    "event listener failed"
                );
            }
            results.push(EventResult {
                route: action.route().to_owned(),
                result,
            });
            if stop {
                debug!(target: DISPATCH_TARGET, event = key, listener = action.route(), "event chain stopped");
                break;
            }
        }
        results
    }
}
