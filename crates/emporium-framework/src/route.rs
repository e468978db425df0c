//! Sanitised route identifiers.

use std::fmt;

/// Route naming a controller and, optionally, a method: `checkout/cart/add`.
///
/// Only ASCII letters, digits, `_`, and `/` survive sanitising, and empty
/// segments are dropped, so a route can never express `..`, an absolute
/// path, or an empty name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(String);

impl RouteId {
    /// Strips every character outside `[A-Za-z0-9_/]` from `raw`.
    ///
    /// Returns `None` when nothing is left.
    #[must_use]
    pub fn sanitize(raw: &str) -> Option<Self> {
        let kept: String = raw.chars().filter(|c| is_route_char(*c)).collect();
        let joined = kept
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        if joined.is_empty() {
            None
        } else {
            Some(Self(joined))
        }
    }

    /// Returns `true` when `raw` is already in sanitised form.
    #[must_use]
    pub fn is_canonical(raw: &str) -> bool {
        Self::sanitize(raw).is_some_and(|route| route.0 == raw)
    }

    /// The sanitised text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Splits off the final segment: `(prefix, last)`.
    ///
    /// Returns `None` for single-segment routes.
    #[must_use]
    pub fn split_last(&self) -> Option<(&str, &str)> {
        self.0.rsplit_once('/')
    }

    /// The route without its final segment.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.split_last().map(|(prefix, _)| Self(prefix.to_owned()))
    }

    /// Appends a segment, sanitising it first.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        match Self::sanitize(segment) {
            Some(tail) => Self(format!("{}/{}", self.0, tail.0)),
            None => self.clone(),
        }
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for RouteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

const fn is_route_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '/'
}
