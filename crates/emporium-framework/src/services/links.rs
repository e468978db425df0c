//! Link builder for storefront routes.

use url::form_urlencoded::Serializer;

use crate::route::RouteId;

/// Builds `index.php?route=...` links against the configured base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    base: String,
    ssl: String,
}

impl Url {
    /// Creates a builder from the plain and secure base URLs.
    pub fn new(base: impl Into<String>, ssl: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ssl: ssl.into(),
        }
    }

    /// Link to `route` with extra query pairs.
    ///
    /// The route is sanitised first; its slashes are kept readable while the
    /// other pairs are form-encoded.
    #[must_use]
    pub fn link(&self, route: &str, args: &[(&str, &str)], secure: bool) -> String {
        let base = if secure { &self.ssl } else { &self.base };
        let mut link = format!("{base}index.php");
        let route = RouteId::sanitize(route);
        if route.is_none() && args.is_empty() {
            return link;
        }

        link.push('?');
        if let Some(route) = &route {
            link.push_str("route=");
            link.push_str(route.as_str());
        }
        if !args.is_empty() {
            let mut query = Serializer::new(String::new());
            query.extend_pairs(args.iter().copied());
            if route.is_some() {
                link.push('&');
            }
            link.push_str(&query.finish());
        }
        link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_route_links_with_encoded_arguments() {
        let url = Url::new("http://shop.test/", "https://shop.test/");
        assert_eq!(
            url.link("product/search", &[("search", "red shoes"), ("page", "2")], false),
            "http://shop.test/index.php?route=product/search&search=red+shoes&page=2"
        );
        assert_eq!(
            url.link("account/login", &[], true),
            "https://shop.test/index.php?route=account/login"
        );
    }

    #[test]
    fn unusable_routes_link_to_the_front_page() {
        let url = Url::new("http://shop.test/", "http://shop.test/");
        assert_eq!(url.link("<>", &[], false), "http://shop.test/index.php");
    }
}
