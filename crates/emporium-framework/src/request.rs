//! Incoming request data.
//!
//! Query and form values are trimmed and HTML-escaped on the way in, so
//! controllers can echo them into markup without further treatment. Header
//! names are stored lower-case.

use std::collections::HashMap;

use url::form_urlencoded;

use crate::markup::escape_html;

/// Query parameter naming the requested route.
pub const ROUTE_PARAMETER: &str = "route";

/// Parsed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    method: String,
    query: HashMap<String, String>,
    post: HashMap<String, String>,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
}

impl Request {
    /// Creates a `GET` request from a query string without the leading `?`.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        Self {
            method: String::from("GET"),
            query: parse_pairs(query),
            ..Self::default()
        }
    }

    /// Builds a request from CGI meta-variables.
    ///
    /// Reads `QUERY_STRING`, `REQUEST_METHOD`, every `HTTP_*` variable as a
    /// header, and cookies from `HTTP_COOKIE`.
    pub fn from_cgi_env<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut request = Self::from_query("");
        for (name, value) in vars {
            match name.as_str() {
                "QUERY_STRING" => request.query = parse_pairs(&value),
                "REQUEST_METHOD" => request.method = value.trim().to_ascii_uppercase(),
                "HTTP_COOKIE" => request.cookies = parse_cookies(&value),
                _ => {
                    if let Some(header) = name.strip_prefix("HTTP_") {
                        let header = header.replace('_', "-").to_ascii_lowercase();
                        request.headers.insert(header, value);
                    }
                }
            }
        }
        if request.method.is_empty() {
            request.method = String::from("GET");
        }
        request
    }

    /// Adds form fields from an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn with_form_body(mut self, body: &str) -> Self {
        self.post.extend(parse_pairs(body));
        self
    }

    /// Sets a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Sets a cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Request method, upper-case.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Cleaned query parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Cleaned form field.
    #[must_use]
    pub fn post(&self, name: &str) -> Option<&str> {
        self.post.get(name).map(String::as_str)
    }

    /// The raw `route` parameter, when present and non-empty.
    #[must_use]
    pub fn route(&self) -> Option<&str> {
        self.get(ROUTE_PARAMETER).filter(|route| !route.is_empty())
    }

    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Cookie value.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns `true` when `Accept-Encoding` lists `coding` with a non-zero
    /// quality.
    #[must_use]
    pub fn accepts_encoding(&self, coding: &str) -> bool {
        let Some(header) = self.header("accept-encoding") else {
            return false;
        };
        header.split(',').any(|entry| {
            let mut parts = entry.split(';').map(str::trim);
            let name = parts.next().unwrap_or_default();
            let refused = parts.any(|param| {
                param
                    .strip_prefix("q=")
                    .and_then(|q| q.parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            });
            name.eq_ignore_ascii_case(coding) && !refused
        })
    }
}

fn parse_pairs(text: &str) -> HashMap<String, String> {
    form_urlencoded::parse(text.trim_start_matches('?').as_bytes())
        .map(|(key, value)| (clean(&key), clean(&value)))
        .collect()
}

fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_owned(), clean(value)))
        .collect()
}

fn clean(value: &str) -> String {
    escape_html(value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cgi(vars: &[(&str, &str)]) -> Request {
        Request::from_cgi_env(
            vars.iter()
                .map(|(name, value)| ((*name).to_owned(), (*value).to_owned())),
        )
    }

    #[test]
    fn query_values_are_decoded_and_cleaned() {
        let request = Request::from_query("route=product%2Fsearch&search=+%3Cb%3Eshoes%3C%2Fb%3E+");
        assert_eq!(request.route(), Some("product/search"));
        assert_eq!(request.get("search"), Some("&lt;b&gt;shoes&lt;/b&gt;"));
        assert_eq!(request.method(), "GET");
    }

    #[test]
    fn empty_route_counts_as_absent() {
        assert_eq!(Request::from_query("route=").route(), None);
        assert_eq!(Request::from_query("").route(), None);
    }

    #[test]
    fn raw_route_parameter_keeps_empty_apart_from_missing() {
        assert_eq!(Request::from_query("route=").get(ROUTE_PARAMETER), Some(""));
        assert_eq!(Request::from_query("").get(ROUTE_PARAMETER), None);
    }

    #[test]
    fn cgi_variables_populate_headers_and_cookies() {
        let request = cgi(&[
            ("QUERY_STRING", "route=common/home"),
            ("REQUEST_METHOD", "post"),
            ("HTTP_ACCEPT_ENCODING", "gzip, br"),
            ("HTTP_COOKIE", "EMPORIUMSESSID=abc; currency=EUR"),
            ("PATH", "/usr/bin"),
        ]);
        assert_eq!(request.method(), "POST");
        assert_eq!(request.header("Accept-Encoding"), Some("gzip, br"));
        assert_eq!(request.cookie("currency"), Some("EUR"));
        assert_eq!(request.route(), Some("common/home"));
    }

    #[test]
    fn encoding_negotiation_honours_zero_quality() {
        let request = Request::default().with_header("Accept-Encoding", "gzip, br;q=0");
        assert!(request.accepts_encoding("gzip"));
        assert!(!request.accepts_encoding("br"));
        let request = Request::default().with_header("Accept-Encoding", "BR;q=0.5");
        assert!(request.accepts_encoding("br"));
    }

    #[test]
    fn form_bodies_are_parsed() {
        let request = Request::default().with_form_body("email=a%40b.c&qty=2");
        assert_eq!(request.post("email"), Some("a@b.c"));
        assert_eq!(request.post("qty"), Some("2"));
    }
}
