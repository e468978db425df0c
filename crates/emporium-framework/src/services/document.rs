//! Page metadata collected while a page is built.

use std::collections::BTreeMap;

/// A `<link>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Target URL.
    pub href: String,
    /// Relation.
    pub rel: String,
}

/// A stylesheet reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    /// Stylesheet URL.
    pub href: String,
    /// Relation, normally `stylesheet`.
    pub rel: String,
    /// Media query.
    pub media: String,
}

/// Head metadata for the page being rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    title: String,
    description: String,
    keywords: String,
    links: Vec<Link>,
    styles: Vec<Style>,
    scripts: BTreeMap<String, Vec<String>>,
}

impl Document {
    /// Page title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Sets the page title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Meta description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Sets the meta description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Meta keywords.
    #[must_use]
    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    /// Sets the meta keywords.
    pub fn set_keywords(&mut self, keywords: impl Into<String>) {
        self.keywords = keywords.into();
    }

    /// Adds a link, ignoring repeats of the same `href`.
    pub fn add_link(&mut self, href: impl Into<String>, rel: impl Into<String>) {
        let href = href.into();
        if self.links.iter().all(|link| link.href != href) {
            self.links.push(Link {
                href,
                rel: rel.into(),
            });
        }
    }

    /// Links in insertion order.
    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Adds a stylesheet, ignoring repeats of the same `href`.
    pub fn add_style(&mut self, href: impl Into<String>, media: impl Into<String>) {
        let href = href.into();
        if self.styles.iter().all(|style| style.href != href) {
            self.styles.push(Style {
                href,
                rel: String::from("stylesheet"),
                media: media.into(),
            });
        }
    }

    /// Stylesheets in insertion order.
    #[must_use]
    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    /// Adds a script to a position such as `header` or `footer`.
    pub fn add_script(&mut self, href: impl Into<String>, position: &str) {
        let href = href.into();
        let scripts = self.scripts.entry(position.to_owned()).or_default();
        if !scripts.contains(&href) {
            scripts.push(href);
        }
    }

    /// Scripts registered for `position`.
    #[must_use]
    pub fn scripts(&self, position: &str) -> &[String] {
        self.scripts.get(position).map_or(&[], Vec::as_slice)
    }
}
