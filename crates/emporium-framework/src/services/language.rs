//! Translated strings.

use std::collections::HashMap;

/// Code used when `language_default` is not configured.
pub const DEFAULT_LANGUAGE: &str = "en-gb";

/// String table for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    code: String,
    strings: HashMap<String, String>,
}

impl Default for Language {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl Language {
    /// Creates an empty table for `code`.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            strings: HashMap::new(),
        }
    }

    /// Language code such as `en-gb`.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Translation of `key`, or the key itself when none is loaded.
    #[must_use]
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.strings.get(key).map_or(key, String::as_str)
    }

    /// Translation of `key`, or `fallback` when none is loaded.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.strings.get(key).map_or(fallback, String::as_str)
    }

    /// Sets one translation.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    /// Merges the string values of a parsed language file. Later files
    /// override earlier keys; non-string values are ignored.
    pub fn merge(&mut self, table: toml::Table) {
        for (key, value) in table {
            if let toml::Value::String(text) = value {
                self.strings.insert(key, text);
            }
        }
    }

    /// Number of loaded strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns `true` when nothing is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_fall_back_to_themselves() {
        let mut language = Language::default();
        language.set("heading_title", "Your Store");
        assert_eq!(language.get("heading_title"), "Your Store");
        assert_eq!(language.get("text_missing"), "text_missing");
        assert_eq!(language.get_or("text_missing", "Missing"), "Missing");
    }

    #[test]
    fn merge_keeps_strings_only() {
        let mut language = Language::new("de-de");
        let table: toml::Table = "a = \"eins\"\nb = 2\n".parse().expect("parse");
        language.merge(table);
        assert_eq!(language.len(), 1);
        assert_eq!(language.code(), "de-de");
    }
}
