use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output shapes understood by the `tracing` subscriber.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, fields flattened.
    #[default]
    Json,
    /// Single-line text.
    Compact,
    /// Multi-line text for local development.
    Pretty,
}

impl LogFormat {
    /// Returns `true` for the formats meant to be read by people.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Compact | Self::Pretty)
    }
}

/// Error returned when text does not name a [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>().ok(), Some(LogFormat::Pretty));
    }

    #[test]
    fn rejects_unknown_format() {
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn json_is_not_textual() {
        assert!(!LogFormat::Json.is_textual());
        assert!(LogFormat::Compact.is_textual());
    }
}
