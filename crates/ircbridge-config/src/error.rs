//! Error types for charm option parsing and datasource validation.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation (`options`, `database`, `matrix`).
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when it is safe to echo.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Charm options payload could not be decoded.
    #[error("invalid charm options payload")]
    OptionsPayload {
        /// Source JSON error.
        source: serde_json::Error,
    },
    /// A URL could not be parsed or assembled.
    #[error("invalid url")]
    Url {
        /// Field the URL belongs to.
        field: &'static str,
        /// Source parse error.
        source: url::ParseError,
    },
    /// Built-in validation pattern failed to compile.
    #[error("invalid validation pattern")]
    Pattern {
        /// Source regex error.
        source: regex::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        reason: &'static str,
        value: Option<String>,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value,
            reason,
        }
    }

    /// Short human-readable description suitable for a unit status message.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::InvalidField {
                field,
                reason,
                value: Some(value),
                ..
            } => format!("invalid {field} ({reason}): {value}"),
            Self::InvalidField { field, reason, .. } => format!("invalid {field} ({reason})"),
            Self::OptionsPayload { .. } => "unreadable charm options".to_string(),
            Self::Url { field, .. } => format!("invalid {field} url"),
            Self::Pattern { .. } => "internal validation error".to_string(),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_includes_field_and_reason() {
        let err = ConfigError::invalid("options", "bot_nickname", "empty", None);
        assert_eq!(err.to_string(), "invalid configuration field");
        assert_eq!(err.summary(), "invalid bot_nickname (empty)");

        let err = ConfigError::invalid(
            "options",
            "bridge_admins",
            "malformed_user_id",
            Some("@bad".to_string()),
        );
        assert_eq!(err.summary(), "invalid bridge_admins (malformed_user_id): @bad");
    }
}
