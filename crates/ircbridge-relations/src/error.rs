//! # Design
//!
//! - Constant-message errors for relation plumbing.
//! - A relation that is simply not there yet is not an error; it is reported through
//!   `RelationState`. Errors here mean the data exchange itself failed.

use ircbridge_config::ConfigError;
use ircbridge_runtime::RuntimeError;
use thiserror::Error;

/// Result alias for relation operations.
pub type RelationResult<T> = Result<T, RelationDataError>;

/// Failures while reading or writing relation data.
#[derive(Debug, Error)]
pub enum RelationDataError {
    /// A Juju hook tool failed.
    #[error("hook tool failed")]
    HookTool {
        /// Hook tool that failed.
        tool: &'static str,
        /// Underlying command failure.
        source: RuntimeError,
    },
    /// A hook tool printed JSON that did not match the expected shape.
    #[error("hook tool output was malformed")]
    Json {
        /// Hook tool whose output was rejected.
        tool: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// A relation field held an unusable value.
    #[error("relation field is invalid")]
    InvalidField {
        /// Relation endpoint.
        relation: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// Relation data did not yield a valid datasource.
    #[error("relation data failed validation")]
    Datasource {
        /// Relation endpoint.
        relation: &'static str,
        /// Underlying validation error.
        source: ConfigError,
    },
    /// A referenced secret lacked the expected content.
    #[error("relation secret is unusable")]
    Secret {
        /// Relation field referencing the secret.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// Encrypting or decrypting exchanged content failed.
    #[error("relation content encryption failed")]
    Fernet {
        /// Codec operation that failed.
        operation: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
}

impl RelationDataError {
    pub(crate) const fn hook_tool(tool: &'static str, source: RuntimeError) -> Self {
        Self::HookTool { tool, source }
    }

    pub(crate) const fn json(tool: &'static str, source: serde_json::Error) -> Self {
        Self::Json { tool, source }
    }

    pub(crate) const fn fernet(operation: &'static str, reason: &'static str) -> Self {
        Self::Fernet { operation, reason }
    }

    /// Whether the Juju agent failed, as opposed to a remote application publishing
    /// unusable data.
    #[must_use]
    pub const fn is_agent_failure(&self) -> bool {
        matches!(self, Self::HookTool { .. } | Self::Json { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn messages_do_not_interpolate_context() {
        let err = RelationDataError::hook_tool(
            "relation-get",
            RuntimeError::Failed {
                program: "relation-get".to_string(),
                code: Some(2),
                stderr: "relation not found".to_string(),
            },
        );
        assert_eq!(err.to_string(), "hook tool failed");
        assert!(err.source().is_some());
        assert!(err.is_agent_failure());

        let fernet = RelationDataError::fernet("decrypt", "bad_signature");
        assert_eq!(fernet.to_string(), "relation content encryption failed");
        assert!(fernet.source().is_none());
        assert!(!fernet.is_agent_failure());
    }
}
