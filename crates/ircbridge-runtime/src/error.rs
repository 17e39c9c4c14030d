//! # Design
//!
//! - Keep messages constant; the program name and exit details travel as fields.
//! - Preserve the spawn source error so callers can distinguish "missing binary" from "failed run".

use std::io;

use thiserror::Error;

/// Result alias for child-process operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised while running a child process.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The process could not be spawned.
    #[error("failed to spawn process")]
    Spawn {
        /// Program that failed to spawn.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The process exited unsuccessfully.
    #[error("process exited unsuccessfully")]
    Failed {
        /// Program that failed.
        program: String,
        /// Exit code when the process was not killed by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },
    /// The process wrote output that was not valid UTF-8.
    #[error("process output was not valid utf-8")]
    Utf8 {
        /// Program whose output failed to decode.
        program: String,
        /// Underlying conversion error.
        source: std::string::FromUtf8Error,
    },
}

impl RuntimeError {
    /// Program associated with the failure.
    #[must_use]
    pub fn program(&self) -> &str {
        match self {
            Self::Spawn { program, .. } | Self::Failed { program, .. } | Self::Utf8 { program, .. } => {
                program
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn runtime_error_messages_are_constant() {
        let spawn = RuntimeError::Spawn {
            program: "snap".to_string(),
            source: io::Error::other("missing"),
        };
        assert_eq!(spawn.to_string(), "failed to spawn process");
        assert_eq!(spawn.program(), "snap");
        assert!(spawn.source().is_some());

        let failed = RuntimeError::Failed {
            program: "systemctl".to_string(),
            code: Some(5),
            stderr: "unit not found".to_string(),
        };
        assert_eq!(failed.to_string(), "process exited unsuccessfully");
        assert_eq!(failed.program(), "systemctl");
        assert!(failed.source().is_none());
    }
}
