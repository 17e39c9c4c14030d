//! # Design
//!
//! - Structured, constant-message errors for the bridge workload.
//! - `SnapError` covers the service manager and package installer; its variants are the
//!   install/start/stop/reload refinements callers match on.
//! - `ConfigurationFileError` covers rendering, key material and registration generation.
//! - Context travels in fields, never in the message.

use std::io;
use std::path::PathBuf;

use ircbridge_runtime::RuntimeError;
use thiserror::Error;

/// Result type for workload operations.
pub type WorkloadResult<T> = Result<T, WorkloadError>;

/// Result type for configuration file operations.
pub type ConfigurationFileResult<T> = Result<T, ConfigurationFileError>;

/// Failures raised by the snap installer or the service manager.
#[derive(Debug, Error)]
pub enum SnapError {
    /// Installing, refreshing or enabling the bridge failed.
    #[error("bridge installation failed")]
    Install {
        /// Installation step that failed.
        operation: &'static str,
        /// Underlying command failure.
        source: RuntimeError,
    },
    /// Starting the bridge service failed.
    #[error("bridge start failed")]
    Start {
        /// Underlying command failure.
        source: RuntimeError,
    },
    /// Stopping the bridge service failed.
    #[error("bridge stop failed")]
    Stop {
        /// Underlying command failure.
        source: RuntimeError,
    },
    /// Reloading the bridge service failed.
    #[error("bridge reload failed")]
    Reload {
        /// Underlying command failure.
        source: RuntimeError,
    },
    /// Querying the service state failed.
    #[error("bridge status query failed")]
    Status {
        /// Underlying command failure.
        source: RuntimeError,
    },
}

/// Failures raised while producing the bridge's on-disk files.
#[derive(Debug, Error)]
pub enum ConfigurationFileError {
    /// IO failures while reading or writing configuration files.
    #[error("configuration file io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// YAML parsing or serialization failures.
    #[error("configuration file yaml failure")]
    Yaml {
        /// Operation that triggered the YAML failure.
        operation: &'static str,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// The embedded template lacks a section the renderer patches.
    #[error("configuration template is malformed")]
    Template {
        /// Dotted key that could not be patched.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// Generating key material failed.
    #[error("key generation failed")]
    KeyGeneration {
        /// Key that could not be generated.
        key: &'static str,
        /// Underlying command failure.
        source: RuntimeError,
    },
    /// Generated key material was unusable.
    #[error("generated key is invalid")]
    InvalidKey {
        /// Key that was rejected.
        key: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// The bridge's registration generator failed.
    #[error("registration generation failed")]
    RegistrationCommand {
        /// Underlying command failure.
        source: RuntimeError,
    },
    /// The registration document is not YAML.
    #[error("registration document is malformed")]
    RegistrationYaml {
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// The registration document was missing a required field.
    #[error("registration document is invalid")]
    RegistrationInvalid {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
}

/// Errors surfaced by the bridge workload to the reconciliation controller.
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// Service manager or installer failure.
    #[error("snap operation failed")]
    Snap {
        /// Underlying snap error.
        #[from]
        source: SnapError,
    },
    /// Rendering or key management failure.
    #[error("configuration file operation failed")]
    ConfigurationFile {
        /// Underlying configuration file error.
        #[from]
        source: ConfigurationFileError,
    },
}

impl ConfigurationFileError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) const fn yaml(operation: &'static str, source: serde_yaml::Error) -> Self {
        Self::Yaml { operation, source }
    }

    pub(crate) const fn template(field: &'static str, reason: &'static str) -> Self {
        Self::Template { field, reason }
    }

    /// Whether the failure concerns the registration document.
    #[must_use]
    pub const fn is_registration(&self) -> bool {
        matches!(
            self,
            Self::RegistrationCommand { .. }
                | Self::RegistrationYaml { .. }
                | Self::RegistrationInvalid { .. }
        )
    }
}
