//! # Design
//!
//! - Errors that escape a hook run; reconciliation failures become unit status instead.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use ircbridge_relations::RelationDataError;
use ircbridge_telemetry::TelemetryError;
use ircbridge_workload::WorkloadError;
use thiserror::Error;

/// Result alias for charm operations.
pub type CharmResult<T> = Result<T, CharmError>;

/// Charm-level error type.
#[derive(Debug, Error)]
pub enum CharmError {
    /// The dispatch path did not name a hook.
    #[error("invalid dispatch path")]
    InvalidDispatch {
        /// Dispatch path as received.
        value: String,
    },
    /// A unit name did not have the `<app>/<number>` shape.
    #[error("invalid unit name")]
    InvalidUnit {
        /// Unit name as received.
        value: String,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: TelemetryError,
    },
    /// Talking to the Juju agent failed outside reconciliation.
    #[error("hook tool operation failed")]
    Relation {
        /// Operation identifier.
        operation: &'static str,
        /// Source relation error.
        source: RelationDataError,
    },
    /// A workload operation failed outside reconciliation.
    #[error("workload operation failed")]
    Workload {
        /// Operation identifier.
        operation: &'static str,
        /// Source workload error.
        source: WorkloadError,
    },
}

impl CharmError {
    pub(crate) const fn telemetry(operation: &'static str, source: TelemetryError) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn relation(operation: &'static str, source: RelationDataError) -> Self {
        Self::Relation { operation, source }
    }

    pub(crate) const fn workload(operation: &'static str, source: WorkloadError) -> Self {
        Self::Workload { operation, source }
    }
}
