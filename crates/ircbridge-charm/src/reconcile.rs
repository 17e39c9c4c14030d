//! Reconciliation controller.
//!
//! # Design
//! - Every run re-evaluates readiness from scratch. The only state carried between hooks is
//!   the workload's record of what the running bridge loaded, so a reload that failed or was
//!   never reached is retried by the next run.
//! - Readiness is checked in a fixed order (database, homeserver, options) and nothing
//!   touches the workload until all three are usable.
//! - Step failures are logged once here and classified; the caller only sees an
//!   [`Outcome`]. There is no retry: the next hook re-runs the whole evaluation.

use std::error::Error;

use ircbridge_config::{CharmConfig, ConfigResult, DatasourceMatrix, DatasourcePostgreSQL};
use ircbridge_relations::{HookTools, MatrixObserver, RelationResult, RelationState};
use ircbridge_workload::{BridgeWorkload, RenderRequest, ServiceState, WorkloadError};
use tracing::{debug, error, info};

use crate::status::UnitStatus;

/// Why a relation is not usable yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// No relation on the endpoint.
    Absent,
    /// Relation joined but data is missing.
    Incomplete {
        /// Fields the remote side has not published.
        missing: Vec<&'static str>,
    },
}

/// What the service controller did to converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    /// The bridge was not running and has been started.
    Started,
    /// The bridge was running with stale files and has been reloaded.
    Reloaded,
    /// The bridge was running and nothing changed.
    Unchanged,
}

/// Reconciliation step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Installing the snap or its units.
    Install,
    /// Rendering configuration or producing key material.
    Configuration,
    /// Generating or parsing the registration document.
    Registration,
    /// Querying the service manager.
    Status,
    /// Starting the bridge.
    Start,
    /// Reloading the bridge.
    Reload,
    /// Publishing the registration to the homeserver.
    Relation,
}

impl FailureKind {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Configuration => "configuration",
            Self::Registration => "registration",
            Self::Status => "status",
            Self::Start => "start",
            Self::Reload => "reload",
            Self::Relation => "relation",
        }
    }

    const fn message(self) -> &'static str {
        match self {
            Self::Install => "Failed to install the bridge",
            Self::Configuration => "Failed to write bridge configuration",
            Self::Registration => "Failed to generate the appservice registration",
            Self::Status => "Failed to query the bridge service",
            Self::Start => "Failed to start the bridge",
            Self::Reload => "Failed to reload the bridge",
            Self::Relation => "Failed to publish the registration",
        }
    }
}

/// Result of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The bridge is configured and running.
    Ready(ServiceAction),
    /// The database relation is not usable.
    WaitingOnDatabase(Readiness),
    /// The matrix-auth relation is not usable.
    WaitingOnMatrix(Readiness),
    /// Charm options failed validation.
    InvalidConfig(String),
    /// A workload or relation step failed.
    Error(FailureKind),
}

fn waiting_status(relation: &str, readiness: &Readiness) -> UnitStatus {
    match readiness {
        Readiness::Absent => UnitStatus::blocked(format!("Needs a {relation} integration")),
        Readiness::Incomplete { missing } if missing.is_empty() => {
            UnitStatus::waiting(format!("Waiting for {relation} data"))
        }
        Readiness::Incomplete { missing } => UnitStatus::waiting(format!(
            "Waiting for {relation} data: {}",
            missing.join(", ")
        )),
    }
}

impl Outcome {
    /// Unit status reported for this outcome.
    #[must_use]
    pub fn status(&self) -> UnitStatus {
        match self {
            Self::Ready(_) => UnitStatus::active(),
            Self::WaitingOnDatabase(readiness) => waiting_status("database", readiness),
            Self::WaitingOnMatrix(readiness) => waiting_status("matrix-auth", readiness),
            Self::InvalidConfig(reason) => {
                UnitStatus::blocked(format!("Invalid configuration: {reason}"))
            }
            Self::Error(kind) => UnitStatus::blocked(kind.message()),
        }
    }

    /// Stable label recorded on the hook span.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ready(_) => "ready",
            Self::WaitingOnDatabase(_) => "waiting_on_database",
            Self::WaitingOnMatrix(_) => "waiting_on_matrix",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Error(_) => "error",
        }
    }

    /// Whether the bridge converged.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Everything a reconciliation run reads, gathered before it starts.
#[derive(Debug)]
pub struct ReconcileInputs {
    /// Database relation state.
    pub db: RelationState<DatasourcePostgreSQL>,
    /// Homeserver relation state.
    pub matrix: RelationState<DatasourceMatrix>,
    /// Parsed charm options.
    pub config: ConfigResult<CharmConfig>,
    /// Address of this unit.
    pub unit_address: String,
    /// Public URL of the media proxy.
    pub media_public_url: String,
}

/// Hands the registration document to the homeserver.
pub trait RegistrationPublisher {
    /// Publish `content`; returns whether anything was written.
    ///
    /// # Errors
    ///
    /// Returns a relation error when publishing fails.
    fn publish_registration(&self, content: &str) -> RelationResult<bool>;
}

impl<H: HookTools + ?Sized> RegistrationPublisher for MatrixObserver<'_, H> {
    fn publish_registration(&self, content: &str) -> RelationResult<bool> {
        self.set_irc_registration(content)
    }
}

fn ready<T>(state: &RelationState<T>) -> Result<&T, Readiness> {
    match state {
        RelationState::Ready(value) => Ok(value),
        RelationState::Absent => Err(Readiness::Absent),
        RelationState::Incomplete { missing } => Err(Readiness::Incomplete {
            missing: missing.clone(),
        }),
    }
}

fn failed<E: Error>(kind: FailureKind, err: &E) -> FailureKind {
    error!(step = kind.as_str(), error = %err, detail = ?err, "reconciliation step failed");
    kind
}

fn configure_failure(err: &WorkloadError) -> FailureKind {
    match err {
        WorkloadError::ConfigurationFile { source } if source.is_registration() => {
            FailureKind::Registration
        }
        WorkloadError::ConfigurationFile { .. } | WorkloadError::Snap { .. } => {
            FailureKind::Configuration
        }
    }
}

/// Drives a [`BridgeWorkload`] towards the state implied by its inputs.
#[derive(Debug)]
pub struct Reconciler<'a, W: ?Sized, P: ?Sized> {
    workload: &'a W,
    publisher: &'a P,
}

impl<'a, W, P> Reconciler<'a, W, P>
where
    W: BridgeWorkload + ?Sized,
    P: RegistrationPublisher + ?Sized,
{
    /// Controller driving `workload` and publishing through `publisher`.
    #[must_use]
    pub const fn new(workload: &'a W, publisher: &'a P) -> Self {
        Self {
            workload,
            publisher,
        }
    }

    /// Evaluate readiness and converge the bridge.
    pub fn reconcile(&self, inputs: &ReconcileInputs) -> Outcome {
        let db = match ready(&inputs.db) {
            Ok(db) => db,
            Err(readiness) => {
                debug!(?readiness, "database not ready");
                return Outcome::WaitingOnDatabase(readiness);
            }
        };
        let matrix = match ready(&inputs.matrix) {
            Ok(matrix) => matrix,
            Err(readiness) => {
                debug!(?readiness, "homeserver not ready");
                return Outcome::WaitingOnMatrix(readiness);
            }
        };
        let config = match inputs.config.as_ref() {
            Ok(config) => config,
            Err(err) => return Outcome::InvalidConfig(err.summary()),
        };
        if let Err(err) = config.validate() {
            info!(reason = %err.summary(), "charm options rejected");
            return Outcome::InvalidConfig(err.summary());
        }

        let request = RenderRequest {
            db,
            matrix,
            config,
            unit_address: &inputs.unit_address,
            media_public_url: &inputs.media_public_url,
        };
        match self.converge(&request) {
            Ok(action) => Outcome::Ready(action),
            Err(kind) => Outcome::Error(kind),
        }
    }

    fn converge(&self, request: &RenderRequest<'_>) -> Result<ServiceAction, FailureKind> {
        let mut state = self
            .workload
            .state()
            .map_err(|err| failed(FailureKind::Status, &err))?;
        if state == ServiceState::NotInstalled {
            self.workload
                .prepare(false)
                .map_err(|err| failed(FailureKind::Install, &err))?;
            state = ServiceState::Stopped;
        }

        let rendered = self
            .workload
            .configure(request)
            .map_err(|err| failed(configure_failure(&err), &err))?;
        self.publisher
            .publish_registration(rendered.registration.content())
            .map_err(|err| failed(FailureKind::Relation, &err))?;

        let action = match (state, rendered.reload_pending) {
            (ServiceState::Running, false) => ServiceAction::Unchanged,
            (ServiceState::Running, true) => {
                self.workload
                    .reload()
                    .map_err(|err| failed(FailureKind::Reload, &err))?;
                ServiceAction::Reloaded
            }
            (ServiceState::NotInstalled | ServiceState::Stopped, _) => {
                self.workload
                    .start()
                    .map_err(|err| failed(FailureKind::Start, &err))?;
                ServiceAction::Started
            }
        };
        info!(action = ?action, state = state.as_str(), "bridge converged");
        Ok(action)
    }
}
