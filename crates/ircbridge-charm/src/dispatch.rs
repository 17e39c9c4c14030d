//! Lifecycle dispatch.
//!
//! # Design
//! - `install` and `upgrade-charm` prepare the workload first; `stop` only stops it;
//!   every other hook is a plain reconciliation trigger.
//! - Inputs are read from the agent before the reconciler runs. Agent failures abort the
//!   hook so Juju retries it; unusable remote data becomes a blocked status.

use ircbridge_config::defaults::IDENT_PORT;
use ircbridge_config::{CharmConfig, ConfigResult, RawCharmOptions};
use ircbridge_relations::{
    DatabaseObserver, HookTools, IngressObserver, IngressRequest, MatrixObserver, RelationResult,
};
use ircbridge_telemetry::record_outcome;
use ircbridge_workload::BridgeWorkload;
use tracing::{error, info};

use crate::error::{CharmError, CharmResult};
use crate::event::LifecycleEvent;
use crate::reconcile::{FailureKind, Outcome, ReconcileInputs, Reconciler};
use crate::status::UnitStatus;

/// Identity of the unit running the hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitIdentity {
    /// Unit name (`<app>/<number>`).
    pub unit: String,
    /// Application name.
    pub app: String,
    /// Model name.
    pub model: String,
}

impl UnitIdentity {
    /// Parse the unit name handed over by the agent.
    ///
    /// # Errors
    ///
    /// Returns [`CharmError::InvalidUnit`] when `unit` is not `<app>/<number>`.
    pub fn new(unit: &str, model: &str) -> CharmResult<Self> {
        let invalid = || CharmError::InvalidUnit {
            value: unit.to_string(),
        };
        let (app, number) = unit.split_once('/').ok_or_else(invalid)?;
        if app.is_empty() || number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        Ok(Self {
            unit: unit.to_string(),
            app: app.to_string(),
            model: model.to_string(),
        })
    }
}

/// Routes lifecycle events to the workload and the reconciler.
#[derive(Debug)]
pub struct Charm<'a, H: ?Sized, W: ?Sized> {
    tools: &'a H,
    workload: &'a W,
    identity: &'a UnitIdentity,
}

impl<'a, H, W> Charm<'a, H, W>
where
    H: HookTools + ?Sized,
    W: BridgeWorkload + ?Sized,
{
    /// Charm for `identity` talking to the agent through `tools`.
    #[must_use]
    pub const fn new(tools: &'a H, workload: &'a W, identity: &'a UnitIdentity) -> Self {
        Self {
            tools,
            workload,
            identity,
        }
    }

    /// Handle one lifecycle event. Returns the reconciliation outcome when one ran.
    ///
    /// # Errors
    ///
    /// Returns a [`CharmError`] when the agent cannot be reached or a lifecycle step
    /// outside reconciliation fails.
    pub fn handle(&self, event: &LifecycleEvent) -> CharmResult<Option<Outcome>> {
        match event {
            LifecycleEvent::Install => {
                self.prepare("Preparing irc bridge", false)?;
            }
            LifecycleEvent::UpgradeCharm => {
                self.prepare("Upgrading dependencies", true)?;
            }
            LifecycleEvent::Stop => {
                self.workload
                    .stop()
                    .map_err(|err| CharmError::workload("stop", err))?;
                info!("bridge stopped");
                return Ok(None);
            }
            _ => {}
        }
        self.reconcile().map(Some)
    }

    fn prepare(&self, message: &str, refresh: bool) -> CharmResult<()> {
        self.report(&UnitStatus::maintenance(message))?;
        self.workload
            .prepare(refresh)
            .map_err(|err| CharmError::workload("prepare", err))
    }

    fn report(&self, status: &UnitStatus) -> CharmResult<()> {
        status
            .apply(self.tools)
            .map_err(|err| CharmError::relation("status_set", err))
    }

    /// Gather inputs, reconcile and report the resulting status.
    ///
    /// # Errors
    ///
    /// Returns [`CharmError::Relation`] when a hook tool fails.
    pub fn reconcile(&self) -> CharmResult<Outcome> {
        let matrix = MatrixObserver::new(self.tools, &self.identity.app);
        let outcome = match self.gather(&matrix) {
            Ok(inputs) => {
                let outcome = Reconciler::new(self.workload, &matrix).reconcile(&inputs);
                if outcome.is_ready() {
                    self.sync_ident_port(&inputs.config)?;
                }
                outcome
            }
            Err(err) if err.is_agent_failure() => {
                return Err(CharmError::relation("gather_inputs", err));
            }
            Err(err) => {
                error!(error = %err, detail = ?err, "relation data rejected");
                Outcome::Error(FailureKind::Relation)
            }
        };
        self.report(&outcome.status())?;
        record_outcome(outcome.label());
        info!(outcome = outcome.label(), "reconciliation finished");
        Ok(outcome)
    }

    fn gather(&self, matrix: &MatrixObserver<'a, H>) -> RelationResult<ReconcileInputs> {
        let database = DatabaseObserver::new(self.tools);
        database.request_database()?;
        let db = database.get_db()?;
        let matrix = matrix.get_matrix()?;
        let config = RawCharmOptions::from_json(self.tools.config_get()?)
            .and_then(|options| CharmConfig::from_options(&options));

        let unit_address = self.tools.unit_address()?;
        let ingress = IngressObserver::new(self.tools);
        ingress.publish(&IngressRequest {
            model: &self.identity.model,
            app: &self.identity.app,
            unit_address: &unit_address,
        })?;
        let media_public_url = ingress.media_url(&unit_address)?;

        Ok(ReconcileInputs {
            db,
            matrix,
            config,
            unit_address,
            media_public_url,
        })
    }

    fn sync_ident_port(&self, config: &ConfigResult<CharmConfig>) -> CharmResult<()> {
        let result = if config.as_ref().is_ok_and(|config| config.ident_enabled) {
            self.tools.open_port(IDENT_PORT)
        } else {
            self.tools.close_port(IDENT_PORT)
        };
        result.map_err(|err| CharmError::relation("ident_port", err))
    }
}
