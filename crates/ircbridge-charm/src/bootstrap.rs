//! Process bootstrap: hook environment, logging and production wiring.

use clap::Parser;
use ircbridge_config::BridgePaths;
use ircbridge_relations::JujuHookTools;
use ircbridge_runtime::{CommandRunner, SystemRunner};
use ircbridge_telemetry::{HookContextGuard, LogFormat, LoggingConfig, init_logging};
use ircbridge_workload::IrcBridgeService;
use tracing::{error, info};

use crate::cli::Cli;
use crate::dispatch::{Charm, UnitIdentity};
use crate::error::{CharmError, CharmResult};
use crate::event::LifecycleEvent;
use crate::reconcile::Outcome;

/// Everything a hook run needs from its environment.
#[derive(Debug, Clone)]
pub(crate) struct HookEnvironment {
    event: LifecycleEvent,
    identity: UnitIdentity,
    departing_relation: Option<String>,
    log_format: LogFormat,
    paths: BridgePaths,
}

impl HookEnvironment {
    /// Build the environment from parsed arguments.
    pub(crate) fn from_cli(cli: &Cli) -> CharmResult<Self> {
        let event = LifecycleEvent::from_dispatch_path(&cli.dispatch_path)?;
        let identity = UnitIdentity::new(&cli.unit_name, &cli.model_name)?;
        let paths = cli
            .root
            .as_deref()
            .map_or_else(BridgePaths::default, BridgePaths::under);
        let departing_relation = cli
            .relation_id
            .clone()
            .filter(|_| event.is_relation_broken());
        Ok(Self {
            event,
            identity,
            departing_relation,
            log_format: cli.log_format.unwrap_or_else(LogFormat::infer),
            paths,
        })
    }
}

/// Entry point for a hook run.
///
/// # Errors
///
/// Returns an error if the environment is malformed, logging cannot be installed, or the
/// hook fails in a way Juju should retry.
pub fn run_charm() -> CharmResult<()> {
    let environment = HookEnvironment::from_cli(&Cli::parse())?;
    let logging = LoggingConfig {
        format: environment.log_format,
        ..LoggingConfig::default()
    };
    init_logging(&logging).map_err(|err| CharmError::telemetry("telemetry.init", err))?;
    let _context = HookContextGuard::new(environment.event.to_string(), &environment.identity.unit);

    info!(event = %environment.event, "hook dispatched");
    dispatch_hook(&environment, &SystemRunner)
        .map(drop)
        .inspect_err(|err| error!(error = %err, detail = ?err, "hook failed"))
}

/// Dispatch the hook against `runner`; all side effects go through it.
pub(crate) fn dispatch_hook<R: CommandRunner + ?Sized>(
    environment: &HookEnvironment,
    runner: &R,
) -> CharmResult<Option<Outcome>> {
    let tools =
        JujuHookTools::new(runner).without_relation(environment.departing_relation.clone());
    let workload = IrcBridgeService::new(runner, environment.paths.clone());
    Charm::new(&tools, &workload, &environment.identity).handle(&environment.event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Readiness;
    use ircbridge_test_support::ScriptedRunner;
    use std::error::Error;
    use tempfile::TempDir;

    fn cli(dispatch_path: &str, root: &std::path::Path) -> Result<Cli, clap::Error> {
        let root = root.to_string_lossy().into_owned();
        Cli::try_parse_from([
            "ircbridge-charm",
            "--dispatch-path",
            dispatch_path,
            "--unit-name",
            "irc-bridge/0",
            "--model-name",
            "chat",
            "--relation-id",
            "database:3",
            "--log-format",
            "pretty",
            "--root",
            root.as_str(),
        ])
    }

    #[test]
    fn environment_roots_paths_under_override() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let environment = HookEnvironment::from_cli(&cli("hooks/start", temp.path())?)?;
        assert_eq!(environment.event, LifecycleEvent::Start);
        assert_eq!(environment.identity.app, "irc-bridge");
        assert_eq!(environment.log_format, LogFormat::Pretty);
        assert!(environment.paths.config_dir().starts_with(temp.path()));
        Ok(())
    }

    #[test]
    fn only_broken_hooks_hide_their_relation() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let broken =
            HookEnvironment::from_cli(&cli("hooks/database-relation-broken", temp.path())?)?;
        assert_eq!(broken.departing_relation.as_deref(), Some("database:3"));

        let changed =
            HookEnvironment::from_cli(&cli("hooks/database-relation-changed", temp.path())?)?;
        assert!(changed.departing_relation.is_none());
        Ok(())
    }

    #[test]
    fn broken_database_relation_blocks_the_unit() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let environment =
            HookEnvironment::from_cli(&cli("hooks/database-relation-broken", temp.path())?)?;
        let runner = ScriptedRunner::new();
        runner
            .stdout("is-leader", &[], "true")
            .stdout("unit-get", &["private-address"], "10.0.0.10")
            .stdout(
                "config-get",
                &[],
                r#"{"bot_nickname":"ircbot","bridge_admins":"@admin:example.com"}"#,
            )
            .stdout("relation-ids", &[], "[]")
            .stdout("relation-ids", &["database"], "[\"database:3\"]");

        assert_eq!(
            dispatch_hook(&environment, &runner)?,
            Some(Outcome::WaitingOnDatabase(Readiness::Absent))
        );
        assert_eq!(
            runner.count("status-set", &["blocked", "Needs a database integration"]),
            1
        );
        assert_eq!(runner.count("relation-list", &["-r", "database:3"]), 0);
        assert_eq!(runner.count("systemctl", &[]), 0);
        Ok(())
    }

    #[test]
    fn stop_hook_only_stops_the_service() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let environment = HookEnvironment::from_cli(&cli("hooks/stop", temp.path())?)?;
        let runner = ScriptedRunner::new();

        assert_eq!(dispatch_hook(&environment, &runner)?, None);
        assert_eq!(runner.count("systemctl", &["stop", "matrix-appservice-irc"]), 1);
        assert_eq!(runner.count("status-set", &[]), 0);
        assert_eq!(runner.count("config-get", &[]), 0);
        Ok(())
    }

    #[test]
    fn stop_failure_fails_the_hook() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let environment = HookEnvironment::from_cli(&cli("hooks/stop", temp.path())?)?;
        let runner = ScriptedRunner::new();
        runner.fail("systemctl", &["stop"], 1, "Job failed");

        assert!(matches!(
            dispatch_hook(&environment, &runner),
            Err(CharmError::Workload {
                operation: "stop",
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn invalid_unit_name_is_rejected() -> Result<(), Box<dyn Error>> {
        let cli = Cli::try_parse_from([
            "ircbridge-charm",
            "--dispatch-path",
            "hooks/install",
            "--unit-name",
            "irc-bridge",
        ])?;
        assert!(matches!(
            HookEnvironment::from_cli(&cli),
            Err(CharmError::InvalidUnit { .. })
        ));
        Ok(())
    }
}
