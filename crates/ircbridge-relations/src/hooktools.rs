//! Client for the Juju hook tools available while a hook runs.
//!
//! # Design
//! - `HookTools` is the seam between relation observers and the agent; tests implement it
//!   by scripting a `CommandRunner`.
//! - Every read uses `--format=json` so values with spaces or newlines survive intact.
//! - Juju keeps listing a relation while its `-relation-broken` hook runs; the client hides
//!   that relation so observers report it as absent.

use std::collections::BTreeMap;

use ircbridge_runtime::{CommandRunner, CommandSpec};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{RelationDataError, RelationResult};

/// String key/value data stored in a relation databag or a secret.
pub type Databag = BTreeMap<String, String>;

/// Operations on the Juju agent used by the operator.
pub trait HookTools {
    /// Charm options as JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `config-get` fails.
    fn config_get(&self) -> RelationResult<Value>;

    /// Whether this unit is the application leader.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `is-leader` fails.
    fn is_leader(&self) -> RelationResult<bool>;

    /// Address peers and the homeserver reach this unit on.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `unit-get` fails.
    fn unit_address(&self) -> RelationResult<String>;

    /// Relation ids established on `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `relation-ids` fails.
    fn relation_ids(&self, endpoint: &str) -> RelationResult<Vec<String>>;

    /// Remote application on `relation_id`, once it has joined.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `relation-list` fails.
    fn remote_app(&self, relation_id: &str) -> RelationResult<Option<String>>;

    /// Application databag of `app` on `relation_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `relation-get` fails.
    fn app_data(&self, relation_id: &str, app: &str) -> RelationResult<Databag>;

    /// Write keys into this application's databag on `relation_id`. Leader only.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `relation-set` fails.
    fn set_app_data(&self, relation_id: &str, data: &Databag) -> RelationResult<()>;

    /// Write keys into this unit's databag on `relation_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `relation-set` fails.
    fn set_unit_data(&self, relation_id: &str, data: &Databag) -> RelationResult<()>;

    /// Content of the secret `uri`.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `secret-get` fails.
    fn secret_get(&self, uri: &str) -> RelationResult<Databag>;

    /// Set the unit workload status.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `status-set` fails.
    fn status_set(&self, status: &str, message: &str) -> RelationResult<()>;

    /// Open a TCP port on the unit.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `open-port` fails.
    fn open_port(&self, port: u16) -> RelationResult<()>;

    /// Close a TCP port on the unit.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when `close-port` fails.
    fn close_port(&self, port: u16) -> RelationResult<()>;
}

/// `HookTools` backed by the agent's command line tools.
#[derive(Debug, Clone)]
pub struct JujuHookTools<R> {
    runner: R,
    departing: Option<String>,
}

impl<R: CommandRunner> JujuHookTools<R> {
    /// Hook tools invoked through `runner`.
    #[must_use]
    pub const fn new(runner: R) -> Self {
        Self {
            runner,
            departing: None,
        }
    }

    /// Hide `relation_id` from [`HookTools::relation_ids`] for the rest of the hook.
    #[must_use]
    pub fn without_relation(self, relation_id: Option<String>) -> Self {
        Self {
            departing: relation_id,
            ..self
        }
    }

    fn stdout(&self, tool: &'static str, spec: &CommandSpec) -> RelationResult<String> {
        debug!(command = %spec, "invoking hook tool");
        self.runner
            .check_stdout(spec)
            .map_err(|source| RelationDataError::hook_tool(tool, source))
    }

    fn json<T: DeserializeOwned>(&self, tool: &'static str, spec: &CommandSpec) -> RelationResult<T> {
        let stdout = self.stdout(tool, spec)?;
        serde_json::from_str(&stdout).map_err(|source| RelationDataError::json(tool, source))
    }

    fn relation_set(&self, relation_id: &str, app: bool, data: &Databag) -> RelationResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut spec = CommandSpec::new("relation-set").args(["-r", relation_id]);
        if app {
            spec = spec.arg("--app");
        }
        let spec = spec.args(data.iter().map(|(key, value)| format!("{key}={value}")));
        self.stdout("relation-set", &spec).map(drop)
    }

    fn port(&self, tool: &'static str, port: u16) -> RelationResult<()> {
        let spec = CommandSpec::new(tool).arg(format!("{port}/tcp"));
        self.stdout(tool, &spec).map(drop)
    }
}

impl<R: CommandRunner> HookTools for JujuHookTools<R> {
    fn config_get(&self) -> RelationResult<Value> {
        self.json(
            "config-get",
            &CommandSpec::new("config-get").arg("--format=json"),
        )
    }

    fn is_leader(&self) -> RelationResult<bool> {
        self.json(
            "is-leader",
            &CommandSpec::new("is-leader").arg("--format=json"),
        )
    }

    fn unit_address(&self) -> RelationResult<String> {
        let address = self.stdout(
            "unit-get",
            &CommandSpec::new("unit-get").arg("private-address"),
        )?;
        let address = address.trim();
        if address.is_empty() {
            return Err(RelationDataError::InvalidField {
                relation: "unit",
                field: "private-address",
                reason: "empty",
            });
        }
        Ok(address.to_string())
    }

    fn relation_ids(&self, endpoint: &str) -> RelationResult<Vec<String>> {
        let ids: Option<Vec<String>> = self.json(
            "relation-ids",
            &CommandSpec::new("relation-ids").args([endpoint, "--format=json"]),
        )?;
        let mut ids = ids.unwrap_or_default();
        ids.retain(|id| self.departing.as_deref() != Some(id.as_str()));
        Ok(ids)
    }

    fn remote_app(&self, relation_id: &str) -> RelationResult<Option<String>> {
        let app = self.stdout(
            "relation-list",
            &CommandSpec::new("relation-list").args(["-r", relation_id, "--app"]),
        )?;
        let app = app.trim();
        Ok((!app.is_empty()).then(|| app.to_string()))
    }

    fn app_data(&self, relation_id: &str, app: &str) -> RelationResult<Databag> {
        let data: Option<Databag> = self.json(
            "relation-get",
            &CommandSpec::new("relation-get").args([
                "-r",
                relation_id,
                "--app",
                "--format=json",
                "-",
                app,
            ]),
        )?;
        Ok(data.unwrap_or_default())
    }

    fn set_app_data(&self, relation_id: &str, data: &Databag) -> RelationResult<()> {
        self.relation_set(relation_id, true, data)
    }

    fn set_unit_data(&self, relation_id: &str, data: &Databag) -> RelationResult<()> {
        self.relation_set(relation_id, false, data)
    }

    fn secret_get(&self, uri: &str) -> RelationResult<Databag> {
        self.json(
            "secret-get",
            &CommandSpec::new("secret-get").args([uri, "--format=json"]),
        )
    }

    fn status_set(&self, status: &str, message: &str) -> RelationResult<()> {
        let spec = CommandSpec::new("status-set").args([status, message]);
        self.stdout("status-set", &spec).map(drop)
    }

    fn open_port(&self, port: u16) -> RelationResult<()> {
        self.port("open-port", port)
    }

    fn close_port(&self, port: u16) -> RelationResult<()> {
        self.port("close-port", port)
    }
}

/// First relation established on `endpoint`; the operator declares every endpoint with limit 1.
pub(crate) fn first_relation<H: HookTools + ?Sized>(
    tools: &H,
    endpoint: &str,
) -> RelationResult<Option<String>> {
    Ok(tools.relation_ids(endpoint)?.into_iter().next())
}

/// Remote application databag, empty until the remote application has joined.
pub(crate) fn remote_app_data<H: HookTools + ?Sized>(
    tools: &H,
    relation_id: &str,
) -> RelationResult<Databag> {
    match tools.remote_app(relation_id)? {
        Some(app) => tools.app_data(relation_id, &app),
        None => Ok(Databag::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ircbridge_test_support::ScriptedRunner;
    use std::error::Error;

    #[test]
    fn reads_decode_json_output() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        runner
            .stdout("is-leader", &[], "true\n")
            .stdout("relation-ids", &["database"], "[\"database:4\"]\n")
            .stdout("relation-ids", &["matrix-auth"], "[]\n")
            .stdout("relation-list", &["-r", "database:4"], "postgresql\n")
            .stdout(
                "relation-get",
                &["-r", "database:4"],
                "{\"endpoints\":\"10.0.0.5:5432\"}",
            )
            .stdout("unit-get", &["private-address"], "10.0.0.10\n");
        let tools = JujuHookTools::new(&runner);

        assert!(tools.is_leader()?);
        assert_eq!(tools.relation_ids("database")?, vec!["database:4".to_string()]);
        assert!(tools.relation_ids("matrix-auth")?.is_empty());
        assert_eq!(tools.remote_app("database:4")?.as_deref(), Some("postgresql"));
        assert_eq!(
            tools
                .app_data("database:4", "postgresql")?
                .get("endpoints")
                .map(String::as_str),
            Some("10.0.0.5:5432")
        );
        assert_eq!(tools.unit_address()?, "10.0.0.10");
        Ok(())
    }

    #[test]
    fn departing_relation_is_hidden() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        runner
            .stdout("relation-ids", &["database"], "[\"database:3\"]")
            .stdout("relation-ids", &["matrix-auth"], "[\"matrix-auth:9\"]");
        let tools = JujuHookTools::new(&runner).without_relation(Some("database:3".to_string()));

        assert!(tools.relation_ids("database")?.is_empty());
        assert!(first_relation(&tools, "database")?.is_none());
        assert_eq!(tools.relation_ids("matrix-auth")?, vec!["matrix-auth:9".to_string()]);
        Ok(())
    }

    #[test]
    fn empty_relation_data_decodes_as_empty_bag() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        runner
            .stdout("relation-get", &[], "null\n")
            .stdout("relation-list", &[], "\n");
        let tools = JujuHookTools::new(&runner);
        assert!(tools.app_data("database:4", "postgresql")?.is_empty());
        assert!(tools.remote_app("database:4")?.is_none());
        Ok(())
    }

    #[test]
    fn writes_use_key_value_arguments() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        let tools = JujuHookTools::new(&runner);
        let data = Databag::from([("database".to_string(), "ircbridge".to_string())]);

        tools.set_app_data("database:4", &data)?;
        tools.set_unit_data("ingress-media:7", &Databag::new())?;
        tools.status_set("active", "")?;
        tools.open_port(113)?;

        let calls = runner.calls();
        assert_eq!(calls[0].to_string(), "relation-set -r database:4 --app database=ircbridge");
        assert_eq!(calls[1].to_string(), "status-set active ");
        assert_eq!(calls[2].to_string(), "open-port 113/tcp");
        assert_eq!(calls.len(), 3);
        Ok(())
    }

    #[test]
    fn failing_tool_is_reported_by_name() {
        let runner = ScriptedRunner::new();
        runner.fail("secret-get", &[], 1, "secret not found");
        let tools = JujuHookTools::new(&runner);
        assert!(matches!(
            tools.secret_get("secret:abc"),
            Err(RelationDataError::HookTool {
                tool: "secret-get",
                ..
            })
        ));
    }
}
