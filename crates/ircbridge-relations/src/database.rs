//! Observer for the PostgreSQL `database` relation.

use ircbridge_config::DatasourcePostgreSQL;
use ircbridge_config::defaults::{DATABASE_NAME, DATABASE_RELATION};
use tracing::{debug, info};

use crate::error::{RelationDataError, RelationResult};
use crate::hooktools::{Databag, HookTools, first_relation, remote_app_data};
use crate::state::{MissingFields, RelationState};

/// Reads provider credentials and requests the bridge database.
#[derive(Debug)]
pub struct DatabaseObserver<'h, H: ?Sized> {
    tools: &'h H,
}

impl<'h, H: HookTools + ?Sized> DatabaseObserver<'h, H> {
    /// Observer reading through `tools`.
    #[must_use]
    pub const fn new(tools: &'h H) -> Self {
        Self { tools }
    }

    /// Ask the provider for the bridge database. Only the leader writes.
    ///
    /// Returns whether the request was written.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when a hook tool fails.
    pub fn request_database(&self) -> RelationResult<bool> {
        let Some(relation_id) = first_relation(self.tools, DATABASE_RELATION)? else {
            return Ok(false);
        };
        if !self.tools.is_leader()? {
            return Ok(false);
        }
        let request = Databag::from([("database".to_string(), DATABASE_NAME.to_string())]);
        self.tools.set_app_data(&relation_id, &request)?;
        debug!(relation = %relation_id, database = DATABASE_NAME, "requested database");
        Ok(true)
    }

    /// Current database datasource.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when a hook tool fails or the provider published
    /// unusable values.
    pub fn get_db(&self) -> RelationResult<RelationState<DatasourcePostgreSQL>> {
        let Some(relation_id) = first_relation(self.tools, DATABASE_RELATION)? else {
            return Ok(RelationState::Absent);
        };
        let data = remote_app_data(self.tools, &relation_id)?;

        let mut missing = MissingFields::default();
        let endpoint = missing.take(
            "endpoints",
            data.get("endpoints")
                .and_then(|endpoints| endpoints.split(',').next())
                .map(|endpoint| endpoint.trim().to_string()),
        );
        let (username, password) = match data.get("secret-user").filter(|uri| !uri.is_empty()) {
            Some(uri) => {
                let secret = self.tools.secret_get(uri)?;
                (secret.get("username").cloned(), secret.get("password").cloned())
            }
            None => (data.get("username").cloned(), data.get("password").cloned()),
        };
        let username = missing.take("username", username);
        let password = missing.take("password", password);
        let database = missing.take("database", data.get("database").cloned());

        let (Some(endpoint), Some(username), Some(password), Some(database)) =
            (endpoint, username, password, database)
        else {
            return Ok(missing.into_incomplete());
        };

        let datasource_error = |source| RelationDataError::Datasource {
            relation: DATABASE_RELATION,
            source,
        };
        let (host, port) =
            DatasourcePostgreSQL::parse_endpoint(&endpoint).map_err(datasource_error)?;
        let datasource = DatasourcePostgreSQL::new(username, password, host, port, database)
            .map_err(datasource_error)?;
        info!(host = %datasource.host, port = datasource.port, db = %datasource.db, "database ready");
        Ok(RelationState::Ready(datasource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooktools::JujuHookTools;
    use ircbridge_test_support::ScriptedRunner;
    use std::error::Error;

    fn related(runner: &ScriptedRunner, app_data: &str) {
        runner
            .stdout("relation-ids", &["database"], "[\"database:3\"]")
            .stdout("relation-list", &["-r", "database:3"], "postgresql")
            .stdout("relation-get", &["-r", "database:3"], app_data);
    }

    #[test]
    fn absent_relation_is_reported_as_absent() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        runner.stdout("relation-ids", &[], "[]");
        let tools = JujuHookTools::new(&runner);
        let observer = DatabaseObserver::new(&tools);
        assert_eq!(observer.get_db()?, RelationState::Absent);
        assert!(!observer.request_database()?);
        Ok(())
    }

    #[test]
    fn joined_relation_without_credentials_is_incomplete() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(&runner, "{\"database\":\"irc\"}");
        let tools = JujuHookTools::new(&runner);
        assert_eq!(
            DatabaseObserver::new(&tools).get_db()?,
            RelationState::Incomplete {
                missing: vec!["endpoints", "username", "password"]
            }
        );
        Ok(())
    }

    #[test]
    fn plain_credentials_build_the_datasource() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(
            &runner,
            r#"{"endpoints":"10.0.0.5:5432,10.0.0.6:5432","username":"u","password":"p","database":"irc"}"#,
        );
        let tools = JujuHookTools::new(&runner);
        let RelationState::Ready(db) = DatabaseObserver::new(&tools).get_db()? else {
            return Err("expected ready datasource".into());
        };
        assert_eq!(db.host, "10.0.0.5");
        assert_eq!(db.port, 5432);
        assert_eq!(db.uri.expose(), "postgresql://u:p@10.0.0.5:5432/irc");
        Ok(())
    }

    #[test]
    fn secret_credentials_are_resolved() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(
            &runner,
            r#"{"endpoints":"db.internal:5432","secret-user":"secret:cred1","database":"irc"}"#,
        );
        runner.stdout(
            "secret-get",
            &["secret:cred1"],
            r#"{"username":"relation_7","password":"hunter2"}"#,
        );
        let tools = JujuHookTools::new(&runner);
        let RelationState::Ready(db) = DatabaseObserver::new(&tools).get_db()? else {
            return Err("expected ready datasource".into());
        };
        assert_eq!(db.user, "relation_7");
        assert_eq!(db.password.expose(), "hunter2");
        Ok(())
    }

    #[test]
    fn leader_requests_the_bridge_database() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(&runner, "{}");
        runner.stdout("is-leader", &[], "true");
        let tools = JujuHookTools::new(&runner);
        assert!(DatabaseObserver::new(&tools).request_database()?);
        assert_eq!(
            runner.count("relation-set", &["-r", "database:3", "--app", "database=ircbridge"]),
            1
        );

        runner.stdout("is-leader", &[], "false");
        assert!(!DatabaseObserver::new(&tools).request_database()?);
        assert_eq!(runner.count("relation-set", &[]), 1);
        Ok(())
    }

    #[test]
    fn malformed_endpoint_is_an_error() {
        let runner = ScriptedRunner::new();
        related(
            &runner,
            r#"{"endpoints":"10.0.0.5","username":"u","password":"p","database":"irc"}"#,
        );
        let tools = JujuHookTools::new(&runner);
        assert!(matches!(
            DatabaseObserver::new(&tools).get_db(),
            Err(RelationDataError::Datasource {
                relation: "database",
                ..
            })
        ));
    }
}
