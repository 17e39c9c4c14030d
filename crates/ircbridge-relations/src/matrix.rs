//! Observer for the `matrix-auth` relation.
//!
//! # Design
//! - The homeserver publishes its URL plus two secret ids: the registration shared
//!   secret and a Fernet key. Secrets cannot cross model boundaries, so the bridge
//!   answers with its registration encrypted under that key.
//! - The registration is only rewritten when the decrypted current value differs;
//!   Fernet tokens are randomised, so comparing ciphertexts would always rewrite.

use ircbridge_config::DatasourceMatrix;
use ircbridge_config::defaults::MATRIX_RELATION;
use tracing::{debug, info};

use crate::error::{RelationDataError, RelationResult};
use crate::fernet::FernetKey;
use crate::hooktools::{Databag, HookTools, first_relation, remote_app_data};
use crate::state::{MissingFields, RelationState};

/// Secret content key holding the registration shared secret.
pub const SHARED_SECRET_CONTENT_KEY: &str = "shared-secret-content";
/// Secret content key holding the Fernet key.
pub const ENCRYPTION_KEY_CONTENT_KEY: &str = "encryption-key-content";
/// Application databag key carrying the encrypted registration.
pub const REGISTRATION_SECRET_FIELD: &str = "registration_secret";

/// Reads homeserver data and publishes the bridge registration.
#[derive(Debug)]
pub struct MatrixObserver<'h, H: ?Sized> {
    tools: &'h H,
    local_app: &'h str,
}

impl<'h, H: HookTools + ?Sized> MatrixObserver<'h, H> {
    /// Observer for the application `local_app` reading through `tools`.
    #[must_use]
    pub const fn new(tools: &'h H, local_app: &'h str) -> Self {
        Self { tools, local_app }
    }

    /// Current homeserver datasource.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when a hook tool fails or the homeserver URL is unusable.
    pub fn get_matrix(&self) -> RelationResult<RelationState<DatasourceMatrix>> {
        let Some(relation_id) = first_relation(self.tools, MATRIX_RELATION)? else {
            return Ok(RelationState::Absent);
        };
        let data = remote_app_data(self.tools, &relation_id)?;

        let mut missing = MissingFields::default();
        let homeserver = missing.take("homeserver", data.get("homeserver").cloned());
        let secret_id = missing.take("shared_secret_id", data.get("shared_secret_id").cloned());
        let shared_secret = match secret_id {
            Some(uri) => missing.take(
                "shared_secret",
                self.tools
                    .secret_get(&uri)?
                    .get(SHARED_SECRET_CONTENT_KEY)
                    .cloned(),
            ),
            None => None,
        };

        let (Some(homeserver), Some(shared_secret)) = (homeserver, shared_secret) else {
            return Ok(missing.into_incomplete());
        };
        let datasource = DatasourceMatrix::new(&homeserver, shared_secret).map_err(|source| {
            RelationDataError::Datasource {
                relation: MATRIX_RELATION,
                source,
            }
        })?;
        info!(homeserver = datasource.homeserver(), "homeserver ready");
        Ok(RelationState::Ready(datasource))
    }

    fn encryption_key(&self, data: &Databag) -> RelationResult<FernetKey> {
        let uri = data
            .get("encryption_key_secret_id")
            .filter(|uri| !uri.is_empty())
            .ok_or(RelationDataError::Secret {
                field: "encryption_key_secret_id",
                reason: "missing",
            })?;
        let content = self.tools.secret_get(uri)?;
        let key = content
            .get(ENCRYPTION_KEY_CONTENT_KEY)
            .filter(|key| !key.is_empty())
            .ok_or(RelationDataError::Secret {
                field: "encryption_key_secret_id",
                reason: "empty",
            })?;
        FernetKey::from_base64(key)
    }

    /// Publish the registration document for the homeserver. Only the leader writes.
    ///
    /// Returns whether the relation data was rewritten.
    ///
    /// # Errors
    ///
    /// Returns a [`RelationDataError`] when the encryption key is unavailable or a hook tool fails.
    pub fn set_irc_registration(&self, registration: &str) -> RelationResult<bool> {
        let Some(relation_id) = first_relation(self.tools, MATRIX_RELATION)? else {
            return Ok(false);
        };
        if !self.tools.is_leader()? {
            return Ok(false);
        }
        let key = self.encryption_key(&remote_app_data(self.tools, &relation_id)?)?;

        let current = self.tools.app_data(&relation_id, self.local_app)?;
        if let Some(token) = current.get(REGISTRATION_SECRET_FIELD)
            && key.decrypt_string(token).is_ok_and(|existing| existing == registration)
        {
            debug!(relation = %relation_id, "registration already published");
            return Ok(false);
        }

        let token = key.encrypt(registration.as_bytes())?;
        let update = Databag::from([(REGISTRATION_SECRET_FIELD.to_string(), token)]);
        self.tools.set_app_data(&relation_id, &update)?;
        info!(relation = %relation_id, "published registration");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooktools::JujuHookTools;
    use ircbridge_runtime::CommandOutput;
    use ircbridge_test_support::ScriptedRunner;
    use std::error::Error;

    const KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";

    fn related(runner: &ScriptedRunner) {
        runner
            .stdout("relation-ids", &["matrix-auth"], "[\"matrix-auth:9\"]")
            .stdout("relation-list", &["-r", "matrix-auth:9"], "synapse")
            .stdout(
                "relation-get",
                &["-r", "matrix-auth:9", "--app", "--format=json", "-", "synapse"],
                r#"{"homeserver":"https://matrix.example.com","shared_secret_id":"secret:shared","encryption_key_secret_id":"secret:key"}"#,
            )
            .stdout(
                "relation-get",
                &["-r", "matrix-auth:9", "--app", "--format=json", "-", "irc-bridge"],
                "{}",
            )
            .stdout("secret-get", &["secret:shared"], r#"{"shared-secret-content":"s3cr3t"}"#)
            .stdout(
                "secret-get",
                &["secret:key"],
                &format!(r#"{{"encryption-key-content":"{KEY}"}}"#),
            )
            .stdout("is-leader", &[], "true");
    }

    #[test]
    fn homeserver_and_shared_secret_build_the_datasource() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(&runner);
        let tools = JujuHookTools::new(&runner);
        let RelationState::Ready(matrix) = MatrixObserver::new(&tools, "irc-bridge").get_matrix()? else {
            return Err("expected ready datasource".into());
        };
        assert_eq!(matrix.homeserver(), "https://matrix.example.com");
        assert_eq!(matrix.shared_secret.expose(), "s3cr3t");
        Ok(())
    }

    #[test]
    fn missing_secret_content_is_incomplete() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(&runner);
        runner.stdout("secret-get", &["secret:shared"], "{}");
        let tools = JujuHookTools::new(&runner);
        assert_eq!(
            MatrixObserver::new(&tools, "irc-bridge").get_matrix()?,
            RelationState::Incomplete {
                missing: vec!["shared_secret"]
            }
        );
        Ok(())
    }

    #[test]
    fn registration_is_published_encrypted() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(&runner);
        let tools = JujuHookTools::new(&runner);
        let observer = MatrixObserver::new(&tools, "irc-bridge");

        assert!(observer.set_irc_registration("id: irc-bridge\n")?);
        let calls = runner.calls_to("relation-set", &["-r", "matrix-auth:9", "--app"]);
        assert_eq!(calls.len(), 1);
        let token = calls[0].args[3]
            .strip_prefix("registration_secret=")
            .ok_or("registration_secret argument")?;
        let key = FernetKey::from_base64(KEY)?;
        assert_eq!(key.decrypt_string(token)?, "id: irc-bridge\n");
        Ok(())
    }

    #[test]
    fn unchanged_registration_is_not_rewritten() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(&runner);
        let token = FernetKey::from_base64(KEY)?.encrypt(b"id: irc-bridge\n")?;
        runner.on(
            "relation-get",
            &["-r", "matrix-auth:9", "--app", "--format=json", "-", "irc-bridge"],
            CommandOutput::success(format!(r#"{{"registration_secret":"{token}"}}"#)),
        );
        let tools = JujuHookTools::new(&runner);

        assert!(!MatrixObserver::new(&tools, "irc-bridge").set_irc_registration("id: irc-bridge\n")?);
        assert_eq!(runner.count("relation-set", &[]), 0);
        Ok(())
    }

    #[test]
    fn missing_encryption_key_is_an_error() {
        let runner = ScriptedRunner::new();
        related(&runner);
        runner.stdout(
            "relation-get",
            &["-r", "matrix-auth:9", "--app", "--format=json", "-", "synapse"],
            r#"{"homeserver":"https://matrix.example.com","shared_secret_id":"secret:shared"}"#,
        );
        let tools = JujuHookTools::new(&runner);
        assert!(matches!(
            MatrixObserver::new(&tools, "irc-bridge").set_irc_registration("id: x\n"),
            Err(RelationDataError::Secret {
                reason: "missing",
                ..
            })
        ));
    }

    #[test]
    fn followers_do_not_publish() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(&runner);
        runner.stdout("is-leader", &[], "false");
        let tools = JujuHookTools::new(&runner);
        assert!(!MatrixObserver::new(&tools, "irc-bridge").set_irc_registration("id: x\n")?);
        assert_eq!(runner.count("secret-get", &[]), 0);
        Ok(())
    }
}
