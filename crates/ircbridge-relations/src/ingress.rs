//! Observer for the `ingress-media` relation exposing the media proxy.
//!
//! Databag values follow the ingress v2 interface: every value is JSON encoded.

use ircbridge_config::defaults::{INGRESS_MEDIA_RELATION, MEDIA_PROXY_PORT};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::RelationResult;
use crate::hooktools::{Databag, HookTools, first_relation, remote_app_data};

#[derive(Debug, Deserialize)]
struct IngressUrl {
    url: String,
}

/// Identity this unit publishes to the ingress provider.
#[derive(Debug, Clone, Copy)]
pub struct IngressRequest<'a> {
    /// Juju model name.
    pub model: &'a str,
    /// Application name.
    pub app: &'a str,
    /// Address of this unit.
    pub unit_address: &'a str,
}

/// Reads the public media URL and requests ingress for the media proxy.
#[derive(Debug)]
pub struct IngressObserver<'h, H: ?Sized> {
    tools: &'h H,
}

fn json_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

impl<'h, H: HookTools + ?Sized> IngressObserver<'h, H> {
    /// Observer reading through `tools`.
    #[must_use]
    pub const fn new(tools: &'h H) -> Self {
        Self { tools }
    }

    /// Public URL of the media proxy, falling back to the unit address when no ingress
    /// has been provided.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::RelationDataError`] when a hook tool fails.
    pub fn media_url(&self, unit_address: &str) -> RelationResult<String> {
        let fallback = format!("http://{unit_address}:{MEDIA_PROXY_PORT}");
        let Some(relation_id) = first_relation(self.tools, INGRESS_MEDIA_RELATION)? else {
            return Ok(fallback);
        };
        let data = remote_app_data(self.tools, &relation_id)?;
        let Some(raw) = data.get("ingress") else {
            return Ok(fallback);
        };
        match serde_json::from_str::<IngressUrl>(raw) {
            Ok(ingress) if !ingress.url.trim().is_empty() => {
                debug!(url = %ingress.url, "media ingress provided");
                Ok(ingress.url)
            }
            Ok(_) => Ok(fallback),
            Err(err) => {
                warn!(error = %err, "ignoring malformed ingress data");
                Ok(fallback)
            }
        }
    }

    /// Publish the ingress request: application data from the leader, unit data from every unit.
    ///
    /// Returns whether an ingress relation exists.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::RelationDataError`] when a hook tool fails.
    pub fn publish(&self, request: &IngressRequest<'_>) -> RelationResult<bool> {
        let Some(relation_id) = first_relation(self.tools, INGRESS_MEDIA_RELATION)? else {
            return Ok(false);
        };
        if self.tools.is_leader()? {
            let app_data = Databag::from([
                ("model".to_string(), json_string(request.model)),
                ("name".to_string(), json_string(request.app)),
                ("port".to_string(), MEDIA_PROXY_PORT.to_string()),
            ]);
            self.tools.set_app_data(&relation_id, &app_data)?;
        }
        let unit_data = Databag::from([
            ("host".to_string(), json_string(request.unit_address)),
            ("ip".to_string(), json_string(request.unit_address)),
        ]);
        self.tools.set_unit_data(&relation_id, &unit_data)?;
        Ok(true)
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
            .stdout("relation-ids", &["ingress-media"], "[\"ingress-media:2\"]")
            .stdout("relation-list", &["-r", "ingress-media:2"], "traefik")
            .stdout("relation-get", &["-r", "ingress-media:2"], app_data);
    }

    #[test]
    fn media_url_defaults_to_unit_address() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        runner.stdout("relation-ids", &[], "[]");
        let tools = JujuHookTools::new(&runner);
        assert_eq!(
            IngressObserver::new(&tools).media_url("10.0.0.10")?,
            "http://10.0.0.10:11111"
        );
        Ok(())
    }

    #[test]
    fn media_url_uses_provided_ingress() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(
            &runner,
            r#"{"ingress":"{\"url\": \"https://media.example.com/irc\"}"}"#,
        );
        let tools = JujuHookTools::new(&runner);
        assert_eq!(
            IngressObserver::new(&tools).media_url("10.0.0.10")?,
            "https://media.example.com/irc"
        );
        Ok(())
    }

    #[test]
    fn malformed_ingress_falls_back() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(&runner, r#"{"ingress":"not json"}"#);
        let tools = JujuHookTools::new(&runner);
        assert_eq!(
            IngressObserver::new(&tools).media_url("10.0.0.10")?,
            "http://10.0.0.10:11111"
        );
        Ok(())
    }

    #[test]
    fn leader_publishes_app_and_unit_data() -> Result<(), Box<dyn Error>> {
        let runner = ScriptedRunner::new();
        related(&runner, "{}");
        runner.stdout("is-leader", &[], "true");
        let tools = JujuHookTools::new(&runner);
        let request = IngressRequest {
            model: "chat",
            app: "irc-bridge",
            unit_address: "10.0.0.10",
        };

        assert!(IngressObserver::new(&tools).publish(&request)?);
        let app = runner.calls_to("relation-set", &["-r", "ingress-media:2", "--app"]);
        assert_eq!(
            app[0].args[3..],
            [
                "model=\"chat\"".to_string(),
                "name=\"irc-bridge\"".to_string(),
                "port=11111".to_string()
            ]
        );
        let unit = runner.calls_to("relation-set", &["-r", "ingress-media:2", "host=\"10.0.0.10\""]);
        assert_eq!(unit.len(), 1);
        Ok(())
    }
}
