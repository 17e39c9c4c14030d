//! Bridge configuration rendering.
//!
//! # Design
//! - The embedded template carries every upstream default; rendering only patches the
//!   keys derived from relations and charm options.
//! - Output is a pure function of the request and paths: mappings keep template order and
//!   admins come from a sorted set, so identical inputs yield identical bytes.

use ircbridge_config::defaults::{APPSERVICE_PORT, MEDIA_PROXY_PORT};
use ircbridge_config::{BridgePaths, CharmConfig, DatasourceMatrix, DatasourcePostgreSQL};
use serde_yaml::{Mapping, Value};

use crate::error::{ConfigurationFileError, ConfigurationFileResult};

const CONFIG_TEMPLATE: &str = include_str!("../templates/config.yaml");

/// Inputs required to render the bridge configuration.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Database the bridge persists to.
    pub db: &'a DatasourcePostgreSQL,
    /// Homeserver the bridge registers with.
    pub matrix: &'a DatasourceMatrix,
    /// Validated charm options.
    pub config: &'a CharmConfig,
    /// Address the homeserver reaches this unit on.
    pub unit_address: &'a str,
    /// Public URL of the media proxy.
    pub media_public_url: &'a str,
}

impl RenderRequest<'_> {
    /// URL the homeserver uses to push transactions to the bridge.
    #[must_use]
    pub fn appservice_url(&self) -> String {
        format!("http://{}:{APPSERVICE_PORT}", self.unit_address)
    }
}

fn section<'v>(
    document: &'v mut Value,
    path: &[&str],
    field: &'static str,
) -> ConfigurationFileResult<&'v mut Mapping> {
    let mut current = document;
    for key in path {
        current = current
            .get_mut(*key)
            .ok_or_else(|| ConfigurationFileError::template(field, "missing_section"))?;
    }
    current
        .as_mapping_mut()
        .ok_or_else(|| ConfigurationFileError::template(field, "not_a_mapping"))
}

fn set(mapping: &mut Mapping, key: &str, value: impl Into<Value>) {
    mapping.insert(Value::from(key), value.into());
}

/// Render the bridge configuration document.
///
/// # Errors
///
/// Returns [`ConfigurationFileError::Template`] when the template lacks a patched
/// section, or [`ConfigurationFileError::Yaml`] when (de)serialization fails.
pub fn render_config(
    request: &RenderRequest<'_>,
    paths: &BridgePaths,
) -> ConfigurationFileResult<String> {
    let mut document: Value = serde_yaml::from_str(CONFIG_TEMPLATE)
        .map_err(|err| ConfigurationFileError::yaml("parse_template", err))?;

    let homeserver = section(&mut document, &["homeserver"], "homeserver")?;
    set(homeserver, "url", request.matrix.homeserver());
    set(homeserver, "domain", request.matrix.server_name());
    set(homeserver, "bindPort", APPSERVICE_PORT);

    let database = section(&mut document, &["database"], "database")?;
    set(database, "connectionString", request.db.uri.expose());

    let irc_service = section(&mut document, &["ircService"], "ircService")?;
    set(
        irc_service,
        "passwordEncryptionKeyPath",
        paths.passkey_file().to_string_lossy().into_owned(),
    );
    let mut permissions = Mapping::new();
    for admin in &request.config.bridge_admins {
        permissions.insert(Value::from(admin.as_str()), Value::from("admin"));
    }
    set(irc_service, "permissions", permissions);

    let media_proxy = section(
        &mut document,
        &["ircService", "mediaProxy"],
        "ircService.mediaProxy",
    )?;
    set(
        media_proxy,
        "signingKeyPath",
        paths.signing_key_file().to_string_lossy().into_owned(),
    );
    set(media_proxy, "publicUrl", request.media_public_url);
    set(media_proxy, "bindPort", MEDIA_PROXY_PORT);

    let ident = section(&mut document, &["ircService", "ident"], "ircService.ident")?;
    set(ident, "enabled", request.config.ident_enabled);

    let servers = section(
        &mut document,
        &["ircService", "servers"],
        "ircService.servers",
    )?;
    for (_, server) in servers.iter_mut() {
        let bot_config = server
            .get_mut("botConfig")
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| {
                ConfigurationFileError::template(
                    "ircService.servers.botConfig",
                    "missing_section",
                )
            })?;
        set(bot_config, "nick", request.config.bot_nickname.as_str());
    }

    serde_yaml::to_string(&document).map_err(|err| ConfigurationFileError::yaml("render", err))
}
