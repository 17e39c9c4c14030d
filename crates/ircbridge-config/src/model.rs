//! Typed charm options and relation-sourced datasources.
//!
//! # Design
//! - Pure value objects; relation plumbing and hook tools live elsewhere.
//! - Secrets are wrapped so `Debug` output never leaks credentials into logs.

use std::collections::BTreeSet;
use std::fmt::{self, Debug, Formatter};

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::validate::{check_nickname, normalize_homeserver, parse_bridge_admins, require_non_empty};

/// String wrapper that redacts its content in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Redacted(String);

impl Redacted {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Redacted {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("<redacted>")
    }
}

/// Charm options exactly as `config-get --format=json` reports them.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RawCharmOptions {
    /// Whether the ident subservice is enabled.
    pub ident_enabled: bool,
    /// Nickname used by the bridge bot.
    pub bot_nickname: String,
    /// Comma separated Matrix user ids administering the bridge.
    pub bridge_admins: String,
}

impl RawCharmOptions {
    /// Decode the options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OptionsPayload`] when the document does not match the option schema.
    pub fn from_json(value: Value) -> ConfigResult<Self> {
        serde_json::from_value(value).map_err(|source| ConfigError::OptionsPayload { source })
    }
}

/// Parsed charm options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharmConfig {
    /// Whether the ident subservice is enabled.
    pub ident_enabled: bool,
    /// Nickname used by the bridge bot (trimmed).
    pub bot_nickname: String,
    /// Matrix user ids granted admin permissions, sorted.
    pub bridge_admins: BTreeSet<String>,
}

impl CharmConfig {
    /// Parse raw options; an empty admin list parses to an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when an admin entry is malformed.
    pub fn from_options(options: &RawCharmOptions) -> ConfigResult<Self> {
        Ok(Self {
            ident_enabled: options.ident_enabled,
            bot_nickname: options.bot_nickname.trim().to_string(),
            bridge_admins: parse_bridge_admins(&options.bridge_admins)?,
        })
    }

    /// Check the invariants required before the bridge can be configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when the nickname is unusable or no admin is set.
    pub fn validate(&self) -> ConfigResult<()> {
        check_nickname(&self.bot_nickname)?;
        if self.bridge_admins.is_empty() {
            return Err(ConfigError::invalid(
                "options",
                "bridge_admins",
                "empty",
                None,
            ));
        }
        Ok(())
    }
}

/// Connection descriptor for the PostgreSQL database provided over the database relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasourcePostgreSQL {
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: Redacted,
    /// Host (IP or DNS name without port or scheme).
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Database name.
    pub db: String,
    /// Full connection URI handed to the bridge.
    pub uri: Redacted,
}

impl DatasourcePostgreSQL {
    /// Build a datasource and its connection URI.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when a component is empty, or
    /// [`ConfigError::Url`] when the URI cannot be assembled.
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        db: impl Into<String>,
    ) -> ConfigResult<Self> {
        let user = user.into();
        let password = password.into();
        let host = host.into();
        let db = db.into();
        require_non_empty("database", "user", &user)?;
        require_non_empty("database", "password", &password)?;
        require_non_empty("database", "host", &host)?;
        require_non_empty("database", "db", &db)?;
        if port == 0 {
            return Err(ConfigError::invalid(
                "database",
                "port",
                "zero",
                Some(port.to_string()),
            ));
        }

        let uri = build_postgres_uri(&user, &password, &host, port, &db)?;
        Ok(Self {
            user,
            password: Redacted::new(password),
            host,
            port,
            db,
            uri: Redacted::new(uri),
        })
    }

    /// Parse a `host:port` endpoint as published by database providers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when the endpoint has no valid port.
    pub fn parse_endpoint(endpoint: &str) -> ConfigResult<(String, u16)> {
        let endpoint = endpoint.trim();
        let Some((host, port)) = endpoint.rsplit_once(':') else {
            return Err(ConfigError::invalid(
                "database",
                "endpoints",
                "missing_port",
                Some(endpoint.to_string()),
            ));
        };
        let port = port.parse::<u16>().map_err(|_| {
            ConfigError::invalid(
                "database",
                "endpoints",
                "invalid_port",
                Some(endpoint.to_string()),
            )
        })?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        require_non_empty("database", "endpoints", host)?;
        Ok((host.to_string(), port))
    }
}

fn build_postgres_uri(
    user: &str,
    password: &str,
    host: &str,
    port: u16,
    db: &str,
) -> ConfigResult<String> {
    let host = if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    let url_error = |source| ConfigError::Url {
        field: "database_uri",
        source,
    };
    let mut url = Url::parse(&format!("postgresql://{host}:{port}/")).map_err(url_error)?;
    url.set_path(db);
    url.set_username(user)
        .map_err(|()| ConfigError::invalid("database", "user", "not_encodable", None))?;
    url.set_password(Some(password))
        .map_err(|()| ConfigError::invalid("database", "password", "not_encodable", None))?;
    Ok(url.to_string())
}

/// Homeserver connection data provided over the matrix-auth relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasourceMatrix {
    /// Homeserver base URL.
    pub homeserver_url: Url,
    /// Registration shared secret issued by the homeserver.
    pub shared_secret: Redacted,
}

impl DatasourceMatrix {
    /// Build a datasource, normalising the homeserver address.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the homeserver or shared secret is unusable.
    pub fn new(homeserver: &str, shared_secret: impl Into<String>) -> ConfigResult<Self> {
        let homeserver_url = normalize_homeserver(homeserver)?;
        let shared_secret = shared_secret.into();
        require_non_empty("matrix", "shared_secret", &shared_secret)?;
        Ok(Self {
            homeserver_url,
            shared_secret: Redacted::new(shared_secret),
        })
    }

    /// Matrix server name derived from the homeserver host.
    #[must_use]
    pub fn server_name(&self) -> &str {
        self.homeserver_url.host_str().unwrap_or_default()
    }

    /// Homeserver URL without the trailing slash `Url` adds to bare origins.
    #[must_use]
    pub fn homeserver(&self) -> &str {
        self.homeserver_url.as_str().trim_end_matches('/')
    }
}
