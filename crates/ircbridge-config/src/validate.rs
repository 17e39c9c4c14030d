//! Validation helpers and parsing utilities for charm options and relation values.

use std::collections::BTreeSet;

use regex::Regex;
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Matrix user identifier grammar (localpart, server name, optional port).
pub(crate) const USER_ID_PATTERN: &str = r"^@[a-z0-9._=/+\-]+:[A-Za-z0-9.\-]+(:[0-9]{1,5})?$";

/// Parse the comma separated `bridge_admins` option into a sorted set of user ids.
///
/// Entries are trimmed and blank entries skipped; a missing leading `@` is added.
/// An empty option yields an empty set.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when an entry is not a valid Matrix user id.
pub fn parse_bridge_admins(value: &str) -> ConfigResult<BTreeSet<String>> {
    let pattern = Regex::new(USER_ID_PATTERN).map_err(|source| ConfigError::Pattern { source })?;
    let mut admins = BTreeSet::new();
    for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let user_id = if entry.starts_with('@') {
            entry.to_string()
        } else {
            format!("@{entry}")
        };
        if !pattern.is_match(&user_id) {
            return Err(ConfigError::invalid(
                "options",
                "bridge_admins",
                "malformed_user_id",
                Some(user_id),
            ));
        }
        admins.insert(user_id);
    }
    Ok(admins)
}

/// Reject nicknames IRC servers would refuse outright.
pub(crate) fn check_nickname(value: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(ConfigError::invalid("options", "bot_nickname", "empty", None));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::invalid(
            "options",
            "bot_nickname",
            "contains_whitespace",
            Some(value.to_string()),
        ));
    }
    Ok(())
}

pub(crate) fn require_non_empty(
    section: &'static str,
    field: &'static str,
    value: &str,
) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(section, field, "empty", None));
    }
    Ok(())
}

/// Normalise a homeserver address; a bare host gets the `https` scheme.
///
/// # Errors
///
/// Returns [`ConfigError::Url`] when the value cannot be parsed, or
/// [`ConfigError::InvalidField`] when it has no host.
pub fn normalize_homeserver(value: &str) -> ConfigResult<Url> {
    let trimmed = value.trim();
    require_non_empty("matrix", "homeserver_url", trimmed)?;
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|source| ConfigError::Url {
        field: "homeserver_url",
        source,
    })?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::invalid(
            "matrix",
            "homeserver_url",
            "missing_host",
            Some(trimmed.to_string()),
        ));
    }
    Ok(url)
}
