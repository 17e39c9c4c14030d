//! Application-service registration document.
//!
//! # Design
//! - The bridge generates its own registration; the operator only decides when to
//!   regenerate (missing file, changed URL or sender) and validates the result.
//! - Tokens are validated but not kept; the raw document is wrapped so it never reaches logs.

use std::fs;
use std::io;
use std::path::Path;

use ircbridge_config::defaults::BRIDGE_BINARY;
use ircbridge_config::{BridgePaths, Redacted};
use ircbridge_runtime::{CommandRunner, CommandSpec};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ConfigurationFileError, ConfigurationFileResult};
use crate::files::{PRIVATE_MODE, set_mode};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegistrationFields {
    id: String,
    as_token: String,
    hs_token: String,
    url: String,
    sender_localpart: String,
}

/// Parsed registration document handed to the homeserver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    id: String,
    url: String,
    sender_localpart: String,
    content: Redacted,
}

fn required(field: &'static str, value: String) -> ConfigurationFileResult<String> {
    if value.trim().is_empty() {
        return Err(ConfigurationFileError::RegistrationInvalid {
            field,
            reason: "empty",
        });
    }
    Ok(value)
}

impl Registration {
    /// Parse and validate a registration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationFileError::RegistrationYaml`] when the content is not YAML, or
    /// [`ConfigurationFileError::RegistrationInvalid`] when a required field is empty.
    pub fn parse(content: &str) -> ConfigurationFileResult<Self> {
        let fields: RegistrationFields = serde_yaml::from_str(content)
            .map_err(|source| ConfigurationFileError::RegistrationYaml { source })?;
        let id = required("id", fields.id)?;
        required("as_token", fields.as_token)?;
        required("hs_token", fields.hs_token)?;
        Ok(Self {
            id,
            url: required("url", fields.url)?,
            sender_localpart: required("sender_localpart", fields.sender_localpart)?,
            content: Redacted::new(content),
        })
    }

    /// Application-service identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw document exactly as the bridge wrote it.
    #[must_use]
    pub fn content(&self) -> &str {
        self.content.expose()
    }

    /// Whether the document still targets `url` with `sender_localpart`.
    #[must_use]
    pub fn matches(&self, url: &str, sender_localpart: &str) -> bool {
        self.url == url && self.sender_localpart == sender_localpart
    }
}

fn read_existing(path: &Path) -> ConfigurationFileResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ConfigurationFileError::io("read_registration", path, err)),
    }
}

/// Reuse the registration on disk when it still matches, otherwise regenerate it.
///
/// Returns the registration and whether it was regenerated. Requires the rendered
/// configuration to be on disk already.
pub(crate) fn ensure_registration<R: CommandRunner>(
    runner: &R,
    paths: &BridgePaths,
    url: &str,
    sender_localpart: &str,
) -> ConfigurationFileResult<(Registration, bool)> {
    let path = paths.registration_file();
    if let Some(existing) = read_existing(&path)? {
        match Registration::parse(&existing) {
            Ok(registration) if registration.matches(url, sender_localpart) => {
                return Ok((registration, false));
            }
            Ok(_) => info!("registration targets a stale url or sender, regenerating"),
            Err(err) => warn!(error = %err, "existing registration is unusable, regenerating"),
        }
        fs::remove_file(&path)
            .map_err(|err| ConfigurationFileError::io("remove_registration", &path, err))?;
    }

    let spec = CommandSpec::new(BRIDGE_BINARY).args([
        "-r".to_string(),
        "-f".to_string(),
        path.to_string_lossy().into_owned(),
        "-u".to_string(),
        url.to_string(),
        "-c".to_string(),
        paths.config_file().to_string_lossy().into_owned(),
        "-l".to_string(),
        sender_localpart.to_string(),
    ]);
    runner
        .check(&spec)
        .map_err(|source| ConfigurationFileError::RegistrationCommand { source })?;

    let content = read_existing(&path)?.ok_or(ConfigurationFileError::RegistrationInvalid {
        field: "file",
        reason: "not_written",
    })?;
    let registration = Registration::parse(&content)?;
    set_mode(&path, PRIVATE_MODE)?;
    info!(id = registration.id(), url, "generated appservice registration");
    Ok((registration, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ircbridge_test_support::ScriptedRunner;
    use ircbridge_test_support::fixtures::{registration_effect, registration_yaml};
    use std::error::Error;
    use tempfile::TempDir;

    #[test]
    fn parse_requires_every_credential() -> Result<(), Box<dyn Error>> {
        let registration = Registration::parse(&registration_yaml("http://10.0.0.10:5446", "ircbot"))?;
        assert_eq!(registration.id(), "irc-bridge");
        assert!(registration.matches("http://10.0.0.10:5446", "ircbot"));
        assert!(!registration.matches("http://10.0.0.11:5446", "ircbot"));
        assert!(!format!("{registration:?}").contains("as-0123456789abcdef"));

        let missing = Registration::parse("id: irc\nurl: http://x\nsender_localpart: bot\n");
        assert!(matches!(
            missing,
            Err(ConfigurationFileError::RegistrationInvalid {
                field: "as_token",
                ..
            })
        ));
        assert!(matches!(
            Registration::parse("id: [unterminated"),
            Err(ConfigurationFileError::RegistrationYaml { .. })
        ));
        Ok(())
    }

    #[test]
    fn registration_is_reused_until_inputs_change() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let paths = BridgePaths::under(temp.path());
        fs::create_dir_all(paths.config_dir())?;
        let runner = ScriptedRunner::new();
        runner.effect(BRIDGE_BINARY, &["-r"], registration_effect);

        let (first, generated) =
            ensure_registration(&runner, &paths, "http://10.0.0.10:5446", "ircbot")?;
        assert!(generated);
        assert!(first.matches("http://10.0.0.10:5446", "ircbot"));

        let (_, generated) = ensure_registration(&runner, &paths, "http://10.0.0.10:5446", "ircbot")?;
        assert!(!generated);

        let (renamed, generated) =
            ensure_registration(&runner, &paths, "http://10.0.0.10:5446", "newbot")?;
        assert!(generated);
        assert!(renamed.matches("http://10.0.0.10:5446", "newbot"));
        assert_eq!(runner.count(BRIDGE_BINARY, &["-r"]), 2);
        Ok(())
    }

    #[test]
    fn generator_that_writes_nothing_is_an_error() -> Result<(), Box<dyn Error>> {
        let temp = TempDir::new()?;
        let paths = BridgePaths::under(temp.path());
        let runner = ScriptedRunner::new();
        let result = ensure_registration(&runner, &paths, "http://10.0.0.10:5446", "ircbot");
        assert!(matches!(
            result,
            Err(ConfigurationFileError::RegistrationInvalid {
                reason: "not_written",
                ..
            })
        ));
        Ok(())
    }
}
