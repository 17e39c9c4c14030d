//! Password-encryption and media-signing key material.
//!
//! Both keys are generated once and never rotated.

use std::path::Path;

use ircbridge_config::defaults::{
    PASSKEY_ALGORITHM, PASSKEY_OPTIONS, SIGNING_KEY_GENERATOR, SNAP_NODE_BINARY,
};
use ircbridge_runtime::{CommandRunner, CommandSpec};
use tracing::info;

use crate::error::{ConfigurationFileError, ConfigurationFileResult};
use crate::files::{PRIVATE_MODE, set_mode, write_if_changed};

fn exists(path: &Path) -> ConfigurationFileResult<bool> {
    path.try_exists()
        .map_err(|err| ConfigurationFileError::io("stat", path, err))
}

/// Generate the PEM key the bridge encrypts stored IRC passwords with, when absent.
///
/// Returns whether a key was generated.
pub(crate) fn ensure_passkey<R: CommandRunner>(
    runner: &R,
    path: &Path,
) -> ConfigurationFileResult<bool> {
    if exists(path)? {
        return Ok(false);
    }
    let spec = CommandSpec::new("openssl").args([
        "genpkey".to_string(),
        "-out".to_string(),
        path.to_string_lossy().into_owned(),
        "-outform".to_string(),
        "PEM".to_string(),
        "-algorithm".to_string(),
        PASSKEY_ALGORITHM.to_string(),
        "-pkeyopt".to_string(),
        PASSKEY_OPTIONS.to_string(),
    ]);
    runner
        .check(&spec)
        .map_err(|source| ConfigurationFileError::KeyGeneration {
            key: "passkey",
            source,
        })?;
    set_mode(path, PRIVATE_MODE)?;
    info!(path = %path.display(), "generated password encryption key");
    Ok(true)
}

/// Generate the media proxy signing key with the bridge's own generator, when absent.
///
/// Returns whether a key was generated.
pub(crate) fn ensure_signing_key<R: CommandRunner>(
    runner: &R,
    path: &Path,
) -> ConfigurationFileResult<bool> {
    if exists(path)? {
        return Ok(false);
    }
    let spec = CommandSpec::new(SNAP_NODE_BINARY).arg(SIGNING_KEY_GENERATOR);
    let jwk = runner
        .check_stdout(&spec)
        .map_err(|source| ConfigurationFileError::KeyGeneration {
            key: "signing_key",
            source,
        })?;
    let jwk = jwk.trim();
    if jwk.is_empty() {
        return Err(ConfigurationFileError::InvalidKey {
            key: "signing_key",
            reason: "empty",
        });
    }
    write_if_changed(path, format!("{jwk}\n").as_bytes(), PRIVATE_MODE)?;
    info!(path = %path.display(), "generated media signing key");
    Ok(true)
}
