//! Fixed names, paths and ports shared by the operator.
//!
//! # Design
//! - Centralize every well-known location so the renderer, service controller and
//!   relation observers agree on them.
//! - Paths are expressed relative to roots in `BridgePaths` so tests can relocate them.

/// Snap package carrying the bridge.
pub const SNAP_NAME: &str = "matrix-appservice-irc";
/// Channel the snap is installed from.
pub const SNAP_CHANNEL: &str = "edge";
/// Systemd service name managing the bridge process.
pub const SERVICE_NAME: &str = "matrix-appservice-irc";

/// Directory holding the rendered configuration and key material.
pub const CONFIG_DIR: &str = "/etc/matrix-appservice-irc";
/// Rendered bridge configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.yaml";
/// Application-service registration file name.
pub const REGISTRATION_FILE_NAME: &str = "appservice-registration-irc.yaml";
/// Password encryption key file name.
pub const PASSKEY_FILE_NAME: &str = "irc_passkey.pem";
/// Media proxy signing key file name.
pub const SIGNING_KEY_FILE_NAME: &str = "signing.jwk";
/// Digest of the files the running bridge last loaded.
pub const LOADED_MARKER_FILE_NAME: &str = ".loaded.sha256";

/// Directory receiving the systemd unit files.
pub const SYSTEMD_DIR: &str = "/etc/systemd/system";
/// Systemd unit file name.
pub const UNIT_FILE_NAME: &str = "matrix-appservice-irc.service";
/// Systemd target file name.
pub const TARGET_FILE_NAME: &str = "matrix-appservice-irc.target";

/// Bridge CLI entrypoint exposed by the snap.
pub const BRIDGE_BINARY: &str = "/snap/bin/matrix-appservice-irc";
/// Node runtime shipped inside the snap.
pub const SNAP_NODE_BINARY: &str = "/snap/matrix-appservice-irc/current/bin/node";
/// Signing key generator shipped inside the snap.
pub const SIGNING_KEY_GENERATOR: &str =
    "/snap/matrix-appservice-irc/current/app/lib/generate-signing-key.js";
/// Algorithm for the password encryption key.
pub const PASSKEY_ALGORITHM: &str = "RSA";
/// `openssl genpkey` options for the password encryption key.
pub const PASSKEY_OPTIONS: &str = "rsa_keygen_bits:2048";

/// Port the appservice listener (and health endpoint) binds to.
pub const APPSERVICE_PORT: u16 = 5446;
/// Ident daemon port opened when ident is enabled.
pub const IDENT_PORT: u16 = 113;
/// Media proxy listener port.
pub const MEDIA_PROXY_PORT: u16 = 11111;

/// Database relation endpoint.
pub const DATABASE_RELATION: &str = "database";
/// Matrix authentication relation endpoint.
pub const MATRIX_RELATION: &str = "matrix-auth";
/// Media ingress relation endpoint.
pub const INGRESS_MEDIA_RELATION: &str = "ingress-media";
/// Database name requested from the provider.
pub const DATABASE_NAME: &str = "ircbridge";
