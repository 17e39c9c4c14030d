//! Filesystem locations the operator writes to.

use std::path::{Path, PathBuf};

use crate::defaults::{
    CONFIG_DIR, CONFIG_FILE_NAME, LOADED_MARKER_FILE_NAME, PASSKEY_FILE_NAME, REGISTRATION_FILE_NAME,
    SIGNING_KEY_FILE_NAME, SYSTEMD_DIR, TARGET_FILE_NAME, UNIT_FILE_NAME,
};

/// Roots for the bridge configuration directory and systemd unit directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgePaths {
    config_dir: PathBuf,
    systemd_dir: PathBuf,
}

impl Default for BridgePaths {
    fn default() -> Self {
        Self::new(CONFIG_DIR, SYSTEMD_DIR)
    }
}

impl BridgePaths {
    /// Paths rooted at custom directories.
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>, systemd_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            systemd_dir: systemd_dir.into(),
        }
    }

    /// Paths under a single root, laid out like the production tree.
    #[must_use]
    pub fn under(root: &Path) -> Self {
        Self::new(
            root.join(CONFIG_DIR.trim_start_matches('/')),
            root.join(SYSTEMD_DIR.trim_start_matches('/')),
        )
    }

    /// Bridge configuration directory.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Systemd unit directory.
    #[must_use]
    pub fn systemd_dir(&self) -> &Path {
        &self.systemd_dir
    }

    /// Rendered `config.yaml`.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Appservice registration document.
    #[must_use]
    pub fn registration_file(&self) -> PathBuf {
        self.config_dir.join(REGISTRATION_FILE_NAME)
    }

    /// Password encryption key.
    #[must_use]
    pub fn passkey_file(&self) -> PathBuf {
        self.config_dir.join(PASSKEY_FILE_NAME)
    }

    /// Media proxy signing key.
    #[must_use]
    pub fn signing_key_file(&self) -> PathBuf {
        self.config_dir.join(SIGNING_KEY_FILE_NAME)
    }

    /// Digest of the files the bridge process last loaded.
    #[must_use]
    pub fn loaded_marker_file(&self) -> PathBuf {
        self.config_dir.join(LOADED_MARKER_FILE_NAME)
    }

    /// Files the bridge process reads at start or reload.
    #[must_use]
    pub fn loaded_files(&self) -> [PathBuf; 4] {
        [
            self.config_file(),
            self.registration_file(),
            self.passkey_file(),
            self.signing_key_file(),
        ]
    }

    /// Systemd service unit.
    #[must_use]
    pub fn unit_file(&self) -> PathBuf {
        self.systemd_dir.join(UNIT_FILE_NAME)
    }

    /// Systemd target unit.
    #[must_use]
    pub fn target_file(&self) -> PathBuf {
        self.systemd_dir.join(TARGET_FILE_NAME)
    }
}
