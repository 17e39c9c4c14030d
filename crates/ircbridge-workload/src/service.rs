//! Service controller for the snap-packaged bridge.
//!
//! # Design
//! - Every host interaction goes through a `CommandRunner`, so the controller is exercised
//!   in tests against a scripted runner and a temporary `BridgePaths` root.
//! - The controller performs mechanics only; deciding when to start or reload belongs to
//!   the reconciliation controller.
//! - A successful start or reload records a digest of the files the bridge read. Files on
//!   disk that differ from that digest stay pending until a later start or reload succeeds.

use ircbridge_config::BridgePaths;
use ircbridge_config::defaults::{
    APPSERVICE_PORT, BRIDGE_BINARY, SERVICE_NAME, SNAP_CHANNEL, SNAP_NAME,
};
use ircbridge_runtime::{CommandRunner, CommandSpec, RuntimeError};
use tracing::{debug, info};

use crate::error::{SnapError, WorkloadResult};
use crate::files::{
    PRIVATE_MODE, PUBLIC_MODE, digest_files, ensure_dir, read_if_exists, write_if_changed,
};
use crate::keys::{ensure_passkey, ensure_signing_key};
use crate::registration::{Registration, ensure_registration};
use crate::render::{RenderRequest, render_config};

const UNIT_TEMPLATE: &str = include_str!("../templates/matrix-appservice-irc.service");
const TARGET_TEMPLATE: &str = include_str!("../templates/matrix-appservice-irc.target");

/// Observable state of the bridge process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// The snap is not installed.
    NotInstalled,
    /// Installed but not running.
    Stopped,
    /// Running.
    Running,
}

impl ServiceState {
    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotInstalled => "not_installed",
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }
}

/// Result of a `configure` pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Whether the files on disk differ from those the bridge last loaded.
    pub reload_pending: bool,
    /// Registration document in effect after the pass.
    pub registration: Registration,
}

/// Operations the reconciliation controller drives.
pub trait BridgeWorkload {
    /// Install the bridge (refreshing it when `refresh` is set) and its service units.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::WorkloadError`] when installation or unit setup fails.
    fn prepare(&self, refresh: bool) -> WorkloadResult<()>;

    /// Render configuration, ensure key material and the registration document.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::WorkloadError`] when any file cannot be produced.
    fn configure(&self, request: &RenderRequest<'_>) -> WorkloadResult<RenderOutcome>;

    /// Query the current service state.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Status`] when the service manager cannot be queried.
    fn state(&self) -> WorkloadResult<ServiceState>;

    /// Start the bridge service.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Start`] on failure.
    fn start(&self) -> WorkloadResult<()>;

    /// Stop the bridge service.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Stop`] on failure.
    fn stop(&self) -> WorkloadResult<()>;

    /// Reload the bridge service in place.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Reload`] on failure.
    fn reload(&self) -> WorkloadResult<()>;
}

/// The matrix-appservice-irc snap managed through `snap` and `systemctl`.
#[derive(Debug, Clone)]
pub struct IrcBridgeService<R> {
    runner: R,
    paths: BridgePaths,
}

impl<R: CommandRunner> IrcBridgeService<R> {
    /// Controller running commands through `runner` and writing under `paths`.
    #[must_use]
    pub const fn new(runner: R, paths: BridgePaths) -> Self {
        Self { runner, paths }
    }

    /// Locations this controller writes to.
    #[must_use]
    pub const fn paths(&self) -> &BridgePaths {
        &self.paths
    }

    fn systemctl(&self, verb: &str) -> Result<(), RuntimeError> {
        self.runner
            .check(&CommandSpec::new("systemctl").args([verb, SERVICE_NAME]))
            .map(drop)
    }

    fn snap_installed(&self) -> WorkloadResult<bool> {
        let output = self
            .runner
            .run(&CommandSpec::new("snap").args(["list", SNAP_NAME]))
            .map_err(|source| SnapError::Status { source })?;
        Ok(output.succeeded())
    }

    fn install_snap(&self, refresh: bool) -> WorkloadResult<()> {
        let operation = match (self.snap_installed()?, refresh) {
            (false, _) => "install",
            (true, true) => "refresh",
            (true, false) => {
                debug!(snap = SNAP_NAME, "snap already installed");
                return Ok(());
            }
        };
        let channel = format!("--channel={SNAP_CHANNEL}");
        self.runner
            .check(&CommandSpec::new("snap").args([operation, SNAP_NAME, channel.as_str()]))
            .map_err(|source| SnapError::Install { operation, source })?;
        info!(snap = SNAP_NAME, channel = SNAP_CHANNEL, operation, "snap ready");
        Ok(())
    }

    fn render_unit(&self) -> String {
        UNIT_TEMPLATE
            .replace("{bridge_binary}", BRIDGE_BINARY)
            .replace(
                "{config_file}",
                &self.paths.config_file().to_string_lossy(),
            )
            .replace(
                "{registration_file}",
                &self.paths.registration_file().to_string_lossy(),
            )
            .replace("{appservice_port}", &APPSERVICE_PORT.to_string())
    }

    fn reload_pending(&self) -> WorkloadResult<bool> {
        let current = digest_files(&self.paths.loaded_files())?;
        let loaded = read_if_exists(&self.paths.loaded_marker_file())?;
        Ok(loaded.as_deref() != Some(current.as_slice()))
    }

    fn mark_loaded(&self) -> WorkloadResult<()> {
        let current = digest_files(&self.paths.loaded_files())?;
        write_if_changed(&self.paths.loaded_marker_file(), &current, PRIVATE_MODE)?;
        Ok(())
    }

    fn install_units(&self) -> WorkloadResult<()> {
        let unit_changed = write_if_changed(
            &self.paths.unit_file(),
            self.render_unit().as_bytes(),
            PUBLIC_MODE,
        )?;
        let target_changed = write_if_changed(
            &self.paths.target_file(),
            TARGET_TEMPLATE.as_bytes(),
            PUBLIC_MODE,
        )?;
        if unit_changed || target_changed {
            self.runner
                .check(&CommandSpec::new("systemctl").arg("daemon-reload"))
                .map_err(|source| SnapError::Install {
                    operation: "daemon_reload",
                    source,
                })?;
        }
        self.systemctl("enable")
            .map_err(|source| SnapError::Install {
                operation: "enable",
                source,
            })?;
        Ok(())
    }
}

impl<R: CommandRunner> BridgeWorkload for IrcBridgeService<R> {
    fn prepare(&self, refresh: bool) -> WorkloadResult<()> {
        self.install_snap(refresh)?;
        ensure_dir(self.paths.config_dir())?;
        self.install_units()
    }

    fn configure(&self, request: &RenderRequest<'_>) -> WorkloadResult<RenderOutcome> {
        ensure_dir(self.paths.config_dir())?;
        ensure_passkey(&self.runner, &self.paths.passkey_file())?;
        ensure_signing_key(&self.runner, &self.paths.signing_key_file())?;

        let rendered = render_config(request, &self.paths)?;
        let config_changed =
            write_if_changed(&self.paths.config_file(), rendered.as_bytes(), PRIVATE_MODE)?;
        let (registration, regenerated) = ensure_registration(
            &self.runner,
            &self.paths,
            &request.appservice_url(),
            &request.config.bot_nickname,
        )?;

        let reload_pending = self.reload_pending()?;
        info!(
            config_changed,
            registration_regenerated = regenerated,
            reload_pending,
            "bridge configuration converged"
        );
        Ok(RenderOutcome {
            reload_pending,
            registration,
        })
    }

    fn state(&self) -> WorkloadResult<ServiceState> {
        if !self.snap_installed()? {
            return Ok(ServiceState::NotInstalled);
        }
        let output = self
            .runner
            .run(&CommandSpec::new("systemctl").args(["is-active", "--quiet", SERVICE_NAME]))
            .map_err(|source| SnapError::Status { source })?;
        let state = if output.succeeded() {
            ServiceState::Running
        } else {
            ServiceState::Stopped
        };
        debug!(state = state.as_str(), "queried bridge state");
        Ok(state)
    }

    fn start(&self) -> WorkloadResult<()> {
        self.systemctl("start")
            .map_err(|source| SnapError::Start { source })?;
        self.mark_loaded()?;
        info!(service = SERVICE_NAME, "started bridge");
        Ok(())
    }

    fn stop(&self) -> WorkloadResult<()> {
        self.systemctl("stop")
            .map_err(|source| SnapError::Stop { source })?;
        info!(service = SERVICE_NAME, "stopped bridge");
        Ok(())
    }

    fn reload(&self) -> WorkloadResult<()> {
        self.systemctl("reload")
            .map_err(|source| SnapError::Reload { source })?;
        self.mark_loaded()?;
        info!(service = SERVICE_NAME, "reloaded bridge");
        Ok(())
    }
}
