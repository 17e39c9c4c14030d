//! Lifecycle events decoded from the hook being dispatched.

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use crate::error::CharmError;

/// Phase of a relation lifecycle hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationHook {
    /// `<endpoint>-relation-created`.
    Created,
    /// `<endpoint>-relation-joined`.
    Joined,
    /// `<endpoint>-relation-changed`.
    Changed,
    /// `<endpoint>-relation-departed`.
    Departed,
    /// `<endpoint>-relation-broken`.
    Broken,
}

impl RelationHook {
    const ALL: [(Self, &'static str); 5] = [
        (Self::Created, "-relation-created"),
        (Self::Joined, "-relation-joined"),
        (Self::Changed, "-relation-changed"),
        (Self::Departed, "-relation-departed"),
        (Self::Broken, "-relation-broken"),
    ];

    const fn suffix(self) -> &'static str {
        match self {
            Self::Created => "-relation-created",
            Self::Joined => "-relation-joined",
            Self::Changed => "-relation-changed",
            Self::Departed => "-relation-departed",
            Self::Broken => "-relation-broken",
        }
    }
}

/// A Juju lifecycle event handled by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// First hook on a new unit.
    Install,
    /// Unit start.
    Start,
    /// Unit teardown.
    Stop,
    /// New charm revision deployed.
    UpgradeCharm,
    /// Charm options changed.
    ConfigChanged,
    /// Periodic status refresh.
    UpdateStatus,
    /// This unit became leader.
    LeaderElected,
    /// A consumed secret was updated.
    SecretChanged,
    /// A relation hook on `endpoint`.
    Relation {
        /// Relation endpoint.
        endpoint: String,
        /// Relation phase.
        hook: RelationHook,
    },
    /// Any other hook; treated as a reconciliation trigger.
    Other(String),
}

impl LifecycleEvent {
    /// Decode the event from `JUJU_DISPATCH_PATH` (e.g. `hooks/config-changed`).
    ///
    /// # Errors
    ///
    /// Returns [`CharmError::InvalidDispatch`] when the path has no hook name.
    pub fn from_dispatch_path(path: &str) -> Result<Self, CharmError> {
        Path::new(path)
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| CharmError::InvalidDispatch {
                value: path.to_string(),
            })?
            .parse()
    }

    /// Whether the hook runs while its relation is being removed.
    #[must_use]
    pub const fn is_relation_broken(&self) -> bool {
        matches!(
            self,
            Self::Relation {
                hook: RelationHook::Broken,
                ..
            }
        )
    }
}

impl FromStr for LifecycleEvent {
    type Err = CharmError;

    fn from_str(hook: &str) -> Result<Self, Self::Err> {
        let hook = hook.trim();
        if hook.is_empty() {
            return Err(CharmError::InvalidDispatch {
                value: hook.to_string(),
            });
        }
        let event = match hook {
            "install" => Self::Install,
            "start" => Self::Start,
            "stop" => Self::Stop,
            "upgrade-charm" => Self::UpgradeCharm,
            "config-changed" => Self::ConfigChanged,
            "update-status" => Self::UpdateStatus,
            "leader-elected" => Self::LeaderElected,
            "secret-changed" => Self::SecretChanged,
            other => RelationHook::ALL
                .iter()
                .find_map(|(kind, suffix)| {
                    other
                        .strip_suffix(suffix)
                        .filter(|endpoint| !endpoint.is_empty())
                        .map(|endpoint| Self::Relation {
                            endpoint: endpoint.to_string(),
                            hook: *kind,
                        })
                })
                .unwrap_or_else(|| Self::Other(other.to_string())),
        };
        Ok(event)
    }
}

impl Display for LifecycleEvent {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Install => "install",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::UpgradeCharm => "upgrade-charm",
            Self::ConfigChanged => "config-changed",
            Self::UpdateStatus => "update-status",
            Self::LeaderElected => "leader-elected",
            Self::SecretChanged => "secret-changed",
            Self::Relation { endpoint, hook } => {
                return write!(formatter, "{endpoint}{}", hook.suffix());
            }
            Self::Other(name) => name,
        };
        formatter.write_str(name)
    }
}
