//! Unit workload status reported to Juju.

use std::fmt::{self, Display, Formatter};

use ircbridge_relations::{HookTools, RelationResult};

/// Status name understood by `status-set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Workload is serving.
    Active,
    /// Operator intervention is required.
    Blocked,
    /// Waiting on another application.
    Waiting,
    /// The charm is busy with a lifecycle step.
    Maintenance,
}

impl StatusKind {
    /// Name passed to `status-set`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Waiting => "waiting",
            Self::Maintenance => "maintenance",
        }
    }
}

/// Status plus the short message shown in `juju status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStatus {
    /// Status kind.
    pub kind: StatusKind,
    /// Human readable message.
    pub message: String,
}

impl UnitStatus {
    /// Active status with no message.
    #[must_use]
    pub const fn active() -> Self {
        Self {
            kind: StatusKind::Active,
            message: String::new(),
        }
    }

    /// Blocked status.
    #[must_use]
    pub fn blocked(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Blocked,
            message: message.into(),
        }
    }

    /// Waiting status.
    #[must_use]
    pub fn waiting(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Waiting,
            message: message.into(),
        }
    }

    /// Maintenance status.
    #[must_use]
    pub fn maintenance(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Maintenance,
            message: message.into(),
        }
    }

    /// Report this status through `tools`.
    ///
    /// # Errors
    ///
    /// Returns a relation error when `status-set` fails.
    pub fn apply<H: HookTools + ?Sized>(&self, tools: &H) -> RelationResult<()> {
        tools.status_set(self.kind.as_str(), &self.message)
    }
}

impl Display for UnitStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            formatter.write_str(self.kind.as_str())
        } else {
            write!(formatter, "{}: {}", self.kind.as_str(), self.message)
        }
    }
}
