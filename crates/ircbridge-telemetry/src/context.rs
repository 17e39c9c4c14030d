//! Hook-level tracing span.
//!
//! # Design
//! - One process handles exactly one hook, so a single span entered for the lifetime of
//!   the process tags every log line with the hook and unit.

use tracing::{Span, span::Entered};

use crate::init::build_id;

/// Guard that keeps the hook span entered for the lifetime of the process.
pub struct HookContextGuard {
    _guard: Entered<'static>,
}

impl HookContextGuard {
    /// Enter the `hook` span carrying the hook name, unit name and build id.
    #[must_use]
    pub fn new(hook: impl Into<String>, unit: impl Into<String>) -> Self {
        let hook = hook.into();
        let unit = unit.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "hook",
            hook = %hook,
            unit = %unit,
            build = %build_id(),
            outcome = tracing::field::Empty
        )));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Record the reconciliation outcome on the active hook span.
pub fn record_outcome(outcome: &str) {
    Span::current().record("outcome", tracing::field::display(outcome));
}
