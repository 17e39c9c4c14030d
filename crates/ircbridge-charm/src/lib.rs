#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Juju operator for the matrix-appservice-irc bridge.
//!
//! Layout: `bootstrap.rs` (hook environment and wiring), `cli.rs`, `event.rs` (lifecycle
//! events), `dispatch.rs` (event routing and input gathering), `reconcile.rs`
//! (reconciliation controller), `status.rs`, `error.rs`.

/// Hook bootstrap and production wiring.
pub mod bootstrap;
/// Command line arguments.
pub mod cli;
/// Lifecycle event dispatch.
pub mod dispatch;
/// Charm error types.
pub mod error;
/// Lifecycle events.
pub mod event;
/// Reconciliation controller.
pub mod reconcile;
/// Unit status model.
pub mod status;

pub use bootstrap::run_charm;
pub use dispatch::{Charm, UnitIdentity};
pub use error::{CharmError, CharmResult};
pub use event::{LifecycleEvent, RelationHook};
pub use reconcile::{
    FailureKind, Outcome, Readiness, ReconcileInputs, Reconciler, RegistrationPublisher,
    ServiceAction,
};
pub use status::{StatusKind, UnitStatus};
