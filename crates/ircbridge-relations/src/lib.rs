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

//! Juju relation plumbing for the IRC bridge operator.
//!
//! Layout: `hooktools.rs` (agent client), `state.rs` (`RelationState`), `database.rs`,
//! `matrix.rs` and `ingress.rs` (observers), `fernet.rs` (registration encryption), `error.rs`.

pub mod database;
pub mod error;
pub mod fernet;
pub mod hooktools;
pub mod ingress;
pub mod matrix;
pub mod state;

pub use database::DatabaseObserver;
pub use error::{RelationDataError, RelationResult};
pub use fernet::FernetKey;
pub use hooktools::{Databag, HookTools, JujuHookTools};
pub use ingress::{IngressObserver, IngressRequest};
pub use matrix::MatrixObserver;
pub use state::RelationState;
