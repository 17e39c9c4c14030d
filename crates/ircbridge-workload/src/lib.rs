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

//! Configuration renderer, key manager and service controller for the IRC bridge.
//!
//! Layout: `render.rs` (config document), `keys.rs` (passkey and signing key),
//! `registration.rs` (appservice registration), `service.rs` (snap and systemd control),
//! `files.rs` (atomic writes), `error.rs`.

pub mod error;
mod files;
mod keys;
pub mod registration;
pub mod render;
pub mod service;

pub use error::{
    ConfigurationFileError, ConfigurationFileResult, SnapError, WorkloadError, WorkloadResult,
};
pub use registration::Registration;
pub use render::{RenderRequest, render_config};
pub use service::{BridgeWorkload, IrcBridgeService, RenderOutcome, ServiceState};
