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

//! Logging primitives shared across the IRC bridge operator.
//!
//! Layout: `init.rs` (subscriber installation), `context.rs` (hook span), `error.rs`.

pub mod context;
pub mod error;
pub mod init;

pub use context::{HookContextGuard, record_outcome};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_id, init_logging};
