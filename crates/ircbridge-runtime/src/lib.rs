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

//! Host process seam for the IRC bridge operator.
//!
//! Layout: `command.rs` (`CommandSpec`, `CommandRunner`, `SystemRunner`), `error.rs`.

pub mod command;
pub mod error;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use error::{RuntimeError, RuntimeResult};
