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

//! Charm options, datasource value objects and fixed locations for the IRC bridge operator.
//!
//! Layout: `model.rs` (typed options and datasources), `validate.rs`
//! (parsing helpers), `paths.rs` (`BridgePaths`), `defaults.rs` (names, paths, ports).

pub mod defaults;
pub mod error;
pub mod model;
pub mod paths;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{CharmConfig, DatasourceMatrix, DatasourcePostgreSQL, RawCharmOptions, Redacted};
pub use paths::BridgePaths;
pub use validate::{normalize_homeserver, parse_bridge_admins};
