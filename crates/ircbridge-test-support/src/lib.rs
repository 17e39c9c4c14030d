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

//! Shared test helpers used across the operator's suites.
//! Layout: fixtures.rs (scenario datasources and fake tool outputs), mocks.rs (scripted command runner).

pub mod fixtures;
pub mod mocks;

pub use mocks::ScriptedRunner;
