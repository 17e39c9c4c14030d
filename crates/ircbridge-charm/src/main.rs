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

//! Hook entrypoint invoked by the charm's `dispatch` script.

use ircbridge_charm::{CharmResult, run_charm};

/// Runs the dispatched hook to completion.
fn main() -> CharmResult<()> {
    run_charm()
}
