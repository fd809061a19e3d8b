//! Logging setup shared by the autodeploy binaries and tests.
//!
//! Output goes through `tracing-subscriber`'s fmt layer, either human-readable
//! or as JSON lines, filtered by `RUST_LOG` or a caller-supplied default.

pub mod logging;
