//! Domain model for the autodeploy task-tracking pipeline.
//!
//! Everything in this crate is synchronous and free of network I/O: the
//! chat command parser, the deployment step template and its timeline
//! rendering, the live-log record parser with its bounded buffer, and the
//! on-disk configuration.

pub mod command;
pub mod config;
pub mod log_record;
pub mod pipeline;
pub mod types;
