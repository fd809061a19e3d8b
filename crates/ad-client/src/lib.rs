//! Client side of the autodeploy backend contract.
//!
//! [`DeploymentBackend`] is the seam the session runtime talks to. The
//! production implementation is [`HttpBackend`] (reqwest, with the push log
//! feed decoded from server-sent events); [`MockBackend`] returns scripted
//! responses for tests and offline runs.

pub mod backend;
pub mod error;
pub mod http;
pub mod mock;
pub mod sse;

pub use backend::{DeploymentBackend, LogStream, TaskStatus};
pub use error::ClientError;
pub use http::HttpBackend;
pub use mock::MockBackend;
