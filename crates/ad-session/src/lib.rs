//! Runtime of the deployment task-tracking pipeline.
//!
//! Event flow is one-directional:
//!
//! ```text
//! chat input -> ConversationManager -> task creation -> DeploymentStore
//!            -> StatusPoller (subscribed to the active task) -> step snapshots
//! ```
//!
//! The live log feed runs alongside, independent of which task is active.
//! [`DeploymentSession`] owns all of it and tears it down on shutdown.

pub mod conversation;
pub mod error;
pub mod event_bus;
pub mod log_stream;
pub mod poller;
pub mod session;
pub mod store;

pub use conversation::{ConversationManager, ConversationSnapshot, SubmitOutcome};
pub use error::DispatchError;
pub use event_bus::{EventBus, SessionEvent};
pub use log_stream::{LogStreamConsumer, StreamState};
pub use poller::{PollerState, StatusPoller};
pub use session::{BackendHealth, DeploymentSession};
pub use store::{ActiveTask, DeploymentStore};
