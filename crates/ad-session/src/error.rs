use ad_client::ClientError;
use ad_core::types::TaskId;
use thiserror::Error;

/// Failures of the asynchronous pipeline stages.
///
/// None of these abort the session. Chat failures are answered with a
/// fallback message; the others are published on the [`EventBus`] and the
/// affected component degrades to its previous state.
///
/// [`EventBus`]: crate::event_bus::EventBus
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("task creation for {repo_url} failed: {source}")]
    TaskCreationFailed {
        repo_url: String,
        source: ClientError,
    },

    #[error("chat request failed: {0}")]
    ChatFailed(#[source] ClientError),

    #[error("status poll for task {task_id} failed: {source}")]
    PollFailed { task_id: TaskId, source: ClientError },

    #[error("log stream failed: {0}")]
    LogStream(#[source] ClientError),
}
