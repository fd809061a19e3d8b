use std::pin::Pin;

use ad_api_types::{ApiPipelineStep, HealthResponse, TaskStatusResponse};
use ad_core::types::{PipelineStep, StepStatus, TaskId};
use async_trait::async_trait;
use futures_util::Stream;

use crate::error::ClientError;

/// Raw record payloads from the push log feed, in arrival order. The stream
/// ends when the server closes the connection.
pub type LogStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

/// Latest server view of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub steps: Vec<PipelineStep>,
    pub current_message: String,
}

impl From<TaskStatusResponse> for TaskStatus {
    fn from(resp: TaskStatusResponse) -> Self {
        Self {
            steps: resp.steps.into_iter().map(step_from_api).collect(),
            current_message: resp.current_message,
        }
    }
}

fn step_from_api(step: ApiPipelineStep) -> PipelineStep {
    let status = StepStatus::from_wire(&step.status).unwrap_or_else(|| {
        tracing::warn!(step = %step.id, status = %step.status, "unknown step status, treating as pending");
        StepStatus::Pending
    });
    PipelineStep {
        id: step.id,
        title: step.title,
        description: step.description,
        status,
        timestamp: step.timestamp,
    }
}

/// The backend operations the task-tracking pipeline consumes.
#[async_trait]
pub trait DeploymentBackend: Send + Sync {
    /// Queue an analysis job for `repo_url` and return its id.
    async fn create_analysis_task(
        &self,
        repo_url: &str,
        branch: &str,
        token: Option<&str>,
    ) -> Result<TaskId, ClientError>;

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatus, ClientError>;

    /// Send free-form text to the assistant and return its markdown reply.
    async fn send_chat_message(&self, message: &str) -> Result<String, ClientError>;

    /// Open the long-lived push log feed.
    async fn open_log_stream(&self) -> Result<LogStream, ClientError>;

    /// Liveness probe.
    async fn health(&self) -> Result<HealthResponse, ClientError>;
}
