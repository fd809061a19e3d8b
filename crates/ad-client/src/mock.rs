//! Scripted in-memory backend.
//!
//! Each operation pops the next queued result; an empty queue produces a
//! default success. Calls are recorded for assertions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ad_api_types::HealthResponse;
use ad_core::pipeline::default_steps;
use ad_core::types::{StepStatus, TaskId};
use async_trait::async_trait;

use crate::backend::{DeploymentBackend, LogStream, TaskStatus};
use crate::error::ClientError;

/// One recorded `create_analysis_task` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
    pub repo_url: String,
    pub branch: String,
    pub token: Option<String>,
}

type LogFeed = flume::Receiver<Result<String, ClientError>>;

#[derive(Default)]
struct Script {
    creates: VecDeque<Result<TaskId, ClientError>>,
    statuses: VecDeque<Result<TaskStatus, ClientError>>,
    chats: VecDeque<Result<String, ClientError>>,
    feeds: VecDeque<Result<LogFeed, ClientError>>,
    health: Option<Result<HealthResponse, ClientError>>,
    status_delay: Option<Duration>,

    create_calls: Vec<CreateCall>,
    status_calls: Vec<TaskId>,
    chat_calls: Vec<String>,
}

/// A [`DeploymentBackend`] that returns queued responses.
#[derive(Clone, Default)]
pub struct MockBackend {
    script: Arc<Mutex<Script>>,
    next_task: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("MockBackend lock poisoned")
    }

    /// Queue the result of the next task creation.
    pub fn push_create(&self, result: Result<TaskId, ClientError>) {
        self.script().creates.push_back(result);
    }

    /// Queue the result of the next status fetch.
    pub fn push_status(&self, result: Result<TaskStatus, ClientError>) {
        self.script().statuses.push_back(result);
    }

    /// Queue the result of the next chat message.
    pub fn push_chat(&self, result: Result<String, ClientError>) {
        self.script().chats.push_back(result);
    }

    /// Queue a log feed for the next `open_log_stream` call and return the
    /// sender that drives it. Dropping the sender ends the stream.
    pub fn push_log_feed(&self) -> flume::Sender<Result<String, ClientError>> {
        let (tx, rx) = flume::unbounded();
        self.script().feeds.push_back(Ok(rx));
        tx
    }

    /// Make the next `open_log_stream` call fail.
    pub fn push_log_feed_error(&self, error: ClientError) {
        self.script().feeds.push_back(Err(error));
    }

    pub fn set_health(&self, result: Result<HealthResponse, ClientError>) {
        self.script().health = Some(result);
    }

    /// Delay every status fetch, simulating a slow backend.
    pub fn set_status_delay(&self, delay: Duration) {
        self.script().status_delay = Some(delay);
    }

    pub fn create_calls(&self) -> Vec<CreateCall> {
        self.script().create_calls.clone()
    }

    pub fn status_calls(&self) -> Vec<TaskId> {
        self.script().status_calls.clone()
    }

    pub fn chat_calls(&self) -> Vec<String> {
        self.script().chat_calls.clone()
    }

    /// A status whose first step has completed and second is running.
    pub fn in_progress(message: &str) -> TaskStatus {
        let mut steps = default_steps();
        steps[0].status = StepStatus::Completed;
        steps[0].timestamp = Some("Just now".to_string());
        steps[1].status = StepStatus::Active;
        TaskStatus {
            steps,
            current_message: message.to_string(),
        }
    }
}

#[async_trait]
impl DeploymentBackend for MockBackend {
    async fn create_analysis_task(
        &self,
        repo_url: &str,
        branch: &str,
        token: Option<&str>,
    ) -> Result<TaskId, ClientError> {
        let mut script = self.script();
        script.create_calls.push(CreateCall {
            repo_url: repo_url.to_string(),
            branch: branch.to_string(),
            token: token.map(str::to_string),
        });
        match script.creates.pop_front() {
            Some(result) => result,
            None => {
                let n = self.next_task.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(TaskId::new(format!("task-{n}")))
            }
        }
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatus, ClientError> {
        let (delay, result) = {
            let mut script = self.script();
            script.status_calls.push(task_id.clone());
            let result = script
                .statuses
                .pop_front()
                .unwrap_or_else(|| Ok(Self::in_progress("In Progress")));
            (script.status_delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn send_chat_message(&self, message: &str) -> Result<String, ClientError> {
        let mut script = self.script();
        script.chat_calls.push(message.to_string());
        script
            .chats
            .pop_front()
            .unwrap_or_else(|| Ok("Mock response".to_string()))
    }

    async fn open_log_stream(&self) -> Result<LogStream, ClientError> {
        let feed = self.script().feeds.pop_front();
        match feed {
            Some(Ok(rx)) => Ok(Box::pin(rx.into_stream())),
            Some(Err(e)) => Err(e),
            None => Err(ClientError::Connect("no log feed scripted".to_string())),
        }
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.script().health.clone().unwrap_or_else(|| {
            Ok(HealthResponse {
                status: "Backend is running".to_string(),
                database: "Connected".to_string(),
            })
        })
    }
}
