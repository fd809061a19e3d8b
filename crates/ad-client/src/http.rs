//! reqwest implementation of [`DeploymentBackend`].

use ad_api_types::{
    ChatRequest, ChatResponse, CreateTaskRequest, CreateTaskResponse, HealthResponse,
    TaskStatusResponse,
};
use ad_core::config::BackendConfig;
use ad_core::types::TaskId;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::backend::{DeploymentBackend, LogStream, TaskStatus};
use crate::error::ClientError;
use crate::sse;

/// Reusable async client + base URL.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: String,
    api_prefix: String,
}

impl HttpBackend {
    pub fn new(base: &str) -> Self {
        Self::with_client(base, reqwest::Client::new())
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(&config.base_url, client).with_api_prefix(&config.api_prefix)
    }

    fn with_client(base: &str, client: reqwest::Client) -> Self {
        Self {
            client,
            base: base.trim().trim_end_matches('/').to_string(),
            api_prefix: "/api/v1".to_string(),
        }
    }

    /// Override the versioned API prefix (default `/api/v1`).
    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim().trim_end_matches('/');
        self.api_prefix = if prefix.is_empty() || prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{prefix}")
        };
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base, self.api_prefix, path)
    }

    /// Status URL with the task id encoded as one path segment.
    fn status_url(&self, task_id: &TaskId) -> Result<reqwest::Url, ClientError> {
        let mut url = reqwest::Url::parse(&self.api_url("/analyze/status"))
            .map_err(|e| ClientError::Http(format!("invalid backend url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Http(format!("backend url cannot take a path: {}", self.base)))?
            .push(task_id.as_str());
        Ok(url)
    }

    async fn read_json<T: DeserializeOwned>(
        resp: reqwest::Response,
        what: &str,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| ClientError::Parse(format!("{what}: {e}")))
    }
}

#[async_trait]
impl DeploymentBackend for HttpBackend {
    async fn create_analysis_task(
        &self,
        repo_url: &str,
        branch: &str,
        token: Option<&str>,
    ) -> Result<TaskId, ClientError> {
        let body = CreateTaskRequest {
            repo_url: repo_url.to_string(),
            branch: branch.to_string(),
            github_token: token.map(str::to_string),
        };
        let resp = self
            .client
            .post(self.api_url("/analyze/analyze"))
            .json(&body)
            .send()
            .await?;
        let created: CreateTaskResponse = Self::read_json(resp, "create task").await?;

        match created.task_id {
            Some(id) if !id.trim().is_empty() => {
                tracing::debug!(task_id = %id, status = %created.status, "analysis task queued");
                Ok(TaskId::new(id))
            }
            _ => Err(ClientError::Parse(
                "create task: response has no task_id".to_string(),
            )),
        }
    }

    async fn task_status(&self, task_id: &TaskId) -> Result<TaskStatus, ClientError> {
        let resp = self
            .client
            .get(self.status_url(task_id)?)
            .header("Accept", "application/json")
            .send()
            .await?;
        let status: TaskStatusResponse = Self::read_json(resp, "task status").await?;
        // An empty body would otherwise wipe the timeline.
        if status.steps.is_empty() {
            return Err(ClientError::Parse(
                "task status: response has no steps".to_string(),
            ));
        }
        Ok(status.into())
    }

    async fn send_chat_message(&self, message: &str) -> Result<String, ClientError> {
        let resp = self
            .client
            .post(self.api_url("/chat"))
            .json(&ChatRequest {
                message: message.to_string(),
            })
            .send()
            .await?;
        let reply: ChatResponse = Self::read_json(resp, "chat").await?;
        Ok(reply.response)
    }

    async fn open_log_stream(&self) -> Result<LogStream, ClientError> {
        let resp = self
            .client
            .get(self.api_url("/logs/stream"))
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let bytes = Box::pin(resp.bytes_stream());
        Ok(Box::pin(sse::data_events(bytes)))
    }

    async fn health(&self) -> Result<HealthResponse, ClientError> {
        let resp = self
            .client
            .get(format!("{}/health", self.base))
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::read_json(resp, "health").await
    }
}
