//! Wire types for the autodeploy analysis backend.
//!
//! These mirror the JSON bodies exchanged with the backend service. Inbound
//! types are lenient (`#[serde(default)]`) so that a partially populated
//! response still deserializes; callers decide what a missing field means.

use serde::{Deserialize, Serialize};

// ── Task creation ──

/// Body of `POST /analyze/analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub repo_url: String,
    pub branch: String,
    /// Serialized as `null` when absent; the backend treats that as
    /// "local analysis only".
    pub github_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

// ── Task status ──

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPipelineStep {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Body of `GET /analyze/status/{task_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub steps: Vec<ApiPipelineStep>,
    #[serde(default)]
    pub current_message: String,
}

// ── Chat ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response: String,
}

// ── Liveness ──

/// Body of `GET /health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_serializes_missing_token_as_null() {
        let req = CreateTaskRequest {
            repo_url: "https://github.com/acme/widget".into(),
            branch: "main".into(),
            github_token: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["github_token"], serde_json::Value::Null);
        assert_eq!(v["branch"], "main");
    }

    #[test]
    fn status_response_tolerates_missing_fields() {
        let resp: TaskStatusResponse =
            serde_json::from_str(r#"{"steps":[{"id":"upload","status":"completed"}]}"#).unwrap();
        assert_eq!(resp.steps.len(), 1);
        assert_eq!(resp.steps[0].title, "");
        assert!(resp.steps[0].timestamp.is_none());
        assert_eq!(resp.current_message, "");
    }

    #[test]
    fn create_response_without_task_id() {
        let resp: CreateTaskResponse = serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert!(resp.task_id.is_none());
    }
}
