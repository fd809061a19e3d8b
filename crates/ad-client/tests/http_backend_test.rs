use std::sync::{Arc, Mutex};

use ad_client::{ClientError, DeploymentBackend, HttpBackend};
use ad_core::types::{StepStatus, TaskId};
use axum::{
    extract::Path,
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use futures_util::StreamExt;
use serde_json::{json, Value};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn create_task_sends_repo_branch_and_token() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let captured = seen.clone();
    let app = Router::new().route(
        "/api/v1/analyze/analyze",
        post(move |Json(body): Json<Value>| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = Some(body);
                Json(json!({
                    "status": "queued",
                    "task_id": "0b6f6c1e",
                    "message": "Analysis started"
                }))
            }
        }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let id = backend
        .create_analysis_task("https://github.com/acme/widget", "main", Some("ghp_abc123"))
        .await
        .unwrap();
    assert_eq!(id, TaskId::from("0b6f6c1e"));

    let body = seen.lock().unwrap().clone().unwrap();
    assert_eq!(body["repo_url"], "https://github.com/acme/widget");
    assert_eq!(body["branch"], "main");
    assert_eq!(body["github_token"], "ghp_abc123");
}

#[tokio::test]
async fn create_task_without_token_sends_null() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let captured = seen.clone();
    let app = Router::new().route(
        "/api/v1/analyze/analyze",
        post(move |Json(body): Json<Value>| {
            let captured = captured.clone();
            async move {
                *captured.lock().unwrap() = Some(body);
                Json(json!({"status": "queued", "task_id": "t1"}))
            }
        }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    backend
        .create_analysis_task("https://github.com/acme/widget", "main", None)
        .await
        .unwrap();
    let body = seen.lock().unwrap().clone().unwrap();
    assert_eq!(body["github_token"], Value::Null);
}

#[tokio::test]
async fn create_task_fails_on_server_error() {
    let app = Router::new().route(
        "/api/v1/analyze/analyze",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let err = backend
        .create_analysis_task("https://github.com/acme/widget", "main", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 500, .. }));
}

#[tokio::test]
async fn create_task_without_id_is_an_error() {
    let app = Router::new().route(
        "/api/v1/analyze/analyze",
        post(|| async { Json(json!({"status": "queued"})) }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let err = backend
        .create_analysis_task("https://github.com/acme/widget", "main", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Parse(_)));
}

#[tokio::test]
async fn task_status_maps_steps() {
    let app = Router::new().route(
        "/api/v1/analyze/status/{id}",
        get(|Path(id): Path<String>| async move {
            assert_eq!(id, "t-42");
            Json(json!({
                "steps": [
                    {"id": "upload", "title": "Code Uploaded", "description": "d", "status": "completed", "timestamp": "Just now"},
                    {"id": "analyze", "title": "AI Analysis", "description": "d", "status": "active"}
                ],
                "current_message": "Analyzing project structure..."
            }))
        }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let status = backend.task_status(&TaskId::from("t-42")).await.unwrap();
    assert_eq!(status.steps.len(), 2);
    assert_eq!(status.steps[0].status, StepStatus::Completed);
    assert_eq!(status.steps[1].status, StepStatus::Active);
    assert_eq!(status.current_message, "Analyzing project structure...");
}

#[tokio::test]
async fn task_status_without_steps_is_a_parse_error() {
    let app = Router::new().route(
        "/api/v1/analyze/status/{id}",
        get(|| async { Json(json!({})) }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let err = backend.task_status(&TaskId::from("t-1")).await.unwrap_err();
    assert!(matches!(err, ClientError::Parse(_)));
}

#[tokio::test]
async fn task_status_sends_id_as_one_segment() {
    let seen: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let app = Router::new().route(
        "/api/v1/analyze/status/{id}",
        get({
            let seen = seen.clone();
            move |Path(id): Path<String>| async move {
                *seen.lock().unwrap() = Some(id);
                Json(json!({
                    "steps": [{"id": "upload", "title": "Code Uploaded", "description": "d", "status": "active"}],
                    "current_message": "Cloning repository..."
                }))
            }
        }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let status = backend.task_status(&TaskId::from("a/b?c")).await.unwrap();
    assert_eq!(status.steps.len(), 1);
    assert_eq!(seen.lock().unwrap().as_deref(), Some("a/b?c"));
}

#[tokio::test]
async fn task_status_not_found() {
    let app = Router::new().route(
        "/api/v1/analyze/status/{id}",
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({"detail": "Task not found"}))) }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let err = backend.task_status(&TaskId::from("missing")).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
}

#[tokio::test]
async fn chat_returns_response_text_verbatim() {
    let app = Router::new().route(
        "/api/v1/chat",
        post(|Json(body): Json<Value>| async move {
            Json(json!({"response": format!("**echo:** {}", body["message"].as_str().unwrap())}))
        }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let reply = backend.send_chat_message("hello <b>").await.unwrap();
    assert_eq!(reply, "**echo:** hello <b>");
}

#[tokio::test]
async fn chat_failure_is_an_error() {
    let app = Router::new().route(
        "/api/v1/chat",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "Failed to process chat message."})),
            )
        }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    assert!(backend.send_chat_message("hi").await.is_err());
}

#[tokio::test]
async fn unreachable_backend_is_connect_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(&format!("http://{addr}"));
    let err = backend.send_chat_message("hi").await.unwrap_err();
    assert!(err.is_unreachable(), "unexpected error: {err}");
}

#[tokio::test]
async fn log_stream_yields_event_payloads() {
    let app = Router::new().route(
        "/api/v1/logs/stream",
        get(|| async {
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                "data: 14:32:15 | INFO | Starting\r\n\r\n: ping\r\n\r\ndata: 14:32:16 | ERROR | a | b\r\n\r\n",
            )
        }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let stream = backend.open_log_stream().await.unwrap();
    let items: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
    assert_eq!(
        items,
        ["14:32:15 | INFO | Starting", "14:32:16 | ERROR | a | b"]
    );
}

#[tokio::test]
async fn log_stream_rejects_error_status() {
    let app = Router::new().route(
        "/api/v1/logs/stream",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let err = match backend.open_log_stream().await {
        Ok(_) => panic!("expected an error"),
        Err(e) => e,
    };
    assert!(matches!(err, ClientError::Api { status: 503, .. }));
}

#[tokio::test]
async fn health_reports_database_state() {
    let app = Router::new().route(
        "/health",
        get(|| async { Json(json!({"status": "Backend is running", "database": "Connected"})) }),
    );
    let backend = HttpBackend::new(&serve(app).await);

    let health = backend.health().await.unwrap();
    assert_eq!(health.status, "Backend is running");
    assert_eq!(health.database, "Connected");
}
