pub mod analyze;
pub mod chat;
pub mod config;
pub mod health;
pub mod logs;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use ad_client::{ClientError, DeploymentBackend, HttpBackend};
use ad_core::config::Config;
use ad_core::log_record::LogBuffer;
use ad_core::pipeline::{render_timeline, PipelineSnapshot};
use ad_core::types::LogEntry;
use ad_session::{DispatchError, SessionEvent};
use anyhow::Context;

/// Load the config file (or defaults) and apply the `--api` override.
pub fn load_config(path: Option<&Path>, api_override: Option<&str>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load config")?,
    };
    if let Some(api) = api_override {
        config.backend.base_url = api.trim_end_matches('/').to_string();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

pub fn backend(config: &Config) -> Arc<dyn DeploymentBackend> {
    Arc::new(HttpBackend::from_config(&config.backend))
}

/// Map backend errors to user-facing messages.
pub fn friendly_error(err: ClientError, base_url: &str) -> anyhow::Error {
    match err {
        ClientError::Connect(_) => anyhow::anyhow!(
            "Could not connect to the deployment backend at {base_url}. Is it running?\n  \
             (hint: pass --api or set AUTODEPLOY_API_URL)"
        ),
        ClientError::Timeout => {
            anyhow::anyhow!("Request timed out. The backend may be overloaded.")
        }
        ClientError::Api { status, body } if body.is_empty() => {
            anyhow::anyhow!("Backend request failed (HTTP {status})")
        }
        ClientError::Api { status, body } => {
            anyhow::anyhow!("Backend request failed (HTTP {status}): {body}")
        }
        other => anyhow::anyhow!("Backend request failed: {other}"),
    }
}

pub fn format_log_entry(entry: &LogEntry) -> String {
    format!(
        "{} {:<7} {}",
        entry.timestamp,
        entry.level.label(),
        entry.message
    )
}

/// Tracks which log entries have been printed already.
#[derive(Debug, Default)]
pub struct LogCursor {
    last_id: u64,
}

impl LogCursor {
    /// Entries newer than the last call, oldest first.
    pub fn fresh(&mut self, buffer: &LogBuffer) -> Vec<LogEntry> {
        let fresh: Vec<LogEntry> = buffer
            .iter()
            .filter(|e| e.id > self.last_id)
            .cloned()
            .collect();
        if let Some(last) = fresh.last() {
            self.last_id = last.id;
        }
        fresh
    }
}

pub fn format_snapshot(snapshot: &PipelineSnapshot) -> String {
    let header = match &snapshot.task_id {
        Some(id) => format!("task {id}: {}", snapshot.current_message),
        None => snapshot.current_message.clone(),
    };
    format!("{header}\n{}", render_timeline(&snapshot.steps))
}

/// One status line for a session event, or `None` for events not worth
/// showing.
pub fn describe_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::TaskCreated { .. } | SessionEvent::LogStreamOpened => None,
        SessionEvent::PollStopped { task_id, message } => {
            Some(format!("task {task_id} finished: {message}"))
        }
        SessionEvent::LogStreamClosed => {
            Some("log stream closed by the backend (/reconnect to reopen)".to_string())
        }
        SessionEvent::Failed(DispatchError::LogStream(e)) => {
            Some(format!("log stream unavailable: {e} (/reconnect to retry)"))
        }
        SessionEvent::Failed(err) => Some(err.to_string()),
    }
}

/// Dim when stderr is a terminal.
pub fn status_line(text: &str) -> String {
    if std::io::stderr().is_terminal() {
        format!("\x1b[2m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}
