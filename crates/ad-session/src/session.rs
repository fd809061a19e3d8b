use std::sync::Arc;

use ad_api_types::HealthResponse;
use ad_client::DeploymentBackend;
use ad_core::config::Config;
use serde_json::json;
use tokio::sync::Mutex;

use crate::conversation::ConversationManager;
use crate::event_bus::{EventBus, SessionEvent};
use crate::log_stream::LogStreamConsumer;
use crate::poller::StatusPoller;
use crate::store::DeploymentStore;

/// Result of a backend health probe. An unreachable backend is reported as
/// offline rather than as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendHealth {
    pub online: bool,
    pub status: String,
    pub database: String,
}

impl BackendHealth {
    /// Ask `backend` whether it is up. Never fails.
    pub async fn probe(backend: &dyn DeploymentBackend) -> Self {
        match backend.health().await {
            Ok(resp) => Self::from_response(resp),
            Err(e) => {
                tracing::debug!(error = %e, "health probe failed");
                Self::offline(e.to_string())
            }
        }
    }

    fn from_response(resp: HealthResponse) -> Self {
        Self {
            online: true,
            status: resp.status,
            database: resp.database,
        }
    }

    fn offline(reason: impl Into<String>) -> Self {
        Self {
            online: false,
            status: reason.into(),
            database: "unknown".to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "online": self.online,
            "status": self.status,
            "database": self.database,
        })
    }
}

/// Everything one client session runs: the active-task store, the status
/// poller following it, and the live log consumer.
pub struct DeploymentSession {
    backend: Arc<dyn DeploymentBackend>,
    store: DeploymentStore,
    events: EventBus,
    poller: StatusPoller,
    logs: LogStreamConsumer,
    conversation: Arc<Mutex<ConversationManager>>,
}

impl DeploymentSession {
    /// Spawn the poller and open the log feed. Must be called inside a tokio
    /// runtime.
    pub fn start(backend: Arc<dyn DeploymentBackend>, config: &Config) -> Self {
        let store = DeploymentStore::new();
        let events = EventBus::new();
        let poller = StatusPoller::spawn(
            store.clone(),
            backend.clone(),
            config.poller.interval(),
            events.clone(),
        );
        let logs = LogStreamConsumer::start(backend.clone(), config.logs.capacity, events.clone());
        tracing::info!(
            interval_ms = config.poller.interval_ms,
            log_capacity = config.logs.capacity,
            "deployment session started"
        );

        let conversation = ConversationManager::new(
            backend.clone(),
            store.clone(),
            events.clone(),
            config.backend.default_branch.clone(),
        );

        Self {
            backend,
            store,
            events,
            poller,
            logs,
            conversation: Arc::new(Mutex::new(conversation)),
        }
    }

    /// The session's single chat front end. Every call hands out the same
    /// manager; submissions from different holders queue on its lock.
    pub fn conversation(&self) -> Arc<Mutex<ConversationManager>> {
        self.conversation.clone()
    }

    pub fn store(&self) -> &DeploymentStore {
        &self.store
    }

    pub fn poller(&self) -> &StatusPoller {
        &self.poller
    }

    pub fn logs(&self) -> &LogStreamConsumer {
        &self.logs
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe_events(&self) -> flume::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn health(&self) -> BackendHealth {
        BackendHealth::probe(self.backend.as_ref()).await
    }

    /// Stop polling and close the log feed.
    pub fn shutdown(&self) {
        self.poller.shutdown();
        self.logs.close();
        tracing::info!("deployment session stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ad_client::{ClientError, MockBackend};

    #[tokio::test]
    async fn health_reports_online_backend() {
        let backend = Arc::new(MockBackend::new());
        let session = DeploymentSession::start(backend, &Config::default());
        let health = session.health().await;
        assert!(health.online);
        assert_eq!(health.database, "Connected");
        assert_eq!(health.to_json()["online"], true);
    }

    #[tokio::test]
    async fn conversation_is_shared_across_callers() {
        let backend = Arc::new(MockBackend::new());
        backend.push_chat(Ok("Use a Dockerfile.".into()));
        let session = DeploymentSession::start(backend.clone(), &Config::default());

        let first = session.conversation();
        let second = session.conversation();
        assert!(Arc::ptr_eq(&first, &second));

        first.lock().await.submit("how do I ship this?").await;
        let messages = second.lock().await.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, "Use a Dockerfile.");
        assert_eq!(backend.chat_calls(), ["how do I ship this?"]);
    }

    #[tokio::test]
    async fn unreachable_backend_is_offline() {
        let backend = Arc::new(MockBackend::new());
        backend.set_health(Err(ClientError::Connect("refused".into())));
        let session = DeploymentSession::start(backend, &Config::default());
        let health = session.health().await;
        assert!(!health.online);
        assert_eq!(health.database, "unknown");
    }
}
