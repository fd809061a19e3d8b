//! Chat history and input dispatch.
//!
//! Every submission appends the user's message first, then either starts an
//! analysis task (input carries a GitHub repository URL) or forwards the text
//! to the general chat endpoint. The thinking flag and status phrase are
//! restored on every exit path.

use std::sync::Arc;

use ad_client::DeploymentBackend;
use ad_core::command::{route_input, InputRoute, RepositoryCommand};
use ad_core::types::{ChatMessage, TaskId};
use tokio::sync::watch;

use crate::error::DispatchError;
use crate::event_bus::{EventBus, SessionEvent};
use crate::store::DeploymentStore;

pub const GREETING: &str = "Hello! I'm your AI Deployment Assistant. Paste a GitHub repository link or ask me anything about your deployment process!";
pub const IDLE_PHRASE: &str = "Ready to assist with your deployment...";
pub const CLONING_PHRASE: &str = "Cloning repository...";
pub const THINKING_PHRASE: &str = "Thinking...";
pub const CHAT_FALLBACK: &str =
    "I'm sorry, I'm having trouble connecting to my brain right now. Please try again later.";

/// Everything a chat view renders, published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    pub messages: Vec<ChatMessage>,
    pub thinking: bool,
    pub status_phrase: String,
    pub pending_input: String,
}

impl ConversationSnapshot {
    fn fresh() -> Self {
        Self {
            messages: vec![ChatMessage::agent(GREETING)],
            thinking: false,
            status_phrase: IDLE_PHRASE.to_string(),
            pending_input: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Ignored,
    TaskStarted(TaskId),
    /// No chat message was added for this failure.
    TaskCreationFailed(DispatchError),
    Replied,
    /// The fallback apology was added instead of a reply.
    Fallback(DispatchError),
}

pub struct ConversationManager {
    backend: Arc<dyn DeploymentBackend>,
    store: DeploymentStore,
    events: EventBus,
    default_branch: String,
    state_tx: watch::Sender<ConversationSnapshot>,
}

impl ConversationManager {
    pub fn new(
        backend: Arc<dyn DeploymentBackend>,
        store: DeploymentStore,
        events: EventBus,
        default_branch: impl Into<String>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConversationSnapshot::fresh());
        Self {
            backend,
            store,
            events,
            default_branch: default_branch.into(),
            state_tx,
        }
    }

    fn update(&self, f: impl FnOnce(&mut ConversationSnapshot)) {
        self.state_tx.send_modify(f);
    }

    /// Dispatch one chat submission. Taking `&mut self` keeps submissions
    /// strictly one at a time.
    pub async fn submit(&mut self, input: &str) -> SubmitOutcome {
        if input.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        self.update(|s| {
            s.messages.push(ChatMessage::user(input));
            s.pending_input.clear();
        });

        let outcome = match route_input(input) {
            InputRoute::Analyze(cmd) => self.dispatch_analysis(cmd).await,
            InputRoute::Chat(text) => self.dispatch_chat(text).await,
        };

        self.update(|s| {
            s.thinking = false;
            s.status_phrase = IDLE_PHRASE.to_string();
        });
        outcome
    }

    async fn dispatch_analysis(&self, cmd: RepositoryCommand) -> SubmitOutcome {
        self.update(|s| {
            s.thinking = true;
            s.status_phrase = CLONING_PHRASE.to_string();
        });

        let created = self
            .backend
            .create_analysis_task(&cmd.repo_url, &self.default_branch, cmd.token.as_deref())
            .await;

        match created {
            Ok(task_id) => {
                tracing::info!(task_id = %task_id, repo_url = %cmd.repo_url, "analysis task created");
                self.store.set_active_task(Some(task_id.clone()));
                self.events.publish(SessionEvent::TaskCreated {
                    task_id: task_id.clone(),
                });
                let content = task_created_message(&task_id, cmd.token.is_some());
                self.update(|s| s.messages.push(ChatMessage::agent(content)));
                SubmitOutcome::TaskStarted(task_id)
            }
            Err(source) => {
                tracing::error!(repo_url = %cmd.repo_url, error = %source, "analysis task creation failed");
                let err = DispatchError::TaskCreationFailed {
                    repo_url: cmd.repo_url,
                    source,
                };
                self.events.publish(SessionEvent::Failed(err.clone()));
                SubmitOutcome::TaskCreationFailed(err)
            }
        }
    }

    async fn dispatch_chat(&self, text: &str) -> SubmitOutcome {
        self.update(|s| {
            s.thinking = true;
            s.status_phrase = THINKING_PHRASE.to_string();
        });

        match self.backend.send_chat_message(text).await {
            Ok(reply) => {
                self.update(|s| s.messages.push(ChatMessage::agent(reply)));
                SubmitOutcome::Replied
            }
            Err(source) => {
                tracing::warn!(error = %source, "chat request failed, answering with fallback");
                let err = DispatchError::ChatFailed(source);
                self.update(|s| s.messages.push(ChatMessage::agent(CHAT_FALLBACK)));
                self.events.publish(SessionEvent::Failed(err.clone()));
                SubmitOutcome::Fallback(err)
            }
        }
    }

    pub fn set_pending_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|s| s.pending_input = text);
    }

    /// Submit whatever is in the pending input buffer.
    pub async fn submit_pending(&mut self) -> SubmitOutcome {
        let input = self.state_tx.borrow().pending_input.clone();
        self.submit(&input).await
    }

    /// Start over with a single greeting. The active task and the log feed
    /// are not touched.
    pub fn reset(&self) {
        self.state_tx.send_replace(ConversationSnapshot::fresh());
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.state_tx.borrow().clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state_tx.borrow().messages.clone()
    }

    pub fn is_thinking(&self) -> bool {
        self.state_tx.borrow().thinking
    }

    pub fn status_phrase(&self) -> String {
        self.state_tx.borrow().status_phrase.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.state_tx.subscribe()
    }
}

fn task_created_message(task_id: &TaskId, has_token: bool) -> String {
    let auth = if has_token {
        "- **Token Provided:** I will attempt to push changes back to the repository."
    } else {
        "- **No Token:** I will only perform a local environment analysis."
    };
    format!(
        "### Repository Analysis Initiated\n\n\
         I've detected a GitHub repository and started the automated analysis process.\n\n\
         **Task Details:**\n\
         - **ID:** `{task_id}`\n\
         - **Status:** Queued\n\n\
         **Authentication:**\n\
         {auth}\n\n\
         ---\n\
         *You can monitor the progress in real-time using the deployment logs and timeline.*"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_message_mentions_push_access_with_token() {
        let msg = task_created_message(&TaskId::from("abc"), true);
        assert!(msg.starts_with("### Repository Analysis Initiated"));
        assert!(msg.contains("`abc`"));
        assert!(msg.contains("Queued"));
        assert!(msg.contains("push changes back"));
        assert!(!msg.contains("local environment analysis"));
    }

    #[test]
    fn task_message_without_token_is_local_only() {
        let msg = task_created_message(&TaskId::from("abc"), false);
        assert!(msg.contains("local environment analysis"));
        assert!(!msg.contains("push changes back"));
    }

    #[test]
    fn fresh_snapshot_has_one_greeting() {
        let snap = ConversationSnapshot::fresh();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].content, GREETING);
        assert!(!snap.thinking);
        assert_eq!(snap.status_phrase, IDLE_PHRASE);
    }
}
