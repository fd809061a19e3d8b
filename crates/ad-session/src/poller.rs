//! Status poller.
//!
//! One supervisor task follows the store's active task. For each task it
//! runs a single polling loop: fetch immediately, then once per interval,
//! until the status message turns terminal or the active task changes. A
//! change of active task drops the running loop before the next one starts,
//! so there is never more than one timer alive.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ad_client::DeploymentBackend;
use ad_core::pipeline::is_terminal_message;
use ad_core::types::TaskId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::DispatchError;
use crate::event_bus::{EventBus, SessionEvent};
use crate::store::DeploymentStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerState {
    /// No active task; no network activity.
    Idle,
    Polling(TaskId),
    /// The task reached a terminal message. Its last steps stay displayed.
    Dormant(TaskId),
}

enum LoopExit {
    Terminal,
    Superseded,
}

/// Counts running polling loops; decremented when a loop is dropped.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct PollContext {
    store: DeploymentStore,
    backend: Arc<dyn DeploymentBackend>,
    events: EventBus,
    interval: Duration,
    live: Arc<AtomicUsize>,
}

pub struct StatusPoller {
    state_rx: watch::Receiver<PollerState>,
    live: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl StatusPoller {
    /// Start following `store`. Must be called inside a tokio runtime.
    pub fn spawn(
        store: DeploymentStore,
        backend: Arc<dyn DeploymentBackend>,
        interval: Duration,
        events: EventBus,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(PollerState::Idle);
        let live = Arc::new(AtomicUsize::new(0));
        let ctx = PollContext {
            store,
            backend,
            events,
            interval,
            live: live.clone(),
        };
        let handle = tokio::spawn(supervise(ctx, state_tx));
        Self {
            state_rx,
            live,
            handle,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollerState> {
        self.state_rx.clone()
    }

    /// Number of polling loops currently running (0 or 1).
    pub fn live_loops(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn supervise(ctx: PollContext, state_tx: watch::Sender<PollerState>) {
    let mut active_rx = ctx.store.subscribe_active();

    loop {
        let active = active_rx.borrow_and_update().clone();

        if let Some(task_id) = active.task_id {
            state_tx.send_replace(PollerState::Polling(task_id.clone()));
            tracing::info!(task_id = %task_id, "polling task status");

            let exit = tokio::select! {
                biased;
                changed = active_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    // Loop dropped; pick up the new active task right away.
                    continue;
                }
                exit = poll_task(&ctx, &task_id, active.generation) => exit,
            };

            match exit {
                LoopExit::Terminal => {
                    state_tx.send_replace(PollerState::Dormant(task_id));
                }
                LoopExit::Superseded => continue,
            }
        } else {
            state_tx.send_replace(PollerState::Idle);
        }

        if active_rx.changed().await.is_err() {
            return;
        }
    }
}

async fn poll_task(ctx: &PollContext, task_id: &TaskId, generation: u64) -> LoopExit {
    let _live = LiveGuard::new(&ctx.live);
    let mut ticker = tokio::time::interval(ctx.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match ctx.backend.task_status(task_id).await {
            Ok(status) => {
                let message = status.current_message.clone();
                if !ctx.store.apply_status(generation, task_id, status) {
                    return LoopExit::Superseded;
                }
                if is_terminal_message(&message) {
                    tracing::info!(task_id = %task_id, message = %message, "task reached terminal status, polling stopped");
                    ctx.events.publish(SessionEvent::PollStopped {
                        task_id: task_id.clone(),
                        message,
                    });
                    return LoopExit::Terminal;
                }
            }
            Err(source) => {
                tracing::warn!(task_id = %task_id, error = %source, "status poll failed, keeping previous steps");
                ctx.events.publish(SessionEvent::Failed(DispatchError::PollFailed {
                    task_id: task_id.clone(),
                    source,
                }));
            }
        }
    }
}
