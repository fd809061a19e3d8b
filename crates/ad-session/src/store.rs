//! The single owner of "which task is active" and of the visible pipeline.
//!
//! Writers go through [`DeploymentStore::set_active_task`]; readers subscribe
//! to watch channels. Every change of active task bumps a generation number,
//! and a status result is only applied when it carries the current
//! generation, so a response that belongs to a superseded task can never
//! overwrite the new one.

use std::sync::{Arc, Mutex};

use ad_client::TaskStatus;
use ad_core::pipeline::{default_steps, PipelineSnapshot};
use ad_core::types::TaskId;
use tokio::sync::watch;

/// Status message shown between task creation and the first status reply.
pub const QUEUED_MESSAGE: &str = "Task queued";

/// Value published on every change of the active task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTask {
    pub task_id: Option<TaskId>,
    pub generation: u64,
}

struct Inner {
    // Serialises generation checks against active-task writes.
    lock: Mutex<u64>,
    active_tx: watch::Sender<ActiveTask>,
    snapshot_tx: watch::Sender<PipelineSnapshot>,
}

#[derive(Clone)]
pub struct DeploymentStore {
    inner: Arc<Inner>,
}

impl DeploymentStore {
    pub fn new() -> Self {
        let (active_tx, _) = watch::channel(ActiveTask {
            task_id: None,
            generation: 0,
        });
        let (snapshot_tx, _) = watch::channel(PipelineSnapshot::idle());
        Self {
            inner: Arc::new(Inner {
                lock: Mutex::new(0),
                active_tx,
                snapshot_tx,
            }),
        }
    }

    /// Replace the active task (last writer wins) and return the new
    /// generation.
    ///
    /// Clearing it restores the idle template. Switching to another task
    /// shows that task's template, all pending, until its first status reply.
    /// Setting the task that is already active changes nothing.
    pub fn set_active_task(&self, task_id: Option<TaskId>) -> u64 {
        let mut generation = self.inner.lock.lock().expect("store lock poisoned");
        if self.inner.active_tx.borrow().task_id == task_id {
            return *generation;
        }
        *generation += 1;

        let snapshot = match &task_id {
            None => PipelineSnapshot::idle(),
            Some(id) => PipelineSnapshot::for_task(id.clone(), default_steps(), QUEUED_MESSAGE),
        };
        tracing::debug!(task_id = ?task_id, generation = *generation, "active task changed");
        self.inner.snapshot_tx.send_replace(snapshot);
        self.inner.active_tx.send_replace(ActiveTask {
            task_id,
            generation: *generation,
        });
        *generation
    }

    pub fn clear_active_task(&self) {
        self.set_active_task(None);
    }

    pub fn active_task(&self) -> Option<TaskId> {
        self.inner.active_tx.borrow().task_id.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.active_tx.borrow().generation
    }

    pub fn subscribe_active(&self) -> watch::Receiver<ActiveTask> {
        self.inner.active_tx.subscribe()
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<PipelineSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Replace the whole pipeline with a status reply fetched under
    /// `generation`. Returns `false`, leaving the pipeline untouched, when
    /// the active task has changed since.
    pub fn apply_status(&self, generation: u64, task_id: &TaskId, status: TaskStatus) -> bool {
        let current = self.inner.lock.lock().expect("store lock poisoned");
        if *current != generation {
            return false;
        }
        self.inner.snapshot_tx.send_replace(PipelineSnapshot::for_task(
            task_id.clone(),
            status.steps,
            status.current_message,
        ));
        true
    }
}

impl Default for DeploymentStore {
    fn default() -> Self {
        Self::new()
    }
}
