use std::sync::{Arc, Mutex};

use ad_core::types::TaskId;

use crate::error::DispatchError;

/// Notable things that happened in a session, including the failures that
/// the chat view does not render.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    TaskCreated { task_id: TaskId },
    /// The poller saw a terminal status message and stopped its timer.
    PollStopped { task_id: TaskId, message: String },
    LogStreamOpened,
    /// The server ended the log feed cleanly.
    LogStreamClosed,
    Failed(DispatchError),
}

/// A broadcast-style event bus built on top of flume channels.
///
/// Each call to [`subscribe`](EventBus::subscribe) creates a new receiver
/// that will receive all events published after the subscription was
/// created. Cloning is cheap; clones share subscribers.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Vec<flume::Sender<SessionEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> flume::Receiver<SessionEvent> {
        let (tx, rx) = flume::unbounded();
        let mut senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.push(tx);
        rx
    }

    /// Publish an event to all current subscribers.
    ///
    /// Disconnected subscribers (whose receivers have been dropped) are
    /// pruned.
    pub fn publish(&self, event: SessionEvent) {
        let mut senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        let senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_events() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(SessionEvent::LogStreamOpened);

        assert!(matches!(a.try_recv(), Ok(SessionEvent::LogStreamOpened)));
        assert!(matches!(b.try_recv(), Ok(SessionEvent::LogStreamOpened)));
    }

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let bus = EventBus::new();
        bus.publish(SessionEvent::LogStreamClosed);
        let rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(SessionEvent::LogStreamOpened);
        assert_eq!(bus.subscriber_count(), 1);
        drop(keep);
    }
}
