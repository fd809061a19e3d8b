//! Live log consumer.
//!
//! Opens the backend's log feed once at start, parses every payload into a
//! [`LogEntry`] and keeps the newest `capacity` entries. A failed or closed
//! feed is not retried on its own; [`LogStreamConsumer::reconnect`] is the
//! explicit way back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ad_client::DeploymentBackend;
use ad_core::log_record::{parse_log_record, LogBuffer};
use ad_core::types::LogEntry;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::DispatchError;
use crate::event_bus::{EventBus, SessionEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    Closed,
}

struct Shared {
    backend: Arc<dyn DeploymentBackend>,
    events: EventBus,
    buffer_tx: watch::Sender<LogBuffer>,
    state_tx: watch::Sender<StreamState>,
    // Bumped on every (re)connect and close; readers holding an older value
    // must not touch the buffer.
    connection: AtomicU64,
}

impl Shared {
    fn is_current(&self, connection: u64) -> bool {
        self.connection.load(Ordering::SeqCst) == connection
    }

    fn set_state(&self, connection: u64, state: StreamState) {
        if self.is_current(connection) {
            self.state_tx.send_replace(state);
        }
    }
}

/// Failure and close events are published before the state turns
/// [`StreamState::Closed`], so a caller that sees `Closed` can read them.
pub struct LogStreamConsumer {
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl LogStreamConsumer {
    /// Open the feed and start consuming it. Must be called inside a tokio
    /// runtime.
    pub fn start(backend: Arc<dyn DeploymentBackend>, capacity: usize, events: EventBus) -> Self {
        let (buffer_tx, _) = watch::channel(LogBuffer::new(capacity));
        let (state_tx, _) = watch::channel(StreamState::Connecting);
        let consumer = Self {
            shared: Arc::new(Shared {
                backend,
                events,
                buffer_tx,
                state_tx,
                connection: AtomicU64::new(0),
            }),
            reader: Mutex::new(None),
        };
        consumer.connect();
        consumer
    }

    fn connect(&self) {
        let connection = self.shared.connection.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.state_tx.send_replace(StreamState::Connecting);
        let handle = tokio::spawn(read_feed(self.shared.clone(), connection));

        let mut reader = self.reader.lock().expect("log reader lock poisoned");
        if let Some(old) = reader.replace(handle) {
            old.abort();
        }
    }

    /// Tear down the current connection and open a new one. Buffered entries
    /// are kept.
    pub fn reconnect(&self) {
        tracing::info!("reconnecting log stream");
        self.connect();
    }

    /// Close the connection for good. No reconnect is attempted.
    pub fn close(&self) {
        self.shared.connection.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.reader.lock().expect("log reader lock poisoned").take() {
            handle.abort();
        }
        self.shared.state_tx.send_replace(StreamState::Closed);
    }

    /// Empty the buffer. The connection is left alone.
    pub fn clear(&self) {
        self.shared.buffer_tx.send_modify(LogBuffer::clear);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.shared.buffer_tx.borrow().to_vec()
    }

    pub fn subscribe(&self) -> watch::Receiver<LogBuffer> {
        self.shared.buffer_tx.subscribe()
    }

    pub fn state(&self) -> StreamState {
        *self.shared.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<StreamState> {
        self.shared.state_tx.subscribe()
    }
}

impl Drop for LogStreamConsumer {
    fn drop(&mut self) {
        if let Ok(mut reader) = self.reader.lock() {
            if let Some(handle) = reader.take() {
                handle.abort();
            }
        }
    }
}

async fn read_feed(shared: Arc<Shared>, connection: u64) {
    let mut stream = match shared.backend.open_log_stream().await {
        Ok(stream) => stream,
        Err(e) => {
            if shared.is_current(connection) {
                tracing::warn!(error = %e, "could not open log stream");
                shared.events.publish(SessionEvent::Failed(DispatchError::LogStream(e)));
                shared.set_state(connection, StreamState::Closed);
            }
            return;
        }
    };

    if !shared.is_current(connection) {
        return;
    }
    shared.set_state(connection, StreamState::Open);
    shared.events.publish(SessionEvent::LogStreamOpened);
    tracing::info!("log stream open");

    while let Some(item) = stream.next().await {
        match item {
            Ok(raw) => {
                let Ok(record) = parse_log_record(&raw) else {
                    tracing::trace!(raw = %raw, "dropping malformed log record");
                    continue;
                };
                let pushed = shared.buffer_tx.send_if_modified(|buffer| {
                    if !shared.is_current(connection) {
                        return false;
                    }
                    buffer.push(record);
                    true
                });
                if !pushed {
                    return;
                }
            }
            Err(e) => {
                if shared.is_current(connection) {
                    tracing::warn!(error = %e, "log stream failed");
                    shared.events.publish(SessionEvent::Failed(DispatchError::LogStream(e)));
                    shared.set_state(connection, StreamState::Closed);
                }
                return;
            }
        }
    }

    if shared.is_current(connection) {
        tracing::info!("log stream closed by server");
        shared.events.publish(SessionEvent::LogStreamClosed);
        shared.set_state(connection, StreamState::Closed);
    }
}
