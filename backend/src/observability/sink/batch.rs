//! Background batching for remote sinks.
//!
//! Records are queued without waiting; a worker task delivers them in
//! batches when the batch fills, when the flush interval ticks, or when a
//! caller asks for a flush. A full queue drops the record instead of
//! blocking the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use crate::observability::error::LoggerError;

/// Delivers one batch of encoded records to a remote service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BatchTransport: Send + Sync + 'static {
    /// Send `batch` in a single request.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Delivery`] when the remote rejects the batch.
    async fn deliver(&self, batch: Vec<Value>) -> Result<(), LoggerError>;
}

/// Batching limits for a remote sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Deliver as soon as this many records are pending.
    pub max_batch: usize,
    /// Deliver pending records at least this often.
    pub flush_interval: Duration,
    /// Records queued beyond this are dropped.
    pub capacity: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            max_batch: 50,
            flush_interval: Duration::from_secs(2),
            capacity: 4096,
        }
    }
}

enum Command {
    Entry(Value),
    Flush(oneshot::Sender<Result<(), LoggerError>>),
}

/// Handle to a running batch worker.
///
/// Dropping the handle lets the worker deliver what is pending and exit.
#[derive(Debug, Clone)]
pub struct BatchQueue {
    sink: &'static str,
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry(_) => f.write_str("Entry"),
            Self::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl BatchQueue {
    /// Spawn the worker on the current Tokio runtime.
    ///
    /// Must be called from within a runtime.
    pub fn spawn<T: BatchTransport>(sink: &'static str, transport: T, policy: BatchPolicy) -> Self {
        let (tx, rx) = mpsc::channel(policy.capacity.max(1));
        tokio::spawn(run_worker(sink, transport, policy, rx));
        Self { sink, tx }
    }

    /// Queue one encoded record without waiting.
    pub fn push(&self, entry: Value) {
        if let Err(error) = self.tx.try_send(Command::Entry(entry)) {
            warn!(sink = self.sink, %error, "log record dropped");
        }
    }

    /// Deliver everything queued so far and wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns the delivery failure, or [`LoggerError::Closed`] when the
    /// worker has stopped.
    pub async fn flush(&self) -> Result<(), LoggerError> {
        let (ack, outcome) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack))
            .await
            .map_err(|_| LoggerError::closed(self.sink))?;
        outcome.await.map_err(|_| LoggerError::closed(self.sink))?
    }
}

async fn run_worker<T: BatchTransport>(
    sink: &'static str,
    transport: T,
    policy: BatchPolicy,
    mut rx: mpsc::Receiver<Command>,
) {
    let max_batch = policy.max_batch.max(1);
    let mut pending: Vec<Value> = Vec::with_capacity(max_batch);
    let mut ticker = interval(policy.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Entry(entry)) => {
                    pending.push(entry);
                    if pending.len() >= max_batch {
                        deliver_or_drop(sink, &transport, &mut pending).await;
                    }
                }
                Some(Command::Flush(ack)) => {
                    let outcome = deliver(&transport, &mut pending).await;
                    if ack.send(outcome).is_err() {
                        debug!(sink, "flush requester went away");
                    }
                }
                None => {
                    deliver_or_drop(sink, &transport, &mut pending).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                deliver_or_drop(sink, &transport, &mut pending).await;
            }
        }
    }
}

async fn deliver<T: BatchTransport>(
    transport: &T,
    pending: &mut Vec<Value>,
) -> Result<(), LoggerError> {
    if pending.is_empty() {
        return Ok(());
    }
    let batch = std::mem::take(pending);
    transport.deliver(batch).await
}

async fn deliver_or_drop<T: BatchTransport>(
    sink: &'static str,
    transport: &T,
    pending: &mut Vec<Value>,
) {
    let size = pending.len();
    if let Err(error) = deliver(transport, pending).await {
        warn!(sink, %error, dropped = size, "log batch dropped");
    }
}
