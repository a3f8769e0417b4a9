//! Per-client delivery channel
//!
//! Each logged-in client gets a private FIFO queue and one worker task
//! draining it into the client's handle. Broadcasting only appends to
//! the queue, so a slow or broken client never holds up the others.
//!
//! When a push fails the worker stops itself and reports an `Eviction`
//! to the registry instead of calling back into it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::ClientHandle;
use crate::message::Message;
use crate::types::{ClientId, SessionId};

/// "Remove me" report sent by a worker whose push failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub client_id: ClientId,
    pub session: SessionId,
}

/// Lifecycle of a channel's worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created but not started yet; messages are queued
    Idle,
    Running,
    /// Terminal
    Stopped,
}

/// Outbound queue and worker for one subscriber
pub struct DeliveryChannel {
    handle: Arc<dyn ClientHandle>,
    session: SessionId,
    /// Queue producer; `None` once stopped
    sender: Option<mpsc::UnboundedSender<Arc<Message>>>,
    /// Queue consumer, handed to the worker on start
    receiver: Option<mpsc::UnboundedReceiver<Arc<Message>>>,
    stopped: Arc<AtomicBool>,
}

impl DeliveryChannel {
    /// Create an idle channel for the given handle and login session
    pub fn new(handle: Arc<dyn ClientHandle>, session: SessionId) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            handle,
            session,
            sender: Some(sender),
            receiver: Some(receiver),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.handle.id()
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn state(&self) -> WorkerState {
        if self.stopped.load(Ordering::Acquire) {
            WorkerState::Stopped
        } else if self.receiver.is_some() {
            WorkerState::Idle
        } else {
            WorkerState::Running
        }
    }

    /// Append a message to the tail of the queue
    ///
    /// Never blocks and never fails. Messages enqueued after the channel
    /// stopped are dropped.
    pub fn enqueue(&self, message: Arc<Message>) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        if let Some(sender) = &self.sender {
            // Only fails if the worker already exited
            let _ = sender.send(message);
        }
    }

    /// Spawn the delivery worker on the current tokio runtime
    ///
    /// Failures are reported on `evictions`. Does nothing if the worker was
    /// already started or the channel is stopped.
    pub fn start(&mut self, evictions: mpsc::UnboundedSender<Eviction>) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let Some(receiver) = self.receiver.take() else {
            return;
        };

        let worker = Worker {
            handle: Arc::clone(&self.handle),
            session: self.session,
            receiver,
            stopped: Arc::clone(&self.stopped),
            evictions,
        };
        tokio::spawn(worker.run());
    }

    /// Stop the channel; safe to call more than once
    ///
    /// The worker exits at its next queue check. A push already in
    /// flight is left to complete or fail on its own.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        // Closing the queue wakes a worker waiting on an empty queue
        self.sender = None;
        self.receiver = None;
    }
}

impl Drop for DeliveryChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The task half of a delivery channel
struct Worker {
    handle: Arc<dyn ClientHandle>,
    session: SessionId,
    receiver: mpsc::UnboundedReceiver<Arc<Message>>,
    stopped: Arc<AtomicBool>,
    evictions: mpsc::UnboundedSender<Eviction>,
}

impl Worker {
    async fn run(mut self) {
        let client_id = self.handle.id();

        while let Some(message) = self.receiver.recv().await {
            if self.stopped.load(Ordering::Acquire) {
                break;
            }

            if let Err(e) = self.handle.push(&message).await {
                warn!("Delivery to client {} failed: {}", client_id, e);
                self.stopped.store(true, Ordering::Release);
                let _ = self.evictions.send(Eviction {
                    client_id,
                    session: self.session,
                });
                return;
            }
        }

        debug!("Delivery worker ended for {}", client_id);
    }
}
