//! Shared helpers for unit tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::client::ClientHandle;
use crate::error::DeliveryError;
use crate::message::Message;
use crate::types::ClientId;

/// Client handle that records every pushed message
///
/// Pushes start failing after `fail()`, simulating a dropped connection.
pub(crate) struct RecordingHandle {
    id: ClientId,
    failing: AtomicBool,
    delivered: mpsc::UnboundedSender<Message>,
}

impl RecordingHandle {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Message>) {
        Self::with_id(ClientId::new())
    }

    pub(crate) fn with_id(id: ClientId) -> (Arc<Self>, mpsc::UnboundedReceiver<Message>) {
        let (delivered, rx) = mpsc::unbounded_channel();
        let handle = Arc::new(Self {
            id,
            failing: AtomicBool::new(false),
            delivered,
        });
        (handle, rx)
    }

    pub(crate) fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClientHandle for RecordingHandle {
    fn id(&self) -> ClientId {
        self.id
    }

    async fn push(&self, message: &Message) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Failed("simulated failure".to_string()));
        }
        self.delivered
            .send(message.clone())
            .map_err(|_| DeliveryError::Disconnected)
    }
}

/// Wait for the next delivered message, failing the test after one second
pub(crate) async fn recv_message(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("delivery channel closed")
}
