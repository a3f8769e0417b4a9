//! Client handle definitions
//!
//! A `ClientHandle` is the only capability the registry needs from a
//! connected client: a way to push one message to it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::message::Message;
use crate::protocol::ServerFrame;
use crate::types::ClientId;

/// Push target for one connected client
///
/// `push` may block on I/O. It is only ever called from that client's
/// own delivery worker, so a slow client never stalls anyone else.
#[async_trait]
pub trait ClientHandle: Send + Sync + 'static {
    /// Identity used as the registry key
    fn id(&self) -> ClientId;

    /// Deliver one message to the client
    async fn push(&self, message: &Message) -> Result<(), DeliveryError>;
}

/// Client handle backed by a connection's outbound frame channel
///
/// The WebSocket transport owns the receiving end and writes each frame
/// to the socket. Once that writer stops, every push fails.
#[derive(Debug, Clone)]
pub struct ChannelClientHandle {
    /// Unique identifier for this client
    id: ClientId,
    /// Server → Client frame channel
    sender: mpsc::Sender<ServerFrame>,
}

impl ChannelClientHandle {
    /// Create a new handle with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerFrame>) -> Self {
        Self { id, sender }
    }
}

#[async_trait]
impl ClientHandle for ChannelClientHandle {
    fn id(&self) -> ClientId {
        self.id
    }

    async fn push(&self, message: &Message) -> Result<(), DeliveryError> {
        self.sender
            .send(ServerFrame::from(message))
            .await
            .map_err(|_| DeliveryError::Disconnected)
    }
}
