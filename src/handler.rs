//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake,
//! frame parsing, and bidirectional communication with the ChatService.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::client::{ChannelClientHandle, ClientHandle};
use crate::error::AppError;
use crate::message::Message;
use crate::protocol::{ClientFrame, ServerFrame};
use crate::service::ChatService;
use crate::types::ClientId;

/// Capacity of each connection's outbound frame channel
const OUTBOUND_BUFFER: usize = 32;

/// Handle a new TCP connection
///
/// Accepts the WebSocket handshake only on `/<service_name>`, then relays
/// frames between the socket and the chat service until either side
/// closes. The client is logged out when the connection ends.
pub async fn handle_connection(
    stream: TcpStream,
    service: ChatService,
    service_name: Arc<str>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let endpoint = format!("/{}", service_name);
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        if req.uri().path() == endpoint {
            Ok(resp)
        } else {
            Err(not_found(req.uri().path()))
        }
    })
    .await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Generate client ID
    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    // Channel for server -> client frames, shared by pushes and replies
    let (frame_tx, mut frame_rx) = mpsc::channel::<ServerFrame>(OUTBOUND_BUFFER);

    // Send connection success frame
    let connected = ServerFrame::Connected {
        client_id: client_id.to_string(),
    };
    let json = serde_json::to_string(&connected)?;
    ws_sender.send(WsMessage::Text(json.into())).await?;

    let mut session = Session {
        handle: Arc::new(ChannelClientHandle::new(client_id, frame_tx.clone())),
        name: None,
        service: service.clone(),
    };

    // Spawn read task (WebSocket -> ChatService)
    let read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(WsMessage::Text(text)) => {
                    let reply = match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(frame) => session.dispatch(frame).await,
                        Err(e) => {
                            warn!("Invalid JSON from {}: {}", client_id, e);
                            Err(AppError::Json(e))
                        }
                    };

                    let reply = match reply {
                        Ok(reply) => reply,
                        Err(e) if e.is_fatal() => {
                            error!("Ending session for {}: {}", client_id, e);
                            break;
                        }
                        Err(e) => Some(ServerFrame::from(e)),
                    };

                    if let Some(reply) = reply {
                        if frame_tx.send(reply).await.is_err() {
                            debug!("Writer closed, ending read task for {}", client_id);
                            break;
                        }
                    }
                }
                Ok(WsMessage::Close(_)) => {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                Ok(WsMessage::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", client_id);
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", client_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (ServerFrame -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            match serde_json::to_string(&frame) {
                Ok(json) => {
                    if ws_sender.send(WsMessage::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize frame: {}", e);
                }
            }
        }
        debug!("Write task ended for client");

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete; the other must not outlive the logout
    join_first(read_task, write_task, client_id).await;

    let _ = service.logout(client_id).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}

/// Wait until the read or write task ends, then abort the other one
async fn join_first(
    mut read_task: JoinHandle<()>,
    mut write_task: JoinHandle<()>,
    client_id: ClientId,
) {
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
            write_task.abort();
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
            read_task.abort();
        }
    }
}

/// Per-connection login state
struct Session {
    handle: Arc<ChannelClientHandle>,
    /// Display name once logged in
    name: Option<String>,
    service: ChatService,
}

impl Session {
    /// Apply one client frame, returning the direct reply if any
    async fn dispatch(&mut self, frame: ClientFrame) -> Result<Option<ServerFrame>, AppError> {
        match frame {
            ClientFrame::Login { name } => {
                let handle: Arc<dyn ClientHandle> = self.handle.clone();
                self.service.login(handle, name.clone()).await?;
                self.name = Some(name);
                Ok(None)
            }
            ClientFrame::Logout => {
                self.service.logout(self.handle.id()).await?;
                self.name = None;
                Ok(None)
            }
            ClientFrame::Send { text } => {
                let name = self.name.as_deref().ok_or(AppError::NotLoggedIn)?;
                let message = Message::new(name, text)?;
                self.service.broadcast(message).await?;
                Ok(None)
            }
            ClientFrame::List => {
                let names = self.service.list().await?;
                Ok(Some(ServerFrame::Names { names }))
            }
        }
    }
}

/// Handshake rejection for an unknown endpoint
fn not_found(path: &str) -> ErrorResponse {
    warn!("Rejecting WebSocket handshake on unknown path {}", path);
    let mut resp = ErrorResponse::new(Some(format!("No chat service at {}", path)));
    *resp.status_mut() = StatusCode::NOT_FOUND;
    resp
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    /// A task that never finishes; `dropped` resolves once it is aborted
    fn stuck_task() -> (JoinHandle<()>, oneshot::Receiver<()>) {
        let (guard, dropped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        (task, dropped)
    }

    #[tokio::test]
    async fn test_reader_aborted_when_writer_ends() {
        let (read_task, reader_dropped) = stuck_task();
        let write_task = tokio::spawn(async {});

        join_first(read_task, write_task, ClientId::new()).await;

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), reader_dropped)
            .await
            .expect("read task still running");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_writer_aborted_when_reader_ends() {
        let (write_task, writer_dropped) = stuck_task();
        let read_task = tokio::spawn(async {});

        join_first(read_task, write_task, ClientId::new()).await;

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), writer_dropped)
            .await
            .expect("write task still running");
        assert!(result.is_err());
    }
}
