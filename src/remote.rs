//! Client-side proxy for a remote chat server
//!
//! Calls on `RemoteServer` never block on the network. Outbound frames go
//! through a queue drained by one writer task, and inbound frames arrive
//! on a receiver handed out by `connect`. If the connection is lost
//! without the user logging out, a local "Server is not responding."
//! message is injected into the inbound stream, at most once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::protocol::{ClientFrame, ServerFrame};

/// Text injected when the connection to the server is lost
pub const NOT_RESPONDING: &str = "Server is not responding.";

/// Connection state shared by the proxy and its socket tasks
#[derive(Debug, Default)]
struct Link {
    /// Set once the user logged out or dropped the proxy
    closing: AtomicBool,
    /// Set once the loss was reported
    reported: AtomicBool,
}

impl Link {
    /// Tell the user the server is gone, unless already told
    fn report_lost(&self, inbound: &mpsc::UnboundedSender<ServerFrame>) {
        if !self.reported.swap(true, Ordering::AcqRel) {
            let _ = inbound.send(ServerFrame::system(NOT_RESPONDING));
        }
    }

    /// The server ended the connection cleanly
    ///
    /// Only a loss if the user did not ask to leave.
    fn report_ended(&self, inbound: &mpsc::UnboundedSender<ServerFrame>) {
        if !self.closing.load(Ordering::Acquire) {
            self.report_lost(inbound);
        }
    }
}

/// Handle to a connected chat server
#[derive(Debug, Clone)]
pub struct RemoteServer {
    outbound: mpsc::UnboundedSender<ClientFrame>,
    link: Arc<Link>,
}

impl RemoteServer {
    /// Connect to `url` (e.g. `ws://127.0.0.1:5051/SimpleChatService`)
    ///
    /// Returns the proxy and the stream of frames sent by the server.
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerFrame>), AppError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        info!("Connected to {}", url);

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientFrame>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel::<ServerFrame>();

        let link = Arc::new(Link::default());

        // Writer: drains the outbound queue in order
        let writer_inbound = inbound_tx.clone();
        let writer_link = Arc::clone(&link);
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize frame: {}", e);
                        continue;
                    }
                };
                if let Err(e) = ws_sender.send(WsMessage::Text(json.into())).await {
                    warn!("Sending to server failed: {}", e);
                    writer_link.report_lost(&writer_inbound);
                    return;
                }
            }
            // Every proxy handle is gone; the close is ours
            writer_link.closing.store(true, Ordering::Release);
            let _ = ws_sender.close().await;
            debug!("Outbound writer ended");
        });

        // Reader: forwards server frames to the caller
        let reader_link = Arc::clone(&link);
        tokio::spawn(async move {
            while let Some(msg_result) = ws_receiver.next().await {
                match msg_result {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(frame) => {
                            if inbound_tx.send(frame).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid frame from server: {}", e),
                    },
                    Ok(WsMessage::Close(_)) => {
                        debug!("Server closed the connection");
                        reader_link.report_ended(&inbound_tx);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Connection to server lost: {}", e);
                        reader_link.report_lost(&inbound_tx);
                        break;
                    }
                }
            }
            // The stream can also end without a close frame
            reader_link.report_ended(&inbound_tx);
            debug!("Inbound reader ended");
        });

        Ok((Self { outbound, link }, inbound))
    }

    pub fn login(&self, name: impl Into<String>) -> Result<(), AppError> {
        self.enqueue(ClientFrame::Login { name: name.into() })
    }

    /// Log out; the server closing the connection afterwards is expected
    pub fn logout(&self) -> Result<(), AppError> {
        self.link.closing.store(true, Ordering::Release);
        self.enqueue(ClientFrame::Logout)
    }

    /// Broadcast `text` under the name used at login
    pub fn send(&self, text: impl Into<String>) -> Result<(), AppError> {
        self.enqueue(ClientFrame::Send { text: text.into() })
    }

    /// Request the name list; the reply arrives as `ServerFrame::Names`
    pub fn list(&self) -> Result<(), AppError> {
        self.enqueue(ClientFrame::List)
    }

    fn enqueue(&self, frame: ClientFrame) -> Result<(), AppError> {
        self.outbound
            .send(frame)
            .map_err(|_| AppError::ServerClosed)
    }
}
