//! Broadcast WebSocket Chat Server Library
//!
//! Clients log in under a display name, send text messages, and receive
//! every message broadcast to all currently logged-in clients.
//!
//! # Architecture
//! - `ChatServer` is the client registry, an actor owning every subscriber
//! - `ChatService` is the cloneable handle callers use to reach it
//! - Each subscriber has a `DeliveryChannel`: a private FIFO queue drained
//!   by its own task, so one slow or broken client never delays the others
//! - A worker whose push fails reports an `Eviction` and the registry
//!   logs that client out
//! - `handle_connection` adapts a WebSocket connection to the service, and
//!   `RemoteServer` is the matching client-side proxy
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chat_broadcast::{handle_connection, ChatService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:5051").await.unwrap();
//!     let service = ChatService::spawn(256);
//!     let name: Arc<str> = Arc::from("SimpleChatService");
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, service.clone(), name.clone()));
//!     }
//! }
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod protocol;
pub mod remote;
pub mod server;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for convenience
pub use channel::{DeliveryChannel, Eviction, WorkerState};
pub use client::{ChannelClientHandle, ClientHandle};
pub use config::Config;
pub use error::{AppError, DeliveryError};
pub use handler::handle_connection;
pub use message::{Message, SYSTEM_SENDER};
pub use protocol::{ClientFrame, ErrorCode, ServerFrame};
pub use remote::RemoteServer;
pub use server::{ChatServer, ServerCommand};
pub use service::ChatService;
pub use types::{ClientId, SessionId};
