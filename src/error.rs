//! Error types for the chat server
//!
//! Defines application-level errors and per-client delivery errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (reported back to the client as an error frame).
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry actor is gone (fatal - internal channel broken)
    #[error("Chat server closed")]
    ServerClosed,

    /// Empty login name or empty message field
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Sending requires a prior login on this connection
    #[error("Not logged in")]
    NotLoggedIn,
}

impl AppError {
    /// Whether the error should end the connection instead of being
    /// reported to the client
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::WebSocket(_) | AppError::Io(_) | AppError::ServerClosed
        )
    }
}

/// Failure to push a message to one client
///
/// Raised by a `ClientHandle`. Handled entirely inside that client's
/// delivery worker, which then asks the registry to drop the client.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The client's connection is gone
    #[error("Client disconnected")]
    Disconnected,

    /// Any other transport failure
    #[error("Delivery failed: {0}")]
    Failed(String),
}
