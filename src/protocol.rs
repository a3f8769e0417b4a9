//! Wire protocol definitions
//!
//! JSON-based bidirectional frame protocol using Serde's tagged enum
//! for type-safe serialization/deserialization.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::message::{Message, SYSTEM_SENDER};

/// Client → Server frame
///
/// All frames from client to server. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Register under a display name
    Login { name: String },
    /// Leave the chat
    Logout,
    /// Broadcast text to everyone logged in
    Send { text: String },
    /// Ask for the names of everyone logged in
    List,
}

/// Server → Client frame
///
/// All frames from server to client. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Connection successful, client ID issued
    Connected { client_id: String },
    /// A broadcast chat message
    Message { sender: String, text: String },
    /// Reply to `list`
    Names { names: Vec<String> },
    /// Error occurred
    Error { code: ErrorCode, message: String },
}

impl ServerFrame {
    /// A message frame carrying a server-generated text
    pub fn system(text: impl Into<String>) -> Self {
        ServerFrame::Message {
            sender: SYSTEM_SENDER.to_string(),
            text: text.into(),
        }
    }
}

impl From<&Message> for ServerFrame {
    fn from(message: &Message) -> Self {
        ServerFrame::Message {
            sender: message.sender().to_string(),
            text: message.text().to_string(),
        }
    }
}

/// Error codes for ServerFrame::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Empty name or empty text
    InvalidArgument,
    /// Send attempted before login
    NotLoggedIn,
    /// Invalid frame format
    InvalidMessage,
}

/// Convert AppError to ServerFrame for client notification
impl From<AppError> for ServerFrame {
    fn from(err: AppError) -> Self {
        let (code, message) = match &err {
            AppError::InvalidArgument(reason) => (ErrorCode::InvalidArgument, reason.clone()),
            AppError::NotLoggedIn => (ErrorCode::NotLoggedIn, "You are not logged in".to_string()),
            AppError::Json(e) => {
                (ErrorCode::InvalidMessage, format!("Invalid message format: {}", e))
            }
            // Fatal errors are not typically converted (connection closes)
            _ => (ErrorCode::InvalidMessage, "Internal error".to_string()),
        };
        ServerFrame::Error { code, message }
    }
}
