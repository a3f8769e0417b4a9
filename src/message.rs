//! Chat message entity

use std::fmt;

use crate::error::AppError;

/// Sender name used for messages generated by the server itself
pub const SYSTEM_SENDER: &str = "SYSTEM";

/// An immutable (sender, text) pair
///
/// Both fields are non-empty. Messages are compared by value and are
/// shared between delivery queues behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    sender: String,
    text: String,
}

impl Message {
    /// Create a message, rejecting an empty sender or text
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Result<Self, AppError> {
        let sender = sender.into();
        let text = text.into();

        if sender.is_empty() {
            return Err(AppError::InvalidArgument("sender must not be empty".to_string()));
        }
        if text.is_empty() {
            return Err(AppError::InvalidArgument("text must not be empty".to_string()));
        }

        Ok(Self { sender, text })
    }

    /// Create a message sent by the server
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            sender: SYSTEM_SENDER.to_string(),
            text: text.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the server generated this message
    pub fn is_system(&self) -> bool {
        self.sender == SYSTEM_SENDER
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_accessors() {
        let msg = Message::new("Alice", "hi").unwrap();
        assert_eq!(msg.sender(), "Alice");
        assert_eq!(msg.text(), "hi");
        assert!(!msg.is_system());
        assert_eq!(msg.to_string(), "Alice: hi");
    }

    #[test]
    fn test_message_rejects_empty_fields() {
        assert!(matches!(
            Message::new("", "hi"),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            Message::new("Alice", ""),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_system_message() {
        let msg = Message::system("Alice Signed on.");
        assert!(msg.is_system());
        assert_eq!(msg.sender(), "SYSTEM");
        assert_eq!(msg, Message::new("SYSTEM", "Alice Signed on.").unwrap());
    }
}
