//! # Messaging Error Types
//!
//! Error handling for the queue backend port, using thiserror for structured
//! error types instead of `Box<dyn Error>` patterns.

use thiserror::Error;

/// Queue backend error types
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Queue backend unavailable: {message}")]
    BackendUnavailable { message: String },

    #[error("Queue operation failed: {hook_name}: {operation}: {message}")]
    QueueOperation {
        hook_name: String,
        operation: String,
        message: String,
    },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Subscription failed for hook '{hook_name}': {message}")]
    Subscription { hook_name: String, message: String },
}

impl MessagingError {
    /// Create a backend-unavailable error
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Create a queue operation error
    pub fn queue_operation(
        hook_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            hook_name: hook_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    /// Create a subscription error
    pub fn subscription(hook_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subscription {
            hook_name: hook_name.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        MessagingError::message_serialization(err.to_string())
    }
}

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;
