//! # Relay Error Types
//!
//! Crate-wide error taxonomy for task dispatch and delivery, using thiserror
//! for structured error types instead of `Box<dyn Error>` patterns.
//!
//! Expected delivery outcomes (duplicate, already running, already done) are
//! not errors; they are reported as
//! [`DeliveryOutcome`](crate::tasks::DeliveryOutcome) values. Only failures a
//! caller or the queue backend must act on surface here.

use thiserror::Error;

/// Crate-wide error type for the task dispatch subsystem
#[derive(Error, Debug)]
pub enum RelayError {
    /// Producer-side dispatch failed: queue backend unavailable, payload not
    /// JSON-encodable as an object, or signing failed. Always synchronous to
    /// the caller of `dispatch`.
    #[error("Task dispatch failed: {message}")]
    DispatchFailed { message: String },

    /// A handler raised during delivery. Logged, then propagated after the
    /// idempotency lock is released so the queue backend's retry policy
    /// applies.
    #[error("Handler failed for task type '{task_type}': {source}")]
    HandlerFailed {
        task_type: String,
        #[source]
        source: anyhow::Error,
    },

    /// Subscribing the delivery hook with the queue backend failed during
    /// startup wiring.
    #[error("Subscription failed for hook '{hook_name}': {message}")]
    SubscriptionFailed { hook_name: String, message: String },

    /// The idempotency cache backend failed mid-delivery. Surfaced to the
    /// queue backend so redelivery applies.
    #[error("Idempotency store operation '{operation}' failed: {message}")]
    Store { operation: String, message: String },

    /// The signing secret could not be resolved.
    #[error("Secret resolution failed: {message}")]
    Secret { message: String },

    /// Configuration loading or validation failed.
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl RelayError {
    /// Create a dispatch failure
    pub fn dispatch_failed(message: impl Into<String>) -> Self {
        Self::DispatchFailed {
            message: message.into(),
        }
    }

    /// Create a handler failure for the given task type
    pub fn handler_failed(task_type: impl Into<String>, source: anyhow::Error) -> Self {
        Self::HandlerFailed {
            task_type: task_type.into(),
            source,
        }
    }

    /// Create a subscription failure for the given hook
    pub fn subscription_failed(hook_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SubscriptionFailed {
            hook_name: hook_name.into(),
            message: message.into(),
        }
    }

    /// Create an idempotency store failure
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a secret resolution failure
    pub fn secret(message: impl Into<String>) -> Self {
        Self::Secret {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<crate::auth::SecretError> for RelayError {
    fn from(err: crate::auth::SecretError) -> Self {
        RelayError::secret(err.to_string())
    }
}

impl From<crate::config::ConfigurationError> for RelayError {
    fn from(err: crate::config::ConfigurationError) -> Self {
        RelayError::configuration(err.to_string())
    }
}

/// Result type alias for task dispatch operations
pub type Result<T> = std::result::Result<T, RelayError>;
