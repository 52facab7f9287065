//! # Task Envelope
//!
//! The wire format of one queue entry: the task-type id, the JSON payload,
//! and the hex signature binding the two together. The envelope travels under
//! a hook name derived from the namespace and task type; nothing else is
//! carried, and nothing here is persisted beyond the queue entry itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::system::HOOK_INFIX;

/// Queue hook name for a task type: `"<namespace>_task_<task_type>"`
pub fn hook_name(namespace: &str, task_type: &str) -> String {
    format!("{namespace}{HOOK_INFIX}{task_type}")
}

/// One queue entry: payload, task-type id, and signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    /// Stable task-type identifier
    pub task_type: String,

    /// JSON object payload produced by the task's serialization
    pub payload: Value,

    /// Hex-encoded HMAC over the task type and canonical payload
    pub signature: String,
}

impl TaskEnvelope {
    pub fn new(task_type: impl Into<String>, payload: Value, signature: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            payload,
            signature: signature.into(),
        }
    }

    /// The hook this envelope is enqueued under
    pub fn hook_name(&self, namespace: &str) -> String {
        hook_name(namespace, &self.task_type)
    }
}
