//! # Task Handler Registry
//!
//! Maps task-type identifiers to ordered lists of handlers, plus the payload
//! decoder for each registered type. Registration is append-only and happens
//! during startup wiring; there is no removal operation, and the registry
//! lives for the process lifetime as an explicit object injected into the
//! dispatcher.
//!
//! Handlers are type-erased at the registration seam: the typed
//! [`TaskHandler`] is wrapped in a closure that downcasts the shared decoded
//! task back to its concrete type, so delivery code works entirely in terms
//! of task-type strings and opaque handles.

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use super::task::{IdempotencySpec, Task, TaskHandler};
use crate::error::{RelayError, Result};

/// Shared, type-erased decoded task instance
type ErasedTask = Arc<dyn Any + Send + Sync>;

/// Type-erased handler invocation
type ErasedHandler = Arc<dyn Fn(ErasedTask) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Payload decoder for one task type
type DecodeFn =
    Arc<dyn Fn(Value) -> std::result::Result<DecodedTask, serde_json::Error> + Send + Sync>;

/// A payload decoded into a live task instance, with its idempotency
/// capability already queried
pub(crate) struct DecodedTask {
    pub(crate) task: ErasedTask,
    pub(crate) idempotency: Option<IdempotencySpec>,
}

/// Snapshot of one registered task type, taken at delivery time
pub(crate) struct RegisteredTaskType {
    pub(crate) decode: DecodeFn,
    pub(crate) handlers: Vec<ErasedHandler>,
}

struct TypeEntry {
    task_type_id: TypeId,
    decode: DecodeFn,
    handlers: Vec<ErasedHandler>,
}

/// Append-only, insertion-ordered handler registration per task type
pub struct TaskHandlerRegistry {
    entries: RwLock<HashMap<String, TypeEntry>>,
}

impl TaskHandlerRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Append `handler` to the ordered list for `T::TASK_TYPE`, registering
    /// the type's payload decoder on first use. Returns whether this was the
    /// first registration for the type.
    ///
    /// Two different `Task` implementations must never share a task-type id;
    /// a collision is rejected as a wiring error.
    pub fn attach<T, H>(&self, handler: H) -> Result<bool>
    where
        T: Task,
        H: TaskHandler<T> + 'static,
    {
        let mut entries = self.entries.write();
        let entry = entries
            .entry(T::TASK_TYPE.to_string())
            .or_insert_with(|| TypeEntry {
                task_type_id: TypeId::of::<T>(),
                decode: decode_fn::<T>(),
                handlers: Vec::new(),
            });

        if entry.task_type_id != TypeId::of::<T>() {
            return Err(RelayError::configuration(format!(
                "task type id '{}' is already registered by a different Task implementation",
                T::TASK_TYPE
            )));
        }

        let first_registration = entry.handlers.is_empty();
        entry.handlers.push(erase_handler(handler));
        Ok(first_registration)
    }

    /// Task-type ids with at least one registered handler
    pub fn registered_types(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of handlers registered for `task_type`
    pub fn handler_count(&self, task_type: &str) -> usize {
        self.entries
            .read()
            .get(task_type)
            .map_or(0, |entry| entry.handlers.len())
    }

    /// Decoder and handlers for `task_type`, in registration order, or
    /// `None` for an unknown type
    pub(crate) fn entry(&self, task_type: &str) -> Option<RegisteredTaskType> {
        self.entries.read().get(task_type).map(|entry| RegisteredTaskType {
            decode: Arc::clone(&entry.decode),
            handlers: entry.handlers.clone(),
        })
    }
}

impl Default for TaskHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_fn<T: Task>() -> DecodeFn {
    Arc::new(|payload: Value| {
        let task: T = serde_json::from_value(payload)?;
        let idempotency = task.idempotency();
        Ok(DecodedTask {
            task: Arc::new(task),
            idempotency,
        })
    })
}

fn erase_handler<T, H>(handler: H) -> ErasedHandler
where
    T: Task,
    H: TaskHandler<T> + 'static,
{
    let handler = Arc::new(handler);
    Arc::new(move |task: ErasedTask| {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            match task.downcast::<T>() {
                Ok(task) => handler.handle(task.as_ref()).await,
                Err(_) => Err(anyhow::anyhow!(
                    "task instance does not match handler task type '{}'",
                    T::TASK_TYPE
                )),
            }
        })
    })
}
