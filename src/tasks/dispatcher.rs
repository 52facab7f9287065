//! # Task Dispatcher
//!
//! The orchestrator of the task subsystem. Producer-side, `dispatch`
//! serializes, signs, and enqueues a task. Delivery-side, `deliver` runs the
//! state machine:
//!
//! ```text
//! Received -> Verified -> {Deduplicated | LockAcquired} -> Executing
//!          -> {Done | Failed} -> Released
//! ```
//!
//! The signature check happens before the payload is deserialized into a
//! domain type, the idempotency lock is released on every exit path after
//! acquisition, and expected outcomes (duplicate, already running, already
//! done) are reported as [`DeliveryOutcome`] values rather than errors.
//!
//! `TaskDispatcher` is a cheap clonable handle over shared internals; the
//! shared core doubles as the queue backend's delivery subscriber.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::envelope::{hook_name, TaskEnvelope};
use super::idempotency::{IdempotencyId, IdempotencyStore};
use super::registry::{DecodedTask, RegisteredTaskType, TaskHandlerRegistry};
use super::signer::TaskSigner;
use super::task::{Task, TaskHandler};
use crate::auth::SecretProvider;
use crate::cache::CacheStrategy;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::messaging::{QueueBackend, QueueSubscriber};

/// Result of one delivery. Only `Executed` ran handlers; everything else is
/// an expected, routine short-circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// All handlers ran to completion
    Executed,
    /// Duplicate delivery of an already-completed idempotent task
    AlreadyDone,
    /// Another delivery currently holds the lock for this identity
    AlreadyRunning,
    /// The task type has no registered handlers; dropped silently
    DroppedUnknownType,
    /// The signature did not match the recomputed value; dropped and logged
    DroppedInvalidSignature,
    /// Authentic payload that does not deserialize into the task type;
    /// dropped and logged
    DroppedMalformedPayload,
}

/// Lock held for the duration of one idempotent execution
struct HeldLock {
    id: IdempotencyId,
    done_ttl_seconds: u64,
}

struct DispatcherCore {
    config: RelayConfig,
    queue: Arc<dyn QueueBackend>,
    registry: TaskHandlerRegistry,
    signer: TaskSigner,
    idempotency: IdempotencyStore,
}

/// Producer and delivery orchestrator for asynchronous tasks.
///
/// Cloning is cheap and shares all state; a single dispatcher is wired at
/// startup and handed to producers and the queue backend alike.
#[derive(Clone)]
pub struct TaskDispatcher {
    core: Arc<DispatcherCore>,
}

impl TaskDispatcher {
    /// Wire a dispatcher from its collaborators, building the signer,
    /// registry, and idempotency store from the configuration
    pub fn new(
        config: RelayConfig,
        queue: Arc<dyn QueueBackend>,
        cache: Arc<dyn CacheStrategy>,
        secrets: Arc<dyn SecretProvider>,
    ) -> Self {
        let signer = TaskSigner::new(secrets);
        let idempotency = IdempotencyStore::new(cache, config.idempotency.key_prefix.clone());
        Self::with_components(config, queue, TaskHandlerRegistry::new(), signer, idempotency)
    }

    /// Wire a dispatcher from fully constructed components
    pub fn with_components(
        config: RelayConfig,
        queue: Arc<dyn QueueBackend>,
        registry: TaskHandlerRegistry,
        signer: TaskSigner,
        idempotency: IdempotencyStore,
    ) -> Self {
        Self {
            core: Arc::new(DispatcherCore {
                config,
                queue,
                registry,
                signer,
                idempotency,
            }),
        }
    }

    /// The handler registry backing this dispatcher
    pub fn registry(&self) -> &TaskHandlerRegistry {
        &self.core.registry
    }

    /// The idempotency store backing this dispatcher
    pub fn idempotency(&self) -> &IdempotencyStore {
        &self.core.idempotency
    }

    /// Serialize, sign, and enqueue `task` for asynchronous at-least-once
    /// delivery. Returns once the queue entry exists; no local state is
    /// mutated. No ordering guarantee relative to other dispatches.
    pub async fn dispatch<T: Task>(&self, task: &T) -> Result<()> {
        self.core.dispatch(task).await
    }

    /// Register `handler` for `T`, subscribing the delivery hook on the
    /// first registration for that type. Later registrations add handlers;
    /// they never replace prior ones.
    pub async fn attach<T, H>(&self, handler: H) -> Result<()>
    where
        T: Task,
        H: TaskHandler<T> + 'static,
    {
        let first_registration = self.core.registry.attach::<T, H>(handler)?;

        if first_registration {
            let hook = hook_name(&self.core.config.namespace, T::TASK_TYPE);
            self.core
                .queue
                .subscribe(&hook, Arc::clone(&self.core) as Arc<dyn QueueSubscriber>)
                .await
                .map_err(|e| RelayError::subscription_failed(hook.clone(), e.to_string()))?;
            info!(task_type = T::TASK_TYPE, hook_name = %hook, "Subscribed delivery hook");
        }

        Ok(())
    }

    /// Delivery entrypoint invoked by the queue backend.
    ///
    /// Expected short-circuits return `Ok` with the describing outcome;
    /// `Err` is reserved for handler failures and store faults, both of
    /// which the backend may answer with redelivery. The idempotency lock,
    /// once acquired, is released before this method returns on every path.
    pub async fn deliver(&self, envelope: TaskEnvelope) -> Result<DeliveryOutcome> {
        self.core.deliver(envelope).await
    }
}

impl DispatcherCore {
    async fn dispatch<T: Task>(&self, task: &T) -> Result<()> {
        if !self.queue.is_available() {
            return Err(RelayError::dispatch_failed(
                "queue backend is not available",
            ));
        }

        let payload = serde_json::to_value(task).map_err(|e| {
            RelayError::dispatch_failed(format!(
                "task payload for '{}' is not JSON-encodable: {e}",
                T::TASK_TYPE
            ))
        })?;
        if !payload.is_object() {
            return Err(RelayError::dispatch_failed(format!(
                "task payload for '{}' must serialize to a JSON object",
                T::TASK_TYPE
            )));
        }

        let signature = self
            .signer
            .sign(T::TASK_TYPE, &payload)
            .map_err(|e| RelayError::dispatch_failed(format!("task signing failed: {e}")))?;

        let hook = hook_name(&self.config.namespace, T::TASK_TYPE);
        let envelope = TaskEnvelope::new(T::TASK_TYPE, payload, signature);
        let args = serde_json::to_value(&envelope).map_err(|e| {
            RelayError::dispatch_failed(format!("envelope serialization failed: {e}"))
        })?;

        self.queue.enqueue_async(&hook, args).await.map_err(|e| {
            RelayError::dispatch_failed(format!("queue backend rejected the enqueue: {e}"))
        })?;

        debug!(task_type = T::TASK_TYPE, hook_name = %hook, "📤 Task enqueued for async delivery");
        Ok(())
    }

    async fn deliver(&self, envelope: TaskEnvelope) -> Result<DeliveryOutcome> {
        let TaskEnvelope {
            task_type,
            payload,
            signature,
        } = envelope;

        let Some(registered) = self.registry.entry(&task_type) else {
            debug!(task_type = %task_type, "Dropping delivery for unknown task type");
            return Ok(DeliveryOutcome::DroppedUnknownType);
        };

        if !self.signer.verify(&task_type, &payload, &signature)? {
            warn!(task_type = %task_type, "Invalid task signature for {task_type}");
            return Ok(DeliveryOutcome::DroppedInvalidSignature);
        }

        let decoded = match (registered.decode)(payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(task_type = %task_type, "Task construction failed for authentic payload: {e}");
                return Ok(DeliveryOutcome::DroppedMalformedPayload);
            }
        };

        let mut held_lock: Option<HeldLock> = None;
        if let Some(spec) = &decoded.idempotency {
            let id = IdempotencyId::derive(&task_type, &spec.key);

            if self
                .idempotency
                .is_done(&id)
                .await
                .map_err(|e| RelayError::store("is_done", e.to_string()))?
            {
                debug!(task_type = %task_type, identity = %id, "Task already completed, skipping duplicate delivery");
                return Ok(DeliveryOutcome::AlreadyDone);
            }

            let lock_ttl = spec
                .lock_ttl_seconds
                .unwrap_or(self.config.tasks.default_lock_ttl_seconds);
            let acquired = self
                .idempotency
                .acquire(&id, lock_ttl)
                .await
                .map_err(|e| RelayError::store("acquire", e.to_string()))?;
            if !acquired {
                debug!(task_type = %task_type, identity = %id, "Another delivery holds the lock, skipping");
                return Ok(DeliveryOutcome::AlreadyRunning);
            }

            held_lock = Some(HeldLock {
                id,
                done_ttl_seconds: spec.done_ttl_seconds,
            });
        }

        let execution = self.run_handlers(&task_type, &registered, &decoded).await;

        // Determine the final result first; the release below must run on
        // every path once the lock was acquired.
        let result = match execution {
            Ok(()) => match &held_lock {
                Some(lock) => self
                    .idempotency
                    .mark_done(&lock.id, lock.done_ttl_seconds)
                    .await
                    .map(|()| DeliveryOutcome::Executed)
                    .map_err(|e| RelayError::store("mark_done", e.to_string())),
                None => Ok(DeliveryOutcome::Executed),
            },
            Err(e) => Err(e),
        };

        if let Some(lock) = held_lock {
            if let Err(e) = self.idempotency.release(&lock.id).await {
                // The lock TTL still bounds the damage; never mask the
                // handler result with a release failure.
                error!(task_type = %task_type, identity = %lock.id, "Failed to release idempotency lock: {e}");
            }
        }

        if matches!(result, Ok(DeliveryOutcome::Executed)) {
            debug!(task_type = %task_type, "✅ Task executed");
        }
        result
    }

    async fn run_handlers(
        &self,
        task_type: &str,
        registered: &RegisteredTaskType,
        decoded: &DecodedTask,
    ) -> Result<()> {
        for (index, handler) in registered.handlers.iter().enumerate() {
            if let Err(e) = handler(Arc::clone(&decoded.task)).await {
                error!(
                    task_type = %task_type,
                    handler_index = index,
                    "Task handler failed: {e:#}"
                );
                return Err(RelayError::handler_failed(task_type, e));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl QueueSubscriber for DispatcherCore {
    async fn on_message(
        &self,
        hook_name: &str,
        args: Value,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let envelope: TaskEnvelope = match serde_json::from_value(args) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(hook_name = %hook_name, "Dropping queue entry that is not a task envelope: {e}");
                return Ok(());
            }
        };

        match self.deliver(envelope).await {
            Ok(outcome) => {
                debug!(hook_name = %hook_name, outcome = ?outcome, "Delivery completed");
                Ok(())
            }
            Err(e) => Err(Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }
}
