//! Shared builders and recording doubles for the task dispatch tests.

#![allow(dead_code)] // Not every test file uses every helper

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use relay_core::auth::StaticSecretProvider;
use relay_core::cache::InMemoryCacheStrategy;
use relay_core::config::RelayConfig;
use relay_core::messaging::{InMemoryQueueBackend, MessagingResult, QueueBackend, QueueSubscriber};
use relay_core::tasks::{IdempotencySpec, Task, TaskDispatcher, TaskEnvelope, TaskHandler, TaskSigner};

pub const TEST_SECRET: &str = "s3cr3t";

/// Idempotent task from the normative scenario: one welcome email per user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendWelcomeEmail {
    #[serde(rename = "userId")]
    pub user_id: u64,
}

impl Task for SendWelcomeEmail {
    const TASK_TYPE: &'static str = "send_welcome_email";

    fn idempotency(&self) -> Option<IdempotencySpec> {
        Some(IdempotencySpec::new(format!("user:{}", self.user_id), 3600))
    }
}

/// Plain task without the idempotency capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPageView {
    pub path: String,
}

impl Task for RecordPageView {
    const TASK_TYPE: &'static str = "record_page_view";
}

/// Task whose payload serializes to `null` rather than an object
#[derive(Debug, Serialize, Deserialize)]
pub struct UnitPing;

impl Task for UnitPing {
    const TASK_TYPE: &'static str = "unit_ping";
}

/// Handler that records every invocation and can be configured to fail or
/// stall, in the recording-mock style of the orchestration test doubles
pub struct RecordingHandler {
    pub label: String,
    calls: Arc<AtomicU32>,
    invocations: Arc<Mutex<Vec<String>>>,
    failures_before_success: u32,
    delay: Option<Duration>,
}

impl RecordingHandler {
    pub fn new(label: impl Into<String>, invocations: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label: label.into(),
            calls: Arc::new(AtomicU32::new(0)),
            invocations,
            failures_before_success: 0,
            delay: None,
        }
    }

    /// Fail the first `count` invocations, then succeed
    pub fn failing_first(mut self, count: u32) -> Self {
        self.failures_before_success = count;
        self
    }

    /// Sleep before completing, to widen race windows in concurrency tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared call counter, usable after the handler is moved into the
    /// dispatcher
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }

    async fn record(&self) -> anyhow::Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.invocations.lock().push(self.label.clone());
        if call < self.failures_before_success {
            anyhow::bail!("simulated handler failure in '{}'", self.label);
        }
        Ok(())
    }
}

#[async_trait]
impl TaskHandler<SendWelcomeEmail> for RecordingHandler {
    async fn handle(&self, _task: &SendWelcomeEmail) -> anyhow::Result<()> {
        self.record().await
    }
}

#[async_trait]
impl TaskHandler<RecordPageView> for RecordingHandler {
    async fn handle(&self, _task: &RecordPageView) -> anyhow::Result<()> {
        self.record().await
    }
}

/// Queue backend double that records every enqueue for wire-format
/// assertions while forwarding to an in-memory backend
pub struct RecordingQueueBackend {
    inner: InMemoryQueueBackend,
    enqueues: Mutex<Vec<(String, Value)>>,
}

impl RecordingQueueBackend {
    pub fn new() -> Self {
        Self {
            inner: InMemoryQueueBackend::new(),
            enqueues: Mutex::new(Vec::new()),
        }
    }

    pub fn enqueues(&self) -> Vec<(String, Value)> {
        self.enqueues.lock().clone()
    }

    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.inner.wait_until_idle(timeout).await
    }
}

#[async_trait]
impl QueueBackend for RecordingQueueBackend {
    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    async fn enqueue_async(&self, hook_name: &str, args: Value) -> MessagingResult<()> {
        self.enqueues
            .lock()
            .push((hook_name.to_string(), args.clone()));
        self.inner.enqueue_async(hook_name, args).await
    }

    async fn subscribe(
        &self,
        hook_name: &str,
        subscriber: Arc<dyn QueueSubscriber>,
    ) -> MessagingResult<()> {
        self.inner.subscribe(hook_name, subscriber).await
    }
}

/// Fully wired dispatcher over in-memory collaborators
pub struct TestHarness {
    pub dispatcher: TaskDispatcher,
    pub queue: Arc<InMemoryQueueBackend>,
    pub cache: Arc<InMemoryCacheStrategy>,
    pub invocations: Arc<Mutex<Vec<String>>>,
}

impl TestHarness {
    pub fn new() -> Self {
        let queue = Arc::new(InMemoryQueueBackend::new());
        let cache = Arc::new(InMemoryCacheStrategy::new());
        let dispatcher = TaskDispatcher::new(
            RelayConfig::default(),
            Arc::clone(&queue) as Arc<dyn QueueBackend>,
            Arc::clone(&cache) as _,
            Arc::new(StaticSecretProvider::new(TEST_SECRET)),
        );

        Self {
            dispatcher,
            queue,
            cache,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A recording handler sharing this harness's invocation log
    pub fn handler(&self, label: &str) -> RecordingHandler {
        RecordingHandler::new(label, Arc::clone(&self.invocations))
    }

    /// A signer keyed with the harness secret, for crafting wire envelopes
    pub fn signer(&self) -> TaskSigner {
        TaskSigner::new(Arc::new(StaticSecretProvider::new(TEST_SECRET)))
    }

    /// A correctly signed envelope for `task`, as the dispatcher would
    /// produce it
    pub fn envelope_for<T: Task>(&self, task: &T) -> TaskEnvelope {
        let payload = serde_json::to_value(task).expect("test task payload must serialize");
        let signature = self
            .signer()
            .sign(T::TASK_TYPE, &payload)
            .expect("test signing must succeed");
        TaskEnvelope::new(T::TASK_TYPE, payload, signature)
    }

    pub fn invocation_log(&self) -> Vec<String> {
        self.invocations.lock().clone()
    }
}
