//! # In-Memory Queue Backend
//!
//! Process-local [`QueueBackend`] for development and testing. Deliveries run
//! on spawned tokio tasks, so producers return as soon as the entry is
//! queued, and a failed delivery is redelivered a bounded number of times -
//! a small-scale stand-in for the host platform's at-least-once scheduler.
//!
//! One subscriber per hook; re-subscribing an already-subscribed hook is a
//! no-op. Entries enqueued before any subscriber exists are buffered and
//! drained on subscription.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::queue::{QueueBackend, QueueSubscriber};
use super::{MessagingError, MessagingResult};
use async_trait::async_trait;

const DEFAULT_MAX_REDELIVERIES: u32 = 3;
const DEFAULT_REDELIVERY_DELAY: Duration = Duration::from_millis(50);

/// In-memory queue backend with asynchronous, at-least-once delivery
pub struct InMemoryQueueBackend {
    subscribers: RwLock<HashMap<String, Arc<dyn QueueSubscriber>>>,
    pending: Mutex<HashMap<String, Vec<Value>>>,
    available: AtomicBool,
    in_flight: Arc<AtomicUsize>,
    max_redeliveries: u32,
    redelivery_delay: Duration,
}

impl InMemoryQueueBackend {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_redeliveries: DEFAULT_MAX_REDELIVERIES,
            redelivery_delay: DEFAULT_REDELIVERY_DELAY,
        }
    }

    /// Override the redelivery policy applied to failed deliveries
    pub fn with_redelivery_policy(mut self, max_redeliveries: u32, delay: Duration) -> Self {
        self.max_redeliveries = max_redeliveries;
        self.redelivery_delay = delay;
        self
    }

    /// Simulate backend outage for testing dispatch failure paths
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of deliveries currently executing or awaiting redelivery
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until no deliveries are in flight, up to `timeout`. Returns true
    /// if the backend went idle in time.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.in_flight() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    fn spawn_delivery(&self, hook_name: String, subscriber: Arc<dyn QueueSubscriber>, args: Value) {
        let in_flight = Arc::clone(&self.in_flight);
        let max_redeliveries = self.max_redeliveries;
        let redelivery_delay = self.redelivery_delay;

        in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let mut attempt: u32 = 0;
            loop {
                attempt += 1;
                match subscriber.on_message(&hook_name, args.clone()).await {
                    Ok(()) => break,
                    Err(e) if attempt <= max_redeliveries => {
                        warn!(
                            hook_name = %hook_name,
                            attempt = attempt,
                            "Delivery failed, redelivering: {e}"
                        );
                        tokio::time::sleep(redelivery_delay).await;
                    }
                    Err(e) => {
                        error!(
                            hook_name = %hook_name,
                            attempts = attempt,
                            "Delivery abandoned after exhausting redeliveries: {e}"
                        );
                        break;
                    }
                }
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

impl Default for InMemoryQueueBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueBackend for InMemoryQueueBackend {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn enqueue_async(&self, hook_name: &str, args: Value) -> MessagingResult<()> {
        if !self.is_available() {
            return Err(MessagingError::backend_unavailable(
                "in-memory queue backend is offline",
            ));
        }

        let subscriber = self.subscribers.read().get(hook_name).cloned();
        match subscriber {
            Some(subscriber) => {
                debug!(hook_name = %hook_name, "📤 Enqueued entry for async delivery");
                self.spawn_delivery(hook_name.to_string(), subscriber, args);
            }
            None => {
                debug!(hook_name = %hook_name, "Buffering entry for unsubscribed hook");
                self.pending
                    .lock()
                    .entry(hook_name.to_string())
                    .or_default()
                    .push(args);
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        hook_name: &str,
        subscriber: Arc<dyn QueueSubscriber>,
    ) -> MessagingResult<()> {
        {
            let mut subscribers = self.subscribers.write();
            if subscribers.contains_key(hook_name) {
                // Idempotent subscription: the first callback stays registered.
                return Ok(());
            }
            subscribers.insert(hook_name.to_string(), Arc::clone(&subscriber));
        }

        let buffered = self.pending.lock().remove(hook_name).unwrap_or_default();
        if !buffered.is_empty() {
            debug!(
                hook_name = %hook_name,
                count = buffered.len(),
                "Draining buffered entries to new subscriber"
            );
        }
        for args in buffered {
            self.spawn_delivery(hook_name.to_string(), Arc::clone(&subscriber), args);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;

    struct CountingSubscriber {
        calls: AtomicU32,
        failures_before_success: u32,
    }

    impl CountingSubscriber {
        fn new(failures_before_success: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_before_success,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QueueSubscriber for CountingSubscriber {
        async fn on_message(
            &self,
            _hook_name: &str,
            _args: Value,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                return Err("simulated delivery failure".into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_enqueue_delivers_to_subscriber() {
        let backend = InMemoryQueueBackend::new();
        let subscriber = Arc::new(CountingSubscriber::new(0));

        backend
            .subscribe("relay_task_x", subscriber.clone())
            .await
            .unwrap();
        backend
            .enqueue_async("relay_task_x", json!({"k": 1}))
            .await
            .unwrap();

        assert!(backend.wait_until_idle(Duration::from_secs(2)).await);
        assert_eq!(subscriber.calls(), 1);
    }

    #[tokio::test]
    async fn test_entries_buffered_until_subscription() {
        let backend = InMemoryQueueBackend::new();
        backend
            .enqueue_async("relay_task_x", json!({"k": 1}))
            .await
            .unwrap();

        let subscriber = Arc::new(CountingSubscriber::new(0));
        backend
            .subscribe("relay_task_x", subscriber.clone())
            .await
            .unwrap();

        assert!(backend.wait_until_idle(Duration::from_secs(2)).await);
        assert_eq!(subscriber.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_deliveries_are_redelivered() {
        let backend =
            InMemoryQueueBackend::new().with_redelivery_policy(3, Duration::from_millis(5));
        let subscriber = Arc::new(CountingSubscriber::new(2));

        backend
            .subscribe("relay_task_x", subscriber.clone())
            .await
            .unwrap();
        backend
            .enqueue_async("relay_task_x", json!({}))
            .await
            .unwrap();

        assert!(backend.wait_until_idle(Duration::from_secs(2)).await);
        assert_eq!(subscriber.calls(), 3, "two failures then one success");
    }

    #[tokio::test]
    async fn test_resubscription_is_a_no_op() {
        let backend = InMemoryQueueBackend::new();
        let first = Arc::new(CountingSubscriber::new(0));
        let second = Arc::new(CountingSubscriber::new(0));

        backend.subscribe("hook", first.clone()).await.unwrap();
        backend.subscribe("hook", second.clone()).await.unwrap();
        backend.enqueue_async("hook", json!({})).await.unwrap();

        assert!(backend.wait_until_idle(Duration::from_secs(2)).await);
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_offline_backend_rejects_enqueue() {
        let backend = InMemoryQueueBackend::new();
        backend.set_available(false);

        let result = backend.enqueue_async("hook", json!({})).await;
        assert!(matches!(
            result,
            Err(MessagingError::BackendUnavailable { .. })
        ));
    }
}
