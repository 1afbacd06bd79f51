//! Paced single-consumer queue worker.
//!
//! Some deployments hand item identifiers to a worker through a store
//! list instead of calling the engines inline. The worker pops at a fixed
//! pacing interval derived from a per-minute throughput; a failed handler
//! puts the identifier back at the head of the queue, a failed pop is
//! logged and skipped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tideway_store::StoreBackend;
use tideway_core::TidewayResult;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Handler invoked for each popped identifier.
#[async_trait]
pub trait QueueProcessor: Send + Sync {
    async fn process(&self, rid: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Store-list event queue with a paced worker.
pub struct EventQueue<B> {
    backend: Arc<B>,
    name: String,
    throughput_per_minute: u64,
}

impl<B> Clone for EventQueue<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            name: self.name.clone(),
            throughput_per_minute: self.throughput_per_minute,
        }
    }
}

impl<B: StoreBackend> EventQueue<B> {
    /// Build a queue draining `throughput_per_minute` identifiers per
    /// minute (at least one).
    pub fn new(backend: Arc<B>, name: impl Into<String>, throughput_per_minute: u64) -> Self {
        Self {
            backend,
            name: name.into(),
            throughput_per_minute: throughput_per_minute.max(1),
        }
    }

    /// Seconds between pops.
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(60 / self.throughput_per_minute)
    }

    /// Enqueue an identifier at the head of the queue.
    pub async fn push(&self, rid: &str) -> TidewayResult<()> {
        self.backend.lpush(&self.name, rid).await?;
        Ok(())
    }

    /// Run the single-consumer worker until `shutdown_rx` flips to true.
    ///
    /// One identifier is popped per pacing tick. Pop failures are logged
    /// and skipped; handler failures re-enqueue the identifier at the
    /// head of the queue.
    pub async fn worker<P: QueueProcessor>(self, processor: P, mut shutdown_rx: watch::Receiver<bool>) {
        let mut tick = interval(self.pacing());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            queue = %self.name,
            pacing_secs = self.pacing().as_secs(),
            "event queue worker started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(queue = %self.name, "event queue worker shutting down");
                        break;
                    }
                }

                _ = tick.tick() => {
                    self.drain_one(&processor).await;
                }
            }
        }
    }

    async fn drain_one<P: QueueProcessor>(&self, processor: &P) {
        let rid = match self.backend.rpop(&self.name).await {
            Ok(Some(rid)) => rid,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(queue = %self.name, error = %e, "queue pop failed");
                return;
            }
        };

        if let Err(e) = processor.process(&rid).await {
            tracing::error!(queue = %self.name, rid = %rid, error = %e, "handler failed, re-enqueueing");
            if let Err(push_err) = self.backend.lpush(&self.name, &rid).await {
                tracing::error!(
                    queue = %self.name,
                    rid = %rid,
                    error = %push_err,
                    "failed to re-enqueue"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tideway_store::MemoryStore;

    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl Recorder {
        fn new(fail_on: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                fail_on: fail_on.map(str::to_string),
            })
        }
    }

    #[async_trait]
    impl QueueProcessor for Arc<Recorder> {
        async fn process(&self, rid: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.seen.lock().unwrap().push(rid.to_string());
            if self.fail_on.as_deref() == Some(rid) {
                return Err("handler rejected".into());
            }
            Ok(())
        }
    }

    #[test]
    fn test_pacing() {
        let backend = Arc::new(MemoryStore::new());
        let queue = EventQueue::new(backend, "q", 12);
        assert_eq!(queue.pacing(), Duration::from_secs(5));

        let backend = Arc::new(MemoryStore::new());
        let queue = EventQueue::new(backend, "q", 0);
        assert_eq!(queue.pacing(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_drains_in_order() {
        let backend = Arc::new(MemoryStore::new());
        let queue = EventQueue::new(Arc::clone(&backend), "q", 60);
        queue.push("a").await.unwrap();
        queue.push("b").await.unwrap();

        let recorder = Recorder::new(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(queue.clone().worker(Arc::clone(&recorder), shutdown_rx));

        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(backend.rpop("q").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_requeues_on_handler_failure() {
        let backend = Arc::new(MemoryStore::new());
        let queue = EventQueue::new(Arc::clone(&backend), "q", 60);
        queue.push("x").await.unwrap();

        let recorder = Recorder::new(Some("x"));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(queue.clone().worker(Arc::clone(&recorder), shutdown_rx));

        tokio::time::sleep(Duration::from_secs(3)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        // Handled (and failed) at least once, and back on the queue.
        assert!(!recorder.seen.lock().unwrap().is_empty());
        assert_eq!(backend.rpop("q").await.unwrap(), Some("x".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_survives_pop_failure() {
        let backend = Arc::new(MemoryStore::new());
        let queue = EventQueue::new(Arc::clone(&backend), "q", 60);
        backend.set_fail_all(true);

        let recorder = Recorder::new(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(queue.clone().worker(Arc::clone(&recorder), shutdown_rx));

        tokio::time::sleep(Duration::from_secs(3)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(recorder.seen.lock().unwrap().is_empty());
    }
}
