//! Controller loop - turns trigger notifications into reconcile passes.
//!
//! Triggers are level based: a key queued several times before it is picked up
//! is reconciled once. Keys are processed one at a time.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::reconciler::Reconciler;
use crate::resource::{DESIRED_STATE_KIND, NamespacedName};
use crate::store::MemoryStore;

/// Controller loop settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Delay before re-running a pass that asked for requeue. Also the base of
    /// the error backoff.
    pub requeue_delay: Duration,
    /// Upper bound for the error backoff.
    pub max_backoff: Duration,
    /// Capacity of the trigger and retry channels.
    pub queue_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            requeue_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
            queue_capacity: 1024,
        }
    }
}

impl ControllerConfig {
    /// Delay before the next attempt after `failures` consecutive errors.
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.requeue_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

/// FIFO of keys with duplicate suppression.
#[derive(Debug, Default)]
struct WorkQueue {
    order: VecDeque<NamespacedName>,
    pending: HashSet<NamespacedName>,
}

impl WorkQueue {
    fn push(&mut self, target: NamespacedName) {
        if self.pending.insert(target.clone()) {
            self.order.push_back(target);
        }
    }

    fn pop(&mut self) -> Option<NamespacedName> {
        let target = self.order.pop_front()?;
        self.pending.remove(&target);
        Some(target)
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Drives a [`Reconciler`] from a stream of triggers.
pub struct Controller<R: ?Sized> {
    reconciler: Arc<R>,
    config: ControllerConfig,
}

impl<R> Controller<R>
where
    R: Reconciler + ?Sized + 'static,
{
    pub fn new(reconciler: Arc<R>, config: ControllerConfig) -> Self {
        Self { reconciler, config }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run until `cancel` fires, or until `triggers` is closed and the queue
    /// has drained. Retries still waiting for their delay are dropped on exit.
    pub async fn run(
        &self,
        mut triggers: mpsc::Receiver<NamespacedName>,
        cancel: CancellationToken,
    ) {
        let (retry_tx, mut retry_rx) = mpsc::channel(self.config.queue_capacity);
        let mut queue = WorkQueue::default();
        let mut failures: HashMap<NamespacedName, u32> = HashMap::new();
        let mut triggers_open = true;

        info!("Controller started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            // Collapse bursts before picking the next key
            while let Ok(target) = triggers.try_recv() {
                queue.push(target);
            }
            while let Ok(target) = retry_rx.try_recv() {
                queue.push(target);
            }

            if let Some(target) = queue.pop() {
                debug!(%target, queued = queue.len(), "Processing trigger");
                self.process(target, &mut failures, &retry_tx, &cancel).await;
                continue;
            }

            if !triggers_open {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                received = triggers.recv() => match received {
                    Some(target) => queue.push(target),
                    None => triggers_open = false,
                },
                Some(target) = retry_rx.recv() => queue.push(target),
            }
        }

        info!("Controller stopped");
    }

    async fn process(
        &self,
        target: NamespacedName,
        failures: &mut HashMap<NamespacedName, u32>,
        retry_tx: &mpsc::Sender<NamespacedName>,
        cancel: &CancellationToken,
    ) {
        match self.reconciler.reconcile(&target, cancel).await {
            Ok(result) if result.cancelled => {
                debug!(%target, "Reconcile pass cancelled");
            }
            Ok(result) => {
                failures.remove(&target);
                if result.requeue {
                    debug!(%target, delay = ?self.config.requeue_delay, "Requeue requested");
                    schedule(
                        target,
                        self.config.requeue_delay,
                        retry_tx.clone(),
                        cancel.clone(),
                    );
                }
            }
            Err(e) => {
                let count = failures.entry(target.clone()).or_insert(0);
                *count += 1;
                let delay = self.config.backoff(*count);
                error!(%target, failures = *count, ?delay, "Reconcile failed: {}", e);
                schedule(target, delay, retry_tx.clone(), cancel.clone());
            }
        }
    }
}

/// Re-enqueue `target` after `delay`, unless cancelled first.
fn schedule(
    target: NamespacedName,
    delay: Duration,
    retry_tx: mpsc::Sender<NamespacedName>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                let _ = retry_tx.send(target).await;
            }
        }
    });
}

/// Feed desired-state changes of `store` into `triggers`.
///
/// Every existing desired state is enqueued first. When the event stream lags,
/// all desired states are enqueued again since the missed keys are unknown.
pub async fn watch_store(
    store: Arc<MemoryStore>,
    triggers: mpsc::Sender<NamespacedName>,
    cancel: CancellationToken,
) {
    let mut events = store.subscribe();

    if enqueue_all(&store, &triggers).await.is_err() {
        return;
    }

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(event) => {
                if let Some(target) = event.desired_state_trigger() {
                    debug!(%target, event = event.kind(), "Desired state changed");
                    if triggers.send(target).await.is_err() {
                        break;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "Store watch lagged, re-listing desired states");
                if enqueue_all(&store, &triggers).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn enqueue_all(
    store: &MemoryStore,
    triggers: &mpsc::Sender<NamespacedName>,
) -> Result<(), mpsc::error::SendError<NamespacedName>> {
    for stored in store.list(DESIRED_STATE_KIND).await {
        let target = NamespacedName::new(stored.document.namespace(), stored.document.name());
        triggers.send(target).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::{BatchResult, ReconcileError};
    use crate::store::StoreError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Reconciler that replays scripted results and records calls.
    struct Scripted {
        calls: Mutex<Vec<NamespacedName>>,
        script: Mutex<VecDeque<Result<BatchResult, ReconcileError>>>,
    }

    impl Scripted {
        fn new(script: Vec<Result<BatchResult, ReconcileError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                script: Mutex::new(script.into()),
            })
        }

        fn calls(&self) -> Vec<NamespacedName> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Reconciler for Scripted {
        async fn reconcile(
            &self,
            target: &NamespacedName,
            _cancel: &CancellationToken,
        ) -> Result<BatchResult, ReconcileError> {
            self.calls.lock().unwrap().push(target.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(BatchResult::default()))
        }
    }

    fn requeue() -> BatchResult {
        BatchResult {
            requeue: true,
            ..Default::default()
        }
    }

    fn nn(name: &str) -> NamespacedName {
        NamespacedName::new("team-a", name)
    }

    async fn wait_for_calls(reconciler: &Scripted, n: usize) {
        for _ in 0..1000 {
            if reconciler.calls().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} calls, got {:?}", n, reconciler.calls());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = ControllerConfig {
            requeue_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
            queue_capacity: 8,
        };
        assert_eq!(config.backoff(1), Duration::from_secs(1));
        assert_eq!(config.backoff(2), Duration::from_secs(2));
        assert_eq!(config.backoff(3), Duration::from_secs(4));
        assert_eq!(config.backoff(5), Duration::from_secs(10));
        assert_eq!(config.backoff(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_work_queue_dedups() {
        let mut queue = WorkQueue::default();
        queue.push(nn("a"));
        queue.push(nn("b"));
        queue.push(nn("a"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(nn("a")));
        queue.push(nn("a"));
        assert_eq!(queue.pop(), Some(nn("b")));
        assert_eq!(queue.pop(), Some(nn("a")));
        assert_eq!(queue.pop(), None);
    }

    #[tokio::test]
    async fn test_duplicate_triggers_reconcile_once() {
        let reconciler = Scripted::new(vec![]);
        let controller = Controller::new(reconciler.clone(), ControllerConfig::default());
        let (tx, rx) = mpsc::channel(16);

        tx.send(nn("a")).await.unwrap();
        tx.send(nn("a")).await.unwrap();
        tx.send(nn("b")).await.unwrap();
        drop(tx);

        controller.run(rx, CancellationToken::new()).await;
        assert_eq!(reconciler.calls(), vec![nn("a"), nn("b")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requeue_runs_again() {
        let reconciler = Scripted::new(vec![Ok(requeue()), Ok(BatchResult::default())]);
        let controller = Arc::new(Controller::new(
            reconciler.clone(),
            ControllerConfig::default(),
        ));
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn({
            let controller = Arc::clone(&controller);
            let cancel = cancel.clone();
            async move { controller.run(rx, cancel).await }
        });

        tx.send(nn("a")).await.unwrap();
        wait_for_calls(&reconciler, 2).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(reconciler.calls(), vec![nn("a"), nn("a")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_retries_with_backoff() {
        let failure = || -> Result<BatchResult, ReconcileError> {
            Err(ReconcileError::OwnerRead {
                target: nn("a"),
                source: StoreError::Unavailable("down".into()),
            })
        };
        let reconciler = Scripted::new(vec![failure(), failure(), Ok(BatchResult::default())]);
        let controller = Arc::new(Controller::new(
            reconciler.clone(),
            ControllerConfig::default(),
        ));
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn({
            let controller = Arc::clone(&controller);
            let cancel = cancel.clone();
            async move { controller.run(rx, cancel).await }
        });

        let started = tokio::time::Instant::now();
        tx.send(nn("a")).await.unwrap();
        wait_for_calls(&reconciler, 3).await;
        // 1s then 2s of backoff
        assert!(started.elapsed() >= Duration::from_secs(3));
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_watch_store_enqueues_existing_and_new() {
        use crate::document::Document;
        use crate::resource::DesiredState;
        use crate::store::ResourceStore;

        let store = Arc::new(MemoryStore::new());
        store
            .create(DesiredState::new("team-a", "first", vec![]).to_document())
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let watcher = tokio::spawn(watch_store(store.clone(), tx, cancel.clone()));

        assert_eq!(rx.recv().await, Some(nn("first")));

        // Non desired-state documents do not trigger
        store
            .create(Document::with_identity("v1", "ConfigMap", "team-a", "cm"))
            .await
            .unwrap();
        store
            .create(DesiredState::new("team-a", "second", vec![]).to_document())
            .await
            .unwrap();
        assert_eq!(rx.recv().await, Some(nn("second")));

        cancel.cancel();
        watcher.await.unwrap();
    }
}
