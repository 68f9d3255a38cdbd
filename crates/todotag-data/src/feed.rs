use futures_util::future::BoxFuture;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use todotag_types::models::{Model, ModelKind};

use crate::error::ServiceError;

/// Broadcasts which collection changed after every successful write.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ModelKind>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModelKind> {
        self.tx.subscribe()
    }

    /// Notify all live queries. No receivers is not an error.
    pub fn publish(&self, kind: ModelKind) {
        let _ = self.tx.send(kind);
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Live query over one collection. Yields the full current result set once
/// on start and again after every change to that collection.
///
/// Dropping the subscription (or calling [`Subscription::cancel`]) stops the
/// background task.
pub struct Subscription<M> {
    rx: mpsc::Receiver<Result<Vec<M>, ServiceError>>,
    task: JoinHandle<()>,
}

impl<M: Model> Subscription<M> {
    /// Spawn the refresh loop. `changes` must be subscribed before the first
    /// load so no write between load and wait is missed.
    pub fn spawn<F>(mut changes: broadcast::Receiver<ModelKind>, load: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<Vec<M>, ServiceError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(16);

        let task = tokio::spawn(async move {
            loop {
                let snapshot = load().await;
                if let Err(e) = &snapshot {
                    warn!("Live query on {} failed: {}", M::KIND, e);
                }
                if tx.send(snapshot).await.is_err() {
                    break;
                }

                loop {
                    match changes.recv().await {
                        Ok(kind) if kind == M::KIND => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            debug!("Live query on {} lagged by {} changes, reloading", M::KIND, n);
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        });

        Self { rx, task }
    }
}

impl<M> Subscription<M> {
    /// Next snapshot, or `None` once the feed has shut down.
    pub async fn next(&mut self) -> Option<Result<Vec<M>, ServiceError>> {
        self.rx.recv().await
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
