//! Detached background work: revalidation fetches and cache writes.
//!
//! Tasks are spawned onto the runtime and never awaited by the request that
//! started them. Their handles are kept only so a host or a test can wait for
//! outstanding writes with [`Background::drain`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default)]
pub struct Background {
    tasks: Arc<Mutex<Vec<(&'static str, JoinHandle<()>)>>>,
}

impl Background {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a detached task. Finished handles are pruned on the way.
    pub async fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|(_, h)| !h.is_finished());
        tasks.push((label, handle));
    }

    /// Number of tasks that have not finished yet.
    #[cfg(test)]
    pub(crate) async fn pending(&self) -> usize {
        self.tasks.lock().await.iter().filter(|(_, h)| !h.is_finished()).count()
    }

    /// Wait for every outstanding task, including tasks spawned while
    /// draining.
    pub async fn drain(&self) {
        loop {
            let batch = std::mem::take(&mut *self.tasks.lock().await);
            if batch.is_empty() {
                return;
            }
            for (label, handle) in batch {
                if let Err(e) = handle.await {
                    tracing::warn!(task = label, error = %e, "background task did not complete");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_drain_waits_for_all_tasks() {
        let background = Background::new();
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..4u64 {
            let done = done.clone();
            background
                .spawn("test", async move {
                    tokio::time::sleep(Duration::from_millis(5 * i)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        background.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 4);
        assert_eq!(background.pending().await, 0);
    }

    #[tokio::test]
    async fn test_drain_covers_nested_spawns() {
        let background = Background::new();
        let done = Arc::new(AtomicUsize::new(0));

        let inner_bg = background.clone();
        let inner_done = done.clone();
        background
            .spawn("outer", async move {
                let done = inner_done.clone();
                inner_bg
                    .spawn("inner", async move {
                        done.fetch_add(1, Ordering::SeqCst);
                    })
                    .await;
                inner_done.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        background.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_poison_drain() {
        let background = Background::new();
        background.spawn("boom", async { panic!("write failed") }).await;
        background.drain().await;
        assert_eq!(background.pending().await, 0);
    }
}
