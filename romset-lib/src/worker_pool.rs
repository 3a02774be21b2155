//! Worker pool for concurrent file scanning with backpressure.
//!
//! Spawns N persistent tokio tasks that pull work items from a bounded
//! async-channel. Each item is processed on the blocking thread pool, since
//! hashing is file I/O plus CPU work. Results are sent to an unbounded
//! channel for consumption by the caller.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A pool of worker tasks that process items concurrently.
///
/// ```ignore
/// let mut pool = WorkerPool::start(4, paths, |path| hash_file(&path, None, chunk));
///
/// while let Some(result) = pool.recv().await {
///     handle(result);
/// }
/// ```
pub struct WorkerPool<R: Send + 'static> {
    result_rx: mpsc::UnboundedReceiver<R>,
    _handles: Vec<JoinHandle<()>>,
}

impl<R: Send + 'static> WorkerPool<R> {
    /// Spawn `n` workers, submit all items, and return a pool for receiving
    /// results. Items are submitted through a channel of capacity `n`, so at
    /// most `n` items are in flight or queued at any time.
    ///
    /// Results arrive in completion order, not submission order. A panic in
    /// `process_fn` loses that item's result; the worker keeps going. Callers
    /// that need an outcome per item catch panics inside `process_fn`.
    pub fn start<W, F>(n: usize, items: Vec<W>, process_fn: F) -> Self
    where
        W: Send + 'static,
        F: Fn(W) -> R + Send + Sync + 'static,
    {
        let n = n.max(1);
        let (work_tx, work_rx) = async_channel::bounded::<W>(n);
        let (result_tx, result_rx) = mpsc::unbounded_channel::<R>();
        let process_fn = Arc::new(process_fn);

        let handles: Vec<JoinHandle<()>> = (0..n)
            .map(|_| {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let process_fn = process_fn.clone();
                tokio::spawn(async move {
                    while let Ok(item) = work_rx.recv().await {
                        let process_fn = process_fn.clone();
                        match tokio::task::spawn_blocking(move || process_fn(item)).await {
                            Ok(r) => {
                                if result_tx.send(r).is_err() {
                                    break; // Receiver dropped
                                }
                            }
                            Err(e) => log::warn!("Worker pool: item failed: {e}"),
                        }
                    }
                })
            })
            .collect();

        // The result channel closes once every worker has exited.
        drop(result_tx);

        tokio::spawn(async move {
            for item in items {
                if work_tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        Self {
            result_rx,
            _handles: handles,
        }
    }

    /// Receive the next result. Returns `None` when all items have been
    /// processed and all workers have shut down.
    pub async fn recv(&mut self) -> Option<R> {
        self.result_rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_every_item_produces_a_result() {
        let mut pool = WorkerPool::start(3, (0..50u32).collect(), |x| x * 2);
        let mut results = Vec::new();
        while let Some(r) = pool.recv().await {
            results.push(r);
        }
        results.sort_unstable();
        assert_eq!(results, (0..50u32).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_input_closes_immediately() {
        let mut pool = WorkerPool::start(4, Vec::<u8>::new(), |x| x);
        assert_eq!(pool.recv().await, None);
    }

    #[tokio::test]
    async fn test_zero_workers_still_runs() {
        let mut pool = WorkerPool::start(0, vec![1, 2], |x: i32| x + 1);
        let mut results = Vec::new();
        while let Some(r) = pool.recv().await {
            results.push(r);
        }
        results.sort_unstable();
        assert_eq!(results, vec![2, 3]);
    }
}
