//! Threading runtime for benchmark phases
//!
//! Uses native OS threads; all workers start together after a barrier.

use crate::error::{Error, Result};
use std::sync::{Arc, Barrier};
use std::thread;

/// Per-worker outcome of one phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub operations: u64,
    pub failures: u64,
}

impl WorkerSummary {
    pub fn merge(summaries: &[WorkerSummary]) -> WorkerSummary {
        summaries.iter().fold(WorkerSummary::default(), |acc, s| WorkerSummary {
            operations: acc.operations + s.operations,
            failures: acc.failures + s.failures,
        })
    }
}

/// Multi-threaded runtime for spawning and joining workers
pub struct ThreadingRuntime {
    num_threads: usize,
}

impl ThreadingRuntime {
    pub fn new(num_threads: usize) -> Self {
        Self { num_threads: num_threads.max(1) }
    }

    /// Run one worker per thread and collect their results in thread order
    pub fn run_workers<F, T>(&self, worker_factory: F) -> Result<Vec<T>>
    where
        F: Fn(usize) -> Result<T> + Send + Sync + Clone + 'static,
        T: Send + 'static,
    {
        let barrier = Arc::new(Barrier::new(self.num_threads));
        let mut handles = Vec::with_capacity(self.num_threads);

        for thread_id in 0..self.num_threads {
            let worker_factory = worker_factory.clone();
            let barrier = barrier.clone();

            handles.push(thread::spawn(move || {
                barrier.wait();
                worker_factory(thread_id)
            }));
        }

        let mut results = Vec::with_capacity(self.num_threads);
        for handle in handles {
            let result = handle
                .join()
                .map_err(|e| Error::Other(format!("Thread panicked: {:?}", e)))??;
            results.push(result);
        }

        Ok(results)
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Share of `total` operations assigned to `thread_id`; earlier threads take the remainder
    pub fn share(&self, total: u64, thread_id: usize) -> u64 {
        let threads = self.num_threads as u64;
        let base = total / threads;
        let extra = u64::from((thread_id as u64) < total % threads);
        base + extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_threading_runtime_basic() {
        let runtime = ThreadingRuntime::new(4);
        let counter = Arc::new(AtomicU64::new(0));

        let results = runtime
            .run_workers({
                let counter = Arc::clone(&counter);
                move |thread_id| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(thread_id * 10)
                }
            })
            .unwrap();

        assert_eq!(results, vec![0, 10, 20, 30]);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_worker_error_propagates() {
        let runtime = ThreadingRuntime::new(2);
        let result: Result<Vec<()>> = runtime.run_workers(|thread_id| {
            if thread_id == 1 {
                Err(Error::Other("boom".to_string()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_share_covers_total() {
        let runtime = ThreadingRuntime::new(3);
        let shares: Vec<u64> = (0..3).map(|t| runtime.share(10, t)).collect();
        assert_eq!(shares, vec![4, 3, 3]);
        assert_eq!(ThreadingRuntime::new(0).num_threads(), 1);
    }

    #[test]
    fn test_merge_summaries() {
        let merged = WorkerSummary::merge(&[
            WorkerSummary { operations: 3, failures: 1 },
            WorkerSummary { operations: 4, failures: 0 },
        ]);
        assert_eq!(merged, WorkerSummary { operations: 7, failures: 1 });
    }
}
