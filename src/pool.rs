//! Bounded worker pool running one task per chunk.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Result, WordGroupError};
use crate::partition::Chunk;

/// Shared flag that stops chunks from being started once raised.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; chunks that have not started yet will be skipped.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`CancellationToken::cancel`] was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of one chunk task, tagged with the chunk's index.
#[derive(Debug)]
pub struct ChunkOutcome<T> {
    /// Index of the chunk that produced the result.
    pub index: usize,
    /// Value returned by the worker, or the reason the chunk failed.
    pub result: Result<T>,
}

/// Fixed-size pool executing chunk tasks with at most `concurrency` running at once.
#[derive(Debug)]
pub struct WorkerPool {
    pool: ThreadPool,
    concurrency: usize,
}

impl WorkerPool {
    /// Builds a dedicated pool with exactly `concurrency` threads.
    pub fn new(concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(WordGroupError::InvalidConfig(
                "worker pool requires at least one thread".into(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|idx| format!("wgroup-worker-{idx}"))
            .build()?;
        Ok(Self { pool, concurrency })
    }

    /// Number of threads in the pool.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs `op` inside the pool so rayon parallel iterators use its threads.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Runs `worker` once per chunk and returns the outcomes in completion order.
    ///
    /// A worker that returns an error or panics only fails its own chunk.  Chunks that have
    /// not started when `cancel` is raised report [`WordGroupError::Cancelled`].
    pub fn run_all<T, F>(
        &self,
        chunks: &[Chunk],
        worker: F,
        cancel: &CancellationToken,
    ) -> Vec<ChunkOutcome<T>>
    where
        T: Send,
        F: Fn(&Chunk) -> Result<T> + Sync,
    {
        let (tx, rx) = mpsc::channel();
        let worker = &worker;
        self.pool.scope(|scope| {
            for chunk in chunks {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = if cancel.is_cancelled() {
                        Err(WordGroupError::Cancelled)
                    } else {
                        panic::catch_unwind(AssertUnwindSafe(|| worker(chunk)))
                            .unwrap_or_else(|payload| {
                                Err(WordGroupError::WorkerPanic(panic_message(payload.as_ref())))
                            })
                    };
                    // The receiver outlives the scope.
                    let _ = tx.send(ChunkOutcome {
                        index: chunk.index,
                        result,
                    });
                });
            }
        });
        drop(tx);
        rx.into_iter().collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
