//! Cumulative token counter reported by grouping workers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Observer = Arc<dyn Fn(u64) + Send + Sync>;

/// Thread-safe counter of processed tokens with an optional observer callback.
///
/// The observer receives each increment, which lets a caller forward progress to a
/// progress bar without the library depending on any rendering crate.
#[derive(Default)]
pub struct ProgressTracker {
    processed: AtomicU64,
    observer: Option<Observer>,
}

impl ProgressTracker {
    /// Creates a tracker without an observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker that forwards every increment to `observer`.
    #[must_use]
    pub fn with_observer<F>(observer: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        Self {
            processed: AtomicU64::new(0),
            observer: Some(Arc::new(observer)),
        }
    }

    /// Records `tokens` more processed tokens.
    pub fn add(&self, tokens: u64) {
        if tokens == 0 {
            return;
        }
        self.processed.fetch_add(tokens, Ordering::Relaxed);
        if let Some(observer) = &self.observer {
            observer(tokens);
        }
    }

    /// Total tokens recorded so far.
    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("processed", &self.processed())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
