//! Fan-out of independent work units onto a caller-owned rayon scope.
//!
//! Nothing here creates a thread pool. Callers open a [`rayon::Scope`]
//! (via [`rayon::scope`] or [`rayon::ThreadPool::scope`]), submit units, and
//! read the collected results once the scope has returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::progress::{ProgressMapper, ProgressSink};

/// Cooperative cancellation flag shared between a caller and its workers.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Append-only result collection shared by every unit of a computation.
#[derive(Debug)]
pub struct ResultSink<T> {
    inner: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for ResultSink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ResultSink<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> ResultSink<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking unit must not hide the results of the others.
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, item: T) {
        self.lock().push(item);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the results collected so far, in completion order.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.lock().clone()
    }

    /// Take every collected result, leaving the sink empty.
    pub fn into_vec(self) -> Vec<T> {
        std::mem::take(&mut *self.lock())
    }
}

/// Sub-range of the outer progress scale that a computation reports into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    pub low: f64,
    pub high: f64,
}

impl ProgressRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

impl Default for ProgressRange {
    fn default() -> Self {
        Self { low: 0.0, high: 1.0 }
    }
}

/// Results and progress of a computation whose units are still running on
/// the caller's scope.
#[derive(Debug)]
pub struct ParallelHandle<T> {
    sink: ResultSink<T>,
    progress: Arc<ProgressMapper>,
    submitted: usize,
}

impl<T> ParallelHandle<T> {
    pub fn sink(&self) -> &ResultSink<T> {
        &self.sink
    }

    pub fn progress(&self) -> &Arc<ProgressMapper> {
        &self.progress
    }

    /// Number of units handed to the scope.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub(crate) fn set_submitted(&mut self, submitted: usize) {
        self.submitted = submitted;
    }

    /// Units that have reported completion.
    pub fn completed(&self) -> usize {
        self.progress.current_work()
    }

    /// Results collected so far. Complete only once the scope has returned.
    pub fn results(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.sink.snapshot()
    }

    pub fn into_results(self) -> Vec<T> {
        self.sink.into_vec()
    }
}

/// Create the sink and a progress mapper scaled to `total` units.
pub fn start_parallel<T>(progress: Arc<dyn ProgressSink>, total: usize, range: ProgressRange) -> ParallelHandle<T> {
    ParallelHandle {
        sink: ResultSink::new(),
        progress: Arc::new(ProgressMapper::with_range(progress, total, range.low, range.high)),
        submitted: 0,
    }
}

/// Spawn one task per unit on `scope` and return the number spawned.
///
/// Returns before any unit has run; the scope's end is the join point.
pub fn submit_units<'scope, U, I, F>(scope: &rayon::Scope<'scope>, units: I, work: F) -> usize
where
    I: IntoIterator<Item = U>,
    U: Send + 'scope,
    F: Fn(U) + Send + Sync + 'scope,
{
    let work = Arc::new(work);
    let mut submitted = 0;
    for unit in units {
        let work = Arc::clone(&work);
        scope.spawn(move |_| work(unit));
        submitted += 1;
    }
    submitted
}

// ── Tests ──────────────────────────────────────────────────────────────────
