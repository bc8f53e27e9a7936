//! Progress reporting that nests inside a larger multi-phase task.
//!
//! A [`ProgressMapper`] turns a discrete work counter into a fraction of
//! the sub-range `[low, high]` of its delegate's scale. Mappers implement
//! [`ProgressSink`] themselves, so phases nest arbitrarily.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info};

/// Receiver of progress and status updates.
///
/// Called from worker threads; implementations must be thread-safe.
pub trait ProgressSink: Send + Sync {
    /// Overall progress in `[0, 1]`.
    fn set_progress(&self, progress: f64);

    fn set_status(&self, message: &str);

    fn set_title(&self, _title: &str) {}
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn set_progress(&self, _progress: f64) {}

    fn set_status(&self, _message: &str) {}
}

/// Forwards updates to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn set_progress(&self, progress: f64) {
        debug!("progress {:.1}%", progress * 100.0);
    }

    fn set_status(&self, message: &str) {
        info!("{message}");
    }

    fn set_title(&self, title: &str) {
        info!("== {title}");
    }
}

type OfMessage = Box<dyn Fn(usize, usize) -> String + Send + Sync>;
type PercentMessage = Box<dyn Fn(f64) -> String + Send + Sync>;

enum StatusFormat {
    None,
    Of(OfMessage),
    Percent(PercentMessage),
}

/// Maps a counter `0..=total` onto `[low, high]` of a delegate sink.
pub struct ProgressMapper {
    delegate: Arc<dyn ProgressSink>,
    low: f64,
    high: f64,
    total: usize,
    current: AtomicUsize,
    format: StatusFormat,
    last_message: Mutex<Option<String>>,
}

impl ProgressMapper {
    /// Mapper over the delegate's full `[0, 1]` scale.
    pub fn new(delegate: Arc<dyn ProgressSink>, total: usize) -> Self {
        Self::with_range(delegate, total, 0.0, 1.0)
    }

    /// Mapper over `[low, high]` of the delegate's scale.
    pub fn with_range(delegate: Arc<dyn ProgressSink>, total: usize, low: f64, high: f64) -> Self {
        Self {
            delegate,
            low,
            high,
            total,
            current: AtomicUsize::new(0),
            format: StatusFormat::None,
            last_message: Mutex::new(None),
        }
    }

    /// Emit a status built from `(current, total)` on every update.
    pub fn with_of_message<F>(mut self, format: F) -> Self
    where
        F: Fn(usize, usize) -> String + Send + Sync + 'static,
    {
        self.format = StatusFormat::Of(Box::new(format));
        self
    }

    /// Template form of [`ProgressMapper::with_of_message`]; `{current}` and
    /// `{total}` are substituted.
    pub fn of_message(self, template: &str) -> Self {
        let template = template.to_string();
        self.with_of_message(move |current, total| {
            template
                .replace("{current}", &current.to_string())
                .replace("{total}", &total.to_string())
        })
    }

    /// Emit a status built from the completed fraction on every update.
    pub fn with_percent_message<F>(mut self, format: F) -> Self
    where
        F: Fn(f64) -> String + Send + Sync + 'static,
    {
        self.format = StatusFormat::Percent(Box::new(format));
        self
    }

    /// Template form of [`ProgressMapper::with_percent_message`]; `{percent}`
    /// is substituted with a whole-number percentage.
    pub fn percent_message(self, template: &str) -> Self {
        let template = template.to_string();
        self.with_percent_message(move |fraction| {
            template.replace("{percent}", &format!("{:.0}", fraction * 100.0))
        })
    }

    pub fn total_work(&self) -> usize {
        self.total
    }

    pub fn current_work(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// `[low, high]` on the delegate's scale.
    pub fn range(&self) -> (f64, f64) {
        (self.low, self.high)
    }

    /// Add `delta` units of completed work. Safe from any thread; progress is
    /// computed from the post-increment count.
    pub fn add_work(&self, delta: usize) {
        let done = self.current.fetch_add(delta, Ordering::AcqRel) + delta;
        self.set_progress(self.fraction_of(done));
    }

    pub fn inc(&self) {
        self.add_work(1);
    }

    fn fraction_of(&self, done: usize) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (done as f64 / self.total as f64).min(1.0)
    }

    /// Map an inner fraction onto the delegate's range.
    pub fn map(&self, fraction: f64) -> f64 {
        self.low + (self.high - self.low) * fraction
    }

    /// Forward `fraction` (of this phase) to the delegate and emit the status
    /// message if it differs from the last one emitted.
    pub fn set_progress(&self, fraction: f64) {
        self.delegate.set_progress(self.map(fraction));

        let message = match &self.format {
            StatusFormat::None => return,
            StatusFormat::Of(f) => f(self.current_work(), self.total),
            StatusFormat::Percent(f) => f(self.fraction_of(self.current_work())),
        };

        let mut last = self.last_message.lock().unwrap_or_else(|e| e.into_inner());
        if last.as_deref() != Some(message.as_str()) {
            self.delegate.set_status(&message);
            *last = Some(message);
        }
    }
}

impl ProgressSink for ProgressMapper {
    fn set_progress(&self, progress: f64) {
        ProgressMapper::set_progress(self, progress);
    }

    fn set_status(&self, message: &str) {
        self.delegate.set_status(message);
    }

    fn set_title(&self, title: &str) {
        self.delegate.set_title(title);
    }
}

impl fmt::Debug for ProgressMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressMapper")
            .field("low", &self.low)
            .field("high", &self.high)
            .field("total", &self.total)
            .field("current", &self.current_work())
            .finish()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
