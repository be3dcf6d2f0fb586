//! Download progress reporting.

use std::time::{Duration, Instant};

/// Time constant of the estimate used when the body length is unknown.
pub const UNKNOWN_LENGTH_TIME_CONSTANT: Duration = Duration::from_secs(5);

/// One progress notification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    /// Bytes received so far.
    pub loaded: u64,
    /// Declared total, if known.
    pub total: Option<u64>,
    /// Fraction in `[0, 1]`. Exactly `1.0` only on the terminal notification.
    pub progress: f64,
}

impl DownloadProgress {
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// Turns byte counts into a monotonic progress sequence.
///
/// Intermediate values stay strictly below 1; [`finish`](Self::finish) emits the
/// single terminal `1.0`.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Option<u64>,
    started: Instant,
    time_constant: Duration,
    last: f64,
    finished: bool,
}

impl ProgressTracker {
    /// Start tracking. A declared length of zero counts as unknown.
    pub fn new(total: Option<u64>, started: Instant) -> Self {
        Self {
            total: total.filter(|&t| t > 0),
            started,
            time_constant: UNKNOWN_LENGTH_TIME_CONSTANT,
            last: 0.0,
            finished: false,
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Raw estimate for `loaded` bytes at time `now`.
    pub fn estimate(&self, loaded: u64, now: Instant) -> f64 {
        match self.total {
            Some(total) => loaded as f64 / total as f64,
            None => {
                let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
                1.0 - (-elapsed / self.time_constant.as_secs_f64()).exp()
            }
        }
    }

    /// Record a chunk. Returns `None` when the value would reach 1 early or the
    /// tracker already finished.
    pub fn update(&mut self, loaded: u64, now: Instant) -> Option<DownloadProgress> {
        if self.finished {
            return None;
        }
        let progress = self.estimate(loaded, now).max(self.last);
        if progress >= 1.0 {
            return None;
        }
        self.last = progress;
        Some(DownloadProgress {
            loaded,
            total: self.total,
            progress,
        })
    }

    /// Terminal notification. Only the first call returns a value.
    pub fn finish(&mut self, loaded: u64) -> Option<DownloadProgress> {
        if self.finished {
            return None;
        }
        self.finished = true;
        self.last = 1.0;
        Some(DownloadProgress {
            loaded,
            total: self.total,
            progress: 1.0,
        })
    }
}
