//! Counters describing what the sampler has done.
//!
//! Only counts are kept; no positions or timestamps of individual samples
//! are retained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free statistics shared between the service and its worker thread.
#[derive(Debug)]
pub struct SamplerStats {
    /// Samples handed to the subscribers, whether or not every callback succeeded
    samples_emitted: AtomicU64,
    /// Iterations skipped because the cursor could not be read
    cursor_failures: AtomicU64,
    /// Iterations skipped because the clock failed
    clock_failures: AtomicU64,
    /// Callbacks that returned an error or panicked
    subscriber_failures: AtomicU64,
    /// Idle -> Running transitions
    runs_started: AtomicU64,
    /// Running -> Idle transitions
    runs_stopped: AtomicU64,
    created_at: DateTime<Utc>,
}

impl SamplerStats {
    pub fn new() -> Self {
        Self {
            samples_emitted: AtomicU64::new(0),
            cursor_failures: AtomicU64::new(0),
            clock_failures: AtomicU64::new(0),
            subscriber_failures: AtomicU64::new(0),
            runs_started: AtomicU64::new(0),
            runs_stopped: AtomicU64::new(0),
            created_at: Utc::now(),
        }
    }

    pub fn record_sample(&self) {
        self.samples_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cursor_failure(&self) {
        self.cursor_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clock_failure(&self) {
        self.clock_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscriber_failure(&self) {
        self.subscriber_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_stopped(&self) {
        self.runs_stopped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_emitted: self.samples_emitted.load(Ordering::Relaxed),
            cursor_failures: self.cursor_failures.load(Ordering::Relaxed),
            clock_failures: self.clock_failures.load(Ordering::Relaxed),
            subscriber_failures: self.subscriber_failures.load(Ordering::Relaxed),
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_stopped: self.runs_stopped.load(Ordering::Relaxed),
            created_at: self.created_at,
            uptime_secs: (Utc::now() - self.created_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Sampler Statistics:\n\
             - Samples emitted: {}\n\
             - Cursor read failures: {}\n\
             - Clock failures: {}\n\
             - Subscriber failures: {}\n\
             - Sampling runs: {} started, {} stopped\n\
             - Uptime: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - Every published position carries random jitter\n\
             - No samples are stored",
            stats.samples_emitted,
            stats.cursor_failures,
            stats.clock_failures,
            stats.subscriber_failures,
            stats.runs_started,
            stats.runs_stopped,
            stats.uptime_secs
        )
    }
}

impl Default for SamplerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`SamplerStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_emitted: u64,
    pub cursor_failures: u64,
    pub clock_failures: u64,
    pub subscriber_failures: u64,
    pub runs_started: u64,
    pub runs_stopped: u64,
    pub created_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = SamplerStats::new();

        stats.record_sample();
        stats.record_sample();
        stats.record_cursor_failure();
        stats.record_run_started();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.samples_emitted, 2);
        assert_eq!(snapshot.cursor_failures, 1);
        assert_eq!(snapshot.clock_failures, 0);
        assert_eq!(snapshot.runs_started, 1);
        assert_eq!(snapshot.runs_stopped, 0);
    }

    #[test]
    fn test_summary_format() {
        let stats = SamplerStats::new();
        let summary = stats.summary();

        assert!(summary.contains("Samples emitted"));
        assert!(summary.contains("Cursor read failures"));
        assert!(summary.contains("Privacy Guarantee"));
    }
}
