//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting is the only operation
//! that needs synchronization (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering intentionally—these are statistical
//! counters only. Do NOT use these atomics for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Lock-free metrics collector
///
/// All recording operations are lock-free using atomics.
/// The `report()` method atomically swaps the per-interval counters to
/// get a consistent snapshot.
pub struct Metrics {
    /// Valid measurements ever published (monotonic)
    measurements_total: AtomicU64,
    /// Measurement cycles that timed out (monotonic)
    invalid_pulses_total: AtomicU64,
    /// Riders counted by the hysteresis rule (monotonic)
    riders_total: AtomicU64,
    /// Riders drained by the decay worker (monotonic)
    decay_drained_total: AtomicU64,
    /// Poll ticks since last report (reset on report)
    polls_since_report: AtomicU64,
    /// Sum of poll latencies in microseconds (reset on report)
    poll_latency_sum_us: AtomicU64,
    /// Max poll latency in microseconds (reset on report)
    poll_latency_max_us: AtomicU64,
    /// Process start time for uptime reporting
    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            measurements_total: AtomicU64::new(0),
            invalid_pulses_total: AtomicU64::new(0),
            riders_total: AtomicU64::new(0),
            decay_drained_total: AtomicU64::new(0),
            polls_since_report: AtomicU64::new(0),
            poll_latency_sum_us: AtomicU64::new(0),
            poll_latency_max_us: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_measurement(&self) {
        self.measurements_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_pulse(&self) {
        self.invalid_pulses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rider(&self) {
        self.riders_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decay(&self, drained: u32) {
        self.decay_drained_total.fetch_add(u64::from(drained), Ordering::Relaxed);
    }

    pub fn record_poll(&self, latency_us: u64) {
        self.polls_since_report.fetch_add(1, Ordering::Relaxed);
        self.poll_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.poll_latency_max_us, latency_us);
    }

    /// Produce a summary, resetting the per-interval counters
    pub fn report(&self) -> MetricsSummary {
        let polls = self.polls_since_report.swap(0, Ordering::Relaxed);
        let latency_sum_us = self.poll_latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max_us = self.poll_latency_max_us.swap(0, Ordering::Relaxed);

        MetricsSummary {
            uptime_secs: self.started_at.elapsed().as_secs(),
            measurements_total: self.measurements_total.load(Ordering::Relaxed),
            invalid_pulses_total: self.invalid_pulses_total.load(Ordering::Relaxed),
            riders_total: self.riders_total.load(Ordering::Relaxed),
            decay_drained_total: self.decay_drained_total.load(Ordering::Relaxed),
            polls,
            poll_latency_avg_us: if polls > 0 { latency_sum_us / polls } else { 0 },
            poll_latency_max_us: latency_max_us,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub measurements_total: u64,
    pub invalid_pulses_total: u64,
    pub riders_total: u64,
    pub decay_drained_total: u64,
    pub polls: u64,
    pub poll_latency_avg_us: u64,
    pub poll_latency_max_us: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            uptime_secs = %self.uptime_secs,
            measurements_total = %self.measurements_total,
            invalid_pulses_total = %self.invalid_pulses_total,
            riders_total = %self.riders_total,
            decay_drained_total = %self.decay_drained_total,
            polls = %self.polls,
            poll_latency_avg_us = %self.poll_latency_avg_us,
            poll_latency_max_us = %self.poll_latency_max_us,
            "metrics_summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_are_monotonic_across_reports() {
        let metrics = Metrics::new();
        metrics.record_measurement();
        metrics.record_measurement();
        metrics.record_invalid_pulse();
        metrics.record_rider();
        metrics.record_decay(3);

        let first = metrics.report();
        assert_eq!(first.measurements_total, 2);
        assert_eq!(first.invalid_pulses_total, 1);
        assert_eq!(first.riders_total, 1);
        assert_eq!(first.decay_drained_total, 3);

        let second = metrics.report();
        assert_eq!(second.measurements_total, 2);
        assert_eq!(second.decay_drained_total, 3);
    }

    #[test]
    fn test_poll_latency_resets_on_report() {
        let metrics = Metrics::new();
        metrics.record_poll(100);
        metrics.record_poll(300);

        let first = metrics.report();
        assert_eq!(first.polls, 2);
        assert_eq!(first.poll_latency_avg_us, 200);
        assert_eq!(first.poll_latency_max_us, 300);

        let second = metrics.report();
        assert_eq!(second.polls, 0);
        assert_eq!(second.poll_latency_avg_us, 0);
        assert_eq!(second.poll_latency_max_us, 0);
    }

    #[test]
    fn test_atomic_max_keeps_largest() {
        let max = AtomicU64::new(0);
        update_atomic_max(&max, 10);
        update_atomic_max(&max, 5);
        update_atomic_max(&max, 20);
        assert_eq!(max.load(Ordering::Relaxed), 20);
    }
}
