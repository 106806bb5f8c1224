//! Timing accumulation using HdrHistogram for percentile calculations.

use hdrhistogram::Histogram;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Result of one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeOutcome {
    pub elapsed: Duration,
    pub lines_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl ExchangeOutcome {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// The server closed without sending a single line
    pub fn is_empty(&self) -> bool {
        self.lines_received == 0
    }
}

/// Per test file totals
#[derive(Debug, Clone)]
struct TestMetrics {
    path: PathBuf,
    exchanges: u64,
    total: Duration,
    lines_received: u64,
    empty_responses: u64,
}

/// Accumulates exchange outcomes over a run.
///
/// The run loop owns the collector; exchanges are recorded one at a time.
pub struct MetricsCollector {
    /// Exchange latency in microseconds
    latency_histogram: Histogram<u64>,
    total: Duration,
    exchanges: u64,
    lines_received: u64,
    bytes_sent: u64,
    bytes_received: u64,
    empty_responses: u64,
    per_test: Vec<TestMetrics>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            // Latencies up to 10 minutes with 3 significant figures
            latency_histogram: Histogram::new_with_bounds(1, 600_000_000, 3)
                .expect("static histogram bounds are valid"),
            total: Duration::ZERO,
            exchanges: 0,
            lines_received: 0,
            bytes_sent: 0,
            bytes_received: 0,
            empty_responses: 0,
            per_test: Vec::new(),
            start_time: None,
            end_time: None,
        }
    }

    /// Mark the start of the measured run
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Mark the end of the measured run
    pub fn stop(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Record one exchange against the test file that produced it
    pub fn record(&mut self, test: &Path, outcome: &ExchangeOutcome) {
        let latency_us = outcome.elapsed.as_micros() as u64;
        // Out-of-range values are saturated rather than dropped
        self.latency_histogram.saturating_record(latency_us.max(1));

        self.total += outcome.elapsed;
        self.exchanges += 1;
        self.lines_received += outcome.lines_received;
        self.bytes_sent += outcome.bytes_sent;
        self.bytes_received += outcome.bytes_received;
        if outcome.is_empty() {
            self.empty_responses += 1;
        }

        let entry = match self.per_test.iter().position(|t| t.path == test) {
            Some(idx) => &mut self.per_test[idx],
            None => {
                self.per_test.push(TestMetrics {
                    path: test.to_path_buf(),
                    exchanges: 0,
                    total: Duration::ZERO,
                    lines_received: 0,
                    empty_responses: 0,
                });
                let last = self.per_test.len() - 1;
                &mut self.per_test[last]
            }
        };
        entry.exchanges += 1;
        entry.total += outcome.elapsed;
        entry.lines_received += outcome.lines_received;
        if outcome.is_empty() {
            entry.empty_responses += 1;
        }
    }

    pub fn exchanges(&self) -> u64 {
        self.exchanges
    }

    /// Sum of exchange times, in seconds
    pub fn total_secs(&self) -> f64 {
        self.total.as_secs_f64()
    }

    pub fn empty_responses(&self) -> u64 {
        self.empty_responses
    }

    /// Wall clock time between `start` and `stop`
    pub fn elapsed(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(s), Some(e)) => e.duration_since(s),
            (Some(s), None) => s.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Get latency percentile in milliseconds
    pub fn latency_percentile(&self, percentile: f64) -> f64 {
        if self.exchanges == 0 {
            return 0.0;
        }
        self.latency_histogram.value_at_percentile(percentile) as f64 / 1000.0
    }

    /// Create a snapshot; the average is taken per iteration
    pub fn snapshot(&self, iterations: u64) -> MetricsSnapshot {
        let total_secs = self.total_secs();
        MetricsSnapshot {
            iterations,
            exchanges: self.exchanges,
            total_secs,
            avg_secs: average(total_secs, iterations),
            mean_exchange_secs: average(total_secs, self.exchanges),
            latency_p50: self.latency_percentile(50.0),
            latency_p95: self.latency_percentile(95.0),
            latency_p99: self.latency_percentile(99.0),
            latency_max: if self.exchanges == 0 {
                0.0
            } else {
                self.latency_histogram.max() as f64 / 1000.0
            },
            lines_received: self.lines_received,
            bytes_sent: self.bytes_sent,
            bytes_received: self.bytes_received,
            empty_responses: self.empty_responses,
            wall_secs: self.elapsed().as_secs_f64(),
            per_test: self
                .per_test
                .iter()
                .map(|t| TestSnapshot {
                    path: t.path.clone(),
                    exchanges: t.exchanges,
                    total_secs: t.total.as_secs_f64(),
                    avg_secs: average(t.total.as_secs_f64(), t.exchanges),
                    lines_received: t.lines_received,
                    empty_responses: t.empty_responses,
                })
                .collect(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// `total / count`, or zero for an empty count
pub fn average(total: f64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total / count as f64
}

/// A snapshot of metrics at the end of a run
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub iterations: u64,
    pub exchanges: u64,
    pub total_secs: f64,
    pub avg_secs: f64,
    pub mean_exchange_secs: f64,
    pub latency_p50: f64,
    pub latency_p95: f64,
    pub latency_p99: f64,
    pub latency_max: f64,
    pub lines_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub empty_responses: u64,
    pub wall_secs: f64,
    pub per_test: Vec<TestSnapshot>,
}

#[derive(Debug, Clone)]
pub struct TestSnapshot {
    pub path: PathBuf,
    pub exchanges: u64,
    pub total_secs: f64,
    pub avg_secs: f64,
    pub lines_received: u64,
    pub empty_responses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(ms: u64, lines: u64) -> ExchangeOutcome {
        ExchangeOutcome {
            elapsed: Duration::from_millis(ms),
            lines_received: lines,
            bytes_sent: 100,
            bytes_received: lines * 4,
        }
    }

    #[test]
    fn test_metrics_collector() {
        let mut collector = MetricsCollector::new();
        collector.start();

        let a = Path::new("a.txt");
        let b = Path::new("b.txt");
        collector.record(a, &outcome(100, 3));
        collector.record(b, &outcome(150, 0));
        collector.record(a, &outcome(200, 2));
        collector.record(b, &outcome(250, 1));

        collector.stop();

        assert_eq!(collector.exchanges(), 4);
        assert_eq!(collector.empty_responses(), 1);
        assert!((collector.total_secs() - 0.7).abs() < 1e-9);

        let snapshot = collector.snapshot(2);
        assert!((snapshot.avg_secs - 0.35).abs() < 1e-9);
        assert!((snapshot.mean_exchange_secs - 0.175).abs() < 1e-9);
        assert_eq!(snapshot.lines_received, 6);
        assert_eq!(snapshot.bytes_sent, 400);
        assert_eq!(snapshot.bytes_received, 24);

        // Per-test entries keep first-seen order
        assert_eq!(snapshot.per_test.len(), 2);
        assert_eq!(snapshot.per_test[0].path, PathBuf::from("a.txt"));
        assert_eq!(snapshot.per_test[0].exchanges, 2);
        assert!((snapshot.per_test[0].avg_secs - 0.15).abs() < 1e-9);
        assert_eq!(snapshot.per_test[1].empty_responses, 1);
    }

    #[test]
    fn test_latency_percentiles() {
        let mut collector = MetricsCollector::new();
        for ms in 1..=100 {
            collector.record(Path::new("t"), &outcome(ms, 1));
        }

        let p50 = collector.latency_percentile(50.0);
        let p99 = collector.latency_percentile(99.0);
        assert!((p50 - 50.0).abs() < 0.5, "p50 was {p50}");
        assert!((p99 - 99.0).abs() < 0.5, "p99 was {p99}");
        assert!(collector.snapshot(1).latency_max >= 99.9);
    }

    #[test]
    fn test_empty_run_snapshot() {
        let collector = MetricsCollector::new();
        let snapshot = collector.snapshot(0);

        assert_eq!(snapshot.exchanges, 0);
        assert_eq!(snapshot.total_secs, 0.0);
        assert_eq!(snapshot.avg_secs, 0.0);
        assert_eq!(snapshot.latency_p99, 0.0);
        assert_eq!(snapshot.wall_secs, 0.0);
    }

    #[test]
    fn test_average_guards_zero() {
        assert_eq!(average(1.5, 0), 0.0);
        assert_eq!(average(1.5, 3), 0.5);
    }
}
