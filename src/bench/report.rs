//! Report generation for benchmark results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::BenchmarkConfig;
use super::metrics::MetricsSnapshot;

/// Complete benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Program name as invoked
    pub program: String,
    /// `host:port` of the search server
    pub target: String,
    /// Settings the run was made with
    pub config: BenchmarkConfig,
    /// Host the client ran on
    pub client_host: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub iterations: u64,
    pub exchanges: u64,
    /// Sum of exchange times in seconds
    pub total_secs: f64,
    /// Total divided by iterations
    pub avg_secs: f64,
    pub mean_exchange_secs: f64,
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
    pub latency_max_ms: f64,
    pub lines_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub empty_responses: u64,
    pub wall_secs: f64,
    /// Results per test file, in run order
    pub tests: Vec<TestResult>,
}

/// Results for a single test file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub path: String,
    pub exchanges: u64,
    pub total_secs: f64,
    pub avg_secs: f64,
    pub lines_received: u64,
    pub empty_responses: u64,
}

impl BenchmarkReport {
    /// Create a report from a finished run
    pub fn from_snapshot(program: &str, config: &BenchmarkConfig, snapshot: MetricsSnapshot) -> Self {
        let tests = snapshot
            .per_test
            .iter()
            .map(|t| TestResult {
                path: t.path.display().to_string(),
                exchanges: t.exchanges,
                total_secs: t.total_secs,
                avg_secs: t.avg_secs,
                lines_received: t.lines_received,
                empty_responses: t.empty_responses,
            })
            .collect();

        Self {
            program: program.to_string(),
            target: config.addr(),
            config: config.clone(),
            client_host: hostname::get()
                .ok()
                .map(|h| h.to_string_lossy().into_owned()),
            generated_at: Utc::now(),
            iterations: snapshot.iterations,
            exchanges: snapshot.exchanges,
            total_secs: snapshot.total_secs,
            avg_secs: snapshot.avg_secs,
            mean_exchange_secs: snapshot.mean_exchange_secs,
            latency_p50_ms: snapshot.latency_p50,
            latency_p95_ms: snapshot.latency_p95,
            latency_p99_ms: snapshot.latency_p99,
            latency_max_ms: snapshot.latency_max,
            lines_received: snapshot.lines_received,
            bytes_sent: snapshot.bytes_sent,
            bytes_received: snapshot.bytes_received,
            empty_responses: snapshot.empty_responses,
            wall_secs: snapshot.wall_secs,
            tests,
        }
    }

    /// `Total time: <total>, avg time: <avg>` with five decimals
    pub fn summary_line(&self) -> String {
        format!(
            "Total time: {:.5}, avg time: {:.5}",
            self.total_secs, self.avg_secs
        )
    }

    /// Print the summary line
    pub fn print_summary(&self) {
        println!("{}", self.summary_line());
    }

    /// Print the per-test breakdown as an ASCII table
    pub fn print_table(&self) {
        println!();
        println!("Target: {}  Iterations: {}  Exchanges: {}", self.target, self.iterations, self.exchanges);
        println!("┌────────────────────────────────┬───────────┬────────────┬────────────┬──────────┬───────┐");
        println!("│ Test                           │ Exchanges │  Total (s) │    Avg (s) │    Lines │ Empty │");
        println!("├────────────────────────────────┼───────────┼────────────┼────────────┼──────────┼───────┤");

        for test in &self.tests {
            println!(
                "│ {:<30} │ {:>9} │ {:>10.5} │ {:>10.5} │ {:>8} │ {:>5} │",
                truncate_left(&test.path, 30),
                test.exchanges,
                test.total_secs,
                test.avg_secs,
                test.lines_received,
                test.empty_responses
            );
        }

        println!("└────────────────────────────────┴───────────┴────────────┴────────────┴──────────┴───────┘");
        println!(
            "Latency p50: {:.3}ms, p95: {:.3}ms, p99: {:.3}ms, max: {:.3}ms",
            self.latency_p50_ms, self.latency_p95_ms, self.latency_p99_ms, self.latency_max_ms
        );
        println!(
            "Sent {} bytes, received {} bytes in {} lines",
            self.bytes_sent, self.bytes_received, self.lines_received
        );
        println!();
    }

    /// Export the report as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Keep the tail of long paths so the file name stays visible
fn truncate_left(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count <= width {
        return s.to_string();
    }
    let tail: String = s.chars().skip(count - (width - 1)).collect();
    format!("…{}", tail)
}
