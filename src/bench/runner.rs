//! Sequential benchmark runner.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::config::BenchmarkConfig;
use super::metrics::{ExchangeOutcome, MetricsCollector, MetricsSnapshot};
use crate::error::{BenchError, Result};
use crate::protocol;
use crate::session::Session;

/// Printed once for every exchange that returned no lines
pub const EMPTY_RESPONSE_WARNING: &str = "Warning, did not read any results";

/// Where per-exchange warnings are written
pub type WarningSink = Arc<Mutex<dyn Write + Send>>;

/// Benchmark runner that executes exchanges against the search server
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
    warnings: WarningSink,
}

impl BenchmarkRunner {
    /// Create a new benchmark runner writing warnings to stdout
    pub fn new(config: BenchmarkConfig) -> Self {
        Self {
            config,
            warnings: Arc::new(Mutex::new(std::io::stdout())),
        }
    }

    /// Send warnings somewhere else (stderr for JSON output, a buffer in tests)
    pub fn with_warning_sink(self, warnings: WarningSink) -> Self {
        Self { warnings, ..self }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Perform one exchange for `test` and time it.
    ///
    /// The test file is read before any network I/O. An empty response is
    /// reported but does not fail the exchange.
    pub async fn run_single_test(&self, test: &Path) -> Result<ExchangeOutcome> {
        let start = Instant::now();

        let payload = tokio::fs::read(test)
            .await
            .map_err(|source| BenchError::TestFile {
                path: test.to_path_buf(),
                source,
            })?;
        let request = protocol::encode_request(&self.config.header, &payload);

        let mut session = Session::connect(
            &self.config.addr(),
            self.config.connect_timeout(),
            self.config.io_timeout(),
        )
        .await?;
        session.send(&request).await?;
        let response = session.receive().await?;

        if response.lines == 0 {
            self.warn(EMPTY_RESPONSE_WARNING);
            tracing::warn!(test = %test.display(), "no results received");
        }

        let outcome = ExchangeOutcome {
            elapsed: start.elapsed(),
            lines_received: response.lines,
            bytes_sent: request.len() as u64,
            bytes_received: response.bytes,
        };
        tracing::debug!(
            test = %test.display(),
            lines = outcome.lines_received,
            "exchange took {:.5}s",
            outcome.elapsed_secs()
        );

        Ok(outcome)
    }

    fn warn(&self, message: &str) {
        if let Ok(mut out) = self.warnings.lock() {
            let _ = writeln!(out, "{}", message);
            let _ = out.flush();
        }
    }

    /// Run unmeasured passes over the test list
    pub async fn warmup(&self) -> Result<()> {
        if self.config.warmup_iterations == 0 {
            return Ok(());
        }
        tracing::info!("Running {} warmup iterations...", self.config.warmup_iterations);

        for _ in 0..self.config.warmup_iterations {
            for test in &self.config.tests {
                self.run_single_test(test).await?;
            }
        }

        Ok(())
    }

    /// Run the full benchmark: every iteration, every test, strictly in order.
    ///
    /// The first error aborts the run.
    pub async fn run(&self) -> Result<MetricsSnapshot> {
        if self.config.iterations == 0 {
            return Err(BenchError::InvalidArgument(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.config.tests.is_empty() {
            return Err(BenchError::InvalidArgument(
                "at least one test file is required".to_string(),
            ));
        }

        self.warmup().await?;

        let mut metrics = MetricsCollector::new();
        metrics.start();

        for iteration in 0..self.config.iterations {
            tracing::debug!(iteration, "starting iteration");
            for test in &self.config.tests {
                let outcome = self.run_single_test(test).await?;
                metrics.record(test, &outcome);
            }
        }

        metrics.stop();
        let snapshot = metrics.snapshot(self.config.iterations);
        tracing::info!(
            exchanges = snapshot.exchanges,
            empty = snapshot.empty_responses,
            "Benchmark finished in {:.5}s",
            snapshot.total_secs
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_zero_iterations_rejected() {
        let runner = BenchmarkRunner::new(BenchmarkConfig {
            iterations: 0,
            tests: vec![PathBuf::from("a.txt")],
            ..Default::default()
        });

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, BenchError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_empty_test_list_rejected() {
        let runner = BenchmarkRunner::new(BenchmarkConfig::default());

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, BenchError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_missing_file_fails_before_connecting() {
        // A connect attempt here would surface as Connect, not TestFile
        let runner = BenchmarkRunner::new(
            BenchmarkConfig {
                tests: vec![PathBuf::from("/nonexistent/vor-bench/test.txt")],
                ..Default::default()
            }
            .pointed_at("127.0.0.1", 1),
        );

        let err = runner
            .run_single_test(Path::new("/nonexistent/vor-bench/test.txt"))
            .await
            .unwrap_err();
        match err {
            BenchError::TestFile { path, source } => {
                assert_eq!(path, PathBuf::from("/nonexistent/vor-bench/test.txt"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
