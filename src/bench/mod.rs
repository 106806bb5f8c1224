//! Benchmark module for vor search server performance testing.
//!
//! This module provides:
//! - Sequential benchmark runner (one TCP exchange per test file per iteration)
//! - HdrHistogram-based timing collection
//! - Report generation
//! - Mock search server for standalone runs

pub mod config;
pub mod metrics;
pub mod mock_server;
pub mod report;
pub mod runner;

pub use config::{BenchmarkConfig, MockServerConfig};
pub use metrics::{ExchangeOutcome, MetricsCollector, MetricsSnapshot};
pub use mock_server::{MockSearchServer, RecordedRequest};
pub use report::BenchmarkReport;
pub use runner::{BenchmarkRunner, WarningSink};
