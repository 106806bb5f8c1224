//! Configuration structs for benchmarking.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::SearcherHeader;

/// Configuration for the mock search server
#[derive(Debug, Clone)]
pub struct MockServerConfig {
    /// Port to listen on (0 for random)
    pub port: u16,
    /// Number of result lines returned per request (capped at 1000)
    pub result_count: usize,
    /// Simulated search latency in milliseconds
    pub latency_ms: u64,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            result_count: 10,
            latency_ms: 0,
        }
    }
}

/// Configuration for a benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Search server host
    pub host: String,
    /// Search server port
    pub port: u16,
    /// Searcher identity sent ahead of every payload
    pub header: SearcherHeader,
    /// Passes over the test list
    pub iterations: u64,
    /// Test files, in the order they are sent within a pass
    pub tests: Vec<PathBuf>,
    /// Connect timeout in seconds (0 disables it)
    pub connect_timeout_secs: u64,
    /// Send/receive timeout in seconds (0 disables it)
    pub io_timeout_secs: u64,
    /// Unmeasured passes before the measured ones
    pub warmup_iterations: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            host: "www.michal".to_string(),
            port: 6974,
            header: SearcherHeader::default(),
            iterations: 1,
            tests: Vec::new(),
            connect_timeout_secs: 30,
            io_timeout_secs: 0,
            warmup_iterations: 0,
        }
    }
}

impl BenchmarkConfig {
    /// Same run, pointed at another server (used for standalone mode)
    pub fn pointed_at(self, host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..self
        }
    }

    /// `host:port` string handed to the resolver
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        secs_or_none(self.connect_timeout_secs)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        secs_or_none(self.io_timeout_secs)
    }
}

fn secs_or_none(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.addr(), "www.michal:6974");
        assert_eq!(config.header.userid, 3233577);
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.io_timeout(), None);
    }

    #[test]
    fn test_pointed_at_keeps_run_settings() {
        let config = BenchmarkConfig {
            iterations: 5,
            tests: vec![PathBuf::from("a.txt")],
            ..Default::default()
        }
        .pointed_at("127.0.0.1", 4000);

        assert_eq!(config.addr(), "127.0.0.1:4000");
        assert_eq!(config.iterations, 5);
        assert_eq!(config.tests, vec![PathBuf::from("a.txt")]);
    }
}
