use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::bench::{BenchmarkConfig, MockServerConfig};
use crate::error::{BenchError, Result};
use crate::protocol::SearcherHeader;

/// vor-bench - time request/response exchanges against a vor search server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Number of passes over the test files
    #[arg(value_name = "ITERATIONS")]
    pub iterations: u64,

    /// Test files whose lines form the request payload
    #[arg(value_name = "TEST", required = true, num_args = 1..)]
    pub tests: Vec<String>,

    /// Search server host
    #[arg(short = 'H', long, env = "VOR_HOST", default_value = "www.michal")]
    pub host: String,

    /// Search server port
    #[arg(short, long, env = "VOR_PORT", default_value = "6974")]
    pub port: u16,

    /// Searcher user id sent with every request
    #[arg(long, env = "VOR_SEARCHER_USERID", default_value = "3233577")]
    pub userid: u64,

    /// Searcher school id sent with every request
    #[arg(long, env = "VOR_SEARCHER_SCHOOL", default_value = "0")]
    pub school: u64,

    /// Searcher location id sent with every request
    #[arg(long, env = "VOR_SEARCHER_LOCATION", default_value = "0")]
    pub location: u64,

    /// Connect timeout in seconds (0 disables it)
    #[arg(long, env = "VOR_CONNECT_TIMEOUT", default_value = "30")]
    pub connect_timeout: u64,

    /// Send/receive timeout in seconds (0 waits for the server to close)
    #[arg(long, env = "VOR_IO_TIMEOUT", default_value = "0")]
    pub io_timeout: u64,

    /// Unmeasured passes over the test files before the measured ones
    #[arg(short, long, default_value = "0")]
    pub warmup: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Print the report as JSON instead of the summary line
    #[arg(long)]
    pub json: bool,

    /// Print a per-test breakdown after the summary line
    #[arg(long)]
    pub details: bool,

    /// Start an in-process mock search server and benchmark against it
    #[arg(long)]
    pub standalone: bool,

    /// Result lines returned by the mock server per request
    #[arg(long, default_value = "10")]
    pub mock_results: usize,

    /// Simulated mock server search latency in milliseconds
    #[arg(long, default_value = "0")]
    pub mock_latency_ms: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Target
    pub server_host: String,
    pub server_port: u16,
    pub header: SearcherHeader,

    // Run
    pub iterations: u64,
    pub tests: Vec<PathBuf>,
    pub warmup_iterations: u64,

    // Timeouts (seconds, 0 = none)
    pub connect_timeout: u64,
    pub io_timeout: u64,

    // Output
    pub log_level: String,
    pub json_output: bool,
    pub details: bool,

    // Standalone mode
    pub standalone: bool,
    pub mock_results: usize,
    pub mock_latency_ms: u64,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(std::env::args_os())
    }

    /// Build configuration from an explicit argument list (first item is the program name)
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = CliArgs::try_parse_from(args).map_err(|e| match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => BenchError::Usage(e.render().to_string()),
        })?;

        Ok(Config {
            server_host: args.host,
            server_port: args.port,
            header: SearcherHeader {
                userid: args.userid,
                school: args.school,
                location: args.location,
            },
            iterations: args.iterations,
            tests: args.tests.iter().map(|s| expand_tilde(s)).collect(),
            warmup_iterations: args.warmup,
            connect_timeout: args.connect_timeout,
            io_timeout: args.io_timeout,
            log_level: args.log_level,
            json_output: args.json,
            details: args.details,
            standalone: args.standalone,
            mock_results: args.mock_results,
            mock_latency_ms: args.mock_latency_ms,
        })
    }

    /// Validate configuration before any connection is attempted
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(BenchError::InvalidArgument(
                "iterations must be at least 1".to_string(),
            ));
        }

        for test in &self.tests {
            let metadata = std::fs::metadata(test).map_err(|source| BenchError::TestFile {
                path: test.clone(),
                source,
            })?;
            if !metadata.is_file() {
                return Err(BenchError::TestFile {
                    path: test.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "not a regular file",
                    ),
                });
            }
        }

        Ok(())
    }

    /// Runner settings derived from this configuration
    pub fn benchmark_config(&self) -> BenchmarkConfig {
        BenchmarkConfig {
            host: self.server_host.clone(),
            port: self.server_port,
            header: self.header,
            iterations: self.iterations,
            tests: self.tests.clone(),
            connect_timeout_secs: self.connect_timeout,
            io_timeout_secs: self.io_timeout,
            warmup_iterations: self.warmup_iterations,
        }
    }

    /// Mock server settings for standalone mode
    pub fn mock_server_config(&self) -> MockServerConfig {
        MockServerConfig {
            port: 0,
            result_count: self.mock_results,
            latency_ms: self.mock_latency_ms,
        }
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/tests/query.txt");
        assert!(path.to_string_lossy().contains("tests/query.txt"));
        assert!(!path.to_string_lossy().starts_with("~"));

        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_tilde_relative_path() {
        let path = expand_tilde("relative/path");
        assert_eq!(path, PathBuf::from("relative/path"));
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        // Just "~" without slash should not expand
        let path = expand_tilde("~");
        assert_eq!(path, PathBuf::from("~"));
    }

    #[test]
    fn test_positional_arguments() {
        let config = Config::from_args(["vor-bench", "3", "a.txt", "b.txt"]).unwrap();
        assert_eq!(config.iterations, 3);
        assert_eq!(
            config.tests,
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
        );
    }

    #[test]
    fn test_fewer_than_two_arguments_is_usage_error() {
        let err = Config::from_args(["vor-bench", "3"]).unwrap_err();
        assert!(matches!(err, BenchError::Usage(_)));

        let err = Config::from_args(["vor-bench"]).unwrap_err();
        assert!(matches!(err, BenchError::Usage(_)));
    }

    #[test]
    fn test_non_numeric_iterations_is_usage_error() {
        let err = Config::from_args(["vor-bench", "many", "a.txt"]).unwrap_err();
        assert!(matches!(err, BenchError::Usage(_)));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_args([
            "vor-bench",
            "--host",
            "localhost",
            "--port",
            "7000",
            "--userid",
            "42",
            "--school",
            "5",
            "--location",
            "9",
            "--io-timeout",
            "3",
            "--warmup",
            "2",
            "--json",
            "1",
            "a.txt",
        ])
        .unwrap();

        let bench = config.benchmark_config();
        assert_eq!(bench.addr(), "localhost:7000");
        assert_eq!(
            bench.header,
            SearcherHeader {
                userid: 42,
                school: 5,
                location: 9,
            }
        );
        assert_eq!(bench.io_timeout_secs, 3);
        assert_eq!(bench.warmup_iterations, 2);
        assert!(config.json_output);
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let config = Config::from_args(["vor-bench", "0", "a.txt"]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, BenchError::InvalidArgument(_)));
    }

    #[test]
    fn test_validate_rejects_missing_test_file() {
        let config =
            Config::from_args(["vor-bench", "1", "/nonexistent/vor-bench/query.txt"]).unwrap();
        match config.validate().unwrap_err() {
            BenchError::TestFile { path, source } => {
                assert_eq!(path, PathBuf::from("/nonexistent/vor-bench/query.txt"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_rejects_directory() {
        let dir = std::env::temp_dir();
        let config =
            Config::from_args(["vor-bench".to_string(), "1".to_string(), dir.display().to_string()])
                .unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            BenchError::TestFile { .. }
        ));
    }

    #[test]
    fn test_mock_server_config() {
        let config = Config::from_args([
            "vor-bench",
            "--standalone",
            "--mock-results",
            "25",
            "--mock-latency-ms",
            "4",
            "1",
            "a.txt",
        ])
        .unwrap();

        assert!(config.standalone);
        let mock = config.mock_server_config();
        assert_eq!(mock.port, 0);
        assert_eq!(mock.result_count, 25);
        assert_eq!(mock.latency_ms, 4);
    }
}
