// Error handling module
// Defines the error taxonomy shared by the config layer and the runner

use std::path::PathBuf;
use thiserror::Error;

/// Phase of a single exchange, used to tag I/O failures and timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Send,
    Receive,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Connect => write!(f, "connect"),
            Phase::Send => write!(f, "send"),
            Phase::Receive => write!(f, "receive"),
        }
    }
}

/// Errors that can abort a benchmark run
#[derive(Error, Debug)]
pub enum BenchError {
    /// Command line could not be parsed
    #[error("{0}")]
    Usage(String),

    /// Argument parsed but is not usable (e.g. zero iterations)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Test file missing or unreadable
    #[error("Cannot read test file {}: {source}", .path.display())]
    TestFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TCP connection could not be established
    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Socket failure after the connection was established
    #[error("I/O error during {phase} with {addr}: {source}")]
    Io {
        addr: String,
        phase: Phase,
        #[source]
        source: std::io::Error,
    },

    /// A phase exceeded its configured timeout
    #[error("Timed out during {phase} with {addr}")]
    Timeout { addr: String, phase: Phase },
}

impl BenchError {
    /// True for every failure on the network side of an exchange
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            BenchError::Connect { .. } | BenchError::Io { .. } | BenchError::Timeout { .. }
        )
    }
}

/// Result type alias for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_messages() {
        let err = BenchError::InvalidArgument("iterations must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid argument: iterations must be at least 1"
        );

        let err = BenchError::Timeout {
            addr: "www.michal:6974".to_string(),
            phase: Phase::Receive,
        };
        assert_eq!(err.to_string(), "Timed out during receive with www.michal:6974");
    }

    #[test]
    fn test_test_file_error_message() {
        let err = BenchError::TestFile {
            path: PathBuf::from("/tmp/missing.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert_eq!(
            err.to_string(),
            "Cannot read test file /tmp/missing.txt: No such file or directory"
        );
    }

    #[test]
    fn test_connection_error_grouping() {
        let refused = BenchError::Connect {
            addr: "127.0.0.1:1".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(refused.is_connection_error());

        let reset = BenchError::Io {
            addr: "127.0.0.1:1".to_string(),
            phase: Phase::Send,
            source: io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        };
        assert!(reset.is_connection_error());
        assert_eq!(
            reset.to_string(),
            "I/O error during send with 127.0.0.1:1: reset"
        );

        assert!(!BenchError::Usage("usage".to_string()).is_connection_error());
    }

    #[test]
    fn test_source_is_preserved() {
        use std::error::Error as _;

        let err = BenchError::Connect {
            addr: "localhost:6974".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), "refused");
    }
}
