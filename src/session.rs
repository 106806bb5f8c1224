//! One TCP connection per exchange.
//!
//! A `Session` moves linearly through connect, send and receive. Receiving
//! consumes the session, so the socket is closed when the exchange ends on
//! every path, including errors.

use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::{BenchError, Phase, Result};
use crate::protocol::{self, ResponseSummary};

pub struct Session {
    stream: BufReader<TcpStream>,
    addr: String,
    io_timeout: Option<Duration>,
}

impl Session {
    /// Open a connection to `addr` (`host:port`, resolved on each call)
    pub async fn connect(
        addr: &str,
        connect_timeout: Option<Duration>,
        io_timeout: Option<Duration>,
    ) -> Result<Self> {
        tracing::trace!(%addr, "connecting");
        let stream = bounded(addr, Phase::Connect, connect_timeout, TcpStream::connect(addr)).await?;

        Ok(Self {
            stream: BufReader::new(stream),
            addr: addr.to_string(),
            io_timeout,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Write a fully encoded request
    pub async fn send(&mut self, request: &[u8]) -> Result<()> {
        tracing::trace!(addr = %self.addr, bytes = request.len(), "sending request");
        let stream = self.stream.get_mut();
        bounded(&self.addr, Phase::Send, self.io_timeout, async {
            stream.write_all(request).await?;
            stream.flush().await
        })
        .await
    }

    /// Read until the server closes the connection, then drop the socket
    pub async fn receive(mut self) -> Result<ResponseSummary> {
        tracing::trace!(addr = %self.addr, "reading response");
        let summary = bounded(
            &self.addr,
            Phase::Receive,
            self.io_timeout,
            protocol::read_response(&mut self.stream),
        )
        .await?;
        tracing::trace!(addr = %self.addr, lines = summary.lines, "connection closed");
        Ok(summary)
    }
}

/// Run one phase, mapping I/O failures and an optional deadline into `BenchError`
async fn bounded<T, F>(addr: &str, phase: Phase, limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    let result = match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                return Err(BenchError::Timeout {
                    addr: addr.to_string(),
                    phase,
                })
            }
        },
        None => fut.await,
    };

    result.map_err(|source| match phase {
        Phase::Connect => BenchError::Connect {
            addr: addr.to_string(),
            source,
        },
        _ => BenchError::Io {
            addr: addr.to_string(),
            phase,
            source,
        },
    })
}
