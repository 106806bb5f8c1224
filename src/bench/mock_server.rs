//! Mock vor search server speaking the line protocol.

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use super::config::MockServerConfig;
use crate::protocol::{SearchRequest, MAX_RESULTS};

/// A request as received by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Bytes read from the socket, up to and including the terminator line
    pub raw: Vec<u8>,
    pub request: SearchRequest,
    /// Whether a terminator line was seen before end of stream
    pub terminated: bool,
}

/// Open connection count and its high-water mark
#[derive(Debug, Default)]
struct ConnectionGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ConnectionGauge {
    fn open(self: &Arc<Self>) -> ConnectionGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ConnectionGuard(self.clone())
    }
}

/// Counts one connection as open until dropped
struct ConnectionGuard(Arc<ConnectionGauge>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock search server for standalone runs and tests
pub struct MockSearchServer {
    config: MockServerConfig,
    shutdown_tx: Option<oneshot::Sender<()>>,
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    connections: Arc<ConnectionGauge>,
}

impl MockSearchServer {
    /// Create a new mock server with the given configuration
    pub fn new(config: MockServerConfig) -> Self {
        Self {
            config,
            shutdown_tx: None,
            port: 0,
            requests: Arc::new(Mutex::new(Vec::new())),
            connections: Arc::new(ConnectionGauge::default()),
        }
    }

    /// Start the mock server and return the actual port
    pub async fn start(&mut self) -> std::io::Result<u16> {
        let addr = format!("127.0.0.1:{}", self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        self.port = port;

        let config = Arc::new(self.config.clone());
        let requests = self.requests.clone();
        let connections = self.connections.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => match accepted {
                        Ok((socket, peer)) => {
                            tracing::trace!(%peer, "mock server accepted connection");
                            let guard = connections.open();
                            let config = config.clone();
                            let requests = requests.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(socket, config, requests).await {
                                    tracing::debug!(%peer, "mock connection failed: {}", e);
                                }
                                drop(guard);
                            });
                        }
                        Err(e) => tracing::warn!("mock server accept failed: {}", e),
                    },
                }
            }
            tracing::debug!("mock server stopped");
        });

        Ok(port)
    }

    /// Get the server's port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the server's `host:port`
    pub fn addr(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Requests received so far, in completion order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// Connections currently being served
    pub fn active_connections(&self) -> usize {
        self.connections.active.load(Ordering::SeqCst)
    }

    /// Most connections ever served at the same time
    pub fn peak_connections(&self) -> usize {
        self.connections.peak.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockSearchServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one request, answer with result ids, close
async fn handle_connection(
    socket: TcpStream,
    config: Arc<MockServerConfig>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    let mut raw = Vec::new();
    let mut request = SearchRequest::default();
    let mut terminated = false;
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        raw.extend_from_slice(&line);

        let text = String::from_utf8_lossy(&line);
        if !request.push_line(text.trim_end_matches(['\n', '\r'])) {
            terminated = true;
            break;
        }
    }

    let perform_search = request.perform_search;
    let count = if perform_search {
        config.result_count.min(MAX_RESULTS)
    } else {
        0
    };

    if let Ok(mut log) = requests.lock() {
        log.push(RecordedRequest {
            raw,
            request,
            terminated,
        });
    }

    if perform_search && config.latency_ms > 0 {
        tokio::time::sleep(tokio::time::Duration::from_millis(config.latency_ms)).await;
    }

    let body = generate_results(count);
    writer.write_all(body.as_bytes()).await?;
    writer.shutdown().await?;

    Ok(())
}

/// One random user id per line
fn generate_results(count: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut body = String::with_capacity(count * 8);

    for _ in 0..count {
        let id: u32 = rng.gen_range(1..10_000_000);
        body.push_str(&id.to_string());
        body.push('\n');
    }

    body
}
