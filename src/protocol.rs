//! Line protocol spoken with the vor search server.
//!
//! A request is a sequence of newline-terminated lines: the three searcher
//! header lines, the payload lines, then the `END` terminator. The server
//! answers with any number of lines and closes the connection.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Line that ends a request
pub const TERMINATOR: &str = "END";

/// The server never returns more results than this for one search
pub const MAX_RESULTS: usize = 1000;

/// Request keys that make the server run a search
const SEARCH_KEYS: &[&str] = &[
    "min_age",
    "max_age",
    "sex",
    "name",
    "interest",
    "location",
    "school",
    "sexuality",
    "with_picture",
    "single",
    "birthday",
    "online",
    "new_users",
    "active_recently",
    "might_know",
];

/// Identity of the searcher, sent ahead of every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearcherHeader {
    pub userid: u64,
    pub school: u64,
    pub location: u64,
}

impl Default for SearcherHeader {
    fn default() -> Self {
        Self {
            userid: 3233577,
            school: 0,
            location: 0,
        }
    }
}

impl SearcherHeader {
    /// The three header lines, without line endings
    pub fn lines(&self) -> [String; 3] {
        [
            format!("searcher_userid {}", self.userid),
            format!("searcher_school {}", self.school),
            format!("searcher_location {}", self.location),
        ]
    }
}

/// Split a test file into its lines.
///
/// Line content is kept byte for byte. Only the `\n` separators are removed,
/// and a trailing newline does not produce an extra empty line.
pub fn payload_lines(payload: &[u8]) -> Vec<&[u8]> {
    if payload.is_empty() {
        return Vec::new();
    }
    let body = payload.strip_suffix(b"\n").unwrap_or(payload);
    body.split(|&b| b == b'\n').collect()
}

/// Encode a full request: header lines, payload lines, terminator
pub fn encode_request(header: &SearcherHeader, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 96);

    for line in header.lines() {
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
    }
    for line in payload_lines(payload) {
        buf.extend_from_slice(line);
        buf.push(b'\n');
    }
    buf.extend_from_slice(TERMINATOR.as_bytes());
    buf.push(b'\n');

    buf
}

/// What came back from the server for one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseSummary {
    pub lines: u64,
    pub bytes: u64,
}

/// Read response lines until end of stream.
///
/// A final line without a trailing newline still counts.
pub async fn read_response<R>(reader: &mut R) -> std::io::Result<ResponseSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ResponseSummary::default();
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            break;
        }
        summary.lines += 1;
        summary.bytes += n as u64;
    }

    Ok(summary)
}

/// A request as seen from the server side
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub searcher_userid: Option<u64>,
    pub searcher_school: Option<u64>,
    pub searcher_location: Option<u64>,
    /// Every other line, in arrival order
    pub params: Vec<String>,
    /// Set by the searcher header or any search key; without it nothing is returned
    pub perform_search: bool,
}

impl SearchRequest {
    /// Feed one request line (without its line ending).
    ///
    /// Returns `false` once a terminator (`end`, `quit` or `exit`, any case)
    /// has been seen and the request is complete.
    pub fn push_line(&mut self, line: &str) -> bool {
        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or("").to_lowercase();
        let value = tokens.next().and_then(|v| v.parse().ok());

        match key.as_str() {
            "end" | "quit" | "exit" => return false,
            "searcher_userid" => {
                self.searcher_userid = value;
                self.perform_search = true;
            }
            "searcher_school" => {
                self.searcher_school = value;
                self.perform_search = true;
            }
            "searcher_location" => {
                self.searcher_location = value;
                self.perform_search = true;
            }
            _ => {
                self.perform_search |= SEARCH_KEYS.contains(&key.as_str());
                self.params.push(line.to_string());
            }
        }

        true
    }

    /// Header values, if all three were sent
    pub fn header(&self) -> Option<SearcherHeader> {
        Some(SearcherHeader {
            userid: self.searcher_userid?,
            school: self.searcher_school?,
            location: self.searcher_location?,
        })
    }
}
