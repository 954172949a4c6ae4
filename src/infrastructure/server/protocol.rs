//! Wire protocol between the coordination server and attached clients
//!
//! Newline-delimited JSON over loopback TCP. Each request gets exactly one
//! response line. After `subscribed` the connection carries `EventFrame`
//! lines until either side hangs up.

use serde::{Deserialize, Serialize};

use crate::domain::entities::CoordinationSession;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    Subscribe,
    Status,
    Deploy,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum Response {
    Subscribed,
    Status { session: CoordinationSession },
    Queued,
    ShuttingDown,
    Error { message: String },
}

/// One JSON line including the trailing newline
pub fn encode_line<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_request(line: &str) -> serde_json::Result<Request> {
    serde_json::from_str(line.trim())
}

pub fn decode_response(line: &str) -> serde_json::Result<Response> {
    serde_json::from_str(line.trim())
}
