//! Request identification and logging.
//!
//! # Responsibilities
//! - Generate a unique request ID for log correlation
//! - Render a buffered request as raw HTTP/1.1 text for the request log
//!
//! # Design Decisions
//! - The request ID is never injected into the forwarded request
//! - Non-UTF-8 header values and bodies are rendered lossily

use bytes::Bytes;
use hyper::Request;
use std::fmt::Write;
use uuid::Uuid;

/// Unique identifier for one proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Render the request line, headers and body exactly as received.
pub fn render_request(request: &Request<Bytes>) -> String {
    let mut out = String::with_capacity(128 + request.body().len());
    let _ = write!(
        out,
        "{} {} {:?}\r\n",
        request.method(),
        request.uri(),
        request.version()
    );
    super::write_headers(&mut out, request.headers());
    out.push_str(&String::from_utf8_lossy(request.body()));
    out
}
