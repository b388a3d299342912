//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection (net layer)
//!     → server.rs (Axum router, body buffering)
//!     → request.rs (request ID, raw request log)
//!     → backend connector (forward over Unix socket)
//!     → response.rs (raw response log, error → 403)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

use hyper::HeaderMap;

pub use request::RequestId;
pub use server::{AppState, ProxyServer};

/// Append `name: value\r\n` lines followed by the blank separator line.
fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        out.push_str(name.as_str());
        out.push_str(": ");
        out.push_str(&String::from_utf8_lossy(value.as_bytes()));
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
}
