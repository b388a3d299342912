//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (connection limit, connection ID)
//!     → tls.rs config (TLS handshake, client certificate check)
//!     → connection.rs (lifecycle tracking)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded connection count prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - TLS is mandatory; client verification depends on configuration

pub mod connection;
pub mod listener;
pub mod tls;
