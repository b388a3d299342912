//! Backend connector subsystem.
//!
//! # Data Flow
//! ```text
//! Buffered request from the HTTP layer
//!     → client.rs (rewrite target, pick pooled connection)
//!     → connector.rs (dial the Unix socket when the pool is empty)
//!     → backend answers over HTTP/1.1
//!     → client.rs (buffer response, or reset pool on failure)
//! ```
//!
//! # Design Decisions
//! - Exactly one backend socket per connector; the pool never mixes targets
//! - Connections are created lazily and reused across requests
//! - Any transport failure discards every idle connection

pub mod client;
pub mod connector;

pub use client::{BackendConnector, BackendError};
pub use connector::{UnixConnection, UnixConnector};
