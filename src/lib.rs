//! Mutual-TLS reverse proxy for a local container engine socket.

pub mod backend;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use backend::{BackendConnector, BackendError};
pub use config::schema::ProxyConfig;
pub use http::ProxyServer;
pub use lifecycle::{prepare, Shutdown, StartupError};
