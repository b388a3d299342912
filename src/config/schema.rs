//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default location of the container engine socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

/// Root configuration for the socket proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (address, connection limit).
    pub listener: ListenerConfig,

    /// Server identity and client verification material.
    pub tls: TlsConfig,

    /// The local socket requests are forwarded to.
    pub backend: BackendConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Listen URL (e.g., "http://0.0.0.0:6058").
    ///
    /// The socket is always TLS-terminated; the scheme only matters for the
    /// redirect warning emitted at startup.
    pub address: String,

    /// Maximum concurrent inbound connections.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "http://0.0.0.0:6058".to_string(),
            max_connections: 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,

    /// Trust anchor used to verify client certificates (PEM).
    pub ca_path: Option<PathBuf>,

    /// Reject clients that do not present a certificate signed by `ca_path`.
    pub verify_peer: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("/opt/sockgate/ssl/server.pem"),
            key_path: PathBuf::from("/opt/sockgate/ssl/server-key.pem"),
            ca_path: Some(PathBuf::from("/opt/sockgate/ssl/ca.pem")),
            verify_peer: true,
        }
    }
}

/// Backend socket configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Unix domain socket the proxy forwards to.
    pub socket_path: PathBuf,

    /// Largest request or response body buffered for a single call.
    pub max_body_size: usize,

    /// Idle connections kept in the pool for reuse.
    pub pool_idle_per_host: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            max_body_size: 256 * 1024 * 1024, // 256MB, image loads can be large
            pool_idle_per_host: 32,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
