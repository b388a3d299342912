//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Check that the backend socket exists
//! - Parse and resolve the listen address
//! - Load TLS material
//!
//! # Design Decisions
//! - Fail fast: any startup error is returned before a socket is bound
//! - The caller decides whether an error terminates the process

use std::path::PathBuf;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;

use crate::backend::BackendConnector;
use crate::config::{validate_config, AddressError, ConfigError, ListenAddress, ProxyConfig};
use crate::http::{AppState, ProxyServer};
use crate::net::tls::{load_server_config, TlsError};

/// Fatal startup failure.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("backend socket file does not exist: {}", .0.display())]
    SocketMissing(PathBuf),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// Run every pre-flight check and build a server ready to listen.
pub fn prepare(config: ProxyConfig) -> Result<ProxyServer, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    let backend = BackendConnector::new(&config.backend);
    if !backend.is_available() {
        return Err(StartupError::SocketMissing(config.backend.socket_path));
    }

    let address = ListenAddress::parse(&config.listener.address)?;
    if address.is_https() {
        tracing::warn!(
            address = %address,
            "Proxy does not follow https redirects, use an http listen address instead"
        );
    }
    let bind_addr = address.resolve()?;

    let tls = RustlsConfig::from_config(load_server_config(&config.tls)?);

    tracing::info!(
        bind_address = %bind_addr,
        socket = %config.backend.socket_path.display(),
        max_connections = config.listener.max_connections,
        "Configuration loaded"
    );

    Ok(ProxyServer::new(
        address,
        bind_addr,
        tls,
        AppState {
            backend: Arc::new(backend),
            max_body_size: config.backend.max_body_size,
        },
        config.listener.max_connections,
    ))
}
