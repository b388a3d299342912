//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum router that sends every path and method to the backend
//! - Buffer request bodies so the full raw request can be logged
//! - Translate backend failures into `403 Forbidden`
//! - Serve over TLS with connection limits and graceful shutdown

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use axum_server::Handle;
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::backend::BackendConnector;
use crate::config::ListenAddress;
use crate::http::request::{render_request, RequestId};
use crate::http::response::{forbidden, render_response, text_response};
use crate::lifecycle::shutdown::ShutdownListener;
use crate::net::connection::{ConnectionId, ConnectionTracker};
use crate::net::listener::ConnectionLimiter;
use crate::observability::metrics;

/// How long in-flight connections may run after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendConnector>,
    /// Largest request body accepted from a client.
    pub max_body_size: usize,
}

/// A fully prepared, not yet listening proxy.
///
/// Built by [`crate::lifecycle::startup::prepare`], which performs all
/// fail-fast checks; `run` only binds and serves.
pub struct ProxyServer {
    address: ListenAddress,
    bind_addr: SocketAddr,
    tls: RustlsConfig,
    state: AppState,
    max_connections: usize,
    tracker: ConnectionTracker,
    handle: Handle,
}

impl ProxyServer {
    pub(crate) fn new(
        address: ListenAddress,
        bind_addr: SocketAddr,
        tls: RustlsConfig,
        state: AppState,
        max_connections: usize,
    ) -> Self {
        Self {
            address,
            bind_addr,
            tls,
            state,
            max_connections,
            tracker: ConnectionTracker::new(),
            handle: Handle::new(),
        }
    }

    /// Handle for discovering the bound address or stopping the server.
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    pub fn backend(&self) -> Arc<BackendConnector> {
        Arc::clone(&self.state.backend)
    }

    pub fn connections(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Bind and serve until `shutdown` fires, then drain connections.
    pub async fn run(self, shutdown: ShutdownListener) -> std::io::Result<()> {
        let handle = self.handle.clone();
        let address = self.address.clone();
        let socket = self.state.backend.socket_path().display().to_string();
        tokio::spawn(async move {
            if let Some(local_addr) = handle.listening().await {
                tracing::info!(
                    address = %local_addr,
                    configured = %address,
                    backend = %socket,
                    "Proxy listening"
                );
            }
            if !shutdown.wait().await {
                return;
            }
            tracing::info!("Shutdown requested, draining connections");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        let acceptor = ConnectionLimiter::new(
            RustlsAcceptor::new(self.tls),
            self.max_connections,
            self.tracker.clone(),
        );
        let app = build_router(self.state).into_make_service_with_connect_info::<SocketAddr>();

        axum_server::bind(self.bind_addr)
            .acceptor(acceptor)
            .handle(self.handle)
            .serve(app)
            .await?;

        tracing::info!(connections = self.tracker.total_count(), "Proxy stopped");
        Ok(())
    }
}

/// Build the router. Every path and method goes to the backend.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = RequestId::new();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let connection_id = request
        .extensions()
        .get::<ConnectionId>()
        .map(ConnectionId::as_u64);

    let span = tracing::info_span!(
        "proxy",
        request_id = %request_id,
        connection_id,
        peer = ?peer,
    );
    forward(state, request).instrument(span).await
}

async fn forward(state: AppState, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let (parts, body) = request.into_parts();

    let body = match Limited::new(body, state.max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let status = if e.downcast_ref::<LengthLimitError>().is_some() {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                StatusCode::BAD_REQUEST
            };
            tracing::warn!(error = %e, "Failed to read request body");
            let request = Request::from_parts(parts, Bytes::new());
            tracing::info!(
                "---Request:---\n{}<body not read: {}>",
                render_request(&request),
                e
            );
            let response = text_response(status, e.to_string());
            tracing::info!("---Response:---\n{}", render_response(&response));
            metrics::record_request(&method, status.as_u16(), start);
            return response.map(Body::from);
        }
    };

    let request = Request::from_parts(parts, body);
    tracing::info!("---Request:---\n{}", render_request(&request));

    let response = match state.backend.forward(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Error when proxying the request");
            forbidden(&e)
        }
    };

    tracing::info!("---Response:---\n{}", render_response(&response));
    metrics::record_request(&method, response.status().as_u16(), start);
    response.map(Body::from)
}
