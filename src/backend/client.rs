//! Pooled HTTP client bound to the backend socket.
//!
//! # Responsibilities
//! - Forward a buffered request to the backend and buffer its response
//! - Reuse idle connections between requests
//! - Drop every idle connection after a transport failure
//!
//! # Design Decisions
//! - The pool lives inside the client; invalidation swaps in a fresh client so
//!   idle connections die with the old pool while in-flight calls finish on the
//!   handle they already hold
//! - Every failure is reported as one error type; callers do not distinguish
//!   dial, write and read failures

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{HeaderValue, CONTENT_LENGTH, TRANSFER_ENCODING};
use hyper::http::uri::PathAndQuery;
use hyper::{Request, Response, Uri, Version};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::backend::connector::UnixConnector;
use crate::config::BackendConfig;
use crate::observability::metrics;

/// Authority written into backend request targets. The connector ignores it.
pub const BACKEND_AUTHORITY: &str = "localhost";

type PooledClient = Client<UnixConnector, Full<Bytes>>;

/// Failure while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Dial, write or read failed.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The response body exceeded the configured limit.
    #[error("backend response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The request target could not be rewritten for the backend.
    #[error("invalid request target: {0}")]
    InvalidRequest(String),
}

/// Forwards requests to a single Unix socket over pooled connections.
pub struct BackendConnector {
    connector: UnixConnector,
    client: ArcSwap<PooledClient>,
    max_body_size: usize,
    pool_idle_per_host: usize,
    /// Number of times the pool has been discarded.
    generation: AtomicU64,
}

impl BackendConnector {
    /// Create a connector for the configured socket. Nothing is dialed yet.
    pub fn new(config: &BackendConfig) -> Self {
        let connector = UnixConnector::new(config.socket_path.clone());
        let client = build_client(connector.clone(), config.pool_idle_per_host);
        Self {
            connector,
            client: ArcSwap::from_pointee(client),
            max_body_size: config.max_body_size,
            pool_idle_per_host: config.pool_idle_per_host,
            generation: AtomicU64::new(0),
        }
    }

    pub fn socket_path(&self) -> &Path {
        self.connector.socket_path()
    }

    /// True when the backend socket file exists.
    pub fn is_available(&self) -> bool {
        self.socket_path().exists()
    }

    /// How many times idle connections have been discarded.
    pub fn pool_generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Forward a request and return the backend's response unmodified.
    ///
    /// On any failure the idle pool is discarded before the error is returned.
    pub async fn forward(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BackendError> {
        let result = self.send(request).await;
        if let Err(ref e) = result {
            tracing::warn!(
                socket = %self.socket_path().display(),
                error = %e,
                "Backend call failed, closing idle connections"
            );
            metrics::record_backend_error();
            self.close_idle_connections();
        }
        result
    }

    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BackendError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = backend_uri(&parts.uri)?;
        parts.version = Version::HTTP_11;

        // Hold our own handle so a concurrent reset cannot pull the pool away
        // mid-request.
        let client = self.client.load_full();
        let response = client
            .request(Request::from_parts(parts, Full::new(body)))
            .await
            .map_err(|e| BackendError::Unavailable(error_chain(&e)))?;

        let (mut parts, body) = response.into_parts();
        let collected = Limited::new(body, self.max_body_size)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    BackendError::BodyTooLarge {
                        limit: self.max_body_size,
                    }
                } else {
                    BackendError::Unavailable(error_chain(e.as_ref()))
                }
            })?;
        let body = collected.to_bytes();

        // The body is whole now; chunked framing would clash with the length
        // the server writes.
        if parts.headers.remove(TRANSFER_ENCODING).is_some() {
            parts
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        Ok(Response::from_parts(parts, body))
    }

    /// Discard all idle pooled connections.
    ///
    /// Safe to call concurrently with `forward`; the worst case is dropping a
    /// connection another caller could have reused.
    pub fn close_idle_connections(&self) {
        self.client.store(Arc::new(build_client(
            self.connector.clone(),
            self.pool_idle_per_host,
        )));
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_pool_reset();
        tracing::debug!(generation, "Backend connection pool reset");
    }
}

impl std::fmt::Debug for BackendConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConnector")
            .field("socket_path", &self.socket_path())
            .field("max_body_size", &self.max_body_size)
            .field("generation", &self.pool_generation())
            .finish()
    }
}

fn build_client(connector: UnixConnector, pool_idle_per_host: usize) -> PooledClient {
    Client::builder(TokioExecutor::new())
        .pool_max_idle_per_host(pool_idle_per_host)
        .build(connector)
}

/// Rewrite an origin-form target into the absolute form the pool needs.
fn backend_uri(original: &Uri) -> Result<Uri, BackendError> {
    let path_and_query = original
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    Uri::builder()
        .scheme("http")
        .authority(BACKEND_AUTHORITY)
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| BackendError::InvalidRequest(e.to_string()))
}

/// Render an error with its sources, e.g. `client error (Connect): dial unix ...`.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
