//! Accept-side connection handling with backpressure.
//!
//! # Responsibilities
//! - Enforce max_connections via semaphore
//! - Tag every connection with a `ConnectionId` visible to handlers
//! - Log TLS handshake failures, which the server would otherwise drop silently
//!
//! # Design Decisions
//! - Wraps another acceptor (normally `RustlsAcceptor`) so the permit covers the
//!   handshake as well as the HTTP exchange
//! - The permit and tracking guard live inside the stream, so they are released
//!   exactly when the connection is dropped

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum_server::accept::Accept;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tower_http::add_extension::AddExtension;

use crate::net::connection::{ConnectionGuard, ConnectionId, ConnectionTracker};

/// An acceptor that bounds concurrent connections.
///
/// When the limit is reached, new connections wait until a slot becomes available.
#[derive(Debug, Clone)]
pub struct ConnectionLimiter<A> {
    inner: A,
    connection_limit: Arc<Semaphore>,
    tracker: ConnectionTracker,
}

impl<A> ConnectionLimiter<A> {
    pub fn new(inner: A, max_connections: usize, tracker: ConnectionTracker) -> Self {
        Self {
            inner,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            tracker,
        }
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }
}

impl<A, I, S> Accept<I, S> for ConnectionLimiter<A>
where
    A: Accept<I, S> + Clone + Send + 'static,
    A::Future: Send,
    A::Stream: Send,
    A::Service: Send,
    I: Send + 'static,
    S: Send + 'static,
{
    type Stream = TrackedStream<A::Stream>;
    type Service = AddExtension<A::Service, ConnectionId>;
    type Future = Pin<Box<dyn Future<Output = io::Result<(Self::Stream, Self::Service)>> + Send>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let inner = self.inner.clone();
        let limit = Arc::clone(&self.connection_limit);
        let tracker = self.tracker.clone();

        Box::pin(async move {
            // Acquire permit first (backpressure)
            let permit = limit.acquire_owned().await.map_err(io::Error::other)?;
            let guard = tracker.track();
            let id = guard.id();

            match inner.accept(stream, service).await {
                Ok((stream, service)) => Ok((
                    TrackedStream {
                        inner: stream,
                        _permit: permit,
                        _guard: guard,
                    },
                    AddExtension::new(service, id),
                )),
                Err(e) => {
                    tracing::warn!(connection_id = %id, error = %e, "TLS handshake failed");
                    Err(e)
                }
            }
        })
    }
}

/// A client stream holding its connection slot.
#[derive(Debug)]
pub struct TrackedStream<S> {
    inner: S,
    _permit: OwnedSemaphorePermit,
    _guard: ConnectionGuard,
}

impl<S: AsyncRead + Unpin> AsyncRead for TrackedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TrackedStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}
