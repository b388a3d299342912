//! Unix domain socket connector for the pooled HTTP client.
//!
//! # Responsibilities
//! - Dial the backend socket path regardless of the request URI
//! - Adapt `tokio::net::UnixStream` to hyper's I/O traits
//!
//! # Design Decisions
//! - The request authority is a placeholder; the pool keys on it, so every
//!   connection lands in the same bucket and is reused across requests

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use hyper::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;

/// Dials a single, fixed Unix socket path.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    socket_path: Arc<PathBuf>,
}

impl UnixConnector {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: Arc::new(socket_path.into()),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl tower::Service<Uri> for UnixConnector {
    type Response = UnixConnection;
    type Error = io::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _uri: Uri) -> Self::Future {
        let path = Arc::clone(&self.socket_path);
        Box::pin(async move {
            let stream = UnixStream::connect(path.as_path()).await.map_err(|e| {
                io::Error::new(e.kind(), format!("dial unix {}: {}", path.display(), e))
            })?;
            tracing::debug!(socket = %path.display(), "Backend connection established");
            Ok(UnixConnection::new(stream))
        })
    }
}

/// A connected backend stream.
#[derive(Debug)]
pub struct UnixConnection {
    io: TokioIo<UnixStream>,
}

impl UnixConnection {
    fn new(stream: UnixStream) -> Self {
        Self {
            io: TokioIo::new(stream),
        }
    }
}

impl Connection for UnixConnection {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

impl hyper::rt::Read for UnixConnection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        hyper::rt::Read::poll_read(Pin::new(&mut self.get_mut().io), cx, buf)
    }
}

impl hyper::rt::Write for UnixConnection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        hyper::rt::Write::poll_write(Pin::new(&mut self.get_mut().io), cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        hyper::rt::Write::poll_flush(Pin::new(&mut self.get_mut().io), cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        hyper::rt::Write::poll_shutdown(Pin::new(&mut self.get_mut().io), cx)
    }

    fn is_write_vectored(&self) -> bool {
        hyper::rt::Write::is_write_vectored(&self.io)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        hyper::rt::Write::poll_write_vectored(Pin::new(&mut self.get_mut().io), cx, bufs)
    }
}
