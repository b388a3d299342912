//! Client connection bookkeeping.
//!
//! Each accepted connection gets an id for log correlation and stays counted
//! until its stream is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::observability::metrics;

/// Identifies one client connection in logs and request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Counters {
    issued: AtomicU64,
    open: AtomicU64,
}

/// Counts client connections. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    counters: Arc<Counters>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accepted connection. It is counted until the guard drops.
    pub fn track(&self) -> ConnectionGuard {
        let id = ConnectionId(self.counters.issued.fetch_add(1, Ordering::Relaxed) + 1);
        let open = self.counters.open.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::connection_opened();
        tracing::debug!(connection_id = %id, open, "Connection opened");

        ConnectionGuard {
            counters: Arc::clone(&self.counters),
            id,
            opened_at: Instant::now(),
        }
    }

    /// Connections currently open.
    pub fn active_count(&self) -> u64 {
        self.counters.open.load(Ordering::SeqCst)
    }

    /// Connections accepted since the tracker was created.
    pub fn total_count(&self) -> u64 {
        self.counters.issued.load(Ordering::Relaxed)
    }
}

/// Keeps one connection counted while alive.
#[derive(Debug)]
pub struct ConnectionGuard {
    counters: Arc<Counters>,
    id: ConnectionId,
    opened_at: Instant,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counters.open.fetch_sub(1, Ordering::SeqCst);
        metrics::connection_closed();
        tracing::debug!(
            connection_id = %self.id,
            duration_ms = self.opened_at.elapsed().as_millis() as u64,
            "Connection closed"
        );
    }
}
