//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Raw request and response dumps are logged at INFO for traceability
//! - Request ID flows through the request span, never into forwarded headers
//! - Metrics are cheap (no-op until a recorder is installed)

pub mod logging;
pub mod metrics;
