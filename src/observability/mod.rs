//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Failover client produces:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → spans.rs (one span per call with a request id)
//! ```
//!
//! # Design Decisions
//! - Request id flows through every attempt log via the span
//! - Metrics go through the `metrics` facade; no-op without a recorder

pub mod logging;
pub mod metrics;
pub mod spans;
