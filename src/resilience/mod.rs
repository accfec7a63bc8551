//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Completion attempt:
//!     → timeouts.rs (per-attempt request/connect deadline, adaptive factor)
//!     → On failure: FailureKind from the error
//!     → retries.rs (count against budget, or free credential rotation)
//!     → backoff.rs (delay chosen by failure kind)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a hard deadline
//! - Timeouts are computed per attempt from immutable config, never mutated in place
//! - Authorization failures rotate credentials instead of spending budget

pub mod backoff;
pub mod retries;
pub mod timeouts;

use std::fmt;

/// Retryable failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Attempt exceeded its deadline.
    Timeout,
    /// HTTP 429.
    RateLimited,
    /// HTTP 401.
    Unauthorized,
    /// Connection could not be established or broke mid-request.
    NetworkUnreachable,
    /// Any other non-success HTTP status.
    Http,
}

impl FailureKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::NetworkUnreachable => "network_unreachable",
            FailureKind::Http => "http_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
