//! Completion client subsystem.
//!
//! # Data Flow
//! ```text
//! Conversation
//!     → failover.rs (attempt order, budget, rotation, backoff, persistence)
//!     → transport.rs (one POST with deadline, outcome classification)
//!     → Completion or ChatError
//! ```

pub mod failover;
pub mod transport;
pub mod types;

pub use failover::FailoverClient;
pub use types::{ChatError, ChatResult, Completion};
