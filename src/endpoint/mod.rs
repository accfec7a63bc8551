//! Endpoint subsystem.
//!
//! # Data Flow
//! ```text
//! config endpoints.urls
//!     → list.rs (dedupe, priority order, preferred-first attempt order)
//!
//! every attempt outcome
//!     → history.rs (succeeded flag, response time, counters)
//!     → persisted by the failover client
//! ```

pub mod history;
pub mod list;

pub use history::{ConnectionHistory, EndpointRecord};
pub use list::EndpointList;
