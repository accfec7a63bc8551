//! Connectivity checking subsystem.
//!
//! # Data Flow
//! ```text
//! Start-up pre-test (active.rs):
//!     CLI `pretest` / `diagnose`
//!     → HEAD each well-known URL until one answers
//!
//! Probes (probe.rs):
//!     Consecutive failures exceed threshold
//!     → spawn GETs to unrelated hosts, results ignored
//! ```
//!
//! # Design Decisions
//! - Neither check influences endpoint selection
//! - Probes are spawned, never awaited by the failover loop

pub mod active;
pub mod probe;

pub use active::pretest_connectivity;
pub use probe::fire_probes;
