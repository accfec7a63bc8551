//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ChatConfig (validated, immutable)
//!     → shared via Arc with the failover client
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; per-call timeouts are derived values
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ChatConfig;
pub use schema::BackoffConfig;
pub use schema::EndpointsConfig;
pub use schema::ModelConfig;
pub use schema::ProbeConfig;
pub use schema::RetryConfig;
pub use schema::TimeoutConfig;
