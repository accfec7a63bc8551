//! Chat-completion client with multi-endpoint failover.

pub mod chat;
pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod health;
pub mod observability;
pub mod resilience;
pub mod store;

pub use chat::{Conversation, Message, Role};
pub use client::{ChatError, ChatResult, Completion, FailoverClient};
pub use config::ChatConfig;
