//! Conversation types and the chat-completion wire format.

pub mod message;
pub mod wire;

pub use message::{Conversation, Message, Role};
