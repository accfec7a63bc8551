//! Persistent key-value store for connection preferences.
//!
//! # Data Flow
//! ```text
//! failover client
//!     → keys.rs (well-known key names)
//!     → load_json / save_json (typed JSON values)
//!     → KeyValueStore (memory.rs or file.rs)
//! ```
//!
//! # Design Decisions
//! - Values are JSON strings, matching browser local storage semantics
//! - The store is a collaborator; callers treat write failures as best effort
//! - Trait is synchronous; critical sections never span an await

pub mod file;
pub mod keys;
pub mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors raised by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: String) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Read and decode a JSON value.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> StoreResult<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON value.
pub fn save_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> StoreResult<()> {
    store.set(key, serde_json::to_string(value)?)
}
