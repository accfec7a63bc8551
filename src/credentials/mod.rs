//! Credential loading and rotation.
//!
//! # Data Flow
//! ```text
//! credential file (one token per line)
//!     → parse_credentials (prefix filter, dedupe)
//!     → store key allAPIKeys (rotation list, when more than one)
//!     → CredentialRing (round-robin on authorization failure)
//! ```

pub mod ring;

use std::fmt;
use std::path::Path;

use crate::client::types::{ChatError, ChatResult};
use crate::store::{self, keys, KeyValueStore};

pub use ring::CredentialRing;

/// A bearer token. Debug output is redacted.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form safe for logs, e.g. `sk-a…wxyz`.
    pub fn redacted(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.redacted()).finish()
    }
}

/// Extract credentials from line-oriented text.
///
/// Lines are trimmed; only those starting with `prefix` are kept, in order,
/// without duplicates.
pub fn parse_credentials(text: &str, prefix: &str) -> Vec<Credential> {
    let mut out: Vec<Credential> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.starts_with(prefix) && !out.iter().any(|c| c.as_str() == line) {
            out.push(Credential::new(line));
        }
    }
    out
}

/// Load credentials, preferring a rotation list already in the store.
///
/// When read from the file and more than one credential is found, the list
/// is written to the store for later sessions.
pub fn load_credentials(
    path: &Path,
    prefix: &str,
    store: &dyn KeyValueStore,
) -> ChatResult<Vec<Credential>> {
    match store::load_json::<Vec<String>>(store, keys::ROTATED_CREDENTIALS) {
        Ok(Some(saved)) => {
            let creds: Vec<Credential> = saved
                .into_iter()
                .filter(|t| t.starts_with(prefix))
                .map(Credential::new)
                .collect();
            if !creds.is_empty() {
                tracing::info!(count = creds.len(), "Loaded credentials from store");
                return Ok(creds);
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable stored credential list"),
    }

    let text = std::fs::read_to_string(path).map_err(|e| {
        ChatError::Precondition(format!("cannot read credential file {}: {}", path.display(), e))
    })?;
    let creds = parse_credentials(&text, prefix);
    if creds.is_empty() {
        return Err(ChatError::Precondition(format!(
            "no credential starting with '{}' found in {}",
            prefix,
            path.display()
        )));
    }

    if creds.len() > 1 {
        let raw: Vec<&str> = creds.iter().map(Credential::as_str).collect();
        if let Err(e) = store::save_json(store, keys::ROTATED_CREDENTIALS, &raw) {
            tracing::warn!(error = %e, "Failed to persist credential rotation list");
        }
        tracing::info!(count = creds.len(), "Loaded credentials, rotation enabled");
    } else {
        tracing::info!("Loaded credential from file");
    }
    Ok(creds)
}
