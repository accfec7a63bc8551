//! Round-robin credential rotation.

use crate::credentials::Credential;

/// Fixed list of credentials with an active index.
#[derive(Debug, Clone)]
pub struct CredentialRing {
    credentials: Vec<Credential>,
    active: usize,
}

impl CredentialRing {
    /// Returns `None` for an empty list.
    pub fn new(credentials: Vec<Credential>) -> Option<Self> {
        if credentials.is_empty() {
            return None;
        }
        Some(Self {
            credentials,
            active: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn active(&self) -> &Credential {
        &self.credentials[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Rotate past `failed` and return the new active credential.
    ///
    /// If another call already rotated away from `failed`, the current
    /// active credential is returned unchanged. A single-entry ring returns
    /// `None`.
    pub fn rotate_from(&mut self, failed: &Credential) -> Option<Credential> {
        if self.credentials.len() < 2 {
            return None;
        }
        if self.active() == failed {
            self.active = (self.active + 1) % self.credentials.len();
        }
        Some(self.active().clone())
    }
}
