//! In-memory holder of the current service credential.

use std::sync::{Arc, PoisonError, RwLock};

use super::Credential;
use crate::clock::Clock;

/// Holds at most one credential and hides it once it has expired.
///
/// Reads and writes go through an `RwLock`, so a credential is always replaced
/// as a whole.
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            current: RwLock::new(None),
            clock,
        }
    }

    /// The stored credential, if one exists and `now < expires_at`.
    pub fn get(&self) -> Option<Credential> {
        let now = self.clock.now();
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|credential| credential.is_valid_at(now))
            .cloned()
    }

    /// Replace the stored credential.
    pub fn set(&self, credential: Credential) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    /// Drop the stored credential.
    pub fn invalidate(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
