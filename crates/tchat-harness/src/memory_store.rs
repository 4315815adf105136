//! In-memory identity store.

use std::sync::{Mutex, PoisonError};

use tchat_core::{Identity, IdentityStore, StoreError};

/// [`IdentityStore`] kept in memory, with an optional injected failure.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    identity: Mutex<Option<Identity>>,
    failing: Mutex<Option<StoreError>>,
}

impl MemoryIdentityStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store already holding `identity`, as left by an earlier run.
    pub fn with_identity(identity: Identity) -> Self {
        Self { identity: Mutex::new(Some(identity)), failing: Mutex::new(None) }
    }

    /// Make every following operation fail with `error`.
    pub fn fail_with(&self, error: StoreError) {
        *self.failing.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    /// Identity currently stored, bypassing injected failures.
    pub fn stored(&self) -> Option<Identity> {
        self.identity.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        match self.failing.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<Identity>, StoreError> {
        self.check()?;
        Ok(self.stored())
    }

    fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        self.check()?;
        *self.identity.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.check()?;
        *self.identity.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
