//! Redb-backed identity store.
//!
//! A single record under a fixed key holds the current identity as CBOR.
//! Writes are transactional, so a crash mid-save leaves the previous identity
//! intact.

use std::{path::Path, sync::Arc};

use redb::{Database, TableDefinition};
use tchat_core::{Identity, IdentityStore, StoreError};

/// Table: identity
/// Key: the constant [`CURRENT`]
/// Value: CBOR-encoded Identity
const IDENTITY: TableDefinition<&str, &[u8]> = TableDefinition::new("identity");

const CURRENT: &str = "current";

/// Durable [`IdentityStore`] backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbIdentityStore {
    db: Arc<Database>,
}

impl RedbIdentityStore {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(|e| StoreError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(IDENTITY).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), "identity store opened");
        Ok(Self { db: Arc::new(db) })
    }
}

impl std::fmt::Debug for RedbIdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbIdentityStore").finish_non_exhaustive()
    }
}

impl IdentityStore for RedbIdentityStore {
    fn load(&self) -> Result<Option<Identity>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(IDENTITY).map_err(|e| StoreError::Io(e.to_string()))?;

        match table.get(CURRENT).map_err(|e| StoreError::Io(e.to_string()))? {
            Some(value) => {
                let identity: Identity = ciborium::from_reader(value.value())
                    .map_err(|e| StoreError::Codec(e.to_string()))?;
                Ok(Some(identity))
            },
            None => Ok(None),
        }
    }

    fn save(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(identity, &mut bytes)
            .map_err(|e| StoreError::Codec(e.to_string()))?;

        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let mut table = txn.open_table(IDENTITY).map_err(|e| StoreError::Io(e.to_string()))?;
            table.insert(CURRENT, bytes.as_slice()).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        tracing::debug!(user = %identity.user.username, "identity saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let mut table = txn.open_table(IDENTITY).map_err(|e| StoreError::Io(e.to_string()))?;
            table.remove(CURRENT).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        tracing::debug!("identity cleared");
        Ok(())
    }
}
