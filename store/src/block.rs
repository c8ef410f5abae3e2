//! Block storage trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AdapterState, StoreError};

/// Longest block id accepted by any backend, in bytes. Matches the default
/// key limit of the embedded engines memfs runs on.
pub const MAX_BLOCK_ID_LEN: usize = 511;

/// Summary of one stored block.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    /// Block id.
    pub key: String,
    /// Payload length in bytes at the time of listing.
    pub size: u64,
}

/// Capability contract between the file-system layer and a backing store.
///
/// Lifecycle methods take `&mut self`, so block operations on the same
/// instance can never overlap with `setup` or `dispose`. Block operations are
/// only valid in [`AdapterState::Ready`] and fail with
/// [`StoreError::InvalidState`] otherwise, without touching the engine.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Open (creating if absent) the underlying database.
    async fn setup(&mut self) -> Result<(), StoreError>;

    /// Irreversibly destroy the underlying database and every block in it.
    async fn dispose(&mut self) -> Result<(), StoreError>;

    /// Read the payload stored under `id`.
    async fn read(&self, id: &str) -> Result<Vec<u8>, StoreError>;

    /// Create or overwrite the block `id`.
    async fn write(&self, id: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Remove the block `id`. Removing a missing block succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// List every stored block with its current size, in no particular order.
    async fn block_refs(&self) -> Result<Vec<BlockRef>, StoreError>;

    /// Current lifecycle state.
    fn state(&self) -> AdapterState;
}

/// Reject ids no backend can store.
pub fn validate_block_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() {
        return Err(StoreError::InvalidBlockId("id is empty".to_string()));
    }
    if id.len() > MAX_BLOCK_ID_LEN {
        return Err(StoreError::InvalidBlockId(format!(
            "id is {} bytes, limit is {}",
            id.len(),
            MAX_BLOCK_ID_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_is_rejected() {
        let err = validate_block_id("").unwrap_err();
        assert!(matches!(err, StoreError::InvalidBlockId(_)));
    }

    #[test]
    fn id_at_limit_is_accepted() {
        let id = "k".repeat(MAX_BLOCK_ID_LEN);
        assert!(validate_block_id(&id).is_ok());
        assert!(validate_block_id(&format!("{id}k")).is_err());
    }

    #[test]
    fn multibyte_ids_count_bytes() {
        // 256 two-byte chars = 512 bytes
        let id = "é".repeat(256);
        assert!(validate_block_id(&id).is_err());
    }
}
