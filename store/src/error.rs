use thiserror::Error;

use crate::AdapterState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("block not found: {0}")]
    NotFound(String),

    #[error("failed to open database: {0}")]
    Open(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("database deletion blocked: {0}")]
    Blocked(String),

    #[error("{operation} called while the store is {state}")]
    InvalidState {
        operation: &'static str,
        state: AdapterState,
    },

    #[error("invalid block id: {0}")]
    InvalidBlockId(String),

    #[error("invalid database name: {0}")]
    InvalidName(String),
}

impl StoreError {
    /// The requested block has no record. Callers treat this as an expected
    /// condition, not a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// The engine failed while opening, accessing or destroying the database.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            StoreError::Open(_) | StoreError::Backend(_) | StoreError::Blocked(_)
        )
    }

    /// The caller violated a precondition (wrong lifecycle state or a
    /// malformed id/name). Never worth retrying.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidState { .. }
                | StoreError::InvalidBlockId(_)
                | StoreError::InvalidName(_)
        )
    }
}
