use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database schema version {stored} is newer than supported version {supported}")]
    SchemaTooNew { stored: u32, supported: u32 },

    #[error("database is corrupted: {0}")]
    Corruption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid database name: {0}")]
    InvalidName(String),
}

impl From<heed::Error> for LmdbError {
    fn from(e: heed::Error) -> Self {
        LmdbError::Heed(e.to_string())
    }
}

impl From<LmdbError> for memfs_store::StoreError {
    fn from(e: LmdbError) -> Self {
        use memfs_store::StoreError;
        match e {
            LmdbError::NotFound(key) => StoreError::NotFound(key),
            LmdbError::InvalidName(name) => StoreError::InvalidName(name),
            other => StoreError::Backend(other.to_string()),
        }
    }
}
