//! LMDB environment setup and the single-table block operations.
//!
//! Every method here is blocking and runs exactly one LMDB transaction.
//! [`crate::LmdbBlockStore`] moves them onto the blocking thread pool.

use std::path::Path;

use heed::{Env, EnvFlags, EnvOpenOptions};

use memfs_store::{BlockRef, StoreError};

use crate::config::{Durability, StoreConfig};
use crate::migration::{self, BlocksDb, MetaDb, MAX_DBS};
use crate::LmdbError;

/// An open block database: the LMDB environment plus its table handles.
///
/// Cloning is cheap; clones share one environment.
#[derive(Clone)]
pub(crate) struct BlockEnvironment {
    env: Env,
    blocks_db: BlocksDb,
    meta_db: MetaDb,
}

impl BlockEnvironment {
    /// Open or create the database directory at `path` and bring its schema
    /// up to date.
    pub(crate) fn open(path: &Path, config: &StoreConfig) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        let env = open_env(path, config)?;
        let (blocks_db, meta_db) = migration::initialize(&env)?;
        Ok(Self {
            env,
            blocks_db,
            meta_db,
        })
    }

    /// Stored schema version.
    #[cfg(test)]
    pub(crate) fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        migration::read_schema_version(&self.meta_db, &rtxn)
    }

    // ── Block operations ────────────────────────────────────────────────

    pub(crate) fn get(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .blocks_db
            .get(&rtxn, id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(id.to_string()))?;
        Ok(val.to_vec())
    }

    /// Upsert. If the commit fails the transaction aborts and any previous
    /// value stays in place.
    pub(crate) fn put(&self, id: &str, data: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.blocks_db
            .put(&mut wtxn, id, data)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    /// Returns whether a record was removed.
    pub(crate) fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let removed = self
            .blocks_db
            .delete(&mut wtxn, id)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(removed)
    }

    /// All blocks with their sizes, read from a single snapshot.
    pub(crate) fn block_refs(&self) -> Result<Vec<BlockRef>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.blocks_db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut refs = Vec::new();
        for entry in iter {
            let (key, val) = entry.map_err(LmdbError::from)?;
            refs.push(BlockRef {
                key: key.to_string(),
                size: val.len() as u64,
            });
        }
        Ok(refs)
    }

    #[cfg(test)]
    pub(crate) fn block_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.blocks_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }

    pub(crate) fn into_env(self) -> Env {
        self.env
    }

    #[cfg(test)]
    pub(crate) fn set_schema_version(&self, version: u32) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        migration::write_schema_version(&self.meta_db, &mut wtxn, version)?;
        wtxn.commit()?;
        Ok(())
    }
}

/// Open the LMDB environment at `path`, which must already exist.
///
/// Opening a path that is already open in this process returns the existing
/// environment when the options match and fails when they differ.
pub(crate) fn open_env(path: &Path, config: &StoreConfig) -> Result<Env, LmdbError> {
    let mut options = EnvOpenOptions::new();
    options
        .map_size(config.map_size)
        .max_dbs(MAX_DBS)
        .max_readers(config.max_readers);

    // SAFETY: the directory belongs to one named database and is only ever
    // mapped through this function, so no other mapping of it is truncated or
    // written behind LMDB's back.
    let env = unsafe {
        if config.durability == Durability::Relaxed {
            options.flags(EnvFlags::NO_SYNC);
        }
        options.open(path)?
    };
    Ok(env)
}
