//! Schema versioning for block databases.
//!
//! The schema version lives under `schema_version` in the `meta` table. A
//! fresh database reads as version 0 and is brought to [`SCHEMA_VERSION`]
//! exactly once, inside the same write transaction that opens the tables, so a
//! failed initialisation leaves nothing behind.

use heed::types::{Bytes, Str};
use heed::{Database, Env, RoTxn, RwTxn};

use crate::LmdbError;

/// The schema version that the current code expects.
pub const SCHEMA_VERSION: u32 = 1;

/// Named tables inside every environment.
pub(crate) const STORE_DB: &str = "store";
pub(crate) const META_DB: &str = "meta";
pub(crate) const MAX_DBS: u32 = 2;

const SCHEMA_VERSION_KEY: &str = "schema_version";

pub(crate) type BlocksDb = Database<Str, Bytes>;
pub(crate) type MetaDb = Database<Str, Bytes>;

/// Open both tables, creating and versioning them on first open.
///
/// - Version 0 means a fresh database (no version stored yet): the `store`
///   table is created and the version recorded.
/// - A stored version equal to [`SCHEMA_VERSION`] opens the existing tables.
/// - A stored version *higher* than [`SCHEMA_VERSION`] was written by newer
///   code and is refused.
pub(crate) fn initialize(env: &Env) -> Result<(BlocksDb, MetaDb), LmdbError> {
    let mut wtxn = env.write_txn()?;
    let meta_db: MetaDb = env.create_database(&mut wtxn, Some(META_DB))?;
    let stored = read_schema_version(&meta_db, &wtxn)?;

    if stored > SCHEMA_VERSION {
        return Err(LmdbError::SchemaTooNew {
            stored,
            supported: SCHEMA_VERSION,
        });
    }

    let blocks_db = if stored < SCHEMA_VERSION {
        tracing::info!(from = stored, to = SCHEMA_VERSION, "initializing block schema");
        let db: BlocksDb = env.create_database(&mut wtxn, Some(STORE_DB))?;
        write_schema_version(&meta_db, &mut wtxn, SCHEMA_VERSION)?;
        db
    } else {
        tracing::debug!(version = stored, "block schema is up to date");
        env.open_database::<Str, Bytes>(&wtxn, Some(STORE_DB))?.ok_or_else(|| {
            LmdbError::Corruption(format!(
                "schema version {stored} recorded but table '{STORE_DB}' is missing"
            ))
        })?
    };

    wtxn.commit()?;
    Ok((blocks_db, meta_db))
}

pub(crate) fn read_schema_version(meta_db: &MetaDb, txn: &RoTxn) -> Result<u32, LmdbError> {
    match meta_db.get(txn, SCHEMA_VERSION_KEY)? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                LmdbError::Serialization("schema_version has unexpected byte length".to_string())
            })?;
            Ok(u32::from_le_bytes(arr))
        }
        None => Ok(0),
    }
}

pub(crate) fn write_schema_version(
    meta_db: &MetaDb,
    wtxn: &mut RwTxn,
    version: u32,
) -> Result<(), LmdbError> {
    meta_db.put(wtxn, SCHEMA_VERSION_KEY, &version.to_le_bytes())?;
    Ok(())
}
