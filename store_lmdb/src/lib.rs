//! LMDB block store backend for memfs.
//!
//! Implements [`memfs_store::BlockStore`] on top of the `heed` LMDB bindings.
//! Each named database is one LMDB environment under the configured root
//! directory, holding a `store` table (block id -> bytes) and a `meta` table
//! (schema version).

pub mod block;
pub mod config;
mod environment;
pub mod error;
pub mod migration;

pub use block::LmdbBlockStore;
pub use config::{Durability, StoreConfig};
pub use error::LmdbError;
pub use migration::SCHEMA_VERSION;
