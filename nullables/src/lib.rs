//! Nullable infrastructure for deterministic testing.
//!
//! [`NullBlockStore`] satisfies the same [`memfs_store::BlockStore`] contract
//! as the LMDB backend but keeps everything in memory, never touches the
//! filesystem, and can be told to fail on demand.
//!
//! Usage: swap the real store for a nullable in tests of the file-system
//! layer.

pub mod store;

pub use store::NullBlockStore;
