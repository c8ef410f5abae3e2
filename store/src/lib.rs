//! Block store capability contract for memfs.
//!
//! The file-system layer addresses opaque byte blocks by string id and talks
//! to its backing store only through [`BlockStore`]. Every backend (LMDB,
//! in-memory for testing) implements the trait; nothing above this crate
//! depends on a concrete backend.

pub mod block;
pub mod error;
pub mod state;

pub use block::{validate_block_id, BlockRef, BlockStore, MAX_BLOCK_ID_LEN};
pub use error::StoreError;
pub use state::AdapterState;
