//! Nullable store: thread-safe in-memory block storage for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use memfs_store::{validate_block_id, AdapterState, BlockRef, BlockStore, StoreError};

/// An in-memory block store for testing.
///
/// Follows the same lifecycle rules as the real backends: block operations
/// fail with [`StoreError::InvalidState`] outside `Ready`, and `dispose`
/// discards every block.
pub struct NullBlockStore {
    name: String,
    blocks: Mutex<HashMap<String, Vec<u8>>>,
    next_failure: Mutex<Option<StoreError>>,
    state: AdapterState,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Deterministic stand-in for a random database name.
fn generated_name() -> String {
    format!("null-{}", NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

impl NullBlockStore {
    pub fn new() -> Self {
        Self::named(generated_name())
    }

    /// Create an unopened store for the database `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Mutex::new(HashMap::new()),
            next_failure: Mutex::new(None),
            state: AdapterState::Uninitialized,
        }
    }

    /// Create a store that is already set up. Without a `name` one is
    /// generated.
    pub fn attach(name: Option<&str>) -> Self {
        let name = name.map_or_else(generated_name, str::to_string);
        Self {
            state: AdapterState::Ready,
            ..Self::named(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make the next operation that would reach storage fail with `error`
    /// instead. Precondition checks still run first.
    pub fn fail_next(&self, error: StoreError) {
        *lock(&self.next_failure) = Some(error);
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        lock(&self.blocks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_failure(&self) -> Result<(), StoreError> {
        match lock(&self.next_failure).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check(&self, operation: &'static str, id: Option<&str>) -> Result<(), StoreError> {
        self.state.ensure_ready(operation)?;
        if let Some(id) = id {
            validate_block_id(id)?;
        }
        self.take_failure()
    }
}

impl Default for NullBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for NullBlockStore {
    async fn setup(&mut self) -> Result<(), StoreError> {
        match self.state {
            AdapterState::Ready => return Ok(()),
            AdapterState::Disposing => {
                return Err(StoreError::InvalidState {
                    operation: "setup",
                    state: self.state,
                })
            }
            AdapterState::Uninitialized | AdapterState::Disposed => {}
        }
        self.take_failure()?;
        self.state = AdapterState::Ready;
        Ok(())
    }

    async fn dispose(&mut self) -> Result<(), StoreError> {
        self.check("dispose", None)?;
        lock(&self.blocks).clear();
        self.state = AdapterState::Disposed;
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        self.check("read", Some(id))?;
        lock(&self.blocks)
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn write(&self, id: &str, data: &[u8]) -> Result<(), StoreError> {
        self.check("write", Some(id))?;
        lock(&self.blocks).insert(id.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.check("delete", Some(id))?;
        lock(&self.blocks).remove(id);
        Ok(())
    }

    async fn block_refs(&self) -> Result<Vec<BlockRef>, StoreError> {
        self.check("block_refs", None)?;
        Ok(lock(&self.blocks)
            .iter()
            .map(|(key, data)| BlockRef {
                key: key.clone(),
                size: data.len() as u64,
            })
            .collect())
    }

    fn state(&self) -> AdapterState {
        self.state
    }
}

/// A panic while holding the lock cannot leave the map half-updated, so a
/// poisoned lock is still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
