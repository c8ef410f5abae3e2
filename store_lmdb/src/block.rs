//! LMDB implementation of BlockStore.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use heed::EnvClosingEvent;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use memfs_store::{validate_block_id, AdapterState, BlockRef, BlockStore, StoreError};
use memfs_utils::{OpCounters, OpSnapshot};

use crate::environment::BlockEnvironment;
use crate::StoreConfig;

enum Lifecycle {
    Uninitialized,
    Ready(BlockEnvironment),
    /// Dispose was blocked. `Some` while other handles may still hold the
    /// environment open, `None` once it closed but the directory could not be
    /// removed.
    Disposing(Option<EnvClosingEvent>),
    Disposed,
}

impl Lifecycle {
    fn state(&self) -> AdapterState {
        match self {
            Lifecycle::Uninitialized => AdapterState::Uninitialized,
            Lifecycle::Ready(_) => AdapterState::Ready,
            Lifecycle::Disposing(_) => AdapterState::Disposing,
            Lifecycle::Disposed => AdapterState::Disposed,
        }
    }
}

/// A named block database backed by one LMDB environment.
///
/// Block operations each run a single LMDB transaction on the blocking
/// thread pool and resolve once it has committed. Commits follow the
/// configured [`crate::Durability`]. At most `max_readers` read
/// transactions are in flight at once; further reads wait for a slot.
pub struct LmdbBlockStore {
    name: String,
    path: PathBuf,
    config: StoreConfig,
    lifecycle: Lifecycle,
    counters: Arc<OpCounters>,
    readers: Arc<Semaphore>,
}

impl LmdbBlockStore {
    /// Create an adapter for the database `name` without opening it.
    pub fn new(config: StoreConfig, name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        let path = config.database_path(&name)?;
        let readers = Arc::new(Semaphore::new(config.max_readers.max(1) as usize));
        Ok(Self {
            name,
            path,
            config,
            lifecycle: Lifecycle::Uninitialized,
            counters: Arc::new(OpCounters::new()),
            readers,
        })
    }

    /// Create and set up an adapter. Without a `name` a random one is
    /// generated, giving a fresh database.
    pub async fn attach(config: StoreConfig, name: Option<&str>) -> Result<Self, StoreError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => memfs_utils::random_name()
                .map_err(|e| StoreError::Open(format!("cannot generate database name: {e}")))?,
        };
        let mut store = Self::new(config, name)?;
        store.setup().await?;
        Ok(store)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the LMDB environment.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Counters for operations completed so far.
    pub fn stats(&self) -> OpSnapshot {
        self.counters.snapshot()
    }

    fn ready(&self, operation: &'static str) -> Result<BlockEnvironment, StoreError> {
        match &self.lifecycle {
            Lifecycle::Ready(env) => Ok(env.clone()),
            other => Err(StoreError::InvalidState {
                operation,
                state: other.state(),
            }),
        }
    }

    /// Reserve an LMDB reader slot. The permit moves into the blocking task
    /// so the slot stays taken until the transaction has ended.
    async fn reader_slot(&self) -> Result<OwnedSemaphorePermit, StoreError> {
        Arc::clone(&self.readers)
            .acquire_owned()
            .await
            .map_err(|e| StoreError::Backend(format!("reader slots closed: {e}")))
    }

    /// Wait for every other handle on the environment, then delete the
    /// directory. On failure the adapter is left in `Disposing`.
    async fn finish_dispose(&mut self, closing: Option<EnvClosingEvent>) -> Result<(), StoreError> {
        if let Some(closing) = closing {
            let timeout = self.config.close_timeout();
            let (closed, closing) = run_blocking(move || {
                let closed = closing.wait_timeout(timeout);
                Ok((closed, closing))
            })
            .await?;

            if !closed {
                tracing::warn!(
                    name = %self.name,
                    timeout_ms = self.config.close_timeout_ms,
                    "dispose blocked by another open handle"
                );
                self.lifecycle = Lifecycle::Disposing(Some(closing));
                return Err(StoreError::Blocked(format!(
                    "database '{}' is still open elsewhere",
                    self.name
                )));
            }
        }

        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                self.lifecycle = Lifecycle::Disposing(None);
                return Err(StoreError::Backend(format!(
                    "failed to remove {}: {e}",
                    self.path.display()
                )));
            }
        }

        self.lifecycle = Lifecycle::Disposed;
        tracing::info!(name = %self.name, path = %self.path.display(), "block database destroyed");
        Ok(())
    }

    fn tally<T>(&self, result: &Result<T, StoreError>) {
        if let Err(e) = result {
            if !e.is_not_found() {
                self.counters.record_failure();
            }
        }
    }
}

#[async_trait]
impl BlockStore for LmdbBlockStore {
    async fn setup(&mut self) -> Result<(), StoreError> {
        match self.lifecycle {
            Lifecycle::Ready(_) => {
                tracing::debug!(name = %self.name, "setup on an open database is a no-op");
                return Ok(());
            }
            Lifecycle::Disposing(_) => {
                return Err(StoreError::InvalidState {
                    operation: "setup",
                    state: AdapterState::Disposing,
                })
            }
            Lifecycle::Uninitialized | Lifecycle::Disposed => {}
        }

        let path = self.path.clone();
        let config = self.config.clone();
        let env = run_blocking(move || {
            BlockEnvironment::open(&path, &config).map_err(|e| StoreError::Open(e.to_string()))
        })
        .await?;

        tracing::info!(
            name = %self.name,
            path = %self.path.display(),
            durability = ?self.config.durability,
            "block database ready"
        );
        self.lifecycle = Lifecycle::Ready(env);
        Ok(())
    }

    async fn dispose(&mut self) -> Result<(), StoreError> {
        let closing = match std::mem::replace(&mut self.lifecycle, Lifecycle::Disposed) {
            Lifecycle::Ready(env) => Some(env.into_env().prepare_for_closing()),
            Lifecycle::Disposing(closing) => closing,
            other => {
                let state = other.state();
                self.lifecycle = other;
                return Err(StoreError::InvalidState {
                    operation: "dispose",
                    state,
                });
            }
        };
        self.finish_dispose(closing).await
    }

    async fn read(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let env = self.ready("read")?;
        validate_block_id(id)?;

        let key = id.to_string();
        let permit = self.reader_slot().await?;
        let result = run_blocking(move || {
            let _permit = permit;
            env.get(&key)
        })
        .await;
        self.tally(&result);
        match &result {
            Ok(data) => {
                self.counters.record_read();
                tracing::debug!(id, size = data.len(), "read block");
            }
            Err(e) if e.is_not_found() => self.counters.record_miss(),
            Err(_) => {}
        }
        result
    }

    async fn write(&self, id: &str, data: &[u8]) -> Result<(), StoreError> {
        let env = self.ready("write")?;
        validate_block_id(id)?;

        let key = id.to_string();
        let value = data.to_vec();
        let result = run_blocking(move || env.put(&key, &value)).await;
        self.tally(&result);
        if result.is_ok() {
            self.counters.record_write(data.len());
            tracing::debug!(id, size = data.len(), "wrote block");
        }
        result
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let env = self.ready("delete")?;
        validate_block_id(id)?;

        let key = id.to_string();
        let result = run_blocking(move || env.delete(&key)).await;
        self.tally(&result);
        let removed = result?;
        self.counters.record_delete();
        tracing::debug!(id, removed, "deleted block");
        Ok(())
    }

    async fn block_refs(&self) -> Result<Vec<BlockRef>, StoreError> {
        let env = self.ready("block_refs")?;

        let permit = self.reader_slot().await?;
        let result = run_blocking(move || {
            let _permit = permit;
            env.block_refs()
        })
        .await;
        self.tally(&result);
        if let Ok(refs) = &result {
            self.counters.record_listing();
            tracing::debug!(count = refs.len(), "listed blocks");
        }
        result
    }

    fn state(&self) -> AdapterState {
        self.lifecycle.state()
    }
}

/// Run a blocking LMDB call on the blocking pool and wait for it.
async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Backend(format!("storage task failed: {e}")))?
}
