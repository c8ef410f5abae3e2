//! The block store contract, exercised through `dyn BlockStore` against every
//! backend. A backend that passes here can stand in for any other under the
//! file-system layer.

use memfs_nullables::NullBlockStore;
use memfs_store::{AdapterState, BlockRef, BlockStore, StoreError};
use memfs_store_lmdb::{LmdbBlockStore, StoreConfig};
use memfs_utils::{init_tracing, LogFormat};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn temp_store(name: &str) -> (tempfile::TempDir, LmdbBlockStore) {
    init_tracing(LogFormat::Human, "warn");
    let dir = tempfile::tempdir().expect("temp dir");
    let store = LmdbBlockStore::new(StoreConfig::with_root_dir(dir.path()), name).expect("store");
    (dir, store)
}

fn sorted(mut refs: Vec<BlockRef>) -> Vec<BlockRef> {
    refs.sort_by(|a, b| a.key.cmp(&b.key));
    refs
}

fn block_ref(key: &str, size: u64) -> BlockRef {
    BlockRef {
        key: key.to_string(),
        size,
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

async fn scenario(store: &mut dyn BlockStore) {
    store.setup().await.expect("setup");
    assert_eq!(store.state(), AdapterState::Ready);

    store.write("1", &[0x01, 0x02]).await.unwrap();
    assert_eq!(store.read("1").await.unwrap(), vec![0x01, 0x02]);
    store.delete("1").await.unwrap();
    assert!(store.read("1").await.unwrap_err().is_not_found());
    assert!(store.block_refs().await.unwrap().is_empty());
}

async fn never_written_is_not_found(store: &mut dyn BlockStore) {
    store.setup().await.unwrap();
    let err = store.read("ghost").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(ref id) if id == "ghost"));
}

async fn empty_payload_round_trips(store: &mut dyn BlockStore) {
    store.setup().await.unwrap();
    store.write("empty", &[]).await.unwrap();
    assert_eq!(store.read("empty").await.unwrap(), Vec::<u8>::new());
    assert_eq!(store.block_refs().await.unwrap(), vec![block_ref("empty", 0)]);
}

async fn overwrite_keeps_latest(store: &mut dyn BlockStore) {
    store.setup().await.unwrap();
    store.write("k", b"first payload").await.unwrap();
    store.write("k", b"2nd").await.unwrap();
    assert_eq!(store.read("k").await.unwrap(), b"2nd".to_vec());
    assert_eq!(store.block_refs().await.unwrap(), vec![block_ref("k", 3)]);
}

async fn delete_missing_succeeds(store: &mut dyn BlockStore) {
    store.setup().await.unwrap();
    store.delete("never-there").await.unwrap();
    store.write("x", b"1").await.unwrap();
    store.delete("x").await.unwrap();
    store.delete("x").await.unwrap();
    assert!(store.read("x").await.unwrap_err().is_not_found());
}

async fn refs_report_live_sizes(store: &mut dyn BlockStore) {
    store.setup().await.unwrap();
    store.write("a", &[1, 2, 3]).await.unwrap();
    store.write("b", &[1, 2, 3, 4, 5]).await.unwrap();
    assert_eq!(
        sorted(store.block_refs().await.unwrap()),
        vec![block_ref("a", 3), block_ref("b", 5)]
    );
}

async fn dispose_then_setup_is_empty(store: &mut dyn BlockStore) {
    store.setup().await.unwrap();
    store.write("a", b"abc").await.unwrap();
    store.dispose().await.unwrap();
    assert_eq!(store.state(), AdapterState::Disposed);
    assert!(store.read("a").await.unwrap_err().is_precondition());

    store.setup().await.unwrap();
    assert!(store.block_refs().await.unwrap().is_empty());
    assert!(store.read("a").await.unwrap_err().is_not_found());
}

async fn ids_are_validated(store: &mut dyn BlockStore) {
    store.setup().await.unwrap();
    let too_long = "x".repeat(memfs_store::MAX_BLOCK_ID_LEN + 1);
    for id in ["", too_long.as_str()] {
        assert!(matches!(
            store.write(id, b"v").await,
            Err(StoreError::InvalidBlockId(_))
        ));
        assert!(store.read(id).await.unwrap_err().is_precondition());
        assert!(store.delete(id).await.unwrap_err().is_precondition());
    }
    let longest = "y".repeat(memfs_store::MAX_BLOCK_ID_LEN);
    store.write(&longest, b"v").await.unwrap();
    assert_eq!(store.read(&longest).await.unwrap(), b"v".to_vec());
}

async fn binary_payload_is_untouched(store: &mut dyn BlockStore) {
    store.setup().await.unwrap();
    let payload: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    store.write("bin", &payload).await.unwrap();
    assert_eq!(store.read("bin").await.unwrap(), payload);
    assert_eq!(store.block_refs().await.unwrap(), vec![block_ref("bin", 70_000)]);
}

macro_rules! contract_tests {
    ($($case:ident),* $(,)?) => {
        mod lmdb {
            use super::*;
            $(
                #[tokio::test]
                async fn $case() {
                    let (_dir, mut store) = temp_store(stringify!($case));
                    super::$case(&mut store).await;
                }
            )*
        }

        mod null {
            use super::*;
            $(
                #[tokio::test]
                async fn $case() {
                    let mut store = NullBlockStore::new();
                    super::$case(&mut store).await;
                }
            )*
        }
    };
}

contract_tests!(
    scenario,
    never_written_is_not_found,
    empty_payload_round_trips,
    overwrite_keeps_latest,
    delete_missing_succeeds,
    refs_report_live_sizes,
    dispose_then_setup_is_empty,
    ids_are_validated,
    binary_payload_is_untouched,
);

#[tokio::test]
async fn boxed_backends_are_interchangeable() {
    let (_dir, lmdb) = temp_store("boxed");
    let mut stores: Vec<Box<dyn BlockStore>> = vec![
        Box::new(lmdb) as Box<dyn BlockStore>,
        Box::new(NullBlockStore::new()),
    ];
    for store in stores.iter_mut() {
        store.setup().await.unwrap();
        store.write("shared", b"same").await.unwrap();
    }
    for store in &stores {
        assert_eq!(store.read("shared").await.unwrap(), b"same".to_vec());
    }
}
