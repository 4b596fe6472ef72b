use std::collections::BTreeSet;

use review_pipeline_core::checkpoint::{
    commit_processed_set, compute_pending, load_processed_set, Checkpoint, CheckpointError,
};
use review_pipeline_core::contract::{MockObjectStore, StoreError};
use review_pipeline_core::store::FsStore;
use tempfile::tempdir;

const CHECKPOINT_KEY: &str = "metadata/processed_files.txt";

fn set(keys: &[&str]) -> BTreeSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

#[tokio::test]
async fn absent_checkpoint_is_missing_not_an_error() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());

    let checkpoint = load_processed_set(&store, CHECKPOINT_KEY)
        .await
        .expect("missing blob must not raise");
    assert_eq!(checkpoint, Checkpoint::Missing);
    assert!(checkpoint.into_set().is_empty());
}

#[tokio::test]
async fn commit_then_load_round_trips_the_union() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());

    let processed = set(&["raw_reviews/a.csv"]);
    let pending = set(&["raw_reviews/b.csv", "raw_reviews/c.csv"]);
    commit_processed_set(&store, CHECKPOINT_KEY, &processed, &pending)
        .await
        .expect("commit should succeed");

    let loaded = load_processed_set(&store, CHECKPOINT_KEY)
        .await
        .expect("load should succeed");
    assert_eq!(
        loaded,
        Checkpoint::Found(set(&[
            "raw_reviews/a.csv",
            "raw_reviews/b.csv",
            "raw_reviews/c.csv"
        ]))
    );
}

#[tokio::test]
async fn recommitting_a_subset_does_not_change_the_checkpoint() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());

    let processed = set(&["raw_reviews/a.csv", "raw_reviews/b.csv"]);
    commit_processed_set(&store, CHECKPOINT_KEY, &processed, &set(&["raw_reviews/b.csv"]))
        .await
        .unwrap();

    let loaded = load_processed_set(&store, CHECKPOINT_KEY).await.unwrap();
    assert_eq!(loaded, Checkpoint::Found(processed));
}

#[tokio::test]
async fn store_read_failure_propagates_as_error() {
    let mut store = MockObjectStore::new();
    store
        .expect_get()
        .withf(|key: &str| key == CHECKPOINT_KEY)
        .returning(|_| Err(StoreError::Backend("simulated outage".to_string())));

    let err = load_processed_set(&store, CHECKPOINT_KEY)
        .await
        .expect_err("a real read failure must not be treated as first run");
    assert!(matches!(err, CheckpointError::Store(_)));
}

#[tokio::test]
async fn non_utf8_checkpoint_blob_is_an_encoding_error() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());
    use review_pipeline_core::contract::ObjectStore;
    store.put(CHECKPOINT_KEY, b"\xff\xfe\xfa").await.unwrap();

    let err = load_processed_set(&store, CHECKPOINT_KEY).await.unwrap_err();
    assert!(matches!(err, CheckpointError::Encoding { .. }));
}

#[tokio::test]
async fn selection_scenario_from_partial_checkpoint() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());
    use review_pipeline_core::contract::ObjectStore;

    store.put("raw_reviews/a.csv", b"Text,Score\nx,1\n").await.unwrap();
    store.put("raw_reviews/b.csv", b"Text,Score\ny,2\n").await.unwrap();
    store.put(CHECKPOINT_KEY, b"raw_reviews/a.csv").await.unwrap();

    let processed = load_processed_set(&store, CHECKPOINT_KEY)
        .await
        .unwrap()
        .into_set();
    let listing = store.list("raw_reviews/").await.unwrap();
    let pending = compute_pending(&listing, &processed);
    assert_eq!(pending, set(&["raw_reviews/b.csv"]));

    commit_processed_set(&store, CHECKPOINT_KEY, &processed, &pending)
        .await
        .unwrap();
    let after = load_processed_set(&store, CHECKPOINT_KEY)
        .await
        .unwrap()
        .into_set();
    assert_eq!(after, set(&["raw_reviews/a.csv", "raw_reviews/b.csv"]));
}
