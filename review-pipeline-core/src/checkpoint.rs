//! Checkpointed file selection: decides which raw files a pipeline run must
//! (re)process and durably extends the record once processing succeeds.
//!
//! The persisted record ([`Checkpoint`]) is a newline-delimited blob of
//! object keys at a fixed location. It grows monotonically: every key in it
//! was fully and successfully transformed in some prior run. A missing blob
//! is the first-run case and is a value, not an error; only a real store
//! failure propagates.
//!
//! The commit is deliberately not transactional with the transform's output
//! write. A crash between the two leaves the system at-least-once: the same
//! files are selected again on the next run, and re-merging them into the
//! record is a no-op because the union is idempotent.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, info};

use crate::contract::{GetResult, ListedObject, ObjectStore, StoreError};

/// The loaded state of the persisted processed-set blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checkpoint {
    Found(BTreeSet<String>),
    Missing,
}

impl Checkpoint {
    /// The processed set, empty in the first-run case.
    pub fn into_set(self) -> BTreeSet<String> {
        match self {
            Checkpoint::Found(set) => set,
            Checkpoint::Missing => BTreeSet::new(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Checkpoint::Missing)
    }
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint store failure: {0}")]
    Store(#[from] StoreError),
    #[error("checkpoint blob at {key:?} is not valid UTF-8")]
    Encoding { key: String },
}

/// Read the checkpoint blob.
///
/// An absent blob is reported as [`Checkpoint::Missing`] and logged as a
/// first run; a store read failure propagates as an error.
pub async fn load_processed_set<S>(store: &S, key: &str) -> Result<Checkpoint, CheckpointError>
where
    S: ObjectStore,
{
    match store.get(key).await? {
        GetResult::Missing => {
            info!(
                checkpoint = key,
                "[CHECKPOINT] No checkpoint blob found; treating as first run"
            );
            Ok(Checkpoint::Missing)
        }
        GetResult::Found(bytes) => {
            let text = String::from_utf8(bytes)
                .map_err(|_| CheckpointError::Encoding { key: key.to_string() })?;
            let set = parse_processed_set(&text);
            debug!(
                checkpoint = key,
                entries = set.len(),
                "[CHECKPOINT] Loaded processed set"
            );
            Ok(Checkpoint::Found(set))
        }
    }
}

/// Decode a newline-delimited blob into the processed set. Blank lines and
/// surrounding whitespace are ignored so a trailing newline never turns into
/// a phantom identifier.
pub fn parse_processed_set(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Encode the processed set as the newline-joined blob, in sorted order.
pub fn serialize_processed_set(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join("\n")
}

/// The set difference CurrentListing − ProcessedSet: every listed key not yet
/// recorded as processed. Pure; order-independent.
pub fn compute_pending(
    listing: &[ListedObject],
    processed: &BTreeSet<String>,
) -> BTreeSet<String> {
    listing
        .iter()
        .filter(|obj| !processed.contains(&obj.key))
        .map(|obj| obj.key.clone())
        .collect()
}

/// Overwrite the checkpoint blob with ProcessedSet ∪ PendingSet.
///
/// Precondition: the transform over `pending` has completed and its output
/// has been durably written. Re-running with a `pending` that overlaps
/// `processed` is harmless; the union is idempotent.
pub async fn commit_processed_set<S>(
    store: &S,
    key: &str,
    processed: &BTreeSet<String>,
    pending: &BTreeSet<String>,
) -> Result<(), CheckpointError>
where
    S: ObjectStore,
{
    let union: BTreeSet<String> = processed.union(pending).cloned().collect();
    let blob = serialize_processed_set(&union);
    store.put(key, blob.as_bytes()).await?;
    info!(
        checkpoint = key,
        entries = union.len(),
        added = pending.len(),
        "[CHECKPOINT] Advanced checkpoint"
    );
    Ok(())
}
