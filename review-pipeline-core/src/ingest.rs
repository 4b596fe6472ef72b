//! High-level ETL pipeline: orchestrates checkpoint load → source listing →
//! pending selection → transform → output write → checkpoint commit.
//!
//! This module provides the top-level orchestration for one ingest run over a
//! bucket. It implements a single linear pass that:
//!   - Loads the processed-set checkpoint (absent blob = first run)
//!   - Lists the raw prefix and selects the files not yet processed
//!   - Short-circuits when nothing is pending (no output, no checkpoint
//!     rewrite)
//!   - Projects every pending CSV file onto the `Text`/`Score` schema with
//!     the default-fill policy
//!   - Writes one consolidated CSV artifact to the fixed processed key,
//!     overwriting prior output
//!   - Advances the checkpoint to the union only after the output is durable
//!
//! # Major Types
//! - [`IngestReport`]: what a run did: selected keys, rows written, output
//!   digest
//! - [`IngestError`]: the failure taxonomy for a run
//!
//! # Error Handling
//! Every failure aborts the whole run; there is no partial checkpoint
//! advance. A checkpoint-commit failure after a successful output write is
//! its own category: the output data is valid, the checkpoint is stale, and
//! rerunning the whole pass is safe because the union commit is idempotent.
//!
//! # Navigation
//! - Main entrypoint: [`run_ingest`]

use std::collections::BTreeSet;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::checkpoint::{self, CheckpointError};
use crate::config::BucketLayout;
use crate::contract::{GetResult, ObjectStore, StoreError};
use crate::records::{CleanReview, RawReview, SCORE_COLUMN, TEXT_COLUMN};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("checkpoint load failed: {0}")]
    Checkpoint(#[source] CheckpointError),
    #[error("source listing failed: {0}")]
    List(#[source] StoreError),
    #[error("failed to read raw object {key:?}: {source}")]
    Read {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("raw object {key:?} was listed but is no longer present")]
    MissingObject { key: String },
    #[error("raw object {key:?} is missing required column {column:?}")]
    Schema { key: String, column: String },
    #[error("failed to parse {key:?} as CSV: {source}")]
    Csv {
        key: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write processed output {key:?}: {source}")]
    OutputWrite {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("processed output is written but the checkpoint could not be advanced: {0}")]
    CheckpointCommit(#[source] CheckpointError),
}

/// Outcome of one ingest run. `output_key` is `None` when the run
/// short-circuited because nothing was pending.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub first_run: bool,
    pub listed: usize,
    pub already_processed: usize,
    pub pending: Vec<String>,
    pub rows_written: usize,
    pub output_key: Option<String>,
    pub output_sha256: Option<String>,
}

/// Entrypoint: run one checkpointed ingest pass over the bucket.
pub async fn run_ingest<S>(store: &S, layout: &BucketLayout) -> Result<IngestReport, IngestError>
where
    S: ObjectStore,
{
    let run_id = Uuid::new_v4();
    info!(%run_id, raw_prefix = %layout.raw_prefix, "[INGEST] Starting ingest run");

    let loaded = checkpoint::load_processed_set(store, &layout.checkpoint_key)
        .await
        .map_err(|e| {
            error!(%run_id, error = %e, "[INGEST][ERROR] Checkpoint load failed; aborting before transform");
            IngestError::Checkpoint(e)
        })?;
    let first_run = loaded.is_missing();
    let processed = loaded.into_set();

    let listing = store.list(&layout.raw_prefix).await.map_err(|e| {
        error!(%run_id, error = %e, "[INGEST][ERROR] Source listing failed");
        IngestError::List(e)
    })?;
    let pending = checkpoint::compute_pending(&listing, &processed);

    if pending.is_empty() {
        info!(
            %run_id,
            listed = listing.len(),
            "[INGEST] No new raw files; skipping transform and checkpoint update"
        );
        return Ok(IngestReport {
            run_id,
            first_run,
            listed: listing.len(),
            already_processed: processed.len(),
            pending: Vec::new(),
            rows_written: 0,
            output_key: None,
            output_sha256: None,
        });
    }
    info!(
        %run_id,
        listed = listing.len(),
        pending = pending.len(),
        first_run,
        "[INGEST] Selected pending raw files"
    );

    // Transform: read and project every pending file, in key order.
    let mut rows: Vec<CleanReview> = Vec::new();
    for key in &pending {
        let bytes = match store.get(key).await {
            Ok(GetResult::Found(bytes)) => bytes,
            Ok(GetResult::Missing) => {
                error!(%run_id, key = %key, "[INGEST][ERROR] Raw object disappeared between listing and read");
                return Err(IngestError::MissingObject { key: key.clone() });
            }
            Err(e) => {
                error!(%run_id, key = %key, error = %e, "[INGEST][ERROR] Failed to read raw object");
                return Err(IngestError::Read {
                    key: key.clone(),
                    source: e,
                });
            }
        };
        let file_rows = project_raw_csv(key, &bytes)?;
        info!(%run_id, key = %key, rows = file_rows.len(), "[INGEST] Projected raw file");
        rows.extend(file_rows);
    }

    let output_key = layout.processed_key();
    let artifact = encode_rows(&rows).map_err(|e| IngestError::Csv {
        key: output_key.clone(),
        source: e,
    })?;
    store.put(&output_key, &artifact).await.map_err(|e| {
        error!(%run_id, key = %output_key, error = %e, "[INGEST][ERROR] Failed to write processed output");
        IngestError::OutputWrite {
            key: output_key.clone(),
            source: e,
        }
    })?;
    let digest = Sha256::digest(&artifact);
    let output_sha256: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    info!(
        %run_id,
        key = %output_key,
        rows = rows.len(),
        sha256 = %output_sha256,
        "[INGEST] Processed output written"
    );

    checkpoint::commit_processed_set(store, &layout.checkpoint_key, &processed, &pending)
        .await
        .map_err(|e| {
            // The output artifact is already durable. The next run will
            // reselect the same files; the union commit makes that safe.
            warn!(
                %run_id,
                error = %e,
                "[INGEST][ERROR] Checkpoint commit failed after successful output write; state is stale, whole-run retry is safe"
            );
            IngestError::CheckpointCommit(e)
        })?;

    Ok(IngestReport {
        run_id,
        first_run,
        listed: listing.len(),
        already_processed: processed.len(),
        pending: pending.iter().cloned().collect(),
        rows_written: rows.len(),
        output_key: Some(output_key),
        output_sha256: Some(output_sha256),
    })
}

/// Project one raw CSV file onto the `Text`/`Score` schema.
///
/// A header missing a required column is a fatal schema violation; a row
/// missing a value is filled per the default policy.
fn project_raw_csv(key: &str, bytes: &[u8]) -> Result<Vec<CleanReview>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| IngestError::Csv {
            key: key.to_string(),
            source: e,
        })?
        .clone();
    for required in [TEXT_COLUMN, SCORE_COLUMN] {
        if !headers.iter().any(|h| h == required) {
            return Err(IngestError::Schema {
                key: key.to_string(),
                column: required.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for result in reader.deserialize::<RawReview>() {
        let raw = result.map_err(|e| IngestError::Csv {
            key: key.to_string(),
            source: e,
        })?;
        rows.push(raw.clean_or_default());
    }
    Ok(rows)
}

fn encode_rows(rows: &[CleanReview]) -> Result<Vec<u8>, csv::Error> {
    // Header is written explicitly so the artifact stays headered even when
    // every pending file turned out to hold zero data rows.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record([TEXT_COLUMN, SCORE_COLUMN])?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
