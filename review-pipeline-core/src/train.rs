//! Training pipeline: fit the sentiment classifier on the most recent
//! processed dataset and publish the model and vectorizer artifacts.
//!
//! One run:
//!   - Lists the processed prefix and selects the newest artifact: maximum
//!     by last-modified timestamp, ties broken by key lexical order, so the
//!     selection is deterministic and testable
//!   - Cleans rows with the strict policy: empty text or a non-numeric score
//!     drops the row
//!   - Holds out every Nth row for evaluation, trains on the rest
//!   - Fits the TF-IDF vectorizer and the softmax classifier
//!   - Publishes both fixed-name JSON artifacts, each as an atomic overwrite
//!
//! # Error Handling
//! Every failure aborts the run before any artifact is replaced, except a
//! failure between the two publishes, which can leave a fresh vectorizer next
//! to a stale model; rerunning the whole job repairs it.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::{BucketLayout, TrainParams};
use crate::contract::{GetResult, ListedObject, ObjectStore, StoreError};
use crate::model::{FitOptions, SoftmaxRegression, SparseVector, TfidfVectorizer};
use crate::records::{CleanReview, RawReview, SCORE_COLUMN, TEXT_COLUMN};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("processed-data listing failed: {0}")]
    List(#[source] StoreError),
    #[error("no processed data found under {prefix:?}; run ingest first")]
    NoProcessedData { prefix: String },
    #[error("processed object {key:?} was listed but is no longer present")]
    MissingObject { key: String },
    #[error("failed to read processed object {key:?}: {source}")]
    Read {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("processed object {key:?} is missing required column {column:?}")]
    Schema { key: String, column: String },
    #[error("failed to parse {key:?} as CSV: {source}")]
    Csv {
        key: String,
        #[source]
        source: csv::Error,
    },
    #[error("no usable training rows after cleaning {key:?}")]
    EmptyTrainingSet { key: String },
    #[error("failed to encode artifact {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to publish artifact {key:?}: {source}")]
    ArtifactWrite {
        key: String,
        #[source]
        source: StoreError,
    },
}

/// Outcome of one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub run_id: Uuid,
    pub source_key: String,
    pub rows_total: usize,
    pub rows_dropped: usize,
    pub rows_trained: usize,
    pub rows_heldout: usize,
    pub classes: Vec<i64>,
    pub vocabulary_size: usize,
    pub heldout_accuracy: Option<f64>,
    pub model_key: String,
    pub vectorizer_key: String,
}

/// The newest object in the listing: maximum by last-modified timestamp,
/// ties broken by key lexical order.
pub fn select_latest(listing: &[ListedObject]) -> Option<&ListedObject> {
    listing
        .iter()
        .max_by(|a, b| (a.last_modified, &a.key).cmp(&(b.last_modified, &b.key)))
}

/// Entrypoint: train on the latest processed dataset and publish artifacts.
pub async fn run_train<S>(
    store: &S,
    layout: &BucketLayout,
    params: &TrainParams,
) -> Result<TrainReport, TrainError>
where
    S: ObjectStore,
{
    let run_id = Uuid::new_v4();
    info!(%run_id, processed_prefix = %layout.processed_prefix, "[TRAIN] Starting training run");

    let listing = store.list(&layout.processed_prefix).await.map_err(|e| {
        error!(%run_id, error = %e, "[TRAIN][ERROR] Processed-data listing failed");
        TrainError::List(e)
    })?;
    let latest = select_latest(&listing).ok_or_else(|| {
        error!(%run_id, prefix = %layout.processed_prefix, "[TRAIN][ERROR] No processed data found");
        TrainError::NoProcessedData {
            prefix: layout.processed_prefix.clone(),
        }
    })?;
    let source_key = latest.key.clone();
    info!(%run_id, key = %source_key, "[TRAIN] Selected latest processed dataset");

    let bytes = match store.get(&source_key).await {
        Ok(GetResult::Found(bytes)) => bytes,
        Ok(GetResult::Missing) => {
            return Err(TrainError::MissingObject { key: source_key });
        }
        Err(e) => {
            return Err(TrainError::Read {
                key: source_key,
                source: e,
            });
        }
    };

    let (rows, rows_total) = read_clean_rows(&source_key, &bytes)?;
    let rows_dropped = rows_total - rows.len();
    if rows.is_empty() {
        error!(%run_id, key = %source_key, "[TRAIN][ERROR] Every row was dropped by cleaning");
        return Err(TrainError::EmptyTrainingSet { key: source_key });
    }
    info!(
        %run_id,
        rows_total,
        rows_dropped,
        usable = rows.len(),
        "[TRAIN] Cleaned training rows"
    );

    let (train_rows, heldout_rows) = split_holdout(&rows, params.holdout_every);

    let documents: Vec<&str> = train_rows.iter().map(|r| r.text.as_str()).collect();
    let vectorizer = TfidfVectorizer::fit(&documents, params.max_features);
    let samples: Vec<SparseVector> = train_rows
        .iter()
        .map(|r| vectorizer.transform(&r.text))
        .collect();
    let labels: Vec<i64> = train_rows.iter().map(|r| r.score).collect();
    let model = SoftmaxRegression::fit(
        &samples,
        &labels,
        vectorizer.n_features(),
        FitOptions {
            learning_rate: params.learning_rate,
            epochs: params.epochs,
            l2_penalty: params.l2_penalty,
        },
    );

    let heldout_accuracy = if heldout_rows.is_empty() {
        None
    } else {
        let correct = heldout_rows
            .iter()
            .filter(|r| model.predict(&vectorizer.transform(&r.text)).0 == r.score)
            .count();
        Some(correct as f64 / heldout_rows.len() as f64)
    };
    if let Some(accuracy) = heldout_accuracy {
        info!(%run_id, accuracy, heldout = heldout_rows.len(), "[TRAIN] Held-out evaluation");
    }

    let vectorizer_key = layout.vectorizer_key();
    publish_json(store, &vectorizer_key, &vectorizer).await?;
    let model_key = layout.model_key();
    publish_json(store, &model_key, &model).await?;
    info!(
        %run_id,
        model = %model_key,
        vectorizer = %vectorizer_key,
        classes = model.classes.len(),
        vocabulary = vectorizer.n_features(),
        "[TRAIN] Artifacts published"
    );

    Ok(TrainReport {
        run_id,
        source_key,
        rows_total,
        rows_dropped,
        rows_trained: train_rows.len(),
        rows_heldout: heldout_rows.len(),
        classes: model.classes.clone(),
        vocabulary_size: vectorizer.n_features(),
        heldout_accuracy,
        model_key,
        vectorizer_key,
    })
}

/// Parse the processed CSV and apply the strict cleaning policy. Returns the
/// surviving rows and the total row count before cleaning.
fn read_clean_rows(key: &str, bytes: &[u8]) -> Result<(Vec<CleanReview>, usize), TrainError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| TrainError::Csv {
            key: key.to_string(),
            source: e,
        })?
        .clone();
    for required in [TEXT_COLUMN, SCORE_COLUMN] {
        if !headers.iter().any(|h| h == required) {
            return Err(TrainError::Schema {
                key: key.to_string(),
                column: required.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    let mut total = 0usize;
    for result in reader.deserialize::<RawReview>() {
        let raw = result.map_err(|e| TrainError::Csv {
            key: key.to_string(),
            source: e,
        })?;
        total += 1;
        if let Some(clean) = raw.clean_strict() {
            rows.push(clean);
        }
    }
    Ok((rows, total))
}

/// Deterministic split: every `holdout_every`-th row (1-based) is held out.
/// `holdout_every` of 0 or 1 disables the hold-out, as does a split that
/// would leave the training side empty.
fn split_holdout(rows: &[CleanReview], holdout_every: usize) -> (Vec<CleanReview>, Vec<CleanReview>) {
    if holdout_every <= 1 {
        return (rows.to_vec(), Vec::new());
    }
    let mut train = Vec::new();
    let mut heldout = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if (index + 1) % holdout_every == 0 {
            heldout.push(row.clone());
        } else {
            train.push(row.clone());
        }
    }
    if train.is_empty() {
        return (rows.to_vec(), Vec::new());
    }
    (train, heldout)
}

async fn publish_json<S, T>(store: &S, key: &str, artifact: &T) -> Result<(), TrainError>
where
    S: ObjectStore,
    T: Serialize,
{
    let bytes = serde_json::to_vec_pretty(artifact).map_err(|e| TrainError::Encode {
        key: key.to_string(),
        source: e,
    })?;
    store.put(key, &bytes).await.map_err(|e| {
        error!(key, error = %e, "[TRAIN][ERROR] Failed to publish artifact");
        TrainError::ArtifactWrite {
            key: key.to_string(),
            source: e,
        }
    })
}
