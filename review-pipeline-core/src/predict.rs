//! Serving: load the published artifacts once per process lifetime and
//! answer single-text predictions.
//!
//! The cold-start cache of the original serving function is an explicit
//! context object here: construct one [`Predictor`] at process start, and the
//! artifacts are fetched on first use through a thread-safe once-cell. They
//! are never invalidated for the lifetime of the predictor.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::BucketLayout;
use crate::contract::{GetResult, ObjectStore, StoreError};
use crate::model::{SoftmaxRegression, TfidfVectorizer};

#[derive(Debug, Error)]
pub enum PredictError {
    /// Client error: there is nothing to classify.
    #[error("no input text provided")]
    EmptyText,
    #[error("model artifact {key:?} not found; run the training job first")]
    ArtifactMissing { key: String },
    #[error("failed to decode artifact {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("artifact store failure: {0}")]
    Store(#[from] StoreError),
}

/// A scored sentiment prediction for one input text.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub label: i64,
    pub confidence: f64,
}

#[derive(Debug)]
struct Artifacts {
    vectorizer: TfidfVectorizer,
    model: SoftmaxRegression,
}

/// Prediction context: one store handle plus the once-loaded artifacts.
pub struct Predictor<S: ObjectStore> {
    store: S,
    layout: BucketLayout,
    artifacts: OnceCell<Artifacts>,
}

impl<S: ObjectStore> Predictor<S> {
    pub fn new(store: S, layout: BucketLayout) -> Self {
        Self {
            store,
            layout,
            artifacts: OnceCell::new(),
        }
    }

    async fn artifacts(&self) -> Result<&Artifacts, PredictError> {
        self.artifacts
            .get_or_try_init(|| async {
                let vectorizer_key = self.layout.vectorizer_key();
                let model_key = self.layout.model_key();
                let (vectorizer, model) = futures::try_join!(
                    fetch_json::<TfidfVectorizer, S>(&self.store, &vectorizer_key),
                    fetch_json::<SoftmaxRegression, S>(&self.store, &model_key),
                )?;
                info!(
                    vocabulary = vectorizer.vocabulary.len(),
                    classes = model.classes.len(),
                    "[PREDICT] Artifacts loaded"
                );
                Ok(Artifacts { vectorizer, model })
            })
            .await
    }

    /// Classify one text. Empty or whitespace-only input is rejected as a
    /// client error without touching the store.
    pub async fn predict(&self, text: &str) -> Result<Prediction, PredictError> {
        if text.trim().is_empty() {
            return Err(PredictError::EmptyText);
        }
        let artifacts = self.artifacts().await?;
        let features = artifacts.vectorizer.transform(text);
        let (label, confidence) = artifacts.model.predict(&features);
        debug!(label, confidence, "[PREDICT] Scored input text");
        Ok(Prediction { label, confidence })
    }
}

async fn fetch_json<T, S>(store: &S, key: &str) -> Result<T, PredictError>
where
    T: DeserializeOwned,
    S: ObjectStore,
{
    match store.get(key).await? {
        GetResult::Missing => Err(PredictError::ArtifactMissing {
            key: key.to_string(),
        }),
        GetResult::Found(bytes) => serde_json::from_slice(&bytes).map_err(|e| PredictError::Decode {
            key: key.to_string(),
            source: e,
        }),
    }
}
