use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Name of the consolidated dataset the ingest stage writes under the
/// processed prefix.
pub const PROCESSED_OBJECT_NAME: &str = "processed_reviews.csv";

/// Well-known keys and prefixes inside the bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketLayout {
    #[serde(default = "default_raw_prefix")]
    pub raw_prefix: String,
    #[serde(default = "default_processed_prefix")]
    pub processed_prefix: String,
    #[serde(default = "default_checkpoint_key")]
    pub checkpoint_key: String,
    #[serde(default = "default_models_prefix")]
    pub models_prefix: String,
}

impl BucketLayout {
    /// Fixed output location of the ingest stage.
    pub fn processed_key(&self) -> String {
        format!("{}{}", self.processed_prefix, PROCESSED_OBJECT_NAME)
    }

    /// Fixed-name classifier artifact published by the training stage.
    pub fn model_key(&self) -> String {
        format!("{}sentiment_model.json", self.models_prefix)
    }

    /// Fixed-name vectorizer artifact published by the training stage.
    pub fn vectorizer_key(&self) -> String {
        format!("{}vectorizer.json", self.models_prefix)
    }

    pub fn trace_loaded(&self) {
        info!(
            raw_prefix = %self.raw_prefix,
            processed_prefix = %self.processed_prefix,
            checkpoint_key = %self.checkpoint_key,
            models_prefix = %self.models_prefix,
            "Loaded bucket layout"
        );
        debug!(?self, "Bucket layout (full debug)");
    }
}

impl Default for BucketLayout {
    fn default() -> Self {
        Self {
            raw_prefix: default_raw_prefix(),
            processed_prefix: default_processed_prefix(),
            checkpoint_key: default_checkpoint_key(),
            models_prefix: default_models_prefix(),
        }
    }
}

fn default_raw_prefix() -> String {
    "raw_reviews/".to_string()
}

fn default_processed_prefix() -> String {
    "processed_data/".to_string()
}

fn default_checkpoint_key() -> String {
    "metadata/processed_files.txt".to_string()
}

fn default_models_prefix() -> String {
    "models/".to_string()
}

/// Knobs for the training stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainParams {
    /// Vocabulary cap for the TF-IDF vectorizer.
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_l2_penalty")]
    pub l2_penalty: f64,
    /// Every Nth row is held out for evaluation; 0 disables the hold-out.
    #[serde(default = "default_holdout_every")]
    pub holdout_every: usize,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
            learning_rate: default_learning_rate(),
            epochs: default_epochs(),
            l2_penalty: default_l2_penalty(),
            holdout_every: default_holdout_every(),
        }
    }
}

fn default_max_features() -> usize {
    5000
}

fn default_learning_rate() -> f64 {
    0.5
}

fn default_epochs() -> usize {
    100
}

fn default_l2_penalty() -> f64 {
    1e-4
}

fn default_holdout_every() -> usize {
    5
}
