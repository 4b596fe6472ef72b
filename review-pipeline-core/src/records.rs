//! Review record schema: the two-column projection every pipeline stage
//! agrees on, plus the fill/drop policies for malformed rows.

use serde::{Deserialize, Serialize};

pub const TEXT_COLUMN: &str = "Text";
pub const SCORE_COLUMN: &str = "Score";

/// Label assigned when the ingest stage encounters a row without a usable
/// score.
pub const DEFAULT_SCORE: i64 = 1;

/// One row as it appears in a raw CSV file: both fields may be absent.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReview {
    #[serde(rename = "Text")]
    pub text: Option<String>,
    #[serde(rename = "Score")]
    pub score: Option<String>,
}

/// One row of the processed dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReview {
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Score")]
    pub score: i64,
}

impl RawReview {
    /// Ingest-side policy: never drop a row. Missing text becomes the empty
    /// string; a missing or non-numeric score becomes [`DEFAULT_SCORE`].
    pub fn clean_or_default(self) -> CleanReview {
        let text = self.text.unwrap_or_default();
        let score = self
            .score
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_SCORE);
        CleanReview { text, score }
    }

    /// Training-side policy: stricter than ingest. Rows with empty text or a
    /// non-numeric score are dropped, never defaulted.
    pub fn clean_strict(self) -> Option<CleanReview> {
        let text = self.text?;
        if text.trim().is_empty() {
            return None;
        }
        let score = self.score?.trim().parse::<i64>().ok()?;
        Some(CleanReview { text, score })
    }
}
