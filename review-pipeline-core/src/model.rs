//! Text classification primitives: a TF-IDF vectorizer with a bounded
//! vocabulary and a multinomial logistic-regression classifier. Both are
//! plain serde-serializable data so the training stage can publish them as
//! JSON artifacts and the predictor can load them back unchanged.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sparse feature vector: `(feature index, weight)` pairs, ascending by index.
pub type SparseVector = Vec<(usize, f64)>;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    // Word tokens of length >= 2, lowercased by the caller.
    TOKEN_RE.get_or_init(|| Regex::new(r"\b\w\w+\b").unwrap())
}

/// Lowercase a text and split it into word tokens of length two or more.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_re()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// TF-IDF vectorizer with a vocabulary capped at `max_features` terms.
///
/// Vocabulary selection is by total corpus frequency, ties broken
/// alphabetically; indices are assigned in alphabetical order over the
/// selected terms. Idf is smoothed (`ln((1 + n) / (1 + df)) + 1`) and rows
/// are L2-normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub vocabulary: BTreeMap<String, usize>,
    pub idf: Vec<f64>,
    pub max_features: usize,
}

impl TfidfVectorizer {
    pub fn fit<T: AsRef<str>>(documents: &[T], max_features: usize) -> Self {
        // term -> (corpus count, document frequency)
        let mut counts: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for doc in documents {
            let tokens = tokenize(doc.as_ref());
            let distinct: BTreeSet<&String> = tokens.iter().collect();
            for token in &tokens {
                counts.entry(token.clone()).or_insert((0, 0)).0 += 1;
            }
            for token in distinct {
                counts.get_mut(token).expect("token was just counted").1 += 1;
            }
        }

        let mut ranked: Vec<(&String, &(u64, u64))> = counts.iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(max_features);

        let mut selected: Vec<(String, u64)> = ranked
            .into_iter()
            .map(|(term, &(_, df))| (term.clone(), df))
            .collect();
        selected.sort_by(|a, b| a.0.cmp(&b.0));

        let n_docs = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(selected.len());
        for (index, (term, df)) in selected.into_iter().enumerate() {
            vocabulary.insert(term, index);
            idf.push(((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0);
        }

        Self {
            vocabulary,
            idf,
            max_features,
        }
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Map a text to its L2-normalized TF-IDF vector. Tokens outside the
    /// vocabulary are ignored; an all-unknown text maps to the zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut term_counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                *term_counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = term_counts
            .into_iter()
            .map(|(index, count)| (index, count * self.idf[index]))
            .collect();
        let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut vector {
                *w /= norm;
            }
        }
        vector
    }
}

/// Fit hyperparameters for [`SoftmaxRegression::fit`].
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2_penalty: f64,
}

/// Multinomial logistic regression over sparse feature vectors.
///
/// `classes` holds the original labels in sorted order; predictions return
/// original labels, never internal class indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    pub classes: Vec<i64>,
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl SoftmaxRegression {
    /// Full-batch gradient descent. `samples` and `labels` must be the same
    /// length and nonempty.
    pub fn fit(
        samples: &[SparseVector],
        labels: &[i64],
        n_features: usize,
        options: FitOptions,
    ) -> Self {
        let classes: Vec<i64> = labels.iter().copied().collect::<BTreeSet<i64>>().into_iter().collect();
        let class_index: HashMap<i64, usize> =
            classes.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        let n_classes = classes.len();
        let n_samples = samples.len() as f64;

        let mut weights = vec![vec![0.0; n_features]; n_classes];
        let mut bias = vec![0.0; n_classes];

        for _ in 0..options.epochs {
            let mut grad_w = vec![vec![0.0; n_features]; n_classes];
            let mut grad_b = vec![0.0; n_classes];

            for (sample, label) in samples.iter().zip(labels) {
                let probabilities = softmax(logits(&weights, &bias, sample));
                let target = class_index[label];
                for class in 0..n_classes {
                    let residual =
                        probabilities[class] - if class == target { 1.0 } else { 0.0 };
                    grad_b[class] += residual;
                    for &(feature, value) in sample {
                        grad_w[class][feature] += residual * value;
                    }
                }
            }

            for class in 0..n_classes {
                bias[class] -= options.learning_rate * grad_b[class] / n_samples;
                for feature in 0..n_features {
                    let gradient = grad_w[class][feature] / n_samples
                        + options.l2_penalty * weights[class][feature];
                    weights[class][feature] -= options.learning_rate * gradient;
                }
            }
        }

        Self {
            classes,
            weights,
            bias,
        }
    }

    /// Predicted label and its softmax probability.
    pub fn predict(&self, features: &SparseVector) -> (i64, f64) {
        let probabilities = softmax(logits(&self.weights, &self.bias, features));
        let (best, probability) = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .expect("model has at least one class");
        (self.classes[best], *probability)
    }
}

fn logits(weights: &[Vec<f64>], bias: &[f64], features: &SparseVector) -> Vec<f64> {
    bias.iter()
        .zip(weights)
        .map(|(b, row)| {
            b + features
                .iter()
                .map(|&(feature, value)| row[feature] * value)
                .sum::<f64>()
        })
        .collect()
}

fn softmax(mut logits: Vec<f64>) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for z in &mut logits {
        *z = (*z - max).exp();
        total += *z;
    }
    for z in &mut logits {
        *z /= total;
    }
    logits
}
