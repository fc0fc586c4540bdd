//! Anomaly flagging over transfer amounts.
//!
//! The flagger owns no detection logic. It feeds the single feature
//! `amount` to an `OutlierModel` and returns the records the model calls
//! outliers. `IsolationForest` is the production model; its output is
//! reproducible for a fixed seed and only tolerance-stable across seeds.

use crate::{
    error::{TrackerError, TrackerResult},
    parser::TransferRecord,
    rng::ModelRng,
};
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Prediction {
    Inlier,
    Outlier,
}

/// Fit on all features, then label each one.
pub trait OutlierModel {
    /// Returns exactly one prediction per feature, in order.
    fn fit_predict(&mut self, features: &[f64], contamination: f64) -> Vec<Prediction>;
}

/// A transfer the model marked as an outlier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlaggedTransfer {
    /// Position in the input record slice.
    pub index:  usize,
    pub record: TransferRecord,
}

pub fn validate_contamination(contamination: f64) -> TrackerResult<()> {
    if contamination > 0.0 && contamination <= 0.5 {
        Ok(())
    } else {
        Err(TrackerError::InvalidContamination { value: contamination })
    }
}

/// Mark outlier transfers by amount.
pub fn flag(
    records: &[TransferRecord],
    contamination: f64,
    model: &mut dyn OutlierModel,
) -> TrackerResult<Vec<FlaggedTransfer>> {
    validate_contamination(contamination)?;
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let amounts: Vec<f64> = records.iter().map(|r| r.amount).collect();
    let predictions = model.fit_predict(&amounts, contamination);
    if predictions.len() != records.len() {
        return Err(anyhow::anyhow!(
            "outlier model returned {} predictions for {} records",
            predictions.len(),
            records.len()
        )
        .into());
    }

    let flagged: Vec<FlaggedTransfer> = records
        .iter()
        .zip(predictions)
        .enumerate()
        .filter(|(_, (_, p))| *p == Prediction::Outlier)
        .map(|(index, (record, _))| FlaggedTransfer { index, record: record.clone() })
        .collect();

    log::info!("Flagged {} of {} transfers as anomalous", flagged.len(), records.len());
    Ok(flagged)
}

// ── Isolation forest ─────────────────────────────────────────────────────────

/// One-dimensional isolation forest.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    pub n_trees:     usize,
    pub sample_size: usize,
    pub seed:        u64,
}

impl IsolationForest {
    pub fn new(n_trees: usize, sample_size: usize, seed: u64) -> Self {
        Self { n_trees, sample_size, seed }
    }

    /// Anomaly score in (0, 1] per feature; higher is more anomalous.
    pub fn score_samples(&self, features: &[f64]) -> Vec<f64> {
        let n = features.len();
        if n == 0 {
            return Vec::new();
        }
        let psi = self.sample_size.clamp(1, n);
        let depth_limit = (psi as f64).log2().ceil() as usize;
        let norm = average_path_length(psi);

        let trees: Vec<IsolationTree> = (0..self.n_trees.max(1))
            .map(|t| {
                let mut rng = ModelRng::new(self.seed, t as u64);
                let sample: Vec<f64> = rng
                    .sample_indices(n, psi)
                    .into_iter()
                    .map(|i| features[i])
                    .collect();
                IsolationTree::grow(&sample, 0, depth_limit, &mut rng)
            })
            .collect();

        features
            .iter()
            .map(|&x| {
                let mean_path = trees.iter().map(|t| t.path_length(x, 0)).sum::<f64>()
                    / trees.len() as f64;
                if norm > 0.0 {
                    2f64.powf(-mean_path / norm)
                } else {
                    // A single-point sample cannot isolate anything.
                    0.5
                }
            })
            .collect()
    }
}

impl OutlierModel for IsolationForest {
    fn fit_predict(&mut self, features: &[f64], contamination: f64) -> Vec<Prediction> {
        let scores = self.score_samples(features);
        let threshold = quantile(&scores, 1.0 - contamination);
        scores
            .into_iter()
            .map(|s| if s > threshold { Prediction::Outlier } else { Prediction::Inlier })
            .collect()
    }
}

enum IsolationTree {
    Leaf { size: usize },
    Split { value: f64, left: Box<IsolationTree>, right: Box<IsolationTree> },
}

impl IsolationTree {
    fn grow(sample: &[f64], depth: usize, depth_limit: usize, rng: &mut ModelRng) -> Self {
        let (min, max) = sample
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
        if depth >= depth_limit || sample.len() <= 1 || min >= max {
            return Self::Leaf { size: sample.len() };
        }

        let value = rng.uniform(min, max);
        let (left, right): (Vec<f64>, Vec<f64>) = sample.iter().copied().partition(|&x| x < value);
        Self::Split {
            value,
            left:  Box::new(Self::grow(&left, depth + 1, depth_limit, rng)),
            right: Box::new(Self::grow(&right, depth + 1, depth_limit, rng)),
        }
    }

    fn path_length(&self, x: f64, depth: usize) -> f64 {
        match self {
            Self::Leaf { size } => depth as f64 + average_path_length(*size),
            Self::Split { value, left, right } => {
                if x < *value {
                    left.path_length(x, depth + 1)
                } else {
                    right.path_length(x, depth + 1)
                }
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over n points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated quantile, q in [0, 1].
fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
