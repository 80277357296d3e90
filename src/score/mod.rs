// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Scenic scoring of [Nodes](crate::Node) from geotagged photo density.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::store::StoreError;
use crate::Node;

mod kde;
mod photos;

pub use kde::GaussianKde;
pub use photos::{read_photo_locations, read_photo_locations_from_file, PhotoLocation};

/// Scoring contract of a two-dimensional density estimator.
///
/// Given `(x, y)` coordinates (longitude and latitude in degrees), returns one score
/// per coordinate, in the same order. Higher density means higher scenic interest.
pub trait DensityModel {
    fn score_samples(&self, coordinates: &[(f64, f64)]) -> Result<Vec<f64>, ScoreError>;
}

/// How raw density scores are scaled before being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Store raw model output.
    None,

    /// Divide every batch by its own maximum. Since batches are drawn in random order,
    /// large batches approximate [Normalization::Global], but results differ between runs.
    PerBatch,

    /// Divide every score by the maximum over all nodes, in a dedicated pass after all
    /// batches are committed.
    ///
    /// The pass treats every stored score as raw model output. After new nodes are
    /// added to an already normalized store, run with
    /// [rescore](ScoreOptions::rescore) set, otherwise the raw scores of the new nodes
    /// are divided together with the old, already normalized ones.
    #[default]
    Global,
}

/// Controls [update_scores](crate::store::SpatialStore::update_scores).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOptions {
    /// Number of nodes scored and committed at once. Bounds memory usage.
    pub batch_size: usize,

    /// Re-score nodes which already have a score. When unset, a run only scores
    /// the nodes left over by an interrupted previous run.
    pub rescore: bool,

    pub normalization: Normalization,

    /// Seed for the shuffle of nodes; a random seed is used if [None].
    pub seed: Option<u64>,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            rescore: false,
            normalization: Normalization::default(),
            seed: None,
        }
    }
}

/// Summary of a scoring run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreReport {
    pub scored: usize,
    pub batches: usize,
    pub degenerate_segments: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("density model returned {got} scores for {expected} coordinates")]
    LengthMismatch { expected: usize, got: usize },

    #[error("density model returned score {score} for node {node_id}")]
    NonFiniteScore { node_id: i64, score: f64 },

    #[error("density model needs at least one sample")]
    EmptyModel,

    #[error("invalid kernel bandwidth: {0}")]
    InvalidBandwidth(f64),

    #[error("batch size must be positive")]
    InvalidBatchSize,

    /// Model-specific failure.
    #[error("density model failed: {0}")]
    Model(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub(crate) fn shuffle(nodes: &mut [Node], seed: Option<u64>) {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    nodes.shuffle(&mut rng);
}

/// Scores a single batch of nodes, validating the model output.
pub(crate) fn score_batch(
    model: &dyn DensityModel,
    nodes: &[Node],
    normalization: Normalization,
) -> Result<Vec<(i64, f64)>, ScoreError> {
    let coordinates: Vec<(f64, f64)> = nodes.iter().map(|n| (n.lon, n.lat)).collect();
    let mut scores = model.score_samples(&coordinates)?;

    if scores.len() != nodes.len() {
        return Err(ScoreError::LengthMismatch {
            expected: nodes.len(),
            got: scores.len(),
        });
    }

    if let Some((node, &score)) = nodes.iter().zip(&scores).find(|(_, s)| !s.is_finite()) {
        return Err(ScoreError::NonFiniteScore {
            node_id: node.id,
            score,
        });
    }

    if normalization == Normalization::PerBatch {
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if max > 0.0 {
            scores.iter_mut().for_each(|s| *s /= max);
        }
    }

    Ok(nodes.iter().map(|n| n.id).zip(scores).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LatitudeModel;

    impl DensityModel for LatitudeModel {
        fn score_samples(&self, coordinates: &[(f64, f64)]) -> Result<Vec<f64>, ScoreError> {
            Ok(coordinates.iter().map(|&(_, y)| y).collect())
        }
    }

    struct ShortModel;

    impl DensityModel for ShortModel {
        fn score_samples(&self, _: &[(f64, f64)]) -> Result<Vec<f64>, ScoreError> {
            Ok(vec![1.0])
        }
    }

    fn nodes() -> Vec<Node> {
        vec![Node::new(1, 2.0, 0.0), Node::new(2, 4.0, 0.0), Node::new(3, 1.0, 0.0)]
    }

    #[test]
    fn score_batch_keeps_order() {
        let scores = score_batch(&LatitudeModel, &nodes(), Normalization::None).unwrap();
        assert_eq!(scores, vec![(1, 2.0), (2, 4.0), (3, 1.0)]);
    }

    #[test]
    fn score_batch_normalizes_per_batch() {
        let scores = score_batch(&LatitudeModel, &nodes(), Normalization::PerBatch).unwrap();
        assert_eq!(scores, vec![(1, 0.5), (2, 1.0), (3, 0.25)]);
    }

    #[test]
    fn score_batch_rejects_wrong_length() {
        let err = score_batch(&ShortModel, &nodes(), Normalization::None).unwrap_err();
        assert_eq!(
            err,
            ScoreError::LengthMismatch {
                expected: 3,
                got: 1
            }
        );
    }

    #[test]
    fn score_batch_rejects_nan() {
        let nodes = vec![Node::new(1, 2.0, 0.0), Node::new(8, f64::NAN, 0.0)];
        let err = score_batch(&LatitudeModel, &nodes, Normalization::None).unwrap_err();
        assert!(matches!(err, ScoreError::NonFiniteScore { node_id: 8, .. }));
    }

    #[test]
    fn seeded_shuffle_is_deterministic() {
        let mut a: Vec<Node> = (1..50).map(|id| Node::new(id, 0.0, 0.0)).collect();
        let mut b = a.clone();
        shuffle(&mut a, Some(7));
        shuffle(&mut b, Some(7));
        assert_eq!(a, b);
    }
}
