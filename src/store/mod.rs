// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Persistence of the walkable network: [Nodes](crate::Node), [Ways](crate::Way)
//! and [Waypoints](crate::Waypoint) behind the [SpatialStore] trait.

use std::ops::RangeInclusive;

use crate::score::{self, DensityModel, Normalization, ScoreError, ScoreOptions, ScoreReport};
use crate::{earth_distance, Node, Way, Waypoint};

mod memory;

pub use memory::MemoryStore;

/// Kind of entity kept in a [SpatialStore], used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Way,
    Waypoint,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Way => write!(f, "way"),
            Self::Waypoint => write!(f, "waypoint"),
        }
    }
}

/// Error conditions reported by a [SpatialStore].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// An entity with the same identifier was already inserted.
    /// Waypoint identifiers are reported as `way_id:idx`.
    #[error("duplicate {kind} {id}")]
    DuplicateIdentifier { kind: EntityKind, id: String },

    /// A waypoint references a node or a way which does not exist.
    #[error("reference to unknown {kind} {id}")]
    DanglingReference { kind: EntityKind, id: i64 },

    /// A query was made about a node which does not exist.
    #[error("unknown node {0}")]
    UnknownNode(i64),
}

/// Abstraction over a geo-indexed store of the walkable network.
///
/// Writes are staged and become visible to queries only after [SpatialStore::commit].
/// Distances and radii are expressed in meters.
///
/// Implementations must be usable from multiple route requests at once through a shared
/// reference; all query methods therefore take `&self`.
pub trait SpatialStore {
    /// Stages a new [Node]. Fails with [StoreError::DuplicateIdentifier]
    /// if a node with the same id was already inserted.
    fn insert_node(&mut self, node: Node) -> Result<(), StoreError>;

    /// Stages a new [Way]. Fails with [StoreError::DuplicateIdentifier]
    /// if a way with the same id was already inserted.
    fn insert_way(&mut self, way: Way) -> Result<(), StoreError>;

    /// Stages a new [Waypoint]. Both the referenced way and node must already
    /// be inserted (possibly in the same transaction).
    fn insert_waypoint(&mut self, waypoint: Waypoint) -> Result<(), StoreError>;

    /// Checks if a node with the given id was inserted, including staged, uncommitted nodes.
    fn contains_node(&self, id: i64) -> bool;

    /// Atomically applies all staged writes.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discards all staged writes.
    fn rollback(&mut self);

    /// Deletes all committed nodes not referenced by any committed waypoint.
    /// Returns the number of deleted nodes.
    fn prune_unused_nodes(&mut self) -> Result<usize, StoreError>;

    /// Retrieves a committed [Node] with the provided id.
    fn get_node(&self, id: i64) -> Result<Option<Node>, StoreError>;

    /// Returns committed routing nodes (`degree > 1`) within `radius` of the given point,
    /// ordered by ascending distance.
    fn nearest_routing_nodes(&self, lat: f64, lon: f64, radius: f64)
        -> Result<Vec<Node>, StoreError>;

    /// Returns the radius of the search bubble around both endpoints of a query:
    /// `expand` times the great-circle distance between them.
    fn neighborhood_radius(&self, a: &Node, b: &Node, expand: f64) -> f64 {
        expand * earth_distance(a.lat, a.lon, b.lat, b.lon)
    }

    /// Returns all waypoints whose node lies within [SpatialStore::neighborhood_radius]
    /// of `a` or `b`, and is either a routing node or one of `a` and `b`.
    /// Waypoints are ordered by `(way_id, idx)`.
    fn relevant_waypoints(
        &self,
        a: &Node,
        b: &Node,
        expand: f64,
    ) -> Result<Vec<Waypoint>, StoreError>;

    /// Returns the waypoints of a way with `idx` in the provided range together with
    /// their nodes, ordered by `idx`.
    fn way_waypoints(
        &self,
        way_id: i64,
        idx: RangeInclusive<u32>,
    ) -> Result<Vec<(Waypoint, Node)>, StoreError>;

    /// Returns committed nodes touched by at least one way. Unless `rescore` is set,
    /// nodes which already have a scenic score are omitted.
    fn scoring_candidates(&self, rescore: bool) -> Result<Vec<Node>, StoreError>;

    /// Stages new scenic scores for the provided nodes.
    fn set_scores(&mut self, scores: &[(i64, f64)]) -> Result<(), StoreError>;

    /// Returns the highest committed scenic score, if any node is scored.
    fn max_score(&self) -> Result<Option<f64>, StoreError>;

    /// Stages division of every committed scenic score by `divisor`.
    fn divide_scores(&mut self, divisor: f64) -> Result<(), StoreError>;

    /// Recomputes the cumulative distance and cumulative score of every waypoint
    /// as prefix sums over each way, ordered by `idx`, and commits them.
    ///
    /// Both sums start at zero on the first waypoint of a way. The distance and the
    /// node score of waypoint `i` is added when reaching it from waypoint `i - 1`.
    /// The cumulative score stays undefined from the first unscored node onwards.
    ///
    /// Returns the number of zero-length segments (consecutive waypoints at the same
    /// position); such segments are otherwise kept as-is.
    fn recompute_cumulative(&mut self) -> Result<usize, StoreError>;

    /// Scores nodes with the provided density model, and recomputes cumulative values.
    ///
    /// Candidate nodes (see [SpatialStore::scoring_candidates]) are shuffled and scored
    /// in batches of [ScoreOptions::batch_size], each batch committed separately.
    /// A failing batch is rolled back and the error is returned; previously committed
    /// batches keep their scores, so a subsequent run (without `rescore`) resumes on
    /// the remaining nodes.
    ///
    /// Re-running on fully scored data reproduces identical cumulative values.
    fn update_scores(
        &mut self,
        model: &dyn DensityModel,
        options: &ScoreOptions,
    ) -> Result<ScoreReport, ScoreError> {
        if options.batch_size == 0 {
            return Err(ScoreError::InvalidBatchSize);
        }

        let mut nodes = self.scoring_candidates(options.rescore)?;
        score::shuffle(&mut nodes, options.seed);

        let mut report = ScoreReport::default();
        let total = nodes.len();

        for batch in nodes.chunks(options.batch_size) {
            let scores = match score::score_batch(model, batch, options.normalization) {
                Ok(scores) => scores,
                Err(e) => {
                    log::warn!(
                        "scoring batch {} failed after {}/{} nodes: {}",
                        report.batches + 1,
                        report.scored,
                        total,
                        e
                    );
                    self.rollback();
                    return Err(e);
                }
            };

            self.set_scores(&scores)?;
            self.commit()?;

            report.batches += 1;
            report.scored += scores.len();
            log::info!("scored {}/{} nodes", report.scored, total);
        }

        if options.normalization == Normalization::Global {
            if let Some(max) = self.max_score()? {
                if max > 0.0 && max != 1.0 {
                    log::debug!("normalizing scores by global maximum {max}");
                    self.divide_scores(max)?;
                    self.commit()?;
                }
            }
        }

        report.degenerate_segments = self.recompute_cumulative()?;
        Ok(report)
    }
}
