// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod dijkstra;
mod error;

pub use dijkstra::find_path;
pub use error::{SearchError, DEFAULT_STEP_LIMIT};

/// A single [RouteEdge](crate::RouteEdge) as traversed by a [Path].
///
/// `reversed` is set when the edge was traversed from the node at `idx2` towards
/// the node at `idx1`, that is against the stored order of the way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathEdge {
    pub way_id: i64,
    pub idx1: u32,
    pub idx2: u32,
    pub distance: f64,
    pub score: f64,
    pub weight: f64,
    pub reversed: bool,
}

/// Minimum-weight path through a [RouteGraph](crate::RouteGraph).
///
/// `edges[i]` connects `nodes[i]` with `nodes[i + 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub nodes: Vec<i64>,
    pub edges: Vec<PathEdge>,
    pub total_weight: f64,
    pub total_distance: f64,
    pub total_score: f64,
}
