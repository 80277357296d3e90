// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Recommended number of allowed node expansions in [find_path](crate::find_path)
/// before [SearchError::StepLimitExceeded] is returned.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Error conditions which may occur during [find_path](crate::find_path).
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum SearchError {
    /// The start or end node is not a vertex of the graph.
    #[error("node {0} is not in the graph")]
    NodeNotFound(i64),

    /// Both nodes are in the graph, but in different connected components.
    #[error("no path from {from} to {to}")]
    NoPathFound { from: i64, to: i64 },

    /// An edge has a negative or undefined weight.
    #[error("invalid weight {weight} of edge {from}-{to}")]
    InvalidEdgeWeight { from: i64, to: i64, weight: f64 },

    /// Search has exceeded its limit of steps.
    ///
    /// Concluding that no path exists requires traversing the whole connected component,
    /// and the step limit protects against resource exhaustion on large graphs.
    #[error("step limit exceeded")]
    StepLimitExceeded,
}
