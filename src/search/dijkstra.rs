// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use super::{Path, PathEdge, SearchError};
use crate::RouteGraph;

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: i64,
    cost: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // NOTE: We revert the order of comparison,
        // as lower costs are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.at.cmp(&self.at))
    }
}

fn reconstruct_path(came_from: &HashMap<i64, i64>, mut last: i64) -> Vec<i64> {
    let mut path = vec![last];

    while let Some(&nd) = came_from.get(&last) {
        path.push(nd);
        last = nd;
    }

    path.reverse();
    path
}

fn validate_weights(g: &RouteGraph) -> Result<(), SearchError> {
    match g
        .edges()
        .find(|e| !(e.weight.is_finite() && e.weight >= 0.0))
    {
        Some(e) => Err(SearchError::InvalidEdgeWeight {
            from: e.from,
            to: e.to,
            weight: e.weight,
        }),
        None => Ok(()),
    }
}

fn annotate_path(g: &RouteGraph, nodes: Vec<i64>) -> Path {
    let mut path = Path {
        edges: Vec::with_capacity(nodes.len().saturating_sub(1)),
        ..Default::default()
    };

    for pair in nodes.windows(2) {
        if let Some(e) = g.get_edge(pair[0], pair[1]) {
            path.total_weight += e.weight;
            path.total_distance += e.distance;
            path.total_score += e.score;
            path.edges.push(PathEdge {
                way_id: e.way_id,
                idx1: e.idx1,
                idx2: e.idx2,
                distance: e.distance,
                score: e.score,
                weight: e.weight,
                reversed: e.from != pair[0],
            });
        }
    }

    path.nodes = nodes;
    path
}

/// Uses [Dijkstra's algorithm](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm)
/// to find the minimum-weight path between two nodes in the provided graph.
///
/// All edge weights are checked before the search, and the first negative or
/// undefined one is reported as [SearchError::InvalidEdgeWeight].
///
/// `step_limit` limits how many nodes may be expanded during the search
/// before returning [SearchError::StepLimitExceeded]. The recommended value is
/// [DEFAULT_STEP_LIMIT](crate::DEFAULT_STEP_LIMIT).
pub fn find_path(
    g: &RouteGraph,
    from_id: i64,
    to_id: i64,
    step_limit: usize,
) -> Result<Path, SearchError> {
    for id in [from_id, to_id] {
        if !g.contains_node(id) {
            return Err(SearchError::NodeNotFound(id));
        }
    }

    validate_weights(g)?;

    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut came_from: HashMap<i64, i64> = HashMap::default();
    let mut known_costs: HashMap<i64, f64> = HashMap::default();
    let mut steps: usize = 0;

    queue.push(QueueItem {
        at: from_id,
        cost: 0.0,
    });
    known_costs.insert(from_id, 0.0);

    while let Some(item) = queue.pop() {
        if item.at == to_id {
            return Ok(annotate_path(g, reconstruct_path(&came_from, to_id)));
        }

        // Multiple items might be kept in the queue for the same node.
        if item.cost > known_costs.get(&item.at).cloned().unwrap_or(f64::INFINITY) {
            continue;
        }

        steps += 1;
        if steps > step_limit {
            return Err(SearchError::StepLimitExceeded);
        }

        for (neighbor_id, edge) in g.neighbors(item.at) {
            let neighbor_cost = item.cost + edge.weight;
            if neighbor_cost
                >= known_costs
                    .get(&neighbor_id)
                    .cloned()
                    .unwrap_or(f64::INFINITY)
            {
                continue;
            }

            came_from.insert(neighbor_id, item.at);
            known_costs.insert(neighbor_id, neighbor_cost);
            queue.push(QueueItem {
                at: neighbor_id,
                cost: neighbor_cost,
            });
        }
    }

    Err(SearchError::NoPathFound {
        from: from_id,
        to: to_id,
    })
}
