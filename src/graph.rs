// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::btree_map::{BTreeMap, Entry};

use crate::search::{find_path, Path, SearchError, DEFAULT_STEP_LIMIT};
use crate::Waypoint;

/// Computes the weight of a segment: `distance × (1 + alpha × score)`.
///
/// Negative `alpha` values favor scenic segments, positive values avoid them.
/// The result is not validated; the path finder rejects negative and undefined weights.
#[inline]
pub fn edge_weight(distance: f64, score: f64, alpha: f64) -> f64 {
    distance * (1.0 + alpha * score)
}

#[inline]
fn is_valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight >= 0.0
}

/// Undirected connection between two nodes of a [RouteGraph], created from two consecutive
/// waypoints of a single way.
///
/// `from` and `to` are the nodes at `idx1` and `idx2` respectively, thus follow the stored
/// order of the way, not necessarily the direction of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteEdge {
    pub from: i64,
    pub to: i64,
    pub way_id: i64,
    pub idx1: u32,
    pub idx2: u32,
    pub distance: f64,
    pub score: f64,
    pub weight: f64,
}

impl RouteEdge {
    /// Returns the node on the opposite end of the edge.
    pub fn other(&self, node_id: i64) -> i64 {
        if node_id == self.from {
            self.to
        } else {
            self.from
        }
    }

    /// Checks if this edge should replace an `existing` one between the same nodes.
    /// Invalid weights take precedence, so that they are never hidden by deduplication.
    fn replaces(&self, existing: &RouteEdge) -> bool {
        match (is_valid_weight(self.weight), is_valid_weight(existing.weight)) {
            (true, true) => self.weight < existing.weight,
            (false, true) => true,
            (_, false) => false,
        }
    }
}

/// Weighted, undirected simple graph built from [Waypoints](Waypoint) for a single route query.
///
/// Every pair of consecutive waypoints of a way becomes an edge. At most one edge is kept
/// between any two nodes: the one with the lowest weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteGraph {
    alpha: f64,
    adjacency: BTreeMap<i64, BTreeMap<i64, RouteEdge>>,
}

impl RouteGraph {
    /// Creates an empty graph, weighting edges with the provided `alpha`.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            adjacency: BTreeMap::default(),
        }
    }

    /// Builds a graph from waypoints of any number of ways. Waypoints are grouped
    /// by `way_id` and ordered by `idx` before creating edges, so the input order is irrelevant.
    pub fn from_waypoints(waypoints: &[Waypoint], alpha: f64) -> Self {
        let mut ways: BTreeMap<i64, Vec<Waypoint>> = BTreeMap::default();
        for &wp in waypoints {
            ways.entry(wp.way_id).or_default().push(wp);
        }

        let mut g = Self::new(alpha);
        for (_, mut way) in ways {
            way.sort_by_key(|wp| wp.idx);
            g.add_way(&way);
        }
        g
    }

    /// Adds edges between consecutive waypoints of a single way, which must be
    /// ordered by `idx`. Every waypoint's node becomes a vertex, even without any edges.
    pub fn add_way(&mut self, waypoints: &[Waypoint]) {
        debug_assert!(waypoints.windows(2).all(|p| p[0].way_id == p[1].way_id));
        debug_assert!(waypoints.windows(2).all(|p| p[0].idx < p[1].idx));

        for wp in waypoints {
            self.adjacency.entry(wp.node_id).or_default();
        }

        for pair in waypoints.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.node_id == b.node_id {
                continue;
            }

            let distance = difference(a.cumulative_distance, b.cumulative_distance);
            let score = difference(a.cumulative_score, b.cumulative_score);
            self.set_edge(RouteEdge {
                from: a.node_id,
                to: b.node_id,
                way_id: a.way_id,
                idx1: a.idx,
                idx2: b.idx,
                distance,
                score,
                weight: edge_weight(distance, score, self.alpha),
            });
        }
    }

    fn set_edge(&mut self, edge: RouteEdge) {
        for (from, to) in [(edge.from, edge.to), (edge.to, edge.from)] {
            match self.adjacency.entry(from).or_default().entry(to) {
                Entry::Vacant(e) => {
                    e.insert(edge);
                }
                Entry::Occupied(mut e) => {
                    if edge.replaces(e.get()) {
                        e.insert(edge);
                    }
                }
            }
        }
    }

    /// Returns the `alpha` used to weight the edges.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Returns the number of (undirected) edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(|e| e.len()).sum::<usize>() / 2
    }

    pub fn contains_node(&self, id: i64) -> bool {
        self.adjacency.contains_key(&id)
    }

    /// Gets the [RouteEdge] between two nodes, regardless of their order.
    pub fn get_edge(&self, a: i64, b: i64) -> Option<&RouteEdge> {
        self.adjacency.get(&a).and_then(|edges| edges.get(&b))
    }

    /// Returns an iterator over neighbors of a node, together with the connecting edges,
    /// ordered by neighbor id.
    pub fn neighbors(&self, id: i64) -> impl Iterator<Item = (i64, &RouteEdge)> {
        self.adjacency
            .get(&id)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(&to, edge)| (to, edge)))
    }

    /// Returns an iterator over every edge of the graph, each reported once.
    pub fn edges(&self) -> impl Iterator<Item = &RouteEdge> {
        self.adjacency
            .iter()
            .flat_map(|(&id, edges)| edges.values().filter(move |e| e.from == id))
    }

    /// Finds the minimum-weight path between two nodes, see [find_path].
    pub fn get_optimal_path(&self, from: i64, to: i64) -> Result<Path, SearchError> {
        find_path(self, from, to, DEFAULT_STEP_LIMIT)
    }
}

#[inline]
fn difference(start: Option<f64>, end: Option<f64>) -> f64 {
    match (start, end) {
        (Some(start), Some(end)) => end - start,
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(way_id: i64, idx: u32, node_id: i64, distance: f64, score: f64) -> Waypoint {
        Waypoint {
            way_id,
            idx,
            node_id,
            cumulative_distance: Some(distance),
            cumulative_score: Some(score),
        }
    }

    /// N1 ── 100 m ── N2 ── 150 m ── N3 over way 1, and N1 ── 300 m ── N3 over way 2.
    fn scenario() -> Vec<Waypoint> {
        vec![
            wp(1, 0, 1, 0.0, 0.0),
            wp(1, 1, 2, 100.0, 0.1),
            wp(1, 2, 3, 250.0, 0.3),
            wp(2, 0, 1, 0.0, 0.0),
            wp(2, 1, 3, 300.0, 0.9),
        ]
    }

    #[test]
    fn distance_only_weights() {
        let g = RouteGraph::from_waypoints(&scenario(), 0.0);
        assert_eq!(g.len(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.get_edge(1, 2).unwrap().weight, 100.0);
        assert_eq!(g.get_edge(2, 3).unwrap().weight, 150.0);
        assert_eq!(g.get_edge(1, 3).unwrap().weight, 300.0);
        assert_eq!(g.get_edge(3, 1), g.get_edge(1, 3));
    }

    #[test]
    fn edge_attributes() {
        let g = RouteGraph::from_waypoints(&scenario(), 2.0);
        let e = g.get_edge(3, 2).unwrap();
        assert_eq!((e.from, e.to), (2, 3));
        assert_eq!((e.way_id, e.idx1, e.idx2), (1, 1, 2));
        assert!((e.distance - 150.0).abs() < 1e-9);
        assert!((e.score - 0.2).abs() < 1e-9);
        assert!((e.weight - 150.0 * 1.4).abs() < 1e-9);
        assert_eq!(e.other(2), 3);
        assert_eq!(e.other(3), 2);
    }

    #[test]
    fn keeps_lower_weight_edge() {
        let waypoints = vec![
            wp(10, 0, 1, 0.0, 0.0),
            wp(10, 1, 2, 80.0, 0.0),
            wp(11, 0, 2, 0.0, 0.0),
            wp(11, 1, 1, 50.0, 0.0),
            wp(12, 0, 1, 0.0, 0.0),
            wp(12, 1, 2, 70.0, 0.0),
        ];
        let g = RouteGraph::from_waypoints(&waypoints, 0.0);
        assert_eq!(g.edge_count(), 1);

        let e = g.get_edge(1, 2).unwrap();
        assert_eq!(e.weight, 50.0);
        assert_eq!(e.way_id, 11);
        assert_eq!((e.from, e.to), (2, 1));
    }

    #[test]
    fn invalid_weights_are_not_hidden() {
        let waypoints = vec![
            wp(1, 0, 1, 0.0, 0.0),
            wp(1, 1, 2, 50.0, 0.0),
            Waypoint::new(2, 0, 1),
            Waypoint::new(2, 1, 2),
        ];
        let g = RouteGraph::from_waypoints(&waypoints, 0.0);
        assert!(g.get_edge(1, 2).unwrap().weight.is_nan());
    }

    #[test]
    fn skips_self_loops() {
        let waypoints = vec![
            wp(1, 0, 1, 0.0, 0.0),
            wp(1, 1, 1, 0.0, 0.0),
            wp(1, 2, 2, 10.0, 0.0),
        ];
        let g = RouteGraph::from_waypoints(&waypoints, 0.0);
        assert_eq!(g.len(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.get_edge(1, 1).is_none());
    }

    #[test]
    fn groups_unordered_input() {
        let mut waypoints = scenario();
        waypoints.reverse();
        assert_eq!(
            RouteGraph::from_waypoints(&waypoints, 0.5),
            RouteGraph::from_waypoints(&scenario(), 0.5)
        );
    }

    #[test]
    fn deterministic() {
        let a = RouteGraph::from_waypoints(&scenario(), -0.3);
        let b = RouteGraph::from_waypoints(&scenario(), -0.3);
        assert_eq!(a, b);
        assert_eq!(
            a.edges().copied().collect::<Vec<_>>(),
            b.edges().copied().collect::<Vec<_>>()
        );
        assert_eq!(a.edges().count(), 3);
    }

    #[test]
    fn neighbors() {
        let g = RouteGraph::from_waypoints(&scenario(), 0.0);
        let n: Vec<i64> = g.neighbors(1).map(|(id, _)| id).collect();
        assert_eq!(n, vec![2, 3]);
        assert_eq!(g.neighbors(42).count(), 0);
    }
}
