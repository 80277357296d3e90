// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::RangeInclusive;

use super::{EntityKind, SpatialStore, StoreError};
use crate::{earth_distance, KDTree, Node, Position, Way, Waypoint};

/// Writes awaiting [SpatialStore::commit].
#[derive(Debug, Default, Clone)]
struct Staged {
    nodes: BTreeMap<i64, Node>,
    ways: BTreeMap<i64, Way>,
    waypoints: BTreeMap<(i64, u32), Waypoint>,
    scores: Vec<(i64, f64)>,
}

impl Staged {
    fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.ways.is_empty()
            && self.waypoints.is_empty()
            && self.scores.is_empty()
    }
}

/// In-memory [SpatialStore], with node positions indexed by a [KDTree].
///
/// The index is rebuilt whenever the set of nodes changes, which makes
/// committing new nodes in small batches expensive. Queries never touch staged writes.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    nodes: BTreeMap<i64, Node>,
    ways: BTreeMap<i64, Way>,
    waypoints: BTreeMap<(i64, u32), Waypoint>,
    node_waypoints: HashMap<i64, Vec<(i64, u32)>>,
    index: Option<KDTree>,
    staged: Staged,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of committed ways.
    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Returns the number of committed waypoints.
    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    /// Retrieves a committed [Way] with the provided id.
    pub fn get_way(&self, id: i64) -> Option<&Way> {
        self.ways.get(&id)
    }

    /// Returns an iterator over all committed [Nodes](Node), ordered by id.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Returns an iterator over all committed [Waypoints](Waypoint), ordered by `(way_id, idx)`.
    pub fn iter_waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.values()
    }

    /// Checks if there are any staged writes.
    pub fn has_staged_writes(&self) -> bool {
        !self.staged.is_empty()
    }

    fn committed_node(&self, id: i64) -> Result<&Node, StoreError> {
        self.nodes.get(&id).ok_or(StoreError::UnknownNode(id))
    }

    fn contains_way(&self, id: i64) -> bool {
        self.ways.contains_key(&id) || self.staged.ways.contains_key(&id)
    }

    fn rebuild_index(&mut self) {
        self.index = KDTree::from_iter(self.nodes.values().map(Position::from));
    }

    fn find_within(&self, lat: f64, lon: f64, radius: f64) -> Vec<(f64, Position)> {
        self.index
            .as_ref()
            .map(|index| index.find_within(lat, lon, radius))
            .unwrap_or_default()
    }

    fn update_degree(&mut self, node_id: i64) {
        let degree = self
            .node_waypoints
            .get(&node_id)
            .map(|keys| {
                keys.iter()
                    .map(|&(way_id, _)| way_id)
                    .collect::<BTreeSet<_>>()
                    .len() as u32
            })
            .unwrap_or(0);

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.degree = degree;
        }
    }
}

impl SpatialStore for MemoryStore {
    fn insert_node(&mut self, node: Node) -> Result<(), StoreError> {
        if self.contains_node(node.id) {
            return Err(StoreError::DuplicateIdentifier {
                kind: EntityKind::Node,
                id: node.id.to_string(),
            });
        }
        self.staged.nodes.insert(node.id, node);
        Ok(())
    }

    fn insert_way(&mut self, way: Way) -> Result<(), StoreError> {
        if self.contains_way(way.id) {
            return Err(StoreError::DuplicateIdentifier {
                kind: EntityKind::Way,
                id: way.id.to_string(),
            });
        }
        self.staged.ways.insert(way.id, way);
        Ok(())
    }

    fn insert_waypoint(&mut self, waypoint: Waypoint) -> Result<(), StoreError> {
        let key = waypoint.key();
        if self.waypoints.contains_key(&key) || self.staged.waypoints.contains_key(&key) {
            return Err(StoreError::DuplicateIdentifier {
                kind: EntityKind::Waypoint,
                id: format!("{}:{}", key.0, key.1),
            });
        }
        if !self.contains_way(waypoint.way_id) {
            return Err(StoreError::DanglingReference {
                kind: EntityKind::Way,
                id: waypoint.way_id,
            });
        }
        if !self.contains_node(waypoint.node_id) {
            return Err(StoreError::DanglingReference {
                kind: EntityKind::Node,
                id: waypoint.node_id,
            });
        }
        self.staged.waypoints.insert(key, waypoint);
        Ok(())
    }

    fn contains_node(&self, id: i64) -> bool {
        self.nodes.contains_key(&id) || self.staged.nodes.contains_key(&id)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);
        let nodes_changed = !staged.nodes.is_empty();

        self.nodes.extend(staged.nodes);
        self.ways.extend(staged.ways);

        let mut touched = BTreeSet::default();
        for (key, waypoint) in staged.waypoints {
            self.node_waypoints
                .entry(waypoint.node_id)
                .or_default()
                .push(key);
            touched.insert(waypoint.node_id);
            self.waypoints.insert(key, waypoint);
        }
        touched.into_iter().for_each(|id| self.update_degree(id));

        for (id, score) in staged.scores {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.scenic_score = Some(score);
            }
        }

        if nodes_changed {
            self.rebuild_index();
        }
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged = Staged::default();
    }

    fn prune_unused_nodes(&mut self) -> Result<usize, StoreError> {
        let before = self.nodes.len();
        let node_waypoints = &self.node_waypoints;
        self.nodes
            .retain(|id, _| node_waypoints.get(id).is_some_and(|keys| !keys.is_empty()));

        let pruned = before - self.nodes.len();
        if pruned > 0 {
            self.rebuild_index();
        }
        Ok(pruned)
    }

    fn get_node(&self, id: i64) -> Result<Option<Node>, StoreError> {
        Ok(self.nodes.get(&id).copied())
    }

    fn nearest_routing_nodes(
        &self,
        lat: f64,
        lon: f64,
        radius: f64,
    ) -> Result<Vec<Node>, StoreError> {
        Ok(self
            .find_within(lat, lon, radius)
            .into_iter()
            .filter_map(|(_, p)| self.nodes.get(&p.id))
            .filter(|n| n.is_routing_node())
            .copied()
            .collect())
    }

    fn relevant_waypoints(
        &self,
        a: &Node,
        b: &Node,
        expand: f64,
    ) -> Result<Vec<Waypoint>, StoreError> {
        let a = self.committed_node(a.id)?;
        let b = self.committed_node(b.id)?;
        let radius = self.neighborhood_radius(a, b, expand);

        let node_ids: BTreeSet<i64> = self
            .find_within(a.lat, a.lon, radius)
            .into_iter()
            .chain(self.find_within(b.lat, b.lon, radius))
            .map(|(_, p)| p.id)
            .filter(|&id| {
                id == a.id
                    || id == b.id
                    || self.nodes.get(&id).is_some_and(|n| n.is_routing_node())
            })
            .collect();

        let mut keys: Vec<(i64, u32)> = node_ids
            .iter()
            .filter_map(|id| self.node_waypoints.get(id))
            .flatten()
            .copied()
            .collect();
        keys.sort_unstable();
        keys.dedup();

        Ok(keys
            .into_iter()
            .filter_map(|key| self.waypoints.get(&key))
            .copied()
            .collect())
    }

    fn way_waypoints(
        &self,
        way_id: i64,
        idx: RangeInclusive<u32>,
    ) -> Result<Vec<(Waypoint, Node)>, StoreError> {
        self.waypoints
            .range((way_id, *idx.start())..=(way_id, *idx.end()))
            .map(|(_, &wp)| match self.nodes.get(&wp.node_id) {
                Some(&node) => Ok((wp, node)),
                None => Err(StoreError::DanglingReference {
                    kind: EntityKind::Node,
                    id: wp.node_id,
                }),
            })
            .collect()
    }

    fn scoring_candidates(&self, rescore: bool) -> Result<Vec<Node>, StoreError> {
        Ok(self
            .nodes
            .values()
            .filter(|n| n.degree > 0 && (rescore || n.scenic_score.is_none()))
            .copied()
            .collect())
    }

    fn set_scores(&mut self, scores: &[(i64, f64)]) -> Result<(), StoreError> {
        if let Some(&(id, _)) = scores.iter().find(|(id, _)| !self.nodes.contains_key(id)) {
            return Err(StoreError::UnknownNode(id));
        }
        self.staged.scores.extend_from_slice(scores);
        Ok(())
    }

    fn max_score(&self) -> Result<Option<f64>, StoreError> {
        Ok(self
            .nodes
            .values()
            .filter_map(|n| n.scenic_score)
            .reduce(f64::max))
    }

    fn divide_scores(&mut self, divisor: f64) -> Result<(), StoreError> {
        let divided = self
            .nodes
            .values()
            .filter_map(|n| n.scenic_score.map(|s| (n.id, s / divisor)));
        self.staged.scores.extend(divided);
        Ok(())
    }

    fn recompute_cumulative(&mut self) -> Result<usize, StoreError> {
        let mut degenerate = 0;
        let mut previous: Option<(i64, Node)> = None;
        let mut distance = 0.0;
        let mut score = Some(0.0);

        for (&(way_id, idx), wp) in self.waypoints.iter_mut() {
            let node = *self
                .nodes
                .get(&wp.node_id)
                .ok_or(StoreError::DanglingReference {
                    kind: EntityKind::Node,
                    id: wp.node_id,
                })?;

            match previous {
                Some((previous_way_id, previous_node)) if previous_way_id == way_id => {
                    let segment =
                        earth_distance(previous_node.lat, previous_node.lon, node.lat, node.lon);
                    if segment == 0.0 {
                        log::warn!(
                            "zero-length segment on way {} between nodes {} and {} (idx {})",
                            way_id,
                            previous_node.id,
                            node.id,
                            idx
                        );
                        degenerate += 1;
                    }
                    distance += segment;
                    score = score.zip(node.scenic_score).map(|(s, n)| s + n);
                }
                _ => {
                    distance = 0.0;
                    score = Some(0.0);
                }
            }

            wp.cumulative_distance = Some(distance);
            wp.cumulative_score = score;
            previous = Some((way_id, node));
        }

        Ok(degenerate)
    }
}
