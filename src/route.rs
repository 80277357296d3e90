// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Answering route requests between two coordinates.

use crate::store::{SpatialStore, StoreError};
use crate::{find_path, Node, Path, RouteGraph, SearchError, DEFAULT_STEP_LIMIT};

/// Controls [plan_route].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOptions {
    /// Trade-off between distance and scenic score, see [edge_weight](crate::edge_weight).
    pub alpha: f64,

    /// Maximum distance (in meters) between a requested coordinate and its routing node.
    pub snap_radius: f64,

    /// Initial size of the search neighborhood, relative to the distance between the endpoints.
    pub expand: f64,

    /// Growth of `expand` after a failed attempt.
    pub expand_factor: f64,

    /// Largest `expand` attempted before giving up.
    pub max_expand: f64,

    pub step_limit: usize,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            alpha: 0.0,
            snap_radius: 500.0,
            expand: 1.0,
            expand_factor: 2.0,
            max_expand: 4.0,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

/// Single point of a [Route] geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePoint {
    pub node_id: i64,
    pub lat: f64,
    pub lon: f64,
}

impl From<&Node> for RoutePoint {
    fn from(n: &Node) -> Self {
        Self {
            node_id: n.id,
            lat: n.lat,
            lon: n.lon,
        }
    }
}

/// Result of [plan_route].
///
/// `points` contains every node along the traversed ways, including the ones
/// which are not routing nodes, while `path` only goes over routing nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub points: Vec<RoutePoint>,
    pub path: Path,
    pub total_distance: f64,
    pub total_score: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("no routing node near ({lat}, {lon})")]
    NoNearbyNode { lat: f64, lon: f64 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl RouteError {
    /// Checks if a larger search neighborhood might fix the error.
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Search(SearchError::NodeNotFound(_) | SearchError::NoPathFound { .. })
        )
    }
}

/// Finds the best route between two `(lat, lon)` coordinates.
///
/// Both coordinates are snapped to the nearest routing nodes within
/// [RouteOptions::snap_radius]. A [RouteGraph] is then built over the
/// [relevant waypoints](SpatialStore::relevant_waypoints) of both nodes and searched.
/// If the endpoints are not connected within the neighborhood, the search is retried
/// with `expand` multiplied by [RouteOptions::expand_factor], as long as it doesn't exceed
/// [RouteOptions::max_expand].
///
/// Only takes a shared reference to the store, multiple requests may be answered at once.
pub fn plan_route<S: SpatialStore + ?Sized>(
    store: &S,
    from: (f64, f64),
    to: (f64, f64),
    options: &RouteOptions,
) -> Result<Route, RouteError> {
    let a = snap(store, from, options.snap_radius)?;
    let b = snap(store, to, options.snap_radius)?;

    let mut expand = options.expand;
    loop {
        match search_neighborhood(store, &a, &b, expand, options) {
            Ok(path) => return resolve_route(store, path),

            Err(e) if e.is_retryable() => {
                let next = expand * options.expand_factor;
                if next <= expand || next > options.max_expand {
                    return Err(e);
                }
                log::debug!("{} (expand {}), retrying with expand {}", e, expand, next);
                expand = next;
            }

            Err(e) => return Err(e),
        }
    }
}

fn snap<S: SpatialStore + ?Sized>(
    store: &S,
    (lat, lon): (f64, f64),
    radius: f64,
) -> Result<Node, RouteError> {
    store
        .nearest_routing_nodes(lat, lon, radius)?
        .into_iter()
        .next()
        .ok_or(RouteError::NoNearbyNode { lat, lon })
}

fn search_neighborhood<S: SpatialStore + ?Sized>(
    store: &S,
    a: &Node,
    b: &Node,
    expand: f64,
    options: &RouteOptions,
) -> Result<Path, RouteError> {
    let waypoints = store.relevant_waypoints(a, b, expand)?;
    let g = RouteGraph::from_waypoints(&waypoints, options.alpha);
    log::debug!(
        "route {} -> {}: {} waypoints, {} nodes, {} edges",
        a.id,
        b.id,
        waypoints.len(),
        g.len(),
        g.edge_count()
    );

    Ok(find_path(&g, a.id, b.id, options.step_limit)?)
}

/// Expands every edge of the path into the nodes of its way, from `idx1` to `idx2`
/// (or backwards, for reversed edges).
fn resolve_route<S: SpatialStore + ?Sized>(store: &S, path: Path) -> Result<Route, RouteError> {
    let mut points: Vec<RoutePoint> = Vec::new();

    if path.edges.is_empty() {
        if let Some(&id) = path.nodes.first() {
            let node = store.get_node(id)?.ok_or(StoreError::UnknownNode(id))?;
            points.push(RoutePoint::from(&node));
        }
    }

    for edge in &path.edges {
        let mut segment = store.way_waypoints(edge.way_id, edge.idx1..=edge.idx2)?;
        if edge.reversed {
            segment.reverse();
        }

        // The first point is the last point of the previous segment
        let skip = if points.is_empty() { 0 } else { 1 };
        points.extend(segment.iter().skip(skip).map(|(_, n)| RoutePoint::from(n)));
    }

    Ok(Route {
        points,
        total_distance: path.total_distance,
        total_score: path.total_score,
        path,
    })
}
