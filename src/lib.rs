// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Scenic pedestrian routing over [OpenStreetMap](https://www.openstreetmap.org/) data.
//!
//! Walkable ways from an OSM extract are [imported](crate::osm::import) into a
//! [SpatialStore], every intersection gets a scenic score from a
//! [density model](crate::score::DensityModel) fitted over geotagged photos, and route
//! requests build a small [RouteGraph] around the two endpoints, which is then searched
//! for the path minimizing `distance × (1 + alpha × score)`.
//!
//! # Example
//!
//! ```no_run
//! let mut store = scenicroute::store::MemoryStore::default();
//! let osm_options = scenicroute::osm::Options::default();
//! scenicroute::osm::import_from_file(&mut store, &osm_options, "path/to/city.osm.bz2")
//!     .expect("failed to load city.osm.bz2");
//!
//! let photos = scenicroute::score::read_photo_locations_from_file("path/to/photos.csv")
//!     .expect("failed to load photos.csv");
//! let model = scenicroute::score::GaussianKde::fit(photos.iter().map(|p| p.xy()))
//!     .expect("failed to fit the density model");
//!
//! use scenicroute::store::SpatialStore;
//! store
//!     .update_scores(&model, &scenicroute::score::ScoreOptions::default())
//!     .expect("failed to score nodes");
//!
//! let options = scenicroute::route::RouteOptions { alpha: -0.2, ..Default::default() };
//! let route = scenicroute::route::plan_route(&store, (37.8087, -122.4098), (37.7989, -122.4662), &options)
//!     .expect("failed to find route");
//!
//! println!("Route: {:?}", route.points);
//! ```

mod distance;
mod graph;
mod kd;
pub mod osm;
pub mod route;
pub mod score;
mod search;
pub mod store;

pub use distance::earth_distance;
pub use graph::{edge_weight, RouteEdge, RouteGraph};
pub use kd::{KDTree, Position};
pub use osm::WayType;
pub use search::{find_path, Path, PathEdge, SearchError, DEFAULT_STEP_LIMIT};

/// Represents an [OSM node](https://wiki.openstreetmap.org/wiki/Node) kept in the
/// [SpatialStore](store::SpatialStore).
///
/// `degree` is the number of distinct ways touching the node and is maintained by the store.
/// `scenic_score` stays [None] until the node is scored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub degree: u32,
    pub scenic_score: Option<f64>,
}

impl Node {
    /// Creates a fresh, unscored node not touched by any way.
    pub fn new(id: i64, lat: f64, lon: f64) -> Self {
        Self {
            id,
            lat,
            lon,
            degree: 0,
            scenic_score: None,
        }
    }

    /// Nodes shared by more than one way are eligible as route graph vertices.
    pub fn is_routing_node(&self) -> bool {
        self.degree > 1
    }
}

/// Represents a walkable [OSM way](https://wiki.openstreetmap.org/wiki/Way).
/// Its member nodes are stored separately, as [Waypoints](Waypoint).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    pub id: i64,
    pub name: Option<String>,
    pub way_type: WayType,
}

/// Binds a [Node] into the member sequence of a [Way].
///
/// `idx` is the zero-based position of the node reference in the original way.
/// Both cumulative values are running sums from the first waypoint of the way,
/// and stay [None] until [recomputed](store::SpatialStore::recompute_cumulative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub way_id: i64,
    pub idx: u32,
    pub node_id: i64,
    pub cumulative_distance: Option<f64>,
    pub cumulative_score: Option<f64>,
}

impl Waypoint {
    pub fn new(way_id: i64, idx: u32, node_id: i64) -> Self {
        Self {
            way_id,
            idx,
            node_id,
            cumulative_distance: None,
            cumulative_score: None,
        }
    }

    /// Returns the (way_id, idx) key identifying this waypoint.
    pub fn key(&self) -> (i64, u32) {
        (self.way_id, self.idx)
    }
}
