// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::osm::{Error, WayType};
use crate::store::SpatialStore;
use crate::{Node, Way, Waypoint};

use super::{model, Options};

/// Summary of an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Nodes written to the store.
    pub nodes: usize,

    /// Nodes discarded by the bounding box filter.
    pub dropped_nodes: usize,

    /// Walkable ways written to the store.
    pub ways: usize,

    /// Ways without a walkable `highway` tag.
    pub skipped_ways: usize,

    pub waypoints: usize,

    /// Way members referencing nodes which are absent or were dropped by the bounding box.
    pub skipped_waypoints: usize,

    /// Nodes deleted by the prune pass.
    pub pruned_nodes: usize,
}

/// Helper object used for storing state related to writing [OSM features](model::Feature)
/// into a [SpatialStore].
pub(super) struct Importer<'a, S: SpatialStore + ?Sized> {
    store: &'a mut S,
    options: &'a Options,
    report: ImportReport,
    elements: usize,
    ignore_bbox: bool,
}

impl<'a, S: SpatialStore + ?Sized> Importer<'a, S> {
    pub(super) fn new(store: &'a mut S, options: &'a Options) -> Self {
        let ignore_bbox =
            options.bbox.iter().all(|&x| x == 0.0) || options.bbox.iter().any(|x| !x.is_finite());

        Self {
            store,
            options,
            report: ImportReport::default(),
            elements: 0,
            ignore_bbox,
        }
    }

    /// Writes all features into the store. On failure, staged writes are rolled back,
    /// but already committed batches are kept.
    pub(super) fn add_features<I>(mut self, features: I) -> Result<ImportReport, Error>
    where
        I: IntoIterator<Item = Result<model::Feature, Error>>,
    {
        match self.add_features_impl(features) {
            Ok(()) => Ok(self.report),
            Err(e) => {
                self.store.rollback();
                Err(e)
            }
        }
    }

    fn add_features_impl<I>(&mut self, features: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Result<model::Feature, Error>>,
    {
        let batch_size = self.options.batch_size.max(1);

        for f in features {
            match f? {
                model::Feature::Node(n) => self.add_node(n)?,
                model::Feature::Way(w) => self.add_way(w)?,
            }

            self.elements += 1;
            if self.elements % batch_size == 0 {
                self.store.commit()?;
                log::info!("{} nodes, {} ways", self.report.nodes, self.report.ways);
            }
        }

        self.store.commit()?;
        log::info!(
            "imported {} nodes ({} outside of bbox), {} ways ({} not walkable), {} waypoints ({} skipped)",
            self.report.nodes,
            self.report.dropped_nodes,
            self.report.ways,
            self.report.skipped_ways,
            self.report.waypoints,
            self.report.skipped_waypoints,
        );

        if self.options.prune {
            self.report.pruned_nodes = self.store.prune_unused_nodes()?;
            log::info!("pruned {} unused nodes", self.report.pruned_nodes);
        }

        Ok(())
    }

    fn add_node(&mut self, n: Node) -> Result<(), Error> {
        if self.is_in_bbox(n.lat, n.lon) {
            self.store.insert_node(n)?;
            self.report.nodes += 1;
        } else {
            self.report.dropped_nodes += 1;
        }
        Ok(())
    }

    fn is_in_bbox(&self, lat: f64, lon: f64) -> bool {
        if self.ignore_bbox {
            return true;
        }
        let [min_lon, min_lat, max_lon, max_lat] = self.options.bbox;
        lat >= min_lat && lat <= max_lat && lon >= min_lon && lon <= max_lon
    }

    fn add_way(&mut self, w: model::Way) -> Result<(), Error> {
        let way_type = match WayType::from_tags(&w.tags) {
            Some(t) => t,
            None => {
                log::debug!("way {} is not walkable", w.id);
                self.report.skipped_ways += 1;
                return Ok(());
            }
        };

        self.store.insert_way(Way {
            id: w.id,
            name: w.tags.get("name").cloned(),
            way_type,
        })?;
        self.report.ways += 1;

        for (idx, &node_id) in w.nodes.iter().enumerate() {
            let idx = u32::try_from(idx).map_err(|_| Error::malformed("way", "too many nodes"))?;

            if self.store.contains_node(node_id) {
                self.store
                    .insert_waypoint(Waypoint::new(w.id, idx, node_id))?;
                self.report.waypoints += 1;
            } else {
                self.report.skipped_waypoints += 1;
            }
        }

        Ok(())
    }
}
