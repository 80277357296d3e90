// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Import of walkable ways from [OpenStreetMap](https://www.openstreetmap.org/) extracts.

mod error;
mod reader;
mod way_type;

pub use error::Error;
pub use reader::{
    import_from_buffer, import_from_file, import_from_io, FileFormat, ImportReport, Options,
};
pub use way_type::WayType;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EntityKind, MemoryStore, SpatialStore, StoreError};

    const XML: &[u8] = include_bytes!("reader/test_fixtures/grid.osm");
    const XML_GZ: &[u8] = include_bytes!("reader/test_fixtures/grid.osm.gz");
    const XML_BZ2: &[u8] = include_bytes!("reader/test_fixtures/grid.osm.bz2");

    fn import(data: &[u8], options: &Options) -> (MemoryStore, ImportReport) {
        let mut store = MemoryStore::default();
        let report = import_from_buffer(&mut store, options, data).unwrap();
        (store, report)
    }

    fn check_grid_store(store: &MemoryStore, report: &ImportReport) {
        //  4────5────6
        //  │    │   /
        //  │    │  7         99
        //  │    │ /
        //  1────2────3

        assert_eq!(
            *report,
            ImportReport {
                nodes: 8,
                dropped_nodes: 0,
                ways: 5,
                skipped_ways: 2,
                waypoints: 13,
                skipped_waypoints: 0,
                pruned_nodes: 0,
            }
        );
        assert!(!store.has_staged_writes());
        assert_eq!(store.node_count(), 8);
        assert_eq!(store.way_count(), 5);
        assert_eq!(store.waypoint_count(), 13);

        // Way attributes
        let way = store.get_way(101).unwrap();
        assert_eq!(way.name.as_deref(), Some("North & Co Street"));
        assert_eq!(way.way_type, WayType::Residential);
        assert_eq!(store.get_way(103).unwrap().way_type, WayType::Steps);
        assert_eq!(store.get_way(102).unwrap().name, None);

        // Non-walkable ways
        assert!(store.get_way(105).is_none());
        assert!(store.get_way(106).is_none());

        // Member order
        let members = |way_id| -> Vec<(u32, i64)> {
            store
                .way_waypoints(way_id, 0..=u32::MAX)
                .unwrap()
                .into_iter()
                .map(|(w, n)| (w.idx, n.id))
                .collect()
        };
        assert_eq!(members(100), vec![(0, 1), (1, 2), (2, 3)]);
        assert_eq!(members(104), vec![(0, 3), (1, 7), (2, 6)]);

        // Degrees
        for id in 1..=6 {
            assert_eq!(store.get_node(id).unwrap().unwrap().degree, 2, "node {id}");
        }
        assert_eq!(store.get_node(7).unwrap().unwrap().degree, 1);
        assert_eq!(store.get_node(99).unwrap().unwrap().degree, 0);
    }

    #[test]
    fn import_xml() {
        let options = Options {
            file_format: FileFormat::Xml,
            ..Default::default()
        };
        let (store, report) = import(XML, &options);
        check_grid_store(&store, &report);
    }

    #[test]
    fn import_xml_gz() {
        let options = Options {
            file_format: FileFormat::XmlGz,
            ..Default::default()
        };
        let (store, report) = import(XML_GZ, &options);
        check_grid_store(&store, &report);
    }

    #[test]
    fn import_xml_bz2() {
        let options = Options {
            file_format: FileFormat::XmlBz2,
            ..Default::default()
        };
        let (store, report) = import(XML_BZ2, &options);
        check_grid_store(&store, &report);
    }

    #[test]
    fn import_detects_format() {
        for data in [XML, XML_GZ, XML_BZ2] {
            let (store, report) = import(data, &Options::default());
            check_grid_store(&store, &report);
        }
    }

    #[test]
    fn import_from_reader() {
        let mut store = MemoryStore::default();
        let report = import_from_io(&mut store, &Options::default(), XML_GZ).unwrap();
        check_grid_store(&store, &report);
    }

    #[test]
    fn import_in_small_batches() {
        let options = Options {
            batch_size: 3,
            ..Default::default()
        };
        let (store, report) = import(XML, &options);
        check_grid_store(&store, &report);
    }

    #[test]
    fn import_with_prune() {
        let options = Options {
            prune: true,
            ..Default::default()
        };
        let (store, report) = import(XML, &options);
        assert_eq!(report.pruned_nodes, 1);
        assert_eq!(store.node_count(), 7);
        assert!(store.get_node(99).unwrap().is_none());
    }

    #[test]
    fn import_with_bbox() {
        let options = Options {
            bbox: [-0.0005, -0.0005, 0.0025, 0.0008],
            ..Default::default()
        };
        let (store, report) = import(XML, &options);

        assert_eq!(report.nodes, 4);
        assert_eq!(report.dropped_nodes, 4);
        assert_eq!(report.ways, 5);
        assert_eq!(report.waypoints, 7);
        assert_eq!(report.skipped_waypoints, 6);

        let ids: Vec<i64> = store.iter_nodes().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 7]);

        // idx keeps the position in the original way
        let members: Vec<(u32, i64)> = store
            .way_waypoints(104, 0..=u32::MAX)
            .unwrap()
            .into_iter()
            .map(|(w, n)| (w.idx, n.id))
            .collect();
        assert_eq!(members, vec![(0, 3), (1, 7)]);
    }

    #[test]
    fn import_ignores_invalid_bbox() {
        let options = Options {
            bbox: [0.0, 0.0, f64::NAN, 1.0],
            ..Default::default()
        };
        let (_, report) = import(XML, &options);
        assert_eq!(report.nodes, 8);
        assert_eq!(report.dropped_nodes, 0);
    }

    #[test]
    fn import_duplicate_node_is_fatal() {
        const DATA: &[u8] = br#"<osm>
            <node id="1" lat="0.0" lon="0.0"/>
            <node id="1" lat="1.0" lon="1.0"/>
        </osm>"#;

        let mut store = MemoryStore::default();
        let err = import_from_buffer(&mut store, &Options::default(), DATA).unwrap_err();
        assert!(matches!(
            err,
            Error::Store(StoreError::DuplicateIdentifier {
                kind: EntityKind::Node,
                ..
            })
        ));
        assert!(!store.has_staged_writes());
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn import_keeps_committed_batches_on_failure() {
        const DATA: &[u8] = br#"<osm>
            <node id="1" lat="0.0" lon="0.0"/>
            <node id="2" lat="0.0" lon="0.001"/>
            <node id="3" lat="north" lon="0.002"/>
        </osm>"#;

        let options = Options {
            batch_size: 1,
            ..Default::default()
        };
        let mut store = MemoryStore::default();
        let err = import_from_buffer(&mut store, &options, DATA).unwrap_err();
        assert!(matches!(err, Error::Malformed { element: "node", .. }));
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn import_truncated_document() {
        let truncated = &XML[..XML.len() / 2];
        let mut store = MemoryStore::default();
        assert!(import_from_buffer(&mut store, &Options::default(), truncated).is_err());
        assert!(!store.has_staged_writes());
    }

    #[test]
    fn import_document_without_root_end() {
        let last_way_end = XML
            .windows(b"</way>".len())
            .rposition(|w| w == b"</way>")
            .unwrap();
        let truncated = &XML[..last_way_end + b"</way>".len()];

        let mut store = MemoryStore::default();
        let err = import_from_buffer(&mut store, &Options::default(), truncated).unwrap_err();
        assert!(matches!(err, Error::Malformed { element: "osm", .. }), "got {err:?}");
        assert!(!store.has_staged_writes());
    }
}
