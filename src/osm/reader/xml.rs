// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io;
use std::str::{from_utf8, FromStr};

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};

use super::model;
use crate::osm::Error;
use crate::Node;

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(super) trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(super) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> IoParser<R> {
    #[inline]
    fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(super) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<Event<'b>> {
        self.0.read_event()
    }
}

/// Reader streams `node` and `way` [Features](model::Feature) from an
/// [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML) document, one element at a time.
/// All other elements (relations, bounds, changesets...) are skipped.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
    in_root: bool,
}

impl<P: Parser> Reader<P> {
    #[inline]
    fn new(parser: P) -> Self {
        Self {
            parser,
            eof: false,
            in_root: false,
        }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<model::Feature, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut f: Option<model::Feature> = None;
        let mut in_other_element = false;

        while !self.eof {
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => {
                    self.eof = true;
                    return Some(Err(e.into()));
                }
            };

            let result = match event {
                Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" => match parse_node(&start) {
                        Ok(n) => return Some(Ok(model::Feature::Node(n))),
                        Err(e) => Err(e),
                    },
                    // "way" can't be self-closing
                    b"tag" => match way_of(&mut f) {
                        Some(w) => parse_tag(&start).map(|(k, v)| {
                            w.tags.insert(k, v);
                        }),
                        None => Ok(()),
                    },
                    b"nd" => match way_of(&mut f) {
                        Some(w) => parse_nd(&start).map(|r| w.nodes.push(r)),
                        None => Ok(()),
                    },
                    _ => Ok(()),
                },

                Event::Start(start) => match start.local_name().as_ref() {
                    b"osm" => {
                        self.in_root = true;
                        Ok(())
                    }
                    b"node" => parse_node(&start).map(|n| f = Some(model::Feature::Node(n))),
                    b"way" => parse_way(&start).map(|w| f = Some(model::Feature::Way(w))),
                    b"relation" => {
                        in_other_element = true;
                        Ok(())
                    }
                    // "tag" and "nd" must be self-closing
                    _ => Ok(()),
                },

                Event::End(end) => match end.local_name().as_ref() {
                    b"osm" => {
                        self.in_root = false;
                        Ok(())
                    }
                    b"node" | b"way" => {
                        if let Some(f) = f.take() {
                            return Some(Ok(f));
                        }
                        Ok(())
                    }
                    b"relation" => {
                        in_other_element = false;
                        Ok(())
                    }
                    _ => Ok(()),
                },

                Event::Eof => {
                    self.eof = true;
                    match (&f, in_other_element) {
                        (Some(model::Feature::Node(_)), _) => {
                            Err(Error::malformed("node", "unexpected end of document"))
                        }
                        (Some(model::Feature::Way(_)), _) => {
                            Err(Error::malformed("way", "unexpected end of document"))
                        }
                        (None, true) => {
                            Err(Error::malformed("relation", "unexpected end of document"))
                        }
                        (None, false) if self.in_root => {
                            Err(Error::malformed("osm", "unexpected end of document"))
                        }
                        (None, false) => Ok(()),
                    }
                }

                _ => Ok(()),
            };

            if let Err(e) = result {
                self.eof = true;
                return Some(Err(e));
            }
        }

        None
    }
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    pub(super) fn from_buffer(data: &'a [u8]) -> Self {
        Self::new(BufParser::new(data))
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    pub(super) fn from_io(reader: R) -> Self {
        Self::new(IoParser::new(reader))
    }
}

fn attr_str<'a>(element: &'static str, attr: &'a Attribute<'_>) -> Result<&'a str, Error> {
    from_utf8(&attr.value).map_err(|e| Error::malformed(element, e))
}

fn parse_attr<T>(element: &'static str, attr: &Attribute<'_>) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = attr_str(element, attr)?;
    value.parse().map_err(|e| {
        Error::malformed(
            element,
            format!(
                "invalid {} {:?}: {}",
                String::from_utf8_lossy(attr.key.as_ref()),
                value,
                e
            ),
        )
    })
}

fn parse_node(start: &BytesStart<'_>) -> Result<Node, Error> {
    let mut id: Option<i64> = None;
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        match attr.key.as_ref() {
            b"id" => id = Some(parse_attr("node", &attr)?),
            b"lat" => lat = Some(parse_attr("node", &attr)?),
            b"lon" => lon = Some(parse_attr("node", &attr)?),
            _ => {}
        }
    }

    let id = id.ok_or_else(|| Error::malformed("node", "missing id"))?;
    let lat = lat.ok_or_else(|| Error::malformed("node", format!("{id}: missing lat")))?;
    let lon = lon.ok_or_else(|| Error::malformed("node", format!("{id}: missing lon")))?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::malformed(
            "node",
            format!("{id}: position ({lat}, {lon}) out of range"),
        ));
    }

    Ok(Node::new(id, lat, lon))
}

fn parse_way(start: &BytesStart<'_>) -> Result<model::Way, Error> {
    let mut id: Option<i64> = None;

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"id" {
            id = Some(parse_attr("way", &attr)?);
        }
    }

    Ok(model::Way {
        id: id.ok_or_else(|| Error::malformed("way", "missing id"))?,
        nodes: Vec::default(),
        tags: HashMap::default(),
    })
}

fn parse_tag(start: &BytesStart<'_>) -> Result<(String, String), Error> {
    let mut k = None;
    let mut v = None;

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        match attr.key.as_ref() {
            b"k" => k = Some(attr.unescape_value()?.into_owned()),
            b"v" => v = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }

    match k {
        Some(k) => Ok((k, v.unwrap_or_default())),
        None => Err(Error::malformed("tag", "missing k")),
    }
}

fn parse_nd(start: &BytesStart<'_>) -> Result<i64, Error> {
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"ref" {
            return parse_attr("nd", &attr);
        }
    }
    Err(Error::malformed("nd", "missing ref"))
}

fn way_of(f: &mut Option<model::Feature>) -> Option<&mut model::Way> {
    match f {
        Some(model::Feature::Way(ref mut w)) => Some(w),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::model::{Feature, Way};
    use super::*;

    macro_rules! tags {
        {} => { HashMap::default() };
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    const GRID_XML: &[u8] = include_bytes!("test_fixtures/grid.osm");

    fn get_expected_nodes() -> Vec<Node> {
        vec![
            Node::new(1, 0.0, 0.0),
            Node::new(2, 0.0, 0.001),
            Node::new(3, 0.0, 0.002),
            Node::new(4, 0.001, 0.0),
            Node::new(5, 0.001, 0.001),
            Node::new(6, 0.001, 0.002),
            Node::new(7, 0.0005, 0.0015),
            Node::new(99, 0.01, 0.01),
        ]
    }

    fn get_expected_ways() -> Vec<Way> {
        vec![
            Way {
                id: 100,
                nodes: vec![1, 2, 3],
                tags: tags! {"highway": "footway", "name": "South Walk"},
            },
            Way {
                id: 101,
                nodes: vec![4, 5, 6],
                tags: tags! {"highway": "residential", "name": "North & Co Street"},
            },
            Way {
                id: 102,
                nodes: vec![1, 4],
                tags: tags! {"highway": "path"},
            },
            Way {
                id: 103,
                nodes: vec![2, 5],
                tags: tags! {"highway": "steps"},
            },
            Way {
                id: 104,
                nodes: vec![3, 7, 6],
                tags: tags! {"highway": "footway"},
            },
            Way {
                id: 105,
                nodes: vec![1, 6],
                tags: tags! {"highway": "motorway", "ref": "A1"},
            },
            Way {
                id: 106,
                nodes: vec![4, 5],
                tags: tags! {"building": "yes"},
            },
        ]
    }

    fn collect_all<I: Iterator<Item = Result<Feature, Error>>>(
        features: I,
    ) -> Result<(Vec<Node>, Vec<Way>), Error> {
        let mut nodes = Vec::default();
        let mut ways = Vec::default();

        for f in features {
            match f? {
                Feature::Node(n) => nodes.push(n),
                Feature::Way(w) => ways.push(w),
            }
        }

        Ok((nodes, ways))
    }

    fn check_against_expected<I: Iterator<Item = Result<Feature, Error>>>(
        features: I,
    ) -> Result<(), Error> {
        let (nodes, ways) = collect_all(features)?;
        assert_eq!(nodes, get_expected_nodes());
        assert_eq!(ways, get_expected_ways());
        Ok(())
    }

    #[test]
    fn parse_from_buf() -> Result<(), Error> {
        check_against_expected(Reader::from_buffer(GRID_XML))
    }

    #[test]
    fn parse_from_io() -> Result<(), Error> {
        check_against_expected(Reader::from_io(io::Cursor::new(GRID_XML)))
    }

    #[test]
    fn node_with_invalid_coordinates() {
        let data = br#"<osm><node id="1" lat="north" lon="0.1"/></osm>"#;
        let err = collect_all(Reader::from_buffer(data)).unwrap_err();
        assert!(
            matches!(err, Error::Malformed { element: "node", .. }),
            "got {err:?}"
        );

        let data = br#"<osm><node id="1" lat="91.0" lon="0.1"/></osm>"#;
        let err = collect_all(Reader::from_buffer(data)).unwrap_err();
        assert!(matches!(err, Error::Malformed { element: "node", .. }));
    }

    #[test]
    fn node_without_id() {
        let data = br#"<osm><node lat="0.0" lon="0.1"/></osm>"#;
        let err = collect_all(Reader::from_buffer(data)).unwrap_err();
        assert!(matches!(err, Error::Malformed { element: "node", .. }));
    }

    #[test]
    fn nd_without_ref() {
        let data = br#"<osm><way id="5"><nd/></way></osm>"#;
        let err = collect_all(Reader::from_buffer(data)).unwrap_err();
        assert!(matches!(err, Error::Malformed { element: "nd", .. }));
    }

    #[test]
    fn truncated_document() {
        let data = br#"<osm><node id="1" lat="0" lon="0"/><way id="5"><nd ref="1"/>"#;
        let mut reader = Reader::from_buffer(data);
        assert!(matches!(reader.next(), Some(Ok(Feature::Node(_)))));
        assert!(matches!(
            reader.next(),
            Some(Err(Error::Malformed { element: "way", .. }))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn document_cut_after_closed_way() {
        let data = br#"<osm><node id="1" lat="0" lon="0"/><way id="5"><nd ref="1"/><tag k="highway" v="footway"/></way>"#;
        let mut reader = Reader::from_buffer(data);
        assert!(matches!(reader.next(), Some(Ok(Feature::Node(_)))));
        assert!(matches!(reader.next(), Some(Ok(Feature::Way(_)))));
        assert!(matches!(
            reader.next(),
            Some(Err(Error::Malformed { element: "osm", .. }))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn mismatched_end_tag() {
        let data = br#"<osm><way id="5"><nd ref="1"/></node></osm>"#;
        let err = collect_all(Reader::from_buffer(data)).unwrap_err();
        assert!(matches!(err, Error::Xml(_)), "got {err:?}");
    }

    #[test]
    fn relations_are_skipped() -> Result<(), Error> {
        let data = br#"<osm>
            <node id="1" lat="0" lon="0"/>
            <relation id="9">
                <member type="node" ref="1" role="via"/>
                <tag k="highway" v="pedestrian"/>
            </relation>
        </osm>"#;
        let (nodes, ways) = collect_all(Reader::from_buffer(data))?;
        assert_eq!(nodes, vec![Node::new(1, 0.0, 0.0)]);
        assert!(ways.is_empty());
        Ok(())
    }
}
