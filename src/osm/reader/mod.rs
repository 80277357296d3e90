// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use importer::Importer;

use crate::osm::Error;
use crate::store::SpatialStore;

mod importer;
mod model;
mod xml;

pub use importer::ImportReport;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Unknown format - guess the format based on the content
    #[default]
    Unknown,

    /// Force uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// Force [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format from the first bytes of a file.
    fn detect(head: &[u8]) -> Self {
        if head.starts_with(&[0x1f, 0x8b]) {
            Self::XmlGz
        } else if head.starts_with(b"BZh") {
            Self::XmlBz2
        } else {
            Self::Xml
        }
    }
}

/// Additional controls for importing OSM data into a [SpatialStore].
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Format of the input data.
    pub file_format: FileFormat,

    /// Filter nodes by a specific bounding box. In order: left (min lon), bottom (min lat),
    /// right (max lon), top (max lat). Ignored if all values are set to zero, or at least one
    /// of them is not finite.
    pub bbox: [f64; 4],

    /// Number of elements (nodes and ways) written between commits.
    pub batch_size: usize,

    /// Delete nodes not referenced by any way after the import.
    pub prune: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            file_format: FileFormat::Unknown,
            bbox: [0.0; 4],
            batch_size: 10_000,
            prune: false,
        }
    }
}

/// Import walkable ways from a reader into a [SpatialStore] as per the provided [Options].
///
/// The provided stream will be automatically wrapped in a buffered reader.
pub fn import_from_io<S, R>(
    store: &mut S,
    options: &Options,
    reader: R,
) -> Result<ImportReport, Error>
where
    S: SpatialStore + ?Sized,
    R: io::Read,
{
    let mut b = io::BufReader::new(reader);
    let format = match options.file_format {
        FileFormat::Unknown => FileFormat::detect(b.fill_buf()?),
        format => format,
    };

    match format {
        FileFormat::Unknown | FileFormat::Xml => {
            let r = xml::Reader::from_io(b);
            Importer::new(store, options).add_features(r)
        }

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(b);
            let r = xml::Reader::from_io(io::BufReader::new(d));
            Importer::new(store, options).add_features(r)
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(b);
            let r = xml::Reader::from_io(io::BufReader::new(d));
            Importer::new(store, options).add_features(r)
        }
    }
}

/// Import walkable ways from a file at the provided path into a [SpatialStore]
/// as per the provided [Options].
pub fn import_from_file<S, P>(
    store: &mut S,
    options: &Options,
    path: P,
) -> Result<ImportReport, Error>
where
    S: SpatialStore + ?Sized,
    P: AsRef<Path>,
{
    let f = File::open(path)?;
    import_from_io(store, options, f)
}

/// Import walkable ways from a static buffer into a [SpatialStore] as per the provided [Options].
pub fn import_from_buffer<S: SpatialStore + ?Sized>(
    store: &mut S,
    options: &Options,
    data: &[u8],
) -> Result<ImportReport, Error> {
    let format = match options.file_format {
        FileFormat::Unknown => FileFormat::detect(data),
        format => format,
    };

    if format == FileFormat::Xml {
        // Fast path is available for in-memory XML data
        let r = xml::Reader::from_buffer(data);
        Importer::new(store, options).add_features(r)
    } else {
        // Wrap the buffer in a cursor and use the IO path
        let cursor = io::Cursor::new(data);
        import_from_io(store, options, cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_format() {
        assert_eq!(FileFormat::detect(b"<?xml version"), FileFormat::Xml);
        assert_eq!(FileFormat::detect(&[0x1f, 0x8b, 0x08]), FileFormat::XmlGz);
        assert_eq!(FileFormat::detect(b"BZh91AY"), FileFormat::XmlBz2);
        assert_eq!(FileFormat::detect(b""), FileFormat::Xml);
    }
}
