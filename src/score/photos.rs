// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;
use std::path::Path;

use serde::Deserialize;

/// Location of a single geotagged photo.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PhotoLocation {
    pub lat: f64,
    pub lon: f64,
}

impl PhotoLocation {
    /// Returns the `(x, y)` coordinates used by [DensityModels](super::DensityModel).
    pub fn xy(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }
}

/// Reads photo locations from CSV data with (at least) `lat` and `lon` columns.
pub fn read_photo_locations<R: io::Read>(reader: R) -> Result<Vec<PhotoLocation>, csv::Error> {
    csv::Reader::from_reader(reader).deserialize().collect()
}

/// Reads photo locations from a CSV file with (at least) `lat` and `lon` columns.
pub fn read_photo_locations_from_file<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<PhotoLocation>, csv::Error> {
    csv::Reader::from_path(path)?.deserialize().collect()
}
