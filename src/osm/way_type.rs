// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

/// Walkable classification of a [Way](crate::Way), taken from the
/// [highway](https://wiki.openstreetmap.org/wiki/Key:highway) tag.
///
/// Ways with any other `highway` value (e.g. `motorway` or `cycleway`) are not walkable
/// and are not imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WayType {
    Primary,
    Secondary,
    Tertiary,
    Residential,
    LivingStreet,
    Pedestrian,
    Track,
    Steps,
    Path,
    Footway,
}

impl WayType {
    /// All walkable classifications.
    pub const ALL: [WayType; 10] = [
        Self::Primary,
        Self::Secondary,
        Self::Tertiary,
        Self::Residential,
        Self::LivingStreet,
        Self::Pedestrian,
        Self::Track,
        Self::Steps,
        Self::Path,
        Self::Footway,
    ];

    /// Maps a `highway` tag value onto a walkable classification.
    pub fn from_highway(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    /// Returns the classification of a way with the given tags, or [None] if the
    /// way has no `highway` tag, or its value is not walkable.
    pub fn from_tags(tags: &HashMap<String, String>) -> Option<Self> {
        tags.get("highway").and_then(|v| Self::from_highway(v))
    }

    /// Returns the `highway` tag value corresponding to this classification.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
            Self::Residential => "residential",
            Self::LivingStreet => "living_street",
            Self::Pedestrian => "pedestrian",
            Self::Track => "track",
            Self::Steps => "steps",
            Self::Path => "path",
            Self::Footway => "footway",
        }
    }
}

impl std::fmt::Display for WayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
