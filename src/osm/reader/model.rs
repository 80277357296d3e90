// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Node;
use std::collections::HashMap;

/// Represents an [OSM way](https://wiki.openstreetmap.org/wiki/Way), as read from
/// the extract, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: HashMap<String, String>,
}

/// Union over the [OSM elements](https://wiki.openstreetmap.org/wiki/Elements)
/// relevant for walking routes. Relations are never emitted.
#[derive(Debug, Clone)]
pub enum Feature {
    Node(Node),
    Way(Way),
}
