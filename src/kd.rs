// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::earth_distance;

/// Position of an indexed [Node](crate::Node).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

impl From<&crate::Node> for Position {
    fn from(n: &crate::Node) -> Self {
        Self {
            id: n.id,
            lat: n.lat,
            lon: n.lon,
        }
    }
}

/// KDTree implements the [k-d tree data structure](https://en.wikipedia.org/wiki/K-d_tree),
/// used by the [MemoryStore](crate::store::MemoryStore) to answer nearest-node and
/// neighborhood queries without scanning every node.
///
/// This implementation assumes euclidean geometry, even though the distance function
/// used is [earth_distance]. This results in undefined behavior when points
/// are close to the ante meridian (180°/-180° longitude) or poles (90°/-90° latitude),
/// or when the data spans multiple continents.
#[derive(Debug, Clone)]
pub struct KDTree {
    pivot: Position,
    left: Option<Box<KDTree>>,
    right: Option<Box<KDTree>>,
}

impl KDTree {
    /// Returns all positions within `radius` meters of the given point,
    /// together with their distance, ordered by ascending distance
    /// (ties broken by id).
    pub fn find_within(&self, lat: f64, lon: f64, radius: f64) -> Vec<(f64, Position)> {
        let mut found = Vec::default();
        self.find_within_impl(lat, lon, radius, false, &mut found);
        found.sort_by(|(a_dist, a), (b_dist, b)| a_dist.total_cmp(b_dist).then(a.id.cmp(&b.id)));
        found
    }

    fn find_within_impl(
        &self,
        lat: f64,
        lon: f64,
        radius: f64,
        lon_divides: bool,
        found: &mut Vec<(f64, Position)>,
    ) {
        let dist = earth_distance(lat, lon, self.pivot.lat, self.pivot.lon);
        if dist <= radius {
            found.push((dist, self.pivot));
        }

        let (first, second) = self.branches(lat, lon, lon_divides);

        if let Some(ref branch) = first {
            branch.find_within_impl(lat, lon, radius, !lon_divides, found);
        }

        if let Some(ref branch) = second {
            if self.distance_to_axis(lat, lon, lon_divides) <= radius {
                branch.find_within_impl(lat, lon, radius, !lon_divides, found);
            }
        }
    }

    /// Returns the branch on the query's side of the splitting axis first.
    fn branches(
        &self,
        lat: f64,
        lon: f64,
        lon_divides: bool,
    ) -> (&Option<Box<KDTree>>, &Option<Box<KDTree>>) {
        let first_left = if lon_divides {
            lon < self.pivot.lon
        } else {
            lat < self.pivot.lat
        };
        if first_left {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        }
    }

    fn distance_to_axis(&self, lat: f64, lon: f64, lon_divides: bool) -> f64 {
        let (axis_lat, axis_lon) = if lon_divides {
            (lat, self.pivot.lon)
        } else {
            (self.pivot.lat, lon)
        };
        earth_distance(lat, lon, axis_lat, axis_lon)
    }

    /// Builds a k-d tree from an iterable of [Positions](Position).
    pub fn from_iter<I: IntoIterator<Item = Position>>(positions: I) -> Option<Self> {
        let mut positions = positions.into_iter().collect::<Vec<_>>();
        Self::build(positions.as_mut_slice())
    }

    /// Builds a k-d tree from a mutable slice of [Positions](Position). Positions will be
    /// reordered in the slice to facilitate building the tree.
    pub fn build(positions: &mut [Position]) -> Option<Self> {
        Self::build_impl(positions, false)
    }

    fn build_impl(positions: &mut [Position], lon_divides: bool) -> Option<Self> {
        match positions.len() {
            0 => None,
            1 => Some(Self {
                pivot: positions[0],
                left: None,
                right: None,
            }),
            _ => {
                if lon_divides {
                    positions.sort_by(|a, b| a.lon.total_cmp(&b.lon));
                } else {
                    positions.sort_by(|a, b| a.lat.total_cmp(&b.lat));
                }
                let median = positions.len() / 2;
                let pivot = positions[median];
                let (left, right_and_pivot) = positions.split_at_mut(median);
                let right = &mut right_and_pivot[1..];
                Some(Self {
                    pivot,
                    left: Self::build_impl(left, !lon_divides).map(Box::new),
                    right: Self::build_impl(right, !lon_divides).map(Box::new),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<Position> {
        [
            (1, 0.01, 0.01),
            (2, 0.01, 0.05),
            (3, 0.03, 0.09),
            (4, 0.04, 0.03),
            (5, 0.04, 0.07),
            (6, 0.07, 0.03),
            (7, 0.07, 0.01),
            (8, 0.08, 0.05),
            (9, 0.08, 0.09),
        ]
        .into_iter()
        .map(|(id, lat, lon)| Position { id, lat, lon })
        .collect()
    }

    #[test]
    fn kd_tree_closest_first() {
        let tree = KDTree::build(&mut grid()).expect("k-d tree from non-empty slice must not be empty");
        let closest = |lat, lon| tree.find_within(lat, lon, f64::INFINITY)[0].1.id;

        assert_eq!(closest(0.02, 0.02), 1);
        assert_eq!(closest(0.05, 0.03), 4);
        assert_eq!(closest(0.05, 0.08), 5);
        assert_eq!(closest(0.09, 0.06), 8);
        assert_eq!(tree.find_within(0.05, 0.05, f64::INFINITY).len(), 9);
    }

    #[test]
    fn kd_tree_within_matches_brute_force() {
        let positions = grid();
        let tree = KDTree::from_iter(positions.iter().cloned()).unwrap();

        for &(lat, lon, radius) in &[
            (0.04, 0.05, 3000.0),
            (0.0, 0.0, 1600.0),
            (0.05, 0.05, 10_000.0),
            (0.02, 0.08, 500.0),
        ] {
            let found: Vec<i64> = tree
                .find_within(lat, lon, radius)
                .into_iter()
                .map(|(_, p)| p.id)
                .collect();

            let mut expected: Vec<(f64, i64)> = positions
                .iter()
                .map(|p| (earth_distance(lat, lon, p.lat, p.lon), p.id))
                .filter(|&(d, _)| d <= radius)
                .collect();
            expected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let expected: Vec<i64> = expected.into_iter().map(|(_, id)| id).collect();

            assert_eq!(found, expected, "query ({lat}, {lon}) r={radius}");
        }
    }

    #[test]
    fn kd_tree_empty() {
        assert!(KDTree::build(&mut []).is_none());
    }
}
