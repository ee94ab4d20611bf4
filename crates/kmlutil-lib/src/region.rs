//! Containment regions and their verdicts
//!
//! A [`Region`] is a polygon used as a boundary. [`classify`] scans a coordinate
//! list against one region; [`RegionMatcher`] ranks several regions to pick the
//! folder a feature belongs to.

use crate::geometry::{bounding_rect, is_point_inside, polygon_area};
use crate::{Coordinate, Feature, Geometry, KmlError, Result};
use geo::Rect;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A polygon boundary with its precomputed bounding box and planar area
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub ring: Vec<Coordinate>,
    pub bounds: Rect<f64>,
    /// Shoelace area in square degrees
    pub area: f64,
}

impl Region {
    /// Build a region from an outer ring
    ///
    /// Fails with [`KmlError::EmptyRegion`] when the ring has no coordinate.
    pub fn new(name: impl Into<String>, ring: Vec<Coordinate>) -> Result<Self> {
        let name = name.into();
        let Some(bounds) = bounding_rect(&ring) else {
            return Err(KmlError::EmptyRegion(name));
        };
        let area = polygon_area(&ring);
        Ok(Self {
            name,
            ring,
            bounds,
            area,
        })
    }

    /// Build a region from a Polygon feature's outer boundary
    pub fn from_feature(feature: &Feature) -> Result<Self> {
        let name = feature.name.clone().unwrap_or_default();
        match &feature.geometry {
            Some(Geometry::Polygon(ring)) => Self::new(name, ring.clone()),
            Some(other) => Err(KmlError::structural(
                name,
                format!("a region must be a Polygon, found {}", other.kind()),
            )),
            None => Err(KmlError::EmptyRegion(name)),
        }
    }

    /// Check whether a coordinate lies inside the region
    #[inline]
    pub fn contains(&self, c: &Coordinate) -> bool {
        let min = self.bounds.min();
        let max = self.bounds.max();
        if c.lon < min.x || c.lon > max.x || c.lat < min.y || c.lat > max.y {
            return false;
        }
        is_point_inside(&self.ring, c.lon, c.lat)
    }
}

/// Summary of how a coordinate list relates to a region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContainmentVerdict {
    /// The first point is inside
    pub begins_in: bool,
    /// The last point is inside
    pub ends_in: bool,
    /// At least one point is inside
    pub any_in: bool,
    /// Every point is inside
    pub all_in: bool,
    pub points_in: usize,
    pub total_points: usize,
    /// Number of outside-to-inside transitions, starting from "outside"
    pub entry_segments: usize,
}

impl ContainmentVerdict {
    /// A feature with any point inside is kept by a crop
    #[inline]
    pub fn qualifies(&self) -> bool {
        self.any_in
    }

    /// Share of points inside, in `[0, 1]`
    #[inline]
    pub fn ratio(&self) -> f64 {
        if self.total_points == 0 {
            0.0
        } else {
            self.points_in as f64 / self.total_points as f64
        }
    }
}

impl fmt::Display for ContainmentVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} points in, {} entries (begins in: {}, ends in: {})",
            self.points_in, self.total_points, self.entry_segments, self.begins_in, self.ends_in
        )
    }
}

/// Classify a coordinate list against a region
///
/// Returns `None` for an empty list. The full list is always scanned, even when
/// the outcome is already decided, so the counts are exact.
pub fn classify(coords: &[Coordinate], region: &Region) -> Option<ContainmentVerdict> {
    #[cfg(feature = "profiling")]
    profiling::scope!("region::classify");

    if coords.is_empty() {
        return None;
    }

    let mut verdict = ContainmentVerdict {
        total_points: coords.len(),
        ..Default::default()
    };
    let last = coords.len() - 1;
    let mut previous = false;

    for (i, c) in coords.iter().enumerate() {
        let inside = region.contains(c);
        if inside {
            verdict.points_in += 1;
            if !previous {
                verdict.entry_segments += 1;
            }
        }
        if i == 0 {
            verdict.begins_in = inside;
        }
        if i == last {
            verdict.ends_in = inside;
        }
        previous = inside;
    }

    verdict.any_in = verdict.points_in > 0;
    verdict.all_in = verdict.points_in == verdict.total_points;

    Some(verdict)
}

/// Picks the best region for a feature among several candidates
#[derive(Debug, Clone)]
pub struct RegionMatcher {
    pub regions: Vec<Region>,
    /// A region must hold strictly more than this share of the points
    pub threshold: f64,
}

impl RegionMatcher {
    pub fn new(regions: Vec<Region>, threshold: f64) -> Self {
        Self { regions, threshold }
    }

    /// Index of the best region and its verdict
    ///
    /// The highest ratio wins, then the smaller area, then the earlier region.
    /// Returns `None` when no region exceeds the threshold.
    pub fn best_match(&self, coords: &[Coordinate]) -> Option<(usize, ContainmentVerdict)> {
        let mut best: Option<(usize, ContainmentVerdict)> = None;

        for (i, region) in self.regions.iter().enumerate() {
            let Some(verdict) = classify(coords, region) else {
                continue;
            };
            let ratio = verdict.ratio();
            if ratio <= self.threshold {
                continue;
            }

            let better = match best {
                None => true,
                Some((j, current)) => {
                    let current_ratio = current.ratio();
                    ratio > current_ratio
                        || (ratio == current_ratio && region.area < self.regions[j].area)
                }
            };
            if better {
                best = Some((i, verdict));
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coords(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points.iter().map(|&p| Coordinate::from(p)).collect()
    }

    fn square(name: &str, x0: f64, y0: f64, size: f64) -> Region {
        Region::new(
            name,
            coords(&[(x0, y0), (x0 + size, y0), (x0 + size, y0 + size), (x0, y0 + size)]),
        )
        .unwrap()
    }

    #[test]
    fn test_region_new() {
        let region = square("Box", 0.0, 0.0, 10.0);
        assert_eq!(region.area, 100.0);
        assert_eq!(region.bounds.max(), geo::Coord { x: 10.0, y: 10.0 });

        assert!(matches!(
            Region::new("Empty", Vec::new()),
            Err(KmlError::EmptyRegion(name)) if name == "Empty"
        ));
    }

    #[test]
    fn test_classify_crossing_path() {
        let region = square("Box", 0.0, 0.0, 10.0);
        let verdict = classify(&coords(&[(5.0, 5.0), (15.0, 5.0)]), &region).unwrap();

        assert!(verdict.begins_in);
        assert!(!verdict.ends_in);
        assert!(verdict.any_in);
        assert!(!verdict.all_in);
        assert_eq!(verdict.points_in, 1);
        assert_eq!(verdict.total_points, 2);
        assert_eq!(verdict.entry_segments, 1);
        assert!(verdict.qualifies());
        assert_eq!(verdict.ratio(), 0.5);
    }

    #[test]
    fn test_classify_counts_every_entry() {
        let region = square("Box", 0.0, 0.0, 10.0);
        let path = coords(&[(-1.0, 5.0), (1.0, 5.0), (11.0, 5.0), (9.0, 5.0), (8.0, 5.0)]);
        let verdict = classify(&path, &region).unwrap();

        assert!(!verdict.begins_in);
        assert!(verdict.ends_in);
        assert_eq!(verdict.points_in, 3);
        assert_eq!(verdict.entry_segments, 2);
    }

    #[test]
    fn test_classify_outside_and_empty() {
        let region = square("Box", 0.0, 0.0, 10.0);
        let verdict = classify(&coords(&[(20.0, 20.0), (30.0, 30.0)]), &region).unwrap();
        assert!(!verdict.qualifies());
        assert_eq!(verdict.entry_segments, 0);

        assert!(classify(&[], &region).is_none());
    }

    #[test]
    fn test_matcher_prefers_highest_ratio() {
        let matcher = RegionMatcher::new(
            vec![square("West", 0.0, 0.0, 10.0), square("East", 10.0, 0.0, 10.0)],
            0.35,
        );
        let path = coords(&[(8.0, 5.0), (12.0, 5.0), (14.0, 5.0), (16.0, 5.0)]);
        let (index, verdict) = matcher.best_match(&path).unwrap();
        assert_eq!(index, 1);
        assert_eq!(verdict.points_in, 3);
    }

    #[test]
    fn test_matcher_threshold_is_strict() {
        let matcher = RegionMatcher::new(vec![square("Box", 0.0, 0.0, 10.0)], 0.5);
        let half = coords(&[(5.0, 5.0), (15.0, 5.0)]);
        assert!(matcher.best_match(&half).is_none());
    }

    #[test]
    fn test_matcher_tie_prefers_smaller_area() {
        let matcher = RegionMatcher::new(
            vec![square("Large", 0.0, 0.0, 100.0), square("Small", 0.0, 0.0, 10.0)],
            0.35,
        );
        let (index, _) = matcher.best_match(&coords(&[(5.0, 5.0)])).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_matcher_full_tie_prefers_first() {
        let matcher = RegionMatcher::new(
            vec![square("A", 0.0, 0.0, 10.0), square("B", 0.0, 0.0, 10.0)],
            0.35,
        );
        let (index, _) = matcher.best_match(&coords(&[(5.0, 5.0)])).unwrap();
        assert_eq!(index, 0);
    }

    proptest! {
        #[test]
        fn prop_verdict_counts_are_consistent(
            points in prop::collection::vec((-20.0f64..20.0, -20.0f64..20.0), 1..40),
        ) {
            let region = square("Box", 0.0, 0.0, 10.0);
            let verdict = classify(&coords(&points), &region).unwrap();
            prop_assert!(verdict.points_in <= verdict.total_points);
            prop_assert!(verdict.entry_segments <= verdict.points_in);
            prop_assert_eq!(verdict.any_in, verdict.points_in > 0);
            prop_assert_eq!(verdict.all_in, verdict.points_in == verdict.total_points);
        }

        #[test]
        fn prop_larger_region_contains_more(
            points in prop::collection::vec((-20.0f64..20.0, -20.0f64..20.0), 1..40),
            grow in 0.0f64..10.0,
        ) {
            // Nested squares sharing the lower-left corner
            let inner = square("Inner", 0.0, 0.0, 10.0);
            let outer = square("Outer", 0.0, 0.0, 10.0 + grow);
            let path = coords(&points);
            let a = classify(&path, &inner).unwrap();
            let b = classify(&path, &outer).unwrap();
            prop_assert!(b.points_in >= a.points_in);
        }
    }
}
