//! Polyline simplification
//!
//! Douglas–Peucker reduction with an optional radial-distance pre-pass. Distances
//! are planar and squared throughout, so the tolerance is in coordinate units
//! (degrees) and is squared once up front.

use crate::Coordinate;

/// Simplify a polyline, returning the kept points in their original order
///
/// # Arguments
/// * `points` - Input polyline
/// * `tolerance` - Maximum allowed deviation in coordinate units
/// * `highest_quality` - When false, a cheap radial-distance pass runs first
///
/// The first and last points are always kept. Inputs with fewer than two points are
/// returned unchanged.
pub fn simplify(points: &[Coordinate], tolerance: f64, highest_quality: bool) -> Vec<Coordinate> {
    simplify_indices(points, tolerance, highest_quality)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Same as [`simplify`], but returns ascending indices into `points`
pub fn simplify_indices(points: &[Coordinate], tolerance: f64, highest_quality: bool) -> Vec<usize> {
    #[cfg(feature = "profiling")]
    profiling::scope!("simplify::simplify_indices");

    if points.len() < 2 {
        return (0..points.len()).collect();
    }

    let sq_tolerance = tolerance * tolerance;

    if highest_quality {
        return douglas_peucker(points, sq_tolerance);
    }

    let radial = radial_distance(points, sq_tolerance);
    let subset: Vec<Coordinate> = radial.iter().map(|&i| points[i]).collect();
    douglas_peucker(&subset, sq_tolerance)
        .into_iter()
        .map(|i| radial[i])
        .collect()
}

/// Keep points farther than the tolerance from the previously kept point
///
/// The true last point is always appended so the path keeps its end.
fn radial_distance(points: &[Coordinate], sq_tolerance: f64) -> Vec<usize> {
    let mut kept = vec![0];
    let mut prev = points[0];

    for (i, &point) in points.iter().enumerate().skip(1) {
        if square_distance(point, prev) > sq_tolerance {
            kept.push(i);
            prev = point;
        }
    }

    let last = points.len() - 1;
    if kept.last() != Some(&last) {
        kept.push(last);
    }

    kept
}

/// Douglas–Peucker with an explicit stack of spans instead of recursion
fn douglas_peucker(points: &[Coordinate], sq_tolerance: f64) -> Vec<usize> {
    let len = points.len();
    let mut markers = vec![false; len];
    markers[0] = true;
    markers[len - 1] = true;

    let mut stack = vec![(0usize, len - 1)];

    while let Some((first, last)) = stack.pop() {
        let mut max_sq_dist = 0.0;
        let mut index = first;

        for i in first + 1..last {
            let sq_dist = square_segment_distance(points[i], points[first], points[last]);
            if sq_dist > max_sq_dist {
                index = i;
                max_sq_dist = sq_dist;
            }
        }

        if max_sq_dist > sq_tolerance {
            markers[index] = true;
            stack.push((first, index));
            stack.push((index, last));
        }
    }

    markers
        .iter()
        .enumerate()
        .filter_map(|(i, &keep)| keep.then_some(i))
        .collect()
}

#[inline]
fn square_distance(p1: Coordinate, p2: Coordinate) -> f64 {
    let dx = p1.lon - p2.lon;
    let dy = p1.lat - p2.lat;
    dx * dx + dy * dy
}

/// Squared distance from `p` to the segment `a`-`b`
///
/// The projection parameter is clamped to the segment, and a zero-length segment
/// degenerates to the point distance.
#[inline]
fn square_segment_distance(p: Coordinate, a: Coordinate, b: Coordinate) -> f64 {
    let mut x = a.lon;
    let mut y = a.lat;
    let dx = b.lon - x;
    let dy = b.lat - y;

    if dx != 0.0 || dy != 0.0 {
        let t = ((p.lon - x) * dx + (p.lat - y) * dy) / (dx * dx + dy * dy);
        if t > 1.0 {
            x = b.lon;
            y = b.lat;
        } else if t > 0.0 {
            x += dx * t;
            y += dy * t;
        }
    }

    let dx = p.lon - x;
    let dy = p.lat - y;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn path(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points.iter().map(|&p| Coordinate::from(p)).collect()
    }

    #[test]
    fn test_collapses_nearly_straight_line() {
        let input = path(&[(0.0, 0.0), (1.0, 0.01), (2.0, 0.0)]);
        let output = simplify(&input, 0.1, true);
        assert_eq!(output, path(&[(0.0, 0.0), (2.0, 0.0)]));
    }

    #[test]
    fn test_keeps_significant_corner() {
        let input = path(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        let output = simplify(&input, 0.1, true);
        assert_eq!(output, input);
    }

    #[test]
    fn test_short_inputs_unchanged() {
        assert!(simplify(&[], 1.0, true).is_empty());

        let single = path(&[(3.0, 4.0)]);
        assert_eq!(simplify(&single, 1.0, true), single);

        let pair = path(&[(0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(simplify(&pair, 1.0, false), pair);
    }

    #[test]
    fn test_altitude_is_preserved() {
        let input = vec![
            Coordinate::with_alt(0.0, 0.0, 100.0),
            Coordinate::with_alt(1.0, 0.001, 110.0),
            Coordinate::with_alt(2.0, 0.0, 120.0),
        ];
        let output = simplify(&input, 0.1, true);
        assert_eq!(output, vec![input[0], input[2]]);
    }

    #[test]
    fn test_radial_pass_drops_clustered_points() {
        let input = path(&[
            (0.0, 0.0),
            (0.01, 0.0),
            (0.02, 0.0),
            (1.0, 1.0),
            (1.01, 1.0),
            (2.0, 0.0),
        ]);
        let radial = radial_distance(&input, 0.1 * 0.1);
        assert_eq!(radial, vec![0, 3, 5]);
    }

    #[test]
    fn test_radial_pass_appends_true_last_point() {
        let input = path(&[(0.0, 0.0), (1.0, 0.0), (1.01, 0.0)]);
        let radial = radial_distance(&input, 0.1 * 0.1);
        assert_eq!(radial, vec![0, 1, 2]);
    }

    #[test]
    fn test_fast_and_quality_agree_on_simple_shape() {
        let input = path(&[(0.0, 0.0), (0.5, 0.001), (1.0, 0.0), (1.0, 1.0)]);
        assert_eq!(simplify(&input, 0.05, true), simplify(&input, 0.05, false));
    }

    #[test]
    fn test_square_segment_distance() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(2.0, 0.0);
        // Perpendicular projection inside the segment
        assert_eq!(square_segment_distance(Coordinate::new(1.0, 1.0), a, b), 1.0);
        // Projection clamped to the end points
        assert_eq!(square_segment_distance(Coordinate::new(3.0, 1.0), a, b), 2.0);
        assert_eq!(square_segment_distance(Coordinate::new(-1.0, 0.0), a, b), 1.0);
        // Zero-length segment
        assert_eq!(square_segment_distance(Coordinate::new(3.0, 4.0), a, a), 25.0);
    }

    fn polyline() -> impl Strategy<Value = Vec<Coordinate>> {
        prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 1..60)
            .prop_map(|points| path(&points))
    }

    proptest! {
        #[test]
        fn prop_endpoints_preserved(points in polyline(), tolerance in 0.0f64..5.0, quality in any::<bool>()) {
            let output = simplify(&points, tolerance, quality);
            prop_assert_eq!(output.first(), points.first());
            prop_assert_eq!(output.last(), points.last());
        }

        #[test]
        fn prop_simplify_is_stable(points in polyline(), tolerance in 0.0f64..5.0) {
            let once = simplify(&points, tolerance, true);
            let twice = simplify(&once, tolerance, true);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_larger_tolerance_keeps_fewer_points(
            points in polyline(),
            t1 in 0.0f64..2.0,
            delta in 0.0f64..2.0,
        ) {
            let fine = simplify(&points, t1, true);
            let coarse = simplify(&points, t1 + delta, true);
            prop_assert!(fine.len() >= coarse.len());
        }

        #[test]
        fn prop_output_is_subsequence(points in polyline(), tolerance in 0.0f64..5.0, quality in any::<bool>()) {
            let indices = simplify_indices(&points, tolerance, quality);
            prop_assert!(indices.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(indices.iter().all(|&i| i < points.len()));
        }
    }
}
