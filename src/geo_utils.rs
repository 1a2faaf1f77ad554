//! # Geographic Utilities
//!
//! Geometry primitives used by the overlap classifier and the coverage reducer.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`segmentize`] | Decompose lines into consecutive-vertex segments |
//! | [`bounding_box`] | Bounding box of a line geometry |
//! | [`bearing`] | Initial great-circle bearing between two coordinates |
//! | [`angle_difference`] | Direction-agnostic difference between two bearings |
//! | [`nearest_point_on_line`] | Closest point of a segment to a coordinate, with distance |
//! | [`point_on_line`] | Exact or tolerance-bounded containment test |
//! | [`offset_line`] | Segment shifted perpendicular to its bearing |
//! | [`buffer_polygon`] | Thin quadrilateral straddling a segment |
//! | [`segments_length_km`] | Total great-circle length of a set of segments |
//!
//! ## Units
//!
//! Coordinates are WGS84 degrees with `x = longitude` and `y = latitude`.
//! Distances and tolerances are kilometers on a spherical earth
//! (mean radius 6,371 km, via [`geo::Haversine`]).
//!
//! ## Example
//!
//! ```rust
//! use geo::{coord, Line};
//! use highway_compare::geo_utils;
//!
//! let segment = Line::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 0.0, y: 1.0 });
//!
//! // Due north
//! assert!(geo_utils::bearing(segment.start, segment.end).abs() < 1e-9);
//!
//! // A point 0.001 degrees east of the segment is ~111 meters away
//! let nearest = geo_utils::nearest_point_on_line(&segment, coord! { x: 0.001, y: 0.5 }).unwrap();
//! assert!((nearest.distance_km - 0.111).abs() < 0.001);
//! ```

use geo::{
    Bearing, BoundingRect, Closest, Coord, Destination, Distance, Haversine,
    HaversineClosestPoint, LineString, MultiLineString, Point, Polygon,
};

use crate::{Bounds, Segment};

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two coordinates, in kilometers.
#[inline]
pub fn haversine_distance_km(a: Coord, b: Coord) -> f64 {
    Haversine::distance(Point::from(a), Point::from(b)) / 1000.0
}

/// Great-circle length of a single segment, in kilometers.
#[inline]
pub fn segment_length_km(segment: &Segment) -> f64 {
    haversine_distance_km(segment.start, segment.end)
}

/// Total great-circle length of a set of segments, in kilometers.
///
/// Empty input returns 0.0.
pub fn segments_length_km(segments: &[Segment]) -> f64 {
    segments.iter().map(segment_length_km).sum()
}

// =============================================================================
// Decomposition and Bounds
// =============================================================================

/// Decompose a (multi-)line into consecutive-vertex segments.
///
/// A part with `n` vertices yields `n - 1` segments; parts with fewer than two
/// vertices yield none. Segment order follows part order, then vertex order.
///
/// # Example
///
/// ```rust
/// use geo::{line_string, MultiLineString};
/// use highway_compare::geo_utils::segmentize;
///
/// let lines = MultiLineString::new(vec![
///     line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0), (x: 1.0, y: 1.0)],
///     line_string![(x: 5.0, y: 5.0)],
/// ]);
/// assert_eq!(segmentize(&lines).len(), 2);
/// ```
pub fn segmentize(lines: &MultiLineString<f64>) -> Vec<Segment> {
    lines.0.iter().flat_map(LineString::lines).collect()
}

/// Minimal axis-aligned box enclosing a line geometry.
///
/// Returns `None` when the geometry has no coordinates.
pub fn bounding_box(lines: &MultiLineString<f64>) -> Option<Bounds> {
    lines.bounding_rect().map(Bounds::from_rect)
}

/// Bounding box of a single segment.
#[inline]
pub fn segment_bounds(segment: &Segment) -> Bounds {
    Bounds::from_rect(segment.bounding_rect())
}

// =============================================================================
// Bearings
// =============================================================================

/// Initial compass bearing from `a` to `b` on a spherical earth.
///
/// Returns degrees in `(-180, 180]`: 0 is north, 90 east, 180 south, -90 west.
/// Identical points yield 0.
pub fn bearing(a: Coord, b: Coord) -> f64 {
    let degrees = Haversine::bearing(Point::from(a), Point::from(b));
    if degrees > 180.0 {
        degrees - 360.0
    } else if degrees <= -180.0 {
        degrees + 360.0
    } else {
        degrees
    }
}

/// Smallest angle between two bearings, treating opposite directions as equal.
///
/// A road digitised in either direction is the same road, so the result lies
/// in `[0, 90]`.
///
/// # Example
///
/// ```rust
/// use highway_compare::geo_utils::angle_difference;
///
/// assert_eq!(angle_difference(0.0, 180.0), 0.0);
/// assert_eq!(angle_difference(10.0, -170.0), 0.0);
/// assert_eq!(angle_difference(0.0, 90.0), 90.0);
/// assert_eq!(angle_difference(170.0, -170.0), 20.0);
/// ```
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 180.0;
    d.min(180.0 - d)
}

// =============================================================================
// Projection and Containment
// =============================================================================

/// Closest point of a segment to a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    /// The projected coordinate on the segment
    pub point: Coord,
    /// Great-circle distance from the query coordinate, in kilometers
    pub distance_km: f64,
}

/// Project a coordinate onto the closest point of a segment.
///
/// The projection follows the great circle through the segment's endpoints.
///
/// # Arguments
///
/// * `line` - Segment to project onto
/// * `point` - Query coordinate (x = longitude, y = latitude)
///
/// # Returns
///
/// The closest point with its distance in kilometers, or `None` when the
/// projection is indeterminate (non-finite input). Callers treat `None` as
/// "not near".
pub fn nearest_point_on_line(line: &Segment, point: Coord) -> Option<NearestPoint> {
    let from = Point::from(point);
    let closest = match line.haversine_closest_point(&from) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p,
        Closest::Indeterminate => return None,
    };
    let distance_km = Haversine::distance(from, closest) / 1000.0;
    if !distance_km.is_finite() {
        return None;
    }
    Some(NearestPoint { point: closest.0, distance_km })
}

/// Check if a coordinate lies on a segment.
///
/// With `tolerance_km == 0` this is an exact planar test: the coordinate must
/// be collinear with the segment and inside its extent. Otherwise the
/// great-circle distance to the segment must not exceed the tolerance.
pub fn point_on_line(point: Coord, line: &Segment, tolerance_km: f64) -> bool {
    if tolerance_km > 0.0 {
        return nearest_point_on_line(line, point)
            .is_some_and(|nearest| nearest.distance_km <= tolerance_km);
    }

    let (a, b) = (line.start, line.end);
    let cross = (point.x - a.x) * (b.y - a.y) - (point.y - a.y) * (b.x - a.x);
    if cross != 0.0 {
        return false;
    }

    point.x >= a.x.min(b.x)
        && point.x <= a.x.max(b.x)
        && point.y >= a.y.min(b.y)
        && point.y <= a.y.max(b.y)
}

/// Planar parameter of the projection of `point` onto the segment's supporting
/// line: 0 at the start, 1 at the end. Not clamped.
///
/// Zero-length segments return 0.
pub fn project_parameter(segment: &Segment, point: Coord) -> f64 {
    let dx = segment.end.x - segment.start.x;
    let dy = segment.end.y - segment.start.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return 0.0;
    }
    ((point.x - segment.start.x) * dx + (point.y - segment.start.y) * dy) / len_sq
}

/// Coordinate at planar parameter `t` along the segment.
///
/// `t <= 0` and `t >= 1` return the exact endpoints.
pub fn point_along(segment: &Segment, t: f64) -> Coord {
    if t <= 0.0 {
        return segment.start;
    }
    if t >= 1.0 {
        return segment.end;
    }
    Coord {
        x: segment.start.x + t * (segment.end.x - segment.start.x),
        y: segment.start.y + t * (segment.end.y - segment.start.y),
    }
}

/// The part of a segment between planar parameters `t0` and `t1`.
pub fn sub_segment(segment: &Segment, t0: f64, t1: f64) -> Segment {
    Segment::new(point_along(segment, t0), point_along(segment, t1))
}

// =============================================================================
// Offsets and Buffers
// =============================================================================

/// Shift a segment perpendicular to its bearing by `distance_km`.
///
/// Each endpoint moves along a great circle.
///
/// # Arguments
///
/// * `segment` - Segment to shift
/// * `distance_km` - Offset in kilometers: positive shifts to the right of the
///   direction of travel, negative to the left
///
/// # Returns
///
/// The shifted segment, with the same direction. A zero distance returns the
/// segment unchanged.
pub fn offset_line(segment: &Segment, distance_km: f64) -> Segment {
    if distance_km == 0.0 {
        return *segment;
    }

    let heading = bearing(segment.start, segment.end);
    let perpendicular = if distance_km > 0.0 { heading + 90.0 } else { heading - 90.0 };
    let meters = distance_km.abs() * 1000.0;

    let start = Haversine::destination(Point::from(segment.start), perpendicular, meters);
    let end = Haversine::destination(Point::from(segment.end), perpendicular, meters);

    Segment::new(start.0, end.0)
}

/// Build the search envelope for a segment.
///
/// The quadrilateral joins `offset_line(segment, +tolerance)` and
/// `offset_line(segment, -tolerance)`. With zero tolerance it degenerates to
/// the segment's own bounding box.
pub fn buffer_polygon(segment: &Segment, tolerance_km: f64) -> Polygon<f64> {
    if tolerance_km <= 0.0 {
        return segment.bounding_rect().to_polygon();
    }

    let right = offset_line(segment, tolerance_km);
    let left = offset_line(segment, -tolerance_km);

    Polygon::new(
        LineString::new(vec![right.start, right.end, left.end, left.start, right.start]),
        vec![],
    )
}

/// Bounding box of [`buffer_polygon`], used for index range queries.
pub fn buffer_bounds(segment: &Segment, tolerance_km: f64) -> Bounds {
    buffer_polygon(segment, tolerance_km)
        .bounding_rect()
        .map(Bounds::from_rect)
        .unwrap_or_else(|| segment_bounds(segment))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, line_string};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment {
        Segment::new(coord! { x: x1, y: y1 }, coord! { x: x2, y: y2 })
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_distance_km(coord! { x: 0.0, y: 0.0 }, coord! { x: 0.0, y: 1.0 });
        assert!(approx_eq(d, 111.19, 0.01));
    }

    #[test]
    fn test_segmentize_counts() {
        let lines = MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 1.0), (x: 0.0, y: 2.0)],
            line_string![(x: 1.0, y: 0.0), (x: 1.0, y: 1.0)],
        ]);
        let segments = segmentize(&lines);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], seg(0.0, 0.0, 0.0, 1.0));
        assert_eq!(segments[2], seg(1.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_segmentize_empty() {
        let lines: MultiLineString<f64> = MultiLineString::new(vec![]);
        assert!(segmentize(&lines).is_empty());
        assert!(bounding_box(&lines).is_none());
    }

    #[test]
    fn test_bounding_box() {
        let lines = MultiLineString::new(vec![
            line_string![(x: -1.0, y: 2.0), (x: 3.0, y: -4.0)],
        ]);
        let b = bounding_box(&lines).unwrap();
        assert_eq!(b, Bounds::new(-1.0, -4.0, 3.0, 2.0));
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = coord! { x: 0.0, y: 0.0 };
        assert!(approx_eq(bearing(origin, coord! { x: 0.0, y: 1.0 }), 0.0, 1e-9));
        assert!(approx_eq(bearing(origin, coord! { x: 1.0, y: 0.0 }), 90.0, 1e-9));
        assert!(approx_eq(bearing(coord! { x: 0.0, y: 1.0 }, origin), 180.0, 1e-9));
        assert!(approx_eq(bearing(origin, coord! { x: -1.0, y: 0.0 }), -90.0, 1e-9));
    }

    #[test]
    fn test_angle_difference_ignores_direction() {
        assert!(approx_eq(angle_difference(45.0, -135.0), 0.0, 1e-9));
        assert!(approx_eq(angle_difference(0.0, 90.0), 90.0, 1e-9));
        assert!(approx_eq(angle_difference(-90.0, 90.0), 0.0, 1e-9));
        assert!(approx_eq(angle_difference(5.0, 175.0), 10.0, 1e-9));
    }

    #[test]
    fn test_nearest_point_on_segment_interior() {
        let s = seg(0.0, 0.0, 0.0, 1.0);
        let nearest = nearest_point_on_line(&s, coord! { x: 0.001, y: 0.5 }).unwrap();
        assert!(approx_eq(nearest.point.x, 0.0, 1e-9));
        assert!(approx_eq(nearest.point.y, 0.5, 1e-6));
        assert!(approx_eq(nearest.distance_km, 0.1112, 0.001));
    }

    #[test]
    fn test_nearest_point_beyond_end() {
        let s = seg(0.0, 0.0, 0.0, 1.0);
        let nearest = nearest_point_on_line(&s, coord! { x: 0.0, y: 2.0 }).unwrap();
        assert!(approx_eq(nearest.point.y, 1.0, 1e-9));
        assert!(approx_eq(nearest.distance_km, 111.19, 0.01));
    }

    #[test]
    fn test_nearest_point_non_finite() {
        let s = seg(0.0, 0.0, 0.0, 1.0);
        assert!(nearest_point_on_line(&s, coord! { x: f64::NAN, y: 0.5 }).is_none());
    }

    #[test]
    fn test_point_on_line_exact() {
        let s = seg(0.0, 0.0, 2.0, 2.0);
        assert!(point_on_line(coord! { x: 1.0, y: 1.0 }, &s, 0.0));
        assert!(point_on_line(coord! { x: 0.0, y: 0.0 }, &s, 0.0));
        assert!(!point_on_line(coord! { x: 3.0, y: 3.0 }, &s, 0.0));
        assert!(!point_on_line(coord! { x: 1.0, y: 1.0001 }, &s, 0.0));
    }

    #[test]
    fn test_point_on_line_with_tolerance() {
        let s = seg(0.0, 0.0, 0.0, 1.0);
        assert!(point_on_line(coord! { x: 0.00005, y: 0.5 }, &s, 0.01));
        assert!(!point_on_line(coord! { x: 0.001, y: 0.5 }, &s, 0.01));
    }

    #[test]
    fn test_project_parameter_and_sub_segment() {
        let s = seg(0.0, 0.0, 0.0, 2.0);
        assert!(approx_eq(project_parameter(&s, coord! { x: 0.0, y: 1.0 }), 0.5, 1e-12));
        assert!(approx_eq(project_parameter(&s, coord! { x: 5.0, y: 3.0 }), 1.5, 1e-12));
        assert_eq!(sub_segment(&s, 0.5, 1.0), seg(0.0, 1.0, 0.0, 2.0));
        assert_eq!(project_parameter(&seg(1.0, 1.0, 1.0, 1.0), coord! { x: 0.0, y: 0.0 }), 0.0);
    }

    #[test]
    fn test_offset_line_distance() {
        let s = seg(0.0, 0.0, 0.0, 0.01);
        let right = offset_line(&s, 0.01);
        let left = offset_line(&s, -0.01);

        // Northbound segment: right is east, left is west
        assert!(right.start.x > 0.0);
        assert!(left.start.x < 0.0);
        assert!(approx_eq(haversine_distance_km(s.start, right.start), 0.01, 1e-6));
        assert!(approx_eq(haversine_distance_km(s.end, left.end), 0.01, 1e-6));
        assert_eq!(offset_line(&s, 0.0), s);
    }

    #[test]
    fn test_buffer_bounds_widen_perpendicular() {
        let s = seg(0.0, 0.0, 0.0, 1.0);
        let b = buffer_bounds(&s, 0.01);
        assert!(b.min_lng < 0.0 && b.max_lng > 0.0);
        assert!(approx_eq(b.max_lng, 0.01 / 111.19, 1e-6));
        assert!(approx_eq(b.min_lat, 0.0, 1e-9));
        assert!(approx_eq(b.max_lat, 1.0, 1e-9));
    }

    #[test]
    fn test_buffer_zero_tolerance_is_segment_box() {
        let s = seg(0.0, 0.0, 1.0, 2.0);
        assert_eq!(buffer_bounds(&s, 0.0), Bounds::new(0.0, 0.0, 1.0, 2.0));
    }

    #[test]
    fn test_segments_length() {
        let segments = vec![seg(0.0, 0.0, 0.0, 1.0), seg(0.0, 1.0, 0.0, 2.0)];
        assert!(approx_eq(segments_length_km(&segments), 222.39, 0.02));
        assert_eq!(segments_length_km(&[]), 0.0);
    }
}
