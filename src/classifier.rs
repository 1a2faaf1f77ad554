//! # Overlap Classifier
//!
//! Decides whether two segments represent the same stretch of road.
//!
//! ## Decision Procedure
//!
//! Cases are evaluated in order and the first one that applies wins:
//!
//! 1. **Identity** - the endpoint sets are equal (direction ignored)
//! 2. **Zero-tolerance containment** - with `tolerance == 0`, both endpoints of
//!    the tested segment lie exactly on the indexed segment; otherwise reject
//! 3. **Angle gate** - bearings differ by more than `max_angle` (direction
//!    ignored): reject
//! 4. **Proximity** - both tested endpoints project onto the indexed segment
//!    within tolerance, at two distinct points
//! 5. **Reverse proximity** - both indexed endpoints project onto the tested
//!    segment within tolerance, at two distinct points
//! 6. **Partial containment** - one endpoint from each direction is within
//!    tolerance and the two near projections are distinct (one segment extends
//!    beyond the other)
//!
//! Cheap, strict tests run first so the common rejections (case 3) never pay
//! for the four projections.
//!
//! A zero-length segment only overlaps an identical one. Non-finite
//! coordinates never overlap: their projections are indeterminate.

use crate::geo_utils::{
    angle_difference, bearing, nearest_point_on_line, point_on_line, project_parameter,
    NearestPoint,
};
use crate::Segment;

/// Which case of the decision procedure accepted a segment pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapCase {
    /// Same endpoints, either direction
    Identical,
    /// Tested segment lies exactly on the indexed one (zero tolerance)
    Contained,
    /// Tested endpoints are near the indexed segment
    Proximity,
    /// Indexed endpoints are near the tested segment
    ReverseProximity,
    /// Segments overlap over part of their lengths
    PartialContainment,
}

impl OverlapCase {
    /// Parameter interval `[t0, t1]` of the tested segment covered by the
    /// indexed one.
    ///
    /// The first three cases cover the tested segment entirely. The other two
    /// only cover the stretch between the projections of the indexed
    /// endpoints, clamped to the tested segment.
    pub fn covered_interval(self, segment: &Segment, indexed: &Segment) -> (f64, f64) {
        match self {
            OverlapCase::Identical | OverlapCase::Contained | OverlapCase::Proximity => (0.0, 1.0),
            OverlapCase::ReverseProximity | OverlapCase::PartialContainment => {
                let t0 = project_parameter(segment, indexed.start).clamp(0.0, 1.0);
                let t1 = project_parameter(segment, indexed.end).clamp(0.0, 1.0);
                (t0.min(t1), t0.max(t1))
            }
        }
    }
}

/// Classify a tested segment against an indexed segment.
///
/// Returns the accepting case, or `None` when the segments are not the same
/// road at this tolerance.
///
/// # Arguments
///
/// * `segment` - Segment of the line under test
/// * `indexed` - Segment returned by the spatial index
/// * `tolerance_km` - Maximum endpoint-to-segment distance
/// * `max_angle_deg` - Maximum bearing difference
///
/// # Example
///
/// ```rust
/// use geo::{coord, Line};
/// use highway_compare::{classify_segments, OverlapCase};
///
/// let a = Line::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 0.0, y: 0.001 });
/// let b = Line::new(coord! { x: 0.00003, y: 0.0 }, coord! { x: 0.00003, y: 0.001 });
///
/// // ~3 meters apart, parallel
/// assert_eq!(classify_segments(&a, &b, 0.01, 15.0), Some(OverlapCase::Proximity));
///
/// // Perpendicular
/// let c = Line::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 0.001, y: 0.0 });
/// assert_eq!(classify_segments(&a, &c, 0.01, 15.0), None);
/// ```
pub fn classify_segments(
    segment: &Segment,
    indexed: &Segment,
    tolerance_km: f64,
    max_angle_deg: f64,
) -> Option<OverlapCase> {
    // Case 1: identical endpoint sets
    if same_endpoints(segment, indexed) {
        return Some(OverlapCase::Identical);
    }

    // Zero-length segments have no direction and cover nothing
    if segment.start == segment.end || indexed.start == indexed.end {
        return None;
    }

    // Case 2: exact containment
    if tolerance_km == 0.0 {
        let contained = point_on_line(segment.start, indexed, 0.0)
            && point_on_line(segment.end, indexed, 0.0);
        return contained.then_some(OverlapCase::Contained);
    }

    // Case 3: angle gate
    let diff = angle_difference(
        bearing(segment.start, segment.end),
        bearing(indexed.start, indexed.end),
    );
    if diff > max_angle_deg {
        return None;
    }

    // Case 4: tested -> indexed
    let p1 = nearest_point_on_line(indexed, segment.start);
    let p2 = nearest_point_on_line(indexed, segment.end);
    let near1 = is_near(p1, tolerance_km);
    let near2 = is_near(p2, tolerance_km);

    if near1 && near2 && distinct(p1, p2) {
        return Some(OverlapCase::Proximity);
    }

    // Case 5: indexed -> tested
    let p3 = nearest_point_on_line(segment, indexed.start);
    let p4 = nearest_point_on_line(segment, indexed.end);
    let near3 = is_near(p3, tolerance_km);
    let near4 = is_near(p4, tolerance_km);

    if near3 && near4 && distinct(p3, p4) {
        return Some(OverlapCase::ReverseProximity);
    }

    // Case 6: one near endpoint in each direction
    if (near1 || near2) && (near3 || near4) {
        let p5 = if near1 { p1 } else { p2 };
        let p6 = if near3 { p3 } else { p4 };
        if distinct(p5, p6) {
            return Some(OverlapCase::PartialContainment);
        }
    }

    None
}

/// Boolean form of [`classify_segments`].
#[inline]
pub fn segments_overlap(
    segment: &Segment,
    indexed: &Segment,
    tolerance_km: f64,
    max_angle_deg: f64,
) -> bool {
    classify_segments(segment, indexed, tolerance_km, max_angle_deg).is_some()
}

fn same_endpoints(a: &Segment, b: &Segment) -> bool {
    (a.start == b.start && a.end == b.end) || (a.start == b.end && a.end == b.start)
}

fn is_near(nearest: Option<NearestPoint>, tolerance_km: f64) -> bool {
    nearest.is_some_and(|n| n.distance_km <= tolerance_km)
}

/// Both projections exist and do not coincide.
fn distinct(a: Option<NearestPoint>, b: Option<NearestPoint>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.point != b.point,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment {
        Segment::new(coord! { x: x1, y: y1 }, coord! { x: x2, y: y2 })
    }

    #[test]
    fn test_identity_either_direction() {
        let s = seg(0.0, 0.0, 0.0, 1.0);
        let r = seg(0.0, 1.0, 0.0, 0.0);
        assert_eq!(classify_segments(&s, &s, 0.01, 15.0), Some(OverlapCase::Identical));
        assert_eq!(classify_segments(&s, &r, 0.01, 15.0), Some(OverlapCase::Identical));
        // Identity wins before the angle gate, even with a zero angle budget
        assert_eq!(classify_segments(&s, &r, 0.0, 0.0), Some(OverlapCase::Identical));
    }

    #[test]
    fn test_zero_tolerance_containment() {
        let indexed = seg(0.0, 0.0, 0.0, 2.0);
        let inside = seg(0.0, 0.5, 0.0, 1.5);
        let shifted = seg(0.00001, 0.5, 0.00001, 1.5);
        let sticking_out = seg(0.0, 1.5, 0.0, 2.5);

        assert_eq!(classify_segments(&inside, &indexed, 0.0, 15.0), Some(OverlapCase::Contained));
        assert_eq!(classify_segments(&shifted, &indexed, 0.0, 15.0), None);
        assert_eq!(classify_segments(&sticking_out, &indexed, 0.0, 15.0), None);
    }

    #[test]
    fn test_angle_gate_rejects_perpendicular() {
        let s = seg(0.0, 0.0, 0.0, 0.001);
        let crossing = seg(-0.0005, 0.0005, 0.0005, 0.0005);
        // Even with a huge tolerance
        assert_eq!(classify_segments(&s, &crossing, 1000.0, 15.0), None);
        // Accepted once the angle budget allows it
        assert!(segments_overlap(&s, &crossing, 1000.0, 180.0));
    }

    #[test]
    fn test_proximity_parallel_offset() {
        let s = seg(0.0, 0.0, 0.0, 0.001);
        let near = seg(0.00005, -0.0001, 0.00005, 0.0011);
        let far = seg(0.001, -0.0001, 0.001, 0.0011);
        assert_eq!(classify_segments(&s, &near, 0.01, 15.0), Some(OverlapCase::Proximity));
        assert_eq!(classify_segments(&s, &far, 0.01, 15.0), None);
    }

    #[test]
    fn test_reverse_proximity_longer_tested_segment() {
        let tested = seg(0.0, 0.0, 0.0, 2.0);
        let indexed = seg(0.0, 0.0, 0.0, 1.0);
        assert_eq!(
            classify_segments(&tested, &indexed, 0.01, 15.0),
            Some(OverlapCase::ReverseProximity)
        );
        let (t0, t1) = OverlapCase::ReverseProximity.covered_interval(&tested, &indexed);
        assert!((t0 - 0.0).abs() < 1e-12);
        assert!((t1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_partial_containment_staggered() {
        // Overlap on [0.0005, 0.001] of latitude
        let tested = seg(0.0, 0.0, 0.0, 0.001);
        let indexed = seg(0.00002, 0.0005, 0.00002, 0.0015);
        assert_eq!(
            classify_segments(&tested, &indexed, 0.01, 15.0),
            Some(OverlapCase::PartialContainment)
        );
        let (t0, t1) = OverlapCase::PartialContainment.covered_interval(&tested, &indexed);
        assert!((t0 - 0.5).abs() < 1e-9);
        assert!((t1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_touching_end_to_end_is_not_overlap() {
        // Collinear, sharing only one vertex
        let tested = seg(0.0, 0.0, 0.0, 0.001);
        let indexed = seg(0.0, 0.001, 0.0, 0.002);
        assert_eq!(classify_segments(&tested, &indexed, 0.01, 15.0), None);
    }

    #[test]
    fn test_degenerate_segments_never_overlap() {
        let point = seg(0.0, 0.0005, 0.0, 0.0005);
        let s = seg(0.0, 0.0, 0.0, 0.001);
        assert!(!segments_overlap(&point, &s, 0.01, 15.0));
        assert!(!segments_overlap(&s, &point, 0.01, 15.0));

        // Shorter than the tolerance, with a near point off the zero-length one
        let short = seg(0.0, 0.0, 0.0, 0.00005);
        let offset_point = seg(0.00001, 0.00002, 0.00001, 0.00002);
        assert_eq!(classify_segments(&short, &offset_point, 0.01, 15.0), None);
        assert_eq!(classify_segments(&offset_point, &short, 0.01, 15.0), None);
        assert_eq!(classify_segments(&offset_point, &short, 0.0, 15.0), None);

        // Still identical to itself
        assert_eq!(
            classify_segments(&offset_point, &offset_point, 0.01, 15.0),
            Some(OverlapCase::Identical)
        );

        let nan = seg(f64::NAN, 0.0, 0.0, 0.001);
        assert!(!segments_overlap(&nan, &s, 0.01, 15.0));
    }

    #[test]
    fn test_full_cases_cover_whole_segment() {
        let s = seg(0.0, 0.0, 0.0, 1.0);
        let other = seg(0.0, 0.2, 0.0, 0.4);
        for case in [OverlapCase::Identical, OverlapCase::Contained, OverlapCase::Proximity] {
            assert_eq!(case.covered_interval(&s, &other), (0.0, 1.0));
        }
    }
}
