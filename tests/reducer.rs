//! Tests for coverage reduction

use geo::{coord, Line};
use highway_compare::{
    compare_lines, reduce_feature, FeatureCoverage, LineFeature, MatchOptions, Segment,
    SegmentIndex, Verdict,
};

fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment {
    Line::new(coord! { x: x1, y: y1 }, coord! { x: x2, y: y2 })
}

fn line(id: &str, coords: &[(f64, f64)]) -> LineFeature {
    LineFeature::from_coords(Some(id), coords)
}

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

#[test]
fn test_exact_duplicate_is_matched() {
    let gt = line("gt", &[(0.0, 0.0), (0.0, 1.0)]);
    let osm = line("osm", &[(0.0, 0.0), (0.0, 1.0)]);

    let outcome = reduce_feature(&gt, &[osm], &MatchOptions::default());
    assert_eq!(outcome.verdict, Verdict::Matched);
    assert!(approx_eq(outcome.coverage, 1.0, 1e-9));
    assert!(outcome.residual.is_empty());
    assert_eq!(outcome.matched_candidates, vec![0]);
}

#[test]
fn test_duplicate_multi_vertex_line_is_matched() {
    let coords = [(8.54, 47.37), (8.541, 47.371), (8.543, 47.371), (8.544, 47.373)];
    let gt = line("gt", &coords);
    let osm = line("osm", &coords);

    let outcome = reduce_feature(&gt, &[osm], &MatchOptions::default());
    assert_eq!(outcome.verdict, Verdict::Matched);
    assert!(MatchOptions::default().is_full_coverage(outcome.coverage));
}

#[test]
fn test_half_length_candidate_is_partial() {
    let gt = line("gt", &[(0.0, 0.0), (0.0, 2.0)]);
    let osm = line("osm", &[(0.0, 0.0), (0.0, 1.0)]);

    let outcome = reduce_feature(&gt, &[osm], &MatchOptions::default());
    assert_eq!(outcome.verdict, Verdict::PartialMissing);
    assert!(approx_eq(outcome.coverage, 0.5, 1e-6));
    assert_eq!(outcome.residual, vec![seg(0.0, 1.0, 0.0, 2.0)]);
}

#[test]
fn test_far_candidate_is_missing() {
    let gt = line("gt", &[(0.0, 0.0), (0.0, 1.0)]);
    let osm = line("osm", &[(3.0, 0.0), (3.0, 1.0)]);

    let outcome = reduce_feature(&gt, &[osm], &MatchOptions::default());
    assert_eq!(outcome.verdict, Verdict::Missing);
    assert_eq!(outcome.coverage, 0.0);
    assert!(outcome.matched_candidates.is_empty());
    assert_eq!(outcome.residual, gt.segments());
}

#[test]
fn test_no_candidates_is_missing() {
    let gt = line("gt", &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);
    let outcome = reduce_feature(&gt, &[], &MatchOptions::default());
    assert_eq!(outcome.verdict, Verdict::Missing);
    assert_eq!(outcome.coverage, 0.0);
}

#[test]
fn test_coverage_is_monotonic() {
    let gt = line("gt", &[(0.0, 0.0), (0.0, 4.0)]);
    let candidates = [
        SegmentIndex::new(&[seg(0.0, 0.0, 0.0, 1.0)]),
        SegmentIndex::new(&[seg(5.0, 5.0, 5.0, 6.0)]),
        SegmentIndex::new(&[seg(0.0, 1.0, 0.0, 2.0)]),
        SegmentIndex::new(&[seg(0.0, 0.0, 0.0, 1.0)]),
        SegmentIndex::new(&[seg(0.0, 2.0, 0.0, 3.0)]),
    ];
    let options = MatchOptions::default();

    let mut coverage = FeatureCoverage::new(&gt);
    let mut previous = coverage.coverage();
    for (i, candidate) in candidates.iter().enumerate() {
        coverage.apply(i, candidate, &options);
        assert!(coverage.coverage() >= previous);
        previous = coverage.coverage();
    }

    assert!(approx_eq(previous, 0.75, 1e-6));
    assert_eq!(coverage.matched_candidates(), &[0, 2, 4]);

    let outcome = coverage.finish(&options);
    assert_eq!(outcome.verdict, Verdict::PartialMissing);
    assert_eq!(outcome.residual.len(), 1);
}

#[test]
fn test_two_halves_complete_coverage() {
    let gt = line("gt", &[(0.0, 0.0), (0.0, 2.0)]);
    let candidates = vec![
        line("a", &[(0.0, 1.0), (0.0, 2.0)]),
        line("b", &[(0.0, 0.0), (0.0, 1.0)]),
        line("c", &[(0.0, 0.0), (0.0, 2.0)]),
    ];

    let outcome = reduce_feature(&gt, &candidates, &MatchOptions::default());
    assert_eq!(outcome.verdict, Verdict::Matched);
    // Stops as soon as coverage is full
    assert_eq!(outcome.matched_candidates, vec![0, 1]);
}

#[test]
fn test_reversed_candidate_matches() {
    let gt = line("gt", &[(0.0, 0.0), (0.0, 0.01), (0.01, 0.01)]);
    let osm = line("osm", &[(0.01, 0.01), (0.0, 0.01), (0.0, 0.0)]);

    let outcome = reduce_feature(&gt, &[osm], &MatchOptions::default());
    assert_eq!(outcome.verdict, Verdict::Matched);
}

#[test]
fn test_parallel_offset_within_tolerance() {
    // ~5.5 meters east
    let gt = line("gt", &[(0.0, 0.0), (0.0, 0.01)]);
    let osm = line("osm", &[(0.00005, -0.0001), (0.00005, 0.0101)]);

    let outcome = reduce_feature(&gt, &[osm], &MatchOptions::default());
    assert_eq!(outcome.verdict, Verdict::Matched);
}

#[test]
fn test_compare_lines_partition() {
    let reference = line("osm", &[(0.0, 0.5), (0.0, 1.5)]);
    let tested = line("gt", &[(0.0, 0.0), (0.0, 2.0)]);

    let comparison = compare_lines(&reference, &tested, &MatchOptions::default());
    assert_eq!(comparison.overlapping, vec![seg(0.0, 0.5, 0.0, 1.5)]);
    assert_eq!(comparison.residual, vec![seg(0.0, 0.0, 0.0, 0.5), seg(0.0, 1.5, 0.0, 2.0)]);

    let total = tested.length_km();
    let parts = comparison.overlap_length_km()
        + highway_compare::geo_utils::segments_length_km(&comparison.residual);
    assert!(approx_eq(total, parts, 1e-6));
}
