//! # Coverage Reducer
//!
//! Consumes one ground-truth feature against an ordered list of candidate
//! lines, accumulating a coverage fraction and shrinking the feature down to
//! the geometry no candidate accounts for.
//!
//! ## Algorithm
//! 1. Segmentize the current residual of the ground-truth feature
//! 2. For every residual segment, query the candidate's segment index with the
//!    segment's buffer envelope and classify each hit
//! 3. Trim each accepted segment to the stretch the candidate actually covers
//! 4. `coverage += (overlap / residual) * (1 - coverage)`, then replace the
//!    residual with the uncovered remainder
//! 5. Stop as soon as coverage lands in `(1 - err, 1 + err]`
//!
//! ## State Machine
//!
//! ```text
//! Unmatched ──match──▶ PartiallyMatched ──match──▶ PartiallyMatched
//!     │                       │
//!     │                       ├──full coverage──▶ FullyMatched
//!     │                       └──candidates exhausted──▶ Exhausted
//!     └──full coverage──▶ FullyMatched
//! ```

use log::{debug, warn};

use crate::classifier::classify_segments;
use crate::geo_utils::{buffer_bounds, segments_length_km, sub_segment};
use crate::index::SegmentIndex;
use crate::{LineFeature, MatchOptions, Segment};

/// Parameter intervals shorter than this are treated as empty.
const MIN_INTERVAL: f64 = 1e-12;

// =============================================================================
// Line Comparison
// =============================================================================

/// Result of comparing a line's segments against an indexed reference line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineComparison {
    /// Parts of the tested line matched by the reference
    pub overlapping: Vec<Segment>,
    /// Parts of the tested line left unmatched
    pub residual: Vec<Segment>,
}

impl LineComparison {
    /// Great-circle length of the overlapping parts, in kilometers.
    pub fn overlap_length_km(&self) -> f64 {
        segments_length_km(&self.overlapping)
    }
}

/// Compare `segments` against every segment of an indexed reference line.
///
/// Each tested segment is split into the stretches covered by accepted
/// reference segments (the union of their covered intervals) and the
/// stretches left over.
pub fn compare_segments(
    reference: &SegmentIndex,
    segments: &[Segment],
    options: &MatchOptions,
) -> LineComparison {
    let mut result = LineComparison::default();

    for segment in segments {
        let envelope = buffer_bounds(segment, options.tolerance_km);

        let intervals: Vec<(f64, f64)> = reference
            .search(&envelope)
            .into_iter()
            .filter_map(|indexed| {
                classify_segments(segment, indexed, options.tolerance_km, options.max_angle_deg)
                    .map(|case| case.covered_interval(segment, indexed))
            })
            .collect();

        if intervals.is_empty() {
            result.residual.push(*segment);
            continue;
        }

        let covered = merge_intervals(intervals);
        let mut cursor = 0.0;
        for (t0, t1) in covered {
            if t0 - cursor > MIN_INTERVAL {
                result.residual.push(sub_segment(segment, cursor, t0));
            }
            result.overlapping.push(sub_segment(segment, t0, t1));
            cursor = t1;
        }
        if 1.0 - cursor > MIN_INTERVAL {
            result.residual.push(sub_segment(segment, cursor, 1.0));
        }
    }

    result
}

/// Compare `line` against `reference`, building the reference index on the fly.
///
/// # Example
///
/// ```rust
/// use highway_compare::{compare_lines, LineFeature, MatchOptions};
///
/// let ground_truth = LineFeature::from_coords(None, &[(0.0, 0.0), (0.0, 2.0)]);
/// let candidate = LineFeature::from_coords(None, &[(0.0, 0.0), (0.0, 1.0)]);
///
/// let comparison = compare_lines(&candidate, &ground_truth, &MatchOptions::default());
/// assert_eq!(comparison.overlapping.len(), 1);
/// assert_eq!(comparison.residual.len(), 1);
/// ```
pub fn compare_lines(
    reference: &LineFeature,
    line: &LineFeature,
    options: &MatchOptions,
) -> LineComparison {
    let index = SegmentIndex::from_lines(&reference.geometry);
    compare_segments(&index, &line.segments(), options)
}

/// Sort and union parameter intervals, dropping empty ones.
fn merge_intervals(mut intervals: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    intervals.retain(|(t0, t1)| t1 - t0 > MIN_INTERVAL);
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
    for (t0, t1) in intervals {
        match merged.last_mut() {
            Some(last) if t0 <= last.1 => last.1 = last.1.max(t1),
            _ => merged.push((t0, t1)),
        }
    }
    merged
}

// =============================================================================
// Coverage State Machine
// =============================================================================

/// Reduction state of one ground-truth feature.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageState {
    /// No candidate accepted yet; the residual is the whole feature
    Unmatched,
    /// Some candidates accepted, more may follow
    PartiallyMatched { residual: Vec<Segment>, coverage: f64 },
    /// Coverage reached `(1 - err, 1 + err]`
    FullyMatched { coverage: f64 },
    /// Candidates ran out before full coverage
    Exhausted { residual: Vec<Segment>, coverage: f64 },
}

/// Final classification of a ground-truth feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No candidate overlapped (coverage == 0)
    Missing,
    /// Coverage in `(1 - err, 1 + err]`
    Matched,
    /// Anything else
    PartialMissing,
}

impl Verdict {
    /// Bucket a coverage fraction.
    ///
    /// Coverage above `1 + err` is an anomaly; it lands in `PartialMissing`.
    pub fn from_coverage(coverage: f64, options: &MatchOptions) -> Self {
        if coverage == 0.0 {
            Verdict::Missing
        } else if options.is_full_coverage(coverage) {
            Verdict::Matched
        } else {
            Verdict::PartialMissing
        }
    }
}

/// Mutable coverage bookkeeping for one ground-truth feature.
#[derive(Debug, Clone)]
pub struct FeatureCoverage {
    original: Vec<Segment>,
    state: CoverageState,
    matched_candidates: Vec<usize>,
}

impl FeatureCoverage {
    /// Start reducing a feature.
    pub fn new(feature: &LineFeature) -> Self {
        Self {
            original: feature.segments(),
            state: CoverageState::Unmatched,
            matched_candidates: Vec::new(),
        }
    }

    pub fn state(&self) -> &CoverageState {
        &self.state
    }

    /// Current coverage fraction.
    pub fn coverage(&self) -> f64 {
        match &self.state {
            CoverageState::Unmatched => 0.0,
            CoverageState::PartiallyMatched { coverage, .. }
            | CoverageState::FullyMatched { coverage }
            | CoverageState::Exhausted { coverage, .. } => *coverage,
        }
    }

    /// Geometry not yet accounted for. Empty once fully matched.
    pub fn residual(&self) -> &[Segment] {
        match &self.state {
            CoverageState::Unmatched => &self.original,
            CoverageState::PartiallyMatched { residual, .. }
            | CoverageState::Exhausted { residual, .. } => residual,
            CoverageState::FullyMatched { .. } => &[],
        }
    }

    /// Indexes of accepted candidates, in acceptance order.
    pub fn matched_candidates(&self) -> &[usize] {
        &self.matched_candidates
    }

    /// True once no further candidate can change the outcome.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.state,
            CoverageState::FullyMatched { .. } | CoverageState::Exhausted { .. }
        )
    }

    /// Reduce against one candidate. Returns true if the candidate was accepted.
    pub fn apply(
        &mut self,
        candidate_index: usize,
        candidate: &SegmentIndex,
        options: &MatchOptions,
    ) -> bool {
        if self.is_settled() || candidate.is_empty() {
            return false;
        }

        let residual = self.residual();
        let residual_length = segments_length_km(residual);
        if residual_length <= 0.0 {
            return false;
        }

        let comparison = compare_segments(candidate, residual, options);
        let overlap_length = comparison.overlap_length_km();
        if comparison.overlapping.is_empty() || overlap_length <= 0.0 {
            return false;
        }

        let previous = self.coverage();
        let coverage = previous + (overlap_length / residual_length) * (1.0 - previous);
        self.matched_candidates.push(candidate_index);

        debug!(
            "[Reducer] Candidate {} covers {:.4}km of {:.4}km residual, coverage {:.3} -> {:.3}",
            candidate_index, overlap_length, residual_length, previous, coverage
        );

        self.state = if options.is_full_coverage(coverage) {
            CoverageState::FullyMatched { coverage }
        } else {
            CoverageState::PartiallyMatched { residual: comparison.residual, coverage }
        };
        true
    }

    /// Mark the candidate list as exhausted.
    pub fn exhaust(&mut self) {
        if let CoverageState::PartiallyMatched { residual, coverage } = &mut self.state {
            self.state = CoverageState::Exhausted {
                residual: std::mem::take(residual),
                coverage: *coverage,
            };
        }
    }

    /// Finish reduction and produce the outcome.
    pub fn finish(mut self, options: &MatchOptions) -> FeatureOutcome {
        self.exhaust();
        let coverage = self.coverage();
        let verdict = Verdict::from_coverage(coverage, options);
        let residual = self.residual().to_vec();

        FeatureOutcome {
            verdict,
            coverage,
            residual,
            matched_candidates: self.matched_candidates,
        }
    }
}

/// Outcome of reducing one ground-truth feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOutcome {
    pub verdict: Verdict,
    pub coverage: f64,
    /// Uncovered segments (the whole feature when missing, empty when matched)
    pub residual: Vec<Segment>,
    /// Indexes into the candidate list, in acceptance order
    pub matched_candidates: Vec<usize>,
}

// =============================================================================
// Entry Points
// =============================================================================

/// Reduce a ground-truth feature against pre-indexed candidates.
pub fn reduce_indexed(
    feature: &LineFeature,
    candidates: &[SegmentIndex],
    options: &MatchOptions,
) -> FeatureOutcome {
    let mut coverage = FeatureCoverage::new(feature);

    for (i, candidate) in candidates.iter().enumerate() {
        coverage.apply(i, candidate, options);
        if coverage.is_settled() {
            break;
        }
    }

    let outcome = coverage.finish(options);
    if outcome.coverage > 1.0 + options.err {
        warn!(
            "[Reducer] Invalid coverage {:.4} > {:.2} for feature {}",
            outcome.coverage,
            1.0 + options.err,
            feature.label()
        );
    }
    outcome
}

/// Reduce a ground-truth feature against candidate lines, in order.
///
/// Each candidate is indexed and tested against what is still uncovered.
/// Stops early once coverage is full or nothing is left.
///
/// # Arguments
///
/// * `feature` - Ground-truth line to reduce
/// * `candidates` - Candidate lines, tested in slice order
/// * `options` - Distance, angle and coverage tolerances
///
/// # Returns
///
/// A [`FeatureOutcome`] with the verdict, the final coverage, the uncovered
/// segments and the indices of the candidates that reduced the feature.
///
/// # Example
///
/// ```rust
/// use highway_compare::{reduce_feature, LineFeature, MatchOptions, Verdict};
///
/// let gt = LineFeature::from_coords(Some("gt"), &[(0.0, 0.0), (0.0, 1.0)]);
/// let same = gt.clone();
///
/// let outcome = reduce_feature(&gt, &[same], &MatchOptions::default());
/// assert_eq!(outcome.verdict, Verdict::Matched);
/// assert_eq!(outcome.matched_candidates, vec![0]);
/// ```
pub fn reduce_feature(
    feature: &LineFeature,
    candidates: &[LineFeature],
    options: &MatchOptions,
) -> FeatureOutcome {
    let indexes: Vec<SegmentIndex> = candidates
        .iter()
        .map(|c| SegmentIndex::from_lines(&c.geometry))
        .collect();
    reduce_indexed(feature, &indexes, options)
}

// =============================================================================
// Tests
// =============================================================================
