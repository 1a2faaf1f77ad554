//! # Tile Reduction
//!
//! Reduces the ground truth of one tile against the candidates of the same
//! tile and sorts every ground-truth feature into an output bucket.
//!
//! | Bucket | Content |
//! |--------|---------|
//! | `ground_truth` | Every ground-truth feature with a non-empty clip |
//! | `candidates` | Candidates whose `highway` class is accepted |
//! | `partial_missing` | Residual segments of partially covered features, tagged with `coverage` |
//! | `missing` | Uncovered features, tagged with `coverage = 0` |
//! | `updates` | Attribute proposals for candidates matching a feature |

use geo::{BooleanOps, LineString, MultiLineString};
use log::debug;
use serde_json::Value;

use crate::attributes::{propose_update, AttributeUpdate};
use crate::index::SegmentIndex;
use crate::reducer::{reduce_indexed, Verdict};
use crate::{Bounds, LineFeature, MatchOptions};

/// Attribute holding the road classification.
pub const HIGHWAY_KEY: &str = "highway";

/// Attribute added to partially missing and missing features.
pub const COVERAGE_KEY: &str = "coverage";

/// Accepted `highway` classes. Anything else is not a road for comparison.
pub const HIGHWAY_CLASSES: &[&str] = &[
    "bridleway",
    "cycleway",
    "footway",
    "living_street",
    "motorway",
    "motorway_link",
    "path",
    "primary",
    "primary_link",
    "residential",
    "road",
    "secondary",
    "secondary_link",
    "service",
    "sidewalk",
    "steps",
    "tertiary",
    "tertiary_link",
    "track",
    "trunk",
    "trunk_link",
    "unclassified",
];

/// Output buckets of one tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileResult {
    pub ground_truth: Vec<LineFeature>,
    pub candidates: Vec<LineFeature>,
    pub partial_missing: Vec<LineFeature>,
    pub missing: Vec<LineFeature>,
    pub updates: Vec<AttributeUpdate>,
}

impl TileResult {
    /// Append another result's buckets to this one.
    pub fn extend(&mut self, other: TileResult) {
        self.ground_truth.extend(other.ground_truth);
        self.candidates.extend(other.candidates);
        self.partial_missing.extend(other.partial_missing);
        self.missing.extend(other.missing);
        self.updates.extend(other.updates);
    }

    pub fn is_empty(&self) -> bool {
        self.ground_truth.is_empty()
            && self.candidates.is_empty()
            && self.partial_missing.is_empty()
            && self.missing.is_empty()
            && self.updates.is_empty()
    }
}

/// True iff the feature's `highway` attribute is one of [`HIGHWAY_CLASSES`].
pub fn is_highway(feature: &LineFeature) -> bool {
    feature
        .property_str(HIGHWAY_KEY)
        .is_some_and(|class| HIGHWAY_CLASSES.contains(&class))
}

/// Clip a feature to a tile box.
///
/// Returns `None` when nothing of the feature lies inside the box.
///
/// # Example
///
/// ```rust
/// use highway_compare::{clip_to_bounds, Bounds, LineFeature};
///
/// let road = LineFeature::from_coords(Some("r"), &[(0.0, 0.0), (0.0, 2.0)]);
/// let tile = Bounds::new(-1.0, 0.5, 1.0, 1.0);
///
/// let clipped = clip_to_bounds(&road, &tile).unwrap();
/// let bounds = clipped.bounds().unwrap();
/// assert!((bounds.min_lat - 0.5).abs() < 1e-9);
/// assert!((bounds.max_lat - 1.0).abs() < 1e-9);
///
/// assert!(clip_to_bounds(&road, &Bounds::new(5.0, 5.0, 6.0, 6.0)).is_none());
/// ```
pub fn clip_to_bounds(feature: &LineFeature, bounds: &Bounds) -> Option<LineFeature> {
    let extent = feature.bounds()?;

    // Quick rejection
    if !bounds.intersects(&extent) {
        return None;
    }

    // Quick acceptance, the geometry is kept as is
    let parts: Vec<LineString<f64>> = if bounds.contains(&extent) {
        feature.geometry.0.iter().filter(|line| line.0.len() >= 2).cloned().collect()
    } else {
        let clipped: MultiLineString<f64> =
            bounds.to_rect().to_polygon().clip(&feature.geometry, false);
        clipped.0.into_iter().filter(|line| line.0.len() >= 2).collect()
    };

    // No segments left
    if parts.is_empty() {
        return None;
    }

    Some(LineFeature {
        id: feature.id.clone(),
        geometry: MultiLineString::new(parts),
        properties: feature.properties.clone(),
    })
}

/// Reduce the ground truth of one tile against the tile's candidates.
///
/// Ground-truth features are clipped to `bounds` first; empty clips are
/// skipped. Candidates are filtered by [`is_highway`] and are expected to be
/// scoped to the tile already.
///
/// `options` must have been validated by the caller.
pub fn reduce_tile(
    ground_truth: &[LineFeature],
    candidates: &[LineFeature],
    bounds: &Bounds,
    options: &MatchOptions,
) -> TileResult {
    let mut result = TileResult {
        candidates: candidates.iter().filter(|c| is_highway(c)).cloned().collect(),
        ..TileResult::default()
    };

    let indexes: Vec<SegmentIndex> = result
        .candidates
        .iter()
        .map(|c| SegmentIndex::from_lines(&c.geometry))
        .collect();

    for feature in ground_truth {
        let Some(clipped) = clip_to_bounds(feature, bounds) else {
            continue;
        };

        let outcome = reduce_indexed(&clipped, &indexes, options);

        match outcome.verdict {
            Verdict::Missing => {
                result
                    .missing
                    .push(clipped.clone().with_property(COVERAGE_KEY, outcome.coverage));
            }
            Verdict::Matched => {
                result.updates.extend(outcome.matched_candidates.iter().filter_map(|&i| {
                    propose_update(&clipped, &result.candidates[i], i)
                }));
            }
            Verdict::PartialMissing => {
                result.partial_missing.extend(outcome.residual.iter().map(|segment| {
                    let mut part = LineFeature::from_segments(clipped.id.clone(), &[*segment]);
                    part.properties = clipped.properties.clone();
                    part.properties.insert(COVERAGE_KEY.to_string(), Value::from(outcome.coverage));
                    part
                }));
            }
        }

        result.ground_truth.push(clipped);
    }

    debug!(
        "[Tiles] Reduced {} ground-truth features against {} candidates: {} partial, {} missing, {} updates",
        result.ground_truth.len(),
        result.candidates.len(),
        result.partial_missing.len(),
        result.missing.len(),
        result.updates.len()
    );

    result
}
