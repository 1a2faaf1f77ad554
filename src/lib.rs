//! # Highway Compare
//!
//! Road network coverage comparison between an authoritative "ground truth" line
//! dataset and a candidate line dataset (typically OpenStreetMap highways).
//!
//! This library provides:
//! - Segment-level overlap classification within a distance and angle tolerance
//! - Per-feature coverage accumulation with residual (uncovered) geometry
//! - Tile-local reduction into matched / partially missing / missing buckets
//! - Attribute update proposals for fully matched candidate lines
//! - Tiled parallel dispatch over a study area
//!
//! ## Features
//!
//! - **`parallel`** - Dispatch tiles onto a rayon worker pool
//! - **`cli`** - Build the `highway-compare` command line tool
//!
//! ## Quick Start
//!
//! ```rust
//! use highway_compare::{reduce_feature, LineFeature, MatchOptions, Verdict};
//!
//! let ground_truth = LineFeature::from_coords(Some("gt-1"), &[(0.0, 0.0), (0.0, 2.0)]);
//! let candidate = LineFeature::from_coords(Some("osm-1"), &[(0.0, 0.0), (0.0, 1.0)]);
//!
//! let outcome = reduce_feature(&ground_truth, &[candidate], &MatchOptions::default());
//! assert_eq!(outcome.verdict, Verdict::PartialMissing);
//! assert!((outcome.coverage - 0.5).abs() < 1e-6);
//! ```

use std::fmt;
use std::ops::Deref;

use geo::{BoundingRect, Coord, Line, LineString, MultiLineString, Rect};
use rstar::AABB;
use serde_json::{Map, Number, Value};

// Unified error handling
pub mod error;
pub use error::{CompareError, Result};

// Geometry primitives (segments, bearings, projections, buffers)
pub mod geo_utils;

// R-tree over line segments
pub mod index;
pub use index::SegmentIndex;

// Ordered segment overlap classifier
pub mod classifier;
pub use classifier::{classify_segments, segments_overlap, OverlapCase};

// Per-feature coverage accumulation
pub mod reducer;
pub use reducer::{
    compare_lines, reduce_feature, CoverageState, FeatureCoverage, FeatureOutcome,
    LineComparison, Verdict,
};

// Attribute reconciliation for matched features
pub mod attributes;
pub use attributes::{propose_update, AttributeUpdate};

// Tile-local reduction
pub mod tile;
pub use tile::{clip_to_bounds, is_highway, reduce_tile, TileResult, HIGHWAY_CLASSES};

// Slippy-map tile scheme
pub mod tiling;
pub use tiling::{tiles_covering, Tile};

// GeoJSON sources and result writer
pub mod io;
pub use io::{CandidateSource, GeoJsonCandidates, GeoJsonGroundTruth, GroundTruthSource};

// Tiled dispatch and aggregation
pub mod compare;
pub use compare::{
    compare_files, run_comparison, CompareConfig, ComparisonResult, ResultAggregator,
};

// ============================================================================
// Core Types
// ============================================================================

/// The atomic unit of comparison: exactly two coordinates (start, end).
pub type Segment = Line<f64>;

/// Feature identifier as read from the input.
///
/// Dereferences to its text form. A numeric id remembers its number so that it
/// is written back as a number.
///
/// # Example
/// ```
/// use highway_compare::FeatureId;
///
/// let id = FeatureId::from(serde_json::Number::from(123456));
/// assert_eq!(&*id, "123456");
/// assert!(id.as_number().is_some());
/// assert!(FeatureId::from("way/1").as_number().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureId {
    text: String,
    number: Option<Number>,
}

impl FeatureId {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The numeric value, when the id was a JSON number.
    pub fn as_number(&self) -> Option<&Number> {
        self.number.as_ref()
    }
}

impl Deref for FeatureId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<String> for FeatureId {
    fn from(text: String) -> Self {
        Self { text, number: None }
    }
}

impl From<&str> for FeatureId {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

impl From<Number> for FeatureId {
    fn from(number: Number) -> Self {
        Self { text: number.to_string(), number: Some(number) }
    }
}

/// A line feature with its attributes.
///
/// Ground-truth and candidate lines share this shape. The geometry is kept as a
/// multi-line so that tile clipping and residual reduction can split a feature
/// into disjoint parts without losing its identity.
///
/// # Example
/// ```
/// use highway_compare::LineFeature;
///
/// let road = LineFeature::from_coords(Some("way/1"), &[(8.54, 47.37), (8.55, 47.38)])
///     .with_property("highway", "residential")
///     .with_property("name", "Bahnhofstrasse");
///
/// assert_eq!(road.property_str("name"), Some("Bahnhofstrasse"));
/// assert_eq!(road.segments().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    /// External identifier (GeoJSON feature id or `id` property)
    pub id: Option<FeatureId>,
    /// Line geometry in WGS84 (x = longitude, y = latitude)
    pub geometry: MultiLineString<f64>,
    /// Attribute mapping (classification, name, ref, ...)
    pub properties: Map<String, Value>,
}

impl LineFeature {
    /// Create a feature with no attributes.
    pub fn new(id: Option<FeatureId>, geometry: MultiLineString<f64>) -> Self {
        Self { id, geometry, properties: Map::new() }
    }

    /// Create a single-part feature from `(longitude, latitude)` pairs.
    pub fn from_coords(id: Option<&str>, coords: &[(f64, f64)]) -> Self {
        let line: LineString<f64> = coords.iter().map(|&(x, y)| Coord { x, y }).collect();
        Self::new(id.map(FeatureId::from), MultiLineString::new(vec![line]))
    }

    /// Create a feature made of the given segments, one part per segment.
    pub fn from_segments(id: Option<FeatureId>, segments: &[Segment]) -> Self {
        let parts = segments
            .iter()
            .map(|s| LineString::new(vec![s.start, s.end]))
            .collect();
        Self::new(id, MultiLineString::new(parts))
    }

    /// Builder-style attribute setter.
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Get a string attribute, if present and a string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Decompose the geometry into consecutive-vertex segments.
    pub fn segments(&self) -> Vec<Segment> {
        geo_utils::segmentize(&self.geometry)
    }

    /// Bounding box of the geometry, `None` when it has no coordinates.
    pub fn bounds(&self) -> Option<Bounds> {
        geo_utils::bounding_box(&self.geometry)
    }

    /// Great-circle length of the geometry in kilometers.
    pub fn length_km(&self) -> f64 {
        geo_utils::segments_length_km(&self.segments())
    }

    /// True when the geometry carries no coordinates at all.
    pub fn is_empty(&self) -> bool {
        self.geometry.0.iter().all(|line| line.0.is_empty())
    }

    /// Bounding rectangle of the geometry.
    pub(crate) fn rect(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    /// Human-readable label for logging.
    pub(crate) fn label(&self) -> &str {
        self.id.as_ref().map_or("<no id>", FeatureId::as_str)
    }
}

/// Axis-aligned bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from `(min_lng, min_lat, max_lng, max_lat)`.
    pub fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Self {
        Self { min_lat, max_lat, min_lng, max_lng }
    }

    /// Create bounds from coordinates.
    pub fn from_coords(coords: &[Coord]) -> Option<Self> {
        if coords.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for c in coords {
            min_lat = min_lat.min(c.y);
            max_lat = max_lat.max(c.y);
            min_lng = min_lng.min(c.x);
            max_lng = max_lng.max(c.x);
        }

        Some(Self { min_lat, max_lat, min_lng, max_lng })
    }

    /// Create bounds from a `geo` rectangle.
    pub fn from_rect(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }

    /// Convert to a `geo` rectangle.
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord { x: self.min_lng, y: self.min_lat },
            Coord { x: self.max_lng, y: self.max_lat },
        )
    }

    /// R-tree envelope for range queries.
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_lng, self.min_lat], [self.max_lng, self.max_lat])
    }

    /// Check if two boxes intersect (touching edges count).
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(self.max_lat < other.min_lat
            || other.max_lat < self.min_lat
            || self.max_lng < other.min_lng
            || other.max_lng < self.min_lng)
    }

    /// Check if `other` lies entirely inside this box.
    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lng >= self.min_lng
            && other.max_lng <= self.max_lng
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self::from_rect(rect)
    }
}

/// Tolerances for deciding whether two lines represent the same road.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Maximum distance between matched segments, in kilometers.
    /// Default: 0.010 (10 meters)
    pub tolerance_km: f64,

    /// Maximum bearing difference between matched segments, in degrees.
    /// Line direction is ignored, so the effective range is [0, 90].
    /// Default: 15.0
    pub max_angle_deg: f64,

    /// Error margin around full coverage. A feature whose coverage falls in
    /// `(1 - err, 1 + err]` counts as fully matched.
    /// Default: 0.1
    pub err: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            tolerance_km: 0.010,
            max_angle_deg: 15.0,
            err: 0.1,
        }
    }
}

impl MatchOptions {
    /// Reject non-finite, negative or out-of-range tolerances.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_km.is_finite() || self.tolerance_km < 0.0 {
            return Err(CompareError::InvalidOptions(format!(
                "tolerance must be a non-negative number of kilometers, got {}",
                self.tolerance_km
            )));
        }
        if !self.max_angle_deg.is_finite() || !(0.0..=180.0).contains(&self.max_angle_deg) {
            return Err(CompareError::InvalidOptions(format!(
                "angle must be within [0, 180] degrees, got {}",
                self.max_angle_deg
            )));
        }
        if !self.err.is_finite() || !(0.0..1.0).contains(&self.err) {
            return Err(CompareError::InvalidOptions(format!(
                "err must be within [0, 1), got {}",
                self.err
            )));
        }
        Ok(())
    }

    /// True when `coverage` counts as full coverage under this error margin.
    #[inline]
    pub fn is_full_coverage(&self, coverage: f64) -> bool {
        coverage > 1.0 - self.err && coverage <= 1.0 + self.err
    }
}

// ============================================================================
// Tests
// ============================================================================
