//! # GeoJSON Sources and Output
//!
//! Reading ground-truth and candidate line collections, reading the study-area
//! boundary, and writing the five result collections.
//!
//! ## Output Document
//!
//! ```json
//! {
//!   "groundtruth":    { "type": "FeatureCollection", "features": [...] },
//!   "osm":            { "type": "FeatureCollection", "features": [...] },
//!   "partialMissing": { "type": "FeatureCollection", "features": [...] },
//!   "missing":        { "type": "FeatureCollection", "features": [...] },
//!   "update":         { "type": "FeatureCollection", "features": [...] }
//! }
//! ```
//!
//! Update features carry no geometry: only the candidate id and the changed
//! fields.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use geo::{Coord, LineString, MultiLineString, Polygon};
use geojson::{feature, Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use log::{debug, info};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::AttributeUpdate;
use crate::tile::{clip_to_bounds, TileResult};
use crate::tiling::Tile;
use crate::{Bounds, CompareError, FeatureId, LineFeature, Result};

// =============================================================================
// Reading
// =============================================================================

/// Parse line features from a GeoJSON document.
///
/// Accepts a FeatureCollection, a single Feature or a bare geometry. Only
/// LineString and MultiLineString geometries are kept.
pub fn parse_features(text: &str) -> Result<Vec<LineFeature>> {
    let geojson: GeoJson = text.parse()?;

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
    };

    let total = features.len();
    let lines: Vec<LineFeature> = features.into_iter().filter_map(to_line_feature).collect();
    if lines.len() < total {
        debug!("[IO] Skipped {} non-line features", total - lines.len());
    }
    Ok(lines)
}

/// Load line features from a GeoJSON file.
pub fn read_features(path: impl AsRef<Path>) -> Result<Vec<LineFeature>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| CompareError::io(path, e))?;
    parse_features(&text)
}

/// Load the study-area polygon from a GeoJSON file.
///
/// The first Polygon found wins; for a MultiPolygon its first polygon is used.
pub fn read_boundary(path: impl AsRef<Path>) -> Result<Polygon<f64>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| CompareError::io(path, e))?;

    let geometries: Vec<Geometry> = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => {
            collection.features.into_iter().filter_map(|f| f.geometry).collect()
        }
        GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
        GeoJson::Geometry(geometry) => vec![geometry],
    };

    geometries
        .into_iter()
        .find_map(|geometry| match geometry.value {
            geojson::Value::Polygon(rings) => to_polygon(&rings),
            geojson::Value::MultiPolygon(polygons) => {
                polygons.first().and_then(|rings| to_polygon(rings))
            }
            _ => None,
        })
        .ok_or_else(|| CompareError::MissingBoundary(path.to_path_buf()))
}

fn to_line_feature(feature: Feature) -> Option<LineFeature> {
    let geometry = match feature.geometry?.value {
        geojson::Value::LineString(line) => MultiLineString::new(vec![to_line_string(&line)]),
        geojson::Value::MultiLineString(lines) => {
            MultiLineString::new(lines.iter().map(|l| to_line_string(l)).collect())
        }
        _ => return None,
    };

    let properties = feature.properties.unwrap_or_default();
    let id = match feature.id {
        Some(feature::Id::String(s)) => Some(FeatureId::from(s)),
        Some(feature::Id::Number(n)) => Some(FeatureId::from(n)),
        None => properties.get("id").and_then(|v| match v {
            Value::String(s) => Some(FeatureId::from(s.as_str())),
            Value::Number(n) => Some(FeatureId::from(n.clone())),
            _ => None,
        }),
    };

    Some(LineFeature { id, geometry, properties })
}

/// Positions with fewer than two ordinates are dropped.
fn to_line_string(positions: &[Vec<f64>]) -> LineString<f64> {
    positions
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| Coord { x: p[0], y: p[1] })
        .collect()
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    Some(Polygon::new(
        to_line_string(exterior),
        interiors.iter().map(|r| to_line_string(r)).collect(),
    ))
}

// =============================================================================
// Sources
// =============================================================================

/// Provides the ground-truth features for one tile.
pub trait GroundTruthSource: Send + Sync {
    fn ground_truth(&self, tile: &Tile) -> Result<Vec<LineFeature>>;
}

/// Provides the candidate features scoped to one tile.
pub trait CandidateSource: Send + Sync {
    fn candidates(&self, tile: &Tile) -> Result<Vec<LineFeature>>;
}

/// Ground truth backed by a GeoJSON file, read again for every tile.
#[derive(Debug, Clone)]
pub struct GeoJsonGroundTruth {
    path: PathBuf,
}

impl GeoJsonGroundTruth {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GroundTruthSource for GeoJsonGroundTruth {
    fn ground_truth(&self, _tile: &Tile) -> Result<Vec<LineFeature>> {
        read_features(&self.path)
    }
}

/// Feature extent stored in the candidate R-tree.
#[derive(Debug, Clone, Copy)]
struct FeatureExtent {
    idx: usize,
    bounds: Bounds,
}

impl RTreeObject for FeatureExtent {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bounds.envelope()
    }
}

/// In-memory candidate collection loaded from GeoJSON.
///
/// Each query returns the features whose extent intersects the tile, clipped
/// to it, in file order.
#[derive(Debug)]
pub struct GeoJsonCandidates {
    features: Vec<LineFeature>,
    tree: RTree<FeatureExtent>,
}

impl GeoJsonCandidates {
    pub fn from_features(features: Vec<LineFeature>) -> Self {
        let extents: Vec<FeatureExtent> = features
            .iter()
            .enumerate()
            .filter_map(|(idx, f)| f.rect().map(|rect| FeatureExtent { idx, bounds: rect.into() }))
            .collect();

        Self { features, tree: RTree::bulk_load(extents) }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let features = read_features(path)?;
        info!("[IO] Loaded {} candidate features from {}", features.len(), path.display());
        Ok(Self::from_features(features))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl CandidateSource for GeoJsonCandidates {
    fn candidates(&self, tile: &Tile) -> Result<Vec<LineFeature>> {
        let bounds = tile.bounds();

        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&bounds.envelope())
            .map(|extent| extent.idx)
            .collect();
        hits.sort_unstable();

        Ok(hits
            .into_iter()
            .filter_map(|idx| clip_to_bounds(&self.features[idx], &bounds))
            .collect())
    }
}

// =============================================================================
// Writing
// =============================================================================

/// The serialized comparison result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDocument {
    pub groundtruth: FeatureCollection,
    pub osm: FeatureCollection,
    #[serde(rename = "partialMissing")]
    pub partial_missing: FeatureCollection,
    pub missing: FeatureCollection,
    pub update: FeatureCollection,
}

impl OutputDocument {
    pub fn from_result(result: &TileResult) -> Self {
        Self {
            groundtruth: collection(result.ground_truth.iter().map(to_geojson_feature)),
            osm: collection(result.candidates.iter().map(to_geojson_feature)),
            partial_missing: collection(result.partial_missing.iter().map(to_geojson_feature)),
            missing: collection(result.missing.iter().map(to_geojson_feature)),
            update: collection(result.updates.iter().map(update_feature)),
        }
    }
}

/// Write the five result collections to `path` as one JSON document.
pub fn write_result(path: impl AsRef<Path>, result: &TileResult) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| CompareError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, &OutputDocument::from_result(result))?;
    writer.flush().map_err(|e| CompareError::io(path, e))?;

    info!("[IO] Wrote result to {}", path.display());
    Ok(())
}

fn collection(features: impl Iterator<Item = Feature>) -> FeatureCollection {
    FeatureCollection { bbox: None, features: features.collect(), foreign_members: None }
}

fn to_geojson_feature(line: &LineFeature) -> Feature {
    let positions = |ls: &LineString<f64>| -> Vec<Vec<f64>> {
        ls.coords().map(|c| vec![c.x, c.y]).collect()
    };

    let value = match line.geometry.0.as_slice() {
        [single] => geojson::Value::LineString(positions(single)),
        parts => geojson::Value::MultiLineString(parts.iter().map(positions).collect()),
    };

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: line.id.as_ref().map(geojson_id),
        properties: Some(line.properties.clone()),
        foreign_members: None,
    }
}

/// Numeric ids go back out as numbers.
fn geojson_id(id: &FeatureId) -> feature::Id {
    match id.as_number() {
        Some(n) => feature::Id::Number(n.clone()),
        None => feature::Id::String(id.to_string()),
    }
}

fn update_feature(update: &AttributeUpdate) -> Feature {
    let properties: JsonObject = update.fields.clone();
    Feature {
        bbox: None,
        geometry: None,
        id: update.id.as_ref().map(geojson_id),
        properties: Some(properties),
        foreign_members: None,
    }
}
