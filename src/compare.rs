//! # Tiled Comparison
//!
//! Covers the study area with tiles, reduces every tile independently and
//! merges the per-tile results on a single aggregator thread.
//!
//! ```text
//! tiles ──▶ worker pool (reduce_tile per tile) ──mpsc──▶ aggregator ──▶ ComparisonResult
//! ```
//!
//! A tile that fails (e.g. its ground truth cannot be read) is logged and
//! counted; sibling tiles are unaffected.

use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;

use geo::Polygon;
use log::{debug, info, warn};

use crate::io::{
    read_boundary, write_result, CandidateSource, GeoJsonCandidates, GeoJsonGroundTruth,
    GroundTruthSource,
};
use crate::tile::{reduce_tile, TileResult};
use crate::tiling::{tiles_covering, Tile};
use crate::{CompareError, MatchOptions, Result};

/// Highest supported zoom level.
pub const MAX_ZOOM: u8 = 22;

/// A finished tile on its way to the aggregator.
type TileMessage = (Tile, Result<TileResult>);

// =============================================================================
// Configuration
// =============================================================================

/// Configuration of a full comparison run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareConfig {
    /// Ground-truth GeoJSON file
    pub ground_truth: PathBuf,

    /// GeoJSON file holding the study-area polygon
    pub boundary: PathBuf,

    /// Candidate GeoJSON file
    pub candidates: PathBuf,

    /// Result file.
    /// Default: ./osmdiff.geojson
    pub output: PathBuf,

    /// Worker count, a positive even number.
    /// Default: 4
    pub threads: usize,

    /// Tile zoom level used to partition the study area.
    /// Default: 12
    pub zoom: u8,

    /// Matching tolerances.
    pub options: MatchOptions,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            ground_truth: PathBuf::new(),
            boundary: PathBuf::new(),
            candidates: PathBuf::new(),
            output: PathBuf::from("./osmdiff.geojson"),
            threads: 4,
            zoom: 12,
            options: MatchOptions::default(),
        }
    }
}

impl CompareConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 || self.threads % 2 != 0 {
            return Err(CompareError::InvalidThreads(self.threads));
        }
        if self.zoom > MAX_ZOOM {
            return Err(CompareError::InvalidZoom(self.zoom));
        }
        self.options.validate()
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Process-wide result of a comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonResult {
    /// Concatenated buckets of all successful tiles
    pub buckets: TileResult,
    pub tiles_processed: usize,
    pub tiles_failed: usize,
}

/// Collects tile results as they complete. Only one thread appends.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    result: ComparisonResult,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tile's buckets.
    pub fn merge(&mut self, tile: &Tile, result: TileResult) {
        debug!(
            "[Compare] Tile {}: {} ground truth, {} candidates, {} partial, {} missing, {} updates",
            tile,
            result.ground_truth.len(),
            result.candidates.len(),
            result.partial_missing.len(),
            result.missing.len(),
            result.updates.len()
        );
        self.result.buckets.extend(result);
        self.result.tiles_processed += 1;
    }

    /// Count a tile that produced no result.
    pub fn record_failure(&mut self, tile: &Tile, error: &CompareError) {
        warn!("[Compare] Tile {} failed: {}", tile, error);
        self.result.tiles_failed += 1;
    }

    pub fn finish(self) -> ComparisonResult {
        self.result
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Load and reduce a single tile.
pub fn process_tile(
    tile: &Tile,
    ground_truth: &dyn GroundTruthSource,
    candidates: &dyn CandidateSource,
    options: &MatchOptions,
) -> Result<TileResult> {
    let features = ground_truth.ground_truth(tile).map_err(|e| e.in_tile(tile))?;
    let tile_candidates = candidates.candidates(tile).map_err(|e| e.in_tile(tile))?;
    Ok(reduce_tile(&features, &tile_candidates, &tile.bounds(), options))
}

fn send(tx: &Sender<TileMessage>, tile: Tile, result: Result<TileResult>) {
    if tx.send((tile, result)).is_err() {
        warn!("[Compare] Aggregator stopped before tile {} was delivered", tile);
    }
}

#[cfg(feature = "parallel")]
fn dispatch(
    tiles: &[Tile],
    ground_truth: &dyn GroundTruthSource,
    candidates: &dyn CandidateSource,
    options: &MatchOptions,
    threads: usize,
    tx: Sender<TileMessage>,
) -> Result<()> {
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("tile-worker-{i}"))
        .build()
        .map_err(|e| CompareError::WorkerPool(e.to_string()))?;

    pool.install(|| {
        tiles.par_iter().for_each_with(tx, |tx, &tile| {
            let result = process_tile(&tile, ground_truth, candidates, options);
            send(tx, tile, result);
        });
    });
    Ok(())
}

#[cfg(not(feature = "parallel"))]
fn dispatch(
    tiles: &[Tile],
    ground_truth: &dyn GroundTruthSource,
    candidates: &dyn CandidateSource,
    options: &MatchOptions,
    _threads: usize,
    tx: Sender<TileMessage>,
) -> Result<()> {
    for &tile in tiles {
        let result = process_tile(&tile, ground_truth, candidates, options);
        send(&tx, tile, result);
    }
    Ok(())
}

/// Run a comparison over every tile covering `boundary`.
///
/// Configuration is validated before any tile is processed. Tile failures do
/// not fail the run; they are reported in [`ComparisonResult::tiles_failed`].
pub fn run_comparison(
    config: &CompareConfig,
    ground_truth: &dyn GroundTruthSource,
    candidates: &dyn CandidateSource,
    boundary: &Polygon<f64>,
) -> Result<ComparisonResult> {
    config.validate()?;

    let tiles = tiles_covering(boundary, config.zoom);
    info!(
        "[Compare] Processing {} tiles at zoom {} with {} workers",
        tiles.len(),
        config.zoom,
        config.threads
    );

    let (tx, rx) = mpsc::channel::<TileMessage>();
    let aggregator = thread::spawn(move || {
        let mut aggregator = ResultAggregator::new();
        for (tile, result) in rx {
            match result {
                Ok(result) => aggregator.merge(&tile, result),
                Err(error) => aggregator.record_failure(&tile, &error),
            }
        }
        aggregator.finish()
    });

    let dispatched = dispatch(&tiles, ground_truth, candidates, &config.options, config.threads, tx);
    let result = aggregator
        .join()
        .map_err(|_| CompareError::WorkerPool("aggregator thread panicked".to_string()))?;
    dispatched?;

    info!(
        "[Compare] Done: {} tiles processed, {} failed, {} partial, {} missing, {} updates",
        result.tiles_processed,
        result.tiles_failed,
        result.buckets.partial_missing.len(),
        result.buckets.missing.len(),
        result.buckets.updates.len()
    );
    Ok(result)
}

/// Compare the GeoJSON files named in `config` and write the result file.
pub fn compare_files(config: &CompareConfig) -> Result<ComparisonResult> {
    config.validate()?;

    // Fail before dispatch rather than once per tile
    std::fs::metadata(&config.ground_truth)
        .map_err(|e| CompareError::io(&config.ground_truth, e))?;

    let boundary = read_boundary(&config.boundary)?;
    let ground_truth = GeoJsonGroundTruth::new(&config.ground_truth);
    let candidates = GeoJsonCandidates::open(&config.candidates)?;

    let result = run_comparison(config, &ground_truth, &candidates, &boundary)?;
    write_result(&config.output, &result.buckets)?;
    Ok(result)
}
