//! Error types for the comparison pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CompareError>;

/// Top-level error type.
///
/// Geometry problems inside the core never surface here: degenerate segments
/// are classified as non-overlapping instead. Errors are reserved for bad
/// configuration and for the sources and sinks around the core.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("invalid match options: {0}")]
    InvalidOptions(String),

    #[error("worker count must be a positive even integer, got {0}")]
    InvalidThreads(usize),

    #[error("zoom level {0} is outside the supported range [0, 22]")]
    InvalidZoom(u8),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("failed to serialize result: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no polygon found in boundary file {0}")]
    MissingBoundary(PathBuf),

    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("tile {tile} failed: {source}")]
    Tile {
        tile: String,
        #[source]
        source: Box<CompareError>,
    },
}

impl CompareError {
    /// Wrap an I/O error with the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Attach a tile identifier to an error raised while processing that tile.
    pub fn in_tile(self, tile: impl ToString) -> Self {
        Self::Tile { tile: tile.to_string(), source: Box::new(self) }
    }
}
