//! # Tile Scheme
//!
//! XYZ ("slippy map") tiles used to partition a study area into independent
//! units of work.
//!
//! | Zoom | Tile width at the equator |
//! |------|---------------------------|
//! | 10   | ~39 km                    |
//! | 12   | ~9.8 km                   |
//! | 14   | ~2.4 km                   |
//!
//! Tiles are addressed by `(x, y, z)` with `y` growing southwards.

use std::f64::consts::PI;
use std::fmt;

use geo::{BoundingRect, Intersects, Polygon};

use crate::Bounds;

/// Highest latitude representable in Web Mercator.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A tile in the XYZ scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl Tile {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Number of tiles along one axis at this zoom.
    fn count(z: u8) -> f64 {
        2f64.powi(i32::from(z))
    }

    /// Geographic extent of the tile.
    pub fn bounds(&self) -> Bounds {
        let n = Self::count(self.z);
        let lng = |x: f64| x / n * 360.0 - 180.0;
        let lat = |y: f64| (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();

        let (x, y) = (f64::from(self.x), f64::from(self.y));
        Bounds::new(lng(x), lat(y + 1.0), lng(x + 1.0), lat(y))
    }

    /// The tile containing a point. Latitudes are clamped to the Mercator range.
    pub fn containing(lng: f64, lat: f64, z: u8) -> Self {
        let n = Self::count(z);
        let max_index = n - 1.0;

        let x = ((lng + 180.0) / 360.0 * n).floor().clamp(0.0, max_index);

        let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n)
            .floor()
            .clamp(0.0, max_index);

        Self::new(x as u32, y as u32, z)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// All tiles at zoom `z` that intersect `polygon`, in row-major order.
///
/// # Example
///
/// ```rust
/// use geo::polygon;
/// use highway_compare::tiles_covering;
///
/// let area = polygon![
///     (x: 0.01, y: 0.01), (x: 0.02, y: 0.01), (x: 0.02, y: 0.02), (x: 0.01, y: 0.02),
/// ];
/// let tiles = tiles_covering(&area, 12);
/// assert_eq!(tiles.len(), 1);
/// assert_eq!(tiles[0].to_string(), "12/2048/2047");
/// ```
pub fn tiles_covering(polygon: &Polygon<f64>, z: u8) -> Vec<Tile> {
    let Some(rect) = polygon.bounding_rect() else {
        return Vec::new();
    };

    let top_left = Tile::containing(rect.min().x, rect.max().y, z);
    let bottom_right = Tile::containing(rect.max().x, rect.min().y, z);

    let mut tiles = Vec::new();
    for y in top_left.y..=bottom_right.y {
        for x in top_left.x..=bottom_right.x {
            let tile = Tile::new(x, y, z);
            if polygon.intersects(&tile.bounds().to_rect()) {
                tiles.push(tile);
            }
        }
    }
    tiles
}
