//! Uniform tile grid for "everything near this circle" queries
//!
//! Entities are bucketed by their bounding circle. A footprint that fits a
//! single tile goes into that tile's `contained` bucket; a footprint that
//! spans several tiles goes into the `shared` bucket of each of them, and
//! queries deduplicate shared entries with a [`TrackerStamp`] stored on the
//! entity itself.
//!
//! The nominal rectangle is not a hard limit. Footprints that reach past it
//! are clamped onto the border tiles and the grid is flagged as bloated, so
//! an entity far outside the rectangle is still found, just less cheaply.

use itertools::iproduct;
use log::trace;

use crate::common::{NavError, NavResult, Point2D};
use crate::utils::{FastRemoveVec, Tracker, TrackerStamp};

/// Something the tile grid can store
pub trait TileEntity {
    /// Center and radius of the circle enclosing the entity
    fn bounding_circle(&self) -> (Point2D, f64);

    /// Stamp used for query-time deduplication
    fn tile_stamp(&self) -> &TrackerStamp;
}

#[derive(Debug, Clone)]
struct Tile<K> {
    contained: FastRemoveVec<K>,
    shared: FastRemoveVec<K>,
}

impl<K: PartialEq> Tile<K> {
    fn new() -> Self {
        Tile {
            contained: FastRemoveVec::new(),
            shared: FastRemoveVec::new(),
        }
    }
}

/// Inclusive tile index range covered by a circle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileRange {
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
    clamped: bool,
}

impl TileRange {
    fn is_single(&self) -> bool {
        self.x0 == self.x1 && self.y0 == self.y1
    }
}

/// Tile grid index keyed by `K`
#[derive(Debug)]
pub struct TileGrid<K> {
    tile_width: f64,
    min_x: f64,
    min_y: f64,
    x_width: usize,
    y_width: usize,
    tiles: Vec<Tile<K>>,
    bloated: bool,
    tracker: Tracker,
    len: usize,
}

impl<K: Copy + PartialEq> TileGrid<K> {
    /// Create a grid covering `[min_x, min_x + width] x [min_y, min_y + height]`
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64, tile_width: f64) -> NavResult<Self> {
        if !(tile_width > 0.0) || !tile_width.is_finite() {
            return Err(NavError::InvalidParameter(format!(
                "tile_width must be positive, got {}",
                tile_width
            )));
        }
        if !(width > 0.0) || !(height > 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(NavError::InvalidParameter(format!(
                "grid extent must be positive, got {} x {}",
                width, height
            )));
        }

        let x_width = ((width / tile_width).ceil() as usize).max(1);
        let y_width = ((height / tile_width).ceil() as usize).max(1);
        trace!("tile grid: {} x {} tiles of width {}", x_width, y_width, tile_width);

        Ok(TileGrid {
            tile_width,
            min_x,
            min_y,
            x_width,
            y_width,
            tiles: (0..x_width * y_width).map(|_| Tile::new()).collect(),
            bloated: false,
            tracker: Tracker::new(),
            len: 0,
        })
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once any entity has been stored past the nominal rectangle
    pub fn is_bloated(&self) -> bool {
        self.bloated
    }

    pub fn insert<E: TileEntity>(&mut self, key: K, entity: &E) {
        let (center, radius) = entity.bounding_circle();
        let range = self.calc_tile_range(center, radius);
        if range.clamped {
            self.bloated = true;
        }

        if range.is_single() {
            let index = self.calc_index(range.x0, range.y0);
            self.tiles[index].contained.push(key);
        } else {
            for (x, y) in iproduct!(range.x0..=range.x1, range.y0..=range.y1) {
                let index = self.calc_index(x, y);
                self.tiles[index].shared.push(key);
            }
        }
        self.len += 1;
    }

    /// Remove an entity using its current footprint.
    ///
    /// Returns false if it is not stored where that footprint says it
    /// should be, which means the footprint changed without a
    /// remove/insert cycle.
    pub fn remove<E: TileEntity>(&mut self, key: K, entity: &E) -> bool {
        let (center, radius) = entity.bounding_circle();
        let range = self.calc_tile_range(center, radius);

        let found = if range.is_single() {
            let index = self.calc_index(range.x0, range.y0);
            self.tiles[index].contained.remove(&key)
        } else {
            let mut all = true;
            for (x, y) in iproduct!(range.x0..=range.x1, range.y0..=range.y1) {
                let index = self.calc_index(x, y);
                all &= self.tiles[index].shared.remove(&key);
            }
            all
        };

        if found {
            self.len -= 1;
        }
        found
    }

    /// All entities whose bounding circle intersects the query circle
    pub fn query_within_radius<'a, E, F>(&mut self, center: Point2D, radius: f64, lookup: F) -> Vec<K>
    where
        E: TileEntity + 'a,
        F: Fn(K) -> Option<&'a E>,
    {
        self.tracker.advance();
        let range = self.calc_tile_range(center, radius);
        let mut found = Vec::new();

        for (x, y) in iproduct!(range.x0..=range.x1, range.y0..=range.y1) {
            let tile = &self.tiles[self.calc_index(x, y)];

            for &key in &tile.contained {
                if let Some(entity) = lookup(key) {
                    if Self::circles_overlap(entity, center, radius) {
                        found.push(key);
                    }
                }
            }

            for &key in &tile.shared {
                if let Some(entity) = lookup(key) {
                    if entity.tile_stamp().mark(&self.tracker)
                        && Self::circles_overlap(entity, center, radius)
                    {
                        found.push(key);
                    }
                }
            }
        }
        found
    }

    fn circles_overlap<E: TileEntity>(entity: &E, center: Point2D, radius: f64) -> bool {
        let (entity_center, entity_radius) = entity.bounding_circle();
        let reach = radius + entity_radius;
        entity_center.distance_sq(&center) <= reach * reach
    }

    fn calc_index(&self, x: usize, y: usize) -> usize {
        y * self.x_width + x
    }

    /// Tile index along one axis, clamped to the grid; second value is true
    /// when clamping was needed
    fn calc_axis_index(position: f64, min: f64, tile_width: f64, count: usize) -> (usize, bool) {
        let raw = ((position - min) / tile_width).floor();
        if raw < 0.0 {
            (0, true)
        } else if raw >= count as f64 {
            (count - 1, true)
        } else {
            (raw as usize, false)
        }
    }

    fn calc_tile_range(&self, center: Point2D, radius: f64) -> TileRange {
        let (x0, cx0) = Self::calc_axis_index(center.x - radius, self.min_x, self.tile_width, self.x_width);
        let (x1, cx1) = Self::calc_axis_index(center.x + radius, self.min_x, self.tile_width, self.x_width);
        let (y0, cy0) = Self::calc_axis_index(center.y - radius, self.min_y, self.tile_width, self.y_width);
        let (y1, cy1) = Self::calc_axis_index(center.y + radius, self.min_y, self.tile_width, self.y_width);
        TileRange {
            x0,
            x1,
            y0,
            y1,
            clamped: cx0 || cx1 || cy0 || cy1,
        }
    }
}
