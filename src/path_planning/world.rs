//! Obstacle world with incremental visibility graph and path queries
//!
//! [`PathWorld`] ties the obstacle graph to a reusable [`PathFinder`]. It
//! is single-writer: mutations and queries all take `&mut self`, so a host
//! sharing a world between threads must wrap it in its own lock.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::common::{NavError, NavResult, Path2D, PathPlanner, Point2D};
use crate::geometry::Polygon;
use crate::spatial::TileGrid;

use super::graph::ObstacleGraph;
use super::node::{ObstacleVertexNode, VertexRef};
use super::obstacle::{Obstacle, ObstacleId};
use super::path_finder::{PathData, PathError, PathFinder, PathStatus};

/// Configuration for [`PathWorld`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathWorldConfig {
    /// Side length of one tile of the spatial index
    pub tile_width: f64,
    /// Lower-left corner of the nominal grid rectangle
    pub grid_min_x: f64,
    pub grid_min_y: f64,
    /// Size of the nominal grid rectangle; obstacles outside it still work
    pub grid_width: f64,
    pub grid_height: f64,
    /// Longest permanent edge between two obstacle vertices
    pub max_connection_distance: f64,
    /// Inward margin between outer and inner polygons
    pub inner_buffer: f64,
    /// Hookup distance used by [`PathPlanner::plan`]
    pub default_hookup_distance: f64,
    /// Search budget used by [`PathPlanner::plan`]
    pub default_search_distance: f64,
}

impl Default for PathWorldConfig {
    fn default() -> Self {
        Self {
            tile_width: 50.0,
            grid_min_x: 0.0,
            grid_min_y: 0.0,
            grid_width: 1000.0,
            grid_height: 1000.0,
            max_connection_distance: 250.0,
            inner_buffer: 0.01,
            default_hookup_distance: 250.0,
            default_search_distance: 10_000.0,
        }
    }
}

impl PathWorldConfig {
    pub fn with_grid(mut self, min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        self.grid_min_x = min_x;
        self.grid_min_y = min_y;
        self.grid_width = width;
        self.grid_height = height;
        self
    }

    pub fn with_tile_width(mut self, tile_width: f64) -> Self {
        self.tile_width = tile_width;
        self
    }

    pub fn with_max_connection_distance(mut self, distance: f64) -> Self {
        self.max_connection_distance = distance;
        self
    }

    pub fn with_inner_buffer(mut self, buffer: f64) -> Self {
        self.inner_buffer = buffer;
        self
    }

    pub fn with_default_distances(mut self, hookup: f64, search: f64) -> Self {
        self.default_hookup_distance = hookup;
        self.default_search_distance = search;
        self
    }

    pub fn validate(&self) -> NavResult<()> {
        let positive = [
            ("tile_width", self.tile_width),
            ("grid_width", self.grid_width),
            ("grid_height", self.grid_height),
            ("max_connection_distance", self.max_connection_distance),
            ("default_hookup_distance", self.default_hookup_distance),
            ("default_search_distance", self.default_search_distance),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(NavError::InvalidParameter(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if !(self.inner_buffer >= 0.0) || !self.inner_buffer.is_finite() {
            return Err(NavError::InvalidParameter(format!(
                "inner_buffer must be >= 0, got {}",
                self.inner_buffer
            )));
        }
        if !self.grid_min_x.is_finite() || !self.grid_min_y.is_finite() {
            return Err(NavError::InvalidParameter("grid origin must be finite".to_string()));
        }
        Ok(())
    }
}

/// Polygon obstacles plus the machinery to route around them
#[derive(Debug)]
pub struct PathWorld {
    config: PathWorldConfig,
    graph: ObstacleGraph,
    finder: PathFinder,
}

impl PathWorld {
    pub fn new(config: PathWorldConfig) -> NavResult<Self> {
        config.validate()?;
        let grid = TileGrid::new(
            config.grid_min_x,
            config.grid_min_y,
            config.grid_width,
            config.grid_height,
            config.tile_width,
        )?;
        let graph = ObstacleGraph::new(grid, config.max_connection_distance, config.inner_buffer)?;
        debug!(
            "path world: tile width {}, connection distance {}",
            config.tile_width, config.max_connection_distance
        );
        Ok(PathWorld {
            config,
            graph,
            finder: PathFinder::new(),
        })
    }

    pub fn with_defaults() -> NavResult<Self> {
        Self::new(PathWorldConfig::default())
    }

    pub fn config(&self) -> &PathWorldConfig {
        &self.config
    }

    pub fn insert_obstacle(&mut self, outer: Polygon) -> NavResult<ObstacleId> {
        self.graph.insert_obstacle(outer)
    }

    /// Remove an obstacle, returning it
    pub fn remove_obstacle(&mut self, id: ObstacleId) -> NavResult<Obstacle> {
        self.graph.remove_obstacle(id)
    }

    pub fn reshape_obstacle(&mut self, id: ObstacleId, outer: Polygon) -> NavResult<()> {
        self.graph.reshape_obstacle(id, outer)
    }

    pub fn translate_obstacle(&mut self, id: ObstacleId, dx: f64, dy: f64) -> NavResult<()> {
        self.graph.translate_obstacle(id, dx, dy)
    }

    /// Scale about the obstacle's own center
    pub fn scale_obstacle(&mut self, id: ObstacleId, factor: f64) -> NavResult<()> {
        self.graph.scale_obstacle(id, factor)
    }

    /// Rotate about the obstacle's own center, angle in radians
    pub fn rotate_obstacle(&mut self, id: ObstacleId, angle: f64) -> NavResult<()> {
        self.graph.rotate_obstacle(id, angle)
    }

    /// Find a path from `start` to `end`.
    ///
    /// `max_hookup_distance` caps how far the endpoints may reach into the
    /// graph and `max_search_distance` caps the total path length
    /// considered.
    pub fn query_path(
        &mut self,
        start: Point2D,
        end: Point2D,
        max_hookup_distance: f64,
        max_search_distance: f64,
    ) -> Result<PathData, PathError> {
        self.finder
            .calc(&mut self.graph, start, end, max_hookup_distance, max_search_distance)
    }

    /// Outcome of the last query, [`PathStatus::NoResult`] before the first
    pub fn last_status(&self) -> PathStatus {
        self.finder.last_status()
    }

    pub fn obstacles_near(&mut self, center: Point2D, radius: f64) -> Vec<ObstacleId> {
        self.graph.obstacles_near(center, radius)
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.graph.obstacle(id)
    }

    pub fn obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.graph.arena().iter()
    }

    pub fn obstacle_count(&self) -> usize {
        self.graph.len()
    }

    pub fn node(&self, vertex: VertexRef) -> Option<&ObstacleVertexNode> {
        self.graph.node(vertex)
    }

    pub fn permanent_edges(&self, vertex: VertexRef) -> &[VertexRef] {
        self.graph.node(vertex).map(|n| n.permanent_edges()).unwrap_or(&[])
    }

    /// Sorted list of all permanent edges, each once
    pub fn edge_pairs(&self) -> Vec<(VertexRef, VertexRef)> {
        self.graph.edge_pairs()
    }

    pub fn edges_symmetric(&self) -> bool {
        self.graph.edges_symmetric()
    }

    pub fn segment_blocked(&mut self, a: Point2D, b: Point2D) -> bool {
        self.graph.segment_blocked(a, b)
    }
}

impl PathPlanner for PathWorld {
    fn plan(&mut self, start: Point2D, goal: Point2D) -> Result<Path2D, NavError> {
        let (hookup, search) = (self.config.default_hookup_distance, self.config.default_search_distance);
        let path = self.query_path(start, goal, hookup, search)?;
        Ok(path.to_path2d())
    }
}
