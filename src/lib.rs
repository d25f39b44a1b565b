//! PolyNav - incremental path planning among polygon obstacles
//!
//! This crate keeps a visibility graph over the convex vertices of a set of
//! polygon obstacles, repairs it locally as obstacles are inserted, moved or
//! removed, and answers point-to-point path queries with A* over that graph.

// Core modules
pub mod common;
pub mod utils;
pub mod geometry;
pub mod spatial;

// Algorithm modules
pub mod path_planning;

// Re-export common types for convenience
pub use common::{Point2D, Path2D, PathPlanner};
pub use common::{NavError, NavResult};
pub use geometry::Polygon;
pub use path_planning::{PathData, PathError, PathStatus, PathWorld, PathWorldConfig};
pub use path_planning::{ObstacleId, VertexRef};
