//! Common traits defining interfaces for planners

use crate::common::types::*;
use crate::common::error::NavError;

/// Trait for path planning algorithms
///
/// Planners in this crate keep reusable search scratch state, so planning
/// takes `&mut self`.
pub trait PathPlanner {
    /// Plan a path from start to goal
    fn plan(&mut self, start: Point2D, goal: Point2D) -> Result<Path2D, NavError>;
}
