//! Error types for poly_nav

use thiserror::Error;

use crate::path_planning::PathError;

/// Main error type for obstacle and world operations
#[derive(Debug, Error)]
pub enum NavError {
    /// Path planning failed
    #[error("Planning error: {0}")]
    PlanningError(#[from] PathError),
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Obstacle handle is stale or was never issued by this world
    #[error("Unknown obstacle: {0}")]
    UnknownObstacle(String),
}

/// Result type alias for poly_nav operations
pub type NavResult<T> = Result<T, NavError>;
