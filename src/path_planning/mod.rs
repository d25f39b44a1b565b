//! Incremental visibility-graph path planning among polygon obstacles

pub mod node;
pub mod obstacle;
pub mod connector;
pub mod graph;
pub mod path_finder;
pub mod world;

pub use node::{NodeKey, ObstacleVertexNode, PathNode, SearchStatus, VertexRef};
pub use obstacle::{Obstacle, ObstacleArena, ObstacleId};
pub use connector::{is_useful_from, NodeConnector};
pub use graph::ObstacleGraph;
pub use path_finder::{PathData, PathError, PathFinder, PathStatus};
pub use world::{PathWorld, PathWorldConfig};
