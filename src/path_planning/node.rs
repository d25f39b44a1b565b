//! Graph nodes: obstacle vertices plus the two transient query endpoints
//!
//! Nodes never hold references to each other. Edges are stored as
//! [`VertexRef`]/[`NodeKey`] handles into the obstacle arena, and every
//! edge is recorded on both of its endpoints.

use std::fmt;

use crate::common::Point2D;
use crate::utils::{FastRemoveVec, Tracker};

use super::obstacle::ObstacleId;

/// Handle of one obstacle vertex node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexRef {
    pub obstacle: ObstacleId,
    pub index: usize,
}

impl VertexRef {
    pub fn new(obstacle: ObstacleId, index: usize) -> Self {
        VertexRef { obstacle, index }
    }
}

impl fmt::Display for VertexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.obstacle, self.index)
    }
}

/// Any node a path search can visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKey {
    Start,
    End,
    Vertex(VertexRef),
}

/// Search state of a node, valid only for the epoch it was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Unprocessed,
    Open,
    Closed,
}

/// Search bookkeeping and edge lists shared by every node kind
#[derive(Debug, Clone)]
pub struct PathNode {
    pub(crate) point: Point2D,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) distance_to_parent: f64,
    pub(crate) g_cost: f64,
    pub(crate) h_cost: f64,
    pub(crate) f_cost: f64,
    search_epoch: u64,
    search_status: SearchStatus,
    pub(crate) permanent: FastRemoveVec<VertexRef>,
    pub(crate) transient: FastRemoveVec<NodeKey>,
}

impl PathNode {
    pub fn new(point: Point2D) -> Self {
        PathNode {
            point,
            parent: None,
            distance_to_parent: 0.0,
            g_cost: 0.0,
            h_cost: 0.0,
            f_cost: 0.0,
            search_epoch: 0,
            search_status: SearchStatus::Unprocessed,
            permanent: FastRemoveVec::new(),
            transient: FastRemoveVec::new(),
        }
    }

    pub fn point(&self) -> Point2D {
        self.point
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn distance_to_parent(&self) -> f64 {
        self.distance_to_parent
    }

    pub fn g_cost(&self) -> f64 {
        self.g_cost
    }

    pub fn h_cost(&self) -> f64 {
        self.h_cost
    }

    pub fn f_cost(&self) -> f64 {
        self.f_cost
    }

    /// Visibility edges to other obstacle vertices
    pub fn permanent_edges(&self) -> &[VertexRef] {
        self.permanent.as_slice()
    }

    /// Edges to or from the current query's start/end points
    pub fn transient_edges(&self) -> &[NodeKey] {
        self.transient.as_slice()
    }

    /// Status in the tracker's current epoch; stale stamps read as unprocessed
    pub fn status(&self, tracker: &Tracker) -> SearchStatus {
        if self.search_epoch == tracker.epoch() {
            self.search_status
        } else {
            SearchStatus::Unprocessed
        }
    }

    pub(crate) fn set_status(&mut self, tracker: &Tracker, status: SearchStatus) {
        self.search_epoch = tracker.epoch();
        self.search_status = status;
    }

    /// Prepare a transient endpoint node for a new query
    pub(crate) fn reset(&mut self, point: Point2D) {
        self.point = point;
        self.parent = None;
        self.distance_to_parent = 0.0;
        self.g_cost = 0.0;
        self.h_cost = 0.0;
        self.f_cost = 0.0;
        self.transient.clear();
    }
}

/// One node per obstacle polygon vertex
#[derive(Debug, Clone)]
pub struct ObstacleVertexNode {
    pub(crate) node: PathNode,
    pub(crate) vertex: VertexRef,
    pub(crate) concave: bool,
    pub(crate) contained: Option<bool>,
}

impl ObstacleVertexNode {
    pub(crate) fn new(vertex: VertexRef, point: Point2D, concave: bool) -> Self {
        ObstacleVertexNode {
            node: PathNode::new(point),
            vertex,
            concave,
            contained: None,
        }
    }

    pub fn vertex_ref(&self) -> VertexRef {
        self.vertex
    }

    pub fn point(&self) -> Point2D {
        self.node.point
    }

    pub fn path_node(&self) -> &PathNode {
        &self.node
    }

    /// Reflex (or straight) vertex; never a path node
    pub fn is_concave(&self) -> bool {
        self.concave
    }

    /// Cached "inside another obstacle" flag, `None` until resolved
    pub fn contained(&self) -> Option<bool> {
        self.contained
    }

    pub(crate) fn set_contained(&mut self, contained: bool) {
        self.contained = Some(contained);
    }

    pub(crate) fn invalidate_contained(&mut self) {
        self.contained = None;
    }

    /// Convex and known not to be swallowed by another obstacle
    pub fn is_usable(&self) -> bool {
        !self.concave && self.contained == Some(false)
    }

    pub fn permanent_edges(&self) -> &[VertexRef] {
        self.node.permanent_edges()
    }
}
