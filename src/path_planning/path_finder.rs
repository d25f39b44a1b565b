//! A* over the obstacle-vertex graph plus per-query start/end hookups
//!
//! A query runs: straight-line check, hookup of start and end into the
//! permanent graph through transient edges, A* search, and cleanup. The
//! open list is an [`IndexedMinHeap`] ordered by `f = g + h` with a
//! Euclidean heuristic; open/closed status is epoch-stamped through a
//! [`Tracker`], so nothing needs resetting between queries.
//!
//! The finder owns the two endpoint nodes and the open list and reuses
//! them across queries, which is why a query needs `&mut self`.

use log::{debug, trace};
use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::common::{Path2D, Point2D};
use crate::utils::{IndexedMinHeap, Tracker};

use super::graph::ObstacleGraph;
use super::node::{NodeKey, PathNode, SearchStatus};
use super::obstacle::ObstacleArena;

/// Ways a path query can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    /// Straight-line distance already exceeds the search budget
    #[error("start and end are further apart than the search distance")]
    TooFar,
    /// No graph node within hookup distance of the start point
    #[error("start point could not be connected to the graph")]
    StartUnreachable,
    /// No graph node within hookup distance of the end point
    #[error("end point could not be connected to the graph")]
    EndUnreachable,
    /// Open list exhausted without reaching the end point
    #[error("no path within the search distance")]
    Exhausted,
}

/// Outcome code of the most recent query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathStatus {
    /// No query has completed yet
    #[default]
    NoResult,
    Success,
    TooFar,
    StartUnreachable,
    EndUnreachable,
    Exhausted,
}

impl From<&Result<PathData, PathError>> for PathStatus {
    fn from(result: &Result<PathData, PathError>) -> Self {
        match result {
            Ok(_) => PathStatus::Success,
            Err(PathError::TooFar) => PathStatus::TooFar,
            Err(PathError::StartUnreachable) => PathStatus::StartUnreachable,
            Err(PathError::EndUnreachable) => PathStatus::EndUnreachable,
            Err(PathError::Exhausted) => PathStatus::Exhausted,
        }
    }
}

/// A successful path: points in travel order and the nodes they came from
#[derive(Debug, Clone, PartialEq)]
pub struct PathData {
    pub points: Vec<Point2D>,
    pub nodes: Vec<NodeKey>,
}

impl PathData {
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }

    pub fn to_path2d(&self) -> Path2D {
        Path2D::from_points(self.points.clone())
    }
}

/// Reusable A* query context
#[derive(Debug)]
pub struct PathFinder {
    start: PathNode,
    end: PathNode,
    open: IndexedMinHeap<OrderedFloat<f64>, NodeKey>,
    neighbors: Vec<NodeKey>,
    tracker: Tracker,
    last_status: PathStatus,
    expanded: usize,
}

impl PathFinder {
    pub fn new() -> Self {
        PathFinder {
            start: PathNode::new(Point2D::origin()),
            end: PathNode::new(Point2D::origin()),
            open: IndexedMinHeap::new(),
            neighbors: Vec::new(),
            tracker: Tracker::new(),
            last_status: PathStatus::NoResult,
            expanded: 0,
        }
    }

    pub fn last_status(&self) -> PathStatus {
        self.last_status
    }

    /// Nodes expanded by the most recent search
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    /// Find a path from `start` to `end` through `graph`.
    ///
    /// A segment starting inside an inner polygon counts as blocked, so an
    /// enclosed start or end fails at hookup rather than passing the
    /// straight-line check.
    pub fn calc(
        &mut self,
        graph: &mut ObstacleGraph,
        start: Point2D,
        end: Point2D,
        max_hookup_distance: f64,
        max_search_distance: f64,
    ) -> Result<PathData, PathError> {
        self.last_status = PathStatus::NoResult;
        self.expanded = 0;

        let result = self.search(graph, start, end, max_hookup_distance, max_search_distance);

        self.clear_transient_edges(graph.arena_mut());
        self.open.clear();
        self.tracker.advance();
        self.last_status = PathStatus::from(&result);

        match &result {
            Ok(path) => trace!(
                "path found: {} points, length {:.3}, {} expanded",
                path.points.len(),
                path.length(),
                self.expanded
            ),
            Err(e) => debug!(
                "path ({:.2},{:.2}) -> ({:.2},{:.2}) failed: {}",
                start.x, start.y, end.x, end.y, e
            ),
        }
        result
    }

    fn search(
        &mut self,
        graph: &mut ObstacleGraph,
        start: Point2D,
        end: Point2D,
        max_hookup_distance: f64,
        max_search_distance: f64,
    ) -> Result<PathData, PathError> {
        if start.distance(&end) > max_search_distance {
            return Err(PathError::TooFar);
        }

        if !graph.segment_blocked(start, end) {
            return Ok(PathData {
                points: vec![start, end],
                nodes: vec![NodeKey::Start, NodeKey::End],
            });
        }

        self.start.reset(start);
        self.end.reset(end);

        let from_start = graph.reachable_nodes(start, max_hookup_distance);
        if from_start.is_empty() {
            return Err(PathError::StartUnreachable);
        }
        let arena = graph.arena_mut();
        for &(vertex, _) in &from_start {
            if let Some(node) = arena.node_mut(vertex) {
                node.node.transient.push(NodeKey::Start);
                self.start.transient.push(NodeKey::Vertex(vertex));
            }
        }

        let from_end = graph.reachable_nodes(end, max_hookup_distance);
        if from_end.is_empty() {
            return Err(PathError::EndUnreachable);
        }
        let arena = graph.arena_mut();
        for &(vertex, _) in &from_end {
            if let Some(node) = arena.node_mut(vertex) {
                node.node.transient.push(NodeKey::End);
                self.end.transient.push(NodeKey::Vertex(vertex));
            }
        }

        self.run_astar(graph.arena_mut(), max_search_distance)
    }

    fn run_astar(&mut self, arena: &mut ObstacleArena, max_search_distance: f64) -> Result<PathData, PathError> {
        let goal = self.end.point;
        self.open.clear();

        self.start.g_cost = 0.0;
        self.start.h_cost = self.start.point.distance(&goal);
        self.start.f_cost = self.start.h_cost;
        self.start.set_status(&self.tracker, SearchStatus::Open);
        self.open.push(OrderedFloat(self.start.f_cost), NodeKey::Start);

        while let Some((_, key)) = self.open.pop() {
            self.expanded += 1;
            if key == NodeKey::End {
                return Ok(self.build_path(arena));
            }

            let (current_point, current_g) = {
                let Some(current) = node_mut(arena, &mut self.start, &mut self.end, key) else { continue };
                current.set_status(&self.tracker, SearchStatus::Closed);

                self.neighbors.clear();
                self.neighbors.extend(current.permanent.iter().map(|&v| NodeKey::Vertex(v)));
                self.neighbors.extend(current.transient.iter().copied());
                (current.point, current.g_cost)
            };

            for i in 0..self.neighbors.len() {
                let neighbor_key = self.neighbors[i];
                let Some(neighbor) = node_mut(arena, &mut self.start, &mut self.end, neighbor_key) else { continue };

                let step = current_point.distance(&neighbor.point);
                let g_cost = current_g + step;
                match neighbor.status(&self.tracker) {
                    SearchStatus::Closed => {}
                    SearchStatus::Open => {
                        if g_cost < neighbor.g_cost {
                            neighbor.g_cost = g_cost;
                            neighbor.f_cost = g_cost + neighbor.h_cost;
                            neighbor.parent = Some(key);
                            neighbor.distance_to_parent = step;
                            let f_cost = neighbor.f_cost;
                            self.open.decrease_key(&neighbor_key, OrderedFloat(f_cost));
                        }
                    }
                    SearchStatus::Unprocessed => {
                        let h_cost = neighbor.point.distance(&goal);
                        let f_cost = g_cost + h_cost;
                        if f_cost > max_search_distance {
                            continue;
                        }
                        neighbor.g_cost = g_cost;
                        neighbor.h_cost = h_cost;
                        neighbor.f_cost = f_cost;
                        neighbor.parent = Some(key);
                        neighbor.distance_to_parent = step;
                        neighbor.set_status(&self.tracker, SearchStatus::Open);
                        self.open.push(OrderedFloat(f_cost), neighbor_key);
                    }
                }
            }
        }

        Err(PathError::Exhausted)
    }

    /// Walk parents back from the end node
    fn build_path(&mut self, arena: &mut ObstacleArena) -> PathData {
        let mut nodes = Vec::new();
        let mut points = Vec::new();
        let mut current = Some(NodeKey::End);

        while let Some(key) = current {
            let Some(node) = node_mut(arena, &mut self.start, &mut self.end, key) else { break };
            nodes.push(key);
            points.push(node.point);
            current = node.parent;
        }

        nodes.reverse();
        points.reverse();
        PathData { points, nodes }
    }

    fn clear_transient_edges(&mut self, arena: &mut ObstacleArena) {
        for endpoint in [NodeKey::Start, NodeKey::End] {
            let node = if endpoint == NodeKey::Start { &mut self.start } else { &mut self.end };
            for key in node.transient.drain() {
                if let NodeKey::Vertex(vertex) = key {
                    if let Some(vertex_node) = arena.node_mut(vertex) {
                        vertex_node.node.transient.remove(&endpoint);
                    }
                }
            }
        }
    }
}

impl Default for PathFinder {
    fn default() -> Self {
        Self::new()
    }
}

fn node_mut<'a>(
    arena: &'a mut ObstacleArena,
    start: &'a mut PathNode,
    end: &'a mut PathNode,
    key: NodeKey,
) -> Option<&'a mut PathNode> {
    match key {
        NodeKey::Start => Some(start),
        NodeKey::End => Some(end),
        NodeKey::Vertex(vertex) => arena.node_mut(vertex).map(|n| &mut n.node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use crate::spatial::TileGrid;

    fn graph() -> ObstacleGraph {
        let grid = TileGrid::new(-50.0, -50.0, 100.0, 100.0, 10.0).unwrap();
        ObstacleGraph::new(grid, 100.0, 0.01).unwrap()
    }

    #[test]
    fn test_straight_line() {
        let mut graph = graph();
        let mut finder = PathFinder::new();
        assert_eq!(finder.last_status(), PathStatus::NoResult);

        let start = Point2D::new(0.0, 0.0);
        let end = Point2D::new(10.0, 0.0);
        let path = finder.calc(&mut graph, start, end, 50.0, 100.0).unwrap();
        assert_eq!(path.points, vec![start, end]);
        assert_eq!(path.nodes, vec![NodeKey::Start, NodeKey::End]);
        assert_eq!(finder.last_status(), PathStatus::Success);
    }

    #[test]
    fn test_too_far() {
        let mut graph = graph();
        let mut finder = PathFinder::new();
        let result = finder.calc(&mut graph, Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0), 50.0, 9.0);
        assert_eq!(result, Err(PathError::TooFar));
        assert_eq!(finder.last_status(), PathStatus::TooFar);
    }

    #[test]
    fn test_detour_and_cleanup() {
        let mut graph = graph();
        graph.insert_obstacle(Polygon::rectangle(-1.0, -1.0, 2.0, 2.0).unwrap()).unwrap();
        let mut finder = PathFinder::new();

        let start = Point2D::new(-5.0, 0.0);
        let end = Point2D::new(5.0, 0.0);
        let path = finder.calc(&mut graph, start, end, 50.0, 100.0).unwrap();
        assert_eq!(path.points.len(), 4);
        assert_eq!(path.points[0], start);
        assert_eq!(path.points[3], end);
        assert!(path.length() > 10.0);
        assert!(finder.expanded() > 0);

        for obstacle in graph.arena().iter() {
            for node in obstacle.nodes() {
                assert!(node.path_node().transient_edges().is_empty());
            }
        }

        // A second query on the same finder gives the same answer
        let again = finder.calc(&mut graph, start, end, 50.0, 100.0).unwrap();
        assert_eq!(again, path);
    }

    #[test]
    fn test_path_error_display() {
        assert_eq!(PathError::Exhausted.to_string(), "no path within the search distance");
    }
}
