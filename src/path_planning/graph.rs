//! Obstacle set, tile index and visibility graph kept in step
//!
//! Every mutation goes through [`ObstacleGraph`], which looks up the
//! affected neighbourhood in the tile grid and hands it to the
//! [`NodeConnector`] for incremental repair.

use log::{debug, error};

use crate::common::{NavError, NavResult, Point2D};
use crate::geometry::Polygon;
use crate::spatial::TileGrid;

use super::connector::NodeConnector;
use super::node::{ObstacleVertexNode, VertexRef};
use super::obstacle::{Obstacle, ObstacleArena, ObstacleId};

#[derive(Debug)]
pub struct ObstacleGraph {
    arena: ObstacleArena,
    grid: TileGrid<ObstacleId>,
    connector: NodeConnector,
    max_connection_distance: f64,
    inner_buffer: f64,
}

impl ObstacleGraph {
    pub fn new(grid: TileGrid<ObstacleId>, max_connection_distance: f64, inner_buffer: f64) -> NavResult<Self> {
        if !(max_connection_distance > 0.0) {
            return Err(NavError::InvalidParameter(format!(
                "max_connection_distance must be positive, got {}",
                max_connection_distance
            )));
        }
        if !(inner_buffer >= 0.0) {
            return Err(NavError::InvalidParameter(format!(
                "inner_buffer must be >= 0, got {}",
                inner_buffer
            )));
        }
        Ok(ObstacleGraph {
            arena: ObstacleArena::new(),
            grid,
            connector: NodeConnector::new(),
            max_connection_distance,
            inner_buffer,
        })
    }

    pub fn max_connection_distance(&self) -> f64 {
        self.max_connection_distance
    }

    pub fn arena(&self) -> &ObstacleArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut ObstacleArena {
        &mut self.arena
    }

    pub fn grid(&self) -> &TileGrid<ObstacleId> {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.arena.get(id)
    }

    pub fn node(&self, vertex: VertexRef) -> Option<&ObstacleVertexNode> {
        self.arena.node(vertex)
    }

    pub fn insert_obstacle(&mut self, outer: Polygon) -> NavResult<ObstacleId> {
        let inner_buffer = self.inner_buffer;
        let id = self.arena.insert_with(|id| Obstacle::new(id, outer, inner_buffer))?;
        if let Some(obstacle) = self.arena.get(id) {
            self.grid.insert(id, obstacle);
        }
        self.connect_obstacle(id);
        debug!("inserted {} ({} obstacles)", id, self.arena.len());
        Ok(id)
    }

    pub fn remove_obstacle(&mut self, id: ObstacleId) -> NavResult<Obstacle> {
        self.detach_obstacle(id)?;
        let obstacle = self
            .arena
            .remove(id)
            .ok_or_else(|| NavError::UnknownObstacle(id.to_string()))?;
        self.repair_around(obstacle.inner());
        debug!("removed {} ({} obstacles)", id, self.arena.len());
        Ok(obstacle)
    }

    /// Give an obstacle a new outer polygon.
    ///
    /// Nodes keep their identity when the vertex count is unchanged. The
    /// graph is repaired around both the old and the new footprint.
    pub fn reshape_obstacle(&mut self, id: ObstacleId, outer: Polygon) -> NavResult<()> {
        let inner = Obstacle::build_inner(&outer, self.inner_buffer)?;
        self.detach_obstacle(id)?;

        let old_inner = match self.arena.get_mut(id) {
            Some(obstacle) => {
                let old_inner = obstacle.inner().clone();
                obstacle.set_shape(outer, inner);
                old_inner
            }
            None => return Err(NavError::UnknownObstacle(id.to_string())),
        };
        self.repair_around(&old_inner);

        if let Some(obstacle) = self.arena.get(id) {
            self.grid.insert(id, obstacle);
        }
        self.connect_obstacle(id);
        debug!("reshaped {}", id);
        Ok(())
    }

    pub fn translate_obstacle(&mut self, id: ObstacleId, dx: f64, dy: f64) -> NavResult<()> {
        let outer = self.outer_of(id)?.translated(dx, dy);
        self.reshape_obstacle(id, outer)
    }

    pub fn scale_obstacle(&mut self, id: ObstacleId, factor: f64) -> NavResult<()> {
        let outer = self.outer_of(id)?.scaled(factor)?;
        self.reshape_obstacle(id, outer)
    }

    pub fn rotate_obstacle(&mut self, id: ObstacleId, angle: f64) -> NavResult<()> {
        let outer = self.outer_of(id)?.rotated(angle);
        self.reshape_obstacle(id, outer)
    }

    /// Obstacles whose bounding circle intersects the given circle
    pub fn obstacles_near(&mut self, center: Point2D, radius: f64) -> Vec<ObstacleId> {
        let arena = &self.arena;
        self.grid.query_within_radius(center, radius, |id| arena.get(id))
    }

    /// True if any inner polygon crosses the segment
    pub fn segment_blocked(&mut self, a: Point2D, b: Point2D) -> bool {
        let nearby = self.obstacles_near(a.midpoint(&b), a.distance(&b) * 0.5);
        nearby.iter().filter_map(|&id| self.arena.get(id)).any(|o| {
            let inner = o.inner();
            inner.intersection_possible(&a, &b) && inner.intersects_segment(&a, &b)
        })
    }

    /// Graph vertices `point` can see directly, with their distances
    pub fn reachable_nodes(&mut self, point: Point2D, max_distance: f64) -> Vec<(VertexRef, f64)> {
        let nearby = self.obstacles_near(point, max_distance);
        self.connector
            .reachable_nodes(&mut self.arena, point, max_distance, &nearby)
    }

    /// Every permanent edge once, as `(smaller, larger)` pairs in sorted order
    pub fn edge_pairs(&self) -> Vec<(VertexRef, VertexRef)> {
        let mut pairs: Vec<(VertexRef, VertexRef)> = self
            .arena
            .iter()
            .flat_map(|o| o.nodes().iter())
            .flat_map(|n| {
                let a = n.vertex_ref();
                n.permanent_edges()
                    .iter()
                    .filter(move |&&b| a < b)
                    .map(move |&b| (a, b))
            })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Checks that every edge is recorded on both endpoints and that no
    /// edge touches an unusable vertex
    pub fn edges_symmetric(&self) -> bool {
        self.arena.iter().flat_map(|o| o.nodes().iter()).all(|n| {
            n.permanent_edges().iter().all(|&partner| {
                n.is_usable()
                    && self.arena.node(partner).map_or(false, |p| {
                        p.is_usable() && p.permanent_edges().contains(&n.vertex_ref())
                    })
            })
        })
    }

    fn outer_of(&self, id: ObstacleId) -> NavResult<&Polygon> {
        self.arena
            .get(id)
            .map(|o| o.outer())
            .ok_or_else(|| NavError::UnknownObstacle(id.to_string()))
    }

    /// Take an obstacle out of the grid and the graph, leaving it in the arena
    fn detach_obstacle(&mut self, id: ObstacleId) -> NavResult<()> {
        let obstacle = self
            .arena
            .get(id)
            .ok_or_else(|| NavError::UnknownObstacle(id.to_string()))?;
        let removed = self.grid.remove(id, obstacle);
        if !removed {
            error!("{} was not where its footprint says in the tile grid", id);
        }
        debug_assert!(removed, "tile grid lost track of {}", id);

        self.connector
            .clear_connections_to_removed_obstacle_nodes(&mut self.arena, id);
        Ok(())
    }

    fn connect_obstacle(&mut self, id: ObstacleId) {
        let Some((center, radius)) = self
            .arena
            .get(id)
            .map(|o| (o.outer().center(), o.outer().bounding_radius()))
        else {
            return;
        };
        let nearby = self.obstacles_near(center, radius + self.max_connection_distance);
        self.connector
            .add_obstacle(&mut self.arena, id, &nearby, self.max_connection_distance);
    }

    fn repair_around(&mut self, removed_inner: &Polygon) {
        let center = removed_inner.center();
        let reach = removed_inner.bounding_radius() + self.max_connection_distance;
        let remaining = self.obstacles_near(center, reach);

        let reach_sq = reach * reach;
        let candidates: Vec<VertexRef> = remaining
            .iter()
            .filter_map(|&id| self.arena.get(id))
            .flat_map(|o| o.nodes().iter())
            .filter(|n| n.point().distance_sq(&center) <= reach_sq)
            .map(|n| n.vertex_ref())
            .collect();

        self.connector.reconnect_nodes_around_removed_obstacle(
            &mut self.arena,
            removed_inner,
            &candidates,
            &remaining,
            self.max_connection_distance,
        );
    }
}
