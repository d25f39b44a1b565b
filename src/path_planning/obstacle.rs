//! Path-blocking obstacles and the arena that owns them
//!
//! An obstacle is an outer polygon (the true blocking shape, whose vertices
//! become graph nodes) paired with an inner polygon, the outer one shrunk by
//! a small margin. All containment and intersection tests run against the
//! inner polygon so that edges running along the outer boundary, or ending
//! exactly on an outer vertex, never register as blocked.

use std::fmt;

use crate::common::{NavError, NavResult, Point2D};
use crate::geometry::Polygon;
use crate::spatial::TileEntity;
use crate::utils::TrackerStamp;

use super::node::{ObstacleVertexNode, VertexRef};

/// Generational handle of an obstacle in an [`ObstacleArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObstacleId {
    index: u32,
    generation: u32,
}

impl ObstacleId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Obstacle({}v{})", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    id: ObstacleId,
    outer: Polygon,
    inner: Polygon,
    pub(crate) nodes: Vec<ObstacleVertexNode>,
    tile_stamp: TrackerStamp,
}

impl Obstacle {
    pub(crate) fn new(id: ObstacleId, outer: Polygon, inner_buffer: f64) -> NavResult<Self> {
        let inner = Self::build_inner(&outer, inner_buffer)?;
        let nodes = Self::build_nodes(id, &outer);
        Ok(Obstacle {
            id,
            outer,
            inner,
            nodes,
            tile_stamp: TrackerStamp::new(),
        })
    }

    /// Shrink `outer` by `inner_buffer`, failing if nothing is left
    pub fn build_inner(outer: &Polygon, inner_buffer: f64) -> NavResult<Polygon> {
        if !(inner_buffer >= 0.0) {
            return Err(NavError::InvalidParameter(format!(
                "inner buffer must be >= 0, got {}",
                inner_buffer
            )));
        }
        outer.buffered(-inner_buffer).ok_or_else(|| {
            NavError::InvalidParameter(format!(
                "polygon collapses when buffered inward by {}",
                inner_buffer
            ))
        })
    }

    pub fn id(&self) -> ObstacleId {
        self.id
    }

    pub fn outer(&self) -> &Polygon {
        &self.outer
    }

    pub fn inner(&self) -> &Polygon {
        &self.inner
    }

    pub fn nodes(&self) -> &[ObstacleVertexNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&ObstacleVertexNode> {
        self.nodes.get(index)
    }

    pub fn vertex_refs(&self) -> impl Iterator<Item = VertexRef> + '_ {
        self.nodes.iter().map(|n| n.vertex)
    }

    /// Replace the shape. Nodes survive (with their edge lists) when the
    /// vertex count is unchanged and are rebuilt otherwise; containment
    /// flags are invalidated either way.
    pub(crate) fn set_shape(&mut self, outer: Polygon, inner: Polygon) {
        if outer.len() == self.nodes.len() {
            let concave = Self::calc_concave_flags(&outer);
            for (i, node) in self.nodes.iter_mut().enumerate() {
                node.node.point = outer.point(i);
                node.concave = concave[i];
                node.invalidate_contained();
            }
        } else {
            self.nodes = Self::build_nodes(self.id, &outer);
        }
        self.outer = outer;
        self.inner = inner;
    }

    fn build_nodes(id: ObstacleId, outer: &Polygon) -> Vec<ObstacleVertexNode> {
        Self::calc_concave_flags(outer)
            .into_iter()
            .enumerate()
            .map(|(i, concave)| ObstacleVertexNode::new(VertexRef::new(id, i), outer.point(i), concave))
            .collect()
    }

    /// A vertex is convex when the turn through it matches the polygon's
    /// winding. Straight (collinear) vertices count as concave.
    fn calc_concave_flags(outer: &Polygon) -> Vec<bool> {
        let winding = outer.signed_area().signum();
        (0..outer.len())
            .map(|i| {
                let prev = outer.point(outer.prev_index(i));
                let next = outer.point(outer.next_index(i));
                prev.cross(&outer.point(i), &next) * winding <= 0.0
            })
            .collect()
    }
}

impl TileEntity for Obstacle {
    fn bounding_circle(&self) -> (Point2D, f64) {
        (self.outer.center(), self.outer.bounding_radius())
    }

    fn tile_stamp(&self) -> &TrackerStamp {
        &self.tile_stamp
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    obstacle: Option<Obstacle>,
}

/// Slot arena of obstacles addressed by generational [`ObstacleId`]s
///
/// Freed slots are reused with a bumped generation, so a stale id never
/// resolves to the obstacle that took its place.
#[derive(Debug, Clone, Default)]
pub struct ObstacleArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl ObstacleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The id the next insertion will receive
    pub fn peek_next_id(&self) -> ObstacleId {
        match self.free.last() {
            Some(&index) => ObstacleId {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => ObstacleId {
                index: self.slots.len() as u32,
                generation: 0,
            },
        }
    }

    /// Insert the obstacle built by `build`, which receives its future id
    pub fn insert_with<F>(&mut self, build: F) -> NavResult<ObstacleId>
    where
        F: FnOnce(ObstacleId) -> NavResult<Obstacle>,
    {
        let id = self.peek_next_id();
        let obstacle = build(id)?;
        match self.free.pop() {
            Some(index) => self.slots[index as usize].obstacle = Some(obstacle),
            None => self.slots.push(Slot {
                generation: 0,
                obstacle: Some(obstacle),
            }),
        }
        self.len += 1;
        Ok(id)
    }

    pub fn remove(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let obstacle = slot.obstacle.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(obstacle)
    }

    pub fn contains(&self, id: ObstacleId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.obstacle.as_ref())
    }

    pub fn get_mut(&mut self, id: ObstacleId) -> Option<&mut Obstacle> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.obstacle.as_mut())
    }

    pub fn node(&self, vertex: VertexRef) -> Option<&ObstacleVertexNode> {
        self.get(vertex.obstacle)?.nodes.get(vertex.index)
    }

    pub fn node_mut(&mut self, vertex: VertexRef) -> Option<&mut ObstacleVertexNode> {
        self.get_mut(vertex.obstacle)?.nodes.get_mut(vertex.index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.slots.iter().filter_map(|slot| slot.obstacle.as_ref())
    }

    pub fn ids(&self) -> impl Iterator<Item = ObstacleId> + '_ {
        self.iter().map(|o| o.id)
    }
}
