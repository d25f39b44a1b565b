//! Incremental maintenance of the obstacle-vertex visibility graph
//!
//! Edges join two convex, uncontained obstacle vertices whose connecting
//! segment is no longer than the connection distance, clears every inner
//! polygon, and passes the tangency pre-filter (see [`is_useful_from`]).
//! Instead of rebuilding the graph after every change, the connector repairs
//! only what an inserted or removed obstacle can affect.
//!
//! Blocking scans use obstacles sorted by the smallest possible distance
//! from the scan origin to their inner polygon (`|p - center| - radius`).
//! Once that distance exceeds the segment length no later obstacle can
//! reach the segment, so the scan stops.

use log::trace;
use ordered_float::OrderedFloat;

use crate::common::Point2D;
use crate::geometry::Polygon;

use super::node::VertexRef;
use super::obstacle::{ObstacleArena, ObstacleId};

/// Distances below this from a supporting line count as "on the line"
const LINE_EPSILON: f64 = 1e-9;

/// Obstacles sorted by minimum possible distance from some point
type SortedObstacles = Vec<(OrderedFloat<f64>, ObstacleId)>;

/// Builds and repairs permanent edges; holds reusable scratch buffers
#[derive(Debug, Default)]
pub struct NodeConnector {
    sorted: SortedObstacles,
}

impl NodeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a symmetric edge
    pub fn add_edge(arena: &mut ObstacleArena, a: VertexRef, b: VertexRef) {
        if let Some(node) = arena.node_mut(a) {
            node.node.permanent.push(b);
        }
        if let Some(node) = arena.node_mut(b) {
            node.node.permanent.push(a);
        }
    }

    /// Remove a symmetric edge; returns true if it existed
    pub fn remove_edge(arena: &mut ObstacleArena, a: VertexRef, b: VertexRef) -> bool {
        let removed = arena
            .node_mut(a)
            .map_or(false, |node| node.node.permanent.remove(&b));
        if let Some(node) = arena.node_mut(b) {
            node.node.permanent.remove(&a);
        }
        removed
    }

    pub fn are_connected(arena: &ObstacleArena, a: VertexRef, b: VertexRef) -> bool {
        arena
            .node(a)
            .map_or(false, |node| node.node.permanent.contains(&b))
    }

    /// Drop every permanent edge touching `vertex`, on both ends
    pub fn clear_edges(arena: &mut ObstacleArena, vertex: VertexRef) {
        let partners: Vec<VertexRef> = match arena.node_mut(vertex) {
            Some(node) => node.node.permanent.drain().collect(),
            None => return,
        };
        for partner in partners {
            if let Some(node) = arena.node_mut(partner) {
                node.node.permanent.remove(&vertex);
            }
        }
    }

    /// Resolve the containment cache of `vertex` against `nearby` if it is
    /// still unknown, and return the resolved value
    pub fn resolve_contained(arena: &mut ObstacleArena, vertex: VertexRef, nearby: &[ObstacleId]) -> bool {
        let point = match arena.node(vertex) {
            Some(node) => match node.contained {
                Some(contained) => return contained,
                None => node.point(),
            },
            None => return false,
        };

        let contained = nearby.iter().any(|&id| {
            id != vertex.obstacle
                && arena
                    .get(id)
                    .map_or(false, |o| o.inner().contains_point(&point))
        });
        if let Some(node) = arena.node_mut(vertex) {
            node.set_contained(contained);
        }
        contained
    }

    /// Rebuild all permanent edges of one vertex against `nearby`.
    ///
    /// Returns the number of edges created.
    pub fn reconnect_node(
        &mut self,
        arena: &mut ObstacleArena,
        vertex: VertexRef,
        max_distance: f64,
        nearby: &[ObstacleId],
    ) -> usize {
        Self::clear_edges(arena, vertex);

        let (point, concave, contained) = match arena.node(vertex) {
            Some(node) => (node.point(), node.concave, node.contained),
            None => return 0,
        };
        if concave || contained == Some(true) {
            return 0;
        }

        Self::sort_by_distance(&mut self.sorted, arena, point, nearby);

        if contained.is_none() {
            let swallowed = self
                .sorted
                .iter()
                .take_while(|(d, _)| d.0 <= 0.0)
                .any(|&(_, id)| {
                    id != vertex.obstacle
                        && arena
                            .get(id)
                            .map_or(false, |o| o.inner().contains_point(&point))
                });
            if let Some(node) = arena.node_mut(vertex) {
                node.set_contained(swallowed);
            }
            if swallowed {
                return 0;
            }
        }

        Self::resolve_candidates(arena, point, max_distance, nearby);

        let mut partners = Vec::new();
        for &id in nearby {
            let Some(obstacle) = arena.get(id) else { continue };
            for candidate in obstacle.nodes() {
                if candidate.vertex == vertex || !candidate.is_usable() {
                    continue;
                }
                let length = point.distance(&candidate.point());
                if length > max_distance {
                    continue;
                }
                if Self::is_visible(arena, &self.sorted, vertex, candidate.vertex, length) {
                    partners.push(candidate.vertex);
                }
            }
        }

        for &partner in &partners {
            Self::add_edge(arena, vertex, partner);
        }
        partners.len()
    }

    /// Wire a freshly inserted obstacle into the graph.
    ///
    /// `nearby` must hold every obstacle within the connection distance of
    /// the new obstacle's bounding circle; the obstacle itself is added if
    /// missing.
    pub fn add_obstacle(
        &mut self,
        arena: &mut ObstacleArena,
        id: ObstacleId,
        nearby: &[ObstacleId],
        max_distance: f64,
    ) {
        let (own, inner) = match arena.get(id) {
            Some(obstacle) => (obstacle.vertex_refs().collect::<Vec<_>>(), obstacle.inner().clone()),
            None => return,
        };
        let mut nearby = nearby.to_vec();
        if !nearby.contains(&id) {
            nearby.push(id);
        }

        for &vertex in &own {
            Self::clear_edges(arena, vertex);
            if let Some(node) = arena.node_mut(vertex) {
                node.invalidate_contained();
            }
        }

        // Vertices swallowed by the new obstacle lose all their edges
        let center = inner.center();
        let radius_sq = inner.bounding_radius() * inner.bounding_radius();
        let mut swallowed = Vec::new();
        for &other in nearby.iter().filter(|&&other| other != id) {
            let Some(obstacle) = arena.get(other) else { continue };
            for node in obstacle.nodes() {
                if node.contained != Some(true)
                    && node.point().distance_sq(&center) <= radius_sq
                    && inner.contains_point(&node.point())
                {
                    swallowed.push(node.vertex);
                }
            }
        }
        for &vertex in &swallowed {
            if let Some(node) = arena.node_mut(vertex) {
                node.set_contained(true);
            }
            Self::clear_edges(arena, vertex);
        }

        // Existing edges the new obstacle now blocks
        let mut blocked = Vec::new();
        for &other in nearby.iter().filter(|&&other| other != id) {
            let Some(obstacle) = arena.get(other) else { continue };
            for node in obstacle.nodes() {
                for &partner in node.permanent_edges() {
                    let Some(partner_node) = arena.node(partner) else { continue };
                    let (a, b) = (node.point(), partner_node.point());
                    if Self::blocks(&inner, &a, &b) {
                        blocked.push(canonical(node.vertex, partner));
                    }
                }
            }
        }
        blocked.sort_unstable();
        blocked.dedup();
        for &(a, b) in &blocked {
            Self::remove_edge(arena, a, b);
        }

        let mut added = 0;
        for &vertex in &own {
            added += self.reconnect_node(arena, vertex, max_distance, &nearby);
        }
        trace!(
            "add {}: {} swallowed, {} severed, {} edges added",
            id,
            swallowed.len(),
            blocked.len(),
            added
        );
    }

    /// Strip every edge touching a departing obstacle's vertices
    pub fn clear_connections_to_removed_obstacle_nodes(&mut self, arena: &mut ObstacleArena, id: ObstacleId) {
        let own: Vec<VertexRef> = match arena.get(id) {
            Some(obstacle) => obstacle.vertex_refs().collect(),
            None => return,
        };
        for vertex in own {
            Self::clear_edges(arena, vertex);
        }
    }

    /// Restore edges that only the removed obstacle was blocking.
    ///
    /// Vertices the removed obstacle was swallowing are reconnected from
    /// scratch. Every other candidate pair whose segment crossed the removed
    /// inner polygon is retested against `remaining`. Pairs are visited
    /// backward through `candidates`, each at most once.
    pub fn reconnect_nodes_around_removed_obstacle(
        &mut self,
        arena: &mut ObstacleArena,
        removed_inner: &Polygon,
        candidates: &[VertexRef],
        remaining: &[ObstacleId],
        max_distance: f64,
    ) {
        let mut freed = Vec::new();
        for &vertex in candidates {
            let Some(node) = arena.node_mut(vertex) else { continue };
            if node.contained == Some(true) && removed_inner.contains_point(&node.point()) {
                node.invalidate_contained();
                freed.push(vertex);
            }
        }
        for &vertex in &freed {
            self.reconnect_node(arena, vertex, max_distance, remaining);
        }

        for &vertex in candidates {
            Self::resolve_contained(arena, vertex, remaining);
        }

        let mut restored = 0;
        for i in (0..candidates.len()).rev() {
            let a = candidates[i];
            if freed.contains(&a) {
                continue;
            }
            let point_a = match arena.node(a) {
                Some(node) if node.is_usable() => node.point(),
                _ => continue,
            };
            let mut sorted_for_a = false;

            for &b in &candidates[..i] {
                if freed.contains(&b) {
                    continue;
                }
                let point_b = match arena.node(b) {
                    Some(node) if node.is_usable() => node.point(),
                    _ => continue,
                };
                let length = point_a.distance(&point_b);
                if length > max_distance
                    || !Self::blocks(removed_inner, &point_a, &point_b)
                    || Self::are_connected(arena, a, b)
                {
                    continue;
                }
                if !sorted_for_a {
                    Self::sort_by_distance(&mut self.sorted, arena, point_a, remaining);
                    sorted_for_a = true;
                }
                if Self::is_visible(arena, &self.sorted, a, b, length) {
                    Self::add_edge(arena, a, b);
                    restored += 1;
                }
            }
        }
        trace!(
            "removal repair: {} candidates, {} freed, {} edges restored",
            candidates.len(),
            freed.len(),
            restored
        );
    }

    /// Vertices an arbitrary point can connect to directly
    pub fn reachable_nodes(
        &mut self,
        arena: &mut ObstacleArena,
        point: Point2D,
        max_distance: f64,
        nearby: &[ObstacleId],
    ) -> Vec<(VertexRef, f64)> {
        Self::sort_by_distance(&mut self.sorted, arena, point, nearby);
        Self::resolve_candidates(arena, point, max_distance, nearby);

        let mut reachable = Vec::new();
        for &id in nearby {
            let Some(obstacle) = arena.get(id) else { continue };
            for candidate in obstacle.nodes() {
                if !candidate.is_usable() {
                    continue;
                }
                let target = candidate.point();
                let length = point.distance(&target);
                if length > max_distance
                    || !is_useful_from(obstacle.outer(), candidate.vertex.index, &point)
                    || Self::blocks(obstacle.inner(), &point, &target)
                {
                    continue;
                }
                if Self::is_segment_clear(arena, &self.sorted, &point, &target, length, id) {
                    reachable.push((candidate.vertex, length));
                }
            }
        }
        reachable
    }

    /// Resolve unknown containment for every vertex close enough to matter
    fn resolve_candidates(arena: &mut ObstacleArena, point: Point2D, max_distance: f64, nearby: &[ObstacleId]) {
        let max_sq = max_distance * max_distance;
        let unresolved: Vec<VertexRef> = nearby
            .iter()
            .filter_map(|&id| arena.get(id))
            .flat_map(|o| o.nodes().iter())
            .filter(|n| n.contained.is_none() && !n.concave && n.point().distance_sq(&point) <= max_sq)
            .map(|n| n.vertex)
            .collect();
        for vertex in unresolved {
            Self::resolve_contained(arena, vertex, nearby);
        }
    }

    fn sort_by_distance(sorted: &mut SortedObstacles, arena: &ObstacleArena, point: Point2D, nearby: &[ObstacleId]) {
        sorted.clear();
        sorted.extend(nearby.iter().filter_map(|&id| {
            arena.get(id).map(|o| {
                let inner = o.inner();
                (OrderedFloat(point.distance(&inner.center()) - inner.bounding_radius()), id)
            })
        }));
        sorted.sort_unstable();
    }

    /// Full edge test between two resolved, usable vertices. `sorted` must
    /// be ordered by distance from `a`.
    fn is_visible(arena: &ObstacleArena, sorted: &[(OrderedFloat<f64>, ObstacleId)], a: VertexRef, b: VertexRef, length: f64) -> bool {
        let (Some(obstacle_a), Some(obstacle_b)) = (arena.get(a.obstacle), arena.get(b.obstacle)) else {
            return false;
        };
        let point_a = obstacle_a.outer().point(a.index);
        let point_b = obstacle_b.outer().point(b.index);

        if !is_useful_from(obstacle_b.outer(), b.index, &point_a)
            || !is_useful_from(obstacle_a.outer(), a.index, &point_b)
        {
            return false;
        }
        if Self::blocks(obstacle_b.inner(), &point_a, &point_b) {
            return false;
        }
        Self::is_segment_clear(arena, sorted, &point_a, &point_b, length, b.obstacle)
    }

    /// Scan the sorted obstacles (except `skip`) for anything crossing the
    /// segment, stopping once no obstacle can reach it
    fn is_segment_clear(
        arena: &ObstacleArena,
        sorted: &[(OrderedFloat<f64>, ObstacleId)],
        from: &Point2D,
        to: &Point2D,
        length: f64,
        skip: ObstacleId,
    ) -> bool {
        for &(distance, id) in sorted {
            if distance.0 > length {
                break;
            }
            if id == skip {
                continue;
            }
            if let Some(obstacle) = arena.get(id) {
                if Self::blocks(obstacle.inner(), from, to) {
                    return false;
                }
            }
        }
        true
    }

    fn blocks(inner: &Polygon, a: &Point2D, b: &Point2D) -> bool {
        inner.intersection_possible(a, b) && inner.intersects_segment(a, b)
    }
}

fn canonical(a: VertexRef, b: VertexRef) -> (VertexRef, VertexRef) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Tangency pre-filter for connecting `from` to vertex `index` of `outer`.
///
/// A path through a convex vertex only makes sense if it wraps around the
/// vertex, i.e. `from` lies between the two supporting lines of the
/// vertex's adjacent edges. If `from` is strictly on the same rotational
/// side of both lines the connection is rejected. Points within a small
/// epsilon of either line are always accepted.
pub fn is_useful_from(outer: &Polygon, index: usize, from: &Point2D) -> bool {
    let p = outer.point(index);
    let prev = outer.point(outer.prev_index(index));
    let next = outer.point(outer.next_index(index));

    let side_in = prev.cross(&p, from);
    let side_out = p.cross(&next, from);

    // |cross| / edge length is the distance from `from` to the line
    let tolerance = LINE_EPSILON * (1.0 + from.distance(&p));
    if side_in.abs() <= tolerance * prev.distance(&p) || side_out.abs() <= tolerance * p.distance(&next) {
        return true;
    }

    (side_in > 0.0) != (side_out > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_planning::obstacle::Obstacle;

    const BUFFER: f64 = 0.01;

    fn insert(arena: &mut ObstacleArena, connector: &mut NodeConnector, outer: Polygon, max_distance: f64) -> ObstacleId {
        let id = arena.insert_with(|id| Obstacle::new(id, outer, BUFFER)).unwrap();
        let nearby: Vec<ObstacleId> = arena.ids().collect();
        connector.add_obstacle(arena, id, &nearby, max_distance);
        id
    }

    fn remove(arena: &mut ObstacleArena, connector: &mut NodeConnector, id: ObstacleId, max_distance: f64) {
        connector.clear_connections_to_removed_obstacle_nodes(arena, id);
        let removed = arena.remove(id).unwrap();
        let remaining: Vec<ObstacleId> = arena.ids().collect();
        let candidates: Vec<VertexRef> = arena.iter().flat_map(|o| o.vertex_refs()).collect();
        connector.reconnect_nodes_around_removed_obstacle(arena, removed.inner(), &candidates, &remaining, max_distance);
    }

    fn square(x: f64, y: f64, size: f64) -> Polygon {
        Polygon::rectangle(x, y, size, size).unwrap()
    }

    fn edge_set(arena: &ObstacleArena) -> Vec<(VertexRef, VertexRef)> {
        let mut edges: Vec<_> = arena
            .iter()
            .flat_map(|o| o.nodes().iter())
            .flat_map(|n| n.permanent_edges().iter().map(move |&p| canonical(n.vertex_ref(), p)))
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    fn assert_symmetric(arena: &ObstacleArena) {
        for obstacle in arena.iter() {
            for node in obstacle.nodes() {
                for &partner in node.permanent_edges() {
                    let back = arena.node(partner).unwrap();
                    assert!(back.permanent_edges().contains(&node.vertex_ref()));
                }
            }
        }
    }

    #[test]
    fn test_useful_filter_rejects_back_corner() {
        let unit = square(0.0, 0.0, 1.0);
        // Corner (1, 0): reachable from the right or from below, not diagonally behind it
        assert!(is_useful_from(&unit, 1, &Point2D::new(3.0, 0.5)));
        assert!(is_useful_from(&unit, 1, &Point2D::new(0.5, -1.0)));
        assert!(!is_useful_from(&unit, 1, &Point2D::new(3.0, -1.0)));
        // Opposite corner of the same square
        assert!(!is_useful_from(&unit, 2, &Point2D::new(0.0, 0.0)));
        // On a supporting line is always accepted
        assert!(is_useful_from(&unit, 1, &Point2D::new(-4.0, 0.0)));
    }

    #[test]
    fn test_single_square_connects_perimeter_only() {
        let mut arena = ObstacleArena::new();
        let mut connector = NodeConnector::new();
        let id = insert(&mut arena, &mut connector, square(0.0, 0.0, 1.0), 10.0);

        let obstacle = arena.get(id).unwrap();
        for node in obstacle.nodes() {
            assert_eq!(node.contained(), Some(false));
            assert_eq!(node.permanent_edges().len(), 2);
        }
        assert!(!NodeConnector::are_connected(&arena, VertexRef::new(id, 0), VertexRef::new(id, 2)));
        assert_symmetric(&arena);
    }

    #[test]
    fn test_max_distance_limits_edges() {
        let mut arena = ObstacleArena::new();
        let mut connector = NodeConnector::new();
        let a = insert(&mut arena, &mut connector, square(0.0, 0.0, 1.0), 5.0);
        let b = insert(&mut arena, &mut connector, square(20.0, 0.0, 1.0), 5.0);
        for (x, y) in edge_set(&arena) {
            assert_eq!(x.obstacle, y.obstacle);
        }
        assert!(arena.get(a).is_some() && arena.get(b).is_some());
    }

    #[test]
    fn test_swallowed_vertex_loses_edges() {
        let mut arena = ObstacleArena::new();
        let mut connector = NodeConnector::new();
        let small = insert(&mut arena, &mut connector, square(0.0, 0.0, 1.0), 10.0);
        let big = insert(&mut arena, &mut connector, square(-1.0, -1.0, 1.5), 10.0);

        // (0, 0) lies inside the big square
        let corner = arena.node(VertexRef::new(small, 0)).unwrap();
        assert_eq!(corner.contained(), Some(true));
        assert!(corner.permanent_edges().is_empty());
        assert_symmetric(&arena);

        remove(&mut arena, &mut connector, big, 10.0);
        let corner = arena.node(VertexRef::new(small, 0)).unwrap();
        assert_eq!(corner.contained(), Some(false));
        assert_eq!(corner.permanent_edges().len(), 2);
        assert_symmetric(&arena);
    }

    #[test]
    fn test_blocking_obstacle_severs_and_restores() {
        let mut arena = ObstacleArena::new();
        let mut connector = NodeConnector::new();
        insert(&mut arena, &mut connector, square(0.0, 0.0, 1.0), 20.0);
        insert(&mut arena, &mut connector, square(6.0, 0.0, 1.0), 20.0);
        let before = edge_set(&arena);
        assert!(before.iter().any(|(a, b)| a.obstacle != b.obstacle));

        let wall = insert(&mut arena, &mut connector, Polygon::rectangle(3.0, -5.0, 1.0, 11.0).unwrap(), 20.0);
        let during = edge_set(&arena);
        // Nothing links the two squares across the wall any more
        assert!(!during
            .iter()
            .any(|(a, b)| a.obstacle != b.obstacle && a.obstacle != wall && b.obstacle != wall));
        assert_symmetric(&arena);

        remove(&mut arena, &mut connector, wall, 20.0);
        assert_eq!(edge_set(&arena), before);
    }

    #[test]
    fn test_reachable_nodes_from_point() {
        let mut arena = ObstacleArena::new();
        let mut connector = NodeConnector::new();
        let id = insert(&mut arena, &mut connector, square(0.0, 0.0, 1.0), 10.0);
        let nearby = vec![id];

        let mut reachable = connector.reachable_nodes(&mut arena, Point2D::new(-2.0, 0.5), 10.0, &nearby);
        reachable.sort_by(|a, b| a.0.cmp(&b.0));
        let indices: Vec<usize> = reachable.iter().map(|(v, _)| v.index).collect();
        // The two left corners only
        assert_eq!(indices, vec![0, 3]);

        let inside = connector.reachable_nodes(&mut arena, Point2D::new(0.5, 0.5), 10.0, &nearby);
        assert!(inside.is_empty());

        let too_far = connector.reachable_nodes(&mut arena, Point2D::new(-2.0, 0.5), 1.0, &nearby);
        assert!(too_far.is_empty());

        // No transient or permanent state is touched by the query
        assert!(arena.iter().all(|o| o.nodes().iter().all(|n| n.path_node().transient_edges().is_empty())));
    }
}
