use poly_nav::{NavError, PathError, PathStatus, PathWorld, PathWorldConfig, Point2D, Polygon};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn world(max_connection_distance: f64) -> PathWorld {
    let config = PathWorldConfig::default()
        .with_grid(0.0, 0.0, 400.0, 400.0)
        .with_tile_width(25.0)
        .with_max_connection_distance(max_connection_distance);
    PathWorld::new(config).unwrap()
}

fn square(cx: f64, cy: f64, half: f64) -> Polygon {
    Polygon::rectangle(cx - half, cy - half, 2.0 * half, 2.0 * half).unwrap()
}

fn random_polygon(rng: &mut StdRng) -> Polygon {
    let center = Point2D::new(rng.gen_range(20.0..380.0), rng.gen_range(20.0..380.0));
    let radius = rng.gen_range(4.0..25.0);
    if rng.gen_bool(0.5) {
        let aspect = rng.gen_range(0.3..1.0);
        Polygon::rectangle(center.x - radius, center.y - radius * aspect, 2.0 * radius, 2.0 * radius * aspect).unwrap()
    } else {
        let sides = rng.gen_range(3..8);
        Polygon::regular(center, radius, sides)
            .unwrap()
            .rotated(rng.gen_range(0.0..std::f64::consts::PI))
    }
}

/// Edge set keyed by coordinates, independent of obstacle ids
fn point_edges(world: &PathWorld) -> Vec<[f64; 4]> {
    let mut edges: Vec<[f64; 4]> = world
        .edge_pairs()
        .iter()
        .map(|&(a, b)| {
            let p = world.node(a).unwrap().point();
            let q = world.node(b).unwrap().point();
            if (p.x, p.y) <= (q.x, q.y) {
                [p.x, p.y, q.x, q.y]
            } else {
                [q.x, q.y, p.x, p.y]
            }
        })
        .collect();
    edges.sort_by(|a, b| a.partial_cmp(b).unwrap());
    edges
}

fn assert_containment_sound(world: &PathWorld) {
    for obstacle in world.obstacles() {
        for node in obstacle.nodes() {
            let inside_other = world
                .obstacles()
                .any(|o| o.id() != obstacle.id() && o.inner().contains_point(&node.point()));
            match node.contained() {
                Some(contained) => assert_eq!(contained, inside_other, "stale containment at {}", node.vertex_ref()),
                None => assert!(node.permanent_edges().is_empty()),
            }
        }
    }
}

fn assert_graph_consistent(world: &PathWorld) {
    assert!(world.edges_symmetric());
    assert_containment_sound(world);
    for obstacle in world.obstacles() {
        for node in obstacle.nodes() {
            assert!(node.path_node().transient_edges().is_empty());
            if node.is_concave() {
                assert!(node.permanent_edges().is_empty());
            }
        }
    }
}

#[test]
fn corridor_detour_goes_around_one_side() {
    init_logger();
    let mut world = world(150.0);
    world.insert_obstacle(Polygon::rectangle(170.0, 220.0, 60.0, 60.0).unwrap()).unwrap();
    world.insert_obstacle(Polygon::rectangle(170.0, 120.0, 60.0, 60.0).unwrap()).unwrap();
    world.insert_obstacle(square(200.0, 200.0, 5.0)).unwrap();

    let start = Point2D::new(170.0, 200.0);
    let end = Point2D::new(230.0, 200.0);
    let path = world.query_path(start, end, 100.0, 1000.0).unwrap();

    assert_eq!(path.points.len(), 4);
    assert_eq!(path.points[0], start);
    assert_eq!(path.points[3], end);
    let (a, b) = (path.points[1], path.points[2]);
    assert_eq!(a.x, 195.0);
    assert_eq!(b.x, 205.0);
    assert_eq!(a.y, b.y);
    assert!(a.y == 195.0 || a.y == 205.0);
    assert_eq!(world.last_status(), PathStatus::Success);
    assert_graph_consistent(&world);
}

#[test]
fn enclosed_start_cannot_hook_up() {
    init_logger();
    let mut world = world(150.0);
    world.insert_obstacle(square(100.0, 100.0, 10.0)).unwrap();

    let result = world.query_path(Point2D::new(100.0, 100.0), Point2D::new(150.0, 100.0), 1.0, 1000.0);
    assert_eq!(result, Err(PathError::StartUnreachable));
    assert_eq!(world.last_status(), PathStatus::StartUnreachable);

    // Same with a generous hookup: every corner is behind the obstacle's own wall
    let result = world.query_path(Point2D::new(100.0, 100.0), Point2D::new(150.0, 100.0), 100.0, 1000.0);
    assert_eq!(result, Err(PathError::StartUnreachable));
}

#[test]
fn enclosed_end_cannot_hook_up() {
    let mut world = world(150.0);
    world.insert_obstacle(square(100.0, 100.0, 10.0)).unwrap();

    let result = world.query_path(Point2D::new(50.0, 100.0), Point2D::new(100.0, 100.0), 100.0, 1000.0);
    assert_eq!(result, Err(PathError::EndUnreachable));
    assert_eq!(world.last_status(), PathStatus::EndUnreachable);
    assert_graph_consistent(&world);
}

#[test]
fn tight_budget_exhausts_search() {
    init_logger();
    let mut world = world(150.0);
    world.insert_obstacle(square(100.0, 100.0, 5.0)).unwrap();
    let start = Point2D::new(80.0, 100.0);
    let end = Point2D::new(120.0, 100.0);

    // Enough for the straight line, not for any detour
    let result = world.query_path(start, end, 100.0, start.distance(&end) + 1e-6);
    assert_eq!(result, Err(PathError::Exhausted));
    assert_eq!(world.last_status(), PathStatus::Exhausted);

    let result = world.query_path(start, end, 100.0, start.distance(&end) - 1e-6);
    assert_eq!(result, Err(PathError::TooFar));

    // Unconstrained, the same query succeeds
    let path = world.query_path(start, end, 100.0, 1000.0).unwrap();
    assert!(path.length() > start.distance(&end));
    assert_graph_consistent(&world);
}

#[test]
fn fenced_off_end_exhausts_search() {
    let mut world = world(150.0);
    // A closed ring of four overlapping walls around the end point
    world.insert_obstacle(Polygon::rectangle(180.0, 180.0, 40.0, 5.0).unwrap()).unwrap();
    world.insert_obstacle(Polygon::rectangle(180.0, 215.0, 40.0, 5.0).unwrap()).unwrap();
    world.insert_obstacle(Polygon::rectangle(180.0, 182.0, 5.0, 36.0).unwrap()).unwrap();
    world.insert_obstacle(Polygon::rectangle(215.0, 182.0, 5.0, 36.0).unwrap()).unwrap();
    // Something to hook into on either side of the ring
    world.insert_obstacle(square(120.0, 200.0, 3.0)).unwrap();
    world.insert_obstacle(square(200.0, 205.0, 2.0)).unwrap();

    let result = world.query_path(Point2D::new(100.0, 200.0), Point2D::new(200.0, 200.0), 30.0, 1000.0);
    assert_eq!(result, Err(PathError::Exhausted));
    assert_graph_consistent(&world);
}

#[test]
fn straight_path_ignores_graph_state() {
    let mut world = world(120.0);
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        world.insert_obstacle(random_polygon(&mut rng)).unwrap();
    }

    // Left of every obstacle
    let start = Point2D::new(-50.0, -50.0);
    let end = Point2D::new(-50.0, 450.0);
    assert!(!world.segment_blocked(start, end));
    let first = world.query_path(start, end, 10.0, 1000.0).unwrap();
    assert_eq!(first.points, vec![start, end]);

    world.insert_obstacle(square(300.0, 300.0, 10.0)).unwrap();
    let second = world.query_path(start, end, 10.0, 1000.0).unwrap();
    assert_eq!(second, first);

    let far_away = Point2D::new(500.0, 500.0);
    let path = world.query_path(far_away, Point2D::new(520.0, 500.0), 1.0, 30.0).unwrap();
    assert_eq!(path.points.len(), 2);
}

#[test]
fn insert_then_remove_restores_edges() {
    init_logger();
    let mut world = world(120.0);
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..15 {
        world.insert_obstacle(random_polygon(&mut rng)).unwrap();
    }
    let before = world.edge_pairs();
    assert!(!before.is_empty());

    for _ in 0..10 {
        let id = world.insert_obstacle(random_polygon(&mut rng)).unwrap();
        assert_graph_consistent(&world);
        world.remove_obstacle(id).unwrap();
        assert_eq!(world.edge_pairs(), before);
        assert_graph_consistent(&world);
    }
}

#[test]
fn incremental_graph_matches_fresh_build() {
    let mut rng = StdRng::seed_from_u64(2024);
    let polygons: Vec<Polygon> = (0..20).map(|_| random_polygon(&mut rng)).collect();

    let mut incremental = world(120.0);
    let ids: Vec<_> = polygons
        .iter()
        .map(|p| incremental.insert_obstacle(p.clone()).unwrap())
        .collect();
    for &id in ids.iter().step_by(3) {
        incremental.remove_obstacle(id).unwrap();
    }

    let mut fresh = world(120.0);
    for (i, polygon) in polygons.iter().enumerate().rev() {
        if i % 3 != 0 {
            fresh.insert_obstacle(polygon.clone()).unwrap();
        }
    }

    assert_eq!(incremental.obstacle_count(), fresh.obstacle_count());
    assert_eq!(point_edges(&incremental), point_edges(&fresh));
}

#[test]
fn removed_obstacle_leaves_no_dangling_edges() {
    let mut world = world(120.0);
    let mut rng = StdRng::seed_from_u64(11);
    let ids: Vec<_> = (0..12)
        .map(|_| world.insert_obstacle(random_polygon(&mut rng)).unwrap())
        .collect();

    for &id in &ids[..6] {
        world.remove_obstacle(id).unwrap();
        assert!(world
            .edge_pairs()
            .iter()
            .all(|(a, b)| a.obstacle != id && b.obstacle != id));
        assert!(world.obstacle(id).is_none());
        assert_graph_consistent(&world);
    }
    assert!(matches!(world.remove_obstacle(ids[0]), Err(NavError::UnknownObstacle(_))));
}

#[test]
fn moving_obstacle_keeps_graph_consistent() {
    init_logger();
    let mut world = world(120.0);
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..12 {
        world.insert_obstacle(random_polygon(&mut rng)).unwrap();
    }
    let mover = world.insert_obstacle(square(200.0, 200.0, 15.0)).unwrap();

    for _ in 0..10 {
        let (dx, dy) = (rng.gen_range(-40.0..40.0), rng.gen_range(-40.0..40.0));
        world.translate_obstacle(mover, dx, dy).unwrap();
        assert_graph_consistent(&world);
    }
    world.scale_obstacle(mover, 1.5).unwrap();
    assert_graph_consistent(&world);
    world.reshape_obstacle(mover, square(50.0, 50.0, 3.0)).unwrap();
    assert_graph_consistent(&world);

    // Putting it back where it started matches a fresh insert there
    let current = world.obstacle(mover).unwrap().outer().clone();
    let before = point_edges(&world);
    world.remove_obstacle(mover).unwrap();
    world.insert_obstacle(current).unwrap();
    assert_eq!(point_edges(&world), before);
}

#[test]
fn queries_leave_no_transient_edges() {
    let mut world = world(120.0);
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..15 {
        world.insert_obstacle(random_polygon(&mut rng)).unwrap();
    }
    for _ in 0..20 {
        let start = Point2D::new(rng.gen_range(0.0..400.0), rng.gen_range(0.0..400.0));
        let end = Point2D::new(rng.gen_range(0.0..400.0), rng.gen_range(0.0..400.0));
        if let Ok(path) = world.query_path(start, end, 150.0, 2000.0) {
            assert_eq!(path.points.first(), Some(&start));
            assert_eq!(path.points.last(), Some(&end));
            assert!(path.length() >= start.distance(&end) - 1e-9);
            for pair in path.points.windows(2) {
                assert!(!world.segment_blocked(pair[0], pair[1]));
            }
        }
        assert_ne!(world.last_status(), PathStatus::NoResult);
        assert_graph_consistent(&world);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_insert_remove_keeps_edges_symmetric(
        ops in prop::collection::vec((20.0..380.0f64, 20.0..380.0f64, 3.0..20.0f64, any::<bool>()), 1..16)
    ) {
        let mut world = world(100.0);
        let mut live = Vec::new();
        for (x, y, half, remove) in ops {
            if remove && !live.is_empty() {
                let id = live.remove(0);
                world.remove_obstacle(id).unwrap();
                prop_assert!(world.edge_pairs().iter().all(|(a, b)| a.obstacle != id && b.obstacle != id));
            } else {
                live.push(world.insert_obstacle(square(x, y, half)).unwrap());
            }
            prop_assert!(world.edges_symmetric());
        }
    }
}
