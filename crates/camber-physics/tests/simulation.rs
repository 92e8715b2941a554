//! End-to-end simulation tests: stepping, broadphase registration,
//! contacts, sleep, events, and queries through the public API.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use camber_physics::{
    CollisionEvent, CollisionObject, FilterMode, FixedVec3, PhysicsCallbacks, PhysicsError,
    PhysicsWorld, PointConstraint, QueryFilter, ShapeHandle, SharedShape, WorldConfig,
    COLLISION_MASK_ALL, DEFAULT_CELL_SIZE, GRAVITY,
};
use glam::{Quat, Vec2, Vec3};

const DT: f32 = 1.0 / 60.0;

fn make_world() -> PhysicsWorld {
    let mut world = PhysicsWorld::new(WorldConfig::default());
    world.init_grid(Vec2::splat(480.0), DEFAULT_CELL_SIZE);
    world
}

fn add_ground(world: &mut PhysicsWorld) -> camber_physics::ObjectKey {
    // Large static slab with its top face at y = 0.
    world.add_object(CollisionObject::new_static(
        ShapeHandle::boxed(Vec3::new(100.0, 1.0, 100.0)),
        FixedVec3::from_vec3(Vec3::new(0.0, -1.0, 0.0)),
        Quat::IDENTITY,
    ))
}

fn add_ball(world: &mut PhysicsWorld, position: Vec3, mass: f32) -> camber_physics::ObjectKey {
    world.add_object(CollisionObject::new_dynamic(
        ShapeHandle::sphere(0.5),
        mass,
        FixedVec3::from_vec3(position),
        Quat::IDENTITY,
    ))
}

#[test]
fn test_step_without_grid_is_noop() {
    let mut world = PhysicsWorld::new(WorldConfig::default());
    let ball = add_ball(&mut world, Vec3::new(0.0, 5.0, 0.0), 10.0);
    world.simulate_step(DT, 0, None);
    let object = world.object(ball).unwrap();
    assert!((object.position.y.to_f32() - 5.0).abs() < 1e-6);
}

#[test]
fn test_free_fall_matches_gravity() {
    let mut world = make_world();
    let ball = add_ball(&mut world, Vec3::new(0.0, 100.0, 0.0), 10.0);
    for _ in 0..60 {
        world.simulate_step(DT, 0, None);
    }
    let body = world.object(ball).unwrap().body().unwrap();
    assert!(
        (body.linear_velocity.y + GRAVITY).abs() < 0.05,
        "vy after one second: {}",
        body.linear_velocity.y
    );
}

#[test]
fn test_ball_settles_on_ground() {
    let mut world = make_world();
    add_ground(&mut world);
    let ball = add_ball(&mut world, Vec3::new(0.0, 3.0, 0.0), 10.0);

    for _ in 0..900 {
        world.simulate_step(DT, 0, None);
    }

    let object = world.object(ball).unwrap();
    let y = object.position.y.to_f32();
    assert!(
        (0.3..=0.8).contains(&y),
        "ball should rest near its radius above the slab, got y = {y}"
    );
    let body = object.body().unwrap();
    assert!(
        body.linear_velocity.length() < 0.5,
        "residual velocity: {:?}",
        body.linear_velocity
    );
}

#[test]
fn test_applied_impulses_never_negative() {
    let mut world = make_world();
    add_ground(&mut world);
    add_ball(&mut world, Vec3::new(0.0, 2.0, 0.0), 10.0);
    add_ball(&mut world, Vec3::new(0.3, 4.0, 0.1), 5.0);

    let mut saw_contact = false;
    for _ in 0..600 {
        world.simulate_step(DT, 0, None);
        for event in world.drain_events() {
            saw_contact = true;
            assert!(
                event.applied_impulse >= 0.0,
                "normal impulse must never pull bodies together: {}",
                event.applied_impulse
            );
            assert!(event.impact_velocity >= 0.0);
        }
    }
    assert!(saw_contact, "falling balls should have produced contacts");
}

#[test]
fn test_zero_mass_body_never_moves() {
    let mut world = make_world();
    let ball = add_ball(&mut world, Vec3::new(0.0, 5.0, 0.0), 0.0);
    for _ in 0..30 {
        world.simulate_step(DT, 0, None);
    }
    let object = world.object(ball).unwrap();
    assert!((object.position.y.to_f32() - 5.0).abs() < 1e-6);
}

#[test]
fn test_wide_static_registers_in_multiple_cells() {
    let mut world = make_world();
    // 26 units wide: wider than one 24-unit cell, so it must be reachable
    // from at least two cells in X.
    let key = world.add_object(CollisionObject::new_static(
        ShapeHandle::boxed(Vec3::new(13.0, 1.0, 1.0)),
        FixedVec3::ZERO,
        Quat::IDENTITY,
    ));
    let grid = world.grid().unwrap();
    let left = grid.cell_coord(Vec3::new(-12.5, 0.0, 0.0)).unwrap();
    let right = grid.cell_coord(Vec3::new(12.5, 0.0, 0.0)).unwrap();
    assert_ne!(left.0, right.0, "box should span two cell columns");
    for (x, z) in [left, right] {
        let cell = grid.cell_at(x, z).expect("spanned cell should exist");
        assert!(cell.statics.contains(&key));
    }
}

#[test]
fn test_contact_pair_found_once_per_pair() {
    let mut world = make_world();
    let a = add_ball(&mut world, Vec3::new(0.0, 50.0, 0.0), 10.0);
    let b = add_ball(&mut world, Vec3::new(0.9, 50.0, 0.0), 10.0);
    world.object_mut(a).unwrap().body_mut().unwrap().linear_velocity = Vec3::new(1.0, 0.0, 0.0);
    world.object_mut(b).unwrap().body_mut().unwrap().linear_velocity = Vec3::new(-1.0, 0.0, 0.0);

    world.simulate_step(DT, 0, None);

    let count = |key: camber_physics::ObjectKey| {
        world
            .object(key)
            .unwrap()
            .contact_pairs()
            .iter()
            .filter(|p| {
                (p.body_a == a && p.body_b == b) || (p.body_a == b && p.body_b == a)
            })
            .count()
    };
    assert_eq!(
        count(a) + count(b),
        1,
        "the overlapping pair must be detected exactly once"
    );
}

#[test]
fn test_body_passing_over_static_ceiling_finds_no_contacts() {
    let mut world = make_world();
    // Tall pillar centered at the origin, top face at y = 5.
    world.add_object(CollisionObject::new_static(
        ShapeHandle::boxed(Vec3::new(1.0, 5.0, 1.0)),
        FixedVec3::ZERO,
        Quat::IDENTITY,
    ));

    // Flying well above the cell's static ceiling: no pairs.
    let high = add_ball(&mut world, Vec3::new(0.0, 12.0, 0.0), 10.0);
    world.object_mut(high).unwrap().body_mut().unwrap().linear_velocity =
        Vec3::new(2.0, 0.0, 0.0);
    // Touching the pillar's top face: the ceiling gate must not cull it.
    let low = add_ball(&mut world, Vec3::new(0.0, 5.49, 0.0), 10.0);

    world.simulate_step(DT, 0, None);

    assert!(
        world.object(high).unwrap().contact_pairs().is_empty(),
        "a body above the static ceiling must produce no static pairs"
    );
    assert!(
        !world.object(low).unwrap().contact_pairs().is_empty(),
        "a body on the pillar's top face must still make contact"
    );
}

#[test]
fn test_ghost_reports_overlap_without_response() {
    let mut world = make_world();
    let ghost = world.add_object(CollisionObject::new_ghost(
        ShapeHandle::sphere(2.0),
        FixedVec3::from_vec3(Vec3::new(0.0, 50.0, 0.0)),
        Quat::IDENTITY,
    ));
    let ball = add_ball(&mut world, Vec3::new(0.0, 50.5, 0.0), 10.0);
    world.object_mut(ball).unwrap().body_mut().unwrap().linear_velocity =
        Vec3::new(2.0, 0.0, 0.0);

    world.simulate_step(DT, 0, None);

    let events = world.object_mut(ghost).unwrap().take_events();
    assert!(!events.is_empty(), "ghost should record the overlap");
    for event in &events {
        assert_eq!(event.applied_impulse, 0.0, "ghosts never apply impulses");
        assert_eq!(event.other, ball);
    }
    // The ball keeps its horizontal velocity; only gravity acted on it.
    let body = world.object(ball).unwrap().body().unwrap();
    assert!((body.linear_velocity.x - 2.0).abs() < 0.01);
}

#[test]
fn test_ghost_reports_proximity_before_touching() {
    let mut world = make_world();
    let ghost = world.add_object(CollisionObject::new_ghost(
        ShapeHandle::sphere(2.0),
        FixedVec3::from_vec3(Vec3::new(0.0, 50.0, 0.0)),
        Quat::IDENTITY,
    ));
    // Hovers a few millimeters outside the ghost sphere, inside the
    // contact prediction margin.
    let ball = add_ball(&mut world, Vec3::new(0.0, 52.508, 0.0), 10.0);

    world.simulate_step(DT, 0, None);

    let events = world.object_mut(ghost).unwrap().take_events();
    assert!(
        !events.is_empty(),
        "ghost should report the near miss as an event"
    );
    for event in &events {
        assert_eq!(event.other, ball);
        assert_eq!(event.applied_impulse, 0.0, "ghosts never apply impulses");
        assert!(
            event.depth < 0.0 && event.depth > -0.01,
            "separated contact keeps its negative depth, got {}",
            event.depth
        );
    }
}

#[test]
fn test_collision_callback_fires() {
    struct CountHits(Arc<AtomicU32>);
    impl PhysicsCallbacks for CountHits {
        fn on_collide(&mut self, _object: &mut CollisionObject, event: &CollisionEvent) {
            assert!(event.depth > 0.0);
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    let mut world = make_world();
    add_ground(&mut world);
    let ball = add_ball(&mut world, Vec3::new(0.0, 1.0, 0.0), 10.0);
    let hits = Arc::new(AtomicU32::new(0));
    world.object_mut(ball).unwrap().callbacks = Some(Box::new(CountHits(hits.clone())));

    for _ in 0..120 {
        world.simulate_step(DT, 0, None);
    }
    assert!(hits.load(Ordering::Relaxed) > 0, "ball should have hit the slab");
}

#[test]
fn test_ray_hits_static_box() {
    let mut world = make_world();
    let target = world.add_object(CollisionObject::new_static(
        ShapeHandle::boxed(Vec3::ONE),
        FixedVec3::from_vec3(Vec3::new(50.0, 0.0, 0.0)),
        Quat::IDENTITY,
    ));

    let hit = world
        .test_line_collision(
            FixedVec3::from_vec3(Vec3::new(40.0, 0.0, 0.0)),
            FixedVec3::from_vec3(Vec3::new(60.0, 0.0, 0.0)),
            COLLISION_MASK_ALL,
            &QueryFilter::default(),
        )
        .expect("ray should hit the box");
    assert_eq!(hit.object, Some(target));
    assert!((hit.fraction - 0.45).abs() < 1e-3, "fraction {}", hit.fraction);
    assert!((hit.position.x - 49.0).abs() < 1e-2);
    assert!(hit.normal.x < -0.99);

    // Parallel ray above the box misses.
    assert!(world
        .test_line_collision(
            FixedVec3::from_vec3(Vec3::new(40.0, 5.0, 0.0)),
            FixedVec3::from_vec3(Vec3::new(60.0, 5.0, 0.0)),
            COLLISION_MASK_ALL,
            &QueryFilter::default(),
        )
        .is_none());
}

#[test]
fn test_ray_filter_modes() {
    let mut world = make_world();
    let near = world.add_object(CollisionObject::new_static(
        ShapeHandle::boxed(Vec3::ONE),
        FixedVec3::from_vec3(Vec3::new(20.0, 0.0, 0.0)),
        Quat::IDENTITY,
    ));
    let far = world.add_object(CollisionObject::new_static(
        ShapeHandle::boxed(Vec3::ONE),
        FixedVec3::from_vec3(Vec3::new(60.0, 0.0, 0.0)),
        Quat::IDENTITY,
    ));
    let start = FixedVec3::from_vec3(Vec3::new(0.0, 0.0, 0.0));
    let end = FixedVec3::from_vec3(Vec3::new(100.0, 0.0, 0.0));

    let hit = world
        .test_line_collision(start, end, COLLISION_MASK_ALL, &QueryFilter::default())
        .unwrap();
    assert_eq!(hit.object, Some(near));

    let exclude_near = QueryFilter {
        objects: &[near],
        ..QueryFilter::default()
    };
    let hit = world
        .test_line_collision(start, end, COLLISION_MASK_ALL, &exclude_near)
        .unwrap();
    assert_eq!(hit.object, Some(far));

    let only_far = QueryFilter {
        mode: FilterMode::IncludeOnly,
        objects: &[far],
        ..QueryFilter::default()
    };
    let hit = world
        .test_line_collision(start, end, COLLISION_MASK_ALL, &only_far)
        .unwrap();
    assert_eq!(hit.object, Some(far));
}

#[test]
fn test_convex_sweep_stops_short_of_ray_hit() {
    let mut world = make_world();
    world.add_object(CollisionObject::new_static(
        ShapeHandle::boxed(Vec3::ONE),
        FixedVec3::from_vec3(Vec3::new(50.0, 0.0, 0.0)),
        Quat::IDENTITY,
    ));
    let start = FixedVec3::from_vec3(Vec3::new(40.0, 0.0, 0.0));
    let end = FixedVec3::from_vec3(Vec3::new(60.0, 0.0, 0.0));

    let ray = world
        .test_line_collision(start, end, COLLISION_MASK_ALL, &QueryFilter::default())
        .unwrap();
    let sweep = world
        .test_convex_sweep(
            &SharedShape::ball(0.5),
            Quat::IDENTITY,
            start,
            end,
            COLLISION_MASK_ALL,
            &QueryFilter::default(),
        )
        .unwrap()
        .expect("sweep should hit the box");
    assert!(
        sweep.fraction < ray.fraction,
        "swept sphere must stop a radius early: sweep {} ray {}",
        sweep.fraction,
        ray.fraction
    );
}

#[test]
fn test_sweep_rejects_non_convex_shape() {
    let world = make_world();
    let handle = ShapeHandle::compound(vec![
        (Vec3::new(-1.0, 0.0, 0.0), Quat::IDENTITY, ShapeHandle::sphere(0.5)),
        (Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, ShapeHandle::sphere(0.5)),
    ])
    .unwrap();
    let ShapeHandle::Owned(compound) = handle else {
        panic!("compound constructor returns an owned shape");
    };
    let result = world.test_convex_sweep(
        &compound,
        Quat::IDENTITY,
        FixedVec3::ZERO,
        FixedVec3::from_vec3(Vec3::new(10.0, 0.0, 0.0)),
        COLLISION_MASK_ALL,
        &QueryFilter::default(),
    );
    assert!(matches!(result, Err(PhysicsError::NonConvexSweep)));
}

#[test]
fn test_removed_object_no_longer_hit() {
    let mut world = make_world();
    let target = world.add_object(CollisionObject::new_static(
        ShapeHandle::boxed(Vec3::ONE),
        FixedVec3::from_vec3(Vec3::new(50.0, 0.0, 0.0)),
        Quat::IDENTITY,
    ));
    let start = FixedVec3::from_vec3(Vec3::new(40.0, 0.0, 0.0));
    let end = FixedVec3::from_vec3(Vec3::new(60.0, 0.0, 0.0));
    assert!(world
        .test_line_collision(start, end, COLLISION_MASK_ALL, &QueryFilter::default())
        .is_some());

    let removed = world.remove_object(target).expect("object should come back");
    assert!((removed.position.x.to_f32() - 50.0).abs() < 1e-4);
    assert!(world
        .test_line_collision(start, end, COLLISION_MASK_ALL, &QueryFilter::default())
        .is_none());
    assert_eq!(world.object_count(), 0);
}

#[test]
fn test_moveable_list_toggle_pauses_body() {
    let mut world = make_world();
    let ball = add_ball(&mut world, Vec3::new(0.0, 50.0, 0.0), 10.0);
    assert!(world.is_valid_body(ball));

    world.remove_from_moveable_list(ball);
    assert!(!world.is_valid_body(ball));
    for _ in 0..30 {
        world.simulate_step(DT, 0, None);
    }
    let y = world.object(ball).unwrap().position.y.to_f32();
    assert!((y - 50.0).abs() < 1e-6, "paused body moved to y = {y}");

    world.add_to_moveable_list(ball);
    assert!(world.is_valid_body(ball));
    for _ in 0..30 {
        world.simulate_step(DT, 0, None);
    }
    assert!(world.object(ball).unwrap().position.y.to_f32() < 50.0);
}

#[test]
fn test_point_constraint_pulls_body_toward_anchor() {
    let mut world = make_world();
    let ball = add_ball(&mut world, Vec3::new(0.0, 50.0, 0.0), 10.0);
    world.add_constraint(Box::new(PointConstraint::new(
        ball,
        FixedVec3::from_vec3(Vec3::new(0.0, 52.0, 0.0)),
        Vec3::ZERO,
        50.0,
    )));

    world.simulate_step(DT, 0, None);
    let body = world.object(ball).unwrap().body().unwrap();
    assert!(
        body.linear_velocity.y > 0.0,
        "constraint impulse should beat one step of gravity: {:?}",
        body.linear_velocity
    );
}

#[test]
fn test_pre_integrate_hook_runs_each_step() {
    let mut world = make_world();
    add_ball(&mut world, Vec3::new(0.0, 50.0, 0.0), 10.0);
    let mut calls = 0;
    let mut hook = |_world: &mut PhysicsWorld, _dt: f32, iteration: u32| {
        assert_eq!(iteration, 3);
        calls += 1;
    };
    for _ in 0..5 {
        world.simulate_step(DT, 3, Some(&mut hook));
    }
    assert_eq!(calls, 5);
}

#[test]
fn test_far_from_origin_resting_is_stable() {
    // The whole scene sits near the edge of the playable area; fixed-point
    // positions keep the resting contact from jittering.
    let mut world = make_world();
    let offset = Vec3::new(200.0, 0.0, -200.0);
    world.add_object(CollisionObject::new_static(
        ShapeHandle::boxed(Vec3::new(10.0, 1.0, 10.0)),
        FixedVec3::from_vec3(offset + Vec3::new(0.0, -1.0, 0.0)),
        Quat::IDENTITY,
    ));
    let ball = add_ball(&mut world, offset + Vec3::new(0.0, 2.0, 0.0), 10.0);

    for _ in 0..900 {
        world.simulate_step(DT, 0, None);
    }
    let object = world.object(ball).unwrap();
    let rel = object.position.to_vec3() - offset;
    assert!(
        (0.3..=0.8).contains(&rel.y),
        "ball should rest on the distant slab, got rel y = {}",
        rel.y
    );
    assert!(Vec2::new(rel.x, rel.z).length() < 0.5, "ball drifted: {rel:?}");
}
