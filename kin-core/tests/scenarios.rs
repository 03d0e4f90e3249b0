//! End-to-end simulation scenarios exercising the full step loop.

#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use kin_constraint::Chandelier;
use kin_core::{BodyDef, Engine, Material};
use kin_geom::{ShapeSet, Sphere, TriMesh, Triangle};
use kin_types::{MassProperties, TickConfig, Velocity};
use nalgebra::{Point3, Vector3};

const TIMESTEP: f64 = 1.0 / 60.0;
const GRAVITY: Vector3<f64> = Vector3::new(0.0, -9.8, 0.0);

/// A static ground plane at y = 0, meshed as two large triangles.
fn ground_plane(material: Material) -> BodyDef {
    let mesh = TriMesh::new(vec![
        Triangle::new(
            Point3::new(-10.0, 0.0, -10.0),
            Point3::new(10.0, 0.0, -10.0),
            Point3::new(10.0, 0.0, 10.0),
        ),
        Triangle::new(
            Point3::new(-10.0, 0.0, -10.0),
            Point3::new(10.0, 0.0, 10.0),
            Point3::new(-10.0, 0.0, 10.0),
        ),
    ]);
    BodyDef::fixed()
        .with_material(material)
        .with_shapes(ShapeSet::new().with_mesh(mesh))
}

fn ball(radius: f64, position: Point3<f64>, material: Material) -> BodyDef {
    BodyDef::new(MassProperties::sphere(1.0, radius).unwrap())
        .with_material(material)
        .with_shapes(ShapeSet::new().with_sphere(Sphere::new(radius)))
        .with_position(position)
}

#[test]
fn test_free_fall_matches_analytic_trajectory() {
    let engine = Engine::new(TIMESTEP).unwrap();
    let mut scene = engine.create_scene().unwrap();
    scene.set_gravity(GRAVITY);
    let body = scene
        .create_body(BodyDef::new(
            MassProperties::new(1.0, nalgebra::Matrix3::identity()).unwrap(),
        ))
        .unwrap();

    scene.advance(1.0);

    let state = scene.body(body).unwrap();
    // Semi-implicit integration lands slightly below the analytic -4.9.
    assert_relative_eq!(state.pose.position.y, -4.9, epsilon = 0.1);
    assert_relative_eq!(state.velocity.linear.y, -9.8, epsilon = 0.05);
    assert_relative_eq!(state.pose.position.x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(state.pose.position.z, 0.0, epsilon = 1e-12);
}

#[test]
fn test_pendulum_at_rest_stays_at_rest() {
    let engine = Engine::new(TIMESTEP).unwrap();
    let mut scene = engine.create_scene().unwrap();
    scene.set_gravity(GRAVITY);
    let body = scene
        .create_body(BodyDef::new(MassProperties::sphere(1.0, 0.1).unwrap()))
        .unwrap();
    // Rod from a fixture straight above, exactly at rest length: gravity
    // pulls purely along the rod and the constraint cancels it.
    scene
        .create_sb_constraint(
            body,
            Box::new(Chandelier::new(
                Point3::new(0.0, 2.0, 0.0),
                Vector3::zeros(),
                2.0,
            )),
        )
        .unwrap();

    scene.advance(0.1);

    let state = scene.body(body).unwrap();
    assert_relative_eq!(state.pose.position.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(state.pose.position.y, 0.0, epsilon = 1e-9);
    assert!(state.velocity.linear.norm() < 1e-9);
}

#[test]
fn test_displaced_pendulum_stays_bounded() {
    let engine = Engine::new(TIMESTEP).unwrap();
    let mut scene = engine.create_scene().unwrap();
    scene.set_gravity(GRAVITY);
    let body = scene
        .create_body(
            BodyDef::new(MassProperties::sphere(1.0, 0.1).unwrap())
                .with_position(Point3::new(0.1, 0.0, 0.0)),
        )
        .unwrap();
    let fixture = Point3::new(0.0, 2.0, 0.0);
    scene
        .create_sb_constraint(body, Box::new(Chandelier::new(fixture, Vector3::zeros(), 2.0)))
        .unwrap();

    for _ in 0..120 {
        scene.advance(TIMESTEP);
        let state = scene.body(body).unwrap();
        // The swing never exceeds the release amplitude by much, and the
        // rod length never drifts far from 2.
        assert!(state.pose.position.x.abs() < 0.5);
        assert!(state.velocity.is_finite());
        let length = (state.pose.position - fixture).norm();
        assert_relative_eq!(length, 2.0, epsilon = 0.05);
    }
}

#[test]
fn test_sphere_comes_to_rest_on_mesh_plane() {
    let engine = Engine::new(TIMESTEP).unwrap();
    let mut scene = engine.create_scene().unwrap();
    scene.set_gravity(GRAVITY);
    let inert = Material::new(0.5, 0.0);
    scene.create_body(ground_plane(inert)).unwrap();
    let sphere = scene
        .create_body(ball(0.5, Point3::new(0.0, 1.0, 0.0), inert))
        .unwrap();

    scene.advance(2.0);

    let state = scene.body(sphere).unwrap();
    assert!(
        state.pose.position.y > 0.45 && state.pose.position.y < 0.55,
        "resting height {} out of range",
        state.pose.position.y
    );
    assert!(
        state.velocity.linear.norm() < 0.5,
        "residual speed {} too large",
        state.velocity.linear.norm()
    );
}

#[test]
fn test_elastic_bounce_preserves_speed() {
    // Zero impulse beta isolates the restitution response from the
    // penetration-correction term.
    let config = TickConfig::with_timestep(TIMESTEP).betas(0.0, 0.2);
    let mut scene = kin_core::Scene::new(config).unwrap();
    scene.set_gravity(GRAVITY);
    let bouncy = Material::new(0.0, 1.0);
    scene.create_body(ground_plane(bouncy)).unwrap();
    let sphere = scene
        .create_body(ball(0.5, Point3::new(0.0, 2.0, 0.0), bouncy))
        .unwrap();

    let mut min_vy = 0.0_f64;
    let mut max_vy = 0.0_f64;
    for _ in 0..120 {
        scene.advance(TIMESTEP);
        let vy = scene.body(sphere).unwrap().velocity.linear.y;
        min_vy = min_vy.min(vy);
        max_vy = max_vy.max(vy);
    }

    // Impact speed from a 1.5 m drop is well above the restitution clamp
    // knee, so the rebound keeps nearly all of it.
    assert!(min_vy < -5.0, "never reached impact speed: {min_vy}");
    let ratio = max_vy / -min_vy;
    assert!(
        (0.9..=1.05).contains(&ratio),
        "rebound ratio {ratio} outside 5% band ({max_vy} vs {min_vy})"
    );
}

#[test]
fn test_friction_decays_lateral_velocity() {
    let engine = Engine::new(TIMESTEP).unwrap();
    let mut scene = engine.create_scene().unwrap();
    scene.set_gravity(GRAVITY);
    let grippy = Material::new(1.0, 0.0);
    scene
        .create_body(
            BodyDef::fixed()
                .with_material(grippy)
                .with_shapes(ShapeSet::new().with_cuboid(kin_geom::Cuboid::new(5.0, 0.5, 5.0)))
                .with_position(Point3::new(0.0, -0.5, 0.0)),
        )
        .unwrap();
    let slab = scene
        .create_body(
            BodyDef::new(
                MassProperties::cuboid(1.0, Vector3::new(1.0, 0.1, 1.0)).unwrap(),
            )
            .with_material(grippy)
            .with_shapes(ShapeSet::new().with_cuboid(kin_geom::Cuboid::new(1.0, 0.1, 1.0)))
            .with_position(Point3::new(0.0, 0.15, 0.0))
            .with_velocity(Velocity::linear(Vector3::new(2.0, 0.0, 0.0))),
        )
        .unwrap();

    scene.advance(1.5);

    let state = scene.body(slab).unwrap();
    assert!(
        state.velocity.linear.x.abs() < 1.0,
        "lateral velocity {} did not decay",
        state.velocity.linear.x
    );
    assert!(state.velocity.is_finite());
    assert!(state.pose.position.y > -0.5);
}

#[test]
fn test_stale_handles_survive_the_loop() {
    let engine = Engine::new(TIMESTEP).unwrap();
    let mut scene = engine.create_scene().unwrap();
    scene.set_gravity(GRAVITY);
    let body = scene
        .create_body(ball(0.5, Point3::new(0.0, 1.0, 0.0), Material::default()))
        .unwrap();
    let constraint = scene
        .create_sb_constraint(
            body,
            Box::new(Chandelier::new(
                Point3::new(0.0, 3.0, 0.0),
                Vector3::zeros(),
                2.0,
            )),
        )
        .unwrap();
    assert!(scene.sb_constraint_enabled(constraint));

    assert!(scene.delete_body(body));

    // Setters on the stale handle are inert, not fatal.
    assert!(scene.body_mut(body).is_none());
    scene.set_sb_constraint_enabled(constraint, true);
    assert!(!scene.sb_constraint_enabled(constraint));

    scene.advance(0.5);
    assert_eq!(scene.body_count(), 0);
}

#[test]
fn test_contact_events_fire_once_per_touch() {
    let engine = Engine::new(TIMESTEP).unwrap();
    let mut scene = engine.create_scene().unwrap();
    scene.set_gravity(GRAVITY);
    let inert = Material::new(0.5, 0.0);
    scene.create_body(ground_plane(inert)).unwrap();
    scene
        .create_body(ball(0.5, Point3::new(0.0, 0.7, 0.0), inert))
        .unwrap();

    let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = hits.clone();
    scene.on_static_contact(Box::new(move |_, _| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }));

    scene.advance(1.0);
    // One begin edge for the whole resting contact, not one per step.
    assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
}
