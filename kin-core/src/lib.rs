//! Scene management and the fixed-timestep simulation loop.
//!
//! A [`Scene`] owns rigid bodies, constraints, accelerators, and a
//! broad-phase octree, all addressed through generational handles. Each
//! call to [`Scene::advance`] slices elapsed time into fixed steps; every
//! step applies forces, runs the iterative impulse and nudge solvers, and
//! detects collisions whose contacts constrain the next step.
//!
//! # Example
//!
//! ```
//! use kin_core::{BodyDef, Engine};
//! use kin_types::MassProperties;
//! use nalgebra::Vector3;
//!
//! let engine = Engine::new(1.0 / 60.0).unwrap();
//! let mut scene = engine.create_scene().unwrap();
//! scene.set_gravity(Vector3::new(0.0, -9.8, 0.0));
//!
//! let ball = scene
//!     .create_body(BodyDef::new(MassProperties::sphere(1.0, 0.5).unwrap()))
//!     .unwrap();
//! scene.advance(1.0);
//! assert!(scene.body(ball).unwrap().pose.position.y < 0.0);
//! ```

#![warn(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]

pub mod body;
pub mod engine;
pub mod events;
pub mod pool;
pub mod scene;

pub use body::{AeroSurface, Body};
pub use engine::{BodyDef, Engine, Material};
pub use events::{ContactSink, EventSinks, StepSink};
pub use pool::Pool;
pub use scene::Scene;
