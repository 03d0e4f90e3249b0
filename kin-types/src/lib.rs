//! Core data types for the kin rigid-body physics engine.
//!
//! This crate provides the foundational types shared by the rest of the
//! engine:
//!
//! - [`Pose`] / [`Velocity`] - Position, orientation and motion of rigid bodies
//! - [`MassProperties`] - Mass and inertia with cached inverses
//! - [`BodyHandle`] and friends - Generational handles into scene pools
//! - [`TickConfig`] - Timestep, iteration counts, solver betas, clamp ceilings
//! - [`Medium`] - Density and wind velocity of the surrounding fluid
//! - [`Angle`] - Explicit angle values (no implicit deg/rad)
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no simulation behavior; they are
//! the common language between the geometry layer, the constraint solvers and
//! the scene. Everything is double precision and SI units (meters, kilograms,
//! seconds, radians).
//!
//! # Handles
//!
//! Every entity owned by a scene is addressed through a `(slot, generation)`
//! handle. Deleting an entity bumps the slot's generation, so stale handles
//! become inert instead of dangling: accessors return `None`, setters are
//! no-ops, `enabled()` reports `false`.
//!
//! # Example
//!
//! ```
//! use kin_types::{Pose, Velocity};
//! use nalgebra::{Point3, Vector3};
//!
//! let pose = Pose::from_position(Point3::new(0.0, 2.0, 0.0));
//! let velocity = Velocity::linear(Vector3::new(1.0, 0.0, 0.0));
//!
//! // Velocity of a point 1 m above the origin of a spinning body
//! let spinning = Velocity::angular(Vector3::z());
//! let v = spinning.at_point(&Vector3::x());
//! assert!((v.y - 1.0).abs() < 1e-12);
//! # let _ = (pose, velocity);
//! ```

#![doc(html_root_url = "https://docs.rs/kin-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod angle;
mod body;
mod config;
mod error;
mod handle;
mod medium;

pub use angle::Angle;
pub use body::{BodyKind, MassProperties, Pose, Velocity};
pub use config::TickConfig;
pub use error::PhysicsError;
pub use handle::{
    AcceleratorHandle, BodyHandle, ConstraintSetHandle, DbConstraintHandle, RawHandle,
    SbConstraintHandle,
};
pub use medium::Medium;

// Re-export math types for convenience
pub use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;

/// Shared numeric guard: denominators and vector norms below this are treated
/// as degenerate and absorbed locally (zero impulse, no contact).
pub const EPSILON: f64 = 1e-5;
