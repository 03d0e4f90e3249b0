//! Stored rigid-body state.

use kin_geom::{OctreeItemId, ShapeSet};
use kin_types::{BodyKind, MassProperties, Pose, Velocity};
use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A flat plate sampled for aerodynamic drag and lift.
///
/// Each surface samples the relative wind at its offset point, computes the
/// dynamic pressure `q = ρ·|v|²/2`, and accumulates drag along the wind and
/// lift along the surface normal's component perpendicular to it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AeroSurface {
    /// Sample point, body-local.
    pub offset: Vector3<f64>,
    /// Surface normal, body-local, unit.
    pub normal: Vector3<f64>,
    /// Surface area (m²).
    pub area: f64,
    /// Drag coefficient.
    pub drag_coefficient: f64,
    /// Lift coefficient.
    pub lift_coefficient: f64,
}

/// A rigid body owned by the scene.
pub struct Body {
    /// Human-readable name, for diagnostics.
    pub name: String,
    /// Kinematic class.
    pub kind: BodyKind,
    /// Mass and body-local inertia with cached inverses.
    pub mass: MassProperties,
    /// Restitution coefficient in `[0, 1]`.
    pub restitution: f64,
    /// Friction coefficient, ≥ 0.
    pub friction: f64,
    /// Linear drag factor, folded with the medium density.
    pub linear_drag: f64,
    /// Angular drag factor, folded with the medium density.
    pub angular_drag: f64,
    /// Collision group; bodies sharing a non-zero group never collide.
    pub group: u32,
    /// Position and orientation, world frame.
    pub pose: Pose,
    /// Linear and angular velocity, world frame.
    pub velocity: Velocity,
    /// Accumulated linear acceleration for the current step (scratch).
    pub linear_accel: Vector3<f64>,
    /// Accumulated angular acceleration for the current step (scratch).
    pub angular_accel: Vector3<f64>,
    /// Collision shapes, body-local.
    pub shapes: ShapeSet,
    /// Aerodynamic surfaces, body-local.
    pub aero_surfaces: Vec<AeroSurface>,
    pub(crate) octree_item: Option<OctreeItemId>,
    pub(crate) bounding_radius: f64,
}

impl Body {
    /// Whether the body never moves.
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.kind.is_static()
    }

    /// Bounding-sphere radius as of the last broad-phase reseat: the
    /// largest shape bounding radius including each shape's offset.
    #[must_use]
    pub const fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    pub(crate) fn refresh_bounding_radius(&mut self) {
        self.bounding_radius = self.shapes.bounding_radius();
    }
}
