//! Per-step body proxies seen by solvers.

use kin_types::EPSILON;
use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::jacobian::{Impulse, Nudge};

/// A lightweight per-step snapshot of a body.
///
/// Holds the precomputed inverse mass and world-frame inverse inertia along
/// with mutable pose and velocities. The scene populates one placeholder
/// per body at step start and writes changes back at step end; solvers only
/// ever see placeholders. A static body's placeholder carries zero inverse
/// mass and inverse inertia, so impulses and nudges leave it untouched.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placeholder {
    /// Inverse mass (1/kg); zero for static bodies.
    pub inv_mass: f64,
    /// World-frame inverse inertia tensor; zero for static bodies.
    pub inv_inertia: Matrix3<f64>,
    /// Linear velocity, world frame.
    pub linear_velocity: Vector3<f64>,
    /// Angular velocity, world frame.
    pub angular_velocity: Vector3<f64>,
    /// Position, world frame.
    pub position: Point3<f64>,
    /// Orientation, world frame.
    pub rotation: UnitQuaternion<f64>,
}

impl Placeholder {
    /// Snapshot for a dynamic body.
    #[must_use]
    pub fn new(
        inv_mass: f64,
        inv_inertia: Matrix3<f64>,
        linear_velocity: Vector3<f64>,
        angular_velocity: Vector3<f64>,
        position: Point3<f64>,
        rotation: UnitQuaternion<f64>,
    ) -> Self {
        Self {
            inv_mass,
            inv_inertia,
            linear_velocity,
            angular_velocity,
            position,
            rotation,
        }
    }

    /// Snapshot for a static body: infinite effective mass, zero velocity.
    #[must_use]
    pub fn fixed(position: Point3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self {
            inv_mass: 0.0,
            inv_inertia: Matrix3::zeros(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            position,
            rotation,
        }
    }

    /// Velocity of the material point currently at `point`.
    #[must_use]
    pub fn velocity_at(&self, point: Point3<f64>) -> Vector3<f64> {
        self.linear_velocity + self.angular_velocity.cross(&(point - self.position))
    }

    /// A body-local point in world coordinates.
    #[must_use]
    pub fn world_point(&self, local: Vector3<f64>) -> Point3<f64> {
        self.position + self.rotation.transform_vector(&local)
    }

    /// A body-local direction in world coordinates.
    #[must_use]
    pub fn world_vector(&self, local: Vector3<f64>) -> Vector3<f64> {
        self.rotation.transform_vector(&local)
    }

    /// Apply an impulse to the velocities.
    pub fn apply_impulse(&mut self, impulse: &Impulse) {
        self.linear_velocity += impulse.linear * self.inv_mass;
        self.angular_velocity += self.inv_inertia * impulse.angular;
    }

    /// Apply a nudge to position and orientation. The angular part rotates
    /// the body by an angle of `|I⁻¹·n_ang|` around that vector's
    /// direction; tiny rotations are dropped.
    pub fn apply_nudge(&mut self, nudge: &Nudge) {
        self.position += nudge.linear * self.inv_mass;
        let rotation_vector = self.inv_inertia * nudge.angular;
        let angle = rotation_vector.norm();
        if angle > EPSILON {
            let delta = UnitQuaternion::from_axis_angle(
                &nalgebra::Unit::new_unchecked(rotation_vector / angle),
                angle,
            );
            self.set_rotation(delta * self.rotation);
        }
    }

    /// Overwrite the linear velocity.
    pub fn set_linear_velocity(&mut self, velocity: Vector3<f64>) {
        self.linear_velocity = velocity;
    }

    /// Overwrite the angular velocity.
    pub fn set_angular_velocity(&mut self, velocity: Vector3<f64>) {
        self.angular_velocity = velocity;
    }

    /// Overwrite the position.
    pub fn set_position(&mut self, position: Point3<f64>) {
        self.position = position;
    }

    /// Overwrite the orientation, renormalizing with w ≥ 0 preferred.
    pub fn set_rotation(&mut self, rotation: UnitQuaternion<f64>) {
        let mut q = rotation.into_inner();
        if q.w < 0.0 {
            q = -q;
        }
        self.rotation = UnitQuaternion::new_normalize(q);
    }
}
