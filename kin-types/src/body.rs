//! Rigid body state types.
//!
//! [`Pose`] and [`Velocity`] describe where a body is and how it moves, both
//! in world coordinates. [`MassProperties`] carries mass and the body-local
//! inertia tensor together with their cached inverses.

use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

use crate::{PhysicsError, EPSILON};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kinematic class of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BodyKind {
    /// Infinite effective mass; never moves, velocities stay zero.
    Static,
    /// Finite mass; integrated and solved every step.
    #[default]
    Dynamic,
}

impl BodyKind {
    /// Whether this is the static class.
    #[must_use]
    pub const fn is_static(self) -> bool {
        matches!(self, Self::Static)
    }
}

/// Position and orientation of a rigid body in world coordinates.
///
/// The orientation is a unit quaternion, kept normalized (with `w >= 0`
/// preferred) after every mutation the engine performs.
///
/// # Example
///
/// ```
/// use kin_types::Pose;
/// use nalgebra::Point3;
///
/// let pose = Pose::from_position(Point3::new(1.0, 2.0, 3.0));
/// let world = pose.transform_point(&Point3::new(1.0, 0.0, 0.0));
/// assert_eq!(world, Point3::new(2.0, 2.0, 3.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position in world coordinates.
    pub position: Point3<f64>,
    /// Orientation as a unit quaternion (x, y, z, w).
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// The identity pose (origin, no rotation).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Create a pose from position only (identity rotation).
    #[must_use]
    pub fn from_position(position: Point3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Create a pose from position and rotation.
    #[must_use]
    pub const fn new(position: Point3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }

    /// Transform a point from local to world coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f64>) -> Point3<f64> {
        self.position + self.rotation * local.coords
    }

    /// Transform a vector from local to world coordinates (rotation only).
    #[must_use]
    pub fn transform_vector(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * local
    }

    /// Transform a point from world to local coordinates.
    #[must_use]
    pub fn inverse_transform_point(&self, world: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation.inverse() * (world - self.position))
    }

    /// Transform a vector from world to local coordinates.
    #[must_use]
    pub fn inverse_transform_vector(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse() * world
    }

    /// Renormalize the orientation, preferring `w >= 0`.
    ///
    /// Quaternions `q` and `-q` describe the same rotation; canonicalizing the
    /// sign keeps comparisons and interpolation stable.
    pub fn renormalize(&mut self) {
        let mut q = self.rotation.into_inner();
        if q.w < 0.0 {
            q = -q;
        }
        self.rotation = UnitQuaternion::new_normalize(q);
    }

    /// Check that position and orientation contain no `NaN` or `Inf`.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|x| x.is_finite())
            && self.rotation.coords.iter().all(|x| x.is_finite())
    }
}

/// Linear and angular velocity of a rigid body, world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Velocity {
    /// Linear velocity (m/s).
    pub linear: Vector3<f64>,
    /// Angular velocity (rad/s).
    pub angular: Vector3<f64>,
}

impl Velocity {
    /// Create a velocity from linear and angular parts.
    #[must_use]
    pub const fn new(linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        Self { linear, angular }
    }

    /// Zero velocity (at rest).
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Linear velocity only.
    #[must_use]
    pub fn linear(v: Vector3<f64>) -> Self {
        Self {
            linear: v,
            angular: Vector3::zeros(),
        }
    }

    /// Angular velocity only.
    #[must_use]
    pub fn angular(omega: Vector3<f64>) -> Self {
        Self {
            linear: Vector3::zeros(),
            angular: omega,
        }
    }

    /// Velocity of a point at `offset` from the body origin:
    /// `v + omega × offset`.
    #[must_use]
    pub fn at_point(&self, offset: &Vector3<f64>) -> Vector3<f64> {
        self.linear + self.angular.cross(offset)
    }

    /// Clamp linear and angular magnitudes to the given ceilings.
    #[must_use]
    pub fn clamped(&self, max_linear: f64, max_angular: f64) -> Self {
        Self {
            linear: clamp_norm(self.linear, max_linear),
            angular: clamp_norm(self.angular, max_angular),
        }
    }

    /// Check that both parts contain no `NaN` or `Inf`.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.linear.iter().all(|x| x.is_finite()) && self.angular.iter().all(|x| x.is_finite())
    }
}

/// Clamp a vector's norm to `max`, preserving direction.
#[must_use]
pub(crate) fn clamp_norm(v: Vector3<f64>, max: f64) -> Vector3<f64> {
    let norm = v.norm();
    if norm > max && norm > EPSILON {
        v * (max / norm)
    } else {
        v
    }
}

/// Mass and body-local inertia of a rigid body, with cached inverses.
///
/// The inverses are refreshed whenever mass or inertia is mutated through the
/// provided setters; a static body reports zero inverse mass and zero inverse
/// inertia so it never responds to impulses.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    mass: f64,
    inertia: Matrix3<f64>,
    inv_mass: f64,
    inv_inertia: Matrix3<f64>,
}

impl MassProperties {
    /// Create mass properties from mass (kg) and a body-local inertia tensor.
    ///
    /// # Errors
    ///
    /// Rejects non-positive or non-finite mass, asymmetric tensors, and
    /// tensors that are not positive-definite.
    pub fn new(mass: f64, inertia: Matrix3<f64>) -> crate::Result<Self> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }
        let asymmetry = (inertia - inertia.transpose()).norm();
        if asymmetry > EPSILON {
            return Err(PhysicsError::singular_inertia(
                "inertia tensor must be symmetric",
            ));
        }
        let eigenvalues = inertia.symmetric_eigenvalues();
        if eigenvalues.iter().any(|&e| e <= 0.0) {
            return Err(PhysicsError::singular_inertia(
                "inertia tensor must be positive-definite",
            ));
        }
        let inv_inertia = inertia.try_inverse().ok_or_else(|| {
            PhysicsError::singular_inertia("inertia tensor is not invertible")
        })?;
        Ok(Self {
            mass,
            inertia,
            inv_mass: 1.0 / mass,
            inv_inertia,
        })
    }

    /// Unit mass with identity inertia. Handy where mass properties are
    /// required but never consulted, e.g. static bodies.
    #[must_use]
    pub fn unit() -> Self {
        Self {
            mass: 1.0,
            inertia: Matrix3::identity(),
            inv_mass: 1.0,
            inv_inertia: Matrix3::identity(),
        }
    }

    /// Mass properties of a uniform solid sphere: `I = (2/5) m r²`.
    ///
    /// # Errors
    ///
    /// Rejects non-positive mass or radius.
    pub fn sphere(mass: f64, radius: f64) -> crate::Result<Self> {
        if radius <= 0.0 {
            return Err(PhysicsError::invalid_config("sphere radius must be > 0"));
        }
        let i = 0.4 * mass * radius * radius;
        Self::new(mass, Matrix3::from_diagonal(&Vector3::new(i, i, i)))
    }

    /// Mass properties of a uniform solid box with the given half-extents.
    ///
    /// # Errors
    ///
    /// Rejects non-positive mass or extents.
    pub fn cuboid(mass: f64, half_extents: Vector3<f64>) -> crate::Result<Self> {
        if half_extents.iter().any(|&h| h <= 0.0) {
            return Err(PhysicsError::invalid_config("box half-extents must be > 0"));
        }
        let x2 = 4.0 * half_extents.x * half_extents.x;
        let y2 = 4.0 * half_extents.y * half_extents.y;
        let z2 = 4.0 * half_extents.z * half_extents.z;
        let inertia = Matrix3::from_diagonal(&Vector3::new(
            mass * (y2 + z2) / 12.0,
            mass * (x2 + z2) / 12.0,
            mass * (x2 + y2) / 12.0,
        ));
        Self::new(mass, inertia)
    }

    /// The mass in kg.
    #[must_use]
    pub const fn mass(&self) -> f64 {
        self.mass
    }

    /// The body-local inertia tensor.
    #[must_use]
    pub const fn inertia(&self) -> Matrix3<f64> {
        self.inertia
    }

    /// Cached inverse mass.
    #[must_use]
    pub const fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    /// Cached body-local inverse inertia tensor.
    #[must_use]
    pub const fn inv_inertia(&self) -> Matrix3<f64> {
        self.inv_inertia
    }

    /// Replace the mass, refreshing the cached inverse.
    ///
    /// # Errors
    ///
    /// Rejects non-positive or non-finite mass.
    pub fn set_mass(&mut self, mass: f64) -> crate::Result<()> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }
        self.mass = mass;
        self.inv_mass = 1.0 / mass;
        Ok(())
    }

    /// Replace the inertia tensor, refreshing the cached inverse.
    ///
    /// # Errors
    ///
    /// Rejects tensors that are asymmetric or not positive-definite.
    pub fn set_inertia(&mut self, inertia: Matrix3<f64>) -> crate::Result<()> {
        *self = Self::new(self.mass, inertia)?;
        Ok(())
    }

    /// Inverse inertia rotated into the world frame: `R · I⁻¹ · Rᵀ`.
    ///
    /// All torque and angular-impulse paths go through this; the local-frame
    /// tensor is never applied to world-frame vectors.
    #[must_use]
    pub fn inv_inertia_world(&self, rotation: &UnitQuaternion<f64>) -> Matrix3<f64> {
        let r = rotation.to_rotation_matrix();
        r.matrix() * self.inv_inertia * r.matrix().transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pose_renormalize_prefers_positive_w() {
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.3);
        let mut pose = Pose::new(Point3::origin(), UnitQuaternion::new_unchecked(-q.into_inner()));
        pose.renormalize();
        assert!(pose.rotation.w >= 0.0);
        assert_relative_eq!(pose.rotation.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_at_point() {
        let v = Velocity::angular(Vector3::z());
        let at = v.at_point(&Vector3::x());
        assert_relative_eq!(at.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_clamp() {
        let v = Velocity::linear(Vector3::new(10.0, 0.0, 0.0));
        let clamped = v.clamped(3.0, 1.0);
        assert_relative_eq!(clamped.linear.norm(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(clamped.linear.normalize().x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mass_properties_validation() {
        assert!(MassProperties::new(0.0, Matrix3::identity()).is_err());
        assert!(MassProperties::new(-1.0, Matrix3::identity()).is_err());
        assert!(MassProperties::new(1.0, Matrix3::zeros()).is_err());

        let mut asym = Matrix3::identity();
        asym[(0, 1)] = 0.5;
        assert!(MassProperties::new(1.0, asym).is_err());

        let props = MassProperties::sphere(2.0, 0.5).unwrap();
        assert_relative_eq!(props.inv_mass(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_cache_refresh() {
        let mut props = MassProperties::new(1.0, Matrix3::identity()).unwrap();
        props.set_mass(4.0).unwrap();
        assert_relative_eq!(props.inv_mass(), 0.25, epsilon = 1e-12);

        props
            .set_inertia(Matrix3::from_diagonal(&Vector3::new(2.0, 2.0, 2.0)))
            .unwrap();
        assert_relative_eq!(props.inv_inertia()[(0, 0)], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_world_frame_inverse_inertia() {
        // Diagonal tensor with distinct axes: a 90° yaw swaps x and y entries.
        let props =
            MassProperties::new(1.0, Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 4.0)))
                .unwrap();
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        let world = props.inv_inertia_world(&yaw);
        assert_relative_eq!(world[(0, 0)], 0.5, epsilon = 1e-9);
        assert_relative_eq!(world[(1, 1)], 1.0, epsilon = 1e-9);
        assert_relative_eq!(world[(2, 2)], 0.25, epsilon = 1e-9);
    }
}
