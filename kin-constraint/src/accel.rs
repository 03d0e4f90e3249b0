//! Acceleration fields applied during the force phase.

use kin_types::EPSILON;
use nalgebra::{Point3, Vector3};

/// A body's view of the force phase: current state plus acceleration
/// accumulators. Fields add into the accumulators; the scene clamps and
/// integrates them afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AccelProbe {
    /// Body position, world frame.
    pub position: Point3<f64>,
    /// Body linear velocity, world frame.
    pub linear_velocity: Vector3<f64>,
    /// Body angular velocity, world frame.
    pub angular_velocity: Vector3<f64>,
    /// Accumulated linear acceleration (m/s²).
    pub linear: Vector3<f64>,
    /// Accumulated angular acceleration (rad/s²).
    pub angular: Vector3<f64>,
}

impl AccelProbe {
    /// A probe with zeroed accumulators.
    #[must_use]
    pub fn new(
        position: Point3<f64>,
        linear_velocity: Vector3<f64>,
        angular_velocity: Vector3<f64>,
    ) -> Self {
        Self {
            position,
            linear_velocity,
            angular_velocity,
            linear: Vector3::zeros(),
            angular: Vector3::zeros(),
        }
    }
}

/// A source of acceleration enumerated at the start of each force phase.
pub trait AccelerationField {
    /// Accumulate this field's contribution into the probe.
    fn apply(&self, probe: &mut AccelProbe);
}

/// Constant acceleration along a fixed direction, e.g. uniform gravity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityDirection {
    acceleration: Vector3<f64>,
}

impl GravityDirection {
    /// A field accelerating at `magnitude` along `direction` (unit).
    #[must_use]
    pub fn new(direction: Vector3<f64>, magnitude: f64) -> Self {
        Self {
            acceleration: direction * magnitude,
        }
    }

    /// A field from a ready-made acceleration vector.
    #[must_use]
    pub const fn from_vector(acceleration: Vector3<f64>) -> Self {
        Self { acceleration }
    }

    /// The acceleration vector.
    #[must_use]
    pub const fn acceleration(&self) -> Vector3<f64> {
        self.acceleration
    }
}

impl AccelerationField for GravityDirection {
    fn apply(&self, probe: &mut AccelProbe) {
        probe.linear += self.acceleration;
    }
}

/// Constant-magnitude attraction toward a world point. Bodies within ε of
/// the center feel nothing (no direction to pull along).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityPosition {
    center: Point3<f64>,
    magnitude: f64,
}

impl GravityPosition {
    /// Attract toward `center` with acceleration `magnitude`.
    #[must_use]
    pub const fn new(center: Point3<f64>, magnitude: f64) -> Self {
        Self { center, magnitude }
    }
}

impl AccelerationField for GravityPosition {
    fn apply(&self, probe: &mut AccelProbe) {
        let delta = self.center - probe.position;
        let dist = delta.norm();
        if dist < EPSILON {
            return;
        }
        probe.linear += delta * (self.magnitude / dist);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn probe_at(position: Point3<f64>) -> AccelProbe {
        AccelProbe::new(position, Vector3::zeros(), Vector3::zeros())
    }

    #[test]
    fn test_gravity_direction_accumulates() {
        let field = GravityDirection::new(Vector3::new(0.0, -1.0, 0.0), 9.8);
        let mut probe = probe_at(Point3::origin());
        field.apply(&mut probe);
        field.apply(&mut probe);
        assert_relative_eq!(probe.linear.y, -19.6, epsilon = 1e-12);
        assert_eq!(probe.angular, Vector3::zeros());
    }

    #[test]
    fn test_gravity_position_pulls_toward_center() {
        let field = GravityPosition::new(Point3::new(10.0, 0.0, 0.0), 5.0);
        let mut probe = probe_at(Point3::origin());
        field.apply(&mut probe);
        assert_relative_eq!(probe.linear, Vector3::new(5.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_gravity_position_dead_zone() {
        let center = Point3::new(1.0, 2.0, 3.0);
        let field = GravityPosition::new(center, 5.0);
        let mut probe = probe_at(center);
        field.apply(&mut probe);
        assert_eq!(probe.linear, Vector3::zeros());
    }
}
