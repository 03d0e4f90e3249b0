//! Jacobian rows and the impulses derived from them.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::placeholder::Placeholder;

/// A change in momentum: `(λ·J_lin, λ·J_ang)` for some scalar λ.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Impulse {
    /// Linear part, applied as `v += linear / m`.
    pub linear: Vector3<f64>,
    /// Angular part, applied as `ω += I⁻¹·angular`.
    pub angular: Vector3<f64>,
}

/// The positional analog of an [`Impulse`], applied to pose instead of
/// velocity.
pub type Nudge = Impulse;

/// A 1×6 constraint row for one body: a linear and an angular slope.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Jacobian {
    /// Slope with respect to linear velocity.
    pub linear: Vector3<f64>,
    /// Slope with respect to angular velocity.
    pub angular: Vector3<f64>,
}

impl Jacobian {
    /// Build a row from its slopes.
    #[must_use]
    pub const fn new(linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        Self { linear, angular }
    }

    /// The constraint-space velocity `v·J_lin + ω·J_ang`.
    #[must_use]
    pub fn effective_velocity(&self, body: &Placeholder) -> f64 {
        body.linear_velocity.dot(&self.linear) + body.angular_velocity.dot(&self.angular)
    }

    /// The inverse effective mass `J_lin·J_lin/m + (I⁻¹·J_ang)·J_ang`.
    #[must_use]
    pub fn inverse_effective_mass(&self, body: &Placeholder) -> f64 {
        self.linear.dot(&self.linear) * body.inv_mass
            + (body.inv_inertia * self.angular).dot(&self.angular)
    }

    /// The impulse (or nudge) produced by a scalar λ along this row.
    #[must_use]
    pub fn impulse(&self, lambda: f64) -> Impulse {
        Impulse {
            linear: self.linear * lambda,
            angular: self.angular * lambda,
        }
    }
}

/// A 1×12 constraint row coupling two bodies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PairJacobian {
    /// Row for the target body.
    pub a: Jacobian,
    /// Row for the source body.
    pub b: Jacobian,
}

impl PairJacobian {
    /// Build a pair row from its halves.
    #[must_use]
    pub const fn new(a: Jacobian, b: Jacobian) -> Self {
        Self { a, b }
    }

    /// Sum of both bodies' constraint-space velocities.
    #[must_use]
    pub fn effective_velocity(&self, target: &Placeholder, source: &Placeholder) -> f64 {
        self.a.effective_velocity(target) + self.b.effective_velocity(source)
    }

    /// Sum of both bodies' inverse effective masses.
    #[must_use]
    pub fn inverse_effective_mass(&self, target: &Placeholder, source: &Placeholder) -> f64 {
        self.a.inverse_effective_mass(target) + self.b.inverse_effective_mass(source)
    }

    /// The per-body impulses produced by a scalar λ.
    #[must_use]
    pub fn impulses(&self, lambda: f64) -> (Impulse, Impulse) {
        (self.a.impulse(lambda), self.b.impulse(lambda))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Point3, UnitQuaternion};

    fn body(inv_mass: f64, v: Vector3<f64>, w: Vector3<f64>) -> Placeholder {
        Placeholder::new(
            inv_mass,
            Matrix3::identity() * inv_mass,
            v,
            w,
            Point3::origin(),
            UnitQuaternion::identity(),
        )
    }

    #[test]
    fn test_effective_velocity_is_linear_in_velocity() {
        let j = Jacobian::new(Vector3::new(1.0, 2.0, 0.0), Vector3::new(0.0, 0.0, 3.0));
        let a = body(1.0, Vector3::new(1.0, 0.0, 0.0), Vector3::zeros());
        let b = body(1.0, Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 0.0, 1.0));
        let sum = body(
            1.0,
            a.linear_velocity + b.linear_velocity,
            a.angular_velocity + b.angular_velocity,
        );
        assert_relative_eq!(
            j.effective_velocity(&sum),
            j.effective_velocity(&a) + j.effective_velocity(&b),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_pair_mass_is_sum_of_halves() {
        let pair = PairJacobian::new(
            Jacobian::new(Vector3::x(), Vector3::y()),
            Jacobian::new(-Vector3::x(), Vector3::z()),
        );
        let target = body(0.5, Vector3::zeros(), Vector3::zeros());
        let source = body(0.25, Vector3::zeros(), Vector3::zeros());
        assert_relative_eq!(
            pair.inverse_effective_mass(&target, &source),
            pair.a.inverse_effective_mass(&target) + pair.b.inverse_effective_mass(&source),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_impulse_scaling() {
        let j = Jacobian::new(Vector3::x(), Vector3::z());
        let imp = j.impulse(2.5);
        assert_relative_eq!(imp.linear, Vector3::new(2.5, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(imp.angular, Vector3::new(0.0, 0.0, 2.5), epsilon = 1e-12);
    }
}
