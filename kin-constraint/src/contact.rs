//! Contact constraints synthesized from collision detection.
//!
//! Contacts are modeled as constraints, not inline impulses: the detection
//! phase creates one constraint per intersection for the *next* step, and
//! the ordinary impulse iterations resolve them alongside user joints.
//! Positional drift is absorbed through the depth-driven bounce term, so
//! contacts apply no nudges.

use kin_types::EPSILON;
use nalgebra::{Point3, Vector3};

use crate::context::SolveContext;
use crate::jacobian::{Jacobian, PairJacobian};
use crate::placeholder::Placeholder;
use crate::solver::{PairSolver, SingleBodySolver};

/// Lateral (tangential) component of a contact-point velocity.
fn lateral_velocity(velocity: Vector3<f64>, normal: Vector3<f64>) -> Vector3<f64> {
    velocity - normal * velocity.dot(&normal)
}

/// Clamp a friction λ to the Coulomb cone of a normal λ.
fn coulomb_clamp(friction_lambda: f64, friction: f64, normal_lambda: f64) -> f64 {
    let bound = friction * normal_lambda.abs();
    friction_lambda.clamp(-bound, bound)
}

/// Contact between a dynamic body and static geometry.
///
/// `normal` is the unit direction that displaces the body out of contact.
/// Velocity-level only.
#[derive(Debug, Clone)]
pub struct SingleBodyContact {
    normal: Vector3<f64>,
    point: Point3<f64>,
    depth: f64,
    friction: f64,
    restitution: f64,
    jacobian: Jacobian,
}

impl SingleBodyContact {
    /// Build a contact from detection output. `friction` and `restitution`
    /// are the products of the two bodies' coefficients.
    #[must_use]
    pub fn new(
        normal: Vector3<f64>,
        point: Point3<f64>,
        depth: f64,
        friction: f64,
        restitution: f64,
    ) -> Self {
        Self {
            normal,
            point,
            depth,
            friction,
            restitution,
            jacobian: Jacobian::default(),
        }
    }
}

impl SingleBodySolver for SingleBodyContact {
    fn reset(&mut self, _ctx: &SolveContext, body: &Placeholder) {
        self.jacobian = Jacobian::new(
            self.normal,
            (self.point - body.position).cross(&self.normal),
        );
    }

    fn apply_impulses(&mut self, ctx: &SolveContext, body: &mut Placeholder) {
        let velocity = self.jacobian.effective_velocity(body);
        let mass = self.jacobian.inverse_effective_mass(body);
        if mass < EPSILON {
            return;
        }
        // Pressure along the outward normal; non-positive means the body
        // is already separating and the contact must not pull it back.
        let pressure = -velocity / mass;
        if pressure <= 0.0 {
            return;
        }
        let normal_lambda = ctx.impulse_lambda(mass, velocity, -self.depth, self.restitution);

        // Friction against the lateral contact-point velocity.
        let mut friction_impulse = None;
        let lateral = lateral_velocity(body.velocity_at(self.point), self.normal);
        let lateral_speed = lateral.norm();
        if lateral_speed > EPSILON {
            let tangent = lateral / lateral_speed;
            let friction_jacobian = Jacobian::new(
                tangent,
                (self.point - body.position).cross(&tangent),
            );
            let friction_mass = friction_jacobian.inverse_effective_mass(body);
            let lambda = ctx.impulse_lambda(
                friction_mass,
                friction_jacobian.effective_velocity(body),
                0.0,
                0.0,
            );
            let lambda = coulomb_clamp(lambda, self.friction, normal_lambda);
            friction_impulse = Some(friction_jacobian.impulse(lambda));
        }

        // Bounce and friction land together so neither pollutes the
        // other's intermediate velocities.
        body.apply_impulse(&self.jacobian.impulse(normal_lambda));
        if let Some(impulse) = friction_impulse {
            body.apply_impulse(&impulse);
        }
    }

    fn apply_nudges(&mut self, _ctx: &SolveContext, _body: &mut Placeholder) {}
}

/// Contact between two dynamic bodies.
///
/// `normal` displaces the target (first) body out of contact.
#[derive(Debug, Clone)]
pub struct PairContact {
    normal: Vector3<f64>,
    point: Point3<f64>,
    depth: f64,
    friction: f64,
    restitution: f64,
    jacobian: PairJacobian,
}

impl PairContact {
    /// Build a contact from detection output. `friction` and `restitution`
    /// are the products of the two bodies' coefficients.
    #[must_use]
    pub fn new(
        normal: Vector3<f64>,
        point: Point3<f64>,
        depth: f64,
        friction: f64,
        restitution: f64,
    ) -> Self {
        Self {
            normal,
            point,
            depth,
            friction,
            restitution,
            jacobian: PairJacobian::default(),
        }
    }
}

impl PairSolver for PairContact {
    fn reset(&mut self, _ctx: &SolveContext, target: &Placeholder, source: &Placeholder) {
        self.jacobian = PairJacobian::new(
            Jacobian::new(
                self.normal,
                (self.point - target.position).cross(&self.normal),
            ),
            Jacobian::new(
                -self.normal,
                (self.point - source.position).cross(&-self.normal),
            ),
        );
    }

    fn apply_impulses(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        let velocity = self.jacobian.effective_velocity(target, source);
        let mass = self.jacobian.inverse_effective_mass(target, source);
        if mass < EPSILON {
            return;
        }
        let pressure = -velocity / mass;
        if pressure <= 0.0 {
            return;
        }
        let normal_lambda = ctx.impulse_lambda(mass, velocity, -self.depth, self.restitution);

        let mut friction_impulses = None;
        let relative =
            target.velocity_at(self.point) - source.velocity_at(self.point);
        let lateral = lateral_velocity(relative, self.normal);
        let lateral_speed = lateral.norm();
        if lateral_speed > EPSILON {
            let tangent = lateral / lateral_speed;
            let friction_jacobian = PairJacobian::new(
                Jacobian::new(tangent, (self.point - target.position).cross(&tangent)),
                Jacobian::new(-tangent, (self.point - source.position).cross(&-tangent)),
            );
            let friction_mass = friction_jacobian.inverse_effective_mass(target, source);
            let lambda = ctx.impulse_lambda(
                friction_mass,
                friction_jacobian.effective_velocity(target, source),
                0.0,
                0.0,
            );
            let lambda = coulomb_clamp(lambda, self.friction, normal_lambda);
            friction_impulses = Some(friction_jacobian.impulses(lambda));
        }

        let (for_target, for_source) = self.jacobian.impulses(normal_lambda);
        target.apply_impulse(&for_target);
        source.apply_impulse(&for_source);
        if let Some((friction_target, friction_source)) = friction_impulses {
            target.apply_impulse(&friction_target);
            source.apply_impulse(&friction_source);
        }
    }

    fn apply_nudges(
        &mut self,
        _ctx: &SolveContext,
        _target: &mut Placeholder,
        _source: &mut Placeholder,
    ) {
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, UnitQuaternion};

    fn ctx() -> SolveContext {
        SolveContext::new(1.0 / 120.0, 0.2, 0.2)
    }

    fn unit_body(position: Point3<f64>, velocity: Vector3<f64>) -> Placeholder {
        Placeholder::new(
            1.0,
            Matrix3::identity(),
            velocity,
            Vector3::zeros(),
            position,
            UnitQuaternion::identity(),
        )
    }

    #[test]
    fn test_approaching_contact_pushes_out() {
        // Sphere center falling onto ground, contact under the center.
        let mut contact = SingleBodyContact::new(
            Vector3::y(),
            Point3::new(0.0, -0.5, 0.0),
            0.05,
            0.0,
            0.0,
        );
        let mut body = unit_body(Point3::origin(), Vector3::new(0.0, -2.0, 0.0));
        contact.reset(&ctx(), &body);
        contact.apply_impulses(&ctx(), &mut body);
        assert!(body.linear_velocity.y > -2.0);
    }

    #[test]
    fn test_separating_contact_is_skipped() {
        let mut contact = SingleBodyContact::new(
            Vector3::y(),
            Point3::new(0.0, -0.5, 0.0),
            0.05,
            0.5,
            1.0,
        );
        let mut body = unit_body(Point3::origin(), Vector3::new(0.0, 3.0, 0.0));
        contact.reset(&ctx(), &body);
        contact.apply_impulses(&ctx(), &mut body);
        // Already separating: untouched, no pull-back.
        assert_relative_eq!(body.linear_velocity.y, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_restitution_bounces_fast_impacts() {
        let mut contact = SingleBodyContact::new(
            Vector3::y(),
            Point3::new(0.0, -0.5, 0.0),
            0.0,
            0.0,
            1.0,
        );
        // Fast impact: restitution clamp is 1, so the bounce roughly
        // mirrors the approach speed.
        let mut body = unit_body(Point3::origin(), Vector3::new(0.0, -5.0, 0.0));
        contact.reset(&ctx(), &body);
        contact.apply_impulses(&ctx(), &mut body);
        assert_relative_eq!(body.linear_velocity.y, 5.0, epsilon = 1e-9);

        // Slow impact: clamp suppresses the bounce entirely.
        let mut contact = SingleBodyContact::new(
            Vector3::y(),
            Point3::new(0.0, -0.5, 0.0),
            0.0,
            0.0,
            1.0,
        );
        let mut body = unit_body(Point3::origin(), Vector3::new(0.0, -0.3, 0.0));
        contact.reset(&ctx(), &body);
        contact.apply_impulses(&ctx(), &mut body);
        assert_relative_eq!(body.linear_velocity.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_friction_opposes_lateral_velocity_within_cone() {
        let mut contact = SingleBodyContact::new(
            Vector3::y(),
            Point3::new(0.0, -0.5, 0.0),
            0.01,
            0.8,
            0.0,
        );
        let mut body = unit_body(Point3::origin(), Vector3::new(1.0, -1.0, 0.0));
        contact.reset(&ctx(), &body);
        contact.apply_impulses(&ctx(), &mut body);
        // Sliding is slowed, not reversed.
        assert!(body.linear_velocity.x < 1.0);
        assert!(body.linear_velocity.x >= 0.0);
    }

    #[test]
    fn test_frictionless_contact_preserves_lateral_velocity() {
        let mut contact = SingleBodyContact::new(
            Vector3::y(),
            Point3::new(0.0, -0.5, 0.0),
            0.01,
            0.0,
            0.0,
        );
        let mut body = unit_body(Point3::origin(), Vector3::new(1.0, -1.0, 0.0));
        contact.reset(&ctx(), &body);
        contact.apply_impulses(&ctx(), &mut body);
        assert_relative_eq!(body.linear_velocity.x, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pair_contact_momentum_exchange() {
        let mut contact = PairContact::new(
            -Vector3::x(),
            Point3::new(0.5, 0.0, 0.0),
            0.02,
            0.0,
            0.0,
        );
        // Target on the left moving right, source on the right at rest;
        // the target separates by moving back along -x.
        let mut target = unit_body(Point3::origin(), Vector3::new(1.0, 0.0, 0.0));
        let mut source = unit_body(Point3::new(1.0, 0.0, 0.0), Vector3::zeros());
        contact.reset(&ctx(), &target, &source);
        contact.apply_impulses(&ctx(), &mut target, &mut source);
        assert!(target.linear_velocity.x < 1.0);
        assert!(source.linear_velocity.x > 0.0);
        // Equal masses: momentum is conserved.
        assert_relative_eq!(
            target.linear_velocity.x + source.linear_velocity.x,
            1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_pair_contact_separating_skipped() {
        let mut contact = PairContact::new(
            -Vector3::x(),
            Point3::new(0.5, 0.0, 0.0),
            0.02,
            0.0,
            1.0,
        );
        let mut target = unit_body(Point3::origin(), Vector3::new(1.0, 0.0, 0.0));
        let mut source = unit_body(Point3::new(1.0, 0.0, 0.0), Vector3::zeros());
        contact.reset(&ctx(), &target, &source);
        contact.apply_impulses(&ctx(), &mut target, &mut source);
        // They exchanged along +x; the relative velocity along the
        // displacement normal is now separating, so a second application
        // does nothing more.
        let after = (target.linear_velocity, source.linear_velocity);
        contact.apply_impulses(&ctx(), &mut target, &mut source);
        assert_eq!((target.linear_velocity, source.linear_velocity), after);
    }
}
