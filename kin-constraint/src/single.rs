//! Single-body solvers: world anchors and kinematic locks.

use kin_types::EPSILON;
use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::context::SolveContext;
use crate::jacobian::Jacobian;
use crate::placeholder::Placeholder;
use crate::solver::SingleBodySolver;

/// Keeps a body-local anchor point at a fixed distance from a world
/// fixture, like a lamp hanging from a ceiling hook.
///
/// Constrains one translational degree of freedom along the
/// anchor-to-fixture direction; iterative. Reduces to a no-op when the
/// anchor sits on the fixture.
#[derive(Debug, Clone)]
pub struct Chandelier {
    fixture: Point3<f64>,
    anchor: Vector3<f64>,
    length: f64,
    jacobian: Jacobian,
    drift: f64,
    active: bool,
}

impl Chandelier {
    /// Tether `anchor` (body-local) to `fixture` (world) at distance
    /// `length`.
    #[must_use]
    pub fn new(fixture: Point3<f64>, anchor: Vector3<f64>, length: f64) -> Self {
        Self {
            fixture,
            anchor,
            length,
            jacobian: Jacobian::default(),
            drift: 0.0,
            active: false,
        }
    }

    /// The world fixture point.
    #[must_use]
    pub const fn fixture(&self) -> Point3<f64> {
        self.fixture
    }

    /// Current drift (distance violation) as of the last `reset`.
    #[must_use]
    pub const fn drift(&self) -> f64 {
        self.drift
    }
}

impl SingleBodySolver for Chandelier {
    fn reset(&mut self, _ctx: &SolveContext, body: &Placeholder) {
        let anchor_world = body.world_point(self.anchor);
        let delta = anchor_world - self.fixture;
        let dist = delta.norm();
        if dist < EPSILON {
            self.active = false;
            return;
        }
        let direction = delta / dist;
        self.drift = dist - self.length;
        self.jacobian = Jacobian::new(
            direction,
            (anchor_world - body.position).cross(&direction),
        );
        self.active = true;
    }

    fn apply_impulses(&mut self, ctx: &SolveContext, body: &mut Placeholder) {
        if !self.active {
            return;
        }
        let velocity = self.jacobian.effective_velocity(body);
        let mass = self.jacobian.inverse_effective_mass(body);
        let lambda = ctx.impulse_lambda(mass, velocity, self.drift, 0.0);
        body.apply_impulse(&self.jacobian.impulse(lambda));
    }

    fn apply_nudges(&mut self, ctx: &SolveContext, body: &mut Placeholder) {
        if !self.active {
            return;
        }
        let mass = self.jacobian.inverse_effective_mass(body);
        let lambda = ctx.nudge_lambda(mass, self.drift);
        body.apply_nudge(&self.jacobian.impulse(lambda));
    }
}

/// Pins a body's position: zero linear velocity, position snapped to the
/// target each step. Immediate; bypasses the Jacobian machinery.
#[derive(Debug, Clone, Copy)]
pub struct StaticPosition {
    target: Point3<f64>,
}

impl StaticPosition {
    /// Pin to `target` (world).
    #[must_use]
    pub const fn new(target: Point3<f64>) -> Self {
        Self { target }
    }

    /// Move the pin.
    pub fn set_target(&mut self, target: Point3<f64>) {
        self.target = target;
    }
}

impl SingleBodySolver for StaticPosition {
    fn reset(&mut self, _ctx: &SolveContext, _body: &Placeholder) {}

    fn apply_impulses(&mut self, _ctx: &SolveContext, body: &mut Placeholder) {
        body.set_linear_velocity(Vector3::zeros());
    }

    fn apply_nudges(&mut self, _ctx: &SolveContext, body: &mut Placeholder) {
        body.set_position(self.target);
    }
}

/// Pins a body's orientation: zero angular velocity, orientation snapped to
/// the target each step. Immediate.
#[derive(Debug, Clone, Copy)]
pub struct StaticRotation {
    target: UnitQuaternion<f64>,
}

impl StaticRotation {
    /// Pin to `target` (world).
    #[must_use]
    pub const fn new(target: UnitQuaternion<f64>) -> Self {
        Self { target }
    }

    /// Change the pinned orientation.
    pub fn set_target(&mut self, target: UnitQuaternion<f64>) {
        self.target = target;
    }
}

impl SingleBodySolver for StaticRotation {
    fn reset(&mut self, _ctx: &SolveContext, _body: &Placeholder) {}

    fn apply_impulses(&mut self, _ctx: &SolveContext, body: &mut Placeholder) {
        body.set_angular_velocity(Vector3::zeros());
    }

    fn apply_nudges(&mut self, _ctx: &SolveContext, body: &mut Placeholder) {
        body.set_rotation(self.target);
    }
}

/// Aggregates single-body solvers, dispatching each call to every part in
/// order.
#[derive(Default)]
pub struct CombinedSingle {
    parts: Vec<Box<dyn SingleBodySolver + Send>>,
}

impl CombinedSingle {
    /// An empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sub-solver.
    #[must_use]
    pub fn with(mut self, part: Box<dyn SingleBodySolver + Send>) -> Self {
        self.parts.push(part);
        self
    }
}

impl SingleBodySolver for CombinedSingle {
    fn reset(&mut self, ctx: &SolveContext, body: &Placeholder) {
        for part in &mut self.parts {
            part.reset(ctx, body);
        }
    }

    fn apply_impulses(&mut self, ctx: &SolveContext, body: &mut Placeholder) {
        for part in &mut self.parts {
            part.apply_impulses(ctx, body);
        }
    }

    fn apply_nudges(&mut self, ctx: &SolveContext, body: &mut Placeholder) {
        for part in &mut self.parts {
            part.apply_nudges(ctx, body);
        }
    }
}
