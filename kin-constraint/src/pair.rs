//! Pair solvers: joints coupling two bodies.
//!
//! The first body of every pair is the "target", the second the "source";
//! drift is measured from target toward source.

use kin_types::{Angle, EPSILON};
use nalgebra::{UnitQuaternion, Vector3};

use crate::context::SolveContext;
use crate::jacobian::{Jacobian, PairJacobian};
use crate::placeholder::Placeholder;
use crate::solver::PairSolver;

/// Two unit vectors spanning the plane perpendicular to `direction`.
fn perpendicular_pair(direction: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    // Cross against the axis the direction points along least.
    let axis = if direction.x.abs() <= direction.y.abs() && direction.x.abs() <= direction.z.abs()
    {
        Vector3::x()
    } else if direction.y.abs() <= direction.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let first = direction.cross(&axis).normalize();
    let second = direction.cross(&first);
    (first, second)
}

/// A rigid rod between two body-local anchor points.
///
/// Constrains the anchor distance to `length`; iterative. Becomes a no-op
/// when the anchors coincide.
#[derive(Debug, Clone)]
pub struct HingedRod {
    anchor_a: Vector3<f64>,
    anchor_b: Vector3<f64>,
    length: f64,
    jacobian: PairJacobian,
    drift: f64,
    active: bool,
}

impl HingedRod {
    /// Join `anchor_a` on the target to `anchor_b` on the source at
    /// distance `length`.
    #[must_use]
    pub fn new(anchor_a: Vector3<f64>, anchor_b: Vector3<f64>, length: f64) -> Self {
        Self {
            anchor_a,
            anchor_b,
            length,
            jacobian: PairJacobian::default(),
            drift: 0.0,
            active: false,
        }
    }

    /// Current drift as of the last `reset`.
    #[must_use]
    pub const fn drift(&self) -> f64 {
        self.drift
    }
}

impl PairSolver for HingedRod {
    fn reset(&mut self, _ctx: &SolveContext, target: &Placeholder, source: &Placeholder) {
        let world_a = target.world_point(self.anchor_a);
        let world_b = source.world_point(self.anchor_b);
        let delta = world_a - world_b;
        let dist = delta.norm();
        if dist < EPSILON {
            self.active = false;
            return;
        }
        let normal = delta / dist;
        self.drift = dist - self.length;
        self.jacobian = PairJacobian::new(
            Jacobian::new(normal, (world_a - target.position).cross(&normal)),
            Jacobian::new(-normal, (world_b - source.position).cross(&-normal)),
        );
        self.active = true;
    }

    fn apply_impulses(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if !self.active {
            return;
        }
        let velocity = self.jacobian.effective_velocity(target, source);
        let mass = self.jacobian.inverse_effective_mass(target, source);
        let lambda = ctx.impulse_lambda(mass, velocity, self.drift, 0.0);
        let (for_target, for_source) = self.jacobian.impulses(lambda);
        target.apply_impulse(&for_target);
        source.apply_impulse(&for_source);
    }

    fn apply_nudges(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if !self.active {
            return;
        }
        let mass = self.jacobian.inverse_effective_mass(target, source);
        let lambda = ctx.nudge_lambda(mass, self.drift);
        let (for_target, for_source) = self.jacobian.impulses(lambda);
        target.apply_nudge(&for_target);
        source.apply_nudge(&for_source);
    }
}

/// Shared machinery of the direction-offset constraints: the source's
/// position projected onto a target-local direction.
#[derive(Debug, Clone)]
struct DirectionOffset {
    direction: Vector3<f64>,
    jacobian: PairJacobian,
    drift: f64,
    active: bool,
}

impl DirectionOffset {
    fn new(direction: Vector3<f64>) -> Self {
        Self {
            direction,
            jacobian: PairJacobian::default(),
            drift: 0.0,
            active: false,
        }
    }

    /// The current projection of the source onto the target's direction.
    fn projection(&self, target: &Placeholder, source: &Placeholder) -> (Vector3<f64>, f64) {
        let world_dir = target.world_vector(self.direction);
        let offset = (source.position - target.position).dot(&world_dir);
        (world_dir, offset)
    }

    fn engage(&mut self, target: &Placeholder, source: &Placeholder, drift: f64) {
        let world_dir = target.world_vector(self.direction);
        let arm = source.position - target.position;
        self.jacobian = PairJacobian::new(
            Jacobian::new(-world_dir, world_dir.cross(&arm)),
            Jacobian::new(world_dir, Vector3::zeros()),
        );
        self.drift = drift;
        self.active = true;
    }

    fn impulse(
        &self,
        ctx: &SolveContext,
        restitution: f64,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        let velocity = self.jacobian.effective_velocity(target, source);
        let mass = self.jacobian.inverse_effective_mass(target, source);
        let lambda = ctx.impulse_lambda(mass, velocity, self.drift, restitution);
        let (for_target, for_source) = self.jacobian.impulses(lambda);
        target.apply_impulse(&for_target);
        source.apply_impulse(&for_source);
    }

    fn nudge(&self, ctx: &SolveContext, target: &mut Placeholder, source: &mut Placeholder) {
        let mass = self.jacobian.inverse_effective_mass(target, source);
        let lambda = ctx.nudge_lambda(mass, self.drift);
        let (for_target, for_source) = self.jacobian.impulses(lambda);
        target.apply_nudge(&for_target);
        source.apply_nudge(&for_source);
    }
}

/// Keeps the source's position, projected onto a target-local direction,
/// inside `[min, max]`.
///
/// One half-space is active per step, picked by the sign of the violation;
/// inactive while the projection is inside the band. Iterative, with
/// optional restitution on contact with a band edge.
#[derive(Debug, Clone)]
pub struct ClampDirectionOffset {
    inner: DirectionOffset,
    min: f64,
    max: f64,
    restitution: f64,
}

impl ClampDirectionOffset {
    /// Clamp the projection onto `direction` (target-local, unit) to
    /// `[min, max]`.
    #[must_use]
    pub fn new(direction: Vector3<f64>, min: f64, max: f64) -> Self {
        Self {
            inner: DirectionOffset::new(direction),
            min,
            max,
            restitution: 0.0,
        }
    }

    /// Bounce on hitting a band edge.
    #[must_use]
    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }
}

impl PairSolver for ClampDirectionOffset {
    fn reset(&mut self, _ctx: &SolveContext, target: &Placeholder, source: &Placeholder) {
        let (_, offset) = self.inner.projection(target, source);
        if offset < self.min {
            self.inner.engage(target, source, offset - self.min);
        } else if offset > self.max {
            self.inner.engage(target, source, offset - self.max);
        } else {
            self.inner.active = false;
        }
    }

    fn apply_impulses(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if self.inner.active {
            self.inner.impulse(ctx, self.restitution, target, source);
        }
    }

    fn apply_nudges(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if self.inner.active {
            self.inner.nudge(ctx, target, source);
        }
    }
}

/// Equality version of [`ClampDirectionOffset`]: the projection must equal
/// `offset` exactly. Iterative.
#[derive(Debug, Clone)]
pub struct MatchDirectionOffset {
    inner: DirectionOffset,
    offset: f64,
}

impl MatchDirectionOffset {
    /// Hold the projection onto `direction` (target-local, unit) at
    /// `offset`.
    #[must_use]
    pub fn new(direction: Vector3<f64>, offset: f64) -> Self {
        Self {
            inner: DirectionOffset::new(direction),
            offset,
        }
    }
}

impl PairSolver for MatchDirectionOffset {
    fn reset(&mut self, _ctx: &SolveContext, target: &Placeholder, source: &Placeholder) {
        let (_, offset) = self.inner.projection(target, source);
        self.inner.engage(target, source, offset - self.offset);
    }

    fn apply_impulses(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if self.inner.active {
            self.inner.impulse(ctx, 0.0, target, source);
        }
    }

    fn apply_nudges(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if self.inner.active {
            self.inner.nudge(ctx, target, source);
        }
    }
}

/// Aligns a target-local direction with a source-local direction.
///
/// Two angular rows built from the pair of normals perpendicular to the
/// source's direction; drift is the target direction's component along each
/// normal. Iterative.
///
/// Known limitation: when the two directions are exactly opposite the
/// perpendicular drift vanishes and the solver cannot pick a turn
/// direction, so a 180° flip does not converge.
#[derive(Debug, Clone)]
pub struct MatchDirections {
    target_direction: Vector3<f64>,
    source_direction: Vector3<f64>,
    rows: [PairJacobian; 2],
    drifts: [f64; 2],
    active: bool,
}

impl MatchDirections {
    /// Align `target_direction` (target-local, unit) with
    /// `source_direction` (source-local, unit).
    #[must_use]
    pub fn new(target_direction: Vector3<f64>, source_direction: Vector3<f64>) -> Self {
        Self {
            target_direction,
            source_direction,
            rows: [PairJacobian::default(); 2],
            drifts: [0.0; 2],
            active: false,
        }
    }
}

impl PairSolver for MatchDirections {
    fn reset(&mut self, _ctx: &SolveContext, target: &Placeholder, source: &Placeholder) {
        let dir_a = target.world_vector(self.target_direction);
        let dir_b = source.world_vector(self.source_direction);
        if dir_b.norm_squared() < EPSILON {
            self.active = false;
            return;
        }
        let (n1, n2) = perpendicular_pair(&dir_b);
        for (i, normal) in [n1, n2].iter().enumerate() {
            self.drifts[i] = dir_a.dot(normal);
            let slope = dir_a.cross(normal);
            self.rows[i] = PairJacobian::new(
                Jacobian::new(Vector3::zeros(), slope),
                Jacobian::new(Vector3::zeros(), -slope),
            );
        }
        self.active = true;
    }

    fn apply_impulses(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if !self.active {
            return;
        }
        for (row, drift) in self.rows.iter().zip(self.drifts) {
            let velocity = row.effective_velocity(target, source);
            let mass = row.inverse_effective_mass(target, source);
            let lambda = ctx.impulse_lambda(mass, velocity, drift, 0.0);
            let (for_target, for_source) = row.impulses(lambda);
            target.apply_impulse(&for_target);
            source.apply_impulse(&for_source);
        }
    }

    fn apply_nudges(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if !self.active {
            return;
        }
        for (row, drift) in self.rows.iter().zip(self.drifts) {
            let mass = row.inverse_effective_mass(target, source);
            let lambda = ctx.nudge_lambda(mass, drift);
            let (for_target, for_source) = row.impulses(lambda);
            target.apply_nudge(&for_target);
            source.apply_nudge(&for_source);
        }
    }
}

/// Limits the signed angle between a target-local reference direction and a
/// source-local direction, measured around a target-local axis, to
/// `[min, max]`.
///
/// Skipped while the source direction nearly coincides with the axis (the
/// in-plane projection is unreliable there). Iterative.
#[derive(Debug, Clone)]
pub struct LimitRelativeAngle {
    axis: Vector3<f64>,
    reference: Vector3<f64>,
    direction: Vector3<f64>,
    min: Angle,
    max: Angle,
    jacobian: PairJacobian,
    drift: f64,
    active: bool,
}

impl LimitRelativeAngle {
    /// Limit the angle of `direction` (source-local) from `reference`
    /// (target-local), measured around `axis` (target-local, unit).
    #[must_use]
    pub fn new(
        axis: Vector3<f64>,
        reference: Vector3<f64>,
        direction: Vector3<f64>,
        min: Angle,
        max: Angle,
    ) -> Self {
        Self {
            axis,
            reference,
            direction,
            min,
            max,
            jacobian: PairJacobian::default(),
            drift: 0.0,
            active: false,
        }
    }
}

impl PairSolver for LimitRelativeAngle {
    fn reset(&mut self, _ctx: &SolveContext, target: &Placeholder, source: &Placeholder) {
        self.active = false;
        let axis = target.world_vector(self.axis);
        let reference = target.world_vector(self.reference);
        let direction = source.world_vector(self.direction);
        if direction.dot(&axis).abs() > 0.99 {
            return;
        }
        // Project both directions into the plane perpendicular to the axis.
        let ref_planar = reference - axis * reference.dot(&axis);
        let dir_planar = direction - axis * direction.dot(&axis);
        if ref_planar.norm_squared() < EPSILON || dir_planar.norm_squared() < EPSILON {
            return;
        }
        let angle = f64::atan2(ref_planar.cross(&dir_planar).dot(&axis), ref_planar.dot(&dir_planar));
        let violation = if angle < self.min.to_radians() {
            angle - self.min.to_radians()
        } else if angle > self.max.to_radians() {
            angle - self.max.to_radians()
        } else {
            return;
        };
        self.drift = violation;
        // d(angle)/dt = (ω_source − ω_target)·axis.
        self.jacobian = PairJacobian::new(
            Jacobian::new(Vector3::zeros(), -axis),
            Jacobian::new(Vector3::zeros(), axis),
        );
        self.active = true;
    }

    fn apply_impulses(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if !self.active {
            return;
        }
        let velocity = self.jacobian.effective_velocity(target, source);
        let mass = self.jacobian.inverse_effective_mass(target, source);
        let lambda = ctx.impulse_lambda(mass, velocity, self.drift, 0.0);
        let (for_target, for_source) = self.jacobian.impulses(lambda);
        target.apply_impulse(&for_target);
        source.apply_impulse(&for_source);
    }

    fn apply_nudges(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if !self.active {
            return;
        }
        let mass = self.jacobian.inverse_effective_mass(target, source);
        let lambda = ctx.nudge_lambda(mass, self.drift);
        let (for_target, for_source) = self.jacobian.impulses(lambda);
        target.apply_nudge(&for_target);
        source.apply_nudge(&for_source);
    }
}

/// Welds the target's position to the source's, at a source-local offset.
/// Immediate kinematic copy; bypasses the Jacobian machinery.
#[derive(Debug, Clone, Copy)]
pub struct CopyPosition {
    offset: Vector3<f64>,
}

impl CopyPosition {
    /// Keep the target at `offset` (source-local) from the source.
    #[must_use]
    pub const fn new(offset: Vector3<f64>) -> Self {
        Self { offset }
    }
}

impl PairSolver for CopyPosition {
    fn reset(&mut self, _ctx: &SolveContext, _target: &Placeholder, _source: &Placeholder) {}

    fn apply_impulses(
        &mut self,
        _ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        target.set_linear_velocity(source.linear_velocity);
    }

    fn apply_nudges(
        &mut self,
        _ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        target.set_position(source.world_point(self.offset));
    }
}

/// Welds the target's orientation to the source's, at a fixed relative
/// rotation. Immediate.
#[derive(Debug, Clone, Copy)]
pub struct CopyRotation {
    offset: UnitQuaternion<f64>,
}

impl CopyRotation {
    /// Keep the target's orientation at `source.rotation * offset`.
    #[must_use]
    pub const fn new(offset: UnitQuaternion<f64>) -> Self {
        Self { offset }
    }
}

impl PairSolver for CopyRotation {
    fn reset(&mut self, _ctx: &SolveContext, _target: &Placeholder, _source: &Placeholder) {}

    fn apply_impulses(
        &mut self,
        _ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        target.set_angular_velocity(source.angular_velocity);
    }

    fn apply_nudges(
        &mut self,
        _ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        target.set_rotation(source.rotation * self.offset);
    }
}

/// Rotates the target so one of its local directions tracks a source-local
/// direction. Immediate; a 180° disagreement is left alone (no unique turn
/// axis).
#[derive(Debug, Clone, Copy)]
pub struct CopyDirection {
    target_direction: Vector3<f64>,
    source_direction: Vector3<f64>,
}

impl CopyDirection {
    /// Keep `target_direction` (target-local) aligned with
    /// `source_direction` (source-local).
    #[must_use]
    pub const fn new(target_direction: Vector3<f64>, source_direction: Vector3<f64>) -> Self {
        Self {
            target_direction,
            source_direction,
        }
    }
}

impl PairSolver for CopyDirection {
    fn reset(&mut self, _ctx: &SolveContext, _target: &Placeholder, _source: &Placeholder) {}

    fn apply_impulses(
        &mut self,
        _ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        target.set_angular_velocity(source.angular_velocity);
    }

    fn apply_nudges(
        &mut self,
        _ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        let current = target.world_vector(self.target_direction);
        let wanted = source.world_vector(self.source_direction);
        if let Some(correction) = UnitQuaternion::rotation_between(&current, &wanted) {
            target.set_rotation(correction * target.rotation);
        }
    }
}

/// Limits the difference of the two bodies' angular velocities around their
/// local X axes, splitting the excess evenly. Velocity-level only;
/// immediate.
#[derive(Debug, Clone, Copy)]
pub struct Differential {
    max_delta: f64,
}

impl Differential {
    /// Allow at most `max_delta` rad/s of spin difference.
    #[must_use]
    pub const fn new(max_delta: f64) -> Self {
        Self { max_delta }
    }
}

impl PairSolver for Differential {
    fn reset(&mut self, _ctx: &SolveContext, _target: &Placeholder, _source: &Placeholder) {}

    fn apply_impulses(
        &mut self,
        _ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        let axis_a = target.world_vector(Vector3::x());
        let axis_b = source.world_vector(Vector3::x());
        let spin_a = target.angular_velocity.dot(&axis_a);
        let spin_b = source.angular_velocity.dot(&axis_b);
        let delta = spin_a - spin_b;
        if delta.abs() <= self.max_delta {
            return;
        }
        let excess = delta - self.max_delta.copysign(delta);
        let correction = excess / 2.0;
        target.set_angular_velocity(target.angular_velocity - axis_a * correction);
        source.set_angular_velocity(source.angular_velocity + axis_b * correction);
    }

    fn apply_nudges(
        &mut self,
        _ctx: &SolveContext,
        _target: &mut Placeholder,
        _source: &mut Placeholder,
    ) {
    }
}

/// A damped harmonic spring between two body-local anchors.
///
/// A soft constraint: per-step gamma and beta are derived from the spring
/// frequency and damping ratio, and the accumulated λ feeds back into each
/// iteration, so the spring force saturates instead of fighting the other
/// constraints. Velocity-level only; iterative.
#[derive(Debug, Clone)]
pub struct Coilover {
    anchor_a: Vector3<f64>,
    anchor_b: Vector3<f64>,
    rest_length: f64,
    frequency: f64,
    damping_ratio: f64,
    jacobian: PairJacobian,
    drift: f64,
    inv_effective_mass: f64,
    gamma: f64,
    beta: f64,
    total_lambda: f64,
    active: bool,
}

impl Coilover {
    /// A spring of natural frequency `frequency` (Hz) and damping ratio
    /// `damping_ratio` between `anchor_a` (target-local) and `anchor_b`
    /// (source-local), at rest at `rest_length`.
    #[must_use]
    pub fn new(
        anchor_a: Vector3<f64>,
        anchor_b: Vector3<f64>,
        rest_length: f64,
        frequency: f64,
        damping_ratio: f64,
    ) -> Self {
        Self {
            anchor_a,
            anchor_b,
            rest_length,
            frequency,
            damping_ratio,
            jacobian: PairJacobian::default(),
            drift: 0.0,
            inv_effective_mass: 0.0,
            gamma: 0.0,
            beta: 0.0,
            total_lambda: 0.0,
            active: false,
        }
    }
}

impl PairSolver for Coilover {
    fn reset(&mut self, ctx: &SolveContext, target: &Placeholder, source: &Placeholder) {
        self.active = false;
        self.total_lambda = 0.0;
        let world_a = target.world_point(self.anchor_a);
        let world_b = source.world_point(self.anchor_b);
        let delta = world_a - world_b;
        let dist = delta.norm();
        if dist < EPSILON {
            return;
        }
        let normal = delta / dist;
        self.drift = dist - self.rest_length;
        self.jacobian = PairJacobian::new(
            Jacobian::new(normal, (world_a - target.position).cross(&normal)),
            Jacobian::new(-normal, (world_b - source.position).cross(&-normal)),
        );
        self.inv_effective_mass = self.jacobian.inverse_effective_mass(target, source);
        if self.inv_effective_mass < EPSILON {
            return;
        }
        let omega = 2.0 * std::f64::consts::PI * self.frequency;
        let stiffness = omega * omega / self.inv_effective_mass;
        let damping = 2.0 * self.damping_ratio * omega / self.inv_effective_mass;
        self.gamma = 1.0 / (ctx.dt * (damping + ctx.dt * stiffness));
        self.beta = ctx.dt * stiffness * self.gamma;
        self.active = true;
    }

    fn apply_impulses(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        if !self.active {
            return;
        }
        let velocity = self.jacobian.effective_velocity(target, source);
        let lambda = -(velocity + self.beta * self.drift / ctx.dt + self.gamma * self.total_lambda)
            / (self.inv_effective_mass + self.gamma);
        self.total_lambda += lambda;
        let (for_target, for_source) = self.jacobian.impulses(lambda);
        target.apply_impulse(&for_target);
        source.apply_impulse(&for_source);
    }

    fn apply_nudges(
        &mut self,
        _ctx: &SolveContext,
        _target: &mut Placeholder,
        _source: &mut Placeholder,
    ) {
    }
}

/// Aggregates pair solvers, dispatching each call to every part in order.
#[derive(Default)]
pub struct CombinedPair {
    parts: Vec<Box<dyn PairSolver + Send>>,
}

impl CombinedPair {
    /// An empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sub-solver.
    #[must_use]
    pub fn with(mut self, part: Box<dyn PairSolver + Send>) -> Self {
        self.parts.push(part);
        self
    }
}

impl PairSolver for CombinedPair {
    fn reset(&mut self, ctx: &SolveContext, target: &Placeholder, source: &Placeholder) {
        for part in &mut self.parts {
            part.reset(ctx, target, source);
        }
    }

    fn apply_impulses(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        for part in &mut self.parts {
            part.apply_impulses(ctx, target, source);
        }
    }

    fn apply_nudges(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    ) {
        for part in &mut self.parts {
            part.apply_nudges(ctx, target, source);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Point3};

    fn ctx() -> SolveContext {
        SolveContext::new(1.0 / 120.0, 0.2, 0.2)
    }

    fn unit_body(position: Point3<f64>) -> Placeholder {
        Placeholder::new(
            1.0,
            Matrix3::identity(),
            Vector3::zeros(),
            Vector3::zeros(),
            position,
            UnitQuaternion::identity(),
        )
    }

    #[test]
    fn test_hinged_rod_pulls_bodies_together() {
        let mut rod = HingedRod::new(Vector3::zeros(), Vector3::zeros(), 1.0);
        let mut a = unit_body(Point3::new(0.0, 0.0, 0.0));
        let mut b = unit_body(Point3::new(3.0, 0.0, 0.0));
        rod.reset(&ctx(), &a, &b);
        assert_relative_eq!(rod.drift(), 2.0, epsilon = 1e-12);
        rod.apply_impulses(&ctx(), &mut a, &mut b);
        // Symmetric pull: a toward +x, b toward -x.
        assert!(a.linear_velocity.x > 0.0);
        assert!(b.linear_velocity.x < 0.0);
        assert_relative_eq!(a.linear_velocity.x, -b.linear_velocity.x, epsilon = 1e-12);

        rod.reset(&ctx(), &a, &b);
        rod.apply_nudges(&ctx(), &mut a, &mut b);
        assert!((a.position - b.position).norm() < 3.0);
    }

    #[test]
    fn test_hinged_rod_coincident_anchors_noop() {
        let mut rod = HingedRod::new(Vector3::zeros(), Vector3::zeros(), 1.0);
        let mut a = unit_body(Point3::origin());
        let mut b = unit_body(Point3::origin());
        rod.reset(&ctx(), &a, &b);
        rod.apply_impulses(&ctx(), &mut a, &mut b);
        assert_eq!(a.linear_velocity, Vector3::zeros());
        assert_eq!(b.linear_velocity, Vector3::zeros());
    }

    #[test]
    fn test_clamp_direction_offset_band() {
        let mut clamp = ClampDirectionOffset::new(Vector3::x(), 1.0, 2.0);
        let mut a = unit_body(Point3::origin());

        // Inside the band: inactive.
        let mut b = unit_body(Point3::new(1.5, 0.0, 0.0));
        clamp.reset(&ctx(), &a, &b);
        clamp.apply_impulses(&ctx(), &mut a, &mut b);
        assert_eq!(b.linear_velocity, Vector3::zeros());

        // Beyond max: the source is pushed back down the axis.
        let mut b = unit_body(Point3::new(3.0, 0.0, 0.0));
        clamp.reset(&ctx(), &a, &b);
        clamp.apply_impulses(&ctx(), &mut a, &mut b);
        assert!(b.linear_velocity.x < 0.0);

        // Below min: pushed up the axis.
        let mut b = unit_body(Point3::new(0.5, 0.0, 0.0));
        clamp.reset(&ctx(), &a, &b);
        clamp.apply_impulses(&ctx(), &mut a, &mut b);
        assert!(b.linear_velocity.x > 0.0);
    }

    #[test]
    fn test_match_direction_offset_converges_with_nudges() {
        let mut joint = MatchDirectionOffset::new(Vector3::x(), 2.0);
        let mut a = unit_body(Point3::origin());
        let mut b = unit_body(Point3::new(2.5, 0.0, 0.0));
        for _ in 0..40 {
            joint.reset(&ctx(), &a, &b);
            joint.apply_nudges(&ctx(), &mut a, &mut b);
        }
        let offset = (b.position - a.position).x;
        assert_relative_eq!(offset, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_match_directions_torques_toward_alignment() {
        let mut joint = MatchDirections::new(Vector3::x(), Vector3::x());
        // Target rotated 90 degrees about z: its x points along +y.
        let mut a = unit_body(Point3::origin());
        a.set_rotation(UnitQuaternion::from_euler_angles(
            0.0,
            0.0,
            std::f64::consts::FRAC_PI_2,
        ));
        let mut b = unit_body(Point3::new(1.0, 0.0, 0.0));
        joint.reset(&ctx(), &a, &b);
        joint.apply_impulses(&ctx(), &mut a, &mut b);
        // The target must spin about -z to bring +y back to +x.
        assert!(a.angular_velocity.z < 0.0);

        // Nudges rotate the orientations directly.
        joint.reset(&ctx(), &a, &b);
        let misalignment_before = a.world_vector(Vector3::x()).angle(&Vector3::x());
        joint.apply_nudges(&ctx(), &mut a, &mut b);
        let misalignment_after = a.world_vector(Vector3::x()).angle(&Vector3::x());
        assert!(misalignment_after < misalignment_before);
    }

    #[test]
    fn test_limit_relative_angle_band_and_skip() {
        let mut joint = LimitRelativeAngle::new(
            Vector3::z(),
            Vector3::x(),
            Vector3::x(),
            Angle::degrees(-10.0),
            Angle::degrees(10.0),
        );
        let mut a = unit_body(Point3::origin());

        // Source twisted 45 degrees about z: out of band.
        let mut b = unit_body(Point3::new(1.0, 0.0, 0.0));
        b.set_rotation(UnitQuaternion::from_euler_angles(
            0.0,
            0.0,
            std::f64::consts::FRAC_PI_4,
        ));
        joint.reset(&ctx(), &a, &b);
        joint.apply_impulses(&ctx(), &mut a, &mut b);
        // The source is spun back about -z.
        assert!(b.angular_velocity.z < 0.0);

        // Source direction along the axis: skipped.
        let mut joint = LimitRelativeAngle::new(
            Vector3::z(),
            Vector3::x(),
            Vector3::z(),
            Angle::degrees(-10.0),
            Angle::degrees(10.0),
        );
        let mut b = unit_body(Point3::new(1.0, 0.0, 0.0));
        joint.reset(&ctx(), &a, &b);
        joint.apply_impulses(&ctx(), &mut a, &mut b);
        assert_eq!(b.angular_velocity, Vector3::zeros());
    }

    #[test]
    fn test_copy_position_and_rotation() {
        let mut weld = CopyPosition::new(Vector3::new(0.0, 1.0, 0.0));
        let mut a = unit_body(Point3::origin());
        let mut b = unit_body(Point3::new(5.0, 0.0, 0.0));
        b.set_linear_velocity(Vector3::new(1.0, 2.0, 3.0));
        weld.apply_impulses(&ctx(), &mut a, &mut b);
        weld.apply_nudges(&ctx(), &mut a, &mut b);
        assert_eq!(a.linear_velocity, b.linear_velocity);
        assert_relative_eq!(a.position, Point3::new(5.0, 1.0, 0.0), epsilon = 1e-12);

        let mut weld = CopyRotation::new(UnitQuaternion::identity());
        let mut b = unit_body(Point3::origin());
        b.set_rotation(UnitQuaternion::from_euler_angles(0.0, 0.7, 0.0));
        b.set_angular_velocity(Vector3::new(0.0, 1.0, 0.0));
        weld.apply_impulses(&ctx(), &mut a, &mut b);
        weld.apply_nudges(&ctx(), &mut a, &mut b);
        assert_eq!(a.angular_velocity, b.angular_velocity);
        assert_relative_eq!(a.rotation.angle_to(&b.rotation), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_copy_direction_aligns() {
        let mut weld = CopyDirection::new(Vector3::x(), Vector3::x());
        let mut a = unit_body(Point3::origin());
        a.set_rotation(UnitQuaternion::from_euler_angles(
            0.0,
            0.0,
            std::f64::consts::FRAC_PI_2,
        ));
        let mut b = unit_body(Point3::origin());
        weld.apply_nudges(&ctx(), &mut a, &mut b);
        let aligned = a.world_vector(Vector3::x());
        assert_relative_eq!(aligned, Vector3::x(), epsilon = 1e-9);
    }

    #[test]
    fn test_differential_splits_excess_spin() {
        let mut diff = Differential::new(1.0);
        let mut a = unit_body(Point3::origin());
        let mut b = unit_body(Point3::new(1.0, 0.0, 0.0));
        a.set_angular_velocity(Vector3::new(5.0, 0.0, 0.0));
        b.set_angular_velocity(Vector3::new(0.0, 0.0, 0.0));
        diff.apply_impulses(&ctx(), &mut a, &mut b);
        let spin_a = a.angular_velocity.x;
        let spin_b = b.angular_velocity.x;
        assert_relative_eq!(spin_a - spin_b, 1.0, epsilon = 1e-12);
        // Total spin is preserved.
        assert_relative_eq!(spin_a + spin_b, 5.0, epsilon = 1e-12);

        // Within the allowance: untouched.
        let mut diff = Differential::new(10.0);
        let before = (a.angular_velocity, b.angular_velocity);
        diff.apply_impulses(&ctx(), &mut a, &mut b);
        assert_eq!((a.angular_velocity, b.angular_velocity), before);
    }

    #[test]
    fn test_coilover_pulls_toward_rest_length() {
        let mut spring = Coilover::new(Vector3::zeros(), Vector3::zeros(), 1.0, 2.0, 0.7);
        let mut a = unit_body(Point3::new(0.0, 0.0, 0.0));
        let mut b = unit_body(Point3::new(2.0, 0.0, 0.0));
        spring.reset(&ctx(), &a, &b);
        spring.apply_impulses(&ctx(), &mut a, &mut b);
        // Overstretched: ends pull together.
        assert!(a.linear_velocity.x > 0.0);
        assert!(b.linear_velocity.x < 0.0);

        // Accumulated lambda saturates the force across iterations: a
        // second application is weaker than the first.
        let first = a.linear_velocity.x;
        spring.apply_impulses(&ctx(), &mut a, &mut b);
        assert!(a.linear_velocity.x - first < first);
    }

    #[test]
    fn test_coilover_damps_at_rest_length() {
        let mut spring = Coilover::new(Vector3::zeros(), Vector3::zeros(), 1.0, 2.0, 1.0);
        let mut a = unit_body(Point3::new(0.0, 0.0, 0.0));
        let mut b = unit_body(Point3::new(1.0, 0.0, 0.0));
        b.set_linear_velocity(Vector3::new(1.0, 0.0, 0.0));
        spring.reset(&ctx(), &a, &b);
        spring.apply_impulses(&ctx(), &mut a, &mut b);
        // Separating velocity is damped even with zero drift.
        assert!(b.linear_velocity.x < 1.0);
    }
}
