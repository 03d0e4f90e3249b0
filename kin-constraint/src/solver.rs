//! The solver capability set.

use crate::context::SolveContext;
use crate::placeholder::Placeholder;

/// A constraint on one body.
///
/// The scene calls `reset` once per step before the impulse iterations and
/// again before each nudge iteration (positional corrections change drift
/// and Jacobians), `apply_impulses` during the velocity iterations, and
/// `apply_nudges` during the position iterations. Solvers that cannot make
/// progress (degenerate geometry, zero effective mass) must become no-ops
/// for the step rather than fail.
pub trait SingleBodySolver {
    /// Recompute Jacobians and drift from the body's current state.
    fn reset(&mut self, ctx: &SolveContext, body: &Placeholder);

    /// Correct the body's velocities.
    fn apply_impulses(&mut self, ctx: &SolveContext, body: &mut Placeholder);

    /// Correct the body's position and orientation.
    fn apply_nudges(&mut self, ctx: &SolveContext, body: &mut Placeholder);
}

/// A constraint coupling two bodies.
///
/// The first placeholder is the "target", the second the "source"; drift is
/// measured from target toward source. Same calling protocol as
/// [`SingleBodySolver`].
pub trait PairSolver {
    /// Recompute Jacobians and drift from both bodies' current state.
    fn reset(&mut self, ctx: &SolveContext, target: &Placeholder, source: &Placeholder);

    /// Correct both bodies' velocities.
    fn apply_impulses(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    );

    /// Correct both bodies' positions and orientations.
    fn apply_nudges(
        &mut self,
        ctx: &SolveContext,
        target: &mut Placeholder,
        source: &mut Placeholder,
    );
}
