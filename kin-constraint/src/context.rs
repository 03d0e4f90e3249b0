//! The per-step context handed to every solver.

use kin_types::EPSILON;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Step parameters shared by all solvers: timestep and the two Baumgarte
/// factors. Also hosts the scalar λ formulas so every solver resolves
/// impulses and nudges identically.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolveContext {
    /// Fixed timestep of the current step (seconds).
    pub dt: f64,
    /// Baumgarte factor folded into impulse lambdas.
    pub impulse_beta: f64,
    /// Fraction of positional drift corrected per nudge iteration.
    pub nudge_beta: f64,
}

impl SolveContext {
    /// Create a context.
    #[must_use]
    pub const fn new(dt: f64, impulse_beta: f64, nudge_beta: f64) -> Self {
        Self {
            dt,
            impulse_beta,
            nudge_beta,
        }
    }

    /// Low-velocity restitution suppression: bodies moving slowly along a
    /// constraint do not bounce, which kills jitter near rest.
    #[must_use]
    pub fn restitution_clamp(velocity: f64) -> f64 {
        let speed = velocity.abs();
        if speed < 0.5 {
            0.0
        } else if speed < 1.0 {
            0.05
        } else if speed < 2.0 {
            0.1
        } else {
            1.0
        }
    }

    /// The velocity-level λ for a row with the given inverse effective
    /// mass, constraint-space velocity, positional drift, and restitution.
    /// Degenerate rows (`m_eff < ε`) yield zero.
    #[must_use]
    pub fn impulse_lambda(
        &self,
        inv_effective_mass: f64,
        effective_velocity: f64,
        drift: f64,
        restitution: f64,
    ) -> f64 {
        if inv_effective_mass < EPSILON {
            return 0.0;
        }
        let bounce = 1.0 + restitution * Self::restitution_clamp(effective_velocity);
        -(bounce * effective_velocity + self.impulse_beta * drift / self.dt) / inv_effective_mass
    }

    /// The position-level λ for a row: remove a `nudge_beta` fraction of
    /// the drift. Degenerate rows yield zero.
    #[must_use]
    pub fn nudge_lambda(&self, inv_effective_mass: f64, drift: f64) -> f64 {
        if inv_effective_mass < EPSILON {
            return 0.0;
        }
        -self.nudge_beta * drift / inv_effective_mass
    }
}
