//! Tick configuration: timestep, iteration counts, solver betas and the
//! clamp ceilings applied during integration.

use crate::PhysicsError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration of the fixed-timestep simulation loop.
///
/// All ceilings are configuration, not hard-coded limits: hosts simulating
/// fast projectiles or large worlds raise them as needed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TickConfig {
    /// Fixed timestep for each simulation step (seconds).
    pub timestep: f64,
    /// Elapsed time passed to `advance` is multiplied by this factor.
    pub time_scale: f64,
    /// Number of impulse (velocity) solver iterations per step.
    pub impulse_iterations: usize,
    /// Number of nudge (position) solver iterations per step.
    pub nudge_iterations: usize,
    /// Baumgarte factor folded into impulse lambdas (drift/dt term).
    pub impulse_beta: f64,
    /// Fraction of positional drift corrected per nudge iteration.
    pub nudge_beta: f64,
    /// Ceiling on linear acceleration magnitude (m/s²).
    pub max_acceleration: f64,
    /// Ceiling on angular acceleration magnitude (rad/s²).
    pub max_angular_acceleration: f64,
    /// Ceiling on linear velocity magnitude (m/s).
    pub max_velocity: f64,
    /// Ceiling on angular velocity magnitude (rad/s).
    pub max_angular_velocity: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 120.0,
            time_scale: 1.0,
            impulse_iterations: 8,
            nudge_iterations: 4,
            impulse_beta: 0.2,
            nudge_beta: 0.2,
            max_acceleration: 2_000.0,
            max_angular_acceleration: 2_000.0,
            max_velocity: 250.0,
            max_angular_velocity: 100.0,
        }
    }
}

impl TickConfig {
    /// Create a config with the given timestep and defaults elsewhere.
    #[must_use]
    pub fn with_timestep(timestep: f64) -> Self {
        Self {
            timestep,
            ..Default::default()
        }
    }

    /// 60 Hz configuration for frame-locked game loops.
    #[must_use]
    pub fn realtime() -> Self {
        Self::with_timestep(1.0 / 60.0)
    }

    /// 240 Hz configuration with more solver iterations.
    #[must_use]
    pub fn high_fidelity() -> Self {
        Self {
            timestep: 1.0 / 240.0,
            impulse_iterations: 16,
            nudge_iterations: 8,
            ..Default::default()
        }
    }

    /// Set the solver iteration counts.
    #[must_use]
    pub fn iterations(mut self, impulse: usize, nudge: usize) -> Self {
        self.impulse_iterations = impulse;
        self.nudge_iterations = nudge;
        self
    }

    /// Set the impulse and nudge Baumgarte factors.
    #[must_use]
    pub fn betas(mut self, impulse: f64, nudge: f64) -> Self {
        self.impulse_beta = impulse;
        self.nudge_beta = nudge;
        self
    }

    /// Set the acceleration and velocity ceilings.
    #[must_use]
    pub fn ceilings(
        mut self,
        max_acceleration: f64,
        max_angular_acceleration: f64,
        max_velocity: f64,
        max_angular_velocity: f64,
    ) -> Self {
        self.max_acceleration = max_acceleration;
        self.max_angular_acceleration = max_angular_acceleration;
        self.max_velocity = max_velocity;
        self.max_angular_velocity = max_angular_velocity;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(PhysicsError::InvalidTimestep(self.timestep));
        }
        if self.timestep > 1.0 {
            return Err(PhysicsError::invalid_config(
                "timestep > 1 second is likely an error",
            ));
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(PhysicsError::invalid_config(
                "time_scale must be finite and non-negative",
            ));
        }
        if self.impulse_iterations == 0 {
            return Err(PhysicsError::invalid_config(
                "impulse_iterations must be at least 1",
            ));
        }
        if !(0.0..=2.0).contains(&self.impulse_beta) || !(0.0..=2.0).contains(&self.nudge_beta) {
            return Err(PhysicsError::invalid_config(
                "solver betas must be in [0, 2]",
            ));
        }
        let ceilings = [
            self.max_acceleration,
            self.max_angular_acceleration,
            self.max_velocity,
            self.max_angular_velocity,
        ];
        if ceilings.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return Err(PhysicsError::invalid_config(
                "clamp ceilings must be positive and finite",
            ));
        }
        Ok(())
    }
}
