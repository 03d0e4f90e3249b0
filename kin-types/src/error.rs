//! Error types for engine operations.
//!
//! Errors surface only at scene-API boundaries: body creation rejects bad
//! mass properties, configuration is validated up front, and factory calls
//! report stale handles. Numeric degeneracy inside the simulation loop is
//! never an error; it is absorbed locally as a zero impulse or no-op solver.

use thiserror::Error;

/// Errors that can occur at the engine's API boundaries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// A body was created with non-positive or non-finite mass.
    #[error("invalid mass: {0} (must be positive and finite)")]
    InvalidMass(f64),

    /// A body was created with a singular or non-physical inertia tensor.
    #[error("singular inertia tensor: {reason}")]
    SingularInertia {
        /// Description of what's wrong with the tensor.
        reason: String,
    },

    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// A factory call referenced a handle whose entity has been deleted.
    #[error("stale {kind} handle: slot {slot}")]
    StaleHandle {
        /// The kind of entity the handle addressed.
        kind: &'static str,
        /// The slot the handle pointed at.
        slot: u32,
    },

    /// A shape was created with non-positive dimensions.
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of the bad dimension.
        reason: String,
    },
}

impl PhysicsError {
    /// Create a singular-inertia error.
    #[must_use]
    pub fn singular_inertia(reason: impl Into<String>) -> Self {
        Self::SingularInertia {
            reason: reason.into(),
        }
    }

    /// Create an invalid-configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid-shape error.
    #[must_use]
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Create a stale-handle error.
    #[must_use]
    pub const fn stale(kind: &'static str, slot: u32) -> Self {
        Self::StaleHandle { kind, slot }
    }

    /// Check if this is a stale-handle error.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleHandle { .. })
    }
}
