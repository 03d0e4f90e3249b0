//! The fluid medium surrounding all bodies.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Density and bulk velocity of the medium the scene is immersed in.
///
/// Drag and aerodynamic forces are computed against the velocity of a body
/// *relative to* the medium, so a non-zero medium velocity acts as wind.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Medium {
    /// Density in kg/m³.
    pub density: f64,
    /// Bulk velocity of the medium (wind), world frame, m/s.
    pub velocity: Vector3<f64>,
}

impl Default for Medium {
    fn default() -> Self {
        Self::still_air()
    }
}

impl Medium {
    /// Sea-level air at rest (ρ = 1.2 kg/m³).
    #[must_use]
    pub fn still_air() -> Self {
        Self {
            density: 1.2,
            velocity: Vector3::zeros(),
        }
    }

    /// A vacuum: no drag, no aerodynamic forces.
    #[must_use]
    pub fn vacuum() -> Self {
        Self {
            density: 0.0,
            velocity: Vector3::zeros(),
        }
    }

    /// Still air with the given density.
    #[must_use]
    pub fn with_density(density: f64) -> Self {
        Self {
            density,
            velocity: Vector3::zeros(),
        }
    }

    /// Set the wind velocity.
    #[must_use]
    pub fn with_wind(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }
}
