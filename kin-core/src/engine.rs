//! Engine-level entry points: scene factory and body definitions.

use kin_geom::ShapeSet;
use kin_types::{BodyKind, MassProperties, Pose, Result, TickConfig, Velocity};
use nalgebra::{Point3, UnitQuaternion};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::body::AeroSurface;
use crate::scene::Scene;

/// Surface material: friction and restitution coefficients. At a contact
/// the two bodies' coefficients are multiplied.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Friction coefficient, ≥ 0.
    pub friction: f64,
    /// Restitution coefficient in `[0, 1]`.
    pub restitution: f64,
}

impl Material {
    /// Create a material.
    #[must_use]
    pub const fn new(friction: f64, restitution: f64) -> Self {
        Self {
            friction,
            restitution,
        }
    }
}

impl Default for Material {
    /// Moderate friction, no bounce.
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

/// Declarative description of a body, consumed by
/// [`Scene::create_body`](crate::Scene::create_body).
#[derive(Debug, Clone)]
pub struct BodyDef {
    pub(crate) name: String,
    pub(crate) kind: BodyKind,
    pub(crate) mass: MassProperties,
    pub(crate) restitution: f64,
    pub(crate) friction: f64,
    pub(crate) linear_drag: f64,
    pub(crate) angular_drag: f64,
    pub(crate) group: u32,
    pub(crate) pose: Pose,
    pub(crate) velocity: Velocity,
    pub(crate) shapes: ShapeSet,
    pub(crate) aero_surfaces: Vec<AeroSurface>,
}

impl BodyDef {
    /// A dynamic body with the given mass properties and otherwise default
    /// settings: identity pose, at rest, no shapes, default material.
    #[must_use]
    pub fn new(mass: MassProperties) -> Self {
        let material = Material::default();
        Self {
            name: String::new(),
            kind: BodyKind::Dynamic,
            mass,
            restitution: material.restitution,
            friction: material.friction,
            linear_drag: 0.0,
            angular_drag: 0.0,
            group: 0,
            pose: Pose::default(),
            velocity: Velocity::zero(),
            shapes: ShapeSet::new(),
            aero_surfaces: Vec::new(),
        }
    }

    /// A static (immovable) body. Mass properties are irrelevant for
    /// statics; a unit placeholder is stored.
    #[must_use]
    pub fn fixed() -> Self {
        Self::new(MassProperties::unit()).with_kind(BodyKind::Static)
    }

    /// Set the diagnostic name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the kinematic class.
    #[must_use]
    pub const fn with_kind(mut self, kind: BodyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the surface material.
    #[must_use]
    pub const fn with_material(mut self, material: Material) -> Self {
        self.friction = material.friction;
        self.restitution = material.restitution;
        self
    }

    /// Set the linear and angular drag factors.
    #[must_use]
    pub const fn with_drag(mut self, linear: f64, angular: f64) -> Self {
        self.linear_drag = linear;
        self.angular_drag = angular;
        self
    }

    /// Set the collision group. Bodies sharing a non-zero group never
    /// collide with each other; group 0 collides with everything.
    #[must_use]
    pub const fn with_group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }

    /// Set the initial position.
    #[must_use]
    pub fn with_position(mut self, position: Point3<f64>) -> Self {
        self.pose.position = position;
        self
    }

    /// Set the initial orientation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: UnitQuaternion<f64>) -> Self {
        self.pose.rotation = rotation;
        self
    }

    /// Set the initial velocity. Ignored for static bodies.
    #[must_use]
    pub const fn with_velocity(mut self, velocity: Velocity) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the collision shapes.
    #[must_use]
    pub fn with_shapes(mut self, shapes: ShapeSet) -> Self {
        self.shapes = shapes;
        self
    }

    /// Append an aerodynamic surface.
    #[must_use]
    pub fn with_aero_surface(mut self, surface: AeroSurface) -> Self {
        self.aero_surfaces.push(surface);
        self
    }
}

/// Top-level factory holding shared tick settings.
///
/// # Example
///
/// ```
/// use kin_core::Engine;
///
/// let engine = Engine::new(1.0 / 60.0).unwrap();
/// let scene = engine.create_scene().unwrap();
/// assert_eq!(scene.body_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    config: TickConfig,
}

impl Engine {
    /// Create an engine stepping at the given fixed timestep.
    ///
    /// # Errors
    ///
    /// Rejects non-positive or non-finite timesteps.
    pub fn new(timestep: f64) -> Result<Self> {
        Self::with_config(TickConfig::with_timestep(timestep))
    }

    /// Create an engine with a full tick configuration.
    ///
    /// # Errors
    ///
    /// Rejects invalid configurations.
    pub fn with_config(config: TickConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The tick configuration new scenes start from.
    #[must_use]
    pub const fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Create a material.
    #[must_use]
    pub fn material(&self, friction: f64, restitution: f64) -> Material {
        Material::new(friction, restitution)
    }

    /// Create an empty scene with this engine's tick configuration.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation (cannot fail for an engine
    /// built through the checked constructors).
    pub fn create_scene(&self) -> Result<Scene> {
        Scene::new(self.config)
    }
}
