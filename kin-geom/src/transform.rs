//! Rigid transforms applied to shapes.

use kin_types::EPSILON;
use nalgebra::{Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rigid transform: rotation followed by translation.
///
/// The identity transform is tracked explicitly so shape code can skip the
/// quaternion math entirely for untransformed shapes, which is the common
/// case for collision shapes placed at a body's origin.
///
/// # Example
///
/// ```
/// use kin_geom::Transform;
/// use nalgebra::{Point3, UnitQuaternion, Vector3};
///
/// let t = Transform::from_translation(Vector3::new(1.0, 0.0, 0.0));
/// assert_eq!(t.apply_point(Point3::origin()), Point3::new(1.0, 0.0, 0.0));
/// assert!(Transform::identity().is_identity());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Rotation component.
    pub rotation: UnitQuaternion<f64>,
    /// Translation component, applied after rotation.
    pub translation: Vector3<f64>,
    identity: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
            identity: true,
        }
    }

    /// Create a transform from a translation and a rotation.
    #[must_use]
    pub fn new(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        let identity = translation.norm_squared() < EPSILON * EPSILON
            && rotation.angle() < EPSILON;
        Self {
            rotation,
            translation,
            identity,
        }
    }

    /// Create a pure translation.
    #[must_use]
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::new(translation, UnitQuaternion::identity())
    }

    /// Create a pure rotation.
    #[must_use]
    pub fn from_rotation(rotation: UnitQuaternion<f64>) -> Self {
        Self::new(Vector3::zeros(), rotation)
    }

    /// Whether this transform is (numerically) the identity.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.identity
    }

    /// Apply to a point: rotate, then translate.
    #[must_use]
    pub fn apply_point(&self, point: Point3<f64>) -> Point3<f64> {
        if self.identity {
            return point;
        }
        self.rotation.transform_point(&point) + self.translation
    }

    /// Apply to a direction: rotate only.
    #[must_use]
    pub fn apply_vector(&self, vector: Vector3<f64>) -> Vector3<f64> {
        if self.identity {
            return vector;
        }
        self.rotation.transform_vector(&vector)
    }

    /// Inverse-apply to a point: untranslate, then unrotate.
    #[must_use]
    pub fn inverse_point(&self, point: Point3<f64>) -> Point3<f64> {
        if self.identity {
            return point;
        }
        self.rotation
            .inverse_transform_point(&(point - self.translation))
    }

    /// Inverse-apply to a direction.
    #[must_use]
    pub fn inverse_vector(&self, vector: Vector3<f64>) -> Vector3<f64> {
        if self.identity {
            return vector;
        }
        self.rotation.inverse_transform_vector(&vector)
    }

    /// Compose with another transform: the result applies `self` first,
    /// then `after`.
    #[must_use]
    pub fn then(&self, after: &Transform) -> Self {
        if self.identity {
            return *after;
        }
        if after.identity {
            return *self;
        }
        Self::new(
            after.rotation.transform_vector(&self.translation) + after.translation,
            after.rotation * self.rotation,
        )
    }
}
