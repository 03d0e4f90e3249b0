//! Shape primitives with bounding-sphere caches.
//!
//! Every shape supports [`transformed`](Sphere::transformed), producing a
//! shape of the same kind moved by a rigid [`Transform`]. Bounding radii are
//! measured about the owning body's local origin so the broad phase can use
//! a single enclosing sphere per body.

use kin_types::{PhysicsError, Result, EPSILON};
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// A sphere with an explicit center.
///
/// [`Sphere::new`] places the center at the local origin; use [`Sphere::at`]
/// or [`Sphere::transformed`] to offset it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sphere {
    /// Center point.
    pub center: Point3<f64>,
    /// Radius, must be positive.
    pub radius: f64,
}

impl Sphere {
    /// Create a sphere of the given radius centered at the origin.
    #[must_use]
    pub fn new(radius: f64) -> Self {
        Self {
            center: Point3::origin(),
            radius,
        }
    }

    /// Move the sphere's center.
    #[must_use]
    pub fn at(mut self, center: Point3<f64>) -> Self {
        self.center = center;
        self
    }

    /// The sphere moved by a rigid transform.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            center: transform.apply_point(self.center),
            radius: self.radius,
        }
    }

    /// Radius of the enclosing sphere about the local origin.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        self.center.coords.norm() + self.radius
    }

    fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(PhysicsError::invalid_shape(format!(
                "sphere radius must be positive, got {}",
                self.radius
            )));
        }
        Ok(())
    }
}

/// A box with half-extents in its own frame, carried by a rigid transform.
///
/// An untransformed cuboid is axis-aligned; transforming it yields an
/// oriented box of the same half-extents.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cuboid {
    /// Half-extents along the box's own axes, all positive.
    pub half_extents: Vector3<f64>,
    /// Placement of the box frame.
    pub transform: Transform,
}

impl Cuboid {
    /// Create an axis-aligned box with the given half-extents.
    #[must_use]
    pub fn new(hx: f64, hy: f64, hz: f64) -> Self {
        Self {
            half_extents: Vector3::new(hx, hy, hz),
            transform: Transform::identity(),
        }
    }

    /// The box moved by a rigid transform.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            half_extents: self.half_extents,
            transform: self.transform.then(transform),
        }
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        Point3::from(self.transform.translation)
    }

    /// Radius of the enclosing sphere about the local origin.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        self.transform.translation.norm() + self.half_extents.norm()
    }

    /// The eight corners in world space.
    #[must_use]
    pub fn vertices(&self) -> [Point3<f64>; 8] {
        let h = self.half_extents;
        let mut out = [Point3::origin(); 8];
        for (i, corner) in out.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -h.x } else { h.x };
            let sy = if i & 2 == 0 { -h.y } else { h.y };
            let sz = if i & 4 == 0 { -h.z } else { h.z };
            *corner = self.transform.apply_point(Point3::new(sx, sy, sz));
        }
        out
    }

    /// The twelve edges as world-space segments.
    #[must_use]
    pub fn edges(&self) -> [LineSegment; 12] {
        let v = self.vertices();
        // Vertex index bit k selects the sign along axis k; an edge joins
        // vertices differing in exactly one bit.
        let pairs = [
            (0, 1),
            (2, 3),
            (4, 5),
            (6, 7),
            (0, 2),
            (1, 3),
            (4, 6),
            (5, 7),
            (0, 4),
            (1, 5),
            (2, 6),
            (3, 7),
        ];
        pairs.map(|(a, b)| LineSegment::new(v[a], v[b]))
    }

    fn validate(&self) -> Result<()> {
        let h = self.half_extents;
        if !(h.x.is_finite() && h.y.is_finite() && h.z.is_finite())
            || h.x <= 0.0
            || h.y <= 0.0
            || h.z <= 0.0
        {
            return Err(PhysicsError::invalid_shape(format!(
                "box half-extents must be positive, got ({}, {}, {})",
                h.x, h.y, h.z
            )));
        }
        Ok(())
    }
}

/// A line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineSegment {
    /// Start point.
    pub start: Point3<f64>,
    /// End point.
    pub end: Point3<f64>,
}

impl LineSegment {
    /// Create a segment from two endpoints.
    #[must_use]
    pub const fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self { start, end }
    }

    /// The segment moved by a rigid transform.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            start: transform.apply_point(self.start),
            end: transform.apply_point(self.end),
        }
    }

    /// Midpoint of the segment.
    #[must_use]
    pub fn midpoint(&self) -> Point3<f64> {
        nalgebra::center(&self.start, &self.end)
    }

    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

/// A triangle with a cached unit normal.
///
/// The normal follows the winding `(b - a) × (c - a)`. A degenerate triangle
/// (near-zero area) stores a zero normal; kernels treat it as untouchable.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle {
    /// First vertex.
    pub a: Point3<f64>,
    /// Second vertex.
    pub b: Point3<f64>,
    /// Third vertex.
    pub c: Point3<f64>,
    normal: Vector3<f64>,
}

impl Triangle {
    /// Create a triangle from three vertices, computing the cached normal.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Self {
        let cross = (b - a).cross(&(c - a));
        let norm = cross.norm();
        let normal = if norm > EPSILON {
            cross / norm
        } else {
            Vector3::zeros()
        };
        Self { a, b, c, normal }
    }

    /// The cached unit normal, or zero for a degenerate triangle.
    #[must_use]
    pub const fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// Whether the triangle has near-zero area.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.normal == Vector3::zeros()
    }

    /// Centroid of the three vertices.
    #[must_use]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.a.coords + self.b.coords + self.c.coords) / 3.0)
    }

    /// Triangle area.
    #[must_use]
    pub fn area(&self) -> f64 {
        (self.b - self.a).cross(&(self.c - self.a)).norm() / 2.0
    }

    /// Radius of the smallest centroid-centered sphere containing all
    /// vertices.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        let centroid = self.centroid();
        (self.a - centroid)
            .norm()
            .max((self.b - centroid).norm())
            .max((self.c - centroid).norm())
    }

    /// The triangle moved by a rigid transform.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            a: transform.apply_point(self.a),
            b: transform.apply_point(self.b),
            c: transform.apply_point(self.c),
            normal: transform.apply_vector(self.normal),
        }
    }

    /// The vertices in winding order.
    #[must_use]
    pub const fn vertices(&self) -> [Point3<f64>; 3] {
        [self.a, self.b, self.c]
    }

    /// Whether a point known to lie on the triangle's plane falls inside the
    /// triangle, tested against the three inward edge normals.
    #[must_use]
    pub fn contains_planar_point(&self, point: Point3<f64>) -> bool {
        if self.is_degenerate() {
            return false;
        }
        let verts = self.vertices();
        for i in 0..3 {
            let start = verts[i];
            let tangent = verts[(i + 1) % 3] - start;
            let inward = self.normal.cross(&tangent);
            if (point - start).dot(&inward) < -EPSILON {
                return false;
            }
        }
        true
    }

    /// Closest point on the triangle (face, edge, or vertex) to `point`.
    #[must_use]
    pub fn closest_point(&self, point: Point3<f64>) -> Point3<f64> {
        let projected = point - self.normal * (point - self.a).dot(&self.normal);
        if self.contains_planar_point(projected) {
            return projected;
        }
        let verts = self.vertices();
        let mut best = self.a;
        let mut best_dist = f64::INFINITY;
        for i in 0..3 {
            let start = verts[i];
            let end = verts[(i + 1) % 3];
            let edge = end - start;
            let len_sq = edge.norm_squared();
            let t = if len_sq > EPSILON * EPSILON {
                ((point - start).dot(&edge) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let candidate = start + edge * t;
            let dist = (point - candidate).norm_squared();
            if dist < best_dist {
                best_dist = dist;
                best = candidate;
            }
        }
        best
    }
}

/// An immutable triangle list with a precomputed centroid and enclosing
/// bounding sphere.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriMesh {
    triangles: Vec<Triangle>,
    centroid: Point3<f64>,
    radius: f64,
}

impl TriMesh {
    /// Build a mesh from triangles, computing the centroid and radius.
    #[must_use]
    pub fn new(triangles: Vec<Triangle>) -> Self {
        if triangles.is_empty() {
            return Self::default();
        }
        let mut sum = Vector3::zeros();
        let mut count = 0.0;
        for tri in &triangles {
            for v in tri.vertices() {
                sum += v.coords;
                count += 1.0;
            }
        }
        let centroid = Point3::from(sum / count);
        let mut radius: f64 = 0.0;
        for tri in &triangles {
            for v in tri.vertices() {
                radius = radius.max((v - centroid).norm());
            }
        }
        Self {
            triangles,
            centroid,
            radius,
        }
    }

    /// The triangles.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Precomputed mesh centroid.
    #[must_use]
    pub const fn centroid(&self) -> Point3<f64> {
        self.centroid
    }

    /// Radius of the enclosing sphere about the local origin.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        self.centroid.coords.norm() + self.radius
    }

    /// Radius of the enclosing sphere about the mesh centroid.
    #[must_use]
    pub const fn centroid_radius(&self) -> f64 {
        self.radius
    }

    /// The mesh moved by a rigid transform.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            triangles: self
                .triangles
                .iter()
                .map(|t| t.transformed(transform))
                .collect(),
            centroid: transform.apply_point(self.centroid),
            radius: self.radius,
        }
    }
}

/// An aggregate of spheres, boxes, and meshes with one enclosing bounding
/// sphere, used as a body's collision shape set.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeSet {
    /// Sphere elements.
    pub spheres: Vec<Sphere>,
    /// Box elements.
    pub cuboids: Vec<Cuboid>,
    /// Mesh elements.
    pub meshes: Vec<TriMesh>,
}

impl ShapeSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sphere.
    #[must_use]
    pub fn with_sphere(mut self, sphere: Sphere) -> Self {
        self.spheres.push(sphere);
        self
    }

    /// Add a box.
    #[must_use]
    pub fn with_cuboid(mut self, cuboid: Cuboid) -> Self {
        self.cuboids.push(cuboid);
        self
    }

    /// Add a mesh.
    #[must_use]
    pub fn with_mesh(mut self, mesh: TriMesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// Whether the set has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty() && self.cuboids.is_empty() && self.meshes.is_empty()
    }

    /// Radius of the enclosing sphere about the local origin: the largest
    /// element bounding radius including each element's offset.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        let mut radius: f64 = 0.0;
        for s in &self.spheres {
            radius = radius.max(s.bounding_radius());
        }
        for c in &self.cuboids {
            radius = radius.max(c.bounding_radius());
        }
        for m in &self.meshes {
            radius = radius.max(m.bounding_radius());
        }
        radius
    }

    /// The set moved by a rigid transform.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            spheres: self
                .spheres
                .iter()
                .map(|s| s.transformed(transform))
                .collect(),
            cuboids: self
                .cuboids
                .iter()
                .map(|c| c.transformed(transform))
                .collect(),
            meshes: self
                .meshes
                .iter()
                .map(|m| m.transformed(transform))
                .collect(),
        }
    }

    /// Reject non-positive or non-finite dimensions.
    pub fn validate(&self) -> Result<()> {
        for s in &self.spheres {
            s.validate()?;
        }
        for c in &self.cuboids {
            c.validate()?;
        }
        Ok(())
    }
}
