//! Pairwise narrow-phase intersection kernels.
//!
//! Every kernel returns [`Intersection`] records with a strictly positive
//! penetration depth. `normal_a` is the unit direction that displaces the
//! first shape out of contact; `normal_b` is always its negation. Asymmetric
//! kernels are written once and reused through [`Intersection::flipped`].
//!
//! Degenerate inputs (concentric spheres, zero-area triangles, underflowing
//! denominators) report no contact rather than NaN.

use kin_types::EPSILON;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::shape::{Cuboid, LineSegment, ShapeSet, Sphere, TriMesh, Triangle};

/// A single detected contact between two shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Intersection {
    /// Penetration depth, always positive.
    pub depth: f64,
    /// Contact point on the first shape's surface.
    pub point_a: Point3<f64>,
    /// Unit direction displacing the first shape out of contact.
    pub normal_a: Vector3<f64>,
    /// Contact point on the second shape's surface.
    pub point_b: Point3<f64>,
    /// Unit direction displacing the second shape; `-normal_a`.
    pub normal_b: Vector3<f64>,
}

impl Intersection {
    /// Build a contact record; `normal_b` is derived.
    #[must_use]
    pub fn new(
        depth: f64,
        point_a: Point3<f64>,
        normal_a: Vector3<f64>,
        point_b: Point3<f64>,
    ) -> Self {
        Self {
            depth,
            point_a,
            normal_a,
            point_b,
            normal_b: -normal_a,
        }
    }

    /// The same contact seen from the second shape's side.
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self {
            depth: self.depth,
            point_a: self.point_b,
            normal_a: self.normal_b,
            point_b: self.point_a,
            normal_b: self.normal_a,
        }
    }
}

/// How a caller wants multiple contacts between the same pair reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CollectStrategy {
    /// Keep only the most recently found contact.
    Last,
    /// Keep the deepest contact.
    #[default]
    Worst,
    /// Keep the shallowest contact.
    Best,
    /// Keep every contact.
    All,
}

/// Accumulates contacts according to a [`CollectStrategy`].
#[derive(Debug, Clone)]
pub struct Collector {
    strategy: CollectStrategy,
    hits: Vec<Intersection>,
}

impl Collector {
    /// Create an empty collector.
    #[must_use]
    pub const fn new(strategy: CollectStrategy) -> Self {
        Self {
            strategy,
            hits: Vec::new(),
        }
    }

    /// Offer a contact; whether it is retained depends on the strategy.
    pub fn offer(&mut self, hit: Intersection) {
        match self.strategy {
            CollectStrategy::All => self.hits.push(hit),
            CollectStrategy::Last => {
                self.hits.clear();
                self.hits.push(hit);
            }
            CollectStrategy::Worst => {
                if self.hits.first().map_or(true, |kept| hit.depth > kept.depth) {
                    self.hits.clear();
                    self.hits.push(hit);
                }
            }
            CollectStrategy::Best => {
                if self.hits.first().map_or(true, |kept| hit.depth < kept.depth) {
                    self.hits.clear();
                    self.hits.push(hit);
                }
            }
        }
    }

    /// Whether nothing was retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// The retained contacts.
    #[must_use]
    pub fn into_hits(self) -> Vec<Intersection> {
        self.hits
    }
}

/// Sphere against sphere.
#[must_use]
pub fn sphere_sphere(a: &Sphere, b: &Sphere) -> Option<Intersection> {
    let delta = a.center - b.center;
    let dist = delta.norm();
    let sum = a.radius + b.radius;
    if dist >= sum || dist < EPSILON {
        return None;
    }
    let normal_a = delta / dist;
    Some(Intersection::new(
        sum - dist,
        a.center - normal_a * a.radius,
        normal_a,
        b.center + normal_a * b.radius,
    ))
}

/// Sphere against triangle (face, edge, or vertex contact).
#[must_use]
pub fn sphere_triangle(sphere: &Sphere, triangle: &Triangle) -> Option<Intersection> {
    if triangle.is_degenerate() {
        return None;
    }
    let closest = triangle.closest_point(sphere.center);
    let delta = sphere.center - closest;
    let dist = delta.norm();
    if dist >= sphere.radius || dist < EPSILON {
        return None;
    }
    let normal_a = delta / dist;
    Some(Intersection::new(
        sphere.radius - dist,
        sphere.center - normal_a * sphere.radius,
        normal_a,
        closest,
    ))
}

/// Sphere against mesh: triangles filtered by bounding-sphere overlap.
pub fn sphere_mesh(sphere: &Sphere, mesh: &TriMesh, collector: &mut Collector) {
    if (sphere.center - mesh.centroid()).norm() > sphere.radius + mesh.centroid_radius() {
        return;
    }
    for triangle in mesh.triangles() {
        if (sphere.center - triangle.centroid()).norm()
            > sphere.radius + triangle.bounding_radius()
        {
            continue;
        }
        if let Some(hit) = sphere_triangle(sphere, triangle) {
            collector.offer(hit);
        }
    }
}

/// Line segment against triangle: half-space sign change plus in-triangle
/// test. Depth is the penetration of the deeper endpoint's plane distance,
/// capped by the shallower one.
#[must_use]
pub fn segment_triangle(segment: &LineSegment, triangle: &Triangle) -> Option<Intersection> {
    if triangle.is_degenerate() {
        return None;
    }
    let n = triangle.normal();
    let d_start = (segment.start - triangle.a).dot(&n);
    let d_end = (segment.end - triangle.a).dot(&n);
    // Endpoints must straddle the plane.
    if d_start * d_end >= 0.0 {
        return None;
    }
    let denom = d_start - d_end;
    if denom.abs() < EPSILON {
        return None;
    }
    let t = d_start / denom;
    let crossing = segment.start + (segment.end - segment.start) * t;
    if !triangle.contains_planar_point(crossing) {
        return None;
    }
    let depth = d_start.abs().min(d_end.abs());
    if depth < EPSILON {
        return None;
    }
    // Displace the segment back toward the side its start point is on.
    let normal_a = if d_start > 0.0 { n } else { -n };
    Some(Intersection::new(depth, crossing, normal_a, crossing))
}

/// Box against mesh: the twelve box edges tested as segments against every
/// triangle (filtered by bounding-sphere overlap).
pub fn cuboid_mesh(cuboid: &Cuboid, mesh: &TriMesh, collector: &mut Collector) {
    let box_radius = cuboid.half_extents.norm();
    if (cuboid.center() - mesh.centroid()).norm() > box_radius + mesh.centroid_radius() {
        return;
    }
    let edges = cuboid.edges();
    for triangle in mesh.triangles() {
        let tri_radius = triangle.bounding_radius();
        let tri_centroid = triangle.centroid();
        for edge in &edges {
            if (edge.midpoint() - tri_centroid).norm()
                > edge.length() / 2.0 + tri_radius
            {
                continue;
            }
            if let Some(hit) = segment_triangle(edge, triangle) {
                collector.offer(hit);
            }
        }
    }
}

/// Which region of a box a point falls into, from the count of axes on
/// which it lies beyond the faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoxRegion {
    Inside,
    Face,
    Edge,
    Corner,
}

fn classify(local: &Point3<f64>, half_extents: &Vector3<f64>) -> BoxRegion {
    let mut outside = 0;
    for i in 0..3 {
        if local[i].abs() > half_extents[i] {
            outside += 1;
        }
    }
    match outside {
        0 => BoxRegion::Inside,
        1 => BoxRegion::Face,
        2 => BoxRegion::Edge,
        _ => BoxRegion::Corner,
    }
}

/// Sphere against (possibly oriented) box. The sphere center is classified
/// against the box's six face planes; the region picks the contact formula.
#[must_use]
pub fn sphere_cuboid(sphere: &Sphere, cuboid: &Cuboid) -> Option<Intersection> {
    let h = cuboid.half_extents;
    let local = cuboid.transform.inverse_point(sphere.center);

    let (local_normal, local_surface, depth) = match classify(&local, &h) {
        BoxRegion::Inside => {
            // Push out through the nearest face.
            let mut axis = 0;
            let mut min_gap = f64::INFINITY;
            for i in 0..3 {
                let gap = h[i] - local[i].abs();
                if gap < min_gap {
                    min_gap = gap;
                    axis = i;
                }
            }
            let sign = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
            let mut normal = Vector3::zeros();
            normal[axis] = sign;
            let mut surface = local;
            surface[axis] = sign * h[axis];
            (normal, surface, sphere.radius + min_gap)
        }
        BoxRegion::Face | BoxRegion::Edge | BoxRegion::Corner => {
            let clamped = Point3::new(
                local.x.clamp(-h.x, h.x),
                local.y.clamp(-h.y, h.y),
                local.z.clamp(-h.z, h.z),
            );
            let delta = local - clamped;
            let dist = delta.norm();
            if dist >= sphere.radius || dist < EPSILON {
                return None;
            }
            (delta / dist, clamped, sphere.radius - dist)
        }
    };

    let normal_a = cuboid.transform.apply_vector(local_normal);
    Some(Intersection::new(
        depth,
        sphere.center - normal_a * sphere.radius,
        normal_a,
        cuboid.transform.apply_point(local_surface),
    ))
}

/// One direction of the box-box test: vertices of `b` against the volume of
/// `a`. Contacts are reported with `a` first.
fn cuboid_vertices_in(a: &Cuboid, b: &Cuboid, collector: &mut Collector) {
    let h = a.half_extents;
    for vertex in b.vertices() {
        let local = a.transform.inverse_point(vertex);
        if classify(&local, &h) != BoxRegion::Inside {
            continue;
        }
        let mut axis = 0;
        let mut min_gap = f64::INFINITY;
        for i in 0..3 {
            let gap = h[i] - local[i].abs();
            if gap < min_gap {
                min_gap = gap;
                axis = i;
            }
        }
        if min_gap < EPSILON {
            continue;
        }
        let sign = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
        let mut local_normal = Vector3::zeros();
        local_normal[axis] = sign;
        let mut surface = local;
        surface[axis] = sign * h[axis];

        // The face normal displaces b; a is displaced the other way.
        let outward = a.transform.apply_vector(local_normal);
        collector.offer(Intersection::new(
            min_gap,
            a.transform.apply_point(surface),
            -outward,
            vertex,
        ));
    }
}

/// Box against box via vertex/face region classification, run in both
/// directions.
pub fn cuboid_cuboid(a: &Cuboid, b: &Cuboid, collector: &mut Collector) {
    let gap = (a.center() - b.center()).norm();
    if gap > a.half_extents.norm() + b.half_extents.norm() {
        return;
    }
    cuboid_vertices_in(a, b, collector);

    let mut reversed = Collector::new(CollectStrategy::All);
    cuboid_vertices_in(b, a, &mut reversed);
    for hit in reversed.into_hits() {
        collector.offer(hit.flipped());
    }
}

/// Composite kernel over two shape sets, fanning out across element pairs.
///
/// Mesh-mesh pairs are not supported and report no contact; meshes are
/// expected on static scenery tested against dynamic spheres and boxes.
#[must_use]
pub fn set_set(a: &ShapeSet, b: &ShapeSet, strategy: CollectStrategy) -> Vec<Intersection> {
    let mut collector = Collector::new(strategy);

    for sa in &a.spheres {
        for sb in &b.spheres {
            if let Some(hit) = sphere_sphere(sa, sb) {
                collector.offer(hit);
            }
        }
        for cb in &b.cuboids {
            if let Some(hit) = sphere_cuboid(sa, cb) {
                collector.offer(hit);
            }
        }
        for mb in &b.meshes {
            sphere_mesh(sa, mb, &mut collector);
        }
    }

    for ca in &a.cuboids {
        for sb in &b.spheres {
            if let Some(hit) = sphere_cuboid(sb, ca) {
                collector.offer(hit.flipped());
            }
        }
        for cb in &b.cuboids {
            cuboid_cuboid(ca, cb, &mut collector);
        }
        for mb in &b.meshes {
            cuboid_mesh(ca, mb, &mut collector);
        }
    }

    for ma in &a.meshes {
        let mut reversed = Collector::new(CollectStrategy::All);
        for sb in &b.spheres {
            sphere_mesh(sb, ma, &mut reversed);
        }
        for cb in &b.cuboids {
            cuboid_mesh(cb, ma, &mut reversed);
        }
        for hit in reversed.into_hits() {
            collector.offer(hit.flipped());
        }
    }

    collector.into_hits()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transform::Transform;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn unit_plane_mesh() -> TriMesh {
        // A 4x4 square at y = 0 facing +y.
        TriMesh::new(vec![
            Triangle::new(
                Point3::new(-2.0, 0.0, -2.0),
                Point3::new(2.0, 0.0, 2.0),
                Point3::new(2.0, 0.0, -2.0),
            ),
            Triangle::new(
                Point3::new(-2.0, 0.0, -2.0),
                Point3::new(-2.0, 0.0, 2.0),
                Point3::new(2.0, 0.0, 2.0),
            ),
        ])
    }

    #[test]
    fn test_sphere_sphere_overlap() {
        let a = Sphere::new(1.0).at(Point3::new(0.0, 0.0, 0.0));
        let b = Sphere::new(1.0).at(Point3::new(1.5, 0.0, 0.0));
        let hit = sphere_sphere(&a, &b).unwrap();
        assert_relative_eq!(hit.depth, 0.5, epsilon = 1e-12);
        assert_relative_eq!(hit.normal_a, Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(hit.point_a, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(hit.point_b, Point3::new(0.5, 0.0, 0.0), epsilon = 1e-12);

        // Separated and concentric pairs report nothing.
        let c = Sphere::new(1.0).at(Point3::new(3.0, 0.0, 0.0));
        assert!(sphere_sphere(&a, &c).is_none());
        assert!(sphere_sphere(&a, &a).is_none());
    }

    #[test]
    fn test_sphere_sphere_deterministic() {
        let a = Sphere::new(1.0).at(Point3::new(0.1, 0.2, 0.3));
        let b = Sphere::new(0.7).at(Point3::new(0.9, -0.1, 0.4));
        assert_eq!(sphere_sphere(&a, &b), sphere_sphere(&a, &b));
    }

    #[test]
    fn test_flip_is_involutive() {
        let a = Sphere::new(1.0);
        let b = Sphere::new(1.0).at(Point3::new(0.5, 1.0, 0.0));
        let hit = sphere_sphere(&a, &b).unwrap();
        assert_eq!(hit.flipped().flipped(), hit);
        assert_relative_eq!(hit.flipped().normal_a, -hit.normal_a, epsilon = 1e-12);
    }

    #[test]
    fn test_sphere_triangle_face_contact() {
        let tri = Triangle::new(
            Point3::new(-1.0, 0.0, -1.0),
            Point3::new(1.0, 0.0, -1.0),
            Point3::new(0.0, 0.0, 1.0),
        );
        let sphere = Sphere::new(0.5).at(Point3::new(0.0, 0.3, 0.0));
        let hit = sphere_triangle(&sphere, &tri).unwrap();
        assert_relative_eq!(hit.depth, 0.2, epsilon = 1e-9);
        assert_relative_eq!(hit.normal_a, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-9);

        let clear = Sphere::new(0.5).at(Point3::new(0.0, 2.0, 0.0));
        assert!(sphere_triangle(&clear, &tri).is_none());
    }

    #[test]
    fn test_sphere_mesh_picks_worst() {
        let mesh = unit_plane_mesh();
        let sphere = Sphere::new(0.5).at(Point3::new(0.0, 0.2, 0.0));
        let mut collector = Collector::new(CollectStrategy::Worst);
        sphere_mesh(&sphere, &mesh, &mut collector);
        let hits = collector.into_hits();
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].depth, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_segment_triangle_crossing() {
        let tri = Triangle::new(
            Point3::new(-1.0, 0.0, -1.0),
            Point3::new(1.0, 0.0, -1.0),
            Point3::new(0.0, 0.0, 1.0),
        );
        let seg = LineSegment::new(Point3::new(0.0, 0.5, 0.0), Point3::new(0.0, -0.2, 0.0));
        let hit = segment_triangle(&seg, &tri).unwrap();
        assert_relative_eq!(hit.depth, 0.2, epsilon = 1e-9);
        assert_relative_eq!(hit.point_a, Point3::new(0.0, 0.0, 0.0), epsilon = 1e-9);
        // Start is on the +normal side, so the segment displaces up.
        assert!(hit.normal_a.y > 0.0);

        // Same side: no crossing.
        let above = LineSegment::new(Point3::new(0.0, 0.5, 0.0), Point3::new(0.0, 0.1, 0.0));
        assert!(segment_triangle(&above, &tri).is_none());

        // Crossing outside the triangle.
        let outside = LineSegment::new(Point3::new(5.0, 0.5, 0.0), Point3::new(5.0, -0.5, 0.0));
        assert!(segment_triangle(&outside, &tri).is_none());
    }

    #[test]
    fn test_cuboid_mesh_edge_contacts() {
        let mesh = unit_plane_mesh();
        let cuboid = Cuboid::new(0.5, 0.5, 0.5)
            .transformed(&Transform::from_translation(Vector3::new(0.0, 0.4, 0.0)));
        let mut collector = Collector::new(CollectStrategy::All);
        cuboid_mesh(&cuboid, &mesh, &mut collector);
        let hits = collector.into_hits();
        // The four bottom edges pierce the plane.
        assert!(!hits.is_empty());
        for hit in &hits {
            assert!(hit.depth > 0.0);
        }
    }

    #[test]
    fn test_sphere_cuboid_face_region() {
        let cuboid = Cuboid::new(1.0, 1.0, 1.0);
        let sphere = Sphere::new(0.5).at(Point3::new(1.3, 0.0, 0.0));
        let hit = sphere_cuboid(&sphere, &cuboid).unwrap();
        assert_relative_eq!(hit.depth, 0.2, epsilon = 1e-9);
        assert_relative_eq!(hit.normal_a, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(hit.point_b, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_cuboid_corner_region() {
        let cuboid = Cuboid::new(1.0, 1.0, 1.0);
        let offset = 1.0 + 0.2 / 3.0_f64.sqrt();
        let sphere = Sphere::new(0.5).at(Point3::new(offset, offset, offset));
        let hit = sphere_cuboid(&sphere, &cuboid).unwrap();
        assert_relative_eq!(hit.depth, 0.3, epsilon = 1e-9);
        let expected = Vector3::new(1.0, 1.0, 1.0).normalize();
        assert_relative_eq!(hit.normal_a, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_cuboid_inside() {
        let cuboid = Cuboid::new(1.0, 1.0, 1.0);
        let sphere = Sphere::new(0.25).at(Point3::new(0.8, 0.0, 0.0));
        let hit = sphere_cuboid(&sphere, &cuboid).unwrap();
        // Depth is radius plus the gap to the nearest face.
        assert_relative_eq!(hit.depth, 0.25 + 0.2, epsilon = 1e-9);
        assert_relative_eq!(hit.normal_a, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_oriented_cuboid() {
        // Rotate the box 45 degrees about z and probe its +x face.
        let rotation = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_4);
        let cuboid = Cuboid::new(1.0, 1.0, 1.0).transformed(&Transform::from_rotation(rotation));
        let face_dir = rotation.transform_vector(&Vector3::x());
        let sphere = Sphere::new(0.5).at(Point3::from(face_dir * 1.3));
        let hit = sphere_cuboid(&sphere, &cuboid).unwrap();
        assert_relative_eq!(hit.depth, 0.2, epsilon = 1e-9);
        assert_relative_eq!(hit.normal_a, face_dir, epsilon = 1e-9);
    }

    #[test]
    fn test_cuboid_cuboid_overlap() {
        let a = Cuboid::new(1.0, 1.0, 1.0);
        let b = Cuboid::new(1.0, 1.0, 1.0)
            .transformed(&Transform::from_translation(Vector3::new(1.5, 0.0, 0.0)));
        let mut collector = Collector::new(CollectStrategy::Worst);
        cuboid_cuboid(&a, &b, &mut collector);
        let hits = collector.into_hits();
        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        assert_relative_eq!(hit.depth, 0.5, epsilon = 1e-9);
        // a is displaced away from b, along -x.
        assert_relative_eq!(hit.normal_a.x.abs(), 1.0, epsilon = 1e-9);

        let far = Cuboid::new(1.0, 1.0, 1.0)
            .transformed(&Transform::from_translation(Vector3::new(5.0, 0.0, 0.0)));
        let mut collector = Collector::new(CollectStrategy::Worst);
        cuboid_cuboid(&a, &far, &mut collector);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_set_set_composite() {
        let a = ShapeSet::new().with_sphere(Sphere::new(0.5));
        let b = ShapeSet::new().with_mesh(unit_plane_mesh());

        // Sphere resting slightly into the plane.
        let a_world = a.transformed(&Transform::from_translation(Vector3::new(0.0, 0.4, 0.0)));
        let hits = set_set(&a_world, &b, CollectStrategy::Worst);
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].depth, 0.1, epsilon = 1e-9);
        assert!(hits[0].normal_a.y > 0.0);

        // And mesh-first ordering flips the normal.
        let hits = set_set(&b, &a_world, CollectStrategy::Worst);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].normal_a.y < 0.0);
    }

    #[test]
    fn test_collector_strategies() {
        let shallow = Intersection::new(0.1, Point3::origin(), Vector3::x(), Point3::origin());
        let deep = Intersection::new(0.9, Point3::origin(), Vector3::x(), Point3::origin());

        let mut c = Collector::new(CollectStrategy::Worst);
        c.offer(shallow);
        c.offer(deep);
        assert_relative_eq!(c.into_hits()[0].depth, 0.9, epsilon = 1e-12);

        let mut c = Collector::new(CollectStrategy::Best);
        c.offer(deep);
        c.offer(shallow);
        assert_relative_eq!(c.into_hits()[0].depth, 0.1, epsilon = 1e-12);

        let mut c = Collector::new(CollectStrategy::Last);
        c.offer(deep);
        c.offer(shallow);
        assert_relative_eq!(c.into_hits()[0].depth, 0.1, epsilon = 1e-12);

        let mut c = Collector::new(CollectStrategy::All);
        c.offer(deep);
        c.offer(shallow);
        assert_eq!(c.into_hits().len(), 2);
    }
}
