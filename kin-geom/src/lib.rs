//! Collision geometry: shape primitives, narrow-phase intersection kernels,
//! and a loose-octree broad phase.
//!
//! All geometry is double precision. Shapes carry their own rigid
//! [`Transform`], so transforming a shape yields a shape of the same kind
//! (a transformed box is an oriented box). Intersection kernels produce
//! [`Intersection`] records with a positive penetration depth and unit
//! displacement normals; degenerate configurations report no contact rather
//! than NaN.
//!
//! # Example
//!
//! ```
//! use kin_geom::{Sphere, intersect};
//! use nalgebra::Point3;
//!
//! let a = Sphere::new(1.0).at(Point3::new(0.0, 0.0, 0.0));
//! let b = Sphere::new(1.0).at(Point3::new(1.5, 0.0, 0.0));
//!
//! let hit = intersect::sphere_sphere(&a, &b).unwrap();
//! assert!((hit.depth - 0.5).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]

pub mod intersect;
pub mod octree;
pub mod shape;
pub mod transform;

pub use intersect::{CollectStrategy, Collector, Intersection};
pub use octree::{LooseOctree, OctreeItemId};
pub use shape::{Cuboid, LineSegment, ShapeSet, Sphere, TriMesh, Triangle};
pub use transform::Transform;
