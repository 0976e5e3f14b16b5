//! Core mesh types for surface repair.
//!
//! This crate provides the mesh store every repair stage mutates:
//!
//! - [`Vertex`] - Position, normal, flag bits and an epoch mark
//! - [`Face`] - Three vertex references, normal, flag bits and per-edge adjacency
//! - [`TriMesh`] - The arena owning all vertices and faces
//! - [`Triangle`] - A concrete triangle with vertex positions
//! - [`Aabb`] - Axis-aligned bounding box
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero engine dependencies**. It can be used in:
//! - CLI tools
//! - Batch pipelines in front of a volume mesher
//! - Servers
//!
//! # Indices, not pointers
//!
//! Faces reference vertices by `u32` index into [`TriMesh::vertices`], and
//! neighbouring faces by [`FaceEdge`] (face index + local edge number). The
//! mesh is the single owner of every element. Indices are stable only until
//! the next compaction.
//!
//! # Edge convention
//!
//! Edge `i` of a face runs from `vertices[i]` to `vertices[(i + 1) % 3]`.
//! Two faces are consistently oriented when they traverse their shared edge
//! in opposite directions.
//!
//! # Example
//!
//! ```
//! use mesh_types::{TriMesh, Point3};
//!
//! let mut mesh = TriMesh::new();
//! let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
//! let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
//! let c = mesh.add_vertex(Point3::new(0.5, 1.0, 0.0));
//! mesh.add_face([a, b, c]);
//!
//! assert_eq!(mesh.face_count(), 1);
//! assert!(!mesh.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod bounds;
mod face;
mod mesh;
mod triangle;
mod vertex;

pub use bounds::Aabb;
pub use face::{Face, FaceEdge, FaceFlags};
pub use mesh::{TriMesh, open_box, unit_cube};
pub use triangle::Triangle;
pub use vertex::{Vertex, VertexFlags};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, Vector3};
