//! Repair of triangle meshes into closed, manifold, consistently oriented
//! surfaces.
//!
//! This crate provides:
//! - Face adjacency and border marking ([`build_adjacency`], [`mark_borders`])
//! - Duplicate, unreferenced and degenerate element removal
//! - Non-manifold face removal
//! - Hole detection and intersection-aware hole filling
//! - Coherent orientation with orientability reporting
//! - Validation reports
//! - The full pipeline ([`repair_mesh`])
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with no engine dependencies.
//!
//! # Example
//!
//! ```
//! use mesh_types::open_box;
//! use mesh_repair::{RepairParams, repair_mesh, validate_mesh};
//!
//! let mut mesh = open_box();
//! assert_eq!(validate_mesh(&mesh).boundary_edge_count, 4);
//!
//! let report = repair_mesh(&mut mesh, &RepairParams::default()).unwrap();
//! println!("{report}");
//!
//! assert!(validate_mesh(&mesh).is_watertight_solid());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod clean;
mod error;
pub mod holes;
pub mod intersect;
mod orient;
mod pipeline;
mod topology;
mod validate;

pub use clean::{
    CleanReport, clean_mesh, remove_degenerate_triangles, remove_duplicate_triangles,
    remove_duplicate_vertices, remove_non_manifold_triangles, remove_unreferenced_vertices,
};
pub use error::{RepairError, RepairResult};
pub use orient::{OrientationReport, is_coherently_oriented, orient_coherently};
pub use pipeline::{RepairParams, RepairReport, repair_mesh};
pub use topology::{EdgeMap, build_adjacency, check_adjacency_symmetry, mark_borders};
pub use validate::{MeshReport, validate_mesh};

// Re-export commonly used items from submodules
pub use holes::{BoundaryLoop, HoleFillParams, HoleFillReport, detect_holes, fill_holes};
pub use intersect::{FaceGrid, faces_intersect, triangles_intersect};
