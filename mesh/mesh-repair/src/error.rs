//! Error types for mesh repair operations.

use thiserror::Error;

/// Result type for repair operations.
pub type RepairResult<T> = Result<T, RepairError>;

/// Errors that can occur during mesh repair.
///
/// Geometry problems (duplicates, holes, non-manifold edges) are never
/// errors; they are repaired and counted. Only input the pipeline cannot
/// start from is rejected.
#[derive(Debug, Error)]
pub enum RepairError {
    /// Mesh has neither vertices nor faces.
    #[error("mesh is empty")]
    EmptyMesh,

    /// A face references a vertex that does not exist.
    #[error("face {face} references vertex {index} (mesh has {vertex_count} vertices)")]
    InvalidIndex {
        /// Offending face.
        face: usize,
        /// The invalid index.
        index: u32,
        /// Total number of vertices in the mesh.
        vertex_count: usize,
    },
}
