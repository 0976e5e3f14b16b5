//! Mesh validation and health reporting.
//!
//! Summarises the defects the repair pipeline cares about without modifying
//! the mesh.

use hashbrown::HashSet;
use mesh_types::TriMesh;

#[cfg(feature = "pipeline-config")]
use serde::{Deserialize, Serialize};

use crate::orient::is_coherently_oriented;
use crate::topology::EdgeMap;

/// Report of mesh validation results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "pipeline-config", derive(Serialize, Deserialize))]
pub struct MeshReport {
    /// Live vertices.
    pub vertex_count: usize,
    /// Live faces.
    pub face_count: usize,
    /// Distinct edges.
    pub edge_count: usize,

    /// Edges used by exactly one face.
    pub boundary_edge_count: usize,
    /// Edges used by more than two faces.
    pub non_manifold_edge_count: usize,
    /// Faces with a repeated vertex or zero area.
    pub degenerate_face_count: usize,
    /// Faces over the same vertex set as an earlier face.
    pub duplicate_face_count: usize,

    /// No boundary edges.
    pub is_watertight: bool,
    /// No non-manifold edges.
    pub is_manifold: bool,
    /// Every shared edge is traversed in opposite directions.
    pub is_oriented: bool,
    /// Signed volume is negative.
    pub is_inside_out: bool,
}

impl MeshReport {
    /// Closed, manifold, coherently and outwardly wound.
    #[must_use]
    pub const fn is_watertight_solid(&self) -> bool {
        self.is_watertight && self.is_manifold && self.is_oriented && !self.is_inside_out
    }

    /// Whether any defect was counted.
    #[must_use]
    pub const fn has_issues(&self) -> bool {
        self.issue_count() > 0
    }

    /// Sum of all defect counts.
    #[must_use]
    pub const fn issue_count(&self) -> usize {
        self.boundary_edge_count
            + self.non_manifold_edge_count
            + self.degenerate_face_count
            + self.duplicate_face_count
    }

    /// Single-line form for progress output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} vertices, {} faces, {} boundary edges, {} non-manifold edges, {}",
            self.vertex_count,
            self.face_count,
            self.boundary_edge_count,
            self.non_manifold_edge_count,
            if self.is_watertight_solid() {
                "watertight"
            } else {
                "not watertight"
            }
        )
    }
}

const fn yes_no(b: bool) -> &'static str {
    if b { "Yes" } else { "No" }
}

impl std::fmt::Display for MeshReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh Report:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Faces: {}", self.face_count)?;
        writeln!(f, "  Edges: {}", self.edge_count)?;
        writeln!(f)?;
        writeln!(f, "  Status:")?;
        writeln!(f, "    Watertight: {}", yes_no(self.is_watertight))?;
        writeln!(f, "    Manifold: {}", yes_no(self.is_manifold))?;
        writeln!(f, "    Oriented: {}", yes_no(self.is_oriented))?;
        writeln!(
            f,
            "    Winding: {}",
            if self.is_inside_out {
                "Inside-out"
            } else {
                "Outward"
            }
        )?;

        if self.has_issues() {
            writeln!(f)?;
            writeln!(f, "  Issues:")?;
            if self.boundary_edge_count > 0 {
                writeln!(f, "    Boundary edges: {}", self.boundary_edge_count)?;
            }
            if self.non_manifold_edge_count > 0 {
                writeln!(
                    f,
                    "    Non-manifold edges: {}",
                    self.non_manifold_edge_count
                )?;
            }
            if self.degenerate_face_count > 0 {
                writeln!(f, "    Degenerate faces: {}", self.degenerate_face_count)?;
            }
            if self.duplicate_face_count > 0 {
                writeln!(f, "    Duplicate faces: {}", self.duplicate_face_count)?;
            }
        }

        Ok(())
    }
}

/// Validate a mesh and report any issues.
///
/// Orientation is judged from the stored adjacency, so it is only meaningful
/// while topology is current; on a stale mesh `is_oriented` is computed from
/// a rebuilt copy.
///
/// # Example
///
/// ```
/// use mesh_types::{TriMesh, Point3};
/// use mesh_repair::validate_mesh;
///
/// let mesh = TriMesh::from_parts(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
///     vec![[0, 1, 2]],
/// );
///
/// let report = validate_mesh(&mesh);
/// assert_eq!(report.face_count, 1);
/// assert_eq!(report.boundary_edge_count, 3);
/// ```
#[must_use]
pub fn validate_mesh(mesh: &TriMesh) -> MeshReport {
    let edges = EdgeMap::build(mesh);

    let is_oriented = if mesh.topology_is_current() {
        is_coherently_oriented(mesh)
    } else {
        let mut copy = mesh.clone();
        crate::topology::build_adjacency(&mut copy);
        is_coherently_oriented(&copy)
    };

    MeshReport {
        vertex_count: mesh.vertex_count(),
        face_count: mesh.face_count(),
        edge_count: edges.edge_count(),
        boundary_edge_count: edges.boundary_edge_count(),
        non_manifold_edge_count: edges.non_manifold_edge_count(),
        degenerate_face_count: count_degenerate_faces(mesh),
        duplicate_face_count: count_duplicate_faces(mesh),
        is_watertight: edges.is_watertight(),
        is_manifold: edges.is_manifold(),
        is_oriented,
        is_inside_out: mesh.face_count() > 0 && mesh.signed_volume() < 0.0,
    }
}

fn count_degenerate_faces(mesh: &TriMesh) -> usize {
    mesh.live_faces()
        .filter(|&(f, face)| face.has_repeated_vertex() || mesh.triangle(f).is_degenerate(0.0))
        .count()
}

fn count_duplicate_faces(mesh: &TriMesh) -> usize {
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(mesh.faces.len());
    mesh.live_faces()
        .filter(|(_, face)| {
            let mut key = face.vertices;
            key.sort_unstable();
            !seen.insert(key)
        })
        .count()
}
