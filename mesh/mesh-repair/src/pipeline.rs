//! The full repair pipeline.
//!
//! Clean, build topology, remove non-manifold faces, rebuild, mark borders,
//! fill holes, rebuild, orient. Each stage mutates the mesh in place and the
//! counts are gathered into a [`RepairReport`].

use std::fmt;

use mesh_types::TriMesh;
use tracing::{info, info_span, warn};

#[cfg(feature = "pipeline-config")]
use serde::{Deserialize, Serialize};

use crate::clean::{CleanReport, clean_mesh, remove_non_manifold_triangles};
use crate::error::{RepairError, RepairResult};
use crate::holes::{HoleFillParams, HoleFillReport, fill_holes};
use crate::intersect::DEFAULT_INTERSECTION_EPSILON;
use crate::orient::{OrientationReport, orient_coherently};
use crate::topology::{build_adjacency, mark_borders};

/// Parameters for [`repair_mesh`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "pipeline-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "pipeline-config", serde(default))]
pub struct RepairParams {
    /// Faces with area at or below this are degenerate.
    pub degenerate_area_threshold: f64,

    /// Holes with more boundary edges than this stay open.
    pub max_hole_edges: usize,

    /// Only fill holes bordered by a selected face.
    pub selected_only: bool,

    /// Shrink distance for triangles sharing vertices in the intersection guard.
    pub intersection_epsilon: f64,

    /// Turn closed components so their normals point outward.
    pub orient_outward: bool,

    /// Recompute face and vertex normals once the surface is final.
    pub recompute_normals: bool,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            degenerate_area_threshold: 0.0,
            max_hole_edges: 10_000,
            selected_only: false,
            intersection_epsilon: DEFAULT_INTERSECTION_EPSILON,
            orient_outward: true,
            recompute_normals: true,
        }
    }
}

impl RepairParams {
    /// Set the degenerate area threshold.
    #[must_use]
    pub const fn with_degenerate_area_threshold(mut self, threshold: f64) -> Self {
        self.degenerate_area_threshold = threshold;
        self
    }

    /// Set the hole size limit.
    #[must_use]
    pub const fn with_max_hole_edges(mut self, max: usize) -> Self {
        self.max_hole_edges = max;
        self
    }

    /// Restrict hole filling to selected faces.
    #[must_use]
    pub const fn with_selected_only(mut self, selected_only: bool) -> Self {
        self.selected_only = selected_only;
        self
    }

    /// Set the intersection guard epsilon.
    #[must_use]
    pub const fn with_intersection_epsilon(mut self, epsilon: f64) -> Self {
        self.intersection_epsilon = epsilon;
        self
    }

    /// Enable or disable outward orientation.
    #[must_use]
    pub const fn with_orient_outward(mut self, outward: bool) -> Self {
        self.orient_outward = outward;
        self
    }

    /// Enable or disable the final normal pass.
    #[must_use]
    pub const fn with_recompute_normals(mut self, recompute: bool) -> Self {
        self.recompute_normals = recompute;
        self
    }

    /// Hole filling parameters derived from these.
    #[must_use]
    pub const fn hole_fill_params(&self) -> HoleFillParams {
        HoleFillParams {
            max_hole_edges: self.max_hole_edges,
            selected_only: self.selected_only,
            intersection_epsilon: self.intersection_epsilon,
        }
    }
}

/// Everything [`repair_mesh`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "pipeline-config", derive(Serialize, Deserialize))]
pub struct RepairReport {
    /// Live vertices before repair.
    pub initial_vertices: usize,
    /// Live faces before repair.
    pub initial_faces: usize,
    /// Basic cleaning counts.
    pub clean: CleanReport,
    /// Faces removed to make every edge manifold.
    pub non_manifold_faces: usize,
    /// Border edges found before hole filling.
    pub border_edges: usize,
    /// Hole filling counts.
    pub holes: HoleFillReport,
    /// Orientation outcome.
    pub orientation: OrientationReport,
    /// Live vertices after repair.
    pub final_vertices: usize,
    /// Live faces after repair.
    pub final_faces: usize,
}

impl RepairReport {
    /// Whether any stage changed the mesh.
    #[must_use]
    pub const fn had_changes(&self) -> bool {
        self.clean.total() > 0
            || self.non_manifold_faces > 0
            || self.holes.triangles_added > 0
            || self.orientation.faces_flipped > 0
    }
}

impl fmt::Display for RepairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Repair Report:")?;
        writeln!(
            f,
            "  Input: {} vertices, {} faces",
            self.initial_vertices, self.initial_faces
        )?;
        writeln!(f, "  Cleaned: {}", self.clean)?;
        writeln!(f, "  Non-manifold faces removed: {}", self.non_manifold_faces)?;
        writeln!(f, "  Holes: {}", self.holes)?;
        writeln!(f, "  Orientation: {}", self.orientation)?;
        write!(
            f,
            "  Output: {} vertices, {} faces",
            self.final_vertices, self.final_faces
        )
    }
}

/// Run the whole repair pipeline on `mesh`.
///
/// # Errors
///
/// Returns [`RepairError::EmptyMesh`] if the mesh has neither vertices nor
/// faces and [`RepairError::InvalidIndex`] if a face references a vertex
/// that does not exist. Geometry defects are repaired and counted.
///
/// # Example
///
/// ```
/// use mesh_types::open_box;
/// use mesh_repair::{RepairParams, repair_mesh};
///
/// let mut mesh = open_box();
/// let report = repair_mesh(&mut mesh, &RepairParams::default()).unwrap();
///
/// assert_eq!(report.holes.holes_filled, 1);
/// assert_eq!(report.final_faces, 12);
/// assert!(report.orientation.is_oriented);
/// ```
pub fn repair_mesh(mesh: &mut TriMesh, params: &RepairParams) -> RepairResult<RepairReport> {
    if mesh.vertices.is_empty() && mesh.faces.is_empty() {
        return Err(RepairError::EmptyMesh);
    }
    if let Some((face, index)) = mesh.first_invalid_index() {
        return Err(RepairError::InvalidIndex {
            face,
            index,
            vertex_count: mesh.vertices.len(),
        });
    }

    let _span = info_span!("repair_mesh").entered();
    let mut report = RepairReport {
        initial_vertices: mesh.vertex_count(),
        initial_faces: mesh.face_count(),
        ..RepairReport::default()
    };

    report.clean = clean_mesh(mesh, params.degenerate_area_threshold);

    build_adjacency(mesh);
    report.non_manifold_faces = remove_non_manifold_triangles(mesh);
    build_adjacency(mesh);
    report.border_edges = mark_borders(mesh);

    report.holes = fill_holes(mesh, &params.hole_fill_params());
    if report.holes.holes_left_open() > 0 {
        warn!(open = report.holes.holes_left_open(), "mesh still has open holes");
    }
    // fill_holes leaves adjacency rebuilt

    report.orientation = orient_coherently(mesh, params.orient_outward);

    if params.recompute_normals {
        mesh.update_face_normals();
        mesh.update_vertex_normals();
    }

    report.final_vertices = mesh.vertex_count();
    report.final_faces = mesh.face_count();
    info!(
        vertices = report.final_vertices,
        faces = report.final_faces,
        "repair finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{Point3, unit_cube};

    #[test]
    fn clean_cube_passes_through() {
        let mut cube = unit_cube();
        let report = repair_mesh(&mut cube, &RepairParams::default()).unwrap();

        assert!(!report.had_changes());
        assert_eq!(report.final_faces, 12);
        assert_eq!(report.holes.holes_found, 0);
        assert!(report.orientation.is_oriented);
    }

    #[test]
    fn empty_mesh_rejected() {
        let mut mesh = TriMesh::new();
        assert!(matches!(
            repair_mesh(&mut mesh, &RepairParams::default()),
            Err(RepairError::EmptyMesh)
        ));
    }

    #[test]
    fn out_of_range_index_rejected() {
        let mut mesh = TriMesh::from_parts(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            vec![[0, 1, 2]],
        );
        let err = repair_mesh(&mut mesh, &RepairParams::default()).unwrap_err();
        assert!(matches!(
            err,
            RepairError::InvalidIndex {
                face: 0,
                index: 2,
                vertex_count: 2
            }
        ));
    }

    #[test]
    fn normals_recomputed() {
        let mut cube = unit_cube();
        repair_mesh(&mut cube, &RepairParams::default()).unwrap();
        assert!(
            cube.faces
                .iter()
                .all(|f| (f.normal.norm() - 1.0).abs() < 1e-12)
        );
        assert!(
            cube.vertices
                .iter()
                .all(|v| (v.normal.norm() - 1.0).abs() < 1e-12)
        );
    }

    #[test]
    fn inside_out_cube_flipped_when_outward() {
        let mut cube = unit_cube();
        for f in 0..12 {
            cube.flip_face(f);
        }
        let report = repair_mesh(&mut cube, &RepairParams::default()).unwrap();
        assert_eq!(report.orientation.faces_flipped, 12);
        assert!(cube.signed_volume() > 0.0);

        let mut kept = unit_cube();
        for f in 0..12 {
            kept.flip_face(f);
        }
        let params = RepairParams::default().with_orient_outward(false);
        let report = repair_mesh(&mut kept, &params).unwrap();
        assert_eq!(report.orientation.faces_flipped, 0);
    }

    #[test]
    fn report_display() {
        let mut cube = unit_cube();
        let text = repair_mesh(&mut cube, &RepairParams::default())
            .unwrap()
            .to_string();
        assert!(text.contains("Input: 8 vertices, 12 faces"));
        assert!(text.contains("Output: 8 vertices, 12 faces"));
    }

    #[test]
    fn hole_params_forwarded() {
        let params = RepairParams::default()
            .with_max_hole_edges(3)
            .with_selected_only(true);
        let holes = params.hole_fill_params();
        assert_eq!(holes.max_hole_edges, 3);
        assert!(holes.selected_only);
    }
}
