//! Removal of duplicate, unreferenced, degenerate and non-manifold elements.
//!
//! Every pass marks elements deleted and then compacts the mesh, so indices
//! stay contiguous and adjacency is left stale. Rebuild topology before any
//! stage that needs it.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use mesh_types::TriMesh;
use tracing::{debug, info};

#[cfg(feature = "pipeline-config")]
use serde::{Deserialize, Serialize};

use crate::topology::EdgeMap;

/// Counts from the basic cleaning passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "pipeline-config", derive(Serialize, Deserialize))]
pub struct CleanReport {
    /// Vertices merged into an identical earlier vertex.
    pub duplicate_vertices: usize,
    /// Vertices no face referenced.
    pub unreferenced_vertices: usize,
    /// Faces repeating another face's vertex set.
    pub duplicate_faces: usize,
    /// Faces with repeated references or no area.
    pub degenerate_faces: usize,
}

impl CleanReport {
    /// Total elements removed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.duplicate_vertices
            + self.unreferenced_vertices
            + self.duplicate_faces
            + self.degenerate_faces
    }
}

impl fmt::Display for CleanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dup verts, {} unref verts, {} dup faces, {} deg faces",
            self.duplicate_vertices,
            self.unreferenced_vertices,
            self.duplicate_faces,
            self.degenerate_faces
        )
    }
}

/// Run the four basic passes in order: duplicate vertices, unreferenced
/// vertices, duplicate faces, degenerate faces.
///
/// # Example
///
/// ```
/// use mesh_types::unit_cube;
/// use mesh_repair::clean_mesh;
///
/// let mut cube = unit_cube();
/// let report = clean_mesh(&mut cube, 0.0);
/// assert_eq!(report.total(), 0);
/// ```
pub fn clean_mesh(mesh: &mut TriMesh, degenerate_area_threshold: f64) -> CleanReport {
    let report = CleanReport {
        duplicate_vertices: remove_duplicate_vertices(mesh),
        unreferenced_vertices: remove_unreferenced_vertices(mesh),
        duplicate_faces: remove_duplicate_triangles(mesh),
        degenerate_faces: remove_degenerate_triangles(mesh, degenerate_area_threshold),
    };
    info!(%report, "cleaned mesh");
    report
}

/// Merge vertices with bit-identical coordinates.
///
/// The first vertex of each group is kept and faces are remapped onto it.
/// `0.0` and `-0.0` count as equal. Returns the number of vertices removed.
///
/// # Example
///
/// ```
/// use mesh_types::{TriMesh, Point3};
/// use mesh_repair::remove_duplicate_vertices;
///
/// let p = Point3::new(1.0, 2.0, 3.0);
/// let mut mesh = TriMesh::from_parts(
///     vec![Point3::origin(), p, Point3::new(0.0, 1.0, 0.0), p],
///     vec![[0, 1, 2], [0, 3, 2]],
/// );
///
/// assert_eq!(remove_duplicate_vertices(&mut mesh), 1);
/// assert_eq!(mesh.faces[1].vertices, [0, 1, 2]);
/// assert_eq!(remove_duplicate_vertices(&mut mesh), 0);
/// ```
#[allow(clippy::cast_possible_truncation)]
pub fn remove_duplicate_vertices(mesh: &mut TriMesh) -> usize {
    let mut first: HashMap<[u64; 3], u32> = HashMap::with_capacity(mesh.vertices.len());
    let mut remap: Vec<u32> = (0..mesh.vertices.len() as u32).collect();
    let mut removed = 0;

    for i in 0..mesh.vertices.len() {
        if mesh.vertices[i].is_deleted() {
            continue;
        }
        let key = mesh.vertices[i].position_key();
        match first.get(&key) {
            Some(&keep) => {
                remap[i] = keep;
                mesh.delete_vertex(i);
                removed += 1;
            }
            None => {
                first.insert(key, i as u32);
            }
        }
    }

    if removed > 0 {
        for face in &mut mesh.faces {
            for v in &mut face.vertices {
                if let Some(&to) = remap.get(*v as usize) {
                    *v = to;
                }
            }
        }
        mesh.compact();
    }

    debug!(removed, "removed duplicate vertices");
    removed
}

/// Remove vertices that no live face references.
///
/// Returns the number of vertices removed.
pub fn remove_unreferenced_vertices(mesh: &mut TriMesh) -> usize {
    let mut referenced = vec![false; mesh.vertices.len()];
    for (_, face) in mesh.live_faces() {
        for &v in &face.vertices {
            if let Some(r) = referenced.get_mut(v as usize) {
                *r = true;
            }
        }
    }

    let mut removed = 0;
    for (i, used) in referenced.into_iter().enumerate() {
        if !used && !mesh.vertices[i].is_deleted() {
            mesh.delete_vertex(i);
            removed += 1;
        }
    }

    if removed > 0 {
        mesh.compact();
    }

    debug!(removed, "removed unreferenced vertices");
    removed
}

/// Remove faces whose vertex set matches an earlier face.
///
/// Rotations and the opposite winding of the same three vertices all count
/// as duplicates. The first occurrence is kept. Returns the number removed.
///
/// # Example
///
/// ```
/// use mesh_types::{TriMesh, Point3};
/// use mesh_repair::remove_duplicate_triangles;
///
/// let mut mesh = TriMesh::from_parts(
///     vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
///     vec![[0, 1, 2], [1, 2, 0], [0, 2, 1]],
/// );
/// assert_eq!(remove_duplicate_triangles(&mut mesh), 2);
/// ```
pub fn remove_duplicate_triangles(mesh: &mut TriMesh) -> usize {
    let mut seen: HashSet<[u32; 3]> = HashSet::with_capacity(mesh.faces.len());
    let mut removed = 0;

    for f in 0..mesh.faces.len() {
        if mesh.faces[f].is_deleted() {
            continue;
        }
        if !seen.insert(sorted_face(mesh.faces[f].vertices)) {
            mesh.delete_face(f);
            removed += 1;
        }
    }

    if removed > 0 {
        mesh.compact();
    }

    debug!(removed, "removed duplicate faces");
    removed
}

/// Remove faces with a repeated vertex reference or an area at or below
/// `area_threshold`.
///
/// A threshold of `0.0` removes only faces with exactly zero area. Returns
/// the number of faces removed.
pub fn remove_degenerate_triangles(mesh: &mut TriMesh, area_threshold: f64) -> usize {
    let mut removed = 0;

    for f in 0..mesh.faces.len() {
        if mesh.faces[f].is_deleted() {
            continue;
        }
        if mesh.faces[f].has_repeated_vertex() || mesh.triangle(f).is_degenerate(area_threshold) {
            mesh.delete_face(f);
            removed += 1;
        }
    }

    if removed > 0 {
        mesh.compact();
    }

    debug!(removed, "removed degenerate faces");
    removed
}

/// Remove faces until no edge is shared by more than two faces.
///
/// Over-shared edges are visited in vertex-pair order. On each, the two
/// largest surviving faces are kept (ties go to the lower face index) and
/// the rest are deleted. Deleting a face never raises another edge's count,
/// so one pass suffices. Returns the number of faces removed.
pub fn remove_non_manifold_triangles(mesh: &mut TriMesh) -> usize {
    let edges = EdgeMap::build(mesh);
    let mut removed = 0;

    for (a, b) in edges.non_manifold_edges() {
        let mut faces: Vec<usize> = edges
            .incidences(a, b)
            .iter()
            .map(|fe| fe.face_index())
            .filter(|&f| !mesh.faces[f].is_deleted())
            .collect();
        // A face with a repeated vertex can use the same edge twice
        faces.sort_unstable();
        faces.dedup();

        let mut live: Vec<(usize, f64)> = faces
            .into_iter()
            .map(|f| (f, mesh.triangle(f).area()))
            .collect();

        if live.len() <= 2 {
            continue;
        }

        live.sort_by(|x, y| y.1.total_cmp(&x.1).then(x.0.cmp(&y.0)));
        for &(f, _) in &live[2..] {
            mesh.delete_face(f);
            removed += 1;
        }
        debug!(a, b, dropped = live.len() - 2, "resolved over-shared edge");
    }

    if removed > 0 {
        mesh.compact();
    }

    info!(removed, "removed non-manifold faces");
    removed
}

fn sorted_face(mut v: [u32; 3]) -> [u32; 3] {
    v.sort_unstable();
    v
}
