//! Face-face adjacency and border flags.
//!
//! Adjacency is derived from an edge map keyed on the unordered vertex pair.
//! It must be rebuilt after any change to the face set; [`TriMesh`] tracks
//! whether the stored links are current.

use hashbrown::HashMap;
use mesh_types::{FaceEdge, FaceFlags, TriMesh, VertexFlags};
use tracing::debug;

/// Unordered vertex pair to the face edges that use it.
///
/// Built from live faces only.
///
/// # Example
///
/// ```
/// use mesh_types::{TriMesh, Point3};
/// use mesh_repair::EdgeMap;
///
/// let mesh = TriMesh::from_parts(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///         Point3::new(1.0, 1.0, 0.0),
///     ],
///     vec![[0, 1, 2], [2, 1, 3]],
/// );
/// let edges = EdgeMap::build(&mesh);
///
/// assert_eq!(edges.edge_count(), 5);
/// assert_eq!(edges.boundary_edge_count(), 4);
/// assert!(edges.is_manifold());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EdgeMap {
    edges: HashMap<(u32, u32), Vec<FaceEdge>>,
}

impl EdgeMap {
    /// Collect every edge of every live face.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: face indices are u32 throughout the mesh store
    pub fn build(mesh: &TriMesh) -> Self {
        let mut edges: HashMap<(u32, u32), Vec<FaceEdge>> =
            HashMap::with_capacity(mesh.faces.len() * 3 / 2);

        for (f, face) in mesh.live_faces() {
            for i in 0..3 {
                let (a, b) = face.edge(i);
                edges
                    .entry(normalize_edge(a, b))
                    .or_default()
                    .push(FaceEdge::new(f as u32, i));
            }
        }

        Self { edges }
    }

    /// Face edges using the edge `a`-`b`, in either direction.
    #[must_use]
    pub fn incidences(&self, a: u32, b: u32) -> &[FaceEdge] {
        self.edges
            .get(&normalize_edge(a, b))
            .map_or(&[], Vec::as_slice)
    }

    /// Whether any live face uses the edge `a`-`b`.
    #[must_use]
    pub fn contains(&self, a: u32, b: u32) -> bool {
        self.edges.contains_key(&normalize_edge(a, b))
    }

    /// All edges with their incidences, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), &[FaceEdge])> {
        self.edges.iter().map(|(&k, v)| (k, v.as_slice()))
    }

    /// Edges used by more than two faces, sorted by vertex pair.
    #[must_use]
    pub fn non_manifold_edges(&self) -> Vec<(u32, u32)> {
        let mut out: Vec<_> = self
            .edges
            .iter()
            .filter(|(_, inc)| inc.len() > 2)
            .map(|(&k, _)| k)
            .collect();
        out.sort_unstable();
        out
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of edges used by exactly one face.
    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.edges.values().filter(|inc| inc.len() == 1).count()
    }

    /// Number of edges used by more than two faces.
    #[must_use]
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edges.values().filter(|inc| inc.len() > 2).count()
    }

    /// No edge is used by more than two faces.
    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.edges.values().all(|inc| inc.len() <= 2)
    }

    /// Every edge is used by at least two faces.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.edges.values().all(|inc| inc.len() >= 2)
    }
}

/// Order an edge so the smaller index comes first.
#[inline]
pub(crate) const fn normalize_edge(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// Rebuild face-face adjacency for all live faces.
///
/// Edges shared by exactly two distinct faces are linked both ways. Edges
/// used once stay `None` (boundary). Edges used more than twice stay `None`
/// on every incident face and get the matching `NON_MANIFOLD` bit.
///
/// Clears all border and non-manifold bits first and marks the topology
/// current. Returns the edge map it was derived from.
pub fn build_adjacency(mesh: &mut TriMesh) -> EdgeMap {
    for face in &mut mesh.faces {
        face.adjacent = [None; 3];
        face.flags
            .remove(FaceFlags::ANY_BORDER | FaceFlags::ANY_NON_MANIFOLD);
    }

    let edges = EdgeMap::build(mesh);
    let mut linked = 0usize;
    let mut over_shared = 0usize;

    for (_, inc) in edges.iter() {
        match inc {
            [a, b] if a.face != b.face => {
                mesh.faces[a.face_index()].adjacent[a.edge_index()] = Some(*b);
                mesh.faces[b.face_index()].adjacent[b.edge_index()] = Some(*a);
                linked += 1;
            }
            [_, _, _, ..] => {
                for fe in inc {
                    mesh.faces[fe.face_index()]
                        .flags
                        .insert(FaceFlags::non_manifold(fe.edge_index()));
                }
                over_shared += 1;
            }
            _ => {}
        }
    }

    mesh.set_topology_current(true);
    debug!(
        edges = edges.edge_count(),
        linked, over_shared, "built face adjacency"
    );
    edges
}

/// Flag every boundary edge and its endpoints.
///
/// A boundary edge has no neighbour and is not non-manifold. Existing border
/// bits are cleared first. Returns the number of boundary edges.
pub fn mark_borders(mesh: &mut TriMesh) -> usize {
    for v in &mut mesh.vertices {
        v.flags.remove(VertexFlags::BORDER);
    }

    let mut count = 0;
    for f in 0..mesh.faces.len() {
        let face = &mut mesh.faces[f];
        face.flags.remove(FaceFlags::ANY_BORDER);
        if face.is_deleted() {
            continue;
        }

        let mut ends = Vec::new();
        for i in 0..3 {
            if face.adjacent[i].is_none() && !face.is_non_manifold(i) {
                face.flags.insert(FaceFlags::border(i));
                let (a, b) = face.edge(i);
                ends.extend([a, b]);
                count += 1;
            }
        }
        for v in ends {
            mesh.vertices[v as usize].flags.insert(VertexFlags::BORDER);
        }
    }

    debug!(border_edges = count, "marked borders");
    count
}

/// Whether every adjacency link is mirrored by its target.
///
/// Also checks that both ends of a link name the same unordered vertex pair
/// and that no live face links to a deleted one.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn check_adjacency_symmetry(mesh: &TriMesh) -> bool {
    mesh.live_faces().all(|(f, face)| {
        (0..3).all(|i| {
            let Some(fe) = face.adjacent[i] else {
                return true;
            };
            let Some(other) = mesh.faces.get(fe.face_index()) else {
                return false;
            };
            let (a, b) = face.edge(i);
            let (c, d) = other.edge(fe.edge_index());
            !other.is_deleted()
                && other.adjacent[fe.edge_index()] == Some(FaceEdge::new(f as u32, i))
                && normalize_edge(a, b) == normalize_edge(c, d)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{Point3, open_box, unit_cube};

    #[test]
    fn cube_is_closed_and_symmetric() {
        let mut cube = unit_cube();
        let edges = build_adjacency(&mut cube);

        assert_eq!(edges.edge_count(), 18);
        assert!(edges.is_watertight());
        assert!(cube.topology_is_current());
        assert!(check_adjacency_symmetry(&cube));
        assert!(cube.faces.iter().all(|f| f.adjacent.iter().all(Option::is_some)));
        assert_eq!(mark_borders(&mut cube), 0);
    }

    #[test]
    fn open_box_has_four_border_edges() {
        let mut mesh = open_box();
        build_adjacency(&mut mesh);
        assert_eq!(mark_borders(&mut mesh), 4);

        for v in 4..8 {
            assert!(mesh.vertices[v].flags.contains(VertexFlags::BORDER));
        }
        for v in 0..4 {
            assert!(!mesh.vertices[v].flags.contains(VertexFlags::BORDER));
        }
    }

    #[test]
    fn over_shared_edge_is_flagged_not_linked() {
        let mut mesh = TriMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.0),
                Point3::new(0.5, -1.0, 0.0),
                Point3::new(0.5, 0.0, 1.0),
            ],
            vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]],
        );
        let edges = build_adjacency(&mut mesh);

        assert_eq!(edges.non_manifold_edges(), vec![(0, 1)]);
        assert!(mesh.faces[0].is_non_manifold(0));
        assert!(mesh.faces[1].is_non_manifold(0));
        assert!(mesh.faces[2].is_non_manifold(0));
        assert!(mesh.faces.iter().all(|f| f.adjacent[0].is_none()));

        // Non-manifold edges are not borders
        assert_eq!(mark_borders(&mut mesh), 6);
        assert!(!mesh.faces[0].is_border(0));
    }

    #[test]
    fn deleted_faces_are_ignored() {
        let mut cube = unit_cube();
        cube.delete_face(11);
        let edges = build_adjacency(&mut cube);

        assert_eq!(edges.boundary_edge_count(), 3);
        assert!(check_adjacency_symmetry(&cube));
        assert_eq!(mark_borders(&mut cube), 3);
    }

    #[test]
    fn broken_link_detected() {
        let mut cube = unit_cube();
        build_adjacency(&mut cube);
        cube.faces[0].adjacent[0] = Some(FaceEdge::new(5, 1));
        assert!(!check_adjacency_symmetry(&cube));
    }
}
