//! Indexed triangle mesh store.

use crate::{Aabb, Face, FaceEdge, FaceFlags, Triangle, Vertex, VertexFlags};
use nalgebra::{Point3, Vector3};

/// An indexed triangle mesh with flags, adjacency and logical deletion.
///
/// Vertices and faces live in two arenas. Removal only sets the `DELETED`
/// flag; [`TriMesh::compact`] later drops the deleted entries and remaps
/// indices.
///
/// Face adjacency is filled by the topology builder in `mesh-repair`. Any
/// change to the face set (adding, compacting) marks it stale; check
/// [`TriMesh::topology_is_current`] before relying on it.
///
/// # Winding Order
///
/// Faces use counter-clockwise winding when viewed from outside, so normals
/// point outward by the right-hand rule.
///
/// # Example
///
/// ```
/// use mesh_types::{TriMesh, Point3};
///
/// let mut mesh = TriMesh::new();
/// let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
/// let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
/// let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
/// let f = mesh.add_face([a, b, c]);
///
/// mesh.delete_face(f as usize);
/// assert_eq!(mesh.face_count(), 0);
///
/// mesh.compact();
/// assert!(mesh.faces.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// Vertex arena, including logically deleted entries.
    pub vertices: Vec<Vertex>,

    /// Face arena, including logically deleted entries.
    pub faces: Vec<Face>,

    epoch: u32,
    topology_current: bool,
}

impl TriMesh {
    /// Create an empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            epoch: 0,
            topology_current: false,
        }
    }

    /// Create an empty mesh with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            ..Self::new()
        }
    }

    /// Build a mesh from positions and index triples.
    ///
    /// Indices are not checked here; see [`TriMesh::first_invalid_index`].
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{TriMesh, Point3};
    ///
    /// let mesh = TriMesh::from_parts(
    ///     vec![
    ///         Point3::new(0.0, 0.0, 0.0),
    ///         Point3::new(1.0, 0.0, 0.0),
    ///         Point3::new(0.0, 1.0, 0.0),
    ///     ],
    ///     vec![[0, 1, 2]],
    /// );
    /// assert_eq!(mesh.vertex_count(), 3);
    /// assert_eq!(mesh.face_count(), 1);
    /// ```
    #[must_use]
    pub fn from_parts(positions: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices: positions.into_iter().map(Vertex::new).collect(),
            faces: faces.into_iter().map(Face::new).collect(),
            ..Self::new()
        }
    }

    /// Append a vertex and return its index.
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: mesh indices are u32, larger meshes are unsupported
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        self.vertices.push(Vertex::new(position));
        (self.vertices.len() - 1) as u32
    }

    /// Append a face and return its index. Marks topology stale.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_face(&mut self, vertices: [u32; 3]) -> u32 {
        self.faces.push(Face::new(vertices));
        self.topology_current = false;
        (self.faces.len() - 1) as u32
    }

    /// Number of live (non-deleted) vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.iter().filter(|v| !v.is_deleted()).count()
    }

    /// Number of live (non-deleted) faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.iter().filter(|f| !f.is_deleted()).count()
    }

    /// True when there are no live vertices and no live faces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0 && self.face_count() == 0
    }

    /// Iterate live faces with their indices.
    pub fn live_faces(&self) -> impl Iterator<Item = (usize, &Face)> {
        self.faces.iter().enumerate().filter(|(_, f)| !f.is_deleted())
    }

    /// First face referencing a vertex slot that does not exist.
    ///
    /// Returns the face index and the offending vertex index.
    #[must_use]
    pub fn first_invalid_index(&self) -> Option<(usize, u32)> {
        let n = self.vertices.len();
        self.faces.iter().enumerate().find_map(|(fi, f)| {
            f.vertices
                .iter()
                .find(|&&v| v as usize >= n)
                .map(|&v| (fi, v))
        })
    }

    /// Concrete triangle for face `f`.
    ///
    /// # Panics
    ///
    /// Panics if `f` or one of its vertex indices is out of range.
    #[must_use]
    pub fn triangle(&self, f: usize) -> Triangle {
        let [a, b, c] = self.faces[f].vertices;
        Triangle::new(
            self.vertices[a as usize].position,
            self.vertices[b as usize].position,
            self.vertices[c as usize].position,
        )
    }

    /// Position of vertex `v`.
    #[inline]
    #[must_use]
    pub fn position(&self, v: u32) -> Point3<f64> {
        self.vertices[v as usize].position
    }

    /// Bounding box of all live vertices.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(
            self.vertices
                .iter()
                .filter(|v| !v.is_deleted())
                .map(|v| &v.position),
        )
    }

    // ----------------------------------------------------------------
    // Epoch marks
    // ----------------------------------------------------------------

    /// Start a new traversal epoch and return its stamp.
    ///
    /// An element is "marked in this pass" when its `mark` equals the stamp,
    /// so nothing has to be cleared between passes. On counter wrap-around
    /// all marks are reset.
    pub fn next_mark(&mut self) -> u32 {
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            for v in &mut self.vertices {
                v.mark = 0;
            }
            for f in &mut self.faces {
                f.mark = 0;
            }
            self.epoch = 1;
        }
        self.epoch
    }

    // ----------------------------------------------------------------
    // Deletion and compaction
    // ----------------------------------------------------------------

    /// Logically delete vertex `v`.
    pub fn delete_vertex(&mut self, v: usize) {
        self.vertices[v].flags.insert(VertexFlags::DELETED);
    }

    /// Logically delete face `f` and detach it from its neighbours.
    pub fn delete_face(&mut self, f: usize) {
        let links = self.faces[f].adjacent;
        for fe in links.into_iter().flatten() {
            if fe.face_index() != f {
                self.faces[fe.face_index()].adjacent[fe.edge_index()] = None;
            }
        }
        let face = &mut self.faces[f];
        face.adjacent = [None; 3];
        face.flags.insert(FaceFlags::DELETED);
    }

    /// Physically remove deleted faces and vertices, remapping indices.
    ///
    /// Faces that reference a deleted vertex are dropped as well. Adjacency
    /// becomes stale.
    pub fn compact(&mut self) {
        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut next = 0u32;
        for (i, v) in self.vertices.iter().enumerate() {
            if !v.is_deleted() {
                remap[i] = next;
                next += 1;
            }
        }

        self.faces.retain_mut(|face| {
            if face.is_deleted() {
                return false;
            }
            let mapped = face.vertices.map(|v| remap.get(v as usize).copied().unwrap_or(u32::MAX));
            if mapped.contains(&u32::MAX) {
                return false;
            }
            face.vertices = mapped;
            face.adjacent = [None; 3];
            face.flags
                .remove(FaceFlags::ANY_BORDER | FaceFlags::ANY_NON_MANIFOLD);
            true
        });
        self.vertices.retain(|v| !v.is_deleted());
        self.topology_current = false;
    }

    // ----------------------------------------------------------------
    // Topology state
    // ----------------------------------------------------------------

    /// Whether face adjacency reflects the current face set.
    #[inline]
    #[must_use]
    pub const fn topology_is_current(&self) -> bool {
        self.topology_current
    }

    /// Record whether face adjacency reflects the current face set.
    ///
    /// Set by the topology builder; cleared by any face-set change.
    #[inline]
    pub const fn set_topology_current(&mut self, current: bool) {
        self.topology_current = current;
    }

    // ----------------------------------------------------------------
    // Orientation
    // ----------------------------------------------------------------

    /// Reverse the winding of face `f`, keeping adjacency symmetric.
    ///
    /// Vertices 1 and 2 swap, so edge 0 and edge 2 trade places while edge 1
    /// stays. Neighbours' back-references and per-edge flags follow.
    #[allow(clippy::cast_possible_truncation)]
    pub fn flip_face(&mut self, f: usize) {
        let face = &mut self.faces[f];
        face.vertices.swap(1, 2);
        face.adjacent.swap(0, 2);
        face.normal = -face.normal;

        for (a, b) in [
            (FaceFlags::BORDER0, FaceFlags::BORDER2),
            (FaceFlags::NON_MANIFOLD0, FaceFlags::NON_MANIFOLD2),
        ] {
            let (has_a, has_b) = (face.flags.contains(a), face.flags.contains(b));
            face.flags.set(a, has_b);
            face.flags.set(b, has_a);
        }

        let links = face.adjacent;
        for (i, link) in links.into_iter().enumerate() {
            if let Some(fe) = link
                && fe.face_index() != f
            {
                self.faces[fe.face_index()].adjacent[fe.edge_index()] =
                    Some(FaceEdge::new(f as u32, i));
            }
        }
    }

    // ----------------------------------------------------------------
    // Normals and measures
    // ----------------------------------------------------------------

    /// Recompute unit face normals. Degenerate faces get a zero normal.
    pub fn update_face_normals(&mut self) {
        for f in 0..self.faces.len() {
            if self.faces[f].is_deleted() {
                continue;
            }
            let n = self.triangle(f).normal().unwrap_or_else(Vector3::zeros);
            self.faces[f].normal = n;
        }
    }

    /// Recompute area-weighted unit vertex normals from live faces.
    ///
    /// Vertices touching no face, or only degenerate ones, get a zero normal.
    pub fn update_vertex_normals(&mut self) {
        let mut acc = vec![Vector3::zeros(); self.vertices.len()];
        for (f, face) in self.live_faces() {
            // Unnormalized normal is already area-weighted (|n| = 2 * area)
            let n = self.triangle(f).normal_unnormalized();
            for &v in &face.vertices {
                acc[v as usize] += n;
            }
        }
        for (vertex, n) in self.vertices.iter_mut().zip(acc) {
            let len = n.norm();
            vertex.normal = if len > f64::EPSILON {
                n / len
            } else {
                Vector3::zeros()
            };
        }
    }

    /// Signed volume enclosed by the live faces.
    ///
    /// Positive when a closed surface is wound outward. Meaningless for
    /// open surfaces.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.signed_volume_of(self.live_faces().map(|(f, _)| f))
    }

    /// Signed volume contributed by a subset of faces.
    #[must_use]
    pub fn signed_volume_of(&self, faces: impl IntoIterator<Item = usize>) -> f64 {
        let total: f64 = faces
            .into_iter()
            .map(|f| {
                let t = self.triangle(f);
                // Tetrahedron with the origin: v0 . (v1 x v2)
                t.v0.coords.dot(&t.v1.coords.cross(&t.v2.coords))
            })
            .sum();
        total / 6.0
    }

    /// Total area of the live faces.
    #[must_use]
    pub fn surface_area(&self) -> f64 {
        self.live_faces().map(|(f, _)| self.triangle(f).area()).sum()
    }
}

/// Closed unit cube from (0,0,0) to (1,1,1), wound outward.
///
/// # Example
///
/// ```
/// use mesh_types::unit_cube;
///
/// let cube = unit_cube();
/// assert_eq!(cube.vertex_count(), 8);
/// assert_eq!(cube.face_count(), 12);
/// assert!((cube.signed_volume() - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn unit_cube() -> TriMesh {
    TriMesh::from_parts(cube_corners(), cube_faces(true))
}

/// Unit cube with its top (z = 1) side missing: 10 faces, one square hole.
#[must_use]
pub fn open_box() -> TriMesh {
    TriMesh::from_parts(cube_corners(), cube_faces(false))
}

fn cube_corners() -> Vec<Point3<f64>> {
    vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ]
}

fn cube_faces(with_top: bool) -> Vec<[u32; 3]> {
    let mut faces = vec![
        // bottom, -Z
        [0, 2, 1],
        [0, 3, 2],
        // front, -Y
        [0, 1, 5],
        [0, 5, 4],
        // back, +Y
        [3, 7, 6],
        [3, 6, 2],
        // left, -X
        [0, 4, 7],
        [0, 7, 3],
        // right, +X
        [1, 2, 6],
        [1, 6, 5],
    ];
    if with_top {
        faces.extend([[4, 5, 6], [4, 6, 7]]);
    }
    faces
}
