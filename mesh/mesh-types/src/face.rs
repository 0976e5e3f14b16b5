//! Triangle face with flags and face-face adjacency.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Per-face state bits.
    ///
    /// Border and non-manifold bits exist once per local edge; use
    /// [`FaceFlags::border`] and [`FaceFlags::non_manifold`] to address them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct FaceFlags: u32 {
        /// Face is logically deleted and will be dropped on compaction.
        const DELETED = 1 << 0;
        /// Face was reached by the current traversal.
        const VISITED = 1 << 1;
        /// Edge 0 has no neighbour.
        const BORDER0 = 1 << 2;
        /// Edge 1 has no neighbour.
        const BORDER1 = 1 << 3;
        /// Edge 2 has no neighbour.
        const BORDER2 = 1 << 4;
        /// Edge 0 is shared by more than two faces.
        const NON_MANIFOLD0 = 1 << 5;
        /// Edge 1 is shared by more than two faces.
        const NON_MANIFOLD1 = 1 << 6;
        /// Edge 2 is shared by more than two faces.
        const NON_MANIFOLD2 = 1 << 7;
        /// Face is part of a user selection.
        const SELECTED = 1 << 8;

        /// All border bits.
        const ANY_BORDER = Self::BORDER0.bits() | Self::BORDER1.bits() | Self::BORDER2.bits();
        /// All non-manifold bits.
        const ANY_NON_MANIFOLD =
            Self::NON_MANIFOLD0.bits() | Self::NON_MANIFOLD1.bits() | Self::NON_MANIFOLD2.bits();
    }
}

impl FaceFlags {
    /// Border bit for local edge `edge` (0..3).
    #[must_use]
    pub const fn border(edge: usize) -> Self {
        match edge % 3 {
            0 => Self::BORDER0,
            1 => Self::BORDER1,
            _ => Self::BORDER2,
        }
    }

    /// Non-manifold bit for local edge `edge` (0..3).
    #[must_use]
    pub const fn non_manifold(edge: usize) -> Self {
        match edge % 3 {
            0 => Self::NON_MANIFOLD0,
            1 => Self::NON_MANIFOLD1,
            _ => Self::NON_MANIFOLD2,
        }
    }
}

/// Back-reference to one edge of a face.
///
/// Used as the adjacency link: `face.adjacent[i] == Some(FaceEdge { face: g, edge: j })`
/// means edge `i` of this face is edge `j` of face `g`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FaceEdge {
    /// Index of the neighbouring face.
    pub face: u32,
    /// Local edge number (0..3) within that face.
    pub edge: u8,
}

impl FaceEdge {
    /// Create a new face-edge reference.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: local edge numbers are always 0..3
    pub const fn new(face: u32, edge: usize) -> Self {
        Self {
            face,
            edge: edge as u8,
        }
    }

    /// Face index as `usize`.
    #[inline]
    #[must_use]
    pub const fn face_index(self) -> usize {
        self.face as usize
    }

    /// Edge number as `usize`.
    #[inline]
    #[must_use]
    pub const fn edge_index(self) -> usize {
        self.edge as usize
    }
}

/// A triangle face.
///
/// The face does not own its vertices; it references them by index.
///
/// # Example
///
/// ```
/// use mesh_types::Face;
///
/// let face = Face::new([0, 1, 2]);
/// assert_eq!(face.edge(1), (1, 2));
/// assert!(face.adjacent.iter().all(Option::is_none));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Face {
    /// Vertex indices, counter-clockwise when viewed from outside.
    pub vertices: [u32; 3],

    /// Unit face normal, or zero if not computed or degenerate.
    pub normal: Vector3<f64>,

    /// State bits.
    pub flags: FaceFlags,

    /// Neighbour across each local edge; `None` marks a boundary edge.
    pub adjacent: [Option<FaceEdge>; 3],

    /// Epoch at which this face was last marked.
    pub mark: u32,
}

impl Face {
    /// Create a face referencing three vertices, with no adjacency.
    #[inline]
    #[must_use]
    pub fn new(vertices: [u32; 3]) -> Self {
        Self {
            vertices,
            normal: Vector3::zeros(),
            flags: FaceFlags::empty(),
            adjacent: [None; 3],
            mark: 0,
        }
    }

    /// Directed edge `i` as `(from, to)`.
    #[inline]
    #[must_use]
    pub const fn edge(&self, i: usize) -> (u32, u32) {
        (self.vertices[i % 3], self.vertices[(i + 1) % 3])
    }

    /// Local index of vertex `v`, if this face references it.
    #[must_use]
    pub fn local_index(&self, v: u32) -> Option<usize> {
        self.vertices.iter().position(|&x| x == v)
    }

    /// Local edge joining `a` and `b` in either direction.
    #[must_use]
    pub fn find_edge(&self, a: u32, b: u32) -> Option<usize> {
        (0..3).find(|&i| {
            let (from, to) = self.edge(i);
            (from == a && to == b) || (from == b && to == a)
        })
    }

    /// Whether any two vertex references coincide.
    #[inline]
    #[must_use]
    pub const fn has_repeated_vertex(&self) -> bool {
        let [a, b, c] = self.vertices;
        a == b || b == c || a == c
    }

    /// Whether the face is logically deleted.
    #[inline]
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.flags.contains(FaceFlags::DELETED)
    }

    /// Whether edge `i` is flagged as border.
    #[inline]
    #[must_use]
    pub const fn is_border(&self, i: usize) -> bool {
        self.flags.contains(FaceFlags::border(i))
    }

    /// Whether edge `i` is flagged as non-manifold.
    #[inline]
    #[must_use]
    pub const fn is_non_manifold(&self, i: usize) -> bool {
        self.flags.contains(FaceFlags::non_manifold(i))
    }

    /// Whether the face was marked at `epoch`.
    #[inline]
    #[must_use]
    pub const fn is_marked(&self, epoch: u32) -> bool {
        self.mark == epoch
    }

    /// Mark the face with `epoch`.
    #[inline]
    pub const fn set_mark(&mut self, epoch: u32) {
        self.mark = epoch;
    }
}
