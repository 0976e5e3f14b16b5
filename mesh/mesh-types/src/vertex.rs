//! Vertex type and flag bits.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Per-vertex state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct VertexFlags: u32 {
        /// Vertex is logically deleted and will be dropped on compaction.
        const DELETED = 0b0000_0001;
        /// Vertex was reached by the current traversal.
        const VISITED = 0b0000_0010;
        /// Vertex lies on a border edge.
        const BORDER = 0b0000_0100;
        /// Vertex is part of a user selection.
        const SELECTED = 0b0000_1000;
    }
}

/// A vertex in 3D space.
///
/// Carries exactly what the repair stages need: a position, a normal
/// (zero until [`TriMesh::update_vertex_normals`](crate::TriMesh::update_vertex_normals)
/// runs), a flag set and an epoch mark.
///
/// # Example
///
/// ```
/// use mesh_types::{Vertex, Point3};
///
/// let v1 = Vertex::new(Point3::new(1.0, 2.0, 3.0));
/// let v2 = Vertex::from_coords(1.0, 2.0, 3.0);
///
/// assert_eq!(v1.position, v2.position);
/// assert!(!v1.is_deleted());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vertex {
    /// 3D position.
    pub position: Point3<f64>,

    /// Unit normal, or zero if not computed.
    pub normal: Vector3<f64>,

    /// State bits.
    pub flags: VertexFlags,

    /// Epoch at which this vertex was last marked.
    pub mark: u32,
}

impl Vertex {
    /// Create a new vertex with only position set.
    #[inline]
    #[must_use]
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: Vector3::zeros(),
            flags: VertexFlags::empty(),
            mark: 0,
        }
    }

    /// Create a vertex from raw coordinates.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::Vertex;
    ///
    /// let v = Vertex::from_coords(1.0, 2.0, 3.0);
    /// assert_eq!(v.position.x, 1.0);
    /// assert_eq!(v.position.y, 2.0);
    /// assert_eq!(v.position.z, 3.0);
    /// ```
    #[inline]
    #[must_use]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Create a vertex with position and normal.
    #[inline]
    #[must_use]
    pub fn with_normal(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            normal,
            ..Self::new(position)
        }
    }

    /// Whether the vertex is logically deleted.
    #[inline]
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.flags.contains(VertexFlags::DELETED)
    }

    /// Whether the vertex was marked at `epoch`.
    #[inline]
    #[must_use]
    pub const fn is_marked(&self, epoch: u32) -> bool {
        self.mark == epoch
    }

    /// Mark the vertex with `epoch`.
    #[inline]
    pub const fn set_mark(&mut self, epoch: u32) {
        self.mark = epoch;
    }

    /// Exact coordinate key used to group coincident vertices.
    ///
    /// `-0.0` and `0.0` map to the same key.
    #[must_use]
    pub fn position_key(&self) -> [u64; 3] {
        let bits = |c: f64| if c == 0.0 { 0.0_f64.to_bits() } else { c.to_bits() };
        [
            bits(self.position.x),
            bits(self.position.y),
            bits(self.position.z),
        ]
    }
}

impl From<Point3<f64>> for Vertex {
    fn from(position: Point3<f64>) -> Self {
        Self::new(position)
    }
}

impl From<[f64; 3]> for Vertex {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::from_coords(x, y, z)
    }
}
