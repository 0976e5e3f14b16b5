//! Triangle with concrete positions, for geometric queries.

use nalgebra::{Point3, Vector3};

use crate::Aabb;

/// A triangle with concrete vertex positions.
///
/// Winding is counter-clockwise when viewed from the side the normal points to.
///
/// # Example
///
/// ```
/// use mesh_types::{Triangle, Point3};
///
/// let tri = Triangle::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// );
///
/// assert!((tri.area() - 0.5).abs() < 1e-10);
/// assert!(tri.normal().is_some_and(|n| (n.z - 1.0).abs() < 1e-10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex.
    pub v0: Point3<f64>,
    /// Second vertex.
    pub v1: Point3<f64>,
    /// Third vertex.
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a triangle from three points.
    #[inline]
    #[must_use]
    pub const fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Cross product of the two edges leaving `v0`.
    ///
    /// Its length is twice the area.
    #[inline]
    #[must_use]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal, or `None` when the triangle has no area.
    #[must_use]
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len = n.norm();
        (len > f64::EPSILON).then(|| n / len)
    }

    /// Triangle area.
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.normal_unnormalized().norm() * 0.5
    }

    /// Whether the area is at or below `threshold`.
    ///
    /// A threshold of `0.0` only catches exactly collinear or coincident corners.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self, threshold: f64) -> bool {
        self.area() <= threshold
    }

    /// Center of mass.
    #[inline]
    #[must_use]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Interior angle in radians at corner `i` (0, 1 or 2).
    ///
    /// Returns `0.0` if either adjacent edge has zero length.
    #[must_use]
    pub fn angle_at(&self, i: usize) -> f64 {
        let [a, b, c] = self.vertices();
        let (apex, p, q) = match i % 3 {
            0 => (a, b, c),
            1 => (b, c, a),
            _ => (c, a, b),
        };
        let u = p - apex;
        let v = q - apex;
        let denom = u.norm() * v.norm();
        if denom <= f64::EPSILON {
            return 0.0;
        }
        (u.dot(&v) / denom).clamp(-1.0, 1.0).acos()
    }

    /// Corners as an array.
    #[inline]
    #[must_use]
    pub const fn vertices(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Same triangle with the opposite winding.
    #[inline]
    #[must_use]
    pub const fn reversed(&self) -> Self {
        Self {
            v0: self.v0,
            v1: self.v2,
            v2: self.v1,
        }
    }

    /// Tight bounding box.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points([self.v0, self.v1, self.v2].iter())
    }
}
