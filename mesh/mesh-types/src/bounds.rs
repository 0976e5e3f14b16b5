//! Axis-aligned bounding box.

use nalgebra::{Point3, Vector3};

/// An axis-aligned bounding box.
///
/// # Example
///
/// ```
/// use mesh_types::{Aabb, Point3};
///
/// let mut aabb = Aabb::empty();
/// assert!(aabb.is_empty());
///
/// aabb.expand_to_include(&Point3::new(1.0, 2.0, 3.0));
/// aabb.expand_to_include(&Point3::new(-1.0, 0.0, 0.0));
/// assert!(!aabb.is_empty());
/// assert!(aabb.contains(&Point3::new(0.0, 1.0, 1.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Box spanning two corners given in any order.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Inverted box that contains nothing; grows with [`Aabb::expand_to_include`].
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Smallest box containing every point.
    #[must_use]
    pub fn from_points<'a>(points: impl Iterator<Item = &'a Point3<f64>>) -> Self {
        points.fold(Self::empty(), |mut aabb, p| {
            aabb.expand_to_include(p);
            aabb
        })
    }

    /// True when min exceeds max on any axis.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to cover `point`.
    pub fn expand_to_include(&mut self, point: &Point3<f64>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Copy grown by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Extent along each axis.
    #[inline]
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Midpoint.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Length of the diagonal, or `0.0` when empty.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.size().norm()
        }
    }

    /// Whether `point` lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Whether the two boxes overlap, treating gaps up to `tolerance` as touching.
    #[must_use]
    pub fn intersects(&self, other: &Self, tolerance: f64) -> bool {
        (0..3).all(|i| {
            self.min[i] <= other.max[i] + tolerance && other.min[i] <= self.max[i] + tolerance
        })
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_orders_corners() {
        let aabb = Aabb::new(Point3::new(1.0, 0.0, 5.0), Point3::new(0.0, 2.0, 3.0));
        assert_eq!(aabb.min, Point3::new(0.0, 0.0, 3.0));
        assert_eq!(aabb.max, Point3::new(1.0, 2.0, 5.0));
    }

    #[test]
    fn empty_has_zero_diagonal() {
        let aabb = Aabb::empty();
        assert!(aabb.is_empty());
        assert!(aabb.diagonal().abs() < f64::EPSILON);
    }

    #[test]
    fn from_points_covers_all() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 4.0, 0.0),
            Point3::new(-1.0, 1.0, 12.0),
        ];
        let aabb = Aabb::from_points(pts.iter());
        assert!(pts.iter().all(|p| aabb.contains(p)));
        assert!((aabb.size().x - 4.0).abs() < 1e-12);
    }

    #[test]
    fn intersection_with_tolerance() {
        let a = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(1.05, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(!a.intersects(&b, 0.0));
        assert!(a.intersects(&b, 0.1));
        assert!(a.expanded(0.1).intersects(&b, 0.0));
    }
}
