//! Triangle-triangle intersection tests and a spatial hash over faces.
//!
//! Used by the hole filler to refuse candidate triangles that would cut
//! through the existing surface.

// Barycentric determinant terms look like mismatched operands to clippy
#![allow(clippy::suspicious_operation_groupings)]

use hashbrown::HashMap;
use mesh_types::{Aabb, Point3, TriMesh, Triangle, Vector3};

/// Default relative tolerance for intersection tests.
pub const DEFAULT_INTERSECTION_EPSILON: f64 = 1e-6;

/// Faces whose boxes span more cells than this are kept in an overflow list.
const MAX_CELLS_PER_FACE: i64 = 512;

/// Whether two index-carrying triangles intersect beyond the vertices they share.
///
/// Triangles that share vertex indices legitimately touch there. Both are
/// shrunk towards their centroids by the relative amount `epsilon`, which
/// removes contact at shared vertices and edges but keeps any overlap of
/// real extent. Triangles using the same three vertices always intersect.
///
/// # Example
///
/// ```
/// use mesh_types::{Triangle, Point3};
/// use mesh_repair::intersect::faces_intersect;
///
/// let floor = Triangle::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(2.0, 0.0, 0.0),
///     Point3::new(0.0, 2.0, 0.0),
/// );
/// let wall = Triangle::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(2.0, 0.0, 0.0),
///     Point3::new(0.0, 0.0, 2.0),
/// );
/// // Sharing an edge is not an intersection
/// assert!(!faces_intersect(&floor, [0, 1, 2], &wall, [0, 1, 3], 1e-6));
///
/// let spike = Triangle::new(
///     Point3::new(0.5, 0.5, -1.0),
///     Point3::new(0.5, 0.5, 1.0),
///     Point3::new(3.0, 3.0, 0.0),
/// );
/// assert!(faces_intersect(&floor, [0, 1, 2], &spike, [4, 5, 6], 1e-6));
/// ```
#[must_use]
pub fn faces_intersect(
    a: &Triangle,
    a_ids: [u32; 3],
    b: &Triangle,
    b_ids: [u32; 3],
    epsilon: f64,
) -> bool {
    let shared = a_ids.iter().filter(|v| b_ids.contains(v)).count();
    match shared {
        0 => triangles_intersect(a, b, epsilon),
        3 => true,
        _ => triangles_intersect(&shrunk(a, epsilon), &shrunk(b, epsilon), epsilon),
    }
}

/// Whether two triangles touch or overlap anywhere.
///
/// Non-coplanar pairs test each edge against the other triangle.
/// Coplanar pairs (within `epsilon` of the larger triangle's size) use a
/// separating-axis test in the shared plane.
#[must_use]
pub fn triangles_intersect(a: &Triangle, b: &Triangle, epsilon: f64) -> bool {
    if !a.bounds().intersects(&b.bounds(), 0.0) {
        return false;
    }

    let (Some(na), Some(nb)) = (a.normal(), b.normal()) else {
        return false;
    };

    let scale = pair_scale(a, b);
    let plane_tol = epsilon * scale * 1e-3;

    let da = b.vertices().map(|p| (p - a.v0).dot(&na));
    let db = a.vertices().map(|p| (p - b.v0).dot(&nb));

    // One triangle strictly on one side of the other's plane
    if all_same_side(&da, plane_tol) || all_same_side(&db, plane_tol) {
        return false;
    }

    if da.iter().all(|d| d.abs() <= plane_tol) {
        return coplanar_overlap(a, b, &na);
    }

    edges_of(a)
        .iter()
        .any(|(p, q)| segment_hits_triangle(p, q, b))
        || edges_of(b)
            .iter()
            .any(|(p, q)| segment_hits_triangle(p, q, a))
}

/// Whether segment `p`-`q` meets triangle `t`, boundary included.
///
/// Möller-Trumbore restricted to the segment. Segments parallel to the
/// triangle's plane never hit.
#[must_use]
pub fn segment_hits_triangle(p: &Point3<f64>, q: &Point3<f64>, t: &Triangle) -> bool {
    let dir = q - p;
    let e1 = t.v1 - t.v0;
    let e2 = t.v2 - t.v0;
    let h = dir.cross(&e2);
    let det = e1.dot(&h);

    let scale = dir.norm() * e1.norm() * e2.norm();
    if det.abs() <= 1e-12 * scale {
        return false;
    }

    let inv = 1.0 / det;
    let s = p - t.v0;
    let u = inv * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }

    let k = s.cross(&e1);
    let v = inv * dir.dot(&k);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }

    let along = inv * e2.dot(&k);
    (0.0..=1.0).contains(&along)
}

/// Copy of `t` scaled by `1 - factor` about its centroid.
fn shrunk(t: &Triangle, factor: f64) -> Triangle {
    let c = t.centroid();
    let k = 1.0 - factor;
    let pull = |p: Point3<f64>| c + (p - c) * k;
    Triangle::new(pull(t.v0), pull(t.v1), pull(t.v2))
}

fn pair_scale(a: &Triangle, b: &Triangle) -> f64 {
    let mut bounds = a.bounds();
    for p in b.vertices() {
        bounds.expand_to_include(&p);
    }
    bounds.diagonal().max(f64::MIN_POSITIVE)
}

fn all_same_side(d: &[f64; 3], tol: f64) -> bool {
    d.iter().all(|&x| x > tol) || d.iter().all(|&x| x < -tol)
}

/// 2D separating-axis test after dropping the dominant axis of `normal`.
fn coplanar_overlap(a: &Triangle, b: &Triangle, normal: &Vector3<f64>) -> bool {
    let (i, j) = projection_axes(normal);
    let pa = a.vertices().map(|p| [p[i], p[j]]);
    let pb = b.vertices().map(|p| [p[i], p[j]]);

    for tri in [&pa, &pb] {
        for k in 0..3 {
            let (p, q) = (tri[k], tri[(k + 1) % 3]);
            let axis = [q[1] - p[1], p[0] - q[0]];
            let (min_a, max_a) = project_2d(&pa, axis);
            let (min_b, max_b) = project_2d(&pb, axis);
            if max_a < min_b || max_b < min_a {
                return false;
            }
        }
    }
    true
}

fn project_2d(pts: &[[f64; 2]; 3], axis: [f64; 2]) -> (f64, f64) {
    pts.iter()
        .map(|p| p[0].mul_add(axis[0], p[1] * axis[1]))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        })
}

/// Coordinate axes kept when projecting along `normal`'s dominant component.
pub(crate) fn projection_axes(normal: &Vector3<f64>) -> (usize, usize) {
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    if az >= ax && az >= ay {
        (0, 1)
    } else if ay >= ax {
        (2, 0)
    } else {
        (1, 2)
    }
}

const fn edges_of(t: &Triangle) -> [(Point3<f64>, Point3<f64>); 3] {
    [(t.v0, t.v1), (t.v1, t.v2), (t.v2, t.v0)]
}

// =============================================================================
// Spatial hash
// =============================================================================

/// Uniform-grid hash of face bounding boxes.
///
/// Each face is registered in every cell its box overlaps. Faces whose boxes
/// would cover too many cells go to an overflow list that every query scans.
#[derive(Debug, Clone)]
pub struct FaceGrid {
    cell_size: f64,
    cells: HashMap<(i64, i64, i64), Vec<u32>>,
    overflow: Vec<u32>,
}

impl FaceGrid {
    /// Empty grid with the given cell edge length.
    #[must_use]
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: if cell_size > 0.0 && cell_size.is_finite() {
                cell_size
            } else {
                1.0
            },
            cells: HashMap::new(),
            overflow: Vec::new(),
        }
    }

    /// Grid over all live faces, sized from their mean box extent.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn build(mesh: &TriMesh) -> Self {
        let (sum, n) = mesh
            .live_faces()
            .map(|(f, _)| {
                let s = mesh.triangle(f).bounds().size();
                s.x.max(s.y).max(s.z)
            })
            .fold((0.0, 0usize), |(sum, n), e| (sum + e, n + 1));

        let mut grid = Self::new(if n > 0 { 2.0 * sum / n as f64 } else { 1.0 });
        for (f, _) in mesh.live_faces() {
            grid.insert(f as u32, &mesh.triangle(f).bounds());
        }
        grid
    }

    /// Cell edge length.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Register face `face` with bounding box `bounds`.
    pub fn insert(&mut self, face: u32, bounds: &Aabb) {
        let (lo, hi) = (self.cell_of(&bounds.min), self.cell_of(&bounds.max));
        let span = (hi.0 - lo.0 + 1) * (hi.1 - lo.1 + 1) * (hi.2 - lo.2 + 1);
        if span > MAX_CELLS_PER_FACE {
            self.overflow.push(face);
            return;
        }
        for x in lo.0..=hi.0 {
            for y in lo.1..=hi.1 {
                for z in lo.2..=hi.2 {
                    self.cells.entry((x, y, z)).or_default().push(face);
                }
            }
        }
    }

    /// Faces whose cells overlap `bounds`, each listed once, ascending.
    #[must_use]
    pub fn query(&self, bounds: &Aabb) -> Vec<u32> {
        let (lo, hi) = (self.cell_of(&bounds.min), self.cell_of(&bounds.max));
        let mut out = self.overflow.clone();
        let span = (hi.0 - lo.0 + 1) * (hi.1 - lo.1 + 1) * (hi.2 - lo.2 + 1);

        if span > MAX_CELLS_PER_FACE {
            // Cheaper to walk the occupied cells than the query box
            for (&(x, y, z), faces) in &self.cells {
                if (lo.0..=hi.0).contains(&x)
                    && (lo.1..=hi.1).contains(&y)
                    && (lo.2..=hi.2).contains(&z)
                {
                    out.extend_from_slice(faces);
                }
            }
        } else {
            for x in lo.0..=hi.0 {
                for y in lo.1..=hi.1 {
                    for z in lo.2..=hi.2 {
                        if let Some(faces) = self.cells.get(&(x, y, z)) {
                            out.extend_from_slice(faces);
                        }
                    }
                }
            }
        }

        out.sort_unstable();
        out.dedup();
        out
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_of(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        let c = |x: f64| (x / self.cell_size).floor() as i64;
        (c(p.x), c(p.y), c(p.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::unit_cube;

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle {
        Triangle::new(
            Point3::new(a[0], a[1], a[2]),
            Point3::new(b[0], b[1], b[2]),
            Point3::new(c[0], c[1], c[2]),
        )
    }

    #[test]
    fn piercing_triangles_intersect() {
        let a = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        let b = tri([0.5, 0.5, -1.0], [0.5, 0.5, 1.0], [-2.0, -2.0, 0.0]);
        assert!(triangles_intersect(&a, &b, 1e-6));
    }

    #[test]
    fn separated_triangles_do_not_intersect() {
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([0.0, 0.0, 0.5], [1.0, 0.0, 0.5], [0.0, 1.0, 0.5]);
        assert!(!triangles_intersect(&a, &b, 1e-6));

        let c = tri([5.0, 5.0, 0.0], [6.0, 5.0, 0.0], [5.0, 6.0, 0.0]);
        assert!(!triangles_intersect(&a, &c, 1e-6));
    }

    #[test]
    fn coplanar_overlap_detected() {
        let a = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        let b = tri([0.5, 0.5, 0.0], [3.0, 0.5, 0.0], [0.5, 3.0, 0.0]);
        assert!(triangles_intersect(&a, &b, 1e-6));

        let far = tri([3.0, 3.0, 0.0], [4.0, 3.0, 0.0], [3.0, 4.0, 0.0]);
        assert!(!triangles_intersect(&a, &far, 1e-6));
    }

    #[test]
    fn flat_neighbours_across_shared_edge_do_not_intersect() {
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let b = tri([1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(!faces_intersect(&a, [0, 1, 2], &b, [1, 3, 2], 1e-6));
    }

    #[test]
    fn folded_coplanar_neighbours_intersect() {
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        // Shares edge 1-2 and folds back over `a`
        let b = tri([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.2, 0.2, 0.0]);
        assert!(faces_intersect(&a, [0, 1, 2], &b, [1, 2, 3], 1e-6));
    }

    #[test]
    fn shared_vertex_crossing_detected() {
        let a = tri([0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]);
        // Shares vertex 0, opposite edge passes through a's interior
        let b = tri([0.0, 0.0, 0.0], [0.5, 0.5, -1.0], [0.5, 0.5, 1.0]);
        assert!(faces_intersect(&a, [0, 1, 2], &b, [0, 7, 8], 1e-6));

        // Same shape tilted away only touches at the shared vertex
        let c = tri([0.0, 0.0, 0.0], [-0.5, -0.5, -1.0], [-0.5, -0.5, 1.0]);
        assert!(!faces_intersect(&a, [0, 1, 2], &c, [0, 7, 8], 1e-6));
    }

    #[test]
    fn same_vertex_set_always_intersects() {
        let a = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(faces_intersect(&a, [0, 1, 2], &a.reversed(), [0, 2, 1], 1e-6));
    }

    #[test]
    fn grid_query_finds_nearby_faces() {
        let cube = unit_cube();
        let grid = FaceGrid::build(&cube);
        assert!(grid.cell_size() > 0.0);

        let everything = grid.query(&cube.bounds());
        assert_eq!(everything.len(), 12);

        let probe = Aabb::new(Point3::new(0.4, 0.4, -0.1), Point3::new(0.6, 0.6, 0.1));
        let near_bottom = grid.query(&probe);
        assert!(near_bottom.contains(&0));
        assert!(near_bottom.contains(&1));
    }

    #[test]
    fn oversized_faces_go_to_overflow() {
        let mut grid = FaceGrid::new(0.01);
        grid.insert(3, &Aabb::new(Point3::origin(), Point3::new(10.0, 10.0, 10.0)));
        let hits = grid.query(&Aabb::new(Point3::new(50.0, 0.0, 0.0), Point3::new(51.0, 0.0, 0.0)));
        assert_eq!(hits, vec![3]);
    }
}
