//! Hole detection and filling.
//!
//! A hole is a closed loop of border edges. Loops are traced by walking from
//! one border half-edge to the next around their shared vertex through face
//! adjacency. Where two holes touch at a vertex the walk passes through it
//! twice, and the traced figure is split there into simple loops.
//!
//! Filling is ear cutting with an intersection guard: every candidate
//! triangle is tested against the existing surface (through a [`FaceGrid`])
//! and against the triangles already placed in the same hole. A hole that
//! cannot be completed is left open and nothing from it is kept.
//!
//! # Example
//!
//! ```
//! use mesh_types::open_box;
//! use mesh_repair::holes::{HoleFillParams, fill_holes};
//!
//! let mut mesh = open_box();
//! let report = fill_holes(&mut mesh, &HoleFillParams::default());
//!
//! assert_eq!(report.holes_filled, 1);
//! assert_eq!(report.triangles_added, 2);
//! assert_eq!(mesh.face_count(), 12);
//! ```

use std::fmt;

use hashbrown::{HashMap, HashSet};
use mesh_types::{FaceEdge, FaceFlags, Point3, TriMesh, Triangle, Vector3};
use tracing::{debug, info, warn};

#[cfg(feature = "pipeline-config")]
use serde::{Deserialize, Serialize};

use crate::intersect::{DEFAULT_INTERSECTION_EPSILON, FaceGrid, faces_intersect, projection_axes};
use crate::topology::{EdgeMap, build_adjacency, mark_borders, normalize_edge};

/// A boundary loop representing a hole in the mesh.
///
/// `edges[k]` is the border edge joining `vertices[k]` and
/// `vertices[(k + 1) % len]`.
#[derive(Debug, Clone)]
pub struct BoundaryLoop {
    /// Ordered vertex indices around the loop.
    pub vertices: Vec<u32>,
    /// The face edge owning each loop edge.
    pub edges: Vec<FaceEdge>,
}

impl BoundaryLoop {
    /// Number of edges (and vertices) in the loop.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.vertices.len()
    }

    /// A loop needs at least three edges to be filled.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.vertices.len() >= 3
    }
}

/// Parameters for [`fill_holes`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "pipeline-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "pipeline-config", serde(default))]
pub struct HoleFillParams {
    /// Holes with more edges than this are left open.
    ///
    /// Default: `10000`
    pub max_hole_edges: usize,

    /// Only fill holes bordered by at least one `SELECTED` face.
    ///
    /// Default: `false`
    pub selected_only: bool,

    /// Relative tolerance for the intersection guard and for rejecting
    /// near-degenerate ears.
    ///
    /// Default: `1e-6`
    pub intersection_epsilon: f64,
}

impl Default for HoleFillParams {
    fn default() -> Self {
        Self {
            max_hole_edges: 10_000,
            selected_only: false,
            intersection_epsilon: DEFAULT_INTERSECTION_EPSILON,
        }
    }
}

impl HoleFillParams {
    /// Set the largest hole (in edges) that will be filled.
    #[must_use]
    pub const fn with_max_hole_edges(mut self, max: usize) -> Self {
        self.max_hole_edges = max;
        self
    }

    /// Restrict filling to holes touching selected faces.
    #[must_use]
    pub const fn with_selected_only(mut self, selected_only: bool) -> Self {
        self.selected_only = selected_only;
        self
    }

    /// Set the intersection tolerance.
    #[must_use]
    pub const fn with_intersection_epsilon(mut self, epsilon: f64) -> Self {
        self.intersection_epsilon = epsilon;
        self
    }
}

/// Outcome of [`fill_holes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "pipeline-config", derive(Serialize, Deserialize))]
pub struct HoleFillReport {
    /// Valid loops considered (after the selection filter).
    pub holes_found: usize,
    /// Loops closed completely.
    pub holes_filled: usize,
    /// Loops left open because they exceed `max_hole_edges`.
    pub holes_skipped_too_large: usize,
    /// Loops left open because no valid ear remained.
    pub holes_abandoned: usize,
    /// Faces added across all filled holes.
    pub triangles_added: usize,
}

impl HoleFillReport {
    /// Holes still open after the pass.
    #[must_use]
    pub const fn holes_left_open(&self) -> usize {
        self.holes_skipped_too_large + self.holes_abandoned
    }
}

impl fmt::Display for HoleFillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} holes filled ({} triangles), {} too large, {} abandoned",
            self.holes_filled,
            self.holes_found,
            self.triangles_added,
            self.holes_skipped_too_large,
            self.holes_abandoned
        )
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Find every boundary loop, using the border flags from
/// [`mark_borders`](crate::mark_borders).
///
/// Loops are reported in order of their lowest face, then edge, so results
/// are reproducible. A walk that revisits a vertex is split there, so every
/// reported loop is simple. Loops shorter than three edges are skipped.
///
/// # Example
///
/// ```
/// use mesh_types::{TriMesh, Point3};
/// use mesh_repair::{build_adjacency, mark_borders, holes::detect_holes};
///
/// let mut mesh = TriMesh::from_parts(
///     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
///     vec![[0, 1, 2]],
/// );
/// build_adjacency(&mut mesh);
/// mark_borders(&mut mesh);
///
/// let holes = detect_holes(&mesh);
/// assert_eq!(holes.len(), 1);
/// assert_eq!(holes[0].vertices, vec![0, 1, 2]);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn detect_holes(mesh: &TriMesh) -> Vec<BoundaryLoop> {
    let mut visited: HashSet<FaceEdge> = HashSet::new();
    let mut loops = Vec::new();

    for (f, face) in mesh.live_faces() {
        for i in 0..3 {
            let start = FaceEdge::new(f as u32, i);
            if !face.is_border(i) || visited.contains(&start) {
                continue;
            }
            let Some(traced) = trace_loop(mesh, start, &mut visited) else {
                warn!(face = f, edge = i, "boundary loop does not close");
                continue;
            };
            for hole in split_at_repeated_vertices(traced) {
                if hole.is_valid() {
                    loops.push(hole);
                } else {
                    debug!(edges = hole.edge_count(), "skipping short boundary loop");
                }
            }
        }
    }

    debug!(
        holes = loops.len(),
        sizes = ?loops.iter().map(BoundaryLoop::edge_count).collect::<Vec<_>>(),
        "detected boundary loops"
    );
    loops
}

/// Follow border edges from `start` until the walk returns to it.
fn trace_loop(
    mesh: &TriMesh,
    start: FaceEdge,
    visited: &mut HashSet<FaceEdge>,
) -> Option<BoundaryLoop> {
    visited.insert(start);
    let (first, mut tip) = mesh.faces[start.face_index()].edge(start.edge_index());
    let mut vertices = vec![first];
    let mut edges = vec![start];
    let mut current = start;

    loop {
        let next = next_border_edge(mesh, current, tip)?;
        if next == start {
            return Some(BoundaryLoop { vertices, edges });
        }
        if !visited.insert(next) {
            return None;
        }

        let (a, b) = mesh.faces[next.face_index()].edge(next.edge_index());
        vertices.push(tip);
        edges.push(next);
        tip = if a == tip { b } else { a };
        current = next;
    }
}

/// Cut a traced walk into simple loops wherever it returns to a vertex it
/// already passed.
fn split_at_repeated_vertices(traced: BoundaryLoop) -> Vec<BoundaryLoop> {
    let mut parts = Vec::new();
    let mut vertices: Vec<u32> = Vec::with_capacity(traced.vertices.len());
    let mut edges: Vec<FaceEdge> = Vec::with_capacity(traced.edges.len());
    let mut position: HashMap<u32, usize> = HashMap::new();

    for (v, e) in traced.vertices.into_iter().zip(traced.edges) {
        if let Some(&at) = position.get(&v) {
            for w in &vertices[at..] {
                position.remove(w);
            }
            parts.push(BoundaryLoop {
                vertices: vertices.split_off(at),
                edges: edges.split_off(at),
            });
        }
        position.insert(v, vertices.len());
        vertices.push(v);
        edges.push(e);
    }

    if parts.is_empty() {
        return vec![BoundaryLoop { vertices, edges }];
    }
    debug!(loops = parts.len() + 1, "split boundary walk at touching vertex");
    parts.push(BoundaryLoop { vertices, edges });
    parts
}

/// Rotate around `pivot`, starting in the face owning `from`, until another
/// border edge touching `pivot` turns up.
///
/// Returns `None` if the fan runs into a non-manifold edge.
#[allow(clippy::cast_possible_truncation)]
fn next_border_edge(mesh: &TriMesh, from: FaceEdge, pivot: u32) -> Option<FaceEdge> {
    let mut face = from.face_index();
    let mut entered = from.edge_index();

    for _ in 0..=mesh.faces.len() {
        let current = &mesh.faces[face];
        let other = (0..3).find(|&e| {
            let (a, b) = current.edge(e);
            e != entered && (a == pivot || b == pivot)
        })?;

        if current.is_border(other) {
            return Some(FaceEdge::new(face as u32, other));
        }

        let across = current.adjacent[other]?;
        face = across.face_index();
        entered = across.edge_index();
    }
    None
}

/// Whether any face owning an edge of `hole` is selected.
fn is_selected(mesh: &TriMesh, hole: &BoundaryLoop) -> bool {
    hole.edges
        .iter()
        .any(|fe| mesh.faces[fe.face_index()].flags.contains(FaceFlags::SELECTED))
}

/// Loop vertices ordered so new faces run against the owning faces.
///
/// Votes per edge, so a rim with mixed winding still gets one direction.
fn fill_ring(mesh: &TriMesh, hole: &BoundaryLoop) -> Vec<u32> {
    let n = hole.vertices.len();
    let along = hole
        .edges
        .iter()
        .enumerate()
        .filter(|&(k, fe)| {
            mesh.faces[fe.face_index()].edge(fe.edge_index())
                == (hole.vertices[k], hole.vertices[(k + 1) % n])
        })
        .count();

    let mut ring = hole.vertices.clone();
    if along * 2 > n {
        ring.reverse();
    }
    ring
}

// =============================================================================
// Filling
// =============================================================================

/// Fill holes by intersection-aware ear cutting.
///
/// Rebuilds adjacency first if it is stale and always re-marks borders, so
/// flags cleared by a fresh [`build_adjacency`] are restored. Holes are processed in
/// discovery order; faces added for one hole are visible to the guard of
/// the next. Topology is rebuilt and borders re-marked before returning.
pub fn fill_holes(mesh: &mut TriMesh, params: &HoleFillParams) -> HoleFillReport {
    if !mesh.topology_is_current() {
        build_adjacency(mesh);
    }
    mark_borders(mesh);

    let holes = detect_holes(mesh);
    let mut report = HoleFillReport::default();
    if holes.is_empty() {
        info!("no holes to fill");
        return report;
    }

    let mut grid = FaceGrid::build(mesh);
    let mut mesh_edges: HashSet<(u32, u32)> =
        EdgeMap::build(mesh).iter().map(|(edge, _)| edge).collect();

    for hole in &holes {
        if params.selected_only && !is_selected(mesh, hole) {
            continue;
        }
        report.holes_found += 1;

        if hole.edge_count() > params.max_hole_edges {
            warn!(
                edges = hole.edge_count(),
                max = params.max_hole_edges,
                "hole exceeds size limit, left open"
            );
            report.holes_skipped_too_large += 1;
            continue;
        }

        let ring = fill_ring(mesh, hole);
        let cutter = EarCutter {
            mesh: &*mesh,
            grid: &grid,
            mesh_edges: &mesh_edges,
            epsilon: params.intersection_epsilon,
        };

        let Some(triangles) = cutter.triangulate(ring) else {
            warn!(
                edges = hole.edge_count(),
                "no valid ear left, hole left open"
            );
            report.holes_abandoned += 1;
            continue;
        };

        debug!(
            edges = hole.edge_count(),
            triangles = triangles.len(),
            "filled hole"
        );
        report.triangles_added += triangles.len();
        report.holes_filled += 1;

        for ids in triangles {
            let f = mesh.add_face(ids);
            grid.insert(f, &mesh.triangle(f as usize).bounds());
            for k in 0..3 {
                mesh_edges.insert(normalize_edge(ids[k], ids[(k + 1) % 3]));
            }
        }
    }

    build_adjacency(mesh);
    mark_borders(mesh);
    info!(%report, "hole filling done");
    report
}

/// Candidate ear at ring position `at`.
#[derive(Debug, Clone, Copy)]
struct Ear {
    at: usize,
    ids: [u32; 3],
    convex: bool,
    angle: f64,
}

/// Read-only view of the surface a single hole is cut against.
struct EarCutter<'a> {
    mesh: &'a TriMesh,
    grid: &'a FaceGrid,
    mesh_edges: &'a HashSet<(u32, u32)>,
    epsilon: f64,
}

impl EarCutter<'_> {
    /// Cut ears until three vertices remain.
    ///
    /// Returns exactly `ring.len() - 2` triangles, or `None` if some step
    /// found no acceptable ear.
    fn triangulate(&self, mut ring: Vec<u32>) -> Option<Vec<[u32; 3]>> {
        let normal = self.newell_normal(&ring);
        let mut placed: Vec<[u32; 3]> = Vec::with_capacity(ring.len().saturating_sub(2));
        let mut diagonals: HashSet<(u32, u32)> = HashSet::new();

        while ring.len() > 3 {
            let ear = self.pick_ear(&ring, &normal, &placed, &diagonals)?;
            diagonals.insert(normalize_edge(ear.ids[0], ear.ids[2]));
            placed.push(ear.ids);
            ring.remove(ear.at);
        }

        let last = [ring[0], ring[1], ring[2]];
        if !self.acceptable(last, &placed, &diagonals, true) {
            return None;
        }
        placed.push(last);
        Some(placed)
    }

    /// Best acceptable ear: empty convex ears by opening angle, then the rest.
    fn pick_ear(
        &self,
        ring: &[u32],
        normal: &Vector3<f64>,
        placed: &[[u32; 3]],
        diagonals: &HashSet<(u32, u32)>,
    ) -> Option<Ear> {
        let n = ring.len();
        let mut ears: Vec<Ear> = (0..n)
            .map(|at| {
                let ids = [ring[(at + n - 1) % n], ring[at], ring[(at + 1) % n]];
                let tri = self.triangle(ids);
                let convex = tri.normal_unnormalized().dot(normal) > 0.0;
                let opening = tri.angle_at(1);
                Ear {
                    at,
                    ids,
                    convex,
                    angle: if convex {
                        opening
                    } else {
                        std::f64::consts::TAU - opening
                    },
                }
            })
            .collect();
        ears.sort_by(|a, b| {
            b.convex
                .cmp(&a.convex)
                .then(a.angle.total_cmp(&b.angle))
                .then(a.at.cmp(&b.at))
        });

        let mut deferred = Vec::new();
        for ear in ears {
            if ear.convex && !self.encloses_ring_vertex(&ear, ring, normal) {
                if self.acceptable(ear.ids, placed, diagonals, false) {
                    return Some(ear);
                }
            } else {
                deferred.push(ear);
            }
        }

        deferred
            .into_iter()
            .find(|ear| self.acceptable(ear.ids, placed, diagonals, false))
    }

    /// Whether the ear may be emitted.
    fn acceptable(
        &self,
        ids: [u32; 3],
        placed: &[[u32; 3]],
        diagonals: &HashSet<(u32, u32)>,
        closing: bool,
    ) -> bool {
        let [a, b, c] = ids;
        if a == b || b == c || a == c {
            return false;
        }

        let tri = self.triangle(ids);
        let longest = tri
            .vertices()
            .iter()
            .zip(tri.vertices().iter().cycle().skip(1))
            .map(|(p, q)| (q - p).norm_squared())
            .fold(0.0, f64::max);
        if tri.is_degenerate(self.epsilon * longest) {
            return false;
        }

        if !closing {
            let diagonal = normalize_edge(a, c);
            if self.mesh_edges.contains(&diagonal) || diagonals.contains(&diagonal) {
                return false;
            }
        }

        !self.hits_surface(&tri, ids) && !self.hits_placed(&tri, ids, placed)
    }

    fn hits_surface(&self, tri: &Triangle, ids: [u32; 3]) -> bool {
        self.grid.query(&tri.bounds()).into_iter().any(|g| {
            let face = &self.mesh.faces[g as usize];
            !face.is_deleted()
                && faces_intersect(
                    tri,
                    ids,
                    &self.mesh.triangle(g as usize),
                    face.vertices,
                    self.epsilon,
                )
        })
    }

    fn hits_placed(&self, tri: &Triangle, ids: [u32; 3], placed: &[[u32; 3]]) -> bool {
        let bounds = tri.bounds();
        placed.iter().any(|&other| {
            let other_tri = self.triangle(other);
            bounds.intersects(&other_tri.bounds(), 0.0)
                && faces_intersect(tri, ids, &other_tri, other, self.epsilon)
        })
    }

    /// Whether another ring vertex projects strictly inside the ear.
    fn encloses_ring_vertex(&self, ear: &Ear, ring: &[u32], normal: &Vector3<f64>) -> bool {
        let (i, j) = projection_axes(normal);
        let flat = |v: u32| {
            let p = self.mesh.position(v);
            [p[i], p[j]]
        };
        let [a, b, c] = ear.ids.map(flat);

        ring.iter()
            .filter(|v| !ear.ids.contains(v))
            .any(|&v| point_in_triangle_2d(flat(v), a, b, c))
    }

    fn triangle(&self, [a, b, c]: [u32; 3]) -> Triangle {
        Triangle::new(
            self.mesh.position(a),
            self.mesh.position(b),
            self.mesh.position(c),
        )
    }

    /// Newell normal of the ring, taken about its centroid.
    #[allow(clippy::cast_precision_loss)]
    fn newell_normal(&self, ring: &[u32]) -> Vector3<f64> {
        let points: Vec<Point3<f64>> = ring.iter().map(|&v| self.mesh.position(v)).collect();
        let centroid = points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / points.len() as f64;

        (0..points.len())
            .map(|k| {
                let p = points[k].coords - centroid;
                let q = points[(k + 1) % points.len()].coords - centroid;
                p.cross(&q)
            })
            .fold(Vector3::zeros(), |acc, n| acc + n)
    }
}

/// Strict point-in-triangle test in 2D, independent of winding.
fn point_in_triangle_2d(p: [f64; 2], a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> bool {
    let side = |u: [f64; 2], v: [f64; 2]| {
        (v[0] - u[0]).mul_add(p[1] - u[1], -((v[1] - u[1]) * (p[0] - u[0])))
    };
    let (d1, d2, d3) = (side(a, b), side(b, c), side(c, a));
    (d1 > 0.0 && d2 > 0.0 && d3 > 0.0) || (d1 < 0.0 && d2 < 0.0 && d3 < 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{Point3, open_box};

    /// Each directed edge used once means closed and consistently wound.
    fn directed_edges_unique(mesh: &TriMesh) -> bool {
        let mut seen = HashSet::new();
        mesh.live_faces()
            .all(|(_, f)| (0..3).all(|i| seen.insert(f.edge(i))))
    }

    /// Open-ended tube around the Z axis with `segments` sides.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn open_tube(segments: u32) -> TriMesh {
        let mut mesh = TriMesh::new();
        for z in [0.0, 1.0] {
            for k in 0..segments {
                let t = std::f64::consts::TAU * f64::from(k) / f64::from(segments);
                mesh.add_vertex(Point3::new(t.cos(), t.sin(), z));
            }
        }
        for k in 0..segments {
            let next = (k + 1) % segments;
            let (b0, b1, t0, t1) = (k, next, k + segments, next + segments);
            mesh.add_face([b0, b1, t1]);
            mesh.add_face([b0, t1, t0]);
        }
        mesh
    }

    /// Flat `n` x `n` grid of unit cells in the XY plane, wound towards +Z,
    /// with the listed `(row, col)` cells left out.
    fn grid_plate(n: u32, removed: &[(u32, u32)]) -> TriMesh {
        let mut mesh = TriMesh::new();
        for row in 0..=n {
            for col in 0..=n {
                mesh.add_vertex(Point3::new(f64::from(col), f64::from(row), 0.0));
            }
        }
        for row in 0..n {
            for col in 0..n {
                if removed.contains(&(row, col)) {
                    continue;
                }
                let v00 = row * (n + 1) + col;
                let (v01, v10) = (v00 + 1, v00 + n + 1);
                mesh.add_face([v00, v01, v10 + 1]);
                mesh.add_face([v00, v10 + 1, v10]);
            }
        }
        mesh
    }

    #[test]
    fn single_triangle_has_one_loop() {
        let mut mesh = TriMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        build_adjacency(&mut mesh);
        mark_borders(&mut mesh);

        let holes = detect_holes(&mesh);
        assert_eq!(holes.len(), 1);
        assert_eq!(holes[0].edge_count(), 3);
        assert_eq!(holes[0].edges.len(), 3);
    }

    #[test]
    fn open_box_rim_is_one_loop() {
        let mut mesh = open_box();
        build_adjacency(&mut mesh);
        mark_borders(&mut mesh);

        let holes = detect_holes(&mesh);
        assert_eq!(holes.len(), 1);
        let mut rim = holes[0].vertices.clone();
        rim.sort_unstable();
        assert_eq!(rim, vec![4, 5, 6, 7]);
    }

    #[test]
    fn open_box_fills_with_outward_winding() {
        let mut mesh = open_box();
        let report = fill_holes(&mut mesh, &HoleFillParams::default());

        assert_eq!(report.holes_found, 1);
        assert_eq!(report.holes_filled, 1);
        assert_eq!(report.triangles_added, 2);
        assert_eq!(report.holes_left_open(), 0);
        assert!(directed_edges_unique(&mesh));
        assert!(EdgeMap::build(&mesh).is_watertight());
        assert!((mesh.signed_volume() - 1.0).abs() < 1e-12);
        assert!(mesh.topology_is_current());
    }

    #[test]
    fn fill_after_plain_rebuild_finds_the_hole() {
        let mut mesh = open_box();
        build_adjacency(&mut mesh);

        let report = fill_holes(&mut mesh, &HoleFillParams::default());
        assert_eq!(report.holes_found, 1);
        assert_eq!(report.holes_filled, 1);
        assert_eq!(mesh.face_count(), 12);
        assert!(EdgeMap::build(&mesh).is_watertight());
    }

    #[test]
    fn holes_touching_at_a_vertex_are_separate_loops() {
        // Cells (1,1) and (2,2) meet only at vertex 12
        let mut mesh = grid_plate(4, &[(1, 1), (2, 2)]);
        build_adjacency(&mut mesh);
        mark_borders(&mut mesh);

        let holes = detect_holes(&mesh);
        let inner: Vec<&BoundaryLoop> = holes.iter().filter(|h| h.edge_count() == 4).collect();
        assert_eq!(holes.len(), 3);
        assert_eq!(inner.len(), 2);
        for hole in &inner {
            assert_eq!(hole.vertices.iter().filter(|&&v| v == 12).count(), 1);
            assert_eq!(hole.edges.len(), 4);
        }
        assert!(holes.iter().any(|h| h.edge_count() == 16));
    }

    #[test]
    fn holes_touching_at_a_vertex_both_fill() {
        let mut mesh = grid_plate(4, &[(1, 1), (2, 2)]);
        let report = fill_holes(&mut mesh, &HoleFillParams::default());

        // The outer rim cannot be capped without covering the plate
        assert_eq!(report.holes_found, 3);
        assert_eq!(report.holes_filled, 2);
        assert_eq!(report.holes_abandoned, 1);
        assert_eq!(report.triangles_added, 4);
        assert_eq!(mesh.face_count(), 32);
        assert_eq!(EdgeMap::build(&mesh).boundary_edge_count(), 16);
        assert!(directed_edges_unique(&mesh));
    }

    #[test]
    fn split_keeps_edges_aligned() {
        let fe = |k: u32| FaceEdge::new(k, 0);
        let traced = BoundaryLoop {
            vertices: vec![7, 6, 11, 12, 17, 18, 13, 12],
            edges: (0..8).map(fe).collect(),
        };

        let parts = split_at_repeated_vertices(traced);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].vertices, vec![12, 17, 18, 13]);
        assert_eq!(parts[0].edges, vec![fe(3), fe(4), fe(5), fe(6)]);
        assert_eq!(parts[1].vertices, vec![7, 6, 11, 12]);
        assert_eq!(parts[1].edges, vec![fe(0), fe(1), fe(2), fe(7)]);
    }

    #[test]
    fn tube_fills_both_ends() {
        let mut mesh = open_tube(8);
        let report = fill_holes(&mut mesh, &HoleFillParams::default());

        assert_eq!(report.holes_found, 2);
        assert_eq!(report.holes_filled, 2);
        assert_eq!(report.triangles_added, 2 * (8 - 2));
        assert!(directed_edges_unique(&mesh));
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn size_limit_leaves_hole_open() {
        let mut mesh = open_box();
        let params = HoleFillParams::default().with_max_hole_edges(3);
        let report = fill_holes(&mut mesh, &params);

        assert_eq!(report.holes_skipped_too_large, 1);
        assert_eq!(report.holes_filled, 0);
        assert_eq!(mesh.face_count(), 10);
    }

    #[test]
    fn selected_only_ignores_unselected_holes() {
        let mut mesh = open_box();
        let params = HoleFillParams::default().with_selected_only(true);
        let report = fill_holes(&mut mesh, &params);
        assert_eq!(report.holes_found, 0);
        assert_eq!(mesh.face_count(), 10);

        // Face 3 owns the rim edge 5-4
        mesh.faces[3].flags.insert(FaceFlags::SELECTED);
        let report = fill_holes(&mut mesh, &params);
        assert_eq!(report.holes_filled, 1);
        assert_eq!(mesh.face_count(), 12);
    }

    #[test]
    fn blocked_hole_is_rolled_back() {
        let mut mesh = open_box();
        // Small closed tetrahedron poking through the opening near (0.3, 0.6)
        let tip = mesh.add_vertex(Point3::new(0.3, 0.6, 0.5));
        let a = mesh.add_vertex(Point3::new(0.35, 0.6, 1.5));
        let b = mesh.add_vertex(Point3::new(0.25, 0.65, 1.5));
        let c = mesh.add_vertex(Point3::new(0.28, 0.55, 1.5));
        mesh.add_face([tip, b, a]);
        mesh.add_face([tip, c, b]);
        mesh.add_face([tip, a, c]);
        mesh.add_face([a, b, c]);

        let report = fill_holes(&mut mesh, &HoleFillParams::default());
        assert_eq!(report.holes_found, 1);
        assert_eq!(report.holes_abandoned, 1);
        assert_eq!(report.triangles_added, 0);
        assert_eq!(mesh.face_count(), 14);
    }

    #[test]
    fn point_in_triangle_either_winding() {
        let (a, b, c) = ([0.0, 0.0], [1.0, 0.0], [0.0, 1.0]);
        assert!(point_in_triangle_2d([0.2, 0.2], a, b, c));
        assert!(point_in_triangle_2d([0.2, 0.2], a, c, b));
        assert!(!point_in_triangle_2d([1.0, 1.0], a, b, c));
        assert!(!point_in_triangle_2d([0.5, 0.0], a, b, c));
    }

    #[test]
    fn report_display() {
        let report = HoleFillReport {
            holes_found: 3,
            holes_filled: 2,
            holes_skipped_too_large: 1,
            holes_abandoned: 0,
            triangles_added: 7,
        };
        assert_eq!(
            report.to_string(),
            "2 of 3 holes filled (7 triangles), 1 too large, 0 abandoned"
        );
    }
}
