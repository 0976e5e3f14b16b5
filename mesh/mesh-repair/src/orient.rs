//! Coherent winding across connected components.
//!
//! Two adjacent faces agree when they traverse their shared edge in opposite
//! directions. A breadth-first walk from each unvisited face flips every
//! newly reached neighbour that disagrees; a disagreement with an already
//! visited face means the component cannot be oriented at all.

use std::collections::VecDeque;
use std::fmt;

use mesh_types::TriMesh;
use tracing::{debug, info, warn};

#[cfg(feature = "pipeline-config")]
use serde::{Deserialize, Serialize};

use crate::topology::build_adjacency;

/// Outcome of [`orient_coherently`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "pipeline-config", derive(Serialize, Deserialize))]
pub struct OrientationReport {
    /// Every adjacent pair agrees after the pass.
    pub is_oriented: bool,
    /// No contradiction was met during propagation.
    pub is_orientable: bool,
    /// Faces whose winding differs from the input.
    pub faces_flipped: usize,
    /// Connected components visited.
    pub components: usize,
    /// One adjacent pair that could not be made to agree.
    pub conflicting_pair: Option<(usize, usize)>,
}

impl fmt::Display for OrientationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} components, {} faces flipped, orientable: {}, oriented: {}",
            self.components, self.faces_flipped, self.is_orientable, self.is_oriented
        )
    }
}

/// Make winding consistent within every connected component.
///
/// Rebuilds adjacency first if it is stale. With `outward` set, each closed
/// and orientable component whose signed volume comes out negative is then
/// flipped as a whole so its normals point out.
///
/// # Example
///
/// ```
/// use mesh_types::unit_cube;
/// use mesh_repair::orient_coherently;
///
/// let mut cube = unit_cube();
/// cube.flip_face(4);
///
/// let report = orient_coherently(&mut cube, true);
/// assert!(report.is_orientable);
/// assert!(report.is_oriented);
/// assert_eq!(report.faces_flipped, 1);
/// assert!(cube.signed_volume() > 0.0);
/// ```
pub fn orient_coherently(mesh: &mut TriMesh, outward: bool) -> OrientationReport {
    if !mesh.topology_is_current() {
        build_adjacency(mesh);
    }

    let mut report = OrientationReport {
        is_orientable: true,
        ..OrientationReport::default()
    };
    let mut flipped = vec![false; mesh.faces.len()];
    let epoch = mesh.next_mark();
    let mut queue = VecDeque::new();

    for seed in 0..mesh.faces.len() {
        if mesh.faces[seed].is_deleted() || mesh.faces[seed].is_marked(epoch) {
            continue;
        }

        report.components += 1;
        mesh.faces[seed].set_mark(epoch);
        queue.push_back(seed);

        let mut component = Vec::new();
        let mut closed = true;
        let mut conflict = false;

        while let Some(f) = queue.pop_front() {
            component.push(f);
            for i in 0..3 {
                let Some(fe) = mesh.faces[f].adjacent[i] else {
                    closed = false;
                    continue;
                };
                let g = fe.face_index();
                let (a, b) = mesh.faces[f].edge(i);
                let agrees = mesh.faces[g].edge(fe.edge_index()) == (b, a);

                if !mesh.faces[g].is_marked(epoch) {
                    if !agrees {
                        mesh.flip_face(g);
                        flipped[g] = !flipped[g];
                    }
                    mesh.faces[g].set_mark(epoch);
                    queue.push_back(g);
                } else if !agrees {
                    conflict = true;
                    report.conflicting_pair.get_or_insert((f, g));
                }
            }
        }

        if conflict {
            report.is_orientable = false;
            warn!(faces = component.len(), "component is not orientable");
        } else if outward && closed && mesh.signed_volume_of(component.iter().copied()) < 0.0 {
            for &f in &component {
                mesh.flip_face(f);
                flipped[f] = !flipped[f];
            }
            debug!(faces = component.len(), "turned inside-out component outward");
        }
    }

    report.faces_flipped = flipped.iter().filter(|&&x| x).count();
    report.is_oriented = is_coherently_oriented(mesh);
    info!(%report, "orientation pass done");
    report
}

/// Whether every linked pair of faces traverses its shared edge in opposite
/// directions. Uses the stored adjacency as is.
#[must_use]
pub fn is_coherently_oriented(mesh: &TriMesh) -> bool {
    mesh.live_faces().all(|(_, face)| {
        (0..3).all(|i| {
            face.adjacent[i].is_none_or(|fe| {
                let (a, b) = face.edge(i);
                mesh.faces[fe.face_index()].edge(fe.edge_index()) == (b, a)
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{Point3, unit_cube};

    #[test]
    fn consistent_cube_untouched() {
        let mut cube = unit_cube();
        let report = orient_coherently(&mut cube, true);

        assert_eq!(report.components, 1);
        assert_eq!(report.faces_flipped, 0);
        assert!(report.is_oriented && report.is_orientable);
        assert!(report.conflicting_pair.is_none());
    }

    #[test]
    fn scrambled_cube_is_repaired() {
        let mut cube = unit_cube();
        for f in [1, 4, 7, 9] {
            cube.flip_face(f);
        }
        let report = orient_coherently(&mut cube, true);

        assert!(report.is_oriented);
        assert_eq!(report.faces_flipped, 4);
        assert!((cube.signed_volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inside_out_cube_turned_outward() {
        let mut cube = unit_cube();
        for f in 0..12 {
            cube.flip_face(f);
        }
        let report = orient_coherently(&mut cube, true);
        assert_eq!(report.faces_flipped, 12);
        assert!((cube.signed_volume() - 1.0).abs() < 1e-12);

        let mut inverted = unit_cube();
        for f in 0..12 {
            inverted.flip_face(f);
        }
        let report = orient_coherently(&mut inverted, false);
        assert_eq!(report.faces_flipped, 0);
        assert!(report.is_oriented);
        assert!(inverted.signed_volume() < 0.0);
    }

    #[test]
    fn separate_components_counted() {
        let mut mesh = TriMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(5.0, 0.0, 0.0),
                Point3::new(6.0, 0.0, 0.0),
                Point3::new(5.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        );
        let report = orient_coherently(&mut mesh, true);
        assert_eq!(report.components, 2);
        assert!(report.is_oriented);
    }

    #[test]
    fn adjacency_stays_symmetric_after_flips() {
        let mut cube = unit_cube();
        cube.flip_face(2);
        cube.flip_face(10);
        orient_coherently(&mut cube, true);
        assert!(crate::topology::check_adjacency_symmetry(&cube));
    }
}
