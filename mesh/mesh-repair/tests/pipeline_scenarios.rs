//! End-to-end repair scenarios.
//!
//! Each test builds a small mesh with one known defect, runs a stage or the
//! whole pipeline, and checks the reported counts and the resulting topology.
//!
//! Run with: cargo test -p mesh-repair --test pipeline_scenarios

use mesh_repair::{
    EdgeMap, RepairParams, build_adjacency, clean_mesh, orient_coherently,
    remove_duplicate_triangles, remove_non_manifold_triangles, repair_mesh, validate_mesh,
};
use mesh_types::{FaceFlags, Point3, TriMesh, open_box, unit_cube};

// =============================================================================
// Test Mesh Generation
// =============================================================================

/// Twisted strip of `segments` quads whose ends are glued with a half turn.
fn mobius_strip(segments: u32) -> TriMesh {
    let mut mesh = TriMesh::new();
    let width = 0.3;
    for k in 0..segments {
        let theta = std::f64::consts::TAU * f64::from(k) / f64::from(segments);
        let (radial_x, radial_y) = (theta.cos(), theta.sin());
        let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
        let offset = |sign: f64| {
            Point3::new(
                sign.mul_add(width * c * radial_x, radial_x),
                sign.mul_add(width * c * radial_y, radial_y),
                sign * width * s,
            )
        };
        mesh.add_vertex(offset(1.0));
        mesh.add_vertex(offset(-1.0));
    }

    for k in 0..segments {
        let (a, b) = (2 * k, 2 * k + 1);
        // The last rung meets the first one upside down
        let (next_a, next_b) = if k + 1 == segments {
            (1, 0)
        } else {
            (2 * k + 2, 2 * k + 3)
        };
        mesh.add_face([a, b, next_b]);
        mesh.add_face([a, next_b, next_a]);
    }
    mesh
}

/// Three triangles hinged on the edge 0-1.
fn three_fins() -> TriMesh {
    TriMesh::from_parts(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(1.0, 0.0, 0.5),
        ],
        vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]],
    )
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn box_missing_its_lid_is_closed() {
    let mut mesh = open_box();
    assert_eq!(mesh.face_count(), 10);

    let report = repair_mesh(&mut mesh, &RepairParams::default()).unwrap();

    assert_eq!(report.border_edges, 4);
    assert_eq!(report.holes.holes_found, 1);
    assert_eq!(report.holes.holes_filled, 1);
    assert_eq!(report.holes.triangles_added, 2);
    assert_eq!(report.final_faces, 12);
    assert!(report.orientation.is_orientable);
    assert!(report.orientation.is_oriented);

    let check = validate_mesh(&mesh);
    assert_eq!(check.boundary_edge_count, 0);
    assert!(check.is_watertight_solid());
    assert!((mesh.signed_volume() - 1.0).abs() < 1e-12);
}

#[test]
fn identical_triangles_lose_exactly_one() {
    let mut mesh = TriMesh::from_parts(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        vec![[0, 1, 2], [0, 1, 2]],
    );

    assert_eq!(remove_duplicate_triangles(&mut mesh), 1);
    assert_eq!(mesh.faces.len(), 1);
}

#[test]
fn over_shared_edge_is_resolved() {
    let mut mesh = three_fins();
    build_adjacency(&mut mesh);
    assert!(mesh.faces.iter().all(|f| f.flags.intersects(FaceFlags::ANY_NON_MANIFOLD)));

    let removed = remove_non_manifold_triangles(&mut mesh);
    assert!(removed >= 1);

    let edges = build_adjacency(&mut mesh);
    assert!(edges.incidences(0, 1).len() <= 2);
    assert!(edges.is_manifold());
}

#[test]
fn over_shared_edge_keeps_largest_faces() {
    let mut mesh = three_fins();
    build_adjacency(&mut mesh);

    assert_eq!(remove_non_manifold_triangles(&mut mesh), 1);
    // Areas are 2, 1 and 0.5: the smallest fin goes
    assert_eq!(mesh.faces.len(), 2);
    assert_eq!(mesh.faces[0].vertices, [0, 1, 2]);
    assert_eq!(mesh.faces[1].vertices, [1, 0, 3]);
}

#[test]
fn mobius_strip_is_not_orientable() {
    let mut strip = mobius_strip(12);
    let edges = build_adjacency(&mut strip);
    assert!(edges.is_manifold());
    assert_eq!(edges.boundary_edge_count(), 24);

    let report = orient_coherently(&mut strip, true);
    assert_eq!(report.components, 1);
    assert!(!report.is_orientable);
    assert!(!report.is_oriented);

    let (f, g) = report.conflicting_pair.unwrap();
    assert!(strip.faces[f].adjacent.iter().flatten().any(|fe| fe.face_index() == g));
}

#[test]
fn mobius_strip_survives_pipeline_with_warning() {
    let mut strip = mobius_strip(12);
    let report = repair_mesh(&mut strip, &RepairParams::default()).unwrap();

    assert!(!report.orientation.is_orientable);
    assert!(strip.first_invalid_index().is_none());
}

#[test]
fn hole_limit_leaves_lid_open() {
    let mut mesh = open_box();
    let params = RepairParams::default().with_max_hole_edges(3);
    let report = repair_mesh(&mut mesh, &params).unwrap();

    assert_eq!(report.holes.holes_skipped_too_large, 1);
    assert_eq!(report.final_faces, 10);
    assert_eq!(EdgeMap::build(&mesh).boundary_edge_count(), 4);
    assert!(report.orientation.is_oriented);
}

#[test]
fn messy_cube_is_fully_repaired() {
    // Cube with a duplicated corner, a duplicate face, a face with a repeated
    // vertex, a missing face and one face wound backwards
    let mut mesh = unit_cube();
    let copy_of_six = mesh.add_vertex(Point3::new(1.0, 1.0, 1.0));
    mesh.faces[11].vertices = [4, copy_of_six, 7];
    mesh.add_face([0, 1, 2]);
    mesh.add_face([0, 1, 0]);
    mesh.faces.remove(5);
    mesh.flip_face(2);

    let report = repair_mesh(&mut mesh, &RepairParams::default()).unwrap();

    assert_eq!(report.clean.duplicate_vertices, 1);
    assert_eq!(report.clean.duplicate_faces, 1);
    assert_eq!(report.clean.degenerate_faces, 1);
    assert_eq!(report.holes.holes_filled, 1);
    assert_eq!(report.holes.triangles_added, 1);
    assert_eq!(report.orientation.faces_flipped, 1);
    assert_eq!(report.final_faces, 12);
    assert!(validate_mesh(&mesh).is_watertight_solid());
}

#[test]
fn exported_repair_is_a_fixed_point() {
    let dir = tempfile::tempdir().unwrap();

    for name in ["repaired.ply", "repaired.obj", "repaired.stl"] {
        let mut mesh = open_box();
        repair_mesh(&mut mesh, &RepairParams::default()).unwrap();

        let path = dir.path().join(name);
        mesh_io::save_mesh(&mesh, &path).unwrap();
        let mut reloaded = mesh_io::load_mesh(&path).unwrap();

        assert_eq!(reloaded.face_count(), 12, "{name}");
        let clean = clean_mesh(&mut reloaded, 0.0);
        assert_eq!(clean.duplicate_faces, 0, "{name}");
        assert_eq!(clean.degenerate_faces, 0, "{name}");
        if name != "repaired.stl" {
            assert_eq!(clean.duplicate_vertices, 0, "{name}");
        }

        let again = repair_mesh(&mut reloaded, &RepairParams::default()).unwrap();
        assert!(!again.had_changes(), "{name}");
    }
}
