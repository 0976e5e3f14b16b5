//! Human-readable stage lines for a finished repair.

use std::io::{self, Write};

use mesh_repair::RepairReport;

/// Write one line per pipeline stage.
pub fn write_progress<W: Write>(out: &mut W, report: &RepairReport) -> io::Result<()> {
    let clean = &report.clean;
    writeln!(
        out,
        "Removed {} duplicate vertices, {} unreferenced vertices.",
        clean.duplicate_vertices, clean.unreferenced_vertices
    )?;
    writeln!(
        out,
        "Removed {} duplicate faces, {} degenerate faces.",
        clean.duplicate_faces, clean.degenerate_faces
    )?;
    writeln!(out, "Removed {} non-manifold faces.", report.non_manifold_faces)?;

    let holes = &report.holes;
    writeln!(
        out,
        "Filled {} of {} holes with {} triangles.",
        holes.holes_filled, holes.holes_found, holes.triangles_added
    )?;

    let orientation = &report.orientation;
    if orientation.is_oriented {
        writeln!(
            out,
            "Mesh oriented consistently ({} faces flipped).",
            orientation.faces_flipped
        )?;
    } else {
        writeln!(
            out,
            "Orientation incomplete ({} faces flipped).",
            orientation.faces_flipped
        )?;
    }
    Ok(())
}

/// Conditions worth a warning on stderr. None of them fail the run.
pub fn warnings(report: &RepairReport) -> Vec<String> {
    let mut warnings = Vec::new();

    let open = report.holes.holes_left_open();
    if open > 0 {
        warnings.push(format!(
            "{open} holes left open ({} too large, {} without a valid triangulation)",
            report.holes.holes_skipped_too_large, report.holes.holes_abandoned
        ));
    }
    if !report.orientation.is_orientable {
        let detail = report
            .orientation
            .conflicting_pair
            .map(|(f, g)| format!(", faces {f} and {g} disagree"))
            .unwrap_or_default();
        warnings.push(format!("mesh is non-orientable (Mobius-like){detail}"));
    }
    if !report.orientation.is_oriented {
        warnings.push("orientation may still be inconsistent".to_string());
    }
    warnings
}
