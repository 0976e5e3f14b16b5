//! Wavefront OBJ support.
//!
//! Only geometry is read: `v` positions and `f` faces. Face corners may use
//! any of the `v`, `v/vt`, `v//vn` and `v/vt/vn` forms, and negative indices
//! count back from the most recent vertex. Polygons are fan-triangulated.
//! Everything else (`vt`, `vn`, groups, materials) is skipped on input.
//!
//! Output carries positions, per-vertex normals when any are set, and faces.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use mesh_types::{Point3, TriMesh};

use crate::error::{IoError, IoResult};
use crate::{compacted, validate_indices};

/// Load a mesh from an OBJ file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a number does not parse, or
/// a face references a vertex that does not exist.
///
/// # Example
///
/// ```no_run
/// use mesh_io::load_obj;
///
/// let mesh = load_obj("model.obj").unwrap();
/// println!("Loaded {} faces", mesh.faces.len());
/// ```
pub fn load_obj<P: AsRef<Path>>(path: P) -> IoResult<TriMesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IoError::from_open(e, path))?;
    let mesh = parse_obj(BufReader::new(file))?;
    validate_indices(&mesh)?;
    Ok(mesh)
}

fn parse_obj<R: BufRead>(reader: R) -> IoResult<TriMesh> {
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<[u32; 3]> = Vec::new();
    let mut polygon: Vec<u32> = Vec::with_capacity(4);

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.split('#').next().unwrap_or_default();
        let mut parts = line.split_whitespace();

        match parts.next() {
            Some("v") => {
                let mut coord = || -> IoResult<f64> {
                    Ok(parts
                        .next()
                        .ok_or_else(|| {
                            IoError::invalid_content(format!(
                                "line {}: vertex needs three coordinates",
                                line_no + 1
                            ))
                        })?
                        .parse()?)
                };
                let (x, y, z) = (coord()?, coord()?, coord()?);
                positions.push(Point3::new(x, y, z));
            }
            Some("f") => {
                polygon.clear();
                for corner in parts {
                    polygon.push(resolve_index(corner, positions.len(), line_no + 1)?);
                }
                if polygon.len() < 3 {
                    return Err(IoError::invalid_content(format!(
                        "line {}: face needs at least three corners",
                        line_no + 1
                    )));
                }
                for k in 1..polygon.len() - 1 {
                    faces.push([polygon[0], polygon[k], polygon[k + 1]]);
                }
            }
            _ => {}
        }
    }

    Ok(TriMesh::from_parts(positions, faces))
}

/// Turn one face corner into a zero-based vertex index.
///
/// Only the part before the first `/` matters.
fn resolve_index(corner: &str, vertex_count: usize, line: usize) -> IoResult<u32> {
    let raw: i64 = corner.split('/').next().unwrap_or_default().parse()?;
    let count = i64::try_from(vertex_count).unwrap_or(i64::MAX);

    let index = match raw {
        0 => None,
        r if r > 0 => Some(r - 1),
        r => Some(count + r).filter(|&i| i >= 0),
    };

    index
        .and_then(|i| u32::try_from(i).ok())
        .ok_or_else(|| IoError::invalid_content(format!("line {line}: bad vertex index {raw}")))
}

/// Save a mesh to an OBJ file.
///
/// Deleted elements are dropped and indices renumbered.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
///
/// # Example
///
/// ```no_run
/// use mesh_io::{load_obj, save_obj};
///
/// let mesh = load_obj("input.obj").unwrap();
/// save_obj(&mesh, "output.obj").unwrap();
/// ```
pub fn save_obj<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> IoResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_obj(&compacted(mesh), &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn write_obj<W: Write>(mesh: &TriMesh, writer: &mut W) -> IoResult<()> {
    writeln!(writer, "# written by mesh-io")?;
    writeln!(
        writer,
        "# {} vertices, {} faces",
        mesh.vertices.len(),
        mesh.faces.len()
    )?;

    for v in &mesh.vertices {
        let p = v.position;
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }

    let with_normals = mesh.vertices.iter().any(|v| v.normal.norm_squared() > 0.0);
    if with_normals {
        for v in &mesh.vertices {
            let n = v.normal;
            writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
        }
    }

    for face in &mesh.faces {
        let [a, b, c] = face.vertices.map(|i| i + 1);
        if with_normals {
            writeln!(writer, "f {a}//{a} {b}//{b} {c}//{c}")?;
        } else {
            writeln!(writer, "f {a} {b} {c}")?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use mesh_types::unit_cube;

    fn parse(text: &str) -> IoResult<TriMesh> {
        parse_obj(text.as_bytes())
    }

    #[test]
    fn plain_triangles() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.faces[0].vertices, [0, 1, 2]);
    }

    #[test]
    fn corner_forms_and_comments() {
        let text = "\
# comment
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0 # trailing comment
vt 0 0
vn 0 0 1
f 1/1 2/1/1 3//1
f -4 -2 -1
";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.faces.len(), 2);
        assert_eq!(mesh.faces[0].vertices, [0, 1, 2]);
        assert_eq!(mesh.faces[1].vertices, [0, 2, 3]);
    }

    #[test]
    fn polygons_are_fanned() {
        let mesh = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv -1 1 0\nf 1 2 3 4 5\n").unwrap();
        assert_eq!(mesh.faces.len(), 3);
        assert_eq!(mesh.faces[2].vertices, [0, 3, 4]);
    }

    #[test]
    fn zero_and_underflowing_indices_rejected() {
        assert!(matches!(
            parse("v 0 0 0\nf 0 1 1\n"),
            Err(IoError::InvalidContent { .. })
        ));
        assert!(matches!(
            parse("v 0 0 0\nf -2 1 1\n"),
            Err(IoError::InvalidContent { .. })
        ));
        assert!(matches!(parse("v 0 0\n"), Err(IoError::InvalidContent { .. })));
        assert!(matches!(parse("v 0 x 0\n"), Err(IoError::ParseFloat(_))));
    }

    #[test]
    fn written_cube_reads_back_exactly() {
        let mut cube = unit_cube();
        cube.update_vertex_normals();

        let mut out = Vec::new();
        write_obj(&cube, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("vn "));
        assert!(text.contains("f 1//1 3//3 2//2"));

        let loaded = parse(&text).unwrap();
        assert_eq!(loaded.vertices.len(), 8);
        assert_eq!(loaded.faces.len(), 12);
        for (a, b) in cube.faces.iter().zip(&loaded.faces) {
            assert_eq!(a.vertices, b.vertices);
        }
        assert_eq!(loaded.position(6), cube.position(6));
    }

    #[test]
    fn deleted_elements_are_not_written() {
        let mut cube = unit_cube();
        cube.delete_face(0);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.obj");

        save_obj(&cube, &path).unwrap();
        assert_eq!(load_obj(&path).unwrap().faces.len(), 11);
    }

    #[test]
    fn out_of_range_index_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nf 1 2 7\n").unwrap();

        assert!(matches!(load_obj(&path), Err(IoError::InvalidContent { .. })));
    }
}
