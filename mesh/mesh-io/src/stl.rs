//! STL (Stereolithography) file format support.
//!
//! STL stores an unindexed triangle soup, so every facet brings three fresh
//! vertices. Shared corners are merged later by duplicate-vertex removal.
//!
//! # Format Detection
//!
//! A file is read as ASCII when it starts with "solid" and its size does not
//! match the binary layout announced by the triangle count. Some binary
//! exporters write "solid" into the header, hence the size check.
//!
//! # Binary Format
//!
//! ```text
//! UINT8[80]    – Header (ignored)
//! UINT32       – Number of triangles
//! foreach triangle
//!     REAL32[3] – Normal vector
//!     REAL32[3] – Vertex 1
//!     REAL32[3] – Vertex 2
//!     REAL32[3] – Vertex 3
//!     UINT16    – Attribute byte count (usually 0)
//! end
//! ```

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use mesh_types::{Point3, TriMesh, Vector3};

use crate::error::{IoError, IoResult};

/// STL binary header size in bytes.
const HEADER_SIZE: usize = 80;

/// Size of one triangle in binary STL (normal + 3 vertices + attribute).
const TRIANGLE_SIZE: usize = 50;

/// Load a mesh from an STL file, ASCII or binary.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid STL.
///
/// # Example
///
/// ```no_run
/// use mesh_io::load_stl;
///
/// let mesh = load_stl("model.stl").unwrap();
/// println!("Loaded {} faces", mesh.faces.len());
/// ```
pub fn load_stl<P: AsRef<Path>>(path: P) -> IoResult<TriMesh> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| IoError::from_open(e, path))?;
    parse_stl(&bytes)
}

/// Parse STL from an in-memory buffer.
fn parse_stl(bytes: &[u8]) -> IoResult<TriMesh> {
    if bytes.len() < 6 {
        return Err(IoError::invalid_content("file too small to be valid STL"));
    }

    let starts_with_solid = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .is_some_and(|start| bytes[start..].starts_with(b"solid"));

    if starts_with_solid && !has_binary_size(bytes) {
        parse_stl_ascii(bytes)
    } else {
        parse_stl_binary(bytes)
    }
}

/// Whether the buffer length matches the triangle count in a binary header.
fn has_binary_size(bytes: &[u8]) -> bool {
    binary_face_count(bytes)
        .is_some_and(|count| bytes.len() == HEADER_SIZE + 4 + count as usize * TRIANGLE_SIZE)
}

fn binary_face_count(bytes: &[u8]) -> Option<u32> {
    let raw = bytes.get(HEADER_SIZE..HEADER_SIZE + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn parse_stl_binary(bytes: &[u8]) -> IoResult<TriMesh> {
    let face_count = binary_face_count(bytes).ok_or(IoError::InvalidHeader {
        expected: HEADER_SIZE + 4,
        got: bytes.len(),
    })?;

    let body = &bytes[HEADER_SIZE + 4..];
    let available = body.len() / TRIANGLE_SIZE;
    if available < face_count as usize {
        return Err(IoError::InvalidFaceCount {
            expected: face_count,
            got: u32::try_from(available).unwrap_or(u32::MAX),
        });
    }

    let mut positions = Vec::with_capacity(face_count as usize * 3);
    let mut faces = Vec::with_capacity(face_count as usize);
    for chunk in body.chunks_exact(TRIANGLE_SIZE).take(face_count as usize) {
        #[allow(clippy::cast_possible_truncation)]
        // Truncation: mesh indices are u32, meshes with >4B vertices are unsupported
        let base = positions.len() as u32;
        // Skip the stored normal, it is recomputed on demand
        positions.push(read_point(&chunk[12..24]));
        positions.push(read_point(&chunk[24..36]));
        positions.push(read_point(&chunk[36..48]));
        faces.push([base, base + 1, base + 2]);
    }

    Ok(TriMesh::from_parts(positions, faces))
}

/// Read a point from 12 bytes (3 f32s).
fn read_point(buf: &[u8]) -> Point3<f64> {
    let f = |i: usize| f32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
    Point3::new(f64::from(f(0)), f64::from(f(4)), f64::from(f(8)))
}

fn parse_stl_ascii<R: BufRead>(reader: R) -> IoResult<TriMesh> {
    let mut positions = Vec::new();
    let mut faces = Vec::new();
    let mut corners: Vec<Point3<f64>> = Vec::with_capacity(3);
    let mut in_loop = false;

    for line in reader.lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword.to_ascii_lowercase().as_str() {
            "outer" => {
                in_loop = true;
                corners.clear();
            }
            "vertex" if in_loop => {
                let mut coord = || -> IoResult<f64> {
                    Ok(parts
                        .next()
                        .ok_or_else(|| IoError::invalid_content("vertex needs three coordinates"))?
                        .parse()?)
                };
                let (x, y, z) = (coord()?, coord()?, coord()?);
                corners.push(Point3::new(x, y, z));
            }
            "endloop" => in_loop = false,
            "endfacet" => {
                if corners.len() == 3 {
                    #[allow(clippy::cast_possible_truncation)]
                    // Truncation: mesh indices are u32, meshes with >4B vertices unsupported
                    let base = positions.len() as u32;
                    positions.append(&mut corners);
                    faces.push([base, base + 1, base + 2]);
                }
                corners.clear();
            }
            "endsolid" => break,
            _ => {}
        }
    }

    Ok(TriMesh::from_parts(positions, faces))
}

/// Save a mesh to an STL file.
///
/// Deleted faces are skipped. Facet normals are computed from the geometry.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
///
/// # Example
///
/// ```no_run
/// use mesh_io::{load_stl, save_stl};
///
/// let mesh = load_stl("input.stl").unwrap();
/// save_stl(&mesh, "output.stl", true).unwrap(); // Binary
/// save_stl(&mesh, "output_ascii.stl", false).unwrap(); // ASCII
/// ```
pub fn save_stl<P: AsRef<Path>>(mesh: &TriMesh, path: P, binary: bool) -> IoResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    if binary {
        write_stl_binary(mesh, &mut writer)?;
    } else {
        write_stl_ascii(mesh, &mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

fn facet_normal(mesh: &TriMesh, f: usize) -> Vector3<f64> {
    mesh.triangle(f).normal().unwrap_or_else(Vector3::zeros)
}

fn write_stl_binary<W: Write>(mesh: &TriMesh, writer: &mut W) -> IoResult<()> {
    let mut header = [b' '; HEADER_SIZE];
    let text = b"Binary STL written by mesh-io";
    header[..text.len()].copy_from_slice(text);
    writer.write_all(&header)?;

    #[allow(clippy::cast_possible_truncation)]
    // Truncation: face count is bounded by u32 indices
    let face_count = mesh.face_count() as u32;
    writer.write_all(&face_count.to_le_bytes())?;

    for (f, face) in mesh.live_faces() {
        write_vector(writer, &facet_normal(mesh, f))?;
        for &v in &face.vertices {
            write_vector(writer, &mesh.position(v).coords)?;
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }

    Ok(())
}

/// Write a vector as 3 f32s in little-endian.
fn write_vector<W: Write>(writer: &mut W, v: &Vector3<f64>) -> IoResult<()> {
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: f64 to f32 is intentional for STL format
    let coords = [v.x as f32, v.y as f32, v.z as f32];
    for c in coords {
        writer.write_all(&c.to_le_bytes())?;
    }
    Ok(())
}

fn write_stl_ascii<W: Write>(mesh: &TriMesh, writer: &mut W) -> IoResult<()> {
    writeln!(writer, "solid mesh")?;

    for (f, face) in mesh.live_faces() {
        let n = facet_normal(mesh, f);
        writeln!(writer, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for &v in &face.vertices {
            let p = mesh.position(v);
            writeln!(writer, "      vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }

    writeln!(writer, "endsolid mesh")?;
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::unnecessary_raw_string_hashes
)]
mod tests {
    use super::*;
    use mesh_types::unit_cube;

    #[test]
    fn binary_roundtrip_keeps_soup() {
        let cube = unit_cube();
        let mut bytes = Vec::new();
        write_stl_binary(&cube, &mut bytes).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 4 + 12 * TRIANGLE_SIZE);

        let loaded = parse_stl(&bytes).unwrap();
        assert_eq!(loaded.faces.len(), 12);
        assert_eq!(loaded.vertices.len(), 36);
        assert!((loaded.signed_volume() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ascii_roundtrip_is_exact() {
        let cube = unit_cube();
        let mut bytes = Vec::new();
        write_stl_ascii(&cube, &mut bytes).unwrap();

        let loaded = parse_stl(&bytes).unwrap();
        assert_eq!(loaded.faces.len(), 12);
        assert_eq!(loaded.position(loaded.faces[0].vertices[1]), cube.position(2));
    }

    #[test]
    fn binary_header_starting_with_solid() {
        let mut bytes = Vec::new();
        write_stl_binary(&unit_cube(), &mut bytes).unwrap();
        bytes[..5].copy_from_slice(b"solid");

        assert_eq!(parse_stl(&bytes).unwrap().faces.len(), 12);
    }

    #[test]
    fn truncated_binary_rejected() {
        let mut bytes = Vec::new();
        write_stl_binary(&unit_cube(), &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 10);

        assert!(matches!(
            parse_stl(&bytes),
            Err(IoError::InvalidFaceCount {
                expected: 12,
                got: 11
            })
        ));
    }

    #[test]
    fn ascii_stl_parsing() {
        let ascii_stl = br#"solid test
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid test"#;

        let mesh = parse_stl(ascii_stl).unwrap();
        assert_eq!(mesh.faces.len(), 1);
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.faces[0].vertices, [0, 1, 2]);
    }

    #[test]
    fn bad_coordinate_is_an_error() {
        let ascii_stl = b"solid t\nfacet normal 0 0 1\nouter loop\nvertex 0 zero 0\n";
        assert!(matches!(parse_stl(ascii_stl), Err(IoError::ParseFloat(_))));
    }

    #[test]
    fn load_nonexistent_file() {
        let result = load_stl("nonexistent_file_12345.stl");
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }
}
