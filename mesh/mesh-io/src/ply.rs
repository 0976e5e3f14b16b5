//! PLY (Polygon File Format) support.
//!
//! Reading goes through `ply-rs` and accepts ASCII and both binary
//! encodings. Writing produces the layout a volume mesher expects:
//!
//! ```text
//! element vertex N   x y z (double), nx ny nz (float)
//! element face M     vertex_indices (uchar count, int index), nx ny nz (float)
//! ```
//!
//! # Supported Properties
//!
//! - Vertex positions (x, y, z) - required
//! - Vertex normals (nx, ny, nz) - optional
//! - Face vertex indices (`vertex_indices` or `vertex_index`) - required for meshes
//!
//! # Example
//!
//! ```no_run
//! use mesh_io::{load_ply, save_ply};
//!
//! let mesh = load_ply("model.ply").unwrap();
//! save_ply(&mesh, "output.ply", true).unwrap(); // Binary
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use mesh_types::{Point3, TriMesh, Vector3};
use ply_rs::parser::Parser;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;
use tracing::debug;

use crate::error::{IoError, IoResult};
use crate::{compacted, validate_indices};

/// Load a mesh from a PLY file.
///
/// Polygonal faces are fan-triangulated. Vertex normals are kept when all
/// three components are present.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The file is not valid PLY format
/// - A vertex lacks a coordinate or a face references a missing vertex
///
/// # Example
///
/// ```no_run
/// use mesh_io::load_ply;
///
/// let mesh = load_ply("model.ply").unwrap();
/// println!("Loaded {} vertices, {} faces", mesh.vertices.len(), mesh.faces.len());
/// ```
pub fn load_ply<P: AsRef<Path>>(path: P) -> IoResult<TriMesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IoError::from_open(e, path))?;
    let mut reader = BufReader::new(file);

    // Use generic DefaultElement parser - works for all element types
    let parser = Parser::<DefaultElement>::new();

    let header = parser
        .read_header(&mut reader)
        .map_err(|e| IoError::invalid_content(format!("failed to parse PLY header: {e}")))?;
    let payload = parser
        .read_payload(&mut reader, &header)
        .map_err(|e| IoError::invalid_content(format!("failed to read PLY payload: {e}")))?;

    let mut mesh = TriMesh::new();

    if let Some(vertex_elements) = payload.get("vertex") {
        mesh.vertices.reserve(vertex_elements.len());
        for (i, element) in vertex_elements.iter().enumerate() {
            let coord = |key: &str| {
                scalar(element, key).ok_or_else(|| {
                    IoError::invalid_content(format!("vertex {i} has no usable '{key}'"))
                })
            };
            let v = mesh.add_vertex(Point3::new(coord("x")?, coord("y")?, coord("z")?));

            if let (Some(nx), Some(ny), Some(nz)) = (
                scalar(element, "nx"),
                scalar(element, "ny"),
                scalar(element, "nz"),
            ) {
                mesh.vertices[v as usize].normal = Vector3::new(nx, ny, nz);
            }
        }
    }

    if let Some(face_elements) = payload.get("face") {
        mesh.faces.reserve(face_elements.len());
        for element in face_elements {
            let indices = index_list(element)?;
            if indices.len() >= 3 {
                for k in 1..indices.len() - 1 {
                    mesh.add_face([indices[0], indices[k], indices[k + 1]]);
                }
            }
        }
    }

    debug!(
        vertices = mesh.vertices.len(),
        faces = mesh.faces.len(),
        encoding = ?header.encoding,
        "read PLY"
    );
    validate_indices(&mesh)?;
    Ok(mesh)
}

/// Extract a numeric scalar property as `f64`.
fn scalar(element: &DefaultElement, key: &str) -> Option<f64> {
    Some(match element.get(key)? {
        Property::Float(v) => f64::from(*v),
        Property::Double(v) => *v,
        Property::Char(v) => f64::from(*v),
        Property::UChar(v) => f64::from(*v),
        Property::Short(v) => f64::from(*v),
        Property::UShort(v) => f64::from(*v),
        Property::Int(v) => f64::from(*v),
        Property::UInt(v) => f64::from(*v),
        _ => return None,
    })
}

/// Extract the vertex index list from a face element.
fn index_list(element: &DefaultElement) -> IoResult<Vec<u32>> {
    let negative = || IoError::invalid_content("negative vertex index in PLY face");

    for key in ["vertex_indices", "vertex_index"] {
        let Some(prop) = element.get(key) else {
            continue;
        };
        return match prop {
            Property::ListInt(v) => v
                .iter()
                .map(|&i| u32::try_from(i).map_err(|_| negative()))
                .collect(),
            Property::ListUInt(v) => Ok(v.clone()),
            Property::ListUChar(v) => Ok(v.iter().map(|&i| u32::from(i)).collect()),
            Property::ListChar(v) => v
                .iter()
                .map(|&i| u32::try_from(i).map_err(|_| negative()))
                .collect(),
            Property::ListShort(v) => v
                .iter()
                .map(|&i| u32::try_from(i).map_err(|_| negative()))
                .collect(),
            Property::ListUShort(v) => Ok(v.iter().map(|&i| u32::from(i)).collect()),
            _ => Err(IoError::invalid_content(format!(
                "PLY face property '{key}' is not an integer list"
            ))),
        };
    }
    Ok(Vec::new())
}

/// Save a mesh to a PLY file with vertex and face normals.
///
/// Deleted elements are dropped and indices renumbered. Normals are written
/// as stored, so recompute them first if the geometry changed.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
///
/// # Example
///
/// ```no_run
/// use mesh_io::{load_ply, save_ply};
///
/// let mesh = load_ply("input.ply").unwrap();
/// save_ply(&mesh, "output.ply", true).unwrap(); // Binary
/// save_ply(&mesh, "output_ascii.ply", false).unwrap(); // ASCII
/// ```
pub fn save_ply<P: AsRef<Path>>(mesh: &TriMesh, path: P, binary: bool) -> IoResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mesh = compacted(mesh);

    if binary {
        write_ply_binary(&mesh, &mut writer)?;
    } else {
        write_ply_ascii(&mesh, &mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write binary little-endian PLY.
///
/// Note: We implement this manually because ply-rs has a bug with binary list
/// property writing where it uses element count instead of list length.
fn write_ply_binary<W: Write>(mesh: &TriMesh, writer: &mut W) -> IoResult<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "comment written by mesh-io")?;
    writeln!(writer, "element vertex {}", mesh.vertices.len())?;
    for name in ["x", "y", "z"] {
        writeln!(writer, "property double {name}")?;
    }
    for name in ["nx", "ny", "nz"] {
        writeln!(writer, "property float {name}")?;
    }
    writeln!(writer, "element face {}", mesh.faces.len())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    for name in ["nx", "ny", "nz"] {
        writeln!(writer, "property float {name}")?;
    }
    writeln!(writer, "end_header")?;

    for v in &mesh.vertices {
        for c in v.position.iter() {
            writer.write_all(&c.to_le_bytes())?;
        }
        write_normal(writer, &v.normal)?;
    }

    for face in &mesh.faces {
        writer.write_all(&[3u8])?;
        for &i in &face.vertices {
            let i = i32::try_from(i)
                .map_err(|_| IoError::invalid_content("vertex index exceeds PLY int range"))?;
            writer.write_all(&i.to_le_bytes())?;
        }
        write_normal(writer, &face.normal)?;
    }

    Ok(())
}

fn write_normal<W: Write>(writer: &mut W, n: &Vector3<f64>) -> IoResult<()> {
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: normals are stored as float in the output layout
    let coords = [n.x as f32, n.y as f32, n.z as f32];
    for c in coords {
        writer.write_all(&c.to_le_bytes())?;
    }
    Ok(())
}

/// Write ASCII PLY using ply-rs.
fn write_ply_ascii<W: Write>(mesh: &TriMesh, writer: &mut W) -> IoResult<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;
    ply.header.comments.push("written by mesh-io".to_string());

    let scalar_def =
        |name: &str, ty: ScalarType| PropertyDef::new(name.to_string(), PropertyType::Scalar(ty));

    let mut vertex_def = ElementDef::new("vertex".to_string());
    for name in ["x", "y", "z"] {
        vertex_def.properties.add(scalar_def(name, ScalarType::Double));
    }
    for name in ["nx", "ny", "nz"] {
        vertex_def.properties.add(scalar_def(name, ScalarType::Float));
    }
    vertex_def.count = mesh.vertices.len();
    ply.header.elements.add(vertex_def);

    let mut face_def = ElementDef::new("face".to_string());
    face_def.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(ScalarType::UChar, ScalarType::Int),
    ));
    for name in ["nx", "ny", "nz"] {
        face_def.properties.add(scalar_def(name, ScalarType::Float));
    }
    face_def.count = mesh.faces.len();
    ply.header.elements.add(face_def);

    let vertex_elements = mesh
        .vertices
        .iter()
        .map(|v| {
            let mut element = DefaultElement::new();
            element.insert("x".to_string(), Property::Double(v.position.x));
            element.insert("y".to_string(), Property::Double(v.position.y));
            element.insert("z".to_string(), Property::Double(v.position.z));
            insert_normal(&mut element, &v.normal);
            element
        })
        .collect();
    ply.payload.insert("vertex".to_string(), vertex_elements);

    let face_elements = mesh
        .faces
        .iter()
        .map(|face| {
            let indices = face
                .vertices
                .iter()
                .map(|&i| i32::try_from(i))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| IoError::invalid_content("vertex index exceeds PLY int range"))?;
            let mut element = DefaultElement::new();
            element.insert("vertex_indices".to_string(), Property::ListInt(indices));
            insert_normal(&mut element, &face.normal);
            Ok(element)
        })
        .collect::<IoResult<Vec<_>>>()?;
    ply.payload.insert("face".to_string(), face_elements);

    Writer::new()
        .write_ply(writer, &mut ply)
        .map_err(|e| IoError::invalid_content(format!("failed to write PLY: {e}")))?;
    Ok(())
}

fn insert_normal(element: &mut DefaultElement, n: &Vector3<f64>) {
    #[allow(clippy::cast_possible_truncation)]
    // Truncation: normals are stored as float in the output layout
    let coords = [n.x as f32, n.y as f32, n.z as f32];
    for (name, c) in ["nx", "ny", "nz"].into_iter().zip(coords) {
        element.insert(name.to_string(), Property::Float(c));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use mesh_types::unit_cube;

    fn cube_with_normals() -> TriMesh {
        let mut cube = unit_cube();
        cube.update_face_normals();
        cube.update_vertex_normals();
        cube
    }

    fn roundtrip(mesh: &TriMesh, binary: bool) -> TriMesh {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.ply");
        save_ply(mesh, &path, binary).unwrap();
        load_ply(&path).unwrap()
    }

    #[test]
    fn binary_roundtrip_is_exact() {
        let cube = cube_with_normals();
        let loaded = roundtrip(&cube, true);

        assert_eq!(loaded.vertices.len(), 8);
        assert_eq!(loaded.faces.len(), 12);
        for (a, b) in cube.vertices.iter().zip(&loaded.vertices) {
            assert_eq!(a.position, b.position);
            assert!((a.normal - b.normal).norm() < 1e-6);
        }
        for (a, b) in cube.faces.iter().zip(&loaded.faces) {
            assert_eq!(a.vertices, b.vertices);
        }
    }

    #[test]
    fn ascii_roundtrip() {
        let cube = cube_with_normals();
        let loaded = roundtrip(&cube, false);

        assert_eq!(loaded.faces.len(), 12);
        assert!((loaded.signed_volume() - 1.0).abs() < 1e-12);
        assert!((loaded.vertices[6].normal.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn binary_header_lists_normals() {
        let mut out = Vec::new();
        write_ply_binary(&cube_with_normals(), &mut out).unwrap();
        let header_end = out.windows(10).position(|w| w == b"end_header").unwrap();
        let header = std::str::from_utf8(&out[..header_end]).unwrap();

        assert!(header.contains("element vertex 8"));
        assert!(header.contains("element face 12"));
        assert_eq!(header.matches("property float nx").count(), 2);
    }

    #[test]
    fn quads_are_fanned_and_bad_indices_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let quad = dir.path().join("quad.ply");
        std::fs::write(
            &quad,
            "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\n\
             property float z\nelement face 1\nproperty list uchar int vertex_indices\n\
             end_header\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n",
        )
        .unwrap();
        let mesh = load_ply(&quad).unwrap();
        assert_eq!(mesh.faces.len(), 2);
        assert_eq!(mesh.faces[1].vertices, [0, 2, 3]);

        let bad = dir.path().join("bad.ply");
        std::fs::write(
            &bad,
            "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\n\
             property float z\nelement face 1\nproperty list uchar int vertex_indices\n\
             end_header\n0 0 0\n1 0 0\n1 1 0\n3 0 1 9\n",
        )
        .unwrap();
        assert!(matches!(load_ply(&bad), Err(IoError::InvalidContent { .. })));
    }

    #[test]
    fn load_nonexistent_file() {
        let result = load_ply("nonexistent_file_12345.ply");
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }
}
