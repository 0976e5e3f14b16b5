//! Mesh file I/O for the repair pipeline.
//!
//! This crate loads and saves [`TriMesh`] in common formats:
//!
//! - **STL** (Stereolithography) - Binary and ASCII
//! - **OBJ** (Wavefront) - ASCII only
//! - **PLY** (Polygon File Format) - Binary and ASCII, with normals
//!
//! Loaders fan-triangulate polygons and reject faces that reference a
//! missing vertex. Savers skip deleted elements and renumber indices, so a
//! mesh can be written straight after a repair pass.
//!
//! # Example
//!
//! ```no_run
//! use mesh_io::{load_stl, save_stl};
//!
//! // Load a mesh
//! let mesh = load_stl("model.stl").unwrap();
//!
//! // Save it back
//! save_stl(&mesh, "output.stl", false).unwrap();
//! ```
//!
//! # Format Detection
//!
//! The format is picked from the file extension:
//!
//! ```no_run
//! use mesh_io::{load_mesh, save_mesh};
//!
//! // Format detected from .stl extension
//! let mesh = load_mesh("model.stl").unwrap();
//!
//! // Save to a different format
//! save_mesh(&mesh, "model.ply").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod obj;
mod ply;
mod stl;

pub use error::{IoError, IoResult};
pub use obj::{load_obj, save_obj};
pub use ply::{load_ply, save_ply};
pub use stl::{load_stl, save_stl};

use std::borrow::Cow;
use std::path::Path;

use mesh_types::TriMesh;
use tracing::debug;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// STL (Stereolithography) format.
    /// Supports binary and ASCII variants.
    Stl,
    /// OBJ (Wavefront) format.
    /// ASCII only, supports vertices, normals and faces.
    Obj,
    /// PLY (Polygon File Format).
    /// Supports binary and ASCII variants.
    Ply,
}

impl MeshFormat {
    /// Detect format from file extension.
    ///
    /// # Returns
    ///
    /// The detected format, or `None` if the extension is not recognized.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "stl" => Some(Self::Stl),
            "obj" => Some(Self::Obj),
            "ply" => Some(Self::Ply),
            _ => None,
        }
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Stl => "stl",
            Self::Obj => "obj",
            Self::Ply => "ply",
        }
    }

    /// Whether the format has a binary encoding.
    #[must_use]
    pub const fn supports_binary(&self) -> bool {
        matches!(self, Self::Stl | Self::Ply)
    }
}

fn format_of(path: &Path) -> IoResult<MeshFormat> {
    MeshFormat::from_path(path).ok_or_else(|| IoError::UnknownFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh from a file, detecting format from extension.
///
/// # Errors
///
/// Returns an error if:
/// - The file format cannot be determined from the extension
/// - The file cannot be read
/// - The file content is invalid for the detected format
///
/// # Example
///
/// ```no_run
/// use mesh_io::load_mesh;
///
/// let mesh = load_mesh("model.stl").unwrap();
/// ```
pub fn load_mesh<P: AsRef<Path>>(path: P) -> IoResult<TriMesh> {
    let path = path.as_ref();
    let format = format_of(path)?;
    debug!(path = %path.display(), ?format, "loading mesh");

    match format {
        MeshFormat::Stl => load_stl(path),
        MeshFormat::Obj => load_obj(path),
        MeshFormat::Ply => load_ply(path),
    }
}

/// Save a mesh to a file, detecting format from extension.
///
/// STL and PLY are written in binary.
///
/// # Errors
///
/// Returns an error if:
/// - The file format cannot be determined from the extension
/// - The file cannot be written
///
/// # Example
///
/// ```no_run
/// use mesh_io::{save_mesh, load_mesh};
///
/// let mesh = load_mesh("input.stl").unwrap();
/// save_mesh(&mesh, "output.obj").unwrap();
/// ```
pub fn save_mesh<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> IoResult<()> {
    save_mesh_with(mesh, path, true)
}

/// Save a mesh to a file, choosing between binary and ASCII encoding.
///
/// `binary` is ignored for OBJ, which is always text.
///
/// # Errors
///
/// Returns an error if the format cannot be determined from the extension
/// or the file cannot be written.
pub fn save_mesh_with<P: AsRef<Path>>(mesh: &TriMesh, path: P, binary: bool) -> IoResult<()> {
    let path = path.as_ref();
    let format = format_of(path)?;
    debug!(path = %path.display(), ?format, binary, "saving mesh");

    match format {
        MeshFormat::Stl => save_stl(mesh, path, binary),
        MeshFormat::Obj => save_obj(mesh, path),
        MeshFormat::Ply => save_ply(mesh, path, binary),
    }
}

/// The mesh without deleted elements, cloning only when something is deleted.
pub(crate) fn compacted(mesh: &TriMesh) -> Cow<'_, TriMesh> {
    let has_deleted = mesh.vertices.iter().any(|v| v.is_deleted())
        || mesh.faces.iter().any(|f| f.is_deleted());
    if has_deleted {
        let mut owned = mesh.clone();
        owned.compact();
        Cow::Owned(owned)
    } else {
        Cow::Borrowed(mesh)
    }
}

/// Reject meshes whose faces point past the vertex array.
pub(crate) fn validate_indices(mesh: &TriMesh) -> IoResult<()> {
    match mesh.first_invalid_index() {
        Some((face, index)) => Err(IoError::invalid_content(format!(
            "face {face} references vertex {index}, but only {} vertices exist",
            mesh.vertices.len()
        ))),
        None => Ok(()),
    }
}
