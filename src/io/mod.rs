//! Mesh I/O for [`MeshHierarchy`].
//!
//! This module provides trait-based readers and writers plus a path-based
//! factory ([`MeshFormat::from_path`]) that picks a backend from the file
//! extension. Only the MDPA text format is built in; MED and HDF5 paths are
//! recognized but rejected.

pub mod mdpa;
pub mod vtk;

use crate::mesh_error::MeshRefineError;
use crate::topology::hierarchy::MeshHierarchy;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Trait for mesh readers that produce a scoped hierarchy.
pub trait MeshReader {
    /// Parse a hierarchy whose root scope is called `name`.
    fn read<R: Read>(&self, name: &str, reader: R) -> Result<MeshHierarchy, MeshRefineError>;
}

/// Trait for mesh writers that serialize a scoped hierarchy.
pub trait MeshWriter {
    fn write<W: Write>(&self, writer: W, mesh: &MeshHierarchy) -> Result<(), MeshRefineError>;
}

/// On-disk mesh formats known to the factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    Mdpa,
}

impl MeshFormat {
    /// Picks a format from the (case-insensitive) extension of `path`.
    ///
    /// # Errors
    /// [`MeshRefineError::UnsupportedFileFormat`] for a missing or unknown
    /// extension, and for `.med`/`.h5`/`.hdf5`, whose backends are not built.
    pub fn from_path(path: &Path) -> Result<Self, MeshRefineError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "mdpa" => Ok(MeshFormat::Mdpa),
            "med" | "h5" | "hdf5" => Err(MeshRefineError::UnsupportedFileFormat(format!(
                ".{ext} (backend not built)"
            ))),
            "" => Err(MeshRefineError::UnsupportedFileFormat(format!(
                "{} has no extension",
                path.display()
            ))),
            _ => Err(MeshRefineError::UnsupportedFileFormat(format!(".{ext}"))),
        }
    }
}

/// Root scope name for a mesh read from `path`: the file stem.
pub fn model_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string())
}

/// Reads a hierarchy from `path`, naming the root after the file stem.
pub fn read_mesh(path: impl AsRef<Path>) -> Result<MeshHierarchy, MeshRefineError> {
    let path = path.as_ref();
    let format = MeshFormat::from_path(path)?;
    let file = File::open(path)?;
    let mesh = match format {
        MeshFormat::Mdpa => mdpa::MdpaReader.read(&model_name(path), BufReader::new(file))?,
    };
    log::debug!(
        "read `{}` from {}: {} nodes, {} elements, {} conditions",
        mesh.name(),
        path.display(),
        mesh.node_count(),
        mesh.element_count(),
        mesh.condition_count()
    );
    Ok(mesh)
}

/// Appends `.mdpa` to a path given as a bare model name.
///
/// Paths that already carry an extension are returned unchanged, so the
/// format factory still rejects unknown ones.
pub fn with_default_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension("mdpa")
    }
}

/// Writes `mesh` to `path` in the format picked from its extension.
///
/// See [`write_mesh_with`] for the no-partial-file guarantee.
pub fn write_mesh(mesh: &MeshHierarchy, path: impl AsRef<Path>) -> Result<(), MeshRefineError> {
    let path = path.as_ref();
    match MeshFormat::from_path(path)? {
        MeshFormat::Mdpa => write_mesh_with(&mdpa::MdpaWriter, mesh, path),
    }
}

/// Writes `mesh` to `path` through `writer`.
///
/// The data goes to a temporary sibling that is renamed over `path` once
/// fully written. On any error the temporary is removed, so a failed write
/// never leaves a partial file behind.
pub fn write_mesh_with<M: MeshWriter>(
    writer: &M,
    mesh: &MeshHierarchy,
    path: &Path,
) -> Result<(), MeshRefineError> {
    let tmp = temp_sibling(path);
    let result = (|| {
        let mut out = BufWriter::new(File::create(&tmp)?);
        writer.write(&mut out, mesh)?;
        out.flush()?;
        Ok::<(), MeshRefineError>(())
    })();
    match result {
        Ok(()) => {
            fs::rename(&tmp, path)?;
            log::debug!("wrote `{}` to {}", mesh.name(), path.display());
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                log::warn!("could not remove {}: {cleanup}", tmp.display());
            }
            Err(e)
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(MeshFormat::from_path(Path::new("a/b.MDPA")), Ok(MeshFormat::Mdpa));
        assert_eq!(MeshFormat::from_path(Path::new("plate.mdpa")), Ok(MeshFormat::Mdpa));
    }

    #[test]
    fn unsupported_extensions_are_rejected() {
        for p in ["mesh.vtk", "mesh.h5", "mesh.MED", "mesh"] {
            let err = MeshFormat::from_path(Path::new(p)).unwrap_err();
            assert!(matches!(err, MeshRefineError::UnsupportedFileFormat(_)), "{p}");
        }
        let err = MeshFormat::from_path(Path::new("x.obj")).unwrap_err();
        assert_eq!(err, MeshRefineError::UnsupportedFileFormat(".obj".into()));
    }

    #[test]
    fn model_name_is_file_stem() {
        assert_eq!(model_name(Path::new("/tmp/cavity.mdpa")), "cavity");
    }

    #[test]
    fn bare_names_get_mdpa_extension() {
        assert_eq!(
            with_default_extension(Path::new("out/cavity")),
            PathBuf::from("out/cavity.mdpa")
        );
        assert_eq!(
            with_default_extension(Path::new("cavity.MDPA")),
            PathBuf::from("cavity.MDPA")
        );
        assert_eq!(with_default_extension(Path::new("mesh.stl")), PathBuf::from("mesh.stl"));
    }

    /// Emits a partial header, then fails.
    struct TruncatingWriter;

    impl MeshWriter for TruncatingWriter {
        fn write<W: Write>(&self, mut writer: W, _mesh: &MeshHierarchy) -> Result<(), MeshRefineError> {
            writeln!(writer, "Begin Nodes")?;
            writeln!(writer, "    1  0.0  0.0  0.0")?;
            writer.flush()?;
            Err(MeshRefineError::Io("disk full".into()))
        }
    }

    #[test]
    fn failing_writer_leaves_neither_target_nor_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.mdpa");
        let err = write_mesh_with(&TruncatingWriter, &MeshHierarchy::new("m"), &target)
            .unwrap_err();
        assert_eq!(err, MeshRefineError::Io("disk full".into()));
        assert!(!target.exists());
        assert!(!dir.path().join("out.mdpa.tmp").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failing_writer_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.mdpa");
        fs::write(&target, "previous").unwrap();
        write_mesh_with(&TruncatingWriter, &MeshHierarchy::new("m"), &target).unwrap_err();
        assert_eq!(fs::read_to_string(&target).unwrap(), "previous");
        assert!(!dir.path().join("out.mdpa.tmp").exists());
    }

    #[test]
    fn temp_file_sits_next_to_target() {
        assert_eq!(
            temp_sibling(Path::new("/out/fine.mdpa")),
            PathBuf::from("/out/fine.mdpa.tmp")
        );
    }
}
