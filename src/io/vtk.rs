//! Legacy VTK (`.vtk`) writer for hierarchy scopes.
//!
//! Each scope becomes one ASCII `UNSTRUCTURED_GRID` file. Points are the
//! scope's nodes plus any node its cells reference; cells are the scope's
//! elements, or its conditions when it has no elements. Original ids are
//! kept as `node_ids` point data and `element_ids`/`condition_ids` cell data.

use crate::io::MeshWriter;
use crate::mesh_error::MeshRefineError;
use crate::topology::entity::{Condition, ConnectedEntity, Element, EntityKind, Node};
use crate::topology::hierarchy::{MeshHierarchy, ScopeId};
use crate::topology::id::EntityId;
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes a single scope of a hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct VtkWriter {
    pub scope: ScopeId,
}

impl Default for VtkWriter {
    fn default() -> Self {
        Self {
            scope: ScopeId::ROOT,
        }
    }
}

impl VtkWriter {
    pub fn for_scope(scope: ScopeId) -> Self {
        Self { scope }
    }

    fn vtk_cell_type(node_count: usize) -> Option<u8> {
        match node_count {
            1 => Some(1), // vertex
            2 => Some(3), // line
            3 => Some(5), // triangle
            4 => Some(9), // quad
            _ => None,
        }
    }

    fn write_cells<E, W>(
        writer: &mut W,
        mesh: &MeshHierarchy,
        cells: &[&E],
        point_index: &HashMap<EntityId, usize>,
        ids_name: &str,
    ) -> Result<(), MeshRefineError>
    where
        E: ConnectedEntity,
        W: Write,
    {
        let total: usize = cells.iter().map(|c| c.nodes().len() + 1).sum();
        writeln!(writer, "CELLS {} {}", cells.len(), total)?;
        let mut types = Vec::with_capacity(cells.len());
        for cell in cells {
            let vtk_type = Self::vtk_cell_type(cell.nodes().len()).ok_or_else(|| {
                MeshRefineError::UnsupportedTopology {
                    kind: E::KIND,
                    id: cell.id(),
                    expected: E::NODE_COUNT,
                    found: cell.nodes().len(),
                }
            })?;
            types.push(vtk_type);
            write!(writer, "{}", cell.nodes().len())?;
            for n in cell.nodes() {
                let idx = point_index.get(n).ok_or_else(|| MeshRefineError::UnknownEntity {
                    kind: EntityKind::Node,
                    id: *n,
                    scope: mesh.name().to_string(),
                })?;
                write!(writer, " {idx}")?;
            }
            writeln!(writer)?;
        }

        writeln!(writer, "CELL_TYPES {}", types.len())?;
        for t in &types {
            writeln!(writer, "{t}")?;
        }

        if !cells.is_empty() {
            writeln!(writer, "CELL_DATA {}", cells.len())?;
            writeln!(writer, "SCALARS {ids_name} long 1")?;
            writeln!(writer, "LOOKUP_TABLE default")?;
            for cell in cells {
                writeln!(writer, "{}", cell.id().get())?;
            }
        }
        Ok(())
    }
}

impl MeshWriter for VtkWriter {
    fn write<W: Write>(&self, mut writer: W, mesh: &MeshHierarchy) -> Result<(), MeshRefineError> {
        let scope = self.scope;
        let elements: Vec<&Element> = mesh
            .ids::<Element>(scope)
            .map(|id| mesh.try_get::<Element>(id))
            .collect::<Result<_, _>>()?;
        let conditions: Vec<&Condition> = if elements.is_empty() {
            mesh.ids::<Condition>(scope)
                .map(|id| mesh.try_get::<Condition>(id))
                .collect::<Result<_, _>>()?
        } else {
            Vec::new()
        };

        let mut point_ids: BTreeSet<EntityId> = mesh.ids::<Node>(scope).collect();
        point_ids.extend(elements.iter().flat_map(|e| e.nodes.iter().copied()));
        point_ids.extend(conditions.iter().flat_map(|c| c.nodes.iter().copied()));
        let point_index: HashMap<EntityId, usize> =
            point_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        writeln!(writer, "# vtk DataFile Version 3.0")?;
        writeln!(writer, "{}", mesh.full_name(scope))?;
        writeln!(writer, "ASCII")?;
        writeln!(writer, "DATASET UNSTRUCTURED_GRID")?;
        writeln!(writer, "POINTS {} double", point_ids.len())?;
        for id in &point_ids {
            let [x, y, z] = mesh.try_get::<Node>(*id)?.coords;
            writeln!(writer, "{x} {y} {z}")?;
        }

        if elements.is_empty() {
            Self::write_cells(&mut writer, mesh, &conditions, &point_index, "condition_ids")?;
        } else {
            Self::write_cells(&mut writer, mesh, &elements, &point_index, "element_ids")?;
        }

        writeln!(writer, "POINT_DATA {}", point_ids.len())?;
        writeln!(writer, "SCALARS node_ids long 1")?;
        writeln!(writer, "LOOKUP_TABLE default")?;
        for id in &point_ids {
            writeln!(writer, "{}", id.get())?;
        }
        Ok(())
    }
}

/// Writes one `.vtk` file per scope into `out_dir/<root name>/`.
///
/// Files are named after the scope's dotted full name. Returns the written
/// paths in scope pre-order.
pub fn write_scope_files(
    mesh: &MeshHierarchy,
    out_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, MeshRefineError> {
    let dir = out_dir.as_ref().join(mesh.name());
    fs::create_dir_all(&dir)?;
    let mut written = Vec::with_capacity(mesh.scope_count());
    for scope in mesh.scopes_preorder() {
        let path = dir.join(format!("{}.vtk", mesh.full_name(scope)));
        let mut out = BufWriter::new(File::create(&path)?);
        VtkWriter::for_scope(scope).write(&mut out, mesh)?;
        out.flush()?;
        log::debug!("wrote scope `{}` to {}", mesh.full_name(scope), path.display());
        written.push(path);
    }
    Ok(written)
}
