//! Hierarchy validation helpers.

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshRefineError;
use crate::topology::entity::{Condition, ConnectedEntity, Element, EntityKind, Node};
use crate::topology::hierarchy::{MeshHierarchy, ScopeId, ScopedEntity};

/// Behavior for non-manifold edge detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonManifoldHandling {
    /// Skip non-manifold detection.
    Ignore,
    /// Log a warning on non-manifold edges.
    #[default]
    Warn,
    /// Return an error on the first non-manifold edge.
    Error,
}

/// Validate the structural invariants of a hierarchy.
///
/// Checks that every sub-scope member is also a member of its parent scope,
/// that root membership equals arena ownership, and that every node referenced
/// by an element or condition is owned by the hierarchy.
pub fn validate_hierarchy(mesh: &MeshHierarchy) -> Result<(), MeshRefineError> {
    check_root_mirrors_arena::<Node>(mesh)?;
    check_root_mirrors_arena::<Element>(mesh)?;
    check_root_mirrors_arena::<Condition>(mesh)?;

    check_node_references::<Element>(mesh)?;
    check_node_references::<Condition>(mesh)?;

    for scope in mesh.scopes_preorder() {
        let Some(parent) = mesh.parent(scope) else {
            continue;
        };
        check_lineage::<Node>(mesh, scope, parent)?;
        check_lineage::<Element>(mesh, scope, parent)?;
        check_lineage::<Condition>(mesh, scope, parent)?;
    }
    Ok(())
}

fn check_root_mirrors_arena<E: ScopedEntity>(mesh: &MeshHierarchy) -> Result<(), MeshRefineError> {
    for id in mesh.ids::<E>(ScopeId::ROOT) {
        if mesh.get::<E>(id).is_none() {
            return Err(MeshRefineError::UnknownEntity {
                kind: E::KIND,
                id,
                scope: mesh.name().to_string(),
            });
        }
    }
    Ok(())
}

fn check_node_references<E>(mesh: &MeshHierarchy) -> Result<(), MeshRefineError>
where
    E: ConnectedEntity + ScopedEntity,
{
    for entity in mesh.entities::<E>() {
        for node in entity.nodes() {
            if mesh.node(*node).is_none() {
                return Err(MeshRefineError::UnknownEntity {
                    kind: EntityKind::Node,
                    id: *node,
                    scope: mesh.name().to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_lineage<E: ScopedEntity>(
    mesh: &MeshHierarchy,
    scope: ScopeId,
    parent: ScopeId,
) -> Result<(), MeshRefineError> {
    if let Some(id) = mesh
        .ids::<E>(scope)
        .find(|id| !mesh.contains::<E>(parent, *id))
    {
        return Err(MeshRefineError::UnknownEntity {
            kind: E::KIND,
            id,
            scope: mesh.full_name(parent),
        });
    }
    Ok(())
}

impl DebugInvariants for MeshHierarchy {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(validate_hierarchy(self), "MeshHierarchy");
    }

    fn validate_invariants(&self) -> Result<(), MeshRefineError> {
        validate_hierarchy(self)
    }
}
