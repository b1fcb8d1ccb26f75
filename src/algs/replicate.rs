//! Scope structure replication.

use crate::mesh_error::MeshRefineError;
use crate::topology::hierarchy::{MeshHierarchy, ScopeId};

/// Builds an empty hierarchy with the same root name and scope tree as `src`.
///
/// No entities are copied.
pub fn replicate_structure(src: &MeshHierarchy) -> Result<MeshHierarchy, MeshRefineError> {
    let mut dst = MeshHierarchy::new(src.name());
    replicate_children(&mut dst, ScopeId::ROOT, src, ScopeId::ROOT)?;
    Ok(dst)
}

/// Recreates every child scope of `src_scope` under `dst_scope`, recursively.
///
/// # Errors
/// [`MeshRefineError::DuplicateScope`] if `dst_scope` already has a child of
/// the same name; scopes are never merged.
pub fn replicate_children(
    dst: &mut MeshHierarchy,
    dst_scope: ScopeId,
    src: &MeshHierarchy,
    src_scope: ScopeId,
) -> Result<(), MeshRefineError> {
    for child in src.children(src_scope) {
        let created = dst.create_scope(dst_scope, src.scope_name(*child))?;
        replicate_children(dst, created, src, *child)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::entity::Node;
    use crate::topology::id::EntityId;

    #[test]
    fn structure_is_copied_without_entities() {
        let mut src = MeshHierarchy::new("plate");
        src.insert_node(Node::new(EntityId::new(1).unwrap(), [0.0; 3]))
            .unwrap();
        let skin = src.create_scope(ScopeId::ROOT, "skin").unwrap();
        src.create_scope(skin, "left").unwrap();
        src.create_scope(skin, "right").unwrap();
        src.create_scope(ScopeId::ROOT, "body").unwrap();

        let dst = replicate_structure(&src).unwrap();
        assert_eq!(dst.name(), "plate");
        assert_eq!(dst.scope_count(), src.scope_count());
        assert_eq!(dst.node_count(), 0);
        let dst_skin = dst.child(ScopeId::ROOT, "skin").unwrap();
        assert_eq!(dst.child_names(dst_skin).collect::<Vec<_>>(), vec!["left", "right"]);
        assert_eq!(
            dst.child_names(ScopeId::ROOT).collect::<Vec<_>>(),
            vec!["skin", "body"]
        );
    }

    #[test]
    fn replicating_twice_into_same_root_fails() {
        let mut src = MeshHierarchy::new("m");
        src.create_scope(ScopeId::ROOT, "skin").unwrap();
        let mut dst = replicate_structure(&src).unwrap();
        let err = replicate_children(&mut dst, ScopeId::ROOT, &src, ScopeId::ROOT).unwrap_err();
        assert!(matches!(err, MeshRefineError::DuplicateScope { .. }));
    }
}
