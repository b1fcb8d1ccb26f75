//! Hierarchical placement of nodes and refined children into a replicated scope tree.
//!
//! The destination tree must already mirror the source (see
//! [`replicate_structure`](crate::algs::replicate::replicate_structure)).
//! Placement runs single-threaded after the parallel passes have drained.
//! Entities are moved into the destination arena at the root and referenced
//! by id in every sub-scope.

use crate::algs::midpoint::MidpointTable;
use crate::algs::scope_zip::zip_scopes;
use crate::mesh_error::MeshRefineError;
use crate::topology::entity::{ConnectedEntity, Node};
use crate::topology::hierarchy::{MeshHierarchy, ScopeId, ScopedEntity};
use crate::topology::id::EntityId;
use std::collections::HashMap;

/// Refined children keyed by the id of the source entity they replace.
pub type ChildMap<E> = HashMap<EntityId, Vec<E>>;

/// Places original nodes and midpoints into every destination scope.
///
/// A scope receives its source nodes plus every midpoint whose two edge
/// endpoints are both members of the corresponding source scope.
pub fn distribute_existing_nodes(
    dst: &mut MeshHierarchy,
    src: &MeshHierarchy,
    midpoints: &MidpointTable,
) -> Result<(), MeshRefineError> {
    zip_scopes(dst, src, |dst, d, src, s| {
        let inner = midpoints.iter().filter_map(|(edge, node)| {
            (src.contains::<Node>(s, edge.lo()) && src.contains::<Node>(s, edge.hi()))
                .then_some(node)
        });

        if d == ScopeId::ROOT {
            for id in src.ids::<Node>(s) {
                dst.insert_node(*src.try_get::<Node>(id)?)?;
            }
            for node in inner {
                dst.insert_node(*node)?;
            }
        } else {
            let ids: Vec<EntityId> = src.ids::<Node>(s).chain(inner.map(|n| n.id)).collect();
            dst.add_to_scope::<Node, _>(d, ids)?;
        }
        log::trace!(
            "scope `{}`: {} nodes placed",
            dst.full_name(d),
            dst.count::<Node>(d)
        );
        Ok(())
    })
}

/// Places refined children into every destination scope, mirroring source membership.
///
/// For each entity a source scope holds, its children are looked up in
/// `children` and added, in their refinement order, to the matching
/// destination scope.
///
/// # Errors
/// [`MeshRefineError::MissingChildMapping`] if a scope references an entity
/// the root-level refinement did not produce children for.
pub fn distribute_children<E>(
    dst: &mut MeshHierarchy,
    src: &MeshHierarchy,
    children: &ChildMap<E>,
) -> Result<(), MeshRefineError>
where
    E: ConnectedEntity + ScopedEntity,
{
    zip_scopes(dst, src, |dst, d, src, s| {
        let mut placed: Vec<&E> = Vec::new();
        for parent in src.ids::<E>(s) {
            let kids = children
                .get(&parent)
                .ok_or_else(|| MeshRefineError::MissingChildMapping {
                    kind: <E as ConnectedEntity>::KIND,
                    scope: src.full_name(s),
                    id: parent,
                })?;
            placed.extend(kids);
        }
        log::trace!(
            "scope `{}`: placing {} {}s",
            dst.full_name(d),
            placed.len(),
            <E as ConnectedEntity>::KIND
        );

        if d == ScopeId::ROOT {
            for child in placed {
                child.clone().insert_into(dst)?;
            }
            Ok(())
        } else {
            dst.add_to_scope::<E, _>(d, placed.iter().map(|c| ConnectedEntity::id(*c)))
        }
    })
}
