//! Lock-step traversal of two isomorphic scope trees.
//!
//! Source and destination scopes are paired by name, starting from the two
//! roots. Every per-scope pass of the refinement (node placement, child
//! placement) runs through [`zip_scopes`], so the trees cannot drift apart
//! between passes.

use crate::mesh_error::MeshRefineError;
use crate::topology::hierarchy::{MeshHierarchy, ScopeId};

/// Pairs every source scope with the identically named destination scope.
///
/// Pairs are returned in pre-order: a parent pair always precedes its
/// children, siblings follow the source's insertion order.
///
/// # Errors
/// [`MeshRefineError::MissingScope`] if the destination lacks a scope the source has.
pub fn scope_pairs(
    dst: &MeshHierarchy,
    src: &MeshHierarchy,
) -> Result<Vec<(ScopeId, ScopeId)>, MeshRefineError> {
    let mut pairs = Vec::with_capacity(src.scope_count());
    let mut stack = vec![(ScopeId::ROOT, ScopeId::ROOT)];
    while let Some((d, s)) = stack.pop() {
        pairs.push((d, s));
        for child in src.children(s).iter().rev() {
            let d_child = dst.try_child(d, src.scope_name(*child))?;
            stack.push((d_child, *child));
        }
    }
    Ok(pairs)
}

/// Calls `visit(dst, dst_scope, src, src_scope)` for every matched pair, parents first.
///
/// The pairing is computed before the first visit, so `visit` may mutate
/// destination membership but must not add scopes.
pub fn zip_scopes<F>(
    dst: &mut MeshHierarchy,
    src: &MeshHierarchy,
    mut visit: F,
) -> Result<(), MeshRefineError>
where
    F: FnMut(&mut MeshHierarchy, ScopeId, &MeshHierarchy, ScopeId) -> Result<(), MeshRefineError>,
{
    for (d, s) in scope_pairs(dst, src)? {
        visit(dst, d, src, s)?;
    }
    Ok(())
}
