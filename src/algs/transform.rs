//! Coordinate transforms that leave topology unchanged.

use crate::topology::hierarchy::MeshHierarchy;
use rayon::prelude::*;

/// Multiplies every node coordinate of `mesh` by `factor`.
///
/// Ids, connectivity and scope membership are untouched. Nodes are owned by
/// the root arena, so each coordinate is scaled exactly once regardless of
/// how many scopes reference it.
pub fn scale_coordinates(mesh: &mut MeshHierarchy, factor: f64) {
    mesh.par_node_coords_mut().for_each(|xyz| {
        for c in xyz.iter_mut() {
            *c *= factor;
        }
    });
    log::debug!("scaled {} nodes of `{}` by {factor}", mesh.node_count(), mesh.name());
}
