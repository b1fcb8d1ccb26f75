//! Refinement algorithms over a [`MeshHierarchy`](crate::topology::hierarchy::MeshHierarchy).

pub mod distribute;
pub mod ids;
pub mod midpoint;
pub mod refine;
pub mod replicate;
pub mod scope_zip;
pub mod transform;

pub use refine::{RefineOptions, RefineStage, RefinedMesh, refine_hierarchy};
pub use transform::scale_coordinates;
