#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-refine
//!
//! mesh-refine performs one step of uniform refinement on a hierarchical
//! triangular mesh: every 3-node element is split into four and every 2-node
//! condition into two, with exactly one new midpoint node per edge. The
//! result keeps the source's tree of named scopes, and every scope receives
//! the refined counterparts of its own members.
//!
//! ## Features
//! - Arena-backed [`MeshHierarchy`](topology::hierarchy::MeshHierarchy) with
//!   nested scopes that reference entities by id
//! - Parallel midpoint construction with one shared, lock-guarded registry
//! - Deterministic numbering: output ids do not depend on thread count
//! - MDPA reader/writer, legacy VTK export, coordinate scaling
//!
//! ## Determinism
//!
//! Midpoint ids are renumbered in ascending edge order once the parallel
//! pass finishes, and child ids follow parent order. Refining the same input
//! with 1 or 64 threads yields byte-identical output.
//!
//! ## Usage
//! ```no_run
//! use mesh_refine::prelude::*;
//!
//! let coarse = read_mesh("cavity.mdpa")?;
//! let refined = refine_hierarchy(&coarse, &RefineOptions::default())?;
//! write_mesh(&refined.mesh, "cavity_fine.mdpa")?;
//! # Ok::<(), MeshRefineError>(())
//! ```

pub mod algs;
pub mod debug_invariants;
pub mod io;
pub mod mesh_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::refine::{RefineOptions, RefineStage, RefinedMesh, refine_hierarchy};
    pub use crate::algs::transform::scale_coordinates;
    pub use crate::io::{MeshFormat, MeshReader, MeshWriter, read_mesh, write_mesh};
    pub use crate::mesh_error::MeshRefineError;
    pub use crate::topology::edge::EdgeKey;
    pub use crate::topology::entity::{Condition, ConnectedEntity, Element, EntityKind, Node};
    pub use crate::topology::hierarchy::{MeshHierarchy, ScopeId};
    pub use crate::topology::id::EntityId;
    pub use crate::topology::validation::{NonManifoldHandling, validate_hierarchy};
}
