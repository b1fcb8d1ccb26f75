//! MeshRefineError: Unified error type for mesh-refine public APIs
//!
//! Every fallible operation in the crate returns this type. All variants are
//! fatal for a refinement run; they carry enough context (entity kind, id,
//! expected vs. found) to diagnose the input without re-running.

use crate::topology::edge::EdgeKey;
use crate::topology::entity::EntityKind;
use crate::topology::id::EntityId;
use thiserror::Error;

/// Unified error type for mesh-refine operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshRefineError {
    /// Attempted to construct an [`EntityId`] from zero.
    #[error("EntityId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidEntityId,
    /// The identifier space of an entity kind is exhausted.
    #[error("identifier overflow while allocating a new {kind} id")]
    IdOverflow { kind: EntityKind },
    /// An element does not have 3 nodes, or a condition does not have 2.
    #[error("unsupported topology: {kind} {id} has {found} nodes, expected {expected}")]
    UnsupportedTopology {
        kind: EntityKind,
        id: EntityId,
        expected: usize,
        found: usize,
    },
    /// A scope references an entity that the root-level refinement never produced children for.
    #[error(
        "{kind} {id} referenced by scope `{scope}` has no refined children; \
         make sure this id is present in the root scope"
    )]
    MissingChildMapping {
        kind: EntityKind,
        scope: String,
        id: EntityId,
    },
    /// The file extension does not map to any mesh backend.
    #[error("unsupported mesh file format: `{0}`")]
    UnsupportedFileFormat(String),
    /// A child scope with this name already exists under `parent`.
    #[error("scope `{parent}` already has a child scope named `{name}`")]
    DuplicateScope { parent: String, name: String },
    /// No child scope with this name exists under `parent`.
    #[error("scope `{parent}` has no child scope named `{name}`")]
    MissingScope { parent: String, name: String },
    /// The owning arena already holds an entity with this id.
    #[error("duplicate {kind} id {id}")]
    DuplicateEntity { kind: EntityKind, id: EntityId },
    /// An entity is referenced where it is not reachable (arena or parent scope).
    #[error("{kind} {id} is not present in scope `{scope}`")]
    UnknownEntity {
        kind: EntityKind,
        id: EntityId,
        scope: String,
    },
    /// Refinement looked up an edge that was never registered.
    #[error("no midpoint registered for edge {a}-{b}")]
    MissingMidpoint { a: EntityId, b: EntityId },
    /// An edge is shared by more than two elements.
    #[error("non-manifold edge {edge}: {incident} incident elements")]
    NonManifoldEdge { edge: EdgeKey, incident: usize },
    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
    /// Malformed mesh file content.
    #[error("mesh parse error at line {line}: {message}")]
    MeshIoParse { line: usize, message: String },
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MeshRefineError {
    fn from(err: std::io::Error) -> Self {
        MeshRefineError::Io(err.to_string())
    }
}
