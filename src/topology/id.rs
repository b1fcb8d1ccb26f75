//! `EntityId`: a strong, zero-cost identifier for nodes, elements and conditions
//!
//! Mesh files number their entities from 1, so `EntityId` wraps a nonzero
//! `u64` and reserves 0 as an invalid value. Identifiers are unique per
//! entity kind within one [`MeshHierarchy`](crate::topology::hierarchy::MeshHierarchy).

use crate::mesh_error::MeshRefineError;
use std::{fmt, num::NonZeroU64};

/// Identifier of a node, element or condition.
///
/// # Memory layout
/// This type is `repr(transparent)`, so it has the same size and alignment
/// as a `u64` and `Option<EntityId>` costs nothing extra.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct EntityId(NonZeroU64);

impl EntityId {
    /// Creates a new `EntityId` from a raw `u64` value.
    ///
    /// # Errors
    /// Returns [`MeshRefineError::InvalidEntityId`] if `raw == 0`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use mesh_refine::topology::id::EntityId;
    /// let id = EntityId::new(1).unwrap();
    /// assert_eq!(id.get(), 1);
    /// ```
    #[inline]
    pub fn new(raw: u64) -> Result<Self, MeshRefineError> {
        NonZeroU64::new(raw)
            .map(EntityId)
            .ok_or(MeshRefineError::InvalidEntityId)
    }

    /// Returns the inner `u64` value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

/// Property-set reference carried by elements and conditions.
///
/// Property ids may be 0 in mesh files, so this is a plain integer.
pub type PropertyId = u64;

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityId").field(&self.get()).finish()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}
