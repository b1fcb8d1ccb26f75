//! Identifier allocation for newly created entities.
//!
//! The seed is found with a parallel max-reduction over the existing ids;
//! allocation itself takes `&mut self`, so concurrent callers must serialize
//! through a lock (see [`MidpointRegistry`](crate::algs::midpoint::MidpointRegistry)).

use crate::mesh_error::MeshRefineError;
use crate::topology::entity::EntityKind;
use crate::topology::id::EntityId;
use rayon::prelude::*;

/// Returns `max(existing) + 1`, or 1 for an empty collection.
pub fn compute_next_id<I>(kind: EntityKind, existing: I) -> Result<EntityId, MeshRefineError>
where
    I: IntoParallelIterator<Item = EntityId>,
{
    let max = existing
        .into_par_iter()
        .map(EntityId::get)
        .max()
        .unwrap_or(0);
    let next = max.checked_add(1).ok_or(MeshRefineError::IdOverflow { kind })?;
    EntityId::new(next)
}

/// Monotonic counter handing out fresh ids of one entity kind.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    kind: EntityKind,
    next: u64,
}

impl IdAllocator {
    /// Starts allocating at `first`.
    pub fn starting_at(kind: EntityKind, first: EntityId) -> Self {
        Self {
            kind,
            next: first.get(),
        }
    }

    /// Seeds the allocator past every id in `existing`.
    pub fn seeded_from<I>(kind: EntityKind, existing: I) -> Result<Self, MeshRefineError>
    where
        I: IntoParallelIterator<Item = EntityId>,
    {
        Ok(Self::starting_at(kind, compute_next_id(kind, existing)?))
    }

    /// Returns the current counter value, then advances it.
    pub fn allocate(&mut self) -> Result<EntityId, MeshRefineError> {
        let id = EntityId::new(self.next)?;
        self.next = self
            .next
            .checked_add(1)
            .ok_or(MeshRefineError::IdOverflow { kind: self.kind })?;
        Ok(id)
    }

    /// Reserves `count` consecutive ids and returns the first one.
    ///
    /// Lets a parallel pass derive ids from loop indices instead of sharing the counter.
    pub fn allocate_block(&mut self, count: u64) -> Result<EntityId, MeshRefineError> {
        let first = EntityId::new(self.next)?;
        self.next = self
            .next
            .checked_add(count)
            .ok_or(MeshRefineError::IdOverflow { kind: self.kind })?;
        Ok(first)
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    pub fn peek(&self) -> u64 {
        self.next
    }
}
