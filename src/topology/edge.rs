//! Canonical, order-independent edge identifiers.

use crate::topology::id::EntityId;
use std::fmt;

/// An unordered pair of node ids, stored smaller id first.
///
/// Keys are built from stable identifiers, never from memory addresses, so
/// they order and hash identically across runs.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct EdgeKey {
    lo: EntityId,
    hi: EntityId,
}

impl EdgeKey {
    /// Canonicalizes the edge `(a, b)`; `canonicalize(a, b) == canonicalize(b, a)`.
    #[inline]
    pub fn canonicalize(a: EntityId, b: EntityId) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// The smaller endpoint id.
    #[inline]
    pub const fn lo(self) -> EntityId {
        self.lo
    }

    /// The larger endpoint id.
    #[inline]
    pub const fn hi(self) -> EntityId {
        self.hi
    }

    /// Both endpoints, smaller first.
    #[inline]
    pub const fn endpoints(self) -> (EntityId, EntityId) {
        (self.lo, self.hi)
    }
}

impl fmt::Debug for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeKey({}, {})", self.lo, self.hi)
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lo, self.hi)
    }
}
