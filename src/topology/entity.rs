//! Mesh entities: nodes, triangular elements and two-node conditions.
//!
//! Entities are plain values owned once by the root arena of a
//! [`MeshHierarchy`](crate::topology::hierarchy::MeshHierarchy); scopes refer
//! to them by [`EntityId`]. Elements and conditions share one shape (a type
//! name, a property reference and an ordered node list) and are handled
//! generically through [`ConnectedEntity`].

use crate::mesh_error::MeshRefineError;
use crate::topology::id::{EntityId, PropertyId};
use std::fmt;
use std::sync::Arc;

/// The three kinds of addressable mesh entities.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Node,
    Element,
    Condition,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Node => "node",
            EntityKind::Element => "element",
            EntityKind::Condition => "condition",
        })
    }
}

/// A mesh vertex with 3D coordinates.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: EntityId,
    pub coords: [f64; 3],
}

impl Node {
    pub fn new(id: EntityId, coords: [f64; 3]) -> Self {
        Self { id, coords }
    }

    /// Arithmetic mean of two coordinate triples: `(a + b) * 0.5`.
    #[inline]
    pub fn midpoint_coords(a: &Node, b: &Node) -> [f64; 3] {
        [
            (a.coords[0] + b.coords[0]) * 0.5,
            (a.coords[1] + b.coords[1]) * 0.5,
            (a.coords[2] + b.coords[2]) * 0.5,
        ]
    }
}

/// Shared interface of elements and conditions.
pub trait ConnectedEntity: Clone + Send + Sync + fmt::Debug {
    /// Kind reported in errors and logs.
    const KIND: EntityKind;
    /// The only node count refinement accepts for this kind.
    const NODE_COUNT: usize;

    fn id(&self) -> EntityId;
    /// Type name as it appears in mesh files (e.g. `Element2D3N`).
    fn type_name(&self) -> &Arc<str>;
    fn properties(&self) -> PropertyId;
    fn nodes(&self) -> &[EntityId];

    /// Creates an entity of the same type and property set with new id and nodes.
    fn create(&self, id: EntityId, nodes: Vec<EntityId>) -> Self;

    /// Rejects entities whose node count differs from [`Self::NODE_COUNT`].
    fn check_topology(&self) -> Result<(), MeshRefineError> {
        let found = self.nodes().len();
        if found != Self::NODE_COUNT {
            return Err(MeshRefineError::UnsupportedTopology {
                kind: Self::KIND,
                id: self.id(),
                expected: Self::NODE_COUNT,
                found,
            });
        }
        Ok(())
    }
}

macro_rules! connected_entity {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $count:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name {
            pub id: EntityId,
            pub type_name: Arc<str>,
            pub properties: PropertyId,
            pub nodes: Vec<EntityId>,
        }

        impl $name {
            pub fn new(
                id: EntityId,
                type_name: impl Into<Arc<str>>,
                properties: PropertyId,
                nodes: Vec<EntityId>,
            ) -> Self {
                Self {
                    id,
                    type_name: type_name.into(),
                    properties,
                    nodes,
                }
            }
        }

        impl ConnectedEntity for $name {
            const KIND: EntityKind = $kind;
            const NODE_COUNT: usize = $count;

            fn id(&self) -> EntityId {
                self.id
            }
            fn type_name(&self) -> &Arc<str> {
                &self.type_name
            }
            fn properties(&self) -> PropertyId {
                self.properties
            }
            fn nodes(&self) -> &[EntityId] {
                &self.nodes
            }
            fn create(&self, id: EntityId, nodes: Vec<EntityId>) -> Self {
                Self {
                    id,
                    type_name: Arc::clone(&self.type_name),
                    properties: self.properties,
                    nodes,
                }
            }
        }
    };
}

connected_entity!(
    /// A triangle: exactly three node references in their original order.
    Element,
    EntityKind::Element,
    3
);

connected_entity!(
    /// A boundary edge: exactly two node references.
    Condition,
    EntityKind::Condition,
    2
);
