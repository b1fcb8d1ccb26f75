//! Concurrent midpoint registry: exactly one midpoint node per edge.
//!
//! Workers call [`MidpointRegistry::get_or_create`] from a parallel loop.
//! The lookup, id allocation, node creation and insertion happen under one
//! `parking_lot::Mutex`, so two workers racing on the same edge always
//! observe the same node.
//!
//! Arrival order under the lock depends on scheduling. [`MidpointRegistry::freeze`]
//! therefore reassigns the allocated (contiguous) id range in ascending
//! [`EdgeKey`] order, which makes the final numbering independent of thread
//! count.

use crate::algs::ids::IdAllocator;
use crate::mesh_error::MeshRefineError;
use crate::topology::edge::EdgeKey;
use crate::topology::entity::Node;
use crate::topology::id::EntityId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy)]
struct Entry {
    node: Node,
    incident_elements: usize,
}

#[derive(Debug)]
struct RegistryState {
    entries: HashMap<EdgeKey, Entry>,
    allocator: IdAllocator,
}

/// Edge-keyed registry of midpoint nodes, shared by all workers of one refinement run.
#[derive(Debug)]
pub struct MidpointRegistry {
    first_id: u64,
    state: Mutex<RegistryState>,
}

impl MidpointRegistry {
    /// Creates an empty registry that draws node ids from `allocator`.
    pub fn new(allocator: IdAllocator) -> Self {
        Self {
            first_id: allocator.peek(),
            state: Mutex::new(RegistryState {
                entries: HashMap::new(),
                allocator,
            }),
        }
    }

    /// Returns the midpoint of `key`, creating it from endpoints `a` and `b` if absent.
    ///
    /// An existing midpoint is returned without allocating an id or computing
    /// coordinates.
    pub fn get_or_create(&self, key: EdgeKey, a: &Node, b: &Node) -> Result<Node, MeshRefineError> {
        self.lookup_or_insert(key, a, b, 0)
    }

    /// Like [`get_or_create`](Self::get_or_create), additionally counting one
    /// incident element for non-manifold detection.
    pub fn register_element_edge(
        &self,
        key: EdgeKey,
        a: &Node,
        b: &Node,
    ) -> Result<Node, MeshRefineError> {
        self.lookup_or_insert(key, a, b, 1)
    }

    fn lookup_or_insert(
        &self,
        key: EdgeKey,
        a: &Node,
        b: &Node,
        incident: usize,
    ) -> Result<Node, MeshRefineError> {
        debug_assert_eq!(key, EdgeKey::canonicalize(a.id, b.id));
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get_mut(&key) {
            entry.incident_elements += incident;
            return Ok(entry.node);
        }
        let id = state.allocator.allocate()?;
        let node = Node::new(id, Node::midpoint_coords(a, b));
        state.entries.insert(
            key,
            Entry {
                node,
                incident_elements: incident,
            },
        );
        Ok(node)
    }

    /// Number of distinct edges registered so far.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the registry and renumbers midpoints in ascending edge-key order.
    pub fn freeze(self) -> Result<MidpointTable, MeshRefineError> {
        let state = self.state.into_inner();
        let mut entries: Vec<(EdgeKey, Entry)> = state.entries.into_iter().collect();
        entries.sort_unstable_by_key(|(key, _)| *key);

        let mut midpoints = BTreeMap::new();
        for (offset, (key, mut entry)) in (0u64..).zip(entries) {
            entry.node.id = EntityId::new(self.first_id + offset)?;
            midpoints.insert(key, entry);
        }
        Ok(MidpointTable { midpoints })
    }
}

/// Immutable edge → midpoint map produced by [`MidpointRegistry::freeze`].
#[derive(Debug, Clone, Default)]
pub struct MidpointTable {
    midpoints: BTreeMap<EdgeKey, Entry>,
}

impl MidpointTable {
    pub fn get(&self, key: &EdgeKey) -> Option<&Node> {
        self.midpoints.get(key).map(|e| &e.node)
    }

    /// Midpoint id of the edge `(a, b)`, in either orientation.
    pub fn midpoint_of(&self, a: EntityId, b: EntityId) -> Result<EntityId, MeshRefineError> {
        self.get(&EdgeKey::canonicalize(a, b))
            .map(|n| n.id)
            .ok_or(MeshRefineError::MissingMidpoint { a, b })
    }

    /// `(edge, midpoint)` pairs in ascending edge-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&EdgeKey, &Node)> + '_ {
        self.midpoints.iter().map(|(k, e)| (k, &e.node))
    }

    pub fn len(&self) -> usize {
        self.midpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.midpoints.is_empty()
    }

    /// Number of elements that referenced `key` during registration.
    pub fn incident_elements(&self, key: &EdgeKey) -> Option<usize> {
        self.midpoints.get(key).map(|e| e.incident_elements)
    }

    /// Edges referenced by more than two elements.
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = (EdgeKey, usize)> + '_ {
        self.midpoints
            .iter()
            .filter(|(_, e)| e.incident_elements > 2)
            .map(|(k, e)| (*k, e.incident_elements))
    }
}
