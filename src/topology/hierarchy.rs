//! Arena-backed mesh hierarchy with named, nested scopes.
//!
//! A [`MeshHierarchy`] owns every node, element and condition exactly once in
//! per-kind arenas keyed by [`EntityId`]. Scopes form a tree rooted at
//! [`ScopeId::ROOT`]; each scope holds *sets of ids* into the arenas, so an
//! entity can be a member of many scopes without being copied.
//!
//! # Invariants
//! - The root scope's member sets equal the arena key sets.
//! - A sub-scope only contains ids that its parent scope contains; additions
//!   that would break this are rejected with [`MeshRefineError::UnknownEntity`].
//! - Child scope names are unique per parent and kept in insertion order.
//! - Every node referenced by an element or condition exists in the node arena.
//!
//! [`ScopeId`]s are indices into one hierarchy and must not be used with another.

use crate::mesh_error::MeshRefineError;
use crate::topology::entity::{Condition, ConnectedEntity, Element, EntityKind, Node};
use crate::topology::id::{EntityId, PropertyId};
use itertools::Itertools;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Index of a scope inside one [`MeshHierarchy`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The root scope of every hierarchy.
    pub const ROOT: ScopeId = ScopeId(0);

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Membership of one scope, as ascending id sets per entity kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntitySets {
    nodes: BTreeSet<EntityId>,
    elements: BTreeSet<EntityId>,
    conditions: BTreeSet<EntityId>,
}

impl EntitySets {
    pub fn nodes(&self) -> &BTreeSet<EntityId> {
        &self.nodes
    }
    pub fn elements(&self) -> &BTreeSet<EntityId> {
        &self.elements
    }
    pub fn conditions(&self) -> &BTreeSet<EntityId> {
        &self.conditions
    }
}

#[derive(Clone, Debug)]
struct Scope {
    name: String,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    members: EntitySets,
}

impl Scope {
    fn new(name: String, parent: Option<ScopeId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            members: EntitySets::default(),
        }
    }
}

/// Kind-generic access to a hierarchy's arenas and scope member sets.
pub trait ScopedEntity: Sized + Send + Sync + 'static {
    const KIND: EntityKind;

    fn entity_id(&self) -> EntityId;
    fn arena(mesh: &MeshHierarchy) -> &BTreeMap<EntityId, Self>;
    fn arena_mut(mesh: &mut MeshHierarchy) -> &mut BTreeMap<EntityId, Self>;
    fn members(sets: &EntitySets) -> &BTreeSet<EntityId>;
    fn members_mut(sets: &mut EntitySets) -> &mut BTreeSet<EntityId>;
    /// Moves the entity into the owning arena of `mesh`.
    fn insert_into(self, mesh: &mut MeshHierarchy) -> Result<(), MeshRefineError>;
}

impl ScopedEntity for Node {
    const KIND: EntityKind = EntityKind::Node;

    fn entity_id(&self) -> EntityId {
        self.id
    }
    fn arena(mesh: &MeshHierarchy) -> &BTreeMap<EntityId, Self> {
        &mesh.nodes
    }
    fn arena_mut(mesh: &mut MeshHierarchy) -> &mut BTreeMap<EntityId, Self> {
        &mut mesh.nodes
    }
    fn members(sets: &EntitySets) -> &BTreeSet<EntityId> {
        &sets.nodes
    }
    fn members_mut(sets: &mut EntitySets) -> &mut BTreeSet<EntityId> {
        &mut sets.nodes
    }
    fn insert_into(self, mesh: &mut MeshHierarchy) -> Result<(), MeshRefineError> {
        mesh.insert_node(self)
    }
}

impl ScopedEntity for Element {
    const KIND: EntityKind = EntityKind::Element;

    fn entity_id(&self) -> EntityId {
        self.id
    }
    fn arena(mesh: &MeshHierarchy) -> &BTreeMap<EntityId, Self> {
        &mesh.elements
    }
    fn arena_mut(mesh: &mut MeshHierarchy) -> &mut BTreeMap<EntityId, Self> {
        &mut mesh.elements
    }
    fn members(sets: &EntitySets) -> &BTreeSet<EntityId> {
        &sets.elements
    }
    fn members_mut(sets: &mut EntitySets) -> &mut BTreeSet<EntityId> {
        &mut sets.elements
    }
    fn insert_into(self, mesh: &mut MeshHierarchy) -> Result<(), MeshRefineError> {
        mesh.insert_element(self)
    }
}

impl ScopedEntity for Condition {
    const KIND: EntityKind = EntityKind::Condition;

    fn entity_id(&self) -> EntityId {
        self.id
    }
    fn arena(mesh: &MeshHierarchy) -> &BTreeMap<EntityId, Self> {
        &mesh.conditions
    }
    fn arena_mut(mesh: &mut MeshHierarchy) -> &mut BTreeMap<EntityId, Self> {
        &mut mesh.conditions
    }
    fn members(sets: &EntitySets) -> &BTreeSet<EntityId> {
        &sets.conditions
    }
    fn members_mut(sets: &mut EntitySets) -> &mut BTreeSet<EntityId> {
        &mut sets.conditions
    }
    fn insert_into(self, mesh: &mut MeshHierarchy) -> Result<(), MeshRefineError> {
        mesh.insert_condition(self)
    }
}

/// A root mesh with nested named scopes and root-owned entity arenas.
#[derive(Clone, Debug)]
pub struct MeshHierarchy {
    scopes: Vec<Scope>,
    nodes: BTreeMap<EntityId, Node>,
    elements: BTreeMap<EntityId, Element>,
    conditions: BTreeMap<EntityId, Condition>,
    properties: BTreeSet<PropertyId>,
}

impl MeshHierarchy {
    /// Creates an empty hierarchy whose root scope is called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scopes: vec![Scope::new(name.into(), None)],
            nodes: BTreeMap::new(),
            elements: BTreeMap::new(),
            conditions: BTreeMap::new(),
            properties: BTreeSet::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Scope tree
    // ---------------------------------------------------------------------

    /// Name of the root scope.
    pub fn name(&self) -> &str {
        &self.scopes[0].name
    }

    pub fn scope_name(&self, scope: ScopeId) -> &str {
        &self.scopes[scope.0].name
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    /// Child scopes in insertion order.
    pub fn children(&self, scope: ScopeId) -> &[ScopeId] {
        &self.scopes[scope.0].children
    }

    /// Child scope names in insertion order.
    pub fn child_names(&self, scope: ScopeId) -> impl Iterator<Item = &str> + '_ {
        self.children(scope)
            .iter()
            .map(move |c| self.scope_name(*c))
    }

    /// Looks up a direct child of `parent` by name.
    pub fn child(&self, parent: ScopeId, name: &str) -> Option<ScopeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.scope_name(*c) == name)
    }

    /// Like [`child`](Self::child) but reports a missing scope as an error.
    pub fn try_child(&self, parent: ScopeId, name: &str) -> Result<ScopeId, MeshRefineError> {
        self.child(parent, name)
            .ok_or_else(|| MeshRefineError::MissingScope {
                parent: self.full_name(parent),
                name: name.to_string(),
            })
    }

    /// Creates a new empty child scope. Fails if `parent` already has a child named `name`.
    pub fn create_scope(
        &mut self,
        parent: ScopeId,
        name: impl Into<String>,
    ) -> Result<ScopeId, MeshRefineError> {
        let name = name.into();
        if self.child(parent, &name).is_some() {
            return Err(MeshRefineError::DuplicateScope {
                parent: self.full_name(parent),
                name,
            });
        }
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(name, Some(parent)));
        self.scopes[parent.0].children.push(id);
        Ok(id)
    }

    /// Total number of scopes, root included.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// All scopes in pre-order (parents before children, siblings in insertion order).
    pub fn scopes_preorder(&self) -> Vec<ScopeId> {
        let mut order = Vec::with_capacity(self.scopes.len());
        let mut stack = vec![ScopeId::ROOT];
        while let Some(scope) = stack.pop() {
            order.push(scope);
            stack.extend(self.children(scope).iter().rev().copied());
        }
        order
    }

    /// Dotted path from the root, e.g. `output.boundary.left`.
    pub fn full_name(&self, scope: ScopeId) -> String {
        let mut path = Vec::new();
        let mut cursor = Some(scope);
        while let Some(s) = cursor {
            path.push(self.scope_name(s));
            cursor = self.parent(s);
        }
        path.iter().rev().join(".")
    }

    /// Number of ancestors of `scope`.
    pub fn depth(&self, scope: ScopeId) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent(scope);
        while let Some(s) = cursor {
            depth += 1;
            cursor = self.parent(s);
        }
        depth
    }

    pub fn members(&self, scope: ScopeId) -> &EntitySets {
        &self.scopes[scope.0].members
    }

    // ---------------------------------------------------------------------
    // Owning arenas
    // ---------------------------------------------------------------------

    pub fn add_property(&mut self, id: PropertyId) {
        self.properties.insert(id);
    }

    pub fn properties(&self) -> &BTreeSet<PropertyId> {
        &self.properties
    }

    /// Inserts a node into the owning arena (and thus the root scope).
    pub fn insert_node(&mut self, node: Node) -> Result<(), MeshRefineError> {
        self.insert_owned(node)
    }

    /// Inserts an element into the owning arena. All of its nodes must exist.
    pub fn insert_element(&mut self, element: Element) -> Result<(), MeshRefineError> {
        self.insert_connected(element)
    }

    /// Inserts a condition into the owning arena. All of its nodes must exist.
    pub fn insert_condition(&mut self, condition: Condition) -> Result<(), MeshRefineError> {
        self.insert_connected(condition)
    }

    /// Generic arena insertion for elements and conditions.
    pub fn insert_connected<E>(&mut self, entity: E) -> Result<(), MeshRefineError>
    where
        E: ConnectedEntity + ScopedEntity,
    {
        if let Some(missing) = entity.nodes().iter().find(|n| !self.nodes.contains_key(*n)) {
            return Err(MeshRefineError::UnknownEntity {
                kind: EntityKind::Node,
                id: *missing,
                scope: self.name().to_string(),
            });
        }
        self.properties.insert(entity.properties());
        self.insert_owned(entity)
    }

    fn insert_owned<E: ScopedEntity>(&mut self, entity: E) -> Result<(), MeshRefineError> {
        let id = entity.entity_id();
        let arena = E::arena_mut(self);
        if arena.contains_key(&id) {
            return Err(MeshRefineError::DuplicateEntity { kind: E::KIND, id });
        }
        arena.insert(id, entity);
        E::members_mut(&mut self.scopes[0].members).insert(id);
        Ok(())
    }

    /// Adds already-owned entities to a scope by id.
    ///
    /// Every id must be a member of the parent scope (for the root: of the
    /// arena). Nothing is added if any id is rejected.
    pub fn add_to_scope<E, I>(&mut self, scope: ScopeId, ids: I) -> Result<(), MeshRefineError>
    where
        E: ScopedEntity,
        I: IntoIterator<Item = EntityId>,
    {
        let ids: Vec<EntityId> = ids.into_iter().collect();
        let lineage = match self.parent(scope) {
            Some(parent) => E::members(self.members(parent)),
            None => E::members(self.members(ScopeId::ROOT)),
        };
        if let Some(missing) = ids.iter().find(|id| !lineage.contains(*id)) {
            let where_ = self.parent(scope).unwrap_or(ScopeId::ROOT);
            return Err(MeshRefineError::UnknownEntity {
                kind: E::KIND,
                id: *missing,
                scope: self.full_name(where_),
            });
        }
        E::members_mut(&mut self.scopes[scope.0].members).extend(ids);
        Ok(())
    }

    /// Ids of kind `E` in `scope`, ascending.
    pub fn ids<E: ScopedEntity>(&self, scope: ScopeId) -> impl Iterator<Item = EntityId> + '_ {
        E::members(self.members(scope)).iter().copied()
    }

    pub fn contains<E: ScopedEntity>(&self, scope: ScopeId, id: EntityId) -> bool {
        E::members(self.members(scope)).contains(&id)
    }

    pub fn count<E: ScopedEntity>(&self, scope: ScopeId) -> usize {
        E::members(self.members(scope)).len()
    }

    pub fn get<E: ScopedEntity>(&self, id: EntityId) -> Option<&E> {
        E::arena(self).get(&id)
    }

    /// Fetches an owned entity, reporting absence as [`MeshRefineError::UnknownEntity`].
    pub fn try_get<E: ScopedEntity>(&self, id: EntityId) -> Result<&E, MeshRefineError> {
        self.get::<E>(id).ok_or_else(|| MeshRefineError::UnknownEntity {
            kind: E::KIND,
            id,
            scope: self.name().to_string(),
        })
    }

    /// All owned entities of kind `E`, ascending by id.
    pub fn entities<E: ScopedEntity>(&self) -> impl Iterator<Item = &E> + '_ {
        E::arena(self).values()
    }

    pub fn node(&self, id: EntityId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    /// Mutable access to node coordinates; ids are not exposed for mutation.
    pub fn node_coords_mut(&mut self) -> impl Iterator<Item = &mut [f64; 3]> + '_ {
        self.nodes.values_mut().map(|n| &mut n.coords)
    }

    /// Parallel counterpart of [`node_coords_mut`](Self::node_coords_mut).
    pub fn par_node_coords_mut(&mut self) -> impl ParallelIterator<Item = &mut [f64; 3]> + '_ {
        self.nodes.par_iter_mut().map(|(_, n)| &mut n.coords)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.elements.values()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> + '_ {
        self.conditions.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Renders the scope tree with per-scope entity counts.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MeshHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for scope in self.scopes_preorder() {
            let m = self.members(scope);
            writeln!(
                f,
                "{:indent$}{}: {} nodes, {} elements, {} conditions",
                "",
                self.scope_name(scope),
                m.nodes.len(),
                m.elements.len(),
                m.conditions.len(),
                indent = 2 * self.depth(scope),
            )?;
        }
        Ok(())
    }
}
