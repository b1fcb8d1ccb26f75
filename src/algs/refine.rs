//! Uniform refinement of a scoped triangular mesh.
//!
//! Every triangle is split 1→4 through its edge midpoints and every
//! two-node condition 1→2. Midpoints on shared edges are created once.
//! The destination hierarchy mirrors the source scope tree, and every scope
//! receives exactly the refined counterparts of its source members.
//!
//! # Pipeline
//! The engine is a strict linear pipeline; any failing stage aborts the run
//! and no partial hierarchy is returned:
//!
//! `ScanMaxIds → ReplicateStructure → BuildMidpoints → DistributeNodes →
//! RefineElements → RefineConditions → DistributeElementChildren →
//! DistributeConditionChildren → Done`
//!
//! Parallel stages run on rayon; each stage fully drains before the next begins.
//!
//! # Determinism
//! Midpoint ids are renumbered in edge-key order once the parallel pass ends,
//! and child ids are derived from the parent's position in the root
//! collection. Output is identical for any worker count.

use crate::algs::distribute::{ChildMap, distribute_children, distribute_existing_nodes};
use crate::algs::ids::IdAllocator;
use crate::algs::midpoint::{MidpointRegistry, MidpointTable};
use crate::algs::replicate::replicate_structure;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshRefineError;
use crate::topology::edge::EdgeKey;
use crate::topology::entity::{Condition, ConnectedEntity, Element, EntityKind, Node};
use crate::topology::hierarchy::{MeshHierarchy, ScopeId, ScopedEntity};
use crate::topology::id::EntityId;
use crate::topology::validation::{NonManifoldHandling, validate_hierarchy};
use rayon::prelude::*;
use std::fmt;

/// Settings for [`refine_hierarchy`].
#[derive(Clone, Copy, Debug)]
pub struct RefineOptions {
    /// Worker count for the parallel stages; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// What to do with edges shared by more than two elements.
    pub non_manifold: NonManifoldHandling,
    /// Validate the source hierarchy before refining.
    pub validate_input: bool,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            threads: None,
            non_manifold: NonManifoldHandling::Warn,
            validate_input: true,
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RefineStage {
    ScanMaxIds,
    ReplicateStructure,
    BuildMidpoints,
    DistributeNodes,
    RefineElements,
    RefineConditions,
    DistributeElementChildren,
    DistributeConditionChildren,
    Done,
}

impl fmt::Display for RefineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Output of [`refine_hierarchy`].
#[derive(Clone, Debug)]
pub struct RefinedMesh {
    /// The refined hierarchy; same root name and scope tree as the source.
    pub mesh: MeshHierarchy,
    /// Every edge of the source and the midpoint node created for it.
    pub midpoints: MidpointTable,
}

/// Reference 1→4 subdivision of a triangle `(n0, n1, n2)` with midpoints `(m01, m12, m20)`.
///
/// Children: corner at `n0`, corner at `n1`, corner at `n2`, then the central
/// triangle.
///
/// ```text
///         n0
///        /  \
///       / 0  \
///     m01----m20
///     / \ 3  / \
///    / 1 \  / 2 \
///  n1----m12-----n2
/// ```
pub fn triangle_subdivision(
    vertices: [EntityId; 3],
    midpoints: [EntityId; 3],
) -> [[EntityId; 3]; 4] {
    let [n0, n1, n2] = vertices;
    let [m01, m12, m20] = midpoints;
    [
        [n0, m01, m20],
        [m01, n1, m12],
        [m20, m12, n2],
        [m01, m12, m20],
    ]
}

/// Reference 1→2 subdivision of a segment `(n0, n1)` with midpoint `m01`.
pub fn segment_subdivision(vertices: [EntityId; 2], midpoint: EntityId) -> [[EntityId; 2]; 2] {
    let [n0, n1] = vertices;
    [[n0, midpoint], [midpoint, n1]]
}

/// Splits one triangle into four children with ids `first_id .. first_id + 4`.
///
/// # Errors
/// - [`MeshRefineError::UnsupportedTopology`] if `element` does not have 3 nodes.
/// - [`MeshRefineError::MissingMidpoint`] if an edge was never registered.
pub fn refine_triangle(
    element: &Element,
    midpoints: &MidpointTable,
    first_id: EntityId,
) -> Result<[Element; 4], MeshRefineError> {
    element.check_topology()?;
    let [n0, n1, n2] = [element.nodes[0], element.nodes[1], element.nodes[2]];
    let mids = [
        midpoints.midpoint_of(n0, n1)?,
        midpoints.midpoint_of(n1, n2)?,
        midpoints.midpoint_of(n2, n0)?,
    ];
    let [c0, c1, c2, c3] = triangle_subdivision([n0, n1, n2], mids);
    Ok([
        element.create(child_id(EntityKind::Element, first_id, 0)?, c0.to_vec()),
        element.create(child_id(EntityKind::Element, first_id, 1)?, c1.to_vec()),
        element.create(child_id(EntityKind::Element, first_id, 2)?, c2.to_vec()),
        element.create(child_id(EntityKind::Element, first_id, 3)?, c3.to_vec()),
    ])
}

/// Splits one condition into two children with ids `first_id` and `first_id + 1`.
///
/// # Errors
/// - [`MeshRefineError::UnsupportedTopology`] if `condition` does not have 2 nodes.
/// - [`MeshRefineError::MissingMidpoint`] if its edge was never registered.
pub fn refine_condition(
    condition: &Condition,
    midpoints: &MidpointTable,
    first_id: EntityId,
) -> Result<[Condition; 2], MeshRefineError> {
    condition.check_topology()?;
    let [n0, n1] = [condition.nodes[0], condition.nodes[1]];
    let [c0, c1] = segment_subdivision([n0, n1], midpoints.midpoint_of(n0, n1)?);
    Ok([
        condition.create(child_id(EntityKind::Condition, first_id, 0)?, c0.to_vec()),
        condition.create(child_id(EntityKind::Condition, first_id, 1)?, c1.to_vec()),
    ])
}

fn child_id(kind: EntityKind, first: EntityId, offset: u64) -> Result<EntityId, MeshRefineError> {
    let raw = first
        .get()
        .checked_add(offset)
        .ok_or(MeshRefineError::IdOverflow { kind })?;
    EntityId::new(raw)
}

/// Refines every element and condition of `src` once.
///
/// Runs inside a dedicated rayon pool when `options.threads` is set.
///
/// # Errors
/// Any [`MeshRefineError`] raised by a stage; see the stage functions. The
/// source hierarchy is never modified.
pub fn refine_hierarchy(
    src: &MeshHierarchy,
    options: &RefineOptions,
) -> Result<RefinedMesh, MeshRefineError> {
    match options.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| MeshRefineError::ThreadPool(e.to_string()))?;
            pool.install(|| run_pipeline(src, options))
        }
        None => run_pipeline(src, options),
    }
}

fn enter(stage: RefineStage) {
    log::debug!("refine stage: {stage}");
}

fn run_pipeline(
    src: &MeshHierarchy,
    options: &RefineOptions,
) -> Result<RefinedMesh, MeshRefineError> {
    log::info!(
        "refining `{}`: {} nodes, {} elements, {} conditions, {} scopes",
        src.name(),
        src.node_count(),
        src.element_count(),
        src.condition_count(),
        src.scope_count()
    );
    if options.validate_input {
        validate_hierarchy(src)?;
    }

    let elements: Vec<&Element> = src.elements().collect();
    let conditions: Vec<&Condition> = src.conditions().collect();
    ensure_topology(&elements)?;
    ensure_topology(&conditions)?;

    enter(RefineStage::ScanMaxIds);
    let node_ids: Vec<EntityId> = src.ids::<Node>(ScopeId::ROOT).collect();
    let node_alloc = IdAllocator::seeded_from(EntityKind::Node, node_ids)?;

    enter(RefineStage::ReplicateStructure);
    let mut dst = replicate_structure(src)?;

    enter(RefineStage::BuildMidpoints);
    let midpoints = build_midpoints(src, &elements, &conditions, node_alloc)?;
    report_non_manifold(&midpoints, options.non_manifold)?;

    enter(RefineStage::DistributeNodes);
    distribute_existing_nodes(&mut dst, src, &midpoints)?;
    dst.debug_assert_invariants();

    enter(RefineStage::RefineElements);
    let element_children = refine_all(&dst, &elements, &midpoints, refine_triangle)?;

    enter(RefineStage::RefineConditions);
    let condition_children = refine_all(&dst, &conditions, &midpoints, refine_condition)?;

    enter(RefineStage::DistributeElementChildren);
    distribute_children(&mut dst, src, &element_children)?;

    enter(RefineStage::DistributeConditionChildren);
    distribute_children(&mut dst, src, &condition_children)?;
    dst.debug_assert_invariants();

    enter(RefineStage::Done);
    log::info!(
        "refined `{}`: {} nodes ({} midpoints), {} elements, {} conditions",
        dst.name(),
        dst.node_count(),
        midpoints.len(),
        dst.element_count(),
        dst.condition_count()
    );
    Ok(RefinedMesh {
        mesh: dst,
        midpoints,
    })
}

/// Fails on the lowest-id entity with an unsupported node count.
fn ensure_topology<E: ConnectedEntity>(entities: &[&E]) -> Result<(), MeshRefineError> {
    match entities.par_iter().find_first(|e| e.check_topology().is_err()) {
        Some(bad) => bad.check_topology(),
        None => Ok(()),
    }
}

fn build_midpoints(
    src: &MeshHierarchy,
    elements: &[&Element],
    conditions: &[&Condition],
    allocator: IdAllocator,
) -> Result<MidpointTable, MeshRefineError> {
    let registry = MidpointRegistry::new(allocator);

    elements.par_iter().try_for_each(|element| {
        let n = &element.nodes;
        for (a, b) in [(n[0], n[1]), (n[1], n[2]), (n[2], n[0])] {
            let (na, nb) = (src.try_get::<Node>(a)?, src.try_get::<Node>(b)?);
            registry.register_element_edge(EdgeKey::canonicalize(a, b), na, nb)?;
        }
        Ok::<(), MeshRefineError>(())
    })?;

    conditions.par_iter().try_for_each(|condition| {
        let (a, b) = (condition.nodes[0], condition.nodes[1]);
        let (na, nb) = (src.try_get::<Node>(a)?, src.try_get::<Node>(b)?);
        registry.get_or_create(EdgeKey::canonicalize(a, b), na, nb)?;
        Ok::<(), MeshRefineError>(())
    })?;

    registry.freeze()
}

fn report_non_manifold(
    midpoints: &MidpointTable,
    handling: NonManifoldHandling,
) -> Result<(), MeshRefineError> {
    match handling {
        NonManifoldHandling::Ignore => Ok(()),
        NonManifoldHandling::Warn => {
            for (edge, incident) in midpoints.non_manifold_edges() {
                log::warn!(
                    "Non-manifold edge detected: edge={edge} incident_elements={incident}"
                );
            }
            Ok(())
        }
        NonManifoldHandling::Error => match midpoints.non_manifold_edges().next() {
            Some((edge, incident)) => Err(MeshRefineError::NonManifoldEdge { edge, incident }),
            None => Ok(()),
        },
    }
}

/// Refines `parents` in parallel, reserving one contiguous id block from `dst`.
fn refine_all<E, const N: usize>(
    dst: &MeshHierarchy,
    parents: &[&E],
    midpoints: &MidpointTable,
    refine: fn(&E, &MidpointTable, EntityId) -> Result<[E; N], MeshRefineError>,
) -> Result<ChildMap<E>, MeshRefineError>
where
    E: ConnectedEntity + ScopedEntity,
{
    let kind = <E as ConnectedEntity>::KIND;
    let existing: Vec<EntityId> = dst.ids::<E>(ScopeId::ROOT).collect();
    let mut allocator = IdAllocator::seeded_from(kind, existing)?;
    let total = (parents.len() as u64)
        .checked_mul(N as u64)
        .ok_or(MeshRefineError::IdOverflow { kind })?;
    let first = allocator.allocate_block(total)?;

    parents
        .par_iter()
        .enumerate()
        .map(|(i, parent)| {
            let block = child_id(kind, first, (i * N) as u64)?;
            let children = refine(*parent, midpoints, block)?;
            Ok::<_, MeshRefineError>((parent.id(), Vec::from(children)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    fn ids(raw: &[u64]) -> Vec<EntityId> {
        raw.iter().map(|r| id(*r)).collect()
    }

    fn single_triangle() -> MeshHierarchy {
        let mut mesh = MeshHierarchy::new("main");
        mesh.insert_node(Node::new(id(1), [0.0, 0.0, 0.0])).unwrap();
        mesh.insert_node(Node::new(id(2), [1.0, 0.0, 0.0])).unwrap();
        mesh.insert_node(Node::new(id(3), [0.0, 1.0, 0.0])).unwrap();
        mesh.insert_element(Element::new(id(1), "Element2D3N", 1, ids(&[1, 2, 3])))
            .unwrap();
        mesh
    }

    #[test]
    fn triangle_template_order() {
        let children = triangle_subdivision(
            [id(1), id(2), id(3)],
            [id(4), id(5), id(6)],
        );
        assert_eq!(
            children,
            [
                [id(1), id(4), id(6)],
                [id(4), id(2), id(5)],
                [id(6), id(5), id(3)],
                [id(4), id(5), id(6)],
            ]
        );
    }

    #[test]
    fn segment_template_order() {
        assert_eq!(
            segment_subdivision([id(7), id(2)], id(9)),
            [[id(7), id(9)], [id(9), id(2)]]
        );
    }

    #[test]
    fn single_triangle_refines_to_four() {
        let refined = refine_hierarchy(&single_triangle(), &RefineOptions::default()).unwrap();
        let mesh = &refined.mesh;
        assert_eq!(mesh.node_count(), 6);
        assert_eq!(mesh.element_count(), 4);
        assert_eq!(mesh.condition_count(), 0);

        // midpoints numbered by edge key: (1,2)->4, (1,3)->5, (2,3)->6
        let m12 = refined.midpoints.midpoint_of(id(1), id(2)).unwrap();
        let m13 = refined.midpoints.midpoint_of(id(3), id(1)).unwrap();
        let m23 = refined.midpoints.midpoint_of(id(2), id(3)).unwrap();
        assert_eq!((m12, m13, m23), (id(4), id(5), id(6)));
        assert_eq!(mesh.node(m23).unwrap().coords, [0.5, 0.5, 0.0]);

        let conn: Vec<Vec<EntityId>> = mesh.elements().map(|e| e.nodes.clone()).collect();
        assert_eq!(
            conn,
            vec![
                vec![id(1), m12, m13],
                vec![m12, id(2), m23],
                vec![m13, m23, id(3)],
                vec![m12, m23, m13],
            ]
        );
        assert_eq!(
            mesh.elements().map(|e| e.id.get()).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert!(mesh.elements().all(|e| e.properties == 1));
    }

    #[test]
    fn quad_element_aborts() {
        let mut mesh = single_triangle();
        mesh.insert_node(Node::new(id(4), [1.0, 1.0, 0.0])).unwrap();
        mesh.insert_element(Element::new(id(2), "Element2D4N", 1, ids(&[2, 4, 3, 1])))
            .unwrap();
        let err = refine_hierarchy(&mesh, &RefineOptions::default()).unwrap_err();
        assert_eq!(
            err,
            MeshRefineError::UnsupportedTopology {
                kind: EntityKind::Element,
                id: id(2),
                expected: 3,
                found: 4,
            }
        );
    }

    #[test]
    fn three_node_condition_aborts() {
        let mut mesh = single_triangle();
        mesh.insert_condition(Condition::new(id(8), "Line3N", 0, ids(&[1, 2, 3])))
            .unwrap();
        let err = refine_hierarchy(&mesh, &RefineOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            MeshRefineError::UnsupportedTopology {
                kind: EntityKind::Condition,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn non_manifold_policy_error() {
        // three triangles fanning around edge (1,2)
        let mut mesh = MeshHierarchy::new("fan");
        let coords = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.5, 1.0, 0.0],
            [0.5, -1.0, 0.0],
            [0.5, 0.0, 1.0],
        ];
        for (i, xyz) in coords.into_iter().enumerate() {
            mesh.insert_node(Node::new(id(i as u64 + 1), xyz)).unwrap();
        }
        for (e, third) in [(1, 3), (2, 4), (3, 5)] {
            mesh.insert_element(Element::new(id(e), "Element3D3N", 0, ids(&[1, 2, third])))
                .unwrap();
        }

        let strict = RefineOptions {
            non_manifold: NonManifoldHandling::Error,
            ..RefineOptions::default()
        };
        let err = refine_hierarchy(&mesh, &strict).unwrap_err();
        assert_eq!(
            err,
            MeshRefineError::NonManifoldEdge {
                edge: EdgeKey::canonicalize(id(1), id(2)),
                incident: 3,
            }
        );

        // default policy only warns
        let refined = refine_hierarchy(&mesh, &RefineOptions::default()).unwrap();
        assert_eq!(refined.mesh.element_count(), 12);
    }

    #[test]
    fn dedicated_pool_matches_global_pool() {
        let mesh = single_triangle();
        let a = refine_hierarchy(&mesh, &RefineOptions::default()).unwrap();
        let b = refine_hierarchy(
            &mesh,
            &RefineOptions {
                threads: Some(3),
                ..RefineOptions::default()
            },
        )
        .unwrap();
        assert_eq!(
            a.mesh.elements().collect::<Vec<_>>(),
            b.mesh.elements().collect::<Vec<_>>()
        );
    }

    #[test]
    fn stages_are_ordered() {
        assert!(RefineStage::ScanMaxIds < RefineStage::BuildMidpoints);
        assert!(RefineStage::DistributeConditionChildren < RefineStage::Done);
        assert_eq!(RefineStage::RefineElements.to_string(), "RefineElements");
    }
}
