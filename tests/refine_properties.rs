use mesh_refine::algs::scope_zip::scope_pairs;
use mesh_refine::prelude::*;
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

fn id(raw: u64) -> EntityId {
    EntityId::new(raw).unwrap()
}

/// `nx × ny` quads split into triangles, bottom edge as conditions, plus
/// randomly populated scopes `part`, `part.inner` and `bottom`.
fn strip_mesh(nx: u64, ny: u64, seed: u64) -> MeshHierarchy {
    let mut rng = SmallRng::seed_from_u64(seed);
    let node = |i: u64, j: u64| id(j * (nx + 1) + i + 1);

    let mut mesh = MeshHierarchy::new("strip");
    for j in 0..=ny {
        for i in 0..=nx {
            let xyz = [i as f64 * 0.37, j as f64 * 1.3, (i + j) as f64 * 0.1];
            mesh.insert_node(Node::new(node(i, j), xyz)).unwrap();
        }
    }
    let mut next = 1;
    for j in 0..ny {
        for i in 0..nx {
            let (a, b, c, d) = (node(i, j), node(i + 1, j), node(i, j + 1), node(i + 1, j + 1));
            for tri in [vec![a, b, c], vec![b, d, c]] {
                mesh.insert_element(Element::new(id(next), "Element2D3N", 1, tri))
                    .unwrap();
                next += 1;
            }
        }
    }
    for i in 0..nx {
        let line = vec![node(i, 0), node(i + 1, 0)];
        mesh.insert_condition(Condition::new(id(i + 1), "LineCondition2D2N", 2, line))
            .unwrap();
    }

    let part = mesh.create_scope(ScopeId::ROOT, "part").unwrap();
    let picked: Vec<Element> = mesh.elements().filter(|_| rng.gen_bool(0.5)).cloned().collect();
    add_elements(&mut mesh, part, &picked);
    let inner = mesh.create_scope(part, "inner").unwrap();
    let picked: Vec<Element> = picked.into_iter().filter(|_| rng.gen_bool(0.5)).collect();
    add_elements(&mut mesh, inner, &picked);

    let bottom = mesh.create_scope(ScopeId::ROOT, "bottom").unwrap();
    let lines: Vec<Condition> = mesh.conditions().filter(|_| rng.gen_bool(0.7)).cloned().collect();
    let nodes: BTreeSet<EntityId> = lines.iter().flat_map(|c| c.nodes.clone()).collect();
    mesh.add_to_scope::<Node, _>(bottom, nodes).unwrap();
    mesh.add_to_scope::<Condition, _>(bottom, lines.iter().map(|c| c.id))
        .unwrap();
    mesh
}

fn add_elements(mesh: &mut MeshHierarchy, scope: ScopeId, elements: &[Element]) {
    let nodes: BTreeSet<EntityId> = elements.iter().flat_map(|e| e.nodes.clone()).collect();
    mesh.add_to_scope::<Node, _>(scope, nodes).unwrap();
    mesh.add_to_scope::<Element, _>(scope, elements.iter().map(|e| e.id))
        .unwrap();
}

fn unique_edges(mesh: &MeshHierarchy) -> BTreeSet<(EntityId, EntityId)> {
    let mut edges = BTreeSet::new();
    let mut add = |a: EntityId, b: EntityId| {
        edges.insert((a.min(b), a.max(b)));
    };
    for e in mesh.elements() {
        add(e.nodes[0], e.nodes[1]);
        add(e.nodes[1], e.nodes[2]);
        add(e.nodes[2], e.nodes[0]);
    }
    for c in mesh.conditions() {
        add(c.nodes[0], c.nodes[1]);
    }
    edges
}

fn with_threads(threads: usize) -> RefineOptions {
    RefineOptions {
        threads: Some(threads),
        ..RefineOptions::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn per_scope_counts_scale(nx in 1u64..6, ny in 1u64..5, seed in any::<u64>()) {
        let src = strip_mesh(nx, ny, seed);
        let out = refine_hierarchy(&src, &RefineOptions::default()).unwrap().mesh;
        for (d, s) in scope_pairs(&out, &src).unwrap() {
            prop_assert_eq!(out.full_name(d), src.full_name(s));
            prop_assert_eq!(out.count::<Element>(d), 4 * src.count::<Element>(s));
            prop_assert_eq!(out.count::<Condition>(d), 2 * src.count::<Condition>(s));
        }
        prop_assert_eq!(out.scope_count(), src.scope_count());
    }

    #[test]
    fn node_count_is_inputs_plus_unique_edges(nx in 1u64..6, ny in 1u64..5, seed in any::<u64>()) {
        let src = strip_mesh(nx, ny, seed);
        let refined = refine_hierarchy(&src, &RefineOptions::default()).unwrap();
        let edges = unique_edges(&src);
        prop_assert_eq!(refined.mesh.node_count(), src.node_count() + edges.len());
        prop_assert_eq!(refined.midpoints.len(), edges.len());
    }

    #[test]
    fn midpoints_are_exact_means(nx in 1u64..6, ny in 1u64..5, seed in any::<u64>()) {
        let src = strip_mesh(nx, ny, seed);
        let refined = refine_hierarchy(&src, &RefineOptions::default()).unwrap();
        for (edge, mid) in refined.midpoints.iter() {
            let a = src.node(edge.lo()).unwrap().coords;
            let b = src.node(edge.hi()).unwrap().coords;
            let expected = [(a[0] + b[0]) * 0.5, (a[1] + b[1]) * 0.5, (a[2] + b[2]) * 0.5];
            prop_assert_eq!(refined.mesh.node(mid.id).unwrap().coords, expected);
        }
    }

    #[test]
    fn scope_nodes_are_members_plus_inner_midpoints(nx in 1u64..6, ny in 1u64..5, seed in any::<u64>()) {
        let src = strip_mesh(nx, ny, seed);
        let refined = refine_hierarchy(&src, &RefineOptions::default()).unwrap();
        let out = &refined.mesh;
        for (d, s) in scope_pairs(out, &src).unwrap() {
            let mut expected: BTreeSet<EntityId> = src.ids::<Node>(s).collect();
            for (edge, mid) in refined.midpoints.iter() {
                if src.contains::<Node>(s, edge.lo()) && src.contains::<Node>(s, edge.hi()) {
                    expected.insert(mid.id);
                }
            }
            prop_assert_eq!(out.ids::<Node>(d).collect::<BTreeSet<_>>(), expected);
        }
        prop_assert!(validate_hierarchy(out).is_ok());
    }

    #[test]
    fn thread_count_does_not_change_output(nx in 1u64..6, ny in 1u64..5, seed in any::<u64>()) {
        let src = strip_mesh(nx, ny, seed);
        let one = refine_hierarchy(&src, &with_threads(1)).unwrap().mesh;
        let four = refine_hierarchy(&src, &with_threads(4)).unwrap().mesh;

        prop_assert_eq!(one.nodes().collect::<Vec<_>>(), four.nodes().collect::<Vec<_>>());
        prop_assert_eq!(one.elements().collect::<Vec<_>>(), four.elements().collect::<Vec<_>>());
        prop_assert_eq!(one.conditions().collect::<Vec<_>>(), four.conditions().collect::<Vec<_>>());
        for scope in one.scopes_preorder() {
            prop_assert_eq!(one.members(scope), four.members(scope));
        }
    }
}

#[test]
fn refining_twice_quadruples_again() {
    let src = strip_mesh(3, 2, 7);
    let once = refine_hierarchy(&src, &RefineOptions::default()).unwrap().mesh;
    let twice = refine_hierarchy(&once, &RefineOptions::default()).unwrap().mesh;
    assert_eq!(twice.element_count(), 16 * src.element_count());
    assert_eq!(twice.condition_count(), 4 * src.condition_count());
    assert_eq!(twice.summary().lines().count(), src.scope_count());
}
