use super::*;

use proptest::prelude::*;

/// A random node of nesting depth `nesting`.
fn node_strategy(nesting: usize) -> BoxedStrategy<VectTree<u32>> {
    if nesting == 0 {
        prop::collection::vec(0u32..1000, 0..5)
            .prop_map(VectTree::Leaf)
            .boxed()
    } else {
        prop::collection::vec(node_strategy(nesting - 1), 0..4)
            .prop_map(VectTree::Node)
            .boxed()
    }
}

#[derive(Clone, Debug)]
enum Op {
    PushBack(usize, VectTree<u32>),
    Append(usize, Vec<VectTree<u32>>),
    /// A node one level too deep for the insert level.
    Misshapen(usize, VectTree<u32>),
    Fetch(Vec<u32>),
}

fn op_strategy(depth: usize) -> impl Strategy<Value = Op> {
    (0..depth).prop_flat_map(move |level| {
        prop_oneof![
            40 => node_strategy(level).prop_map(move |n| Op::PushBack(level, n)),
            30 => prop::collection::vec(node_strategy(level), 0..3)
                .prop_map(move |ns| Op::Append(level, ns)),
            10 => node_strategy(level + 1).prop_map(move |n| Op::Misshapen(level, n)),
            20 => prop::collection::vec(0u32..4, 0..=depth + 1).prop_map(Op::Fetch),
        ]
    })
}

fn scenario_strategy() -> impl Strategy<Value = (usize, Vec<Op>)> {
    (1usize..=4).prop_flat_map(|depth| {
        (
            Just(depth),
            prop::collection::vec(op_strategy(depth), 0..=60),
        )
    })
}

/// The children of the rightmost node with nesting depth `target` under
/// `node`, which has nesting depth `nesting`.
fn model_parent(
    node: &mut VectTree<u32>,
    nesting: usize,
    target: usize,
) -> Option<&mut Vec<VectTree<u32>>> {
    match node {
        VectTree::Node(children) => {
            if nesting == target {
                Some(children)
            } else if nesting > target {
                for child in children.iter_mut().rev() {
                    if let Some(found) = model_parent(child, nesting - 1, target) {
                        return Some(found);
                    }
                }
                None
            } else {
                None
            }
        }
        _ => None,
    }
}

fn model_fetch(root: &VectTree<u32>, depth: usize, path: &[u32]) -> Option<VectTree<u32>> {
    if path.len() > depth {
        return None;
    }
    let mut node = root;
    for &index in path {
        node = node.children()?.get(index as usize)?;
    }
    Some(node.clone())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence((depth, ops) in scenario_strategy()) {
        let mut t: FlatVectTree<u32> = FlatVectTree::with_depth(depth);
        let mut model = VectTree::new();

        for op in ops {
            match op {
                Op::PushBack(level, node) => {
                    let got = t.push_back_ref(&node, Some(level));
                    match model_parent(&mut model, depth, level + 1) {
                        Some(children) => {
                            prop_assert!(got.is_ok(), "{:?}", got);
                            children.push(node);
                        }
                        None => prop_assert!(got.is_err()),
                    }
                }
                Op::Append(level, nodes) => {
                    let got = t.append(VectTree::Node(nodes.clone()), Some(level));
                    match model_parent(&mut model, depth, level + 1) {
                        Some(children) => {
                            prop_assert!(got.is_ok(), "{:?}", got);
                            children.extend(nodes);
                        }
                        None => prop_assert!(got.is_err()),
                    }
                }
                Op::Misshapen(level, node) => {
                    let before = t.clone();
                    let got = t.push_back(node.clone(), Some(level));
                    if !node.fits_depth(level) {
                        prop_assert!(got.is_err());
                        prop_assert_eq!(&t, &before);
                    } else if let Some(children) = model_parent(&mut model, depth, level + 1) {
                        // An empty node fits any depth and is accepted.
                        prop_assert!(got.is_ok(), "{:?}", got);
                        children.push(node);
                    }
                }
                Op::Fetch(path) => {
                    let got = t.get_vect_tree(&path).ok();
                    prop_assert_eq!(got, model_fetch(&model, depth, &path));
                }
            }

            prop_assert!(t.validate().is_ok(), "{:?}", t);
        }

        prop_assert_eq!(t.get_vect_tree(&[]).unwrap(), model.clone());
        let flat = model.flatten();
        prop_assert_eq!(t.leaves(&[]).unwrap(), flat.as_slice());

        // Growing node by node and appending the finished value once agree.
        let mut bulk = FlatVectTree::with_depth(depth);
        bulk.append_ref(&model, None).unwrap();
        prop_assert_eq!(&bulk, &t);
    }

    #[test]
    fn prop_round_trip(
        (depth, value) in (1usize..=4).prop_flat_map(|depth| (Just(depth), node_strategy(depth)))
    ) {
        let mut t = FlatVectTree::with_depth(depth);
        t.append_ref(&value, None).unwrap();
        prop_assert_eq!(t.get_vect_tree(&[]).unwrap(), value.clone());
        let flat = value.flatten();
        prop_assert_eq!(t.data(), flat.as_slice());

        let (index, data) = t.release_mem();
        prop_assert!(t.is_truly_empty());
        prop_assert!(is_valid_fvt(&index, &data));

        let mut assigned = FlatVectTree::new();
        assigned.assign_parts_owned(index, data, true).unwrap();
        prop_assert_eq!(assigned.get_vect_tree(&[]).unwrap(), value);
    }

    #[test]
    fn prop_validator_rejects_perturbations(
        (depth, value) in (1usize..=3).prop_flat_map(|depth| (Just(depth), node_strategy(depth))),
        level_pick in any::<prop::sample::Index>(),
        bump_first in any::<bool>(),
        bump in 1u32..3,
    ) {
        let mut t = FlatVectTree::with_depth(depth);
        t.append_ref(&value, None).unwrap();
        let (mut index, data) = t.into_parts();

        let level = level_pick.index(index.len());
        let entry = if bump_first { 0 } else { index[level].len() - 1 };
        index[level][entry] += bump;

        prop_assert!(!is_valid_fvt(&index, &data));

        let mut target = FlatVectTree::new();
        prop_assert!(target.assign_parts(&index, &data, true).is_err());
        prop_assert!(target.is_truly_empty());
    }
}

#[test]
fn seeded_incremental_equals_bulk() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_node(rng: &mut StdRng, nesting: usize) -> VectTree<i32> {
        let len = rng.gen_range(0..4);
        if nesting == 0 {
            VectTree::Leaf((0..len).map(|_| rng.gen_range(-50..50)).collect())
        } else {
            VectTree::Node((0..len).map(|_| random_node(rng, nesting - 1)).collect())
        }
    }

    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let depth = rng.gen_range(1..=4);
        let value = random_node(&mut rng, depth);

        let mut bulk = FlatVectTree::with_depth(depth);
        bulk.append_ref(&value, None).unwrap();

        let mut incremental = FlatVectTree::with_depth(depth);
        for node in value.children().unwrap_or_default() {
            incremental.push_back_ref(node, None).unwrap();
            assert!(incremental.validate().is_ok());
        }
        assert_eq!(incremental, bulk);

        let mut assigned = FlatVectTree::new();
        assigned
            .assign_parts(bulk.partition_index(), bulk.data(), true)
            .unwrap();
        assert_eq!(assigned, incremental);
    }
}
