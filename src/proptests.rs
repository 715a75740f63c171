use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeSet;

/// Smallest stored value under (`level`, `prefix`) from the sorted list
/// `values`, or the largest when `want_max` is set.
fn extreme_under(t: &XFastTrie, values: &[u128], level: u32, prefix: u128, want_max: bool) -> u128 {
    let mut under = values
        .iter()
        .copied()
        .filter(|&v| t.levels.prefix(v, level) == prefix);
    let found = if want_max { under.last() } else { under.next() };
    found.unwrap_or_else(|| panic!("no value under prefix {prefix:#b} at level {level}"))
}

/// Checks one side of a node whose children live at `child_level`.
fn validate_side(
    t: &XFastTrie,
    values: &[u128],
    node: &Internal,
    side: Side,
    child_level: u32,
    child_prefix: u128,
    sibling_prefix: u128,
) {
    match t.levels.get(child_level, child_prefix) {
        Some(c) => assert_eq!(
            node.get(side),
            ChildRef::Child(c),
            "prefix {:#b} {side:?} must point at its real child",
            node.prefix
        ),
        None => {
            let ChildRef::Descendant(d) = node.get(side) else {
                panic!(
                    "prefix {:#b} {side:?} has no child and must hold a descendant pointer, got {:?}",
                    node.prefix,
                    node.get(side)
                );
            };
            // Missing left looks at the minimum of the right subtree, missing
            // right at the maximum of the left subtree.
            let expected = extreme_under(t, values, child_level, sibling_prefix, side == Side::Right);
            assert_eq!(
                t.value_of(d),
                expected,
                "prefix {:#b} {side:?} descendant pointer is stale",
                node.prefix
            );
        }
    }
}

pub(crate) fn validate_trie(t: &XFastTrie) {
    // Leaf list: ascending, doubly linked, bounded by min/max.
    let mut values = Vec::with_capacity(t.count);
    let mut prev: Option<NodeId> = None;
    let mut cur = t.min;
    while let Some(id) = cur {
        let leaf = t.nodes.leaf(id);
        assert_eq!(leaf.pred, prev, "pred link of {} is broken", leaf.value);
        if let Some(&last) = values.last() {
            assert!(leaf.value > last, "leaf list not strictly ascending");
        }
        assert_eq!(t.levels.leaf(leaf.value), Some(id), "leaf table misses {}", leaf.value);
        values.push(leaf.value);
        prev = cur;
        cur = leaf.succ;
    }
    assert_eq!(prev, t.max, "list tail must be the cached max");
    assert_eq!(values.len(), t.count, "list length must match len()");

    let leaf_level = t.levels.leaf_level();
    assert_eq!(t.levels.level_len(leaf_level), t.count);
    for (value, id) in t.levels.iter_level(leaf_level) {
        assert_eq!(t.nodes.leaf(id).value, value);
    }

    // Internal levels hold exactly the prefixes of stored values.
    let mut live_nodes = t.count;
    for level in 0..leaf_level {
        let expected: BTreeSet<u128> = values.iter().map(|&v| t.levels.prefix(v, level)).collect();
        assert_eq!(t.levels.level_len(level), expected.len(), "level {level} size");
        live_nodes += expected.len();

        for (prefix, id) in t.levels.iter_level(level) {
            assert!(expected.contains(&prefix), "level {level} holds dead prefix {prefix:#b}");
            let node = t.nodes.internal(id);
            assert_eq!(node.prefix, prefix, "node key mismatch at level {level}");
            let (l, r) = (prefix << 1, (prefix << 1) | 1);
            validate_side(t, &values, node, Side::Left, level + 1, l, r);
            validate_side(t, &values, node, Side::Right, level + 1, r, l);
        }
    }
    assert_eq!(t.nodes.live(), live_nodes, "arena leaks or lost nodes");

    if values.is_empty() {
        assert_eq!(t.root.left, ChildRef::Empty);
        assert_eq!(t.root.right, ChildRef::Empty);
        assert_eq!(t.min, None);
    } else {
        validate_side(t, &values, &t.root, Side::Left, 0, 0, 1);
        validate_side(t, &values, &t.root, Side::Right, 0, 1, 0);
    }
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 5)]
    Insert(#[proptest(strategy = "0u128..256")] u128),
    #[proptest(weight = 3)]
    Remove(#[proptest(strategy = "0u128..256")] u128),
    #[proptest(weight = 2)]
    Predecessor(#[proptest(strategy = "0u128..256")] u128),
    #[proptest(weight = 2)]
    Successor(#[proptest(strategy = "0u128..256")] u128),
    Contains(#[proptest(strategy = "0u128..256")] u128),
}

fn run_ops(t: &mut XFastTrie, s: &mut BTreeSet<u128>, ops: Vec<Op>) -> std::result::Result<(), TestCaseError> {
    for op in ops {
        match op {
            Op::Insert(v) => {
                prop_assert_eq!(t.insert(v).unwrap(), s.insert(v));
            }
            Op::Remove(v) => {
                let expected = if s.remove(&v) {
                    Ok(())
                } else {
                    Err(XFastError::NotFound(v))
                };
                prop_assert_eq!(t.remove(v), expected);
            }
            Op::Predecessor(v) => {
                let expected = if s.is_empty() {
                    Err(XFastError::EmptyTrie)
                } else {
                    Ok(s.range(..v).next_back().copied())
                };
                prop_assert_eq!(t.predecessor(v), expected);
            }
            Op::Successor(v) => {
                let expected = if s.is_empty() {
                    Err(XFastError::EmptyTrie)
                } else {
                    Ok(s.range(v + 1..).next().copied())
                };
                prop_assert_eq!(t.successor(v), expected);
            }
            Op::Contains(v) => {
                prop_assert_eq!(t.contains(v).unwrap(), s.contains(&v));
            }
        }

        prop_assert_eq!(t.len(), s.len());
        prop_assert_eq!(t.min(), s.first().copied());
        prop_assert_eq!(t.max(), s.last().copied());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_dense(ops in prop::collection::vec(any::<Op>(), 0..=1000)) {
        let mut t = XFastTrie::with_max_bits(8).unwrap();
        let mut s = BTreeSet::new();
        run_ops(&mut t, &mut s, ops)?;

        validate_trie(&t);
        prop_assert_eq!(t.iter().collect::<Vec<_>>(), s.iter().copied().collect::<Vec<_>>());
        prop_assert_eq!(t.iter().rev().collect::<Vec<_>>(), s.iter().rev().copied().collect::<Vec<_>>());
    }

    #[test]
    fn prop_sorted_roundtrip(values in prop::collection::vec(any::<u64>(), 0..300)) {
        let mut t = XFastTrie::with_max_bits(64).unwrap();
        for &v in &values {
            t.insert(v).unwrap();
        }
        validate_trie(&t);
        let expected: Vec<u128> = values
            .iter()
            .map(|&v| u128::from(v))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        prop_assert_eq!(t.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn prop_neighbours_sparse(
        values in prop::collection::btree_set(any::<u64>(), 1..200),
        queries in prop::collection::vec(any::<u64>(), 0..200),
    ) {
        let mut t = XFastTrie::with_max_bits(64).unwrap();
        for &v in &values {
            t.insert(v).unwrap();
        }
        for q in queries {
            prop_assert_eq!(t.predecessor(q).unwrap(), values.range(..q).next_back().map(|&v| u128::from(v)));
            let above = q.checked_add(1).map(|n| values.range(n..).next().map(|&v| u128::from(v)));
            prop_assert_eq!(t.successor(q).unwrap(), above.flatten());
        }
    }

    #[test]
    fn prop_insert_then_remove_all(values in prop::collection::btree_set(0u128..(1 << 20), 0..300)) {
        let mut t = XFastTrie::with_max_bits(20).unwrap();
        for &v in &values {
            t.insert(v).unwrap();
        }
        for &v in values.iter().rev().step_by(2) {
            t.remove(v).unwrap();
            prop_assert!(!t.contains(v).unwrap());
        }
        validate_trie(&t);
        for &v in &values {
            let _ = t.remove(v);
        }
        validate_trie(&t);
        prop_assert!(t.is_empty());
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

const SMALL_SET: [u128; 6] = [0, 1, 6, 7, 9, 15];

#[test]
fn exhaustive_insert_order_small_set() {
    for_each_permutation(&SMALL_SET, |perm| {
        let mut t = XFastTrie::with_max_bits(4).unwrap();
        for v in perm {
            t.insert(v).unwrap();
            validate_trie(&t);
        }
        assert_eq!(t.iter().collect::<Vec<_>>(), SMALL_SET.to_vec());
        for q in 0..16u128 {
            let pred = SMALL_SET.iter().rev().find(|&&v| v < q).copied();
            let succ = SMALL_SET.iter().find(|&&v| v > q).copied();
            assert_eq!(t.predecessor(q).unwrap(), pred, "predecessor({q})");
            assert_eq!(t.successor(q).unwrap(), succ, "successor({q})");
        }
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let mut base = XFastTrie::with_max_bits(4).unwrap();
    for v in SMALL_SET {
        base.insert(v).unwrap();
    }

    for_each_permutation(&SMALL_SET, |perm| {
        let mut t = base.clone();
        let mut s: BTreeSet<u128> = SMALL_SET.iter().copied().collect();

        for v in perm {
            t.remove(v).unwrap();
            s.remove(&v);
            assert_eq!(t.len(), s.len());
            validate_trie(&t);
            for q in 0..16u128 {
                if s.is_empty() {
                    assert_eq!(t.successor(q), Err(XFastError::EmptyTrie));
                    continue;
                }
                assert_eq!(t.predecessor(q).unwrap(), s.range(..q).next_back().copied());
                assert_eq!(t.successor(q).unwrap(), s.range(q + 1..).next().copied());
            }
        }
        assert!(t.is_empty());
        assert_eq!(t.nodes.live(), 0);
    });
}

#[test]
fn exhaustive_every_subset_of_small_universe() {
    // All 2^8 subsets of a 3-bit universe.
    for mask in 0u32..256 {
        let mut t = XFastTrie::with_max_bits(3).unwrap();
        let set: BTreeSet<u128> = (0..8u128).filter(|v| mask & (1 << v) != 0).collect();
        for &v in &set {
            t.insert(v).unwrap();
        }
        validate_trie(&t);
        for q in 0..8u128 {
            if set.is_empty() {
                assert_eq!(t.predecessor(q), Err(XFastError::EmptyTrie));
                continue;
            }
            assert_eq!(t.predecessor(q).unwrap(), set.range(..q).next_back().copied());
            assert_eq!(t.successor(q).unwrap(), set.range(q + 1..).next().copied());
        }
    }
}
