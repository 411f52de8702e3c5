use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "0u16..512")] u16, u32),
    #[proptest(weight = 25)]
    Remove(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 15)]
    Get(#[proptest(strategy = "0u16..512")] u16),
    #[proptest(weight = 9)]
    Seek(#[proptest(strategy = "0u16..520")] u16),
    #[proptest(weight = 1)]
    Clear,
}

fn drain_from(t: &AvlTree<u16, u32>, target: u16) -> Vec<(u16, u32)> {
    let mut cursor = t.cursor();
    cursor.seek_ceiling(t, &target).unwrap();
    let mut out = Vec::new();
    while cursor.move_next(t).unwrap() {
        let (k, v) = cursor.current(t).unwrap().unwrap();
        out.push((*k, *v));
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=2000)) {
        let mut t: AvlTree<u16, u32> = AvlTree::with_config(NaturalOrder, AvlConfig::CHECKED);
        let mut m: BTreeMap<u16, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let got = t.insert(key, value);
                    if m.contains_key(&key) {
                        prop_assert_eq!(got, Err(AvlError::DuplicateKey));
                    } else {
                        prop_assert_eq!(got, Ok(()));
                        m.insert(key, value);
                    }
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove_entry(&key), m.remove_entry(&key));
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key), m.get(&key));
                    prop_assert_eq!(t.contains_key(&key), m.contains_key(&key));
                }
                Op::Seek(target) => {
                    let expected: Vec<(u16, u32)> = m.range(target..).map(|(k, v)| (*k, *v)).collect();
                    prop_assert_eq!(drain_from(&t, target), expected);
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.len(), m.len());
        }

        t.validate();
        let got: Vec<(u16, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u16, u32)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_seek_ceiling(keys in prop::collection::btree_set(any::<u16>(), 0..300), target in any::<u16>()) {
        let mut t: AvlTree<u16, u32> = AvlTree::new();
        for &k in &keys {
            t.insert(k, u32::from(k) + 1).unwrap();
        }

        let got: Vec<u16> = drain_from(&t, target).into_iter().map(|(k, _)| k).collect();
        let expected: Vec<u16> = keys.range(target..).copied().collect();
        prop_assert_eq!(got.first(), expected.first());
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_removal_law(keys in prop::collection::btree_set(0u16..1000, 1..200), pick in any::<prop::sample::Index>()) {
        let keys: Vec<u16> = keys.into_iter().collect();
        let mut t: AvlTree<u16, u32> = AvlTree::new();
        for &k in keys.iter().rev() {
            t.insert(k, 0).unwrap();
        }

        let victim = keys[pick.index(keys.len())];
        prop_assert!(t.remove(&victim));
        prop_assert_eq!(t.get(&victim), None);
        prop_assert_eq!(t.len(), keys.len() - 1);
        t.validate();

        let remaining: BTreeSet<u16> = t.iter().map(|(k, _)| *k).collect();
        prop_assert!(!remaining.contains(&victim));
        prop_assert_eq!(remaining.len(), keys.len() - 1);
    }
}

/// Calls `f` once with every ordering of `items` (Heap's algorithm, no
/// recursion).
fn for_each_ordering<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    let mut order = items.to_vec();
    let mut counters = vec![0usize; order.len()];
    f(order.clone());

    let mut i = 1;
    while i < order.len() {
        if counters[i] < i {
            let j = if i % 2 == 0 { 0 } else { counters[i] };
            order.swap(j, i);
            f(order.clone());
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
}

#[test]
fn orderings_are_distinct_and_complete() {
    let mut seen = std::collections::HashSet::new();
    for_each_ordering(&[1, 2, 3, 4, 5], |order| {
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
        assert!(seen.insert(order));
    });
    assert_eq!(seen.len(), 120);

    let mut calls = 0;
    for_each_ordering::<u8>(&[], |order| {
        assert!(order.is_empty());
        calls += 1;
    });
    assert_eq!(calls, 1);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = [1, 2, 3, 4, 5, 6, 7];

    for_each_ordering(&keys, |perm| {
        let mut t: AvlTree<i32, usize> = AvlTree::new();
        for (i, k) in perm.iter().enumerate() {
            t.insert(*k, i).unwrap();
            t.validate();
        }

        let got: Vec<i32> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(got, keys.to_vec());
        for (i, k) in perm.iter().enumerate() {
            assert_eq!(t.get(k), Some(&i));
        }
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = [10, 20, 30, 40, 50, 60, 70];

    let mut base: AvlTree<i32, i32> = AvlTree::new();
    for &k in &keys {
        base.insert(k, -k).unwrap();
    }

    for_each_ordering(&keys, |perm| {
        let mut t = base.clone();
        let mut m: BTreeMap<i32, i32> = keys.iter().map(|&k| (k, -k)).collect();

        for k in perm {
            assert_eq!(t.remove_entry(&k), m.remove_entry(&k));
            assert_eq!(t.len(), m.len());
            t.validate();

            let mut cursor = t.cursor();
            let mut seen = Vec::new();
            while cursor.move_next(&t).unwrap() {
                seen.push(*cursor.current(&t).unwrap().unwrap().0);
            }
            assert_eq!(seen, m.keys().copied().collect::<Vec<_>>());
        }
        assert!(t.is_empty());
        assert_eq!(t.height(), -1);
    });
}

#[test]
fn height_bound_holds_for_every_prefix() {
    // Bit-reversed keys land all over the existing key range.
    let mut t: AvlTree<u32, ()> = AvlTree::new();
    for len in 1..=2000u32 {
        let key = len.reverse_bits();
        t.insert(key, ()).unwrap();
        assert!(t.height() <= max_height_for_len(t.len()));
    }
    t.validate();
}
