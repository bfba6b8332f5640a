//! Tests for the B-Tree
//!
//! These tests verify:
//! - Point lookups, insert/replace and delete semantics
//! - Balance and ordering after every mutation
//! - Height changes on root split and root collapse
//! - Borrow and merge behaviour on underflow
//! - Behaviour across several orders

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use timberkv::tree::BTree;

// =============================================================================
// Helper Functions
// =============================================================================

fn tree_with(order: usize, keys: impl IntoIterator<Item = u32>) -> BTree<u32, String> {
    let mut tree = BTree::new(order);
    for k in keys {
        tree.insert(k, format!("v{}", k));
        tree.verify().unwrap();
    }
    tree
}

fn in_order_keys(tree: &BTree<u32, String>) -> Vec<u32> {
    tree.iter().map(|(k, _)| *k).collect()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_empty_tree() {
    let tree: BTree<String, String> = BTree::new(5);

    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.height(), 1);
    assert_eq!(tree.get("missing"), None);
    assert_eq!(tree.iter().count(), 0);
    tree.verify().unwrap();
}

#[test]
fn test_insert_and_get() {
    let mut tree = BTree::new(5);

    assert_eq!(tree.insert("a".to_string(), "1".to_string()), None);
    assert_eq!(tree.get("a").map(String::as_str), Some("1"));
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_insert_returns_previous_value() {
    let mut tree = BTree::new(5);

    tree.insert("k".to_string(), "old".to_string());
    let previous = tree.insert("k".to_string(), "new".to_string());

    assert_eq!(previous.as_deref(), Some("old"));
    assert_eq!(tree.get("k").map(String::as_str), Some("new"));
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_remove_returns_value() {
    let mut tree = tree_with(5, 0..20);

    assert_eq!(tree.remove(&7).as_deref(), Some("v7"));
    assert_eq!(tree.get(&7), None);
    assert_eq!(tree.len(), 19);
    tree.verify().unwrap();
}

#[test]
fn test_remove_missing_key() {
    let mut tree = tree_with(5, 0..20);

    assert_eq!(tree.remove(&100), None);
    assert_eq!(tree.len(), 20);
    tree.verify().unwrap();
}

#[test]
fn test_remove_from_empty_tree() {
    let mut tree: BTree<u32, String> = BTree::new(4);

    assert_eq!(tree.remove(&1), None);
    assert!(tree.is_empty());
}

#[test]
fn test_order_below_minimum_is_raised() {
    let tree: BTree<u32, u32> = BTree::new(1);
    assert_eq!(tree.order(), 3);
}

// =============================================================================
// Structure Tests
// =============================================================================

#[test]
fn test_root_split_increases_height_by_one() {
    // Order 5 holds 4 entries per node; the fifth insert splits the root
    let mut tree = tree_with(5, 0..4);
    assert_eq!(tree.height(), 1);

    tree.insert(4, "v4".to_string());
    assert_eq!(tree.height(), 2);
    tree.verify().unwrap();
}

#[test]
fn test_root_collapse_decreases_height() {
    let mut tree = tree_with(5, 0..5);
    assert_eq!(tree.height(), 2);

    // Two leaves of two entries around one separator; removing one leaf
    // entry forces a merge that empties the root
    tree.remove(&0);
    assert_eq!(tree.height(), 1);
    assert_eq!(in_order_keys(&tree), vec![1, 2, 3, 4]);
    tree.verify().unwrap();
}

#[test]
fn test_height_stays_logarithmic() {
    let tree = tree_with(5, 0..1000);

    // Minimum fan-out is 3, so 1000 entries need at most ~7 levels
    assert!(tree.height() <= 7, "height {}", tree.height());
    assert!(tree.height() >= 4, "height {}", tree.height());
}

#[test]
fn test_delete_internal_key_uses_predecessor() {
    let mut tree = tree_with(3, 0..15);

    // Every key is removable regardless of whether it sits in a leaf
    for k in [7, 3, 11, 1, 13] {
        assert_eq!(tree.remove(&k), Some(format!("v{}", k)));
        tree.verify().unwrap();
    }
    assert_eq!(in_order_keys(&tree), vec![0, 2, 4, 5, 6, 8, 9, 10, 12, 14]);
}

/// Order 5 (min 2): root [10, 20] over leaves [5, 6], [15, 16], [25, 26]
fn three_leaf_tree() -> BTree<u32, u32> {
    let mut tree = BTree::new(5);
    for k in [10, 20, 5, 6, 15, 16, 25, 26] {
        tree.insert(k, k);
    }
    tree.verify().unwrap();
    tree
}

fn shape(tree: &BTree<u32, u32>) -> Vec<Vec<Vec<u32>>> {
    tree.levels()
        .into_iter()
        .map(|level| level.into_iter().map(|node| node.into_iter().copied().collect()).collect())
        .collect()
}

#[test]
fn test_three_leaf_fixture_shape() {
    let tree = three_leaf_tree();
    assert_eq!(
        shape(&tree),
        vec![vec![vec![10, 20]], vec![vec![5, 6], vec![15, 16], vec![25, 26]]]
    );
}

#[test]
fn test_borrow_prefers_left_sibling_on_tie() {
    let mut tree = three_leaf_tree();
    tree.insert(7, 7);
    tree.insert(27, 27);

    // Both siblings have a spare entry; the left one lends
    tree.remove(&15);

    assert_eq!(
        shape(&tree),
        vec![vec![vec![7, 20]], vec![vec![5, 6], vec![10, 16], vec![25, 26, 27]]]
    );
    tree.verify().unwrap();
}

#[test]
fn test_borrow_prefers_sibling_with_more_entries() {
    let mut tree = three_leaf_tree();
    tree.insert(7, 7);
    tree.insert(27, 27);
    tree.insert(28, 28);

    // Right sibling has two spare entries, left only one
    tree.remove(&15);

    assert_eq!(
        shape(&tree),
        vec![vec![vec![10, 25]], vec![vec![5, 6, 7], vec![16, 20], vec![26, 27, 28]]]
    );
    tree.verify().unwrap();
}

#[test]
fn test_borrow_from_right_when_left_at_minimum() {
    let mut tree = three_leaf_tree();
    tree.insert(27, 27);

    tree.remove(&15);

    assert_eq!(
        shape(&tree),
        vec![vec![vec![10, 25]], vec![vec![5, 6], vec![16, 20], vec![26, 27]]]
    );
}

#[test]
fn test_merge_prefers_right_sibling() {
    let mut tree = three_leaf_tree();

    // Neither sibling can lend
    tree.remove(&15);

    assert_eq!(
        shape(&tree),
        vec![vec![vec![10]], vec![vec![5, 6], vec![16, 20, 25, 26]]]
    );
    tree.verify().unwrap();
}

#[test]
fn test_merge_with_left_for_last_child() {
    let mut tree = three_leaf_tree();

    tree.remove(&25);

    assert_eq!(
        shape(&tree),
        vec![vec![vec![10]], vec![vec![5, 6], vec![15, 16, 20, 26]]]
    );
    tree.verify().unwrap();
}

// =============================================================================
// Ordering / Invariant Tests
// =============================================================================

#[test]
fn test_iter_is_sorted_after_shuffled_inserts() {
    let mut keys: Vec<u32> = (0..500).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(7));

    let tree = tree_with(6, keys);

    assert_eq!(in_order_keys(&tree), (0..500).collect::<Vec<_>>());
    assert_eq!(tree.iter().len(), 500);
}

#[test]
fn test_balanced_after_every_random_operation() {
    for order in [3, 4, 5, 8] {
        let mut rng = StdRng::seed_from_u64(order as u64);
        let mut tree = BTree::new(order);
        let mut model = std::collections::BTreeMap::new();

        for _ in 0..2000 {
            let key: u32 = rng.random_range(0..300);
            if rng.random_bool(0.6) {
                let value: u32 = rng.random();
                assert_eq!(tree.insert(key, value), model.insert(key, value));
            } else {
                assert_eq!(tree.remove(&key), model.remove(&key));
            }
            tree.verify().unwrap();
        }

        assert_eq!(tree.len(), model.len());
        let ours: Vec<(u32, u32)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
        let theirs: Vec<(u32, u32)> = model.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(ours, theirs, "order {}", order);
    }
}

#[test]
fn test_drain_to_empty() {
    let mut tree = tree_with(4, 0..200);

    for k in (0..200).rev() {
        assert!(tree.remove(&k).is_some());
        tree.verify().unwrap();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.height(), 1);
}

#[test]
fn test_clear() {
    let mut tree = tree_with(5, 0..50);

    tree.clear();

    assert!(tree.is_empty());
    assert_eq!(tree.get(&3), None);
    tree.verify().unwrap();
}

#[test]
fn test_repeated_reads_are_stable() {
    let tree = tree_with(5, 0..100);

    let first = tree.get(&42).cloned();
    for _ in 0..10 {
        assert_eq!(tree.get(&42).cloned(), first);
    }
}
