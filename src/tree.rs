use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use tracing::{debug, trace};

use crate::compare::{Comparator, NaturalOrder};
use crate::config::AvlConfig;
use crate::cursor::{Cursor, Iter};
use crate::error::{AvlError, Result};
use crate::node::{NodeArena, NodeId};
use crate::PATH_CAPACITY;

/// Source of process-unique tree identities, used to bind cursors.
static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

fn next_tree_id() -> u64 {
    NEXT_TREE_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Rotation counters, recorded when [`AvlConfig::track_stats`] is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Primitive left/right rotations; a double rotation counts as two.
    pub rotations: u64,
    pub single_rotations: u64,
    pub double_rotations: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rotation {
    Right,
    Left,
    LeftRight,
    RightLeft,
}

// =============================================================================
// AvlTree
// =============================================================================

/// An ordered map kept height-balanced as an AVL tree.
///
/// Nodes live in an arena addressed by integer handles. Insertion and removal
/// record their descent in fixed-size path buffers owned by the tree and
/// rebalance bottom-up along that path without recursion.
///
/// Keys are ordered by the comparator `C`. A hash set mirrors the stored keys
/// for O(1) [`contains_key`](AvlTree::contains_key), so `K`'s `Eq`/`Hash` must
/// agree with the comparator's notion of equality.
pub struct AvlTree<K, V, C = NaturalOrder> {
    nodes: NodeArena<K, V>,
    root: NodeId,
    count: usize,
    cmp: C,
    /// Keys currently stored, kept in lockstep with the nodes.
    index: HashSet<K>,

    // === Descent path, reused by every mutation ===
    /// Node visited at each depth.
    path: [NodeId; PATH_CAPACITY],
    /// Whether the descent went left at each depth.
    went_left: [bool; PATH_CAPACITY],

    id: u64,
    /// Structural version; bumped by every successful insert, remove and clear.
    version: u64,
    config: AvlConfig,
    stats: TreeStats,
}

impl<K: Ord, V> AvlTree<K, V, NaturalOrder> {
    pub fn new() -> Self {
        Self::with_config(NaturalOrder, AvlConfig::default())
    }
}

impl<K, V, C> AvlTree<K, V, C> {
    pub fn with_comparator(cmp: C) -> Self {
        Self::with_config(cmp, AvlConfig::default())
    }

    pub fn with_config(cmp: C, config: AvlConfig) -> Self {
        Self {
            nodes: NodeArena::new(),
            root: NodeId::NIL,
            count: 0,
            cmp,
            index: HashSet::new(),
            path: [NodeId::NIL; PATH_CAPACITY],
            went_left: [false; PATH_CAPACITY],
            id: next_tree_id(),
            version: 0,
            config,
            stats: TreeStats::default(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Height of the root; a single node has height 0 and an empty tree -1.
    pub fn height(&self) -> i32 {
        self.nodes.height(self.root)
    }

    /// Structural version, bumped by every successful mutation.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    pub fn config(&self) -> AvlConfig {
        self.config
    }

    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Removes every entry. The tree itself stays usable.
    pub fn clear(&mut self) {
        debug!(dropped = self.count, tree = self.id, "clearing tree");
        self.nodes.clear();
        self.index.clear();
        self.root = NodeId::NIL;
        self.count = 0;
        self.bump_version();
    }

    /// A cursor positioned before the smallest key.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self)
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let mut cur = self.nodes.get(self.root)?;
        while let Some(left) = self.nodes.get(cur.left) {
            cur = left;
        }
        Some((&cur.key, &cur.value))
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let mut cur = self.nodes.get(self.root)?;
        while let Some(right) = self.nodes.get(cur.right) {
            cur = right;
        }
        Some((&cur.key, &cur.value))
    }

    // === Internals shared with cursors ===

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub(crate) fn nodes(&self) -> &NodeArena<K, V> {
        &self.nodes
    }

    #[inline]
    fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Points the link that led to `path[depth]` at `node` instead.
    #[inline]
    fn replace_link(&mut self, depth: usize, node: NodeId) {
        if depth == 0 {
            self.root = node;
            return;
        }
        let parent = self.path[depth - 1];
        if self.went_left[depth - 1] {
            self.nodes[parent].left = node;
        } else {
            self.nodes[parent].right = node;
        }
    }

    fn rotate_right(&mut self, n: NodeId) -> NodeId {
        let l = self.nodes[n].left;
        let lr = self.nodes[l].right;
        self.nodes[n].left = lr;
        self.nodes[l].right = n;
        self.nodes.update_height(n);
        self.nodes.update_height(l);
        l
    }

    fn rotate_left(&mut self, n: NodeId) -> NodeId {
        let r = self.nodes[n].right;
        let rl = self.nodes[r].left;
        self.nodes[n].right = rl;
        self.nodes[r].left = n;
        self.nodes.update_height(n);
        self.nodes.update_height(r);
        r
    }

    /// Restructures the subtree rooted at `n` and returns its new root. The
    /// caller relinks the result.
    fn rotate(&mut self, n: NodeId, kind: Rotation) -> NodeId {
        trace!(pivot = ?n, ?kind, "rotate");
        if self.config.track_stats {
            match kind {
                Rotation::Right | Rotation::Left => {
                    self.stats.single_rotations += 1;
                    self.stats.rotations += 1;
                }
                Rotation::LeftRight | Rotation::RightLeft => {
                    self.stats.double_rotations += 1;
                    self.stats.rotations += 2;
                }
            }
        }

        match kind {
            Rotation::Right => self.rotate_right(n),
            Rotation::Left => self.rotate_left(n),
            Rotation::LeftRight => {
                let l = self.nodes[n].left;
                let new_left = self.rotate_left(l);
                self.nodes[n].left = new_left;
                self.rotate_right(n)
            }
            Rotation::RightLeft => {
                let r = self.nodes[n].right;
                let new_right = self.rotate_right(r);
                self.nodes[n].right = new_right;
                self.rotate_left(n)
            }
        }
    }
}

impl<K, V, C: Comparator<K>> AvlTree<K, V, C> {
    fn find_node(&self, key: &K) -> NodeId {
        let mut cur = self.root;
        while let Some(node) = self.nodes.get(cur) {
            cur = match self.cmp.compare(key, &node.key) {
                Ordering::Equal => return cur,
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        NodeId::NIL
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.nodes.get(self.find_node(key)).map(|node| &node.value)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.nodes
            .get(self.find_node(key))
            .map(|node| (&node.key, &node.value))
    }

    /// Mutable access to a stored value. Not a structural change, so live
    /// cursors stay valid.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.find_node(key);
        if id.is_nil() {
            return None;
        }
        Some(&mut self.nodes[id].value)
    }

    /// Iterates all entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter::new(self)
    }

    /// Iterates entries whose key is at least `from`, in ascending order.
    pub fn range_from(&self, from: &K) -> Iter<'_, K, V, C> {
        Iter::from_ceiling(self, from)
    }

    #[inline]
    fn key_order(&self, a: NodeId, b: NodeId) -> Ordering {
        self.cmp.compare(&self.nodes[a].key, &self.nodes[b].key)
    }

    /// Walks `path[..depth]` bottom-up after `inserted` was linked below it.
    ///
    /// Only one path changed, so the heavy side of an imbalanced node is the
    /// side the new key went down, and comparing the new key with the heavy
    /// child tells whether it landed on the outside (single rotation) or the
    /// inside (double rotation). One rotation restores the subtree's previous
    /// height, which ends the walk.
    fn rebalance_after_insert(&mut self, depth: usize, inserted: NodeId) {
        for i in (0..depth).rev() {
            let n = self.path[i];
            let old_height = self.nodes[n].height;
            let balance = self.nodes.balance(n);

            if balance > 1 {
                let child = self.nodes[n].left;
                let kind = if self.key_order(inserted, child) == Ordering::Less {
                    Rotation::Right
                } else {
                    Rotation::LeftRight
                };
                let sub = self.rotate(n, kind);
                self.replace_link(i, sub);
                return;
            }
            if balance < -1 {
                let child = self.nodes[n].right;
                let kind = if self.key_order(inserted, child) == Ordering::Greater {
                    Rotation::Left
                } else {
                    Rotation::RightLeft
                };
                let sub = self.rotate(n, kind);
                self.replace_link(i, sub);
                return;
            }

            if self.nodes.update_height(n) == old_height {
                return;
            }
        }
    }

    /// Walks `path[..depth]` bottom-up after a node was spliced out below it.
    ///
    /// A removal can unbalance several ancestors, each fixed independently, so
    /// the rotation kind comes from the heights of the heavy child's own
    /// children.
    fn rebalance_after_remove(&mut self, depth: usize) {
        for i in (0..depth).rev() {
            let n = self.path[i];
            let old_height = self.nodes[n].height;
            let balance = self.nodes.balance(n);

            let sub = if balance > 1 {
                let l = &self.nodes[self.nodes[n].left];
                let kind = if self.nodes.height(l.left) >= self.nodes.height(l.right) {
                    Rotation::Right
                } else {
                    Rotation::LeftRight
                };
                let sub = self.rotate(n, kind);
                self.replace_link(i, sub);
                sub
            } else if balance < -1 {
                let r = &self.nodes[self.nodes[n].right];
                let kind = if self.nodes.height(r.right) >= self.nodes.height(r.left) {
                    Rotation::Left
                } else {
                    Rotation::RightLeft
                };
                let sub = self.rotate(n, kind);
                self.replace_link(i, sub);
                sub
            } else {
                self.nodes.update_height(n);
                n
            };

            if self.nodes[sub].height == old_height {
                return;
            }
        }
    }
}

impl<K: Eq + Hash, V, C: Comparator<K>> AvlTree<K, V, C> {
    /// Membership test through the key index; does not touch the tree.
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains(key)
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Removes `key` and returns the stored pair.
    ///
    /// A node with two children takes over its in-order predecessor's entry
    /// and the predecessor, which has at most one child, is the node spliced
    /// out.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let mut depth = 0;
        let mut cur = self.root;
        while !cur.is_nil() {
            let node = &self.nodes[cur];
            self.path[depth] = cur;
            cur = match self.cmp.compare(key, &node.key) {
                Ordering::Equal => break,
                Ordering::Less => {
                    self.went_left[depth] = true;
                    node.left
                }
                Ordering::Greater => {
                    self.went_left[depth] = false;
                    node.right
                }
            };
            depth += 1;
            debug_assert!(depth < PATH_CAPACITY);
        }
        if cur.is_nil() {
            return None;
        }

        let mut unlink_depth = depth;
        if self.nodes[cur].has_two_children() {
            self.went_left[depth] = true;
            let mut d = depth + 1;
            let mut pred = self.nodes[cur].left;
            loop {
                self.path[d] = pred;
                let right = self.nodes[pred].right;
                if right.is_nil() {
                    break;
                }
                self.went_left[d] = false;
                pred = right;
                d += 1;
            }
            self.nodes.swap_payload(cur, pred);
            unlink_depth = d;
        }

        let victim = self.path[unlink_depth];
        let node = &self.nodes[victim];
        let child = if node.left.is_nil() {
            node.right
        } else {
            node.left
        };
        self.replace_link(unlink_depth, child);

        let (removed_key, removed_value) = self.nodes.free(victim)?;
        self.index.remove(&removed_key);
        self.count -= 1;
        self.bump_version();

        self.rebalance_after_remove(unlink_depth);
        debug_assert_eq!(self.nodes.live(), self.count);
        Some((removed_key, removed_value))
    }
}

impl<K: Clone + Eq + Hash, V, C: Comparator<K>> AvlTree<K, V, C> {
    /// Inserts a new entry.
    ///
    /// Fails with [`AvlError::DuplicateKey`] if an equal key is already
    /// stored; in that case the tree is left exactly as it was.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        let mut depth = 0;
        let mut cur = self.root;
        while !cur.is_nil() {
            let node = &self.nodes[cur];
            let ord = self.cmp.compare(&key, &node.key);
            if ord == Ordering::Equal {
                trace!(tree = self.id, "rejected duplicate key");
                return Err(AvlError::DuplicateKey);
            }
            self.path[depth] = cur;
            self.went_left[depth] = ord == Ordering::Less;
            cur = if ord == Ordering::Less {
                node.left
            } else {
                node.right
            };
            depth += 1;
            debug_assert!(depth < PATH_CAPACITY);
        }

        let id = self
            .nodes
            .alloc(key.clone(), value)
            .ok_or(AvlError::CapacityExhausted)?;
        self.index.insert(key);
        self.replace_link(depth, id);
        self.count += 1;
        self.bump_version();

        self.rebalance_after_insert(depth, id);
        debug_assert_eq!(self.nodes.live(), self.count);
        Ok(())
    }
}

impl<K: Ord, V> Default for AvlTree<K, V, NaturalOrder> {
    fn default() -> Self {
        Self::new()
    }
}

/// A clone is an independent tree with its own identity; cursors of the
/// original cannot be used with it.
impl<K: Clone, V: Clone, C: Clone> Clone for AvlTree<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            root: self.root,
            count: self.count,
            cmp: self.cmp.clone(),
            index: self.index.clone(),
            path: [NodeId::NIL; PATH_CAPACITY],
            went_left: [false; PATH_CAPACITY],
            id: next_tree_id(),
            version: 0,
            config: self.config,
            stats: TreeStats::default(),
        }
    }
}

impl<K: std::fmt::Debug, V: std::fmt::Debug, C: Comparator<K>> std::fmt::Debug
    for AvlTree<K, V, C>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, C: Comparator<K>> IntoIterator for &'a AvlTree<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Invariant checks
// =============================================================================

#[cfg(test)]
impl<K: Eq + Hash + std::fmt::Debug, V, C: Comparator<K>> AvlTree<K, V, C> {
    /// Walks every node and asserts height bookkeeping, balance, strict key
    /// order, the node count and the key index.
    pub(crate) fn validate(&self) {
        use crate::node::max_height_for_len;

        let mut stack: Vec<NodeId> = Vec::new();
        let mut seen = 0usize;
        let mut prev: Option<&K> = None;
        let mut cur = self.root;

        // Iterative in-order walk, independent of the cursor.
        while !cur.is_nil() || !stack.is_empty() {
            while !cur.is_nil() {
                stack.push(cur);
                cur = self.nodes[cur].left;
            }
            let Some(id) = stack.pop() else { break };
            let node = &self.nodes[id];

            let lh = self.nodes.height(node.left);
            let rh = self.nodes.height(node.right);
            assert_eq!(
                node.height,
                1 + lh.max(rh),
                "stored height must match children at {:?}",
                node.key
            );
            assert!(
                (lh - rh).abs() <= 1,
                "balance violated at {:?}: left {lh}, right {rh}",
                node.key
            );
            if let Some(p) = prev {
                assert_eq!(
                    self.cmp.compare(p, &node.key),
                    Ordering::Less,
                    "keys out of order: {p:?} before {:?}",
                    node.key
                );
            }
            assert!(
                self.index.contains(&node.key),
                "key index is missing {:?}",
                node.key
            );
            prev = Some(&node.key);
            seen += 1;
            cur = node.right;
        }

        assert_eq!(seen, self.count, "reachable nodes must match len()");
        assert_eq!(self.index.len(), self.count, "key index size must match len()");
        assert_eq!(self.nodes.live(), self.count, "arena must hold no orphans");
        assert!(self.height() <= max_height_for_len(self.count));
    }
}
