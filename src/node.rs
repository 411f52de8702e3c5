// =============================================================================
// Node handles
// =============================================================================

/// Handle of a node inside a tree's [`NodeArena`].
///
/// Handles are plain indices; rotations re-assign handle fields and never
/// alias a node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    pub(crate) const NIL: NodeId = NodeId(u32::MAX);

    #[inline]
    pub(crate) fn is_nil(self) -> bool {
        self == Self::NIL
    }

    #[inline]
    fn index(self) -> usize {
        debug_assert!(!self.is_nil());
        self.0 as usize
    }
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_nil() {
            f.write_str("NIL")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Height reported for a missing child.
pub(crate) const NIL_HEIGHT: i32 = -1;

// =============================================================================
// Nodes
// =============================================================================

#[derive(Clone, Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: NodeId,
    pub(crate) right: NodeId,
    /// `1 + max(height(left), height(right))`; a leaf has height 0.
    pub(crate) height: i32,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Self {
        Self {
            key,
            value,
            left: NodeId::NIL,
            right: NodeId::NIL,
            height: 0,
        }
    }

    #[inline]
    pub(crate) fn has_two_children(&self) -> bool {
        !self.left.is_nil() && !self.right.is_nil()
    }
}

// =============================================================================
// Arena
// =============================================================================

/// Dense node store with a free list of vacated slots.
#[derive(Clone)]
pub(crate) struct NodeArena<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<NodeId>,
}

impl<K, V> NodeArena<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live nodes.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Stores a new leaf, reusing a vacated slot when one exists.
    ///
    /// Returns `None` once every 32-bit handle below [`NodeId::NIL`] is taken.
    pub(crate) fn alloc(&mut self, key: K, value: V) -> Option<NodeId> {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(Node::leaf(key, value));
            return Some(id);
        }
        let idx = u32::try_from(self.slots.len()).ok()?;
        if idx == NodeId::NIL.0 {
            return None;
        }
        self.slots.push(Some(Node::leaf(key, value)));
        Some(NodeId(idx))
    }

    /// Vacates a slot and hands back its payload.
    pub(crate) fn free(&mut self, id: NodeId) -> Option<(K, V)> {
        let node = self.slots.get_mut(id.index())?.take()?;
        self.free.push(id);
        Some((node.key, node.value))
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    /// Non-panicking lookup for handles that may have gone stale.
    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<K, V>> {
        if id.is_nil() {
            return None;
        }
        self.slots.get(id.index())?.as_ref()
    }

    #[inline]
    pub(crate) fn height(&self, id: NodeId) -> i32 {
        if id.is_nil() {
            NIL_HEIGHT
        } else {
            self[id].height
        }
    }

    /// Recomputes a node's height from its children and returns it.
    #[inline]
    pub(crate) fn update_height(&mut self, id: NodeId) -> i32 {
        let node = &self[id];
        let h = 1 + self.height(node.left).max(self.height(node.right));
        self[id].height = h;
        h
    }

    /// `height(left) - height(right)`.
    #[inline]
    pub(crate) fn balance(&self, id: NodeId) -> i32 {
        let node = &self[id];
        self.height(node.left) - self.height(node.right)
    }

    /// Exchanges the key/value payloads of two distinct nodes, leaving links
    /// and heights in place.
    pub(crate) fn swap_payload(&mut self, a: NodeId, b: NodeId) {
        debug_assert_ne!(a, b);
        let (lo, hi) = if a.index() < b.index() { (a, b) } else { (b, a) };
        let (head, tail) = self.slots.split_at_mut(hi.index());
        if let (Some(x), Some(y)) = (head[lo.index()].as_mut(), tail[0].as_mut()) {
            std::mem::swap(&mut x.key, &mut y.key);
            std::mem::swap(&mut x.value, &mut y.value);
        }
    }
}

impl<K, V> std::ops::Index<NodeId> for NodeArena<K, V> {
    type Output = Node<K, V>;

    #[inline]
    fn index(&self, id: NodeId) -> &Node<K, V> {
        match self.slots[id.index()].as_ref() {
            Some(node) => node,
            None => unreachable!("live tree links to vacated slot {id:?}"),
        }
    }
}

impl<K, V> std::ops::IndexMut<NodeId> for NodeArena<K, V> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match self.slots[id.index()].as_mut() {
            Some(node) => node,
            None => unreachable!("live tree links to vacated slot {id:?}"),
        }
    }
}

// =============================================================================
// Height bounds
// =============================================================================

/// Fewest nodes an AVL tree of height `h` can hold.
///
/// `N(h) = N(h-1) + N(h-2) + 1` with `N(-1) = 0` and `N(0) = 1`. Saturates at
/// `u64::MAX`.
pub fn min_nodes_for_height(h: i32) -> u64 {
    checked_min_nodes(h).unwrap_or(u64::MAX)
}

/// `None` once `N(h)` no longer fits in a `u64`.
fn checked_min_nodes(h: i32) -> Option<u64> {
    if h < 0 {
        return Some(0);
    }
    let (mut prev, mut cur) = (0u64, 1u64);
    for _ in 0..h {
        let next = cur.checked_add(prev)?.checked_add(1)?;
        prev = cur;
        cur = next;
    }
    Some(cur)
}

/// Tallest height an AVL tree holding `len` nodes can reach; `-1` when empty.
pub fn max_height_for_len(len: usize) -> i32 {
    let len = len as u64;
    let mut h = -1;
    while let Some(next) = checked_min_nodes(h + 1) {
        if next > len {
            break;
        }
        h += 1;
    }
    h
}
