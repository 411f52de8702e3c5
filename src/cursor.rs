use std::cmp::Ordering;
use std::iter::FusedIterator;

use tracing::debug;

use crate::compare::{Comparator, NaturalOrder};
use crate::error::{AvlError, Result};
use crate::node::NodeId;
use crate::tree::AvlTree;
use crate::PATH_CAPACITY;

/// One ancestor on the cursor's current path.
#[derive(Clone, Copy, Debug)]
struct Frame {
    node: NodeId,
    left_done: bool,
    self_done: bool,
    right_done: bool,
}

impl Frame {
    const EMPTY: Frame = Frame {
        node: NodeId::NIL,
        left_done: false,
        self_done: false,
        right_done: false,
    };

    #[inline]
    fn fresh(node: NodeId) -> Self {
        Self { node, ..Self::EMPTY }
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// A resumable in-order cursor over an [`AvlTree`].
///
/// The cursor holds no borrow of its tree: every call takes the tree it was
/// created from, and handing it any other tree fails with
/// [`AvlError::CrossTree`]. The tree may therefore be mutated while a cursor
/// exists. With [`AvlConfig::check_staleness`](crate::AvlConfig) set, the
/// next use of the cursor after such a mutation fails with
/// [`AvlError::ConcurrentModification`]; without it, the cursor never panics
/// but its output is unspecified.
///
/// ```rust
/// use avl_rs::AvlTree;
///
/// let mut tree: AvlTree<u32, &str> = AvlTree::new();
/// for (k, v) in [(1, "a"), (5, "b"), (9, "c"), (20, "d")] {
///     tree.insert(k, v).unwrap();
/// }
///
/// let mut cursor = tree.cursor();
/// cursor.seek_ceiling(&tree, &6).unwrap();
/// assert!(cursor.move_next(&tree).unwrap());
/// assert_eq!(cursor.current(&tree).unwrap(), Some((&9, &"c")));
/// ```
#[derive(Clone)]
pub struct Cursor {
    tree_id: u64,
    /// Fixed-size frame stack; `frames[..sp]` is live.
    frames: Box<[Frame]>,
    sp: usize,
    current: NodeId,
    /// Tree version captured on construction, reset and seek.
    version: u64,
    check_staleness: bool,
    track_stats: bool,
    steps: u64,
}

impl Cursor {
    pub(crate) fn new<K, V, C>(tree: &AvlTree<K, V, C>) -> Self {
        let config = tree.config();
        let mut cursor = Self {
            tree_id: tree.id(),
            frames: vec![Frame::EMPTY; PATH_CAPACITY].into_boxed_slice(),
            sp: 0,
            current: NodeId::NIL,
            version: tree.version(),
            check_staleness: config.check_staleness,
            track_stats: config.track_stats,
            steps: 0,
        };
        cursor.rewind(tree);
        cursor
    }

    /// Number of successful [`move_next`](Cursor::move_next) calls, when the
    /// tree tracks stats.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether [`current`](Cursor::current) has an entry to report.
    pub fn is_positioned(&self) -> bool {
        !self.current.is_nil()
    }

    fn check_bound<K, V, C>(&self, tree: &AvlTree<K, V, C>) -> Result<()> {
        if tree.id() != self.tree_id {
            debug!(
                cursor_tree = self.tree_id,
                tree = tree.id(),
                "cursor used with a different tree"
            );
            return Err(AvlError::CrossTree);
        }
        Ok(())
    }

    fn check_fresh<K, V, C>(&self, tree: &AvlTree<K, V, C>) -> Result<()> {
        self.check_bound(tree)?;
        if self.check_staleness && tree.version() != self.version {
            debug!(
                captured = self.version,
                live = tree.version(),
                "cursor invalidated by tree mutation"
            );
            return Err(AvlError::ConcurrentModification {
                captured: self.version,
                live: tree.version(),
            });
        }
        Ok(())
    }

    /// Back to before-first, capturing the tree's version.
    fn rewind<K, V, C>(&mut self, tree: &AvlTree<K, V, C>) {
        self.sp = 0;
        self.current = NodeId::NIL;
        self.version = tree.version();
        let root = tree.root();
        if !root.is_nil() {
            self.push(Frame::fresh(root));
        }
    }

    /// Returns `false` when the frame stack is full, which only a stale
    /// unchecked cursor can reach.
    #[inline]
    fn push(&mut self, frame: Frame) -> bool {
        if self.sp == self.frames.len() {
            return false;
        }
        self.frames[self.sp] = frame;
        self.sp += 1;
        true
    }

    /// Advances to the next key in ascending order.
    ///
    /// Returns `Ok(false)` once the keys are exhausted, and keeps doing so.
    pub fn move_next<K, V, C>(&mut self, tree: &AvlTree<K, V, C>) -> Result<bool> {
        self.check_fresh(tree)?;
        let nodes = tree.nodes();

        while self.sp > 0 {
            let top = self.sp - 1;
            let frame = self.frames[top];
            let Some(node) = nodes.get(frame.node) else {
                self.sp -= 1;
                continue;
            };

            if !frame.left_done {
                self.frames[top].left_done = true;
                if !node.left.is_nil() && !self.push(Frame::fresh(node.left)) {
                    break;
                }
            } else if !frame.self_done {
                self.frames[top].self_done = true;
                self.current = frame.node;
                if self.track_stats {
                    self.steps += 1;
                }
                return Ok(true);
            } else if !frame.right_done {
                self.frames[top].right_done = true;
                if !node.right.is_nil() && !self.push(Frame::fresh(node.right)) {
                    break;
                }
            } else {
                self.sp -= 1;
            }
        }

        self.sp = 0;
        self.current = NodeId::NIL;
        Ok(false)
    }

    /// The entry under the cursor, or `None` before the first successful
    /// [`move_next`](Cursor::move_next) and after exhaustion.
    pub fn current<'t, K, V, C>(
        &self,
        tree: &'t AvlTree<K, V, C>,
    ) -> Result<Option<(&'t K, &'t V)>> {
        self.check_fresh(tree)?;
        Ok(tree
            .nodes()
            .get(self.current)
            .map(|node| (&node.key, &node.value)))
    }

    /// Returns to before-first and recaptures the tree's version.
    pub fn reset<K, V, C>(&mut self, tree: &AvlTree<K, V, C>) -> Result<()> {
        self.check_bound(tree)?;
        self.rewind(tree);
        Ok(())
    }

    /// Positions the cursor so the next [`move_next`](Cursor::move_next)
    /// yields the smallest key `>= target`, or `false` if there is none.
    ///
    /// One descent from the root. Nodes below `target` are recorded as fully
    /// visited, so popping them afterwards leaves the nearest ancestor
    /// `>= target` on top of the stack.
    pub fn seek_ceiling<K, V, C: Comparator<K>>(
        &mut self,
        tree: &AvlTree<K, V, C>,
        target: &K,
    ) -> Result<()> {
        self.check_bound(tree)?;
        self.descend_to_ceiling(tree, target);
        Ok(())
    }

    fn descend_to_ceiling<K, V, C: Comparator<K>>(
        &mut self,
        tree: &AvlTree<K, V, C>,
        target: &K,
    ) {
        self.sp = 0;
        self.current = NodeId::NIL;
        self.version = tree.version();

        let nodes = tree.nodes();
        let mut cur = tree.root();
        while let Some(node) = nodes.get(cur) {
            let (frame, next) = match tree.comparator().compare(target, &node.key) {
                Ordering::Equal => {
                    let frame = Frame {
                        node: cur,
                        left_done: true,
                        ..Frame::EMPTY
                    };
                    (frame, NodeId::NIL)
                }
                // Candidate; look for a tighter one on the left.
                Ordering::Less => {
                    let frame = Frame {
                        node: cur,
                        left_done: true,
                        ..Frame::EMPTY
                    };
                    (frame, node.left)
                }
                // This node and its left subtree are all below target.
                Ordering::Greater => {
                    let frame = Frame {
                        node: cur,
                        left_done: true,
                        self_done: true,
                        right_done: true,
                    };
                    (frame, node.right)
                }
            };
            let pushed = self.push(frame);
            debug_assert!(pushed, "seek deeper than the frame stack");
            cur = next;
        }

        while self.sp > 0 && self.frames[self.sp - 1].self_done {
            self.sp -= 1;
        }
    }

    /// Takes over `other`'s position, including its captured version.
    pub fn copy_position(&mut self, other: &Cursor) -> Result<()> {
        if other.tree_id != self.tree_id {
            debug!(
                from = other.tree_id,
                into = self.tree_id,
                "refusing to copy cursor position across trees"
            );
            return Err(AvlError::CrossTree);
        }
        self.frames[..other.sp].copy_from_slice(&other.frames[..other.sp]);
        self.sp = other.sp;
        self.current = other.current;
        self.version = other.version;
        Ok(())
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("tree_id", &self.tree_id)
            .field("depth", &self.sp)
            .field("current", &self.current)
            .field("version", &self.version)
            .finish()
    }
}

// =============================================================================
// Borrowing iterator
// =============================================================================

/// Ascending iterator over an [`AvlTree`], built on a [`Cursor`].
///
/// It borrows the tree, so the tree cannot change underneath it.
pub struct Iter<'a, K, V, C = NaturalOrder> {
    tree: &'a AvlTree<K, V, C>,
    cursor: Cursor,
}

impl<'a, K, V, C: Comparator<K>> Iter<'a, K, V, C> {
    pub(crate) fn new(tree: &'a AvlTree<K, V, C>) -> Self {
        Self {
            tree,
            cursor: Cursor::new(tree),
        }
    }

    pub(crate) fn from_ceiling(tree: &'a AvlTree<K, V, C>, from: &K) -> Self {
        let mut cursor = Cursor::new(tree);
        cursor.descend_to_ceiling(tree, from);
        Self { tree, cursor }
    }
}

impl<'a, K, V, C> Iterator for Iter<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.move_next(self.tree) {
            Ok(true) => self.cursor.current(self.tree).ok().flatten(),
            _ => None,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.tree.len()))
    }
}

impl<K, V, C> FusedIterator for Iter<'_, K, V, C> {}
