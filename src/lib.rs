//! # avl-rs
//!
//! A height-balanced ordered map (AVL tree) with seekable, resumable cursors.
//!
//! Nodes live in an arena addressed by 32-bit handles. Insertion and removal
//! descend once, record the path in fixed-size buffers owned by the tree, and
//! rebalance bottom-up along that path without recursion. Cursors walk the
//! tree with an explicit frame stack and can seek to the smallest key at or
//! after a target in one descent.
//!
//! ## Example
//!
//! ```rust
//! use avl_rs::{AvlError, AvlTree};
//!
//! let mut tree: AvlTree<u32, &str> = AvlTree::new();
//! tree.insert(10, "ten").unwrap();
//! tree.insert(20, "twenty").unwrap();
//! tree.insert(5, "five").unwrap();
//!
//! assert_eq!(tree.get(&10), Some(&"ten"));
//! assert_eq!(tree.insert(10, "again"), Err(AvlError::DuplicateKey));
//!
//! let tail: Vec<u32> = tree.range_from(&6).map(|(k, _)| *k).collect();
//! assert_eq!(tail, vec![10, 20]);
//!
//! assert!(tree.remove(&10));
//! assert!(!tree.contains_key(&10));
//! ```

#![deny(unsafe_code)]

mod compare;
mod config;
mod cursor;
mod error;
mod node;
mod tree;

pub use compare::{Comparator, NaturalOrder, Reverse, SignComparator};
pub use config::AvlConfig;
pub use cursor::{Cursor, Iter};
pub use error::{AvlError, Result};
pub use node::{max_height_for_len, min_nodes_for_height};
pub use tree::{AvlTree, TreeStats};

// =============================================================================
// Configuration
// =============================================================================

/// Length of a tree's descent buffers and of each cursor's frame stack.
///
/// Node handles are 32-bit, and an AVL tree holding `u32::MAX` nodes is less
/// than 48 levels tall.
pub const PATH_CAPACITY: usize = 96;


#[cfg(test)]
mod proptests;
