/// Errors raised by tree and cursor operations.
///
/// Absence is not an error: lookups return `Option` and removals report
/// whether anything was removed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AvlError {
    /// An equal key is already stored. The tree was left untouched.
    #[error("key is already present in the tree")]
    DuplicateKey,

    /// A cursor was used with, or copied from, a cursor bound to another tree.
    #[error("cursor is bound to a different tree")]
    CrossTree,

    /// The tree was mutated after the cursor captured its version.
    #[error("tree was modified while a cursor was in use (captured version {captured}, live version {live})")]
    ConcurrentModification { captured: u64, live: u64 },

    /// The node arena ran out of 32-bit handles.
    #[error("node arena is full")]
    CapacityExhausted,
}

/// Result type for tree and cursor operations.
pub type Result<T, E = AvlError> = std::result::Result<T, E>;
