//! Tree configuration.
//!
//! Both switches are diagnostics: a tree behaves identically with them off,
//! except that misuse of a cursor after a mutation is no longer reported.
//!
//! | Flag | Effect | Default |
//! |------|--------|---------|
//! | `check_staleness` | cursors fail with [`AvlError::ConcurrentModification`] after a mutation | on in debug builds |
//! | `track_stats` | rotation counts and cursor step counts are recorded | on in debug builds |
//!
//! [`AvlError::ConcurrentModification`]: crate::AvlError::ConcurrentModification

/// Diagnostic switches for an [`AvlTree`](crate::AvlTree) and its cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvlConfig {
    /// Validate a cursor's captured version against the tree on every use.
    pub check_staleness: bool,
    /// Record rotation and traversal counters.
    pub track_stats: bool,
}

impl AvlConfig {
    /// Both diagnostics disabled.
    pub const RELEASE: Self = Self {
        check_staleness: false,
        track_stats: false,
    };

    /// Both diagnostics enabled.
    pub const CHECKED: Self = Self {
        check_staleness: true,
        track_stats: true,
    };

    #[must_use]
    pub fn with_staleness_checks(mut self, enabled: bool) -> Self {
        self.check_staleness = enabled;
        self
    }

    #[must_use]
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.track_stats = enabled;
        self
    }
}

impl Default for AvlConfig {
    fn default() -> Self {
        Self {
            check_staleness: cfg!(debug_assertions),
            track_stats: cfg!(debug_assertions),
        }
    }
}
