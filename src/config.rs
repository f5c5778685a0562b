//! Construction-time configuration.

/// Capacity hints for a [`FlatVectTree`](crate::FlatVectTree).
///
/// The hints are reserved up front by
/// [`FlatVectTree::with_config`](crate::FlatVectTree::with_config) and
/// re-applied by `set_depth` when it rebuilds the levels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Number of leaf values to reserve.
    pub data_capacity: usize,
    /// Number of boundary entries to reserve on every level.
    pub index_capacity: usize,
}

impl Config {
    /// Hints sized for roughly `nodes` nodes per level holding `leaves`
    /// values in total.
    pub fn with_capacity(nodes: usize, leaves: usize) -> Self {
        Self {
            data_capacity: leaves,
            index_capacity: nodes.saturating_add(1),
        }
    }
}
