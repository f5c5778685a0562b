//! Error types.

use thiserror::Error as ThisError;

/// Numeric failure codes, matching the codes host bindings report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExCode {
    /// An append or push_back was rejected.
    InvalidAppend = 0x01,
    /// A fetch path was rejected.
    InvalidFetch = 0x02,
}

/// Any error reported by a [`FlatVectTree`](crate::FlatVectTree).
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The value handed to `append`/`push_back` does not fit the tree.
    #[error("invalid append: {0}")]
    InvalidAppend(#[from] AppendError),

    /// The index path handed to a fetch does not address a node.
    #[error("invalid fetch: {0}")]
    InvalidFetch(#[from] FetchError),

    /// Raw buffers handed to `assign_parts`/`from_parts` are malformed.
    #[error("invalid layout: {0}")]
    InvalidLayout(#[from] LayoutError),
}

impl Error {
    /// The host-facing code for this error, if it has one.
    ///
    /// Layout errors have no code of their own; bindings report them as
    /// load failures.
    pub fn code(&self) -> Option<ExCode> {
        match self {
            Error::InvalidAppend(_) => Some(ExCode::InvalidAppend),
            Error::InvalidFetch(_) => Some(ExCode::InvalidFetch),
            Error::InvalidLayout(_) => None,
        }
    }
}

/// Why an append or push_back was rejected.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum AppendError {
    /// The tree has no levels.
    #[error("the tree has depth 0")]
    NoDepth,

    /// The insert level is outside `0..depth`.
    #[error("insert level {level} is out of range for a tree of depth {depth}")]
    LevelOutOfRange {
        /// Requested insert level.
        level: usize,
        /// Depth of the tree.
        depth: usize,
    },

    /// The value's nesting does not match the insert level.
    #[error("value does not have nesting depth {expected}")]
    ShapeMismatch {
        /// Nesting depth the value needed.
        expected: usize,
    },

    /// Nodes below the top level need an existing parent to attach to.
    #[error("no node exists at level {parent_level} to receive children")]
    NoParent {
        /// Level that has no nodes yet.
        parent_level: usize,
    },

    /// The result would not be addressable with 32-bit offsets.
    #[error("level {level} would exceed u32 offsets")]
    Overflow {
        /// Level (or data, reported as level 0) that overflowed.
        level: usize,
    },
}

/// Why a fetch was rejected.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The tree has no levels.
    #[error("the tree has depth 0")]
    NoDepth,

    /// The index path is longer than the tree is deep.
    #[error("path of length {len} is too long for a tree of depth {depth}")]
    PathTooLong {
        /// Length of the path.
        len: usize,
        /// Depth of the tree.
        depth: usize,
    },

    /// An index along the path is past the end of its parent's children.
    #[error("index {index} is out of range at level {level} ({available} available)")]
    OutOfRange {
        /// Level the index was resolved at.
        level: usize,
        /// Offending index, relative to its parent.
        index: u32,
        /// Number of nodes that were addressable.
        available: usize,
    },

    /// Stored offsets point outside the buffers they index.
    #[error("corrupt offsets at level {level}")]
    Corrupt {
        /// Level holding the bad offsets.
        level: usize,
    },

    /// The subtree does not have the nesting depth the caller asked for.
    #[error("subtree has nesting depth {actual}, expected {expected}")]
    DepthMismatch {
        /// Depth implied by the path.
        actual: usize,
        /// Depth of the requested output type.
        expected: usize,
    },
}

/// Which layout invariant raw buffers break.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Data is present but there are no levels to index it.
    #[error("{0} data value(s) but no index levels")]
    DataWithoutLevels(usize),

    /// A level has no entries at all.
    #[error("level {0} is empty")]
    EmptyLevel(usize),

    /// A level does not start at 0.
    #[error("level {level} starts at {first}, not 0")]
    NonZeroStart {
        /// Offending level.
        level: usize,
        /// Its first entry.
        first: u32,
    },

    /// A level has a decreasing pair of entries.
    #[error("level {level} decreases at entry {at}")]
    Decreasing {
        /// Offending level.
        level: usize,
        /// Index of the entry smaller than its predecessor.
        at: usize,
    },

    /// A level does not consume exactly all nodes of the level below it.
    #[error("level {level} ends at {last} but level {below} has {nodes} node(s)", below = .level - 1)]
    LevelMismatch {
        /// Offending level.
        level: usize,
        /// Its last entry.
        last: u32,
        /// Number of nodes at the level below.
        nodes: usize,
    },

    /// Level 0 does not consume exactly all of the data.
    #[error("level 0 ends at {last} but there are {len} data value(s)")]
    DataMismatch {
        /// Last entry of level 0.
        last: u32,
        /// Length of the data buffer.
        len: usize,
    },
}
