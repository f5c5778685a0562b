//! # flat-vect-tree
//!
//! Irregularly shaped nested arrays of a fixed depth, stored flat.
//!
//! A [`FlatVectTree`] of depth D keeps every leaf value in one `data` buffer
//! and one boundary-index sequence per level. Level 0 indexes into `data`;
//! level L indexes into level L-1. Node `k` at level L owns the children
//! `partition_index[L][k]..partition_index[L][k + 1]`, so nodes may have any
//! number of children and no per-node allocation is ever made.
//!
//! ## Example
//!
//! ```rust
//! use flat_vect_tree::{vect_tree, FlatVectTree};
//!
//! # fn main() -> Result<(), flat_vect_tree::Error> {
//! let mut tree: FlatVectTree<i32> = FlatVectTree::with_depth(2);
//! tree.push_back(vect_tree![[1, 2], [3, 4, 5]], None)?;
//!
//! assert_eq!(tree.level_size(1), Some(1));
//! assert_eq!(tree.level_size(0), Some(2));
//! assert_eq!(tree.data(), &[1, 2, 3, 4, 5]);
//! assert_eq!(tree.get_vect_tree(&[])?, vect_tree![[[1, 2], [3, 4, 5]]]);
//! assert_eq!(tree.leaves(&[0, 1])?, &[3, 4, 5]);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod config;
mod error;
mod layout;
mod shared;
mod vect_tree;

pub use config::Config;
pub use error::{AppendError, Error, ExCode, FetchError, LayoutError};
pub use layout::{is_valid_fvt, validate_parts, RawParts};
pub use shared::SharedFlatVectTree;
pub use vect_tree::{Element, Nested, VectTree};

use smallvec::{smallvec, SmallVec};
use std::ops::Range;
use tracing::{debug, trace};

// =============================================================================
// Append bookkeeping
// =============================================================================

/// What a pending append will add, counted before anything is written.
struct Tally {
    data: usize,
    /// New nodes per level.
    nodes: SmallVec<[usize; 8]>,
}

impl Tally {
    fn new(depth: usize) -> Self {
        Self {
            data: 0,
            nodes: smallvec![0; depth],
        }
    }

    /// Counts `node` as a new node at `level`. Returns `false` if its shape
    /// does not have nesting depth `level`.
    fn measure<T>(&mut self, node: &VectTree<T>, level: usize) -> bool {
        match node {
            VectTree::Leaf(values) => {
                if level != 0 {
                    return false;
                }
                self.nodes[0] += 1;
                self.data += values.len();
                true
            }
            VectTree::Node(children) => {
                if level == 0 {
                    return false;
                }
                self.nodes[level] += 1;
                children.iter().all(|child| self.measure(child, level - 1))
            }
        }
    }
}

/// Largest data length or node count a level's `u32` offsets can address.
const OFFSET_LIMIT: usize = u32::MAX as usize;

fn rejected(op: &'static str, err: AppendError) -> Error {
    debug!(op, %err, "append rejected");
    err.into()
}

// =============================================================================
// FlatVectTree
// =============================================================================

/// A depth-D nested array stored as a flat data buffer plus D levels of
/// boundary indices.
///
/// The whole tree reads back as a nested value of depth D: the sequence of
/// level-(D-1) nodes. Values only ever grow at the rightmost position.
#[derive(Clone)]
pub struct FlatVectTree<T> {
    /// One boundary sequence per level, innermost first. Each starts at 0 and
    /// has one more entry than the level has nodes.
    partition_index: Vec<Vec<u32>>,
    /// Leaf values in depth-first order.
    data: Vec<T>,
    config: Config,
}

impl<T: Element> FlatVectTree<T> {
    /// A truly empty tree: depth 0, nothing allocated.
    pub fn new() -> Self {
        Self {
            partition_index: Vec::new(),
            data: Vec::new(),
            config: Config::default(),
        }
    }

    /// An empty tree with `depth` levels.
    pub fn with_depth(depth: usize) -> Self {
        Self::with_config(depth, Config::default())
    }

    /// An empty tree with `depth` levels and the capacity hints in `config`.
    pub fn with_config(depth: usize, config: Config) -> Self {
        Self {
            partition_index: fresh_levels(depth, &config),
            data: Vec::with_capacity(config.data_capacity),
            config,
        }
    }

    /// A tree adopting `partition_index` and `data` after checking that they
    /// form a valid layout.
    pub fn from_parts(partition_index: Vec<Vec<u32>>, data: Vec<T>) -> Result<Self, Error> {
        validate_parts(&partition_index, &data)?;
        Ok(Self {
            partition_index,
            data,
            config: Config::default(),
        })
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    /// Number of levels.
    #[inline]
    pub fn depth(&self) -> usize {
        self.partition_index.len()
    }

    /// Number of nodes at `level`, or `None` if the tree has no such level.
    #[inline]
    pub fn level_size(&self, level: usize) -> Option<usize> {
        self.partition_index
            .get(level)
            .map(|index| index.len().saturating_sub(1))
    }

    /// Number of top-level nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.depth()
            .checked_sub(1)
            .map_or(0, |top| self.nodes_at(top))
    }

    /// `true` if the tree holds no nodes (at any level).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if the tree has no levels at all.
    #[inline]
    pub fn is_truly_empty(&self) -> bool {
        self.depth() == 0
    }

    /// The boundary-index levels, innermost first.
    pub fn partition_index(&self) -> &[Vec<u32>] {
        &self.partition_index
    }

    /// All leaf values in depth-first order.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The capacity hints this tree was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Heap bytes reserved by the data buffer and the index levels.
    pub fn memory_usage(&self) -> usize {
        self.data.capacity() * std::mem::size_of::<T>()
            + self.partition_index.capacity() * std::mem::size_of::<Vec<u32>>()
            + self
                .partition_index
                .iter()
                .map(|index| index.capacity() * std::mem::size_of::<u32>())
                .sum::<usize>()
    }

    /// Releases spare capacity in every buffer.
    pub fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
        self.partition_index.shrink_to_fit();
        for index in &mut self.partition_index {
            index.shrink_to_fit();
        }
    }

    #[inline]
    fn nodes_at(&self, level: usize) -> usize {
        self.partition_index[level].len().saturating_sub(1)
    }

    // -------------------------------------------------------------------------
    // Depth management
    // -------------------------------------------------------------------------

    /// Rebuilds the tree with `depth` empty levels.
    ///
    /// Returns `false` and leaves the tree untouched if it holds nodes and
    /// `depth` differs from the current depth.
    pub fn set_depth(&mut self, depth: usize) -> bool {
        if depth == self.depth() {
            return true;
        }
        if !self.is_empty() {
            debug!(
                from = self.depth(),
                to = depth,
                "refusing to change depth of a non-empty tree"
            );
            return false;
        }
        debug!(from = self.depth(), to = depth, "depth changed");
        self.partition_index = fresh_levels(depth, &self.config);
        self.data.clear();
        true
    }

    /// Removes every node, keeping the depth.
    pub fn clear(&mut self) {
        for index in &mut self.partition_index {
            index.clear();
            index.push(0);
        }
        self.data.clear();
    }

    /// Removes every node and every level, leaving the tree truly empty.
    pub fn reset(&mut self) {
        self.partition_index = Vec::new();
        self.data = Vec::new();
    }

    // -------------------------------------------------------------------------
    // Append / push_back
    // -------------------------------------------------------------------------

    /// Adds `value` as one new node at `insert_level` (default: the top level).
    ///
    /// `value` must have nesting depth `insert_level`. Below the top level,
    /// the node becomes the last child of the rightmost node one level up.
    /// Leaf buffers are moved into the tree.
    pub fn push_back(
        &mut self,
        value: impl Into<VectTree<T>>,
        insert_level: Option<usize>,
    ) -> Result<(), Error> {
        self.insert_owned("push_back", value.into(), insert_level, false, OFFSET_LIMIT)
    }

    /// Copying form of [`push_back`](Self::push_back).
    pub fn push_back_ref(
        &mut self,
        value: &VectTree<T>,
        insert_level: Option<usize>,
    ) -> Result<(), Error> {
        let level = self
            .prepare(value, insert_level, false, OFFSET_LIMIT)
            .map_err(|err| rejected("push_back", err))?;
        self.write_ref(value, level);
        self.attach(level);
        trace!(level, "push_back");
        Ok(())
    }

    /// Adds every child of `value` as a new node at `insert_level` (default:
    /// the top level).
    ///
    /// `value` must have nesting depth `insert_level + 1`. Appending a
    /// depth-D value to an empty depth-D tree reproduces it exactly. Leaf
    /// buffers are moved into the tree.
    pub fn append(
        &mut self,
        value: impl Into<VectTree<T>>,
        insert_level: Option<usize>,
    ) -> Result<(), Error> {
        self.insert_owned("append", value.into(), insert_level, true, OFFSET_LIMIT)
    }

    /// Copying form of [`append`](Self::append).
    pub fn append_ref(
        &mut self,
        value: &VectTree<T>,
        insert_level: Option<usize>,
    ) -> Result<(), Error> {
        let level = self
            .prepare(value, insert_level, true, OFFSET_LIMIT)
            .map_err(|err| rejected("append", err))?;
        let nodes = value.children().unwrap_or_default();
        for node in nodes {
            self.write_ref(node, level);
        }
        self.attach(level);
        trace!(level, nodes = nodes.len(), "append");
        Ok(())
    }

    /// Shared body of the owned `push_back` and `append`. `limit` caps the
    /// data length and every level's node count.
    fn insert_owned(
        &mut self,
        op: &'static str,
        value: VectTree<T>,
        insert_level: Option<usize>,
        batch: bool,
        limit: usize,
    ) -> Result<(), Error> {
        let level = self
            .prepare(&value, insert_level, batch, limit)
            .map_err(|err| rejected(op, err))?;
        let count = if batch {
            let nodes = match value {
                VectTree::Node(children) => children,
                leaf => vec![leaf],
            };
            let count = nodes.len();
            for node in nodes {
                self.write_owned(node, level);
            }
            count
        } else {
            self.write_owned(value, level);
            1
        };
        self.attach(level);
        trace!(level, nodes = count, "{}", op);
        Ok(())
    }

    /// Checks everything an append could trip over, so that the write that
    /// follows cannot fail halfway.
    fn prepare(
        &self,
        value: &VectTree<T>,
        insert_level: Option<usize>,
        batch: bool,
        limit: usize,
    ) -> Result<usize, AppendError> {
        let depth = self.depth();
        if depth == 0 {
            return Err(AppendError::NoDepth);
        }
        let level = insert_level.unwrap_or(depth - 1);
        if level >= depth {
            return Err(AppendError::LevelOutOfRange { level, depth });
        }
        if level + 1 < depth && self.nodes_at(level + 1) == 0 {
            return Err(AppendError::NoParent {
                parent_level: level + 1,
            });
        }

        let mut tally = Tally::new(depth);
        let fits = if batch {
            match value {
                VectTree::Node(children) => children.iter().all(|c| tally.measure(c, level)),
                VectTree::Leaf(_) => false,
            }
        } else {
            tally.measure(value, level)
        };
        if !fits {
            let expected = if batch { level + 1 } else { level };
            return Err(AppendError::ShapeMismatch { expected });
        }

        self.check_offsets(&tally, limit)?;
        Ok(level)
    }

    /// Rejects a pending append whose offsets would pass `limit`.
    fn check_offsets(&self, tally: &Tally, limit: usize) -> Result<(), AppendError> {
        if self.data.len() + tally.data > limit {
            return Err(AppendError::Overflow { level: 0 });
        }
        for level in 1..self.depth() {
            if self.nodes_at(level - 1) + tally.nodes[level - 1] > limit {
                return Err(AppendError::Overflow { level });
            }
        }
        Ok(())
    }

    fn write_owned(&mut self, node: VectTree<T>, level: usize) {
        match node {
            VectTree::Leaf(mut values) => {
                if self.data.is_empty() && self.data.capacity() < values.len() {
                    self.data = values;
                } else {
                    self.data.append(&mut values);
                }
                let end = self.data.len() as u32;
                self.partition_index[0].push(end);
            }
            VectTree::Node(children) => {
                for child in children {
                    self.write_owned(child, level - 1);
                }
                self.close_node(level);
            }
        }
    }

    fn write_ref(&mut self, node: &VectTree<T>, level: usize) {
        match node {
            VectTree::Leaf(values) => {
                self.data.extend_from_slice(values);
                let end = self.data.len() as u32;
                self.partition_index[0].push(end);
            }
            VectTree::Node(children) => {
                for child in children {
                    self.write_ref(child, level - 1);
                }
                self.close_node(level);
            }
        }
    }

    /// Ends a node at `level` covering every level-(level-1) node not yet
    /// claimed.
    #[inline]
    fn close_node(&mut self, level: usize) {
        let end = self.nodes_at(level - 1) as u32;
        self.partition_index[level].push(end);
    }

    /// Extends the rightmost node above `level` over the nodes just written.
    #[inline]
    fn attach(&mut self, level: usize) {
        if level + 1 < self.depth() {
            let end = self.nodes_at(level) as u32;
            if let Some(last) = self.partition_index[level + 1].last_mut() {
                *last = end;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Reconstruction
    // -------------------------------------------------------------------------

    /// Rebuilds the subtree at `indices` as a nested value.
    ///
    /// An empty path yields the whole tree. `indices[0]` picks a top-level
    /// node and every further index picks a child of the node before it.
    /// The result has nesting depth `depth() - indices.len()`.
    pub fn get_vect_tree(&self, indices: &[u32]) -> Result<VectTree<T>, Error> {
        let tree = match self.locate(indices)? {
            Some((level, k)) => self.materialize(level, k)?,
            None => {
                let top = self.depth() - 1;
                let children = (0..self.nodes_at(top))
                    .map(|k| self.materialize(top, k))
                    .collect::<Result<Vec<_>, _>>()?;
                VectTree::Node(children)
            }
        };
        Ok(tree)
    }

    /// Like [`get_vect_tree`](Self::get_vect_tree), typed as plain nested
    /// `Vec`s. `N` must have exactly the nesting depth of the subtree.
    pub fn get_nested<N: Nested<T>>(&self, indices: &[u32]) -> Result<N, Error> {
        let depth = self.depth();
        if depth > 0 && indices.len() <= depth && depth - indices.len() != N::DEPTH {
            return Err(FetchError::DepthMismatch {
                actual: depth - indices.len(),
                expected: N::DEPTH,
            }
            .into());
        }
        let tree = self.get_vect_tree(indices)?;
        N::from_vect_tree(tree).ok_or_else(|| {
            FetchError::DepthMismatch {
                actual: depth - indices.len(),
                expected: N::DEPTH,
            }
            .into()
        })
    }

    /// Position in `data` of every leaf under the node at `indices` (the whole
    /// tree for an empty path).
    pub fn leaf_range(&self, indices: &[u32]) -> Result<Range<usize>, Error> {
        let (mut level, mut nodes) = match self.locate(indices)? {
            Some((level, k)) => (level, k..k + 1),
            None => {
                let top = self.depth() - 1;
                (top, 0..self.nodes_at(top))
            }
        };
        loop {
            let index = &self.partition_index[level];
            let bounds = index
                .get(nodes.start)
                .zip(index.get(nodes.end))
                .map(|(&start, &end)| start as usize..end as usize)
                .filter(|range| range.start <= range.end)
                .ok_or(FetchError::Corrupt { level })?;
            if level == 0 {
                if bounds.end > self.data.len() {
                    return Err(FetchError::Corrupt { level }.into());
                }
                return Ok(bounds);
            }
            nodes = bounds;
            level -= 1;
        }
    }

    /// Every leaf under the node at `indices`, without copying.
    pub fn leaves(&self, indices: &[u32]) -> Result<&[T], Error> {
        let range = self.leaf_range(indices)?;
        Ok(&self.data[range])
    }

    /// Resolves a path to `(level, node)`, or `None` for the empty path.
    fn locate(&self, indices: &[u32]) -> Result<Option<(usize, usize)>, FetchError> {
        let depth = self.depth();
        if depth == 0 {
            return Err(FetchError::NoDepth);
        }
        if indices.len() > depth {
            return Err(FetchError::PathTooLong {
                len: indices.len(),
                depth,
            });
        }

        let mut level = depth - 1;
        let mut candidates = 0..self.nodes_at(level);
        let mut found = None;
        for &index in indices {
            if let Some(parent) = found {
                candidates = self.child_range(level, parent)?;
                level -= 1;
            }
            let k = candidates.start + index as usize;
            if k >= candidates.end {
                return Err(FetchError::OutOfRange {
                    level,
                    index,
                    available: candidates.len(),
                });
            }
            found = Some(k);
        }
        Ok(found.map(|k| (level, k)))
    }

    /// Children of node `k` at `level`: positions in `data` at level 0,
    /// otherwise node numbers at `level - 1`.
    fn child_range(&self, level: usize, k: usize) -> Result<Range<usize>, FetchError> {
        let index = &self.partition_index[level];
        let (start, end) = match (index.get(k), index.get(k + 1)) {
            (Some(&start), Some(&end)) if start <= end => (start as usize, end as usize),
            _ => return Err(FetchError::Corrupt { level }),
        };
        let bound = if level == 0 {
            self.data.len()
        } else {
            self.nodes_at(level - 1)
        };
        if end > bound {
            return Err(FetchError::Corrupt { level });
        }
        Ok(start..end)
    }

    fn materialize(&self, level: usize, k: usize) -> Result<VectTree<T>, FetchError> {
        let range = self.child_range(level, k)?;
        if level == 0 {
            return Ok(VectTree::Leaf(self.data[range].to_vec()));
        }
        range
            .map(|child| self.materialize(level - 1, child))
            .collect::<Result<Vec<_>, _>>()
            .map(VectTree::Node)
    }

    // -------------------------------------------------------------------------
    // Bulk assignment and release
    // -------------------------------------------------------------------------

    /// Replaces the contents with copies of `partition_index` and `data`.
    ///
    /// The depth becomes `partition_index.len()`. With `validate`, malformed
    /// buffers are rejected and the tree is left untouched.
    pub fn assign_parts<L: AsRef<[u32]>>(
        &mut self,
        partition_index: &[L],
        data: &[T],
        validate: bool,
    ) -> Result<(), Error> {
        if validate {
            validate_parts(partition_index, data).map_err(|err| {
                debug!(%err, "assign rejected");
                err
            })?;
        }
        self.partition_index = partition_index
            .iter()
            .map(|index| index.as_ref().to_vec())
            .collect();
        self.data.clear();
        self.data.extend_from_slice(data);
        debug!(depth = self.depth(), leaves = self.data.len(), "assigned copy");
        Ok(())
    }

    /// Replaces the contents by adopting `partition_index` and `data` without
    /// copying.
    pub fn assign_parts_owned(
        &mut self,
        partition_index: Vec<Vec<u32>>,
        data: Vec<T>,
        validate: bool,
    ) -> Result<(), Error> {
        if validate {
            validate_parts(&partition_index, &data).map_err(|err| {
                debug!(%err, "assign rejected");
                err
            })?;
        }
        self.partition_index = partition_index;
        self.data = data;
        debug!(depth = self.depth(), leaves = self.data.len(), "adopted buffers");
        Ok(())
    }

    /// Replaces the contents with a copy of `other`.
    pub fn assign(&mut self, other: &FlatVectTree<T>) {
        self.partition_index.clone_from(&other.partition_index);
        self.data.clone_from(&other.data);
    }

    /// Replaces the contents with those of `other`, leaving `other` truly
    /// empty.
    pub fn assign_take(&mut self, other: &mut FlatVectTree<T>) {
        let (partition_index, data) = other.release_mem();
        self.partition_index = partition_index;
        self.data = data;
    }

    /// Hands both buffers to the caller and leaves the tree truly empty.
    pub fn release_mem(&mut self) -> (Vec<Vec<u32>>, Vec<T>) {
        debug!(
            depth = self.depth(),
            leaves = self.data.len(),
            "releasing buffers"
        );
        (
            std::mem::take(&mut self.partition_index),
            std::mem::take(&mut self.data),
        )
    }

    /// Consuming form of [`release_mem`](Self::release_mem).
    pub fn into_parts(mut self) -> (Vec<Vec<u32>>, Vec<T>) {
        self.release_mem()
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Whether external buffers form a valid layout. See [`validate_parts`].
    pub fn is_valid_fvt<L: AsRef<[u32]>>(partition_index: &[L], data: &[T]) -> bool {
        is_valid_fvt(partition_index, data)
    }

    /// Checks this tree's own buffers. Only trees adopted without validation
    /// can fail.
    pub fn validate(&self) -> Result<(), LayoutError> {
        validate_parts(&self.partition_index, &self.data)
    }
}

fn fresh_levels(depth: usize, config: &Config) -> Vec<Vec<u32>> {
    (0..depth)
        .map(|_| {
            let mut index = Vec::with_capacity(config.index_capacity.max(1));
            index.push(0);
            index
        })
        .collect()
}

impl<T: Element> Default for FlatVectTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> PartialEq for FlatVectTree<T> {
    fn eq(&self, other: &Self) -> bool {
        self.partition_index == other.partition_index && self.data == other.data
    }
}

impl<T: Element> std::fmt::Debug for FlatVectTree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatVectTree")
            .field("partition_index", &self.partition_index)
            .field("data", &self.data)
            .finish()
    }
}

impl<T: Element> TryFrom<RawParts<T>> for FlatVectTree<T> {
    type Error = Error;

    fn try_from(parts: RawParts<T>) -> Result<Self, Error> {
        Self::from_parts(parts.partition_index, parts.data)
    }
}

impl<T: Element> From<FlatVectTree<T>> for RawParts<T> {
    fn from(tree: FlatVectTree<T>) -> Self {
        let (partition_index, data) = tree.into_parts();
        RawParts {
            partition_index,
            data,
        }
    }
}

#[cfg(feature = "serde")]
impl<T: Element + serde::Serialize> serde::Serialize for FlatVectTree<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("FlatVectTree", 2)?;
        state.serialize_field("partition_index", &self.partition_index)?;
        state.serialize_field("data", &self.data)?;
        state.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, T: Element + serde::Deserialize<'de>> serde::Deserialize<'de> for FlatVectTree<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let parts = RawParts::<T>::deserialize(deserializer)?;
        FlatVectTree::try_from(parts).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests;
