//! Well-formedness checks for raw `(partition_index, data)` buffers.
//!
//! A layout with D levels is valid when:
//! - every level has at least one entry and starts at 0,
//! - every level is non-decreasing,
//! - the last entry of level L > 0 equals the node count of level L-1,
//! - the last entry of level 0 equals the data length.
//!
//! Zero levels is valid only with no data.

use crate::error::LayoutError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Checks `partition_index`/`data` against the layout invariants and
/// names the first one that fails.
pub fn validate_parts<L, T>(partition_index: &[L], data: &[T]) -> Result<(), LayoutError>
where
    L: AsRef<[u32]>,
{
    if partition_index.is_empty() {
        if !data.is_empty() {
            return Err(LayoutError::DataWithoutLevels(data.len()));
        }
        return Ok(());
    }

    for (level, index) in partition_index.iter().enumerate() {
        let index = index.as_ref();
        let (&first, &last) = match (index.first(), index.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(LayoutError::EmptyLevel(level)),
        };
        if first != 0 {
            return Err(LayoutError::NonZeroStart { level, first });
        }
        if let Some(at) = index.windows(2).position(|w| w[0] > w[1]) {
            return Err(LayoutError::Decreasing { level, at: at + 1 });
        }

        if level == 0 {
            if last as usize != data.len() {
                return Err(LayoutError::DataMismatch {
                    last,
                    len: data.len(),
                });
            }
        } else {
            let nodes = partition_index[level - 1].as_ref().len() - 1;
            if last as usize != nodes {
                return Err(LayoutError::LevelMismatch { level, last, nodes });
            }
        }
    }

    Ok(())
}

/// `true` if `partition_index`/`data` form a valid flat vector tree.
pub fn is_valid_fvt<L, T>(partition_index: &[L], data: &[T]) -> bool
where
    L: AsRef<[u32]>,
{
    validate_parts(partition_index, data).is_ok()
}

/// The two backing buffers of a tree, as stored and serialized.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawParts<T> {
    /// One boundary-index sequence per level, innermost first.
    pub partition_index: Vec<Vec<u32>>,
    /// Leaf values in depth-first order.
    pub data: Vec<T>,
}

impl<T> RawParts<T> {
    pub fn validate(&self) -> Result<(), LayoutError> {
        validate_parts(&self.partition_index, &self.data)
    }
}
