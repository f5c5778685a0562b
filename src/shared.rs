//! A [`FlatVectTree`] shared between threads.
//!
//! The tree itself has no interior synchronization. This wrapper puts it
//! behind a `parking_lot::RwLock`: fetches and property reads take the read
//! lock and run concurrently, mutations take the write lock and are
//! serialized against everything else.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{Element, Error, FlatVectTree, VectTree};

/// A thread-safe handle around a [`FlatVectTree`].
pub struct SharedFlatVectTree<T> {
    inner: RwLock<FlatVectTree<T>>,
}

impl<T: Element> SharedFlatVectTree<T> {
    /// Wraps an existing tree.
    pub fn new(tree: FlatVectTree<T>) -> Self {
        Self {
            inner: RwLock::new(tree),
        }
    }

    /// A shared, empty tree with `depth` levels.
    pub fn with_depth(depth: usize) -> Self {
        Self::new(FlatVectTree::with_depth(depth))
    }

    /// Locks the tree for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, FlatVectTree<T>> {
        self.inner.read()
    }

    /// Locks the tree for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, FlatVectTree<T>> {
        self.inner.write()
    }

    pub fn depth(&self) -> usize {
        self.inner.read().depth()
    }

    pub fn level_size(&self, level: usize) -> Option<usize> {
        self.inner.read().level_size(level)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn get_vect_tree(&self, indices: &[u32]) -> Result<VectTree<T>, Error> {
        self.inner.read().get_vect_tree(indices)
    }

    pub fn push_back(
        &self,
        value: impl Into<VectTree<T>>,
        insert_level: Option<usize>,
    ) -> Result<(), Error> {
        self.inner.write().push_back(value, insert_level)
    }

    pub fn append(
        &self,
        value: impl Into<VectTree<T>>,
        insert_level: Option<usize>,
    ) -> Result<(), Error> {
        self.inner.write().append(value, insert_level)
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Takes both buffers out, leaving the shared tree truly empty.
    pub fn release_mem(&self) -> (Vec<Vec<u32>>, Vec<T>) {
        self.inner.write().release_mem()
    }

    pub fn into_inner(self) -> FlatVectTree<T> {
        self.inner.into_inner()
    }
}

impl<T: Element> Default for SharedFlatVectTree<T> {
    fn default() -> Self {
        Self::new(FlatVectTree::new())
    }
}

impl<T: Element> From<FlatVectTree<T>> for SharedFlatVectTree<T> {
    fn from(tree: FlatVectTree<T>) -> Self {
        Self::new(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vect_tree;

    #[test]
    fn test_shared_basic() {
        let shared: SharedFlatVectTree<i32> = SharedFlatVectTree::with_depth(2);
        shared.push_back(vect_tree![[1, 2], [3]], None).unwrap();
        shared.append(vect_tree![[[4]]], None).unwrap();
        assert_eq!(shared.depth(), 2);
        assert_eq!(shared.len(), 2);
        assert_eq!(shared.level_size(0), Some(3));
        assert_eq!(shared.get_vect_tree(&[1, 0]).unwrap(), vect_tree![4]);

        let (index, data) = shared.release_mem();
        assert!(crate::is_valid_fvt(&index, &data));
        assert!(shared.read().is_truly_empty());
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let shared: SharedFlatVectTree<u64> = SharedFlatVectTree::with_depth(1);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200u64 {
                    shared.push_back(vec![i, i + 1], None).unwrap();
                }
            });
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let tree = shared.read();
                        assert!(tree.validate().is_ok());
                        let n = tree.len();
                        if n > 0 {
                            let last = tree.get_vect_tree(&[n as u32 - 1]).unwrap();
                            assert_eq!(last.len(), 2);
                        }
                    }
                });
            }
        });

        let tree = shared.into_inner();
        assert_eq!(tree.len(), 200);
        assert_eq!(tree.data().len(), 400);
    }

    #[test]
    fn test_write_guard() {
        let shared = SharedFlatVectTree::from(FlatVectTree::<u8>::with_depth(1));
        {
            let mut tree = shared.write();
            tree.push_back(vec![1u8], None).unwrap();
            tree.push_back(vec![2u8], None).unwrap();
        }
        assert_eq!(shared.len(), 2);
        shared.clear();
        assert!(shared.is_empty());
        assert_eq!(SharedFlatVectTree::<u8>::default().depth(), 0);
    }
}
