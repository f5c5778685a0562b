//! Nested values that go into and come out of a [`FlatVectTree`](crate::FlatVectTree).
//!
//! A [`VectTree`] is the unflattened form: either a flat run of leaf values
//! or a sequence of subtrees. The nesting depth of a value is the number of
//! `Node` layers above its leaves, so a `Leaf` has depth 0.
//!
//! An empty `Node` has no leaves to pin its depth down and is accepted at any
//! nesting depth of 1 or more.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Leaf value types: the primitive numeric types and `bool`.
pub trait Element: Copy + PartialEq + std::fmt::Debug + Default + 'static {}

macro_rules! impl_element {
    ($($t:ty),* $(,)?) => {
        $(impl Element for $t {})*
    };
}

impl_element!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, bool);

/// A nested value of runtime-determined depth.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum VectTree<T> {
    /// A flat sequence of leaf values (nesting depth 0).
    Leaf(Vec<T>),
    /// A sequence of subtrees.
    Node(Vec<VectTree<T>>),
}

impl<T> VectTree<T> {
    /// An empty `Node`.
    pub fn new() -> Self {
        VectTree::Node(Vec::new())
    }

    /// The empty value of the given nesting depth.
    pub fn empty(depth: usize) -> Self {
        if depth == 0 {
            VectTree::Leaf(Vec::new())
        } else {
            VectTree::Node(Vec::new())
        }
    }

    /// Number of direct children (leaf values for a `Leaf`).
    pub fn len(&self) -> usize {
        match self {
            VectTree::Leaf(values) => values.len(),
            VectTree::Node(children) => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, VectTree::Leaf(_))
    }

    /// Whether this value can be stored as a node of nesting depth `depth`.
    pub fn fits_depth(&self, depth: usize) -> bool {
        match self {
            VectTree::Leaf(_) => depth == 0,
            VectTree::Node(children) => {
                depth > 0 && children.iter().all(|c| c.fits_depth(depth - 1))
            }
        }
    }

    /// The smallest nesting depth this value fits, or `None` if its
    /// branches disagree.
    pub fn depth(&self) -> Option<usize> {
        match self {
            VectTree::Leaf(_) => Some(0),
            VectTree::Node(children) => {
                let mut min = 1;
                for child in children {
                    min = min.max(child.depth()? + 1);
                }
                self.fits_depth(min).then_some(min)
            }
        }
    }

    /// Total number of leaf values.
    pub fn leaf_count(&self) -> usize {
        match self {
            VectTree::Leaf(values) => values.len(),
            VectTree::Node(children) => children.iter().map(VectTree::leaf_count).sum(),
        }
    }

    /// Leaf values in depth-first order.
    pub fn flatten(&self) -> Vec<T>
    where
        T: Copy,
    {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<T>)
    where
        T: Copy,
    {
        match self {
            VectTree::Leaf(values) => out.extend_from_slice(values),
            VectTree::Node(children) => {
                for child in children {
                    child.flatten_into(out);
                }
            }
        }
    }

    /// The direct children of a `Node`.
    pub fn children(&self) -> Option<&[VectTree<T>]> {
        match self {
            VectTree::Leaf(_) => None,
            VectTree::Node(children) => Some(children),
        }
    }

    /// The values of a `Leaf`.
    pub fn values(&self) -> Option<&[T]> {
        match self {
            VectTree::Leaf(values) => Some(values),
            VectTree::Node(_) => None,
        }
    }
}

impl<T> Default for VectTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain nested `Vec`s of a statically known depth.
///
/// `Vec<T>` has depth 0, `Vec<Vec<T>>` depth 1 and so on, up to depth 3.
pub trait Nested<T: Element>: Sized {
    /// Nesting depth of `Self`.
    const DEPTH: usize;

    fn into_vect_tree(self) -> VectTree<T>;

    /// Converts back, or returns `None` if `tree` does not have depth
    /// [`Self::DEPTH`].
    fn from_vect_tree(tree: VectTree<T>) -> Option<Self>;
}

impl<T: Element> Nested<T> for Vec<T> {
    const DEPTH: usize = 0;

    fn into_vect_tree(self) -> VectTree<T> {
        VectTree::Leaf(self)
    }

    fn from_vect_tree(tree: VectTree<T>) -> Option<Self> {
        match tree {
            VectTree::Leaf(values) => Some(values),
            VectTree::Node(_) => None,
        }
    }
}

macro_rules! impl_nested {
    ($depth:expr, $inner:ty) => {
        impl<T: Element> Nested<T> for Vec<$inner> {
            const DEPTH: usize = $depth;

            fn into_vect_tree(self) -> VectTree<T> {
                VectTree::Node(
                    self.into_iter()
                        .map(<$inner as Nested<T>>::into_vect_tree)
                        .collect(),
                )
            }

            fn from_vect_tree(tree: VectTree<T>) -> Option<Self> {
                match tree {
                    VectTree::Leaf(_) => None,
                    VectTree::Node(children) => children
                        .into_iter()
                        .map(<$inner as Nested<T>>::from_vect_tree)
                        .collect(),
                }
            }
        }

        impl<T: Element> From<Vec<$inner>> for VectTree<T> {
            fn from(value: Vec<$inner>) -> Self {
                value.into_vect_tree()
            }
        }
    };
}

impl_nested!(1, Vec<T>);
impl_nested!(2, Vec<Vec<T>>);
impl_nested!(3, Vec<Vec<Vec<T>>>);

impl<T: Element> From<Vec<T>> for VectTree<T> {
    fn from(value: Vec<T>) -> Self {
        VectTree::Leaf(value)
    }
}

/// Builds a [`VectTree`] from bracketed literals.
///
/// Bracketed groups become `Node`s and bare expressions become a `Leaf`.
/// An empty invocation is an empty `Node`; use `vect_tree!(leaf)` for an
/// empty `Leaf`.
///
/// ```rust
/// use flat_vect_tree::{vect_tree, VectTree};
///
/// let v: VectTree<i32> = vect_tree![[1, 2], [3, 4, 5]];
/// assert_eq!(v.depth(), Some(1));
/// assert_eq!(v.flatten(), vec![1, 2, 3, 4, 5]);
/// ```
#[macro_export]
macro_rules! vect_tree {
    (leaf) => {
        $crate::VectTree::Leaf(::std::vec::Vec::new())
    };
    ($([$($inner:tt)*]),+ $(,)?) => {
        $crate::VectTree::Node(::std::vec![$($crate::vect_tree![$($inner)*]),+])
    };
    ($($x:expr),+ $(,)?) => {
        $crate::VectTree::Leaf(::std::vec![$($x),+])
    };
    () => {
        $crate::VectTree::Node(::std::vec::Vec::new())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_shapes() {
        let leaf: VectTree<i32> = vect_tree![1, 2, 3];
        assert_eq!(leaf, VectTree::Leaf(vec![1, 2, 3]));

        let nested: VectTree<i32> = vect_tree![[1, 2], [3]];
        assert_eq!(
            nested,
            VectTree::Node(vec![VectTree::Leaf(vec![1, 2]), VectTree::Leaf(vec![3])])
        );

        let empty_leaf: VectTree<i32> = vect_tree!(leaf);
        assert_eq!(empty_leaf, VectTree::Leaf(vec![]));

        let empty_node: VectTree<i32> = vect_tree![];
        assert_eq!(empty_node, VectTree::Node(vec![]));

        let with_empty_child: VectTree<i32> = vect_tree![[[leaf]], [[1]]];
        assert_eq!(with_empty_child.depth(), Some(2));
    }

    #[test]
    fn test_depth_and_fit() {
        let v: VectTree<u8> = vect_tree![[[1], [2, 3]], [[4]]];
        assert_eq!(v.depth(), Some(2));
        assert!(v.fits_depth(2));
        assert!(!v.fits_depth(1));
        assert!(!v.fits_depth(3));

        let empty: VectTree<u8> = VectTree::new();
        assert_eq!(empty.depth(), Some(1));
        assert!(empty.fits_depth(1));
        assert!(empty.fits_depth(5));
        assert!(!empty.fits_depth(0));

        // An empty child adapts to its siblings.
        let v: VectTree<u8> = VectTree::Node(vec![VectTree::new(), vect_tree![[1]]]);
        assert_eq!(v.depth(), Some(2));
    }

    #[test]
    fn test_ragged_has_no_depth() {
        let v: VectTree<u8> = VectTree::Node(vec![vect_tree![1], vect_tree![[2]]]);
        assert_eq!(v.depth(), None);
        assert!(!v.fits_depth(1));
        assert!(!v.fits_depth(2));
    }

    #[test]
    fn test_flatten() {
        let v: VectTree<f64> = vect_tree![[1.0], [], [2.0, 3.0]];
        assert_eq!(v.leaf_count(), 3);
        assert_eq!(v.flatten(), vec![1.0, 2.0, 3.0]);
        assert_eq!(v.len(), 3);
        assert!(!v.is_leaf());
        assert_eq!(v.children().map(<[_]>::len), Some(3));
        assert_eq!(v.values(), None);
    }

    #[test]
    fn test_nested_conversions() {
        let raw = vec![vec![vec![1u32, 2], vec![]], vec![vec![3]]];
        assert_eq!(<Vec<Vec<Vec<u32>>> as Nested<u32>>::DEPTH, 2);

        let tree: VectTree<u32> = raw.clone().into();
        assert_eq!(tree.depth(), Some(2));
        assert_eq!(tree, vect_tree![[[1, 2], [leaf]], [[3]]]);

        let back = <Vec<Vec<Vec<u32>>>>::from_vect_tree(tree.clone());
        assert_eq!(back, Some(raw));
        assert_eq!(<Vec<Vec<u32>>>::from_vect_tree(tree), None);
        assert_eq!(<Vec<u32>>::from_vect_tree(vect_tree![[1u32]]), None);
    }

    #[test]
    fn test_empty_of_depth() {
        assert_eq!(VectTree::<i8>::empty(0), VectTree::Leaf(vec![]));
        assert_eq!(VectTree::<i8>::empty(3), VectTree::Node(vec![]));
    }
}
