//! Lazily composed immutable sequence.
//!
//! A [`Seq`] is one of four kinds of node:
//!
//! | Node | Holds | Built by |
//! |------|-------|----------|
//! | empty | nothing | [`Seq::empty`], [`Default`] |
//! | strict | a shared slice | [`From<Vec<T>>`], [`FromIterator`], [`Seq::singleton`] |
//! | concatenation | a flat list of operands | [`Seq::concat`], [`Seq::push_back`] |
//! | lazy | a recipe | [`Seq::bind`], [`Seq::map`], [`Seq::generate`] |
//!
//! Composition never touches elements. Concatenation is amortized O(1) and
//! keeps the node flat; bind and map record the function and evaluate it
//! one source element at a time during traversal. Traversal state lives in
//! the [`SeqIter`] returned by [`Seq::iter`], so a sequence can be traversed
//! any number of times, concurrently, and always yields the same elements
//! (as long as the functions it was built from are pure).
//!
//! # Examples
//!
//! ```rust
//! use lambars_aff::persistent::Seq;
//!
//! let seq = Seq::from(vec![1, 2])
//!     .concat(Seq::singleton(3))
//!     .concat(Seq::empty())
//!     .concat(Seq::from(vec![4, 5]));
//!
//! assert_eq!(seq.operand_count(), 4);
//! assert_eq!(seq.to_vec(), vec![1, 2, 3, 4, 5]);
//!
//! let pairs = seq.bind(|x| Seq::from(vec![x, x * 10]));
//! assert_eq!(pairs.head(), Some(1));
//! assert_eq!(pairs.count(), 10);
//! ```

mod bind;
mod concat;
mod cursor;

use std::fmt;
use std::sync::Arc;

use bind::{BindNode, Generated, LazySource, MapNode};
use concat::{ConcatCursor, Operands};
use cursor::Cursor;

pub use cursor::SeqIter;

/// An immutable ordered sequence with lazy composition.
pub struct Seq<T> {
    node: SeqNode<T>,
}

enum SeqNode<T> {
    Empty,
    Strict(Arc<[T]>),
    /// Operands are never concatenation nodes themselves.
    Concat(Operands<T>),
    Lazy(Arc<dyn LazySource<T>>),
}

impl<T> Seq<T> {
    /// Creates an empty sequence.
    ///
    /// ```rust
    /// use lambars_aff::persistent::Seq;
    ///
    /// let seq: Seq<i32> = Seq::empty();
    /// assert!(seq.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            node: SeqNode::Empty,
        }
    }

    /// Opens a fresh cursor at the start of the sequence.
    ///
    /// Cursors are independent of each other and of any composition applied
    /// to the sequence afterwards.
    #[must_use]
    pub fn iter(&self) -> SeqIter<T> {
        match &self.node {
            SeqNode::Empty => SeqIter::done(),
            SeqNode::Strict(items) => SeqIter::new(Cursor::Strict {
                items: Arc::clone(items),
                index: 0,
            }),
            SeqNode::Concat(operands) => SeqIter::new(Cursor::Concat(Box::new(
                ConcatCursor::new(operands.clone()),
            ))),
            SeqNode::Lazy(source) => SeqIter::new(Cursor::Lazy(source.cursor())),
        }
    }

    /// Number of operands held by the top-level node.
    ///
    /// A concatenation of `n` sequences reports `n`, an empty sequence `0`
    /// and every other sequence `1`.
    #[must_use]
    pub fn operand_count(&self) -> usize {
        match &self.node {
            SeqNode::Empty => 0,
            SeqNode::Concat(operands) => operands.len(),
            SeqNode::Strict(_) | SeqNode::Lazy(_) => 1,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Seq<T> {
    /// Creates a sequence of one element.
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self {
            node: SeqNode::Strict(Arc::new([element])),
        }
    }

    /// Creates a sequence whose elements are produced by `factory`.
    ///
    /// `factory` is called once per traversal, so it should return the same
    /// elements every time.
    ///
    /// ```rust
    /// use lambars_aff::persistent::Seq;
    ///
    /// let squares = Seq::generate(|| (1..=3).map(|x| x * x));
    /// assert_eq!(squares.to_vec(), vec![1, 4, 9]);
    /// assert_eq!(squares.to_vec(), vec![1, 4, 9]);
    /// ```
    pub fn generate<F, I>(factory: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self {
            node: SeqNode::Lazy(Arc::new(Generated::new(factory))),
        }
    }

    /// Appends `other` after `self`.
    ///
    /// The result is a single flat concatenation node: operands of either
    /// side that are concatenations themselves are merged in rather than
    /// nested. Amortized O(1), whether or not `self` is shared.
    #[must_use]
    pub fn concat(self, other: Self) -> Self {
        concat::concat(self, other)
    }

    /// Returns `self` followed by `other`, leaving both untouched.
    ///
    /// Repeatedly appending onto the newest version of a sequence stays
    /// amortized O(1) per call.
    ///
    /// ```rust
    /// use lambars_aff::persistent::Seq;
    ///
    /// let part = Seq::from(vec![1, 2]);
    /// let mut accumulator = Seq::empty();
    /// for _ in 0..3 {
    ///     accumulator = accumulator.append(&part);
    /// }
    /// assert_eq!(accumulator.to_vec(), vec![1, 2, 1, 2, 1, 2]);
    /// ```
    #[must_use]
    pub fn append(&self, other: &Self) -> Self {
        self.clone().concat(other.clone())
    }

    /// Appends a single element.
    #[must_use]
    pub fn push_back(self, element: T) -> Self {
        self.concat(Self::singleton(element))
    }

    /// Concatenates every sequence in order.
    pub fn concat_all<I>(sequences: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut sequences = sequences.into_iter();
        let Some(first) = sequences.next() else {
            return Self::empty();
        };
        sequences.fold(first, Self::concat)
    }

    /// Replaces each element with the sequence `function` builds from it.
    ///
    /// Nothing is evaluated here. During traversal `function` is called once
    /// per source element reached, and only when the previous element's
    /// sub-sequence is exhausted.
    pub fn bind<U, F>(&self, function: F) -> Seq<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> Seq<U> + Send + Sync + 'static,
    {
        if matches!(self.node, SeqNode::Empty) {
            return Seq::empty();
        }
        Seq {
            node: SeqNode::Lazy(Arc::new(BindNode::new(self.clone(), function))),
        }
    }

    /// Lazily applies `function` to each element.
    pub fn map<U, F>(&self, function: F) -> Seq<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        if matches!(self.node, SeqNode::Empty) {
            return Seq::empty();
        }
        Seq {
            node: SeqNode::Lazy(Arc::new(MapNode::new(self.clone(), function))),
        }
    }

    /// Returns `true` if the sequence has no elements.
    ///
    /// Lazy nodes are checked by opening a cursor and pulling one element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.node {
            SeqNode::Empty => true,
            SeqNode::Strict(items) => items.is_empty(),
            SeqNode::Concat(operands) => operands.iter().all(|operand| operand.is_empty()),
            SeqNode::Lazy(_) => self.iter().next().is_none(),
        }
    }

    /// Number of elements. Traverses lazy nodes.
    #[must_use]
    pub fn count(&self) -> usize {
        match &self.node {
            SeqNode::Empty => 0,
            SeqNode::Strict(items) => items.len(),
            SeqNode::Concat(operands) => operands.iter().map(|operand| operand.count()).sum(),
            SeqNode::Lazy(_) => self.iter().count(),
        }
    }

    /// The first element, if any.
    #[must_use]
    pub fn head(&self) -> Option<T> {
        self.iter().next()
    }

    /// Collects the elements into a `Vec`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<T: Clone + Send + Sync + 'static> Seq<Seq<T>> {
    /// Flattens one level of nesting, lazily.
    ///
    /// ```rust
    /// use lambars_aff::persistent::Seq;
    ///
    /// let nested = Seq::from(vec![Seq::from(vec![1, 2]), Seq::empty(), Seq::singleton(3)]);
    /// assert_eq!(nested.flatten().to_vec(), vec![1, 2, 3]);
    /// ```
    #[must_use]
    pub fn flatten(&self) -> Seq<T> {
        self.bind(|inner| inner)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<T> Clone for Seq<T> {
    fn clone(&self) -> Self {
        let node = match &self.node {
            SeqNode::Empty => SeqNode::Empty,
            SeqNode::Strict(items) => SeqNode::Strict(Arc::clone(items)),
            SeqNode::Concat(operands) => SeqNode::Concat(operands.clone()),
            SeqNode::Lazy(source) => SeqNode::Lazy(Arc::clone(source)),
        };
        Self { node }
    }
}

impl<T> Default for Seq<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Vec<T>> for Seq<T> {
    fn from(elements: Vec<T>) -> Self {
        if elements.is_empty() {
            return Self::empty();
        }
        Self {
            node: SeqNode::Strict(Arc::from(elements)),
        }
    }
}

impl<T> FromIterator<T> for Seq<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T: Clone> IntoIterator for Seq<T> {
    type Item = T;
    type IntoIter = SeqIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone> IntoIterator for &Seq<T> {
    type Item = T;
    type IntoIter = SeqIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone + PartialEq> PartialEq for Seq<T> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<T: Clone + Eq> Eq for Seq<T> {}

impl<T: Clone + fmt::Debug> fmt::Debug for Seq<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

static_assertions::assert_impl_all!(Seq<i32>: Send, Sync, Clone, Default);

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize + Clone> serde::Serialize for Seq<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let cursor = self.iter();
        let (lower, upper) = cursor.size_hint();
        let mut seq = serializer.serialize_seq((upper == Some(lower)).then_some(lower))?;
        for element in cursor {
            seq.serialize_element(&element)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct SeqVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<T> SeqVisitor<T> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for SeqVisitor<T>
where
    T: serde::Deserialize<'de>,
{
    type Value = Seq<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut elements = Vec::with_capacity(access.size_hint().unwrap_or(0).min(4096));
        while let Some(element) = access.next_element()? {
            elements.push(element);
        }
        Ok(Seq::from(elements))
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for Seq<T>
where
    T: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(SeqVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Seq::empty(), 0)]
    #[case(Seq::from(vec![]), 0)]
    #[case(Seq::singleton(1), 1)]
    #[case(Seq::from(vec![1, 2]).concat(Seq::from(vec![3])), 2)]
    #[case(Seq::from(vec![1]).map(|x| x + 1), 1)]
    fn test_operand_count(#[case] seq: Seq<i32>, #[case] expected: usize) {
        assert_eq!(seq.operand_count(), expected);
    }

    #[rstest]
    fn test_bind_on_empty_stays_empty() {
        let seq: Seq<i32> = Seq::empty();
        let bound = seq.bind(|x| Seq::singleton(x));
        assert!(matches!(bound.node, SeqNode::Empty));
    }

    #[rstest]
    fn test_is_empty_across_node_kinds() {
        let empty_concat: Seq<i32> = Seq::empty().concat(Seq::from(vec![]));
        assert!(empty_concat.is_empty());

        let empty_lazy = Seq::from(vec![1, 2]).bind(|_| Seq::<i32>::empty());
        assert!(empty_lazy.is_empty());

        assert!(!Seq::singleton(0).is_empty());
    }

    #[rstest]
    fn test_append_leaves_operands_untouched() {
        let left = Seq::from(vec![1, 2]);
        let right = Seq::from(vec![3]);
        let joined = left.append(&right);
        assert_eq!(joined.to_vec(), vec![1, 2, 3]);
        assert_eq!(left.to_vec(), vec![1, 2]);
        assert_eq!(right.to_vec(), vec![3]);
    }

    #[rstest]
    fn test_push_back_appends_in_order() {
        let seq = (1..=4).fold(Seq::empty(), Seq::push_back);
        assert_eq!(seq.to_vec(), vec![1, 2, 3, 4]);
    }

    #[rstest]
    fn test_concat_all_of_nothing_is_empty() {
        let seq: Seq<i32> = Seq::concat_all(Vec::new());
        assert!(matches!(seq.node, SeqNode::Empty));
    }

    #[rstest]
    fn test_equality_ignores_structure() {
        let strict = Seq::from(vec![1, 2, 3]);
        let composed = Seq::singleton(1).concat(Seq::from(vec![2, 3]));
        let mapped = Seq::from(vec![0, 1, 2]).map(|x| x + 1);
        assert_eq!(strict, composed);
        assert_eq!(strict, mapped);
        assert_ne!(strict, Seq::from(vec![1, 2]));
    }

    #[rstest]
    fn test_debug_lists_elements() {
        let seq = Seq::from(vec![1, 2]).push_back(3);
        assert_eq!(format!("{seq:?}"), "[1, 2, 3]");
    }

    #[rstest]
    fn test_borrowed_into_iterator() {
        let seq = Seq::from(vec![1, 2, 3]);
        let mut total = 0;
        for element in &seq {
            total += element;
        }
        assert_eq!(total, 6);
    }
}
