//! Lazy nodes: bind, map and generated sequences.
//!
//! A lazy node stores what to compute, never how far it got. Each traversal
//! asks the node for a new cursor, so a node can be walked again or walked
//! concurrently from several threads.

use std::sync::Arc;

use super::{Seq, SeqIter};

/// A node whose elements are produced on demand.
pub(super) trait LazySource<T>: Send + Sync {
    /// Opens a new, independent traversal.
    fn cursor(&self) -> Box<dyn Iterator<Item = T> + Send>;
}

// =============================================================================
// Bind
// =============================================================================

/// `source >>= transform`.
pub(super) struct BindNode<T, F> {
    source: Seq<T>,
    transform: Arc<F>,
}

impl<T, F> BindNode<T, F> {
    pub(super) fn new(source: Seq<T>, transform: F) -> Self {
        Self {
            source,
            transform: Arc::new(transform),
        }
    }
}

impl<T, U, F> LazySource<U> for BindNode<T, F>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    F: Fn(T) -> Seq<U> + Send + Sync + 'static,
{
    fn cursor(&self) -> Box<dyn Iterator<Item = U> + Send> {
        Box::new(BindCursor {
            source: self.source.iter(),
            current: None,
            transform: Arc::clone(&self.transform),
        })
    }
}

/// Holds one source cursor and at most one sub-sequence cursor.
struct BindCursor<T, U, F> {
    source: SeqIter<T>,
    current: Option<SeqIter<U>>,
    transform: Arc<F>,
}

impl<T, U, F> Iterator for BindCursor<T, U, F>
where
    T: Clone,
    U: Clone,
    F: Fn(T) -> Seq<U>,
{
    type Item = U;

    fn next(&mut self) -> Option<U> {
        loop {
            if let Some(item) = self.current.as_mut().and_then(Iterator::next) {
                return Some(item);
            }
            self.current = None;
            let element = self.source.next()?;
            self.current = Some((*self.transform)(element).iter());
        }
    }
}

// =============================================================================
// Map
// =============================================================================

pub(super) struct MapNode<T, F> {
    source: Seq<T>,
    function: Arc<F>,
}

impl<T, F> MapNode<T, F> {
    pub(super) fn new(source: Seq<T>, function: F) -> Self {
        Self {
            source,
            function: Arc::new(function),
        }
    }
}

impl<T, U, F> LazySource<U> for MapNode<T, F>
where
    T: Clone + Send + Sync + 'static,
    U: 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    fn cursor(&self) -> Box<dyn Iterator<Item = U> + Send> {
        let function = Arc::clone(&self.function);
        Box::new(self.source.iter().map(move |element| (*function)(element)))
    }
}

// =============================================================================
// Generated
// =============================================================================

/// A sequence re-produced by `factory` on every traversal.
pub(super) struct Generated<F> {
    factory: F,
}

impl<F> Generated<F> {
    pub(super) const fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<T, F, I> LazySource<T> for Generated<F>
where
    T: 'static,
    F: Fn() -> I + Send + Sync,
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
{
    fn cursor(&self) -> Box<dyn Iterator<Item = T> + Send> {
        Box::new((self.factory)().into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[rstest]
    fn test_bind_cursor_holds_one_sub_sequence() {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opened);
        let node = BindNode::new(Seq::from(vec![1, 2, 3]), move |x: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Seq::from(vec![x, x * 10])
        });

        let mut cursor = node.cursor();
        assert_eq!(opened.load(Ordering::SeqCst), 0);
        assert_eq!(cursor.next(), Some(1));
        assert_eq!(cursor.next(), Some(10));
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(cursor.next(), Some(2));
        assert_eq!(opened.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    fn test_bind_skips_empty_sub_sequences() {
        let node = BindNode::new(Seq::from(vec![0, 1, 0, 2]), |x: i32| {
            Seq::from(vec![x; usize::try_from(x).unwrap_or(0)])
        });
        assert_eq!(node.cursor().collect::<Vec<_>>(), vec![1, 2, 2]);
    }

    #[rstest]
    fn test_map_cursor_is_restartable() {
        let node = MapNode::new(Seq::from(vec![1, 2]), |x: i32| x + 1);
        assert_eq!(node.cursor().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(node.cursor().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[rstest]
    fn test_generated_calls_factory_per_traversal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let node = Generated::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            0..3
        });
        let _: Vec<i32> = node.cursor().collect();
        let _: Vec<i32> = node.cursor().collect();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
