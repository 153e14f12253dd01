//! Traversal cursors.
//!
//! A cursor is the only place traversal state lives. Nodes are never mutated
//! while iterated, so any number of cursors may walk the same sequence
//! independently, on any thread.

use std::iter::FusedIterator;
use std::sync::Arc;

use super::concat::ConcatCursor;

/// Owning iterator over a [`Seq`](super::Seq).
///
/// Created fresh by every call to [`Seq::iter`](super::Seq::iter); yields
/// elements by value.
pub struct SeqIter<T> {
    pub(super) state: Cursor<T>,
}

pub(super) enum Cursor<T> {
    Done,
    Strict { items: Arc<[T]>, index: usize },
    Concat(Box<ConcatCursor<T>>),
    Lazy(Box<dyn Iterator<Item = T> + Send>),
}

impl<T> SeqIter<T> {
    pub(super) const fn new(state: Cursor<T>) -> Self {
        Self { state }
    }

    pub(super) const fn done() -> Self {
        Self::new(Cursor::Done)
    }
}

impl<T: Clone> Iterator for SeqIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let next = match &mut self.state {
            Cursor::Done => return None,
            Cursor::Strict { items, index } => {
                let item = items.get(*index).cloned();
                *index += 1;
                item
            }
            Cursor::Concat(cursor) => cursor.next(),
            Cursor::Lazy(inner) => inner.next(),
        };
        if next.is_none() {
            // Release whatever the exhausted cursor still holds.
            self.state = Cursor::Done;
        }
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.state {
            Cursor::Done => (0, Some(0)),
            Cursor::Strict { items, index } => {
                let remaining = items.len().saturating_sub(*index);
                (remaining, Some(remaining))
            }
            Cursor::Concat(_) => (0, None),
            Cursor::Lazy(inner) => (0, inner.size_hint().1),
        }
    }
}

impl<T: Clone> FusedIterator for SeqIter<T> {}

static_assertions::assert_impl_all!(SeqIter<i32>: Send);
