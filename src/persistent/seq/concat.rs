//! Flat concatenation.
//!
//! A concatenation node is a list of operands. Concatenating onto it pushes
//! into that list instead of nesting, and a concatenation on the right-hand
//! side is spliced in operand by operand, so the node never grows deeper than
//! one level however many concatenations are chained.
//!
//! Every version of a concatenation is a prefix of one shared, append-only
//! buffer: a node records the buffer and its own length. Pushing onto a node
//! whose length matches the buffer claims the next slot in place, even when
//! that node is shared; older versions keep reading their shorter prefix.
//! Only a push onto a node that is no longer the newest version copies, and
//! it copies operand references, never elements.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{Seq, SeqIter, SeqNode};

/// One version of a shared operand buffer.
pub(super) struct Operands<T> {
    buffer: Arc<RwLock<Vec<Seq<T>>>>,
    len: usize,
}

impl<T> Operands<T> {
    fn from_vec(operands: Vec<Seq<T>>) -> Self {
        let len = operands.len();
        Self {
            buffer: Arc::new(RwLock::new(operands)),
            len,
        }
    }

    #[inline]
    pub(super) const fn len(&self) -> usize {
        self.len
    }

    pub(super) fn get(&self, index: usize) -> Option<Seq<T>> {
        if index < self.len {
            self.buffer.read().get(index).cloned()
        } else {
            None
        }
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = Seq<T>> + '_ {
        (0..self.len).map_while(|index| self.get(index))
    }

    fn to_vec(&self) -> Vec<Seq<T>> {
        self.buffer.read()[..self.len].to_vec()
    }

    /// Returns the version holding `self` followed by `tail`.
    fn extend(&self, tail: Vec<Seq<T>>) -> Self {
        let len = self.len + tail.len();
        {
            let mut buffer = self.buffer.write();
            if buffer.len() == self.len {
                buffer.extend(tail);
                return Self {
                    buffer: Arc::clone(&self.buffer),
                    len,
                };
            }
        }
        let mut copied = Vec::with_capacity(len);
        copied.extend(self.buffer.read()[..self.len].iter().cloned());
        copied.extend(tail);
        Self::from_vec(copied)
    }
}

impl<T> Clone for Operands<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            len: self.len,
        }
    }
}

pub(super) fn concat<T>(left: Seq<T>, right: Seq<T>) -> Seq<T> {
    // Collected first: both sides may be versions of the same buffer.
    let tail = match right.node {
        SeqNode::Concat(operands) => operands.to_vec(),
        node => vec![Seq { node }],
    };
    let operands = match left.node {
        SeqNode::Concat(operands) => operands.extend(tail),
        node => {
            let mut operands = Vec::with_capacity(tail.len() + 1);
            operands.push(Seq { node });
            operands.extend(tail);
            Operands::from_vec(operands)
        }
    };
    Seq {
        node: SeqNode::Concat(operands),
    }
}

/// Walks the operands in order with at most one operand cursor open.
pub(super) struct ConcatCursor<T> {
    operands: Operands<T>,
    next: usize,
    current: Option<SeqIter<T>>,
}

impl<T> ConcatCursor<T> {
    pub(super) const fn new(operands: Operands<T>) -> Self {
        Self {
            operands,
            next: 0,
            current: None,
        }
    }
}

impl<T: Clone> ConcatCursor<T> {
    pub(super) fn next(&mut self) -> Option<T> {
        loop {
            if let Some(item) = self.current.as_mut().and_then(Iterator::next) {
                return Some(item);
            }
            // Close the exhausted operand before opening the next one.
            self.current = None;
            let operand = self.operands.get(self.next)?;
            self.next += 1;
            self.current = Some(operand.iter());
        }
    }
}
