//! Type-erased effect nodes.
//!
//! [`Aff<A, Env>`](super::Aff) is a typed facade over [`Node`]. Values flowing
//! between nodes are boxed as `dyn Any + Send` so that a single enum can hold
//! bind chains whose intermediate types differ; the typed layer restores
//! them with [`unerase`] at the edges.
//!
//! ```text
//! Node = Pure(value) | Fail(error) | Sync(thunk) | Lifted(thunk)
//!      | Bind(source, k) | Catch(source, predicate, handler)
//!      | Choose(primary, alternative) | Finalize(source, finalizer)
//!      | UseAcquire(acquire, prepare) | Actions(effects, seed, combine)
//! ```
//!
//! Nodes are built once and consumed by the engine; nothing mutates a node in
//! place. Sub-nodes are held in a [`Child`], which frees its subtree with an
//! explicit worklist, so a tree too deep for the call stack can still be
//! dropped without running it.

use std::any::Any;

use futures::future::BoxFuture;
use smallvec::SmallVec;

use super::environment::Environment;
use super::error::{Error, Outcome};

/// A value travelling through the engine with its type erased.
pub(crate) type Value = Box<dyn Any + Send>;

pub(crate) type Continuation<Env> = Box<dyn FnOnce(Value) -> Node<Env> + Send>;

pub(crate) type Predicate = Box<dyn FnOnce(&Error) -> bool + Send>;

pub(crate) type Handler<Env> = Box<dyn FnOnce(Error) -> Node<Env> + Send>;

pub(crate) type Prepare<Env> = Box<dyn FnOnce(Value) -> Scope<Env> + Send>;

pub(crate) type Combine = Box<dyn FnMut(Value, Value) -> Value + Send>;

pub(crate) type Effects<Env> = Box<dyn Iterator<Item = Node<Env>> + Send>;

/// One step of a deferred computation.
pub(crate) enum Node<Env> {
    /// Always succeeds with the value.
    Pure(Value),
    /// Always fails with the error.
    Fail(Error),
    /// Synchronous side effect, run in place by the engine.
    Sync(Box<dyn FnOnce(&Environment<Env>) -> Outcome<Value> + Send>),
    /// Asynchronous leaf, handed to the host scheduler.
    Lifted(Box<dyn FnOnce(Environment<Env>) -> BoxFuture<'static, Outcome<Value>> + Send>),
    /// Runs `source`, then feeds its value to the continuation.
    Bind(Child<Env>, Continuation<Env>),
    /// Recovers from failures of `source` matching `predicate`.
    Catch {
        source: Child<Env>,
        predicate: Predicate,
        handler: Handler<Env>,
    },
    /// Runs `alternative` when `primary` fails.
    Choose {
        primary: Child<Env>,
        alternative: Child<Env>,
    },
    /// Runs `finalizer` after `source` on every exit path.
    Finalize {
        source: Child<Env>,
        finalizer: Child<Env>,
    },
    /// Acquires a handle, then runs the scope built from it.
    UseAcquire {
        acquire: Child<Env>,
        prepare: Prepare<Env>,
    },
    /// Runs each effect in order, folding successes into `seed`.
    Actions {
        effects: Effects<Env>,
        seed: Value,
        combine: Combine,
    },
}

/// An owned sub-node.
pub(crate) struct Child<Env>(Option<Box<Node<Env>>>);

impl<Env> Child<Env> {
    #[inline]
    pub(crate) fn new(node: Node<Env>) -> Self {
        Self(Some(Box::new(node)))
    }

    /// Hands the sub-node to the engine.
    ///
    /// # Panics
    ///
    /// Never in practice: the slot is only emptied by `into_node` itself,
    /// which consumes the child, or by `drop`.
    #[inline]
    pub(crate) fn into_node(mut self) -> Node<Env> {
        *self
            .0
            .take()
            .expect("Aff internal error: child node was already taken.")
    }

    fn detach(mut self) -> Option<Box<Node<Env>>> {
        self.0.take()
    }
}

impl<Env> Drop for Child<Env> {
    fn drop(&mut self) {
        let Some(root) = self.0.take() else {
            return;
        };
        let mut pending: SmallVec<[Box<Node<Env>>; 4]> = SmallVec::new();
        pending.push(root);
        while let Some(node) = pending.pop() {
            match *node {
                Node::Bind(source, _)
                | Node::Catch { source, .. }
                | Node::UseAcquire {
                    acquire: source, ..
                } => pending.extend(source.detach()),
                Node::Choose {
                    primary: first,
                    alternative: second,
                }
                | Node::Finalize {
                    source: first,
                    finalizer: second,
                } => {
                    pending.extend(first.detach());
                    pending.extend(second.detach());
                }
                Node::Pure(_) | Node::Fail(_) | Node::Sync(_) | Node::Lifted(_) | Node::Actions { .. } => {}
            }
        }
    }
}

/// The body and release action derived from an acquired handle.
pub(crate) struct Scope<Env> {
    pub(crate) body: Box<dyn FnOnce() -> Node<Env> + Send>,
    pub(crate) release: Node<Env>,
}

impl<Env> Node<Env> {
    /// Name of the variant, for diagnostics.
    pub(crate) const fn tag(&self) -> &'static str {
        match self {
            Self::Pure(_) => "Pure",
            Self::Fail(_) => "Fail",
            Self::Sync(_) => "Sync",
            Self::Lifted(_) => "Lifted",
            Self::Bind(..) => "Bind",
            Self::Catch { .. } => "Catch",
            Self::Choose { .. } => "Choose",
            Self::Finalize { .. } => "Finalize",
            Self::UseAcquire { .. } => "UseAcquire",
            Self::Actions { .. } => "Actions",
        }
    }
}

#[inline]
pub(crate) fn erase<A: Send + 'static>(value: A) -> Value {
    Box::new(value)
}

/// Restores a value erased by [`erase`].
///
/// # Panics
///
/// Panics when the value has a different type. The typed `Aff` layer makes
/// that unreachable.
#[inline]
pub(crate) fn unerase<A: 'static>(value: Value) -> A {
    *value.downcast::<A>().expect(
        "Aff internal error: erased value has an unexpected type. \
         This indicates a node was built outside the typed layer.",
    )
}
