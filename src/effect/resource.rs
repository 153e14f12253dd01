//! Resource-safe scoping.
//!
//! [`Aff::use_resource`] pairs an acquisition with a guaranteed release:
//!
//! 1. the body is built and run at most once, and only if acquisition
//!    succeeded;
//! 2. the handle is released exactly once after the body completes, whether
//!    it succeeded, failed or was cancelled;
//! 3. a failing release is logged and suppressed; it never replaces the
//!    body's outcome.
//!
//! Failed acquisitions release nothing, since nothing was acquired. Nested
//! scopes release in reverse order of acquisition.
//!
//! [`Aff::finally`] is the handle-free variant: it runs a finalizer on every
//! exit path, and the finalizer's failure is reported only when the guarded
//! computation itself succeeded.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use lambars_aff::effect::{Aff, Environment, Outcome, Release};
//!
//! struct Connection {
//!     closed: Arc<AtomicBool>,
//! }
//!
//! impl Release for Connection {
//!     fn release(&self) -> Outcome<()> {
//!         self.closed.store(true, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! let closed = Arc::new(AtomicBool::new(false));
//! let connection = Connection { closed: Arc::clone(&closed) };
//!
//! let query = Aff::use_resource(Aff::pure(connection), |_connection| {
//!     Aff::<u32>::fail_with("query failed")
//! });
//!
//! assert!(query.run_blocking(&Environment::default()).is_err());
//! assert!(closed.load(Ordering::SeqCst));
//! ```

use std::sync::Arc;

use super::aff::Aff;
use super::error::Outcome;
use super::node::{Child, Node, Scope, Value, unerase};

/// A handle that can be released.
///
/// The release operation is invoked exactly once by the resource guard.
pub trait Release: Send + Sync + 'static {
    /// Releases the underlying resource.
    ///
    /// # Errors
    ///
    /// Returns the failure to release. The guard logs it and keeps the
    /// outcome of the body.
    fn release(&self) -> Outcome<()>;
}

impl<T: Release + ?Sized> Release for Box<T> {
    fn release(&self) -> Outcome<()> {
        (**self).release()
    }
}

impl<T: Release + ?Sized> Release for Arc<T> {
    fn release(&self) -> Outcome<()> {
        (**self).release()
    }
}

impl<R, Env> Aff<R, Env>
where
    R: Send + 'static,
    Env: Send + Sync + 'static,
{
    /// Acquires a handle, runs `body` with it, then runs `release` on it.
    ///
    /// This is the general form behind the `use_*` family: `release` is any
    /// effect, so it may be asynchronous. Its failure is suppressed.
    pub fn bracket<H, B, L>(acquire: Aff<H, Env>, body: B, release: L) -> Self
    where
        H: Send + Sync + 'static,
        B: FnOnce(Arc<H>) -> Self + Send + 'static,
        L: FnOnce(Arc<H>) -> Aff<(), Env> + Send + 'static,
    {
        let prepare = move |handle: Value| {
            let handle = Arc::new(unerase::<H>(handle));
            let released = Arc::clone(&handle);
            Scope {
                body: Box::new(move || body(handle).node),
                release: Aff::defer(move || release(released)).node,
            }
        };
        Self::from_node(Node::UseAcquire {
            acquire: Child::new(acquire.node),
            prepare: Box::new(prepare),
        })
    }

    /// Acquires a [`Release`] handle and scopes an effectful body to it.
    pub fn use_resource<H, B>(acquire: Aff<H, Env>, body: B) -> Self
    where
        H: Release,
        B: FnOnce(Arc<H>) -> Self + Send + 'static,
    {
        Self::bracket(acquire, body, |handle| {
            Aff::lift_sync(move || handle.release())
        })
    }

    /// Like [`use_resource`](Self::use_resource) with a synchronous body
    /// that borrows the handle.
    pub fn use_sync<H, B>(acquire: Aff<H, Env>, body: B) -> Self
    where
        H: Release,
        B: FnOnce(&H) -> Outcome<R> + Send + 'static,
    {
        Self::use_resource(acquire, |handle| Self::lift_sync(move || body(&handle)))
    }

    /// Like [`use_resource`](Self::use_resource) with a synchronous acquire.
    pub fn use_with<H, F, B>(acquire: F, body: B) -> Self
    where
        H: Release,
        F: FnOnce() -> Outcome<H> + Send + 'static,
        B: FnOnce(Arc<H>) -> Self + Send + 'static,
    {
        Self::use_resource(Aff::lift_sync(acquire), body)
    }

    /// Runs `finalizer` after `self` on every exit path.
    ///
    /// The finalizer's value is discarded. If it fails, that failure is
    /// reported only when `self` succeeded; otherwise the first failure
    /// wins.
    ///
    /// ```rust
    /// use lambars_aff::effect::{Aff, Environment, Error};
    ///
    /// let environment: Environment = Environment::default();
    ///
    /// let kept = Aff::<i32>::fail_with("work").finally(Aff::<()>::fail_with("cleanup"));
    /// assert_eq!(kept.run_blocking(&environment), Err(Error::message("work")));
    ///
    /// let replaced = Aff::pure(1).finally(Aff::<()>::fail_with("cleanup"));
    /// assert_eq!(replaced.run_blocking(&environment), Err(Error::message("cleanup")));
    /// ```
    pub fn finally<X>(self, finalizer: Aff<X, Env>) -> Self
    where
        X: Send + 'static,
    {
        Self::from_node(Node::Finalize {
            source: Child::new(self.node),
            finalizer: Child::new(finalizer.node),
        })
    }
}
