//! Recovery and alternation.
//!
//! [`Aff::catch`] is the general recovery primitive: a failure matching the
//! predicate is replaced by the effect built from it. [`Aff::choose`] is its
//! unconditional form. [`Aff::empty`] fails with
//! [`Error::EmptyAlternative`] and is the identity of `choose`, which makes
//! "try each of these in order" a plain fold:
//!
//! - no effects: `Fail(EmptyAlternative)`
//! - one effect: that effect
//! - many effects: the first success, or the last failure
//!
//! Cancellation is never recovered. A cancelled run passes through every
//! `catch` and `choose` untouched.
//!
//! # Alternative Laws
//!
//! - **Left Identity**: `Aff::empty().choose(m) == m`
//! - **Right Identity**: `m.choose(Aff::empty()) == m` (for succeeding `m`)
//! - **Associativity**: `a.choose(b).choose(c) == a.choose(b.choose(c))`
//!
//! # Examples
//!
//! ```rust
//! use lambars_aff::effect::{Aff, Environment, Error};
//!
//! let environment: Environment = Environment::default();
//!
//! let first_success = Aff::choose_all([
//!     Aff::fail_with("primary down"),
//!     Aff::pure("replica"),
//!     Aff::pure("backup"),
//! ]);
//! assert_eq!(first_success.run_blocking(&environment), Ok("replica"));
//!
//! let nothing: Aff<&str> = Aff::choose_all([]);
//! assert_eq!(nothing.run_blocking(&environment), Err(Error::EmptyAlternative));
//! ```

use std::sync::Arc;

use super::aff::Aff;
use super::error::Error;
use super::node::{Child, Node};

impl<A, Env> Aff<A, Env>
where
    A: Send + 'static,
    Env: Send + Sync + 'static,
{
    /// The failing identity element of [`choose`](Self::choose).
    pub fn empty() -> Self {
        Self::fail(Error::EmptyAlternative)
    }

    /// Recovers from failures for which `predicate` holds.
    ///
    /// On such a failure the outcome is replaced by `handler(error)`; any
    /// other failure, and every success, passes through unchanged.
    ///
    /// ```rust
    /// use lambars_aff::effect::{Aff, Environment, Error};
    ///
    /// let environment: Environment = Environment::default();
    ///
    /// let recovered = Aff::fail(Error::EmptyAlternative)
    ///     .catch(Error::is_empty_alternative, |_| Aff::pure(0));
    /// assert_eq!(recovered.run_blocking(&environment), Ok(0));
    ///
    /// let skipped = Aff::<i32>::fail_with("boom")
    ///     .catch(Error::is_empty_alternative, |_| Aff::pure(0));
    /// assert_eq!(skipped.run_blocking(&environment), Err(Error::message("boom")));
    /// ```
    pub fn catch<P, H>(self, predicate: P, handler: H) -> Self
    where
        P: FnOnce(&Error) -> bool + Send + 'static,
        H: FnOnce(Error) -> Self + Send + 'static,
    {
        Self::from_node(Node::Catch {
            source: Child::new(self.node),
            predicate: Box::new(predicate),
            handler: Box::new(move |error| handler(error).node),
        })
    }

    /// Recovers from every recoverable failure.
    pub fn catch_all<H>(self, handler: H) -> Self
    where
        H: FnOnce(Error) -> Self + Send + 'static,
    {
        self.catch(|_| true, handler)
    }

    /// Runs `alternative` if `self` fails.
    ///
    /// The second branch is not evaluated at all when `self` succeeds. When
    /// both fail, the alternative's failure is reported.
    pub fn choose(self, alternative: Self) -> Self {
        Self::from_node(Node::Choose {
            primary: Child::new(self.node),
            alternative: Child::new(alternative.node),
        })
    }

    /// Tries each effect left to right until one succeeds.
    pub fn choose_all<I>(effects: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        effects.into_iter().fold(Self::empty(), Self::choose)
    }

    /// Replaces a recoverable failure with a value.
    pub fn if_fail<F>(self, fallback: F) -> Self
    where
        F: FnOnce(Error) -> A + Send + 'static,
    {
        self.catch_all(|error| Self::pure(fallback(error)))
    }

    /// Rewrites a recoverable failure.
    pub fn map_fail<F>(self, function: F) -> Self
    where
        F: FnOnce(Error) -> Error + Send + 'static,
    {
        self.catch_all(|error| Self::fail(function(error)))
    }

    /// Runs a freshly built effect up to `attempts` times until one succeeds.
    ///
    /// Each attempt is built by `factory` only when it is about to run. The
    /// last failure is reported when every attempt fails; zero attempts
    /// yields [`Aff::empty`].
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use lambars_aff::effect::{Aff, Environment};
    ///
    /// let calls = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&calls);
    /// let flaky = Aff::<usize>::retry(
    ///     move || {
    ///         let counter = Arc::clone(&counter);
    ///         Aff::lift_sync(move || match counter.fetch_add(1, Ordering::SeqCst) {
    ///             0 | 1 => Err(lambars_aff::effect::Error::message("transient")),
    ///             attempt => Ok(attempt),
    ///         })
    ///     },
    ///     5,
    /// );
    /// assert_eq!(flaky.run_blocking(&Environment::default()), Ok(2));
    /// assert_eq!(calls.load(Ordering::SeqCst), 3);
    /// ```
    pub fn retry<F>(factory: F, attempts: usize) -> Self
    where
        F: Fn() -> Self + Send + Sync + 'static,
    {
        retry_attempt(Arc::new(factory), attempts)
    }
}

fn retry_attempt<A, Env, F>(factory: Arc<F>, remaining: usize) -> Aff<A, Env>
where
    A: Send + 'static,
    Env: Send + Sync + 'static,
    F: Fn() -> Aff<A, Env> + Send + Sync + 'static,
{
    match remaining {
        0 => Aff::empty(),
        1 => Aff::defer(move || (*factory)()),
        _ => {
            let next = Arc::clone(&factory);
            Aff::defer(move || (*factory)())
                .choose(Aff::defer(move || retry_attempt(next, remaining - 1)))
        }
    }
}
