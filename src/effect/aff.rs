//! `Aff` - deferred, fallible, cancellable asynchronous effects.
//!
//! An [`Aff<A, Env>`] describes a computation that, when run against an
//! [`Environment<Env>`], produces either a value of type `A` or an
//! [`Error`]. Building an `Aff` performs no side effects; only
//! [`Aff::run`] does.
//!
//! # Monad Laws
//!
//! 1. **Left Identity**: `Aff::pure(a).bind(f) == f(a)`
//! 2. **Right Identity**: `m.bind(Aff::pure) == m`
//! 3. **Associativity**: `m.bind(f).bind(g) == m.bind(|x| f(x).bind(g))`
//!
//! # Examples
//!
//! ```rust
//! use lambars_aff::effect::{Aff, Environment};
//!
//! # lambars_aff::effect::runtime::run_blocking(async {
//! let environment: Environment = Environment::default();
//!
//! let aff = Aff::pure(10)
//!     .map(|x| x * 2)
//!     .bind(|x| Aff::lift(move |_| async move { Ok(x + 1) }));
//!
//! assert_eq!(aff.run(&environment).await, Ok(21));
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use pin_project_lite::pin_project;

use super::engine;
use super::environment::Environment;
use super::error::{Error, Outcome};
use super::node::{Child, Node, Value, erase, unerase};

/// A deferred effect producing `A` under an environment with context `Env`.
///
/// `Aff` values are consumed by [`run`](Self::run); build a new one (or use
/// a factory, as [`Aff::retry`] does) to run the same description again.
#[must_use = "effects do nothing unless run"]
pub struct Aff<A, Env = ()> {
    pub(crate) node: Node<Env>,
    _result: PhantomData<fn() -> A>,
}

impl<A, Env> Aff<A, Env> {
    #[inline]
    pub(crate) const fn from_node(node: Node<Env>) -> Self {
        Self {
            node,
            _result: PhantomData,
        }
    }
}

// =============================================================================
// Constructors
// =============================================================================

impl<A, Env> Aff<A, Env>
where
    A: Send + 'static,
    Env: Send + Sync + 'static,
{
    /// An effect that always succeeds with `value`.
    ///
    /// ```rust
    /// use lambars_aff::effect::{Aff, Environment};
    ///
    /// let outcome = Aff::<_, ()>::pure(42).run_blocking(&Environment::default());
    /// assert_eq!(outcome, Ok(42));
    /// ```
    pub fn pure(value: A) -> Self {
        Self::from_node(Node::Pure(erase(value)))
    }

    /// An effect that always fails with `error`.
    pub fn fail(error: impl Into<Error>) -> Self {
        Self::from_node(Node::Fail(error.into()))
    }

    /// An effect that fails with a message-only domain error.
    pub fn fail_with(message: impl Into<String>) -> Self {
        Self::fail(Error::message(message))
    }

    /// Lifts an already computed outcome.
    pub fn from_result(outcome: Outcome<A>) -> Self {
        match outcome {
            Ok(value) => Self::pure(value),
            Err(error) => Self::fail(error),
        }
    }

    /// Lifts an asynchronous operation.
    ///
    /// `action` is called with the run's environment when the engine reaches
    /// this node, and the returned future is driven by the host runtime.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use lambars_aff::effect::{Aff, Environment};
    ///
    /// let aff: Aff<u32> = Aff::lift(|_environment| async {
    ///     tokio::time::sleep(Duration::from_millis(1)).await;
    ///     Ok(7)
    /// });
    /// assert_eq!(aff.run_blocking(&Environment::default()), Ok(7));
    /// ```
    pub fn lift<F, Fut>(action: F) -> Self
    where
        F: FnOnce(Environment<Env>) -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<A>> + Send + 'static,
    {
        Self::from_node(Node::Lifted(Box::new(move |environment: Environment<Env>| {
            action(environment)
                .map(|outcome| outcome.map(erase::<A>))
                .boxed()
        })))
    }

    /// Lifts a future that does not need the environment.
    ///
    /// The future is not polled until the effect runs.
    pub fn from_future<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = Outcome<A>> + Send + 'static,
    {
        Self::lift(move |_| future)
    }

    /// Lifts a synchronous side effect, executed in place when reached.
    pub fn lift_sync<F>(action: F) -> Self
    where
        F: FnOnce() -> Outcome<A> + Send + 'static,
    {
        Self::from_node(Node::Sync(Box::new(move |_: &Environment<Env>| {
            action().map(erase::<A>)
        })))
    }

    /// Builds the effect lazily, when the engine reaches it.
    pub fn defer<F>(factory: F) -> Self
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        Self::from_node(Node::Bind(
            Child::new(Node::Pure(erase(()))),
            Box::new(move |_| factory().node),
        ))
    }

    /// Reads a value out of the ambient context.
    ///
    /// ```rust
    /// use lambars_aff::effect::{Aff, Environment};
    ///
    /// struct Config {
    ///     base: u32,
    /// }
    ///
    /// let aff = Aff::asks(|config: &Config| config.base).map(|base| base + 1);
    /// let outcome = aff.run_blocking(&Environment::new(Config { base: 41 }));
    /// assert_eq!(outcome, Ok(42));
    /// ```
    pub fn asks<F>(selector: F) -> Self
    where
        F: FnOnce(&Env) -> A + Send + 'static,
    {
        Self::from_node(Node::Sync(Box::new(move |environment: &Environment<Env>| {
            Ok(erase(selector(environment.context())))
        })))
    }
}

impl<Env> Aff<Environment<Env>, Env>
where
    Env: Send + Sync + 'static,
{
    /// Yields the environment of the current run.
    pub fn environment() -> Self {
        Self::from_node(Node::Sync(Box::new(|environment: &Environment<Env>| {
            Ok(erase(environment.clone()))
        })))
    }
}

impl<Env> Aff<(), Env>
where
    Env: Send + Sync + 'static,
{
    /// An effect that succeeds with `()`.
    pub fn unit() -> Self {
        Self::pure(())
    }

    /// Cancels the current run's environment.
    ///
    /// The effect itself completes, but the engine observes the cancellation
    /// at its next step.
    pub fn cancel() -> Self {
        Self::from_node(Node::Sync(Box::new(|environment: &Environment<Env>| {
            environment.cancel();
            Ok(erase(()))
        })))
    }
}

// =============================================================================
// Sequencing
// =============================================================================

impl<A, Env> Aff<A, Env>
where
    A: Send + 'static,
    Env: Send + Sync + 'static,
{
    /// Runs `self`, then the effect built from its value.
    ///
    /// `function` is never called when `self` fails or the run is cancelled.
    pub fn bind<B, F>(self, function: F) -> Aff<B, Env>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Aff<B, Env> + Send + 'static,
    {
        Aff::from_node(Node::Bind(
            Child::new(self.node),
            Box::new(move |value| function(unerase::<A>(value)).node),
        ))
    }

    /// Transforms the produced value.
    pub fn map<B, F>(self, function: F) -> Aff<B, Env>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        Aff::from_node(Node::Bind(
            Child::new(self.node),
            Box::new(move |value| Node::Pure(erase(function(unerase::<A>(value))))),
        ))
    }

    /// Runs `self`, discards its value, then runs `next`.
    pub fn then<B>(self, next: Aff<B, Env>) -> Aff<B, Env>
    where
        B: Send + 'static,
    {
        Aff::from_node(Node::Bind(Child::new(self.node), Box::new(move |_| next.node)))
    }

    /// Runs `function`, then `self`, and applies the produced function to
    /// the produced value.
    ///
    /// ```rust
    /// use lambars_aff::effect::{Aff, Environment};
    ///
    /// let double = Aff::pure(|value: i32| value * 2);
    /// let aff: Aff<i32> = Aff::pure(21).apply(double);
    /// assert_eq!(aff.run_blocking(&Environment::default()), Ok(42));
    /// ```
    pub fn apply<B, F>(self, function: Aff<F, Env>) -> Aff<B, Env>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        function.bind(move |function| self.map(function))
    }

    /// Runs `effects` in order and folds their values into `seed`.
    ///
    /// Stops at the first failure. The iterator is pulled lazily, one effect
    /// at a time.
    ///
    /// ```rust
    /// use lambars_aff::effect::{Aff, Environment};
    ///
    /// let effects = (1..=4).map(Aff::<i32>::pure);
    /// let total = Aff::actions(effects, 0_i32, |sum, value| sum + value);
    /// assert_eq!(total.run_blocking(&Environment::default()), Ok(10));
    /// ```
    pub fn actions<B, I, C>(effects: I, seed: B, mut combine: C) -> Aff<B, Env>
    where
        B: Send + 'static,
        I: IntoIterator<Item = Self>,
        I::IntoIter: Send + 'static,
        C: FnMut(B, A) -> B + Send + 'static,
    {
        Aff::from_node(Node::Actions {
            effects: Box::new(effects.into_iter().map(|effect| effect.node)),
            seed: erase(seed),
            combine: Box::new(move |accumulator: Value, value: Value| {
                erase(combine(unerase::<B>(accumulator), unerase::<A>(value)))
            }),
        })
    }

    /// Runs `effects` in order and collects their values.
    pub fn sequence<I>(effects: I) -> Aff<Vec<A>, Env>
    where
        I: IntoIterator<Item = Self>,
        I::IntoIter: Send + 'static,
    {
        Self::actions(effects, Vec::new(), |mut values, value| {
            values.push(value);
            values
        })
    }

    /// Runs `effects` in order and keeps the last value.
    ///
    /// Fails with [`Error::EmptyAlternative`] when there are no effects.
    pub fn last<I>(effects: I) -> Self
    where
        I: IntoIterator<Item = Self>,
        I::IntoIter: Send + 'static,
    {
        Self::actions(effects, None, |_, value| Some(value)).bind(|last| match last {
            Some(value) => Self::pure(value),
            None => Self::empty(),
        })
    }
}

// =============================================================================
// Execution
// =============================================================================

impl<A, Env> Aff<A, Env>
where
    A: Send + 'static,
    Env: Send + Sync + 'static,
{
    /// Runs the effect under `environment`.
    ///
    /// This is the only entry point that performs side effects. Domain
    /// failures and cancellation are returned as `Err`; panics raised by
    /// user callbacks propagate to the caller.
    pub fn run(self, environment: &Environment<Env>) -> Run<A> {
        Run {
            inner: engine::execute(self.node, environment.clone()).boxed(),
            _result: PhantomData,
        }
    }
}

pin_project! {
    /// Future returned by [`Aff::run`].
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct Run<A> {
        #[pin]
        inner: BoxFuture<'static, Outcome<Value>>,
        _result: PhantomData<fn() -> A>,
    }
}

impl<A: 'static> Future for Run<A> {
    type Output = Outcome<A>;

    fn poll(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        self.project()
            .inner
            .poll(context)
            .map(|outcome| outcome.map(unerase::<A>))
    }
}

impl<A, Env> fmt::Debug for Aff<A, Env> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Aff")
            .field("node", &self.node.tag())
            .finish()
    }
}

static_assertions::assert_impl_all!(Aff<i32>: Send);
static_assertions::assert_impl_all!(Run<i32>: Send);
