//! The per-run environment descriptor.
//!
//! An [`Environment`] is shared by every node of one execution. It carries
//! the ambient typed context supplied by the caller and a one-way
//! cancellation flag. Cloning an environment clones a reference; all clones
//! observe the same cancellation state.
//!
//! Cancellation is cooperative: [`Environment::cancel`] only sets the flag.
//! The execution engine observes it at its next step, and asynchronous leaves
//! that want to stop early can await [`Environment::cancelled`].
//!
//! # Examples
//!
//! ```rust
//! use lambars_aff::effect::Environment;
//!
//! struct Settings {
//!     retries: usize,
//! }
//!
//! let environment = Environment::new(Settings { retries: 3 });
//! assert_eq!(environment.context().retries, 3);
//!
//! let shared = environment.clone();
//! shared.cancel();
//! assert!(environment.is_cancelled());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::runtime;

/// Shared per-run context: cancellation signal plus ambient context `Env`.
pub struct Environment<Env = ()> {
    shared: Arc<Shared<Env>>,
}

struct Shared<Env> {
    signal: CancellationSignal,
    context: Env,
}

/// One-way cancellation flag with wake-ups for waiting tasks.
struct CancellationSignal {
    cancelled: AtomicBool,
    waiters: Notify,
}

impl CancellationSignal {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            waiters: Notify::new(),
        }
    }

    fn is_set(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Sets the flag. Returns `true` only for the call that flipped it.
    fn set(&self) -> bool {
        let first = !self.cancelled.swap(true, Ordering::AcqRel);
        if first {
            self.waiters.notify_waiters();
        }
        first
    }

    async fn wait(&self) {
        let notified = self.waiters.notified();
        tokio::pin!(notified);
        // Register before checking so a concurrent `set` cannot slip between.
        notified.as_mut().enable();
        if self.is_set() {
            return;
        }
        notified.await;
    }
}

impl<Env> Environment<Env> {
    /// Creates a fresh, non-cancelled environment around `context`.
    pub fn new(context: Env) -> Self {
        Self {
            shared: Arc::new(Shared {
                signal: CancellationSignal::new(),
                context,
            }),
        }
    }

    /// Returns the ambient context.
    #[inline]
    pub fn context(&self) -> &Env {
        &self.shared.context
    }

    /// Requests cancellation of every run using this environment.
    ///
    /// Idempotent; once set the flag is never cleared.
    pub fn cancel(&self) {
        if self.shared.signal.set() {
            tracing::trace!("environment cancelled");
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.shared.signal.is_set()
    }

    /// Completes when the environment is cancelled.
    ///
    /// Returns immediately if it already is.
    pub async fn cancelled(&self) {
        self.shared.signal.wait().await;
    }

    /// Returns `true` when both values refer to the same environment.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<Env: Send + Sync + 'static> Environment<Env> {
    /// Cancels this environment once `deadline` has elapsed.
    ///
    /// The timer runs on the current tokio runtime, or on the shared runtime
    /// when called outside of one. Aborting the returned handle disarms it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use lambars_aff::effect::Environment;
    ///
    /// # lambars_aff::effect::runtime::run_blocking(async {
    /// let environment: Environment = Environment::default();
    /// environment.cancel_after(Duration::from_millis(5));
    /// environment.cancelled().await;
    /// assert!(environment.is_cancelled());
    /// # });
    /// ```
    pub fn cancel_after(&self, deadline: Duration) -> JoinHandle<()> {
        let environment = self.clone();
        runtime::handle().spawn(async move {
            tokio::time::sleep(deadline).await;
            tracing::trace!(?deadline, "deadline reached");
            environment.cancel();
        })
    }
}

impl<Env> Clone for Environment<Env> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<Env: Default> Default for Environment<Env> {
    fn default() -> Self {
        Self::new(Env::default())
    }
}

impl<Env: fmt::Debug> fmt::Debug for Environment<Env> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Environment")
            .field("cancelled", &self.is_cancelled())
            .field("context", self.context())
            .finish()
    }
}

static_assertions::assert_impl_all!(Environment<()>: Send, Sync, Clone);
