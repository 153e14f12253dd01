//! Shared host runtime.
//!
//! The engine never blocks; it only awaits. Synchronous callers still need
//! somewhere to drive a run, so this module keeps one lazily built
//! multi-thread tokio runtime for the whole process and a blocking entry
//! point that reuses the caller's runtime when there is one.
//!
//! - Outside any runtime: the global runtime's `block_on` is used.
//! - Inside a multi-thread runtime: `block_in_place` on the current handle.
//! - Inside a current-thread runtime: blocking is impossible and
//!   [`BlockingError::CurrentThreadRuntime`] is returned.
//!
//! # Examples
//!
//! ```rust
//! use lambars_aff::effect::runtime::try_run_blocking;
//!
//! let answer = try_run_blocking(async { 6 * 7 });
//! assert_eq!(answer, Ok(42));
//! ```

use std::future::Future;
use std::sync::LazyLock;

use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use super::aff::Aff;
use super::environment::Environment;
use super::error::{Error, Outcome};

static GLOBAL_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    tracing::debug!(workers = num_cpus::get(), "starting shared runtime");
    Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("lambars-aff")
        .enable_all()
        .build()
        .expect("Failed to create the shared tokio runtime")
});

/// Returns the process-wide runtime, building it on first use.
#[inline]
#[must_use]
pub fn global() -> &'static Runtime {
    &GLOBAL_RUNTIME
}

/// Returns the current runtime's handle, or the global runtime's outside one.
#[must_use]
pub fn handle() -> Handle {
    Handle::try_current().unwrap_or_else(|_| global().handle().clone())
}

/// Why a future could not be driven to completion synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlockingError {
    /// `block_in_place` is unavailable on a current-thread runtime.
    #[error(
        "cannot block inside a current-thread runtime: \
         block_in_place is only supported in multi-thread runtimes"
    )]
    CurrentThreadRuntime,

    /// The runtime flavor is not one this module knows how to block on.
    #[error("cannot block: the runtime flavor is not supported")]
    UnsupportedRuntimeFlavor,
}

/// Drives `future` to completion on the current thread.
///
/// # Errors
///
/// Returns [`BlockingError::CurrentThreadRuntime`] when called from inside a
/// current-thread runtime.
pub fn try_run_blocking<F, T>(future: F) -> Result<T, BlockingError>
where
    F: Future<Output = T>,
{
    let Ok(current) = Handle::try_current() else {
        return Ok(global().block_on(future));
    };
    match current.runtime_flavor() {
        RuntimeFlavor::MultiThread => Ok(tokio::task::block_in_place(|| current.block_on(future))),
        RuntimeFlavor::CurrentThread => Err(BlockingError::CurrentThreadRuntime),
        _ => Err(BlockingError::UnsupportedRuntimeFlavor),
    }
}

/// Drives `future` to completion on the current thread.
///
/// # Panics
///
/// Panics when called from inside a current-thread runtime.
pub fn run_blocking<F, T>(future: F) -> T
where
    F: Future<Output = T>,
{
    try_run_blocking(future).expect("run_blocking failed")
}

impl<A, Env> Aff<A, Env>
where
    A: Send + 'static,
    Env: Send + Sync + 'static,
{
    /// Runs the effect to completion from synchronous code.
    ///
    /// When blocking is impossible on the calling thread the effect is not
    /// run and the [`BlockingError`] is returned as a domain failure.
    pub fn run_blocking(self, environment: &Environment<Env>) -> Outcome<A> {
        try_run_blocking(self.run(environment)).unwrap_or_else(|error| Err(Error::domain(error)))
    }
}
