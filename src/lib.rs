//! # lambars-aff
//!
//! Deferred asynchronous effects and lazily composed sequences.
//!
//! ## Overview
//!
//! - **Effects** ([`effect`]): `Aff`, a description of fallible asynchronous
//!   work run by a stack-safe engine, with cooperative cancellation,
//!   recovery, alternation and guaranteed resource release.
//! - **Sequences** ([`persistent`]): `Seq`, an immutable sequence whose
//!   concatenation and monadic bind build lazy nodes that are only traversed
//!   on demand.
//!
//! ## Feature Flags
//!
//! - `effect`: the effect runtime (pulls in tokio and futures)
//! - `persistent`: the lazy sequence
//! - `serde`: serialization for `Seq`
//! - `full`: enable all features
//!
//! ## Example
//!
//! With both `effect` and `persistent` enabled (the default):
//!
//! ```rust
//! # #[cfg(all(feature = "effect", feature = "persistent"))]
//! # {
//! use lambars_aff::prelude::*;
//!
//! let environment: Environment = Environment::default();
//! let pages: Seq<u32> = Seq::from(vec![1, 2]).concat(Seq::from(vec![3]));
//! let total = Aff::actions(pages.iter().map(Aff::pure), 0_u32, |sum, page| sum + page);
//!
//! assert_eq!(total.run_blocking(&environment), Ok(6));
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// ```rust
/// use lambars_aff::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "persistent")]
    pub use crate::persistent::*;

    #[cfg(feature = "effect")]
    pub use crate::effect::{Aff, DomainError, Environment, Error, Outcome, Release};
}

#[cfg(feature = "persistent")]
pub mod persistent;

#[cfg(feature = "effect")]
pub mod effect;
