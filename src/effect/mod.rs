//! Deferred asynchronous effects with cancellation and resource safety.
//!
//! An [`Aff`] is a description of work: building one performs nothing, and
//! running it against an [`Environment`] produces an [`Outcome`]. The
//! description is a tree of nodes interpreted by an iterative engine, so
//! arbitrarily deep `bind` chains run in constant native stack space.
//!
//! # Building effects
//!
//! - Leaves: [`Aff::pure`], [`Aff::fail`], [`Aff::lift`], [`Aff::lift_sync`]
//! - Sequencing: [`Aff::bind`], [`Aff::map`], [`Aff::then`], [`Aff::apply`], [`Aff::actions`]
//! - Recovery: [`Aff::catch`], [`Aff::choose`], [`Aff::empty`]
//! - Resources: [`Aff::use_resource`], [`Aff::bracket`], [`Aff::finally`]
//!
//! # Cancellation
//!
//! Every run shares its [`Environment`] with all of its nodes. Calling
//! [`Environment::cancel`] makes the run finish with [`Error::Cancelled`] at
//! the next step, after every pending finalizer and release has run.
//!
//! ```rust
//! use lambars_aff::effect::{Aff, Environment, Error};
//!
//! let environment: Environment = Environment::default();
//! let aff = Aff::pure(1)
//!     .then(Aff::cancel())
//!     .map(|()| 2);
//!
//! assert_eq!(aff.run_blocking(&environment), Err(Error::Cancelled));
//! ```

mod aff;
mod alternative;
mod engine;
mod environment;
mod error;
mod node;
mod resource;
pub mod runtime;

pub use aff::{Aff, Run};
pub use environment::Environment;
pub use error::{DomainError, Error, Outcome};
pub use resource::Release;
