//! Error types for the effect runtime.
//!
//! Failures are values. Every [`Aff`](super::Aff) finishes with an
//! [`Outcome`], which is either the produced value or an [`Error`] drawn from
//! a small, closed taxonomy:
//!
//! - [`Error::Cancelled`]: the run was cancelled through its
//!   [`Environment`](super::Environment). Never recoverable by `catch` or
//!   `choose`.
//! - [`Error::EmptyAlternative`]: the identity element of alternation, produced
//!   by [`Aff::empty`](super::Aff::empty). Recoverable like a domain error.
//! - [`Error::Domain`]: an opaque user-supplied failure.
//!
//! # Examples
//!
//! ```rust
//! use lambars_aff::effect::{DomainError, Error};
//!
//! let error = Error::message("disk full");
//! assert_eq!(error.to_string(), "disk full");
//! assert!(error.is_recoverable());
//!
//! let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
//! let error = Error::from(DomainError::new(io_error));
//! assert!(error.downcast_ref::<std::io::Error>().is_some());
//!
//! assert!(!Error::Cancelled.is_recoverable());
//! ```

use std::fmt;
use std::sync::Arc;

/// The result of running an effect: `Ok(value)` on success, `Err(error)` on failure.
pub type Outcome<A> = Result<A, Error>;

/// Failure produced by running an effect.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The run was cancelled. Propagates through every recovery combinator.
    #[error("computation cancelled")]
    Cancelled,

    /// No alternative succeeded (the failure carried by `Aff::empty`).
    #[error("no alternative succeeded")]
    EmptyAlternative,

    /// A user-domain failure.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl Error {
    /// Wraps any standard error as a domain failure.
    pub fn domain<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Domain(DomainError::new(error))
    }

    /// Builds a domain failure from a plain message.
    pub fn message(text: impl Into<String>) -> Self {
        Self::Domain(DomainError::message(text))
    }

    /// Returns `true` for [`Error::Cancelled`].
    #[inline]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` for [`Error::EmptyAlternative`].
    #[inline]
    pub const fn is_empty_alternative(&self) -> bool {
        matches!(self, Self::EmptyAlternative)
    }

    /// Returns `true` when a recovery combinator may handle this failure.
    ///
    /// Everything except cancellation is recoverable.
    #[inline]
    pub const fn is_recoverable(&self) -> bool {
        !self.is_cancelled()
    }

    /// Downcasts the payload of a domain failure.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Domain(domain) => domain.downcast_ref(),
            Self::Cancelled | Self::EmptyAlternative => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Cancelled, Self::Cancelled)
            | (Self::EmptyAlternative, Self::EmptyAlternative) => true,
            (Self::Domain(left), Self::Domain(right)) => left == right,
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::domain(error)
    }
}

/// Opaque user-domain failure.
///
/// Cloning is cheap: the payload is shared. Two domain errors compare equal
/// when they share a payload or render the same message.
#[derive(Clone)]
pub struct DomainError {
    payload: Arc<dyn std::error::Error + Send + Sync + 'static>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

impl DomainError {
    /// Wraps an error value.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            payload: Arc::new(error),
        }
    }

    /// Builds a domain error that only carries a message.
    pub fn message(text: impl Into<String>) -> Self {
        Self::new(Message(text.into()))
    }

    /// Returns the payload as `E` if it has that type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        let payload: &(dyn std::error::Error + 'static) = self.payload.as_ref();
        payload.downcast_ref::<E>()
    }
}

impl PartialEq for DomainError {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
            || self.payload.to_string() == other.payload.to_string()
    }
}

impl fmt::Debug for DomainError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("DomainError")
            .field(&self.payload)
            .finish()
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.payload, formatter)
    }
}

impl std::error::Error for DomainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.payload.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, thiserror::Error)]
    #[error("insufficient funds: {0}")]
    struct InsufficientFunds(u32);

    #[rstest]
    #[case(Error::Cancelled, "computation cancelled")]
    #[case(Error::EmptyAlternative, "no alternative succeeded")]
    #[case(Error::message("boom"), "boom")]
    fn test_error_display(#[case] error: Error, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn test_only_cancellation_is_unrecoverable() {
        assert!(!Error::Cancelled.is_recoverable());
        assert!(Error::EmptyAlternative.is_recoverable());
        assert!(Error::message("x").is_recoverable());
    }

    #[rstest]
    fn test_downcast_domain_payload() {
        let error = Error::domain(InsufficientFunds(42));
        let payload = error.downcast_ref::<InsufficientFunds>();
        assert_eq!(payload.map(|funds| funds.0), Some(42));
        assert!(error.downcast_ref::<std::io::Error>().is_none());
        assert!(Error::Cancelled.downcast_ref::<InsufficientFunds>().is_none());
    }

    #[rstest]
    fn test_domain_equality_by_message_or_identity() {
        let error = Error::message("same");
        assert_eq!(error, error.clone());
        assert_eq!(Error::message("same"), Error::message("same"));
        assert_ne!(Error::message("same"), Error::message("other"));
        assert_ne!(Error::message("same"), Error::Cancelled);
    }

    #[rstest]
    fn test_io_error_converts_to_domain() {
        let error: Error = std::io::Error::other("socket closed").into();
        assert!(matches!(error, Error::Domain(_)));
        assert_eq!(error.to_string(), "socket closed");
    }
}
