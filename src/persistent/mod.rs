//! Persistent (immutable) data structures.
//!
//! - [`Seq`]: an ordered sequence whose concatenation and monadic bind are
//!   recorded as lazy nodes and only evaluated when traversed.
//!
//! # Structural Sharing
//!
//! A `Seq` never copies its elements when composed. Composition nodes hold
//! shared references to their operands, so the original sequences stay
//! usable and unchanged.
//!
//! # Examples
//!
//! ```rust
//! use lambars_aff::persistent::Seq;
//!
//! let words: Seq<&str> = Seq::from(vec!["a", "b"]);
//! let doubled = words.bind(|word| Seq::from(vec![word, word]));
//!
//! assert_eq!(doubled.to_vec(), vec!["a", "a", "b", "b"]);
//! assert_eq!(words.to_vec(), vec!["a", "b"]);
//! ```

mod seq;

pub use seq::{Seq, SeqIter};
