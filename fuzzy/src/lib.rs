//! Approximate name matching for command and parameter lookup.
//!
//! [`distance`] holds the edit-distance metric tuned for abbreviated input,
//! and [`index`] a BK-tree over named items that answers bounded-radius and
//! best-match queries with it.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod distance;
pub mod index;

pub use distance::damerau_levenshtein;
pub use distance::item_distance;
pub use distance::name_distance;
pub use index::IndexError;
pub use index::Match;
pub use index::NameIndex;
pub use index::Named;
pub use index::SearchMode;
pub use index::radius_for;
