//! Core data types for sequence matching.
//!
//! - [`ReferenceSequences`]: reference sequences keyed by content, in file order
//! - [`MatchMode`]: bulk (`known`) or per-sequence (`unknown`) matching
//! - [`HitRow`]: one row of tabular alignment output
//! - [`SearchOutcome`]: hit/no-hit classification of a single search

pub mod types;
