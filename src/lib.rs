//! # s-rna-tools
//!
//! A library for classifying small RNA sequences against a reference set.
//!
//! Short sequences (miRNAs, collapsed small RNA reads) are matched with a local-alignment
//! search engine. A search index is built once from the query file; the subject file is then
//! searched against it, either in one bulk call or one sequence at a time.
//!
//! ## Features
//!
//! - **Bulk matching**: one search of the whole subject file, hit table saved as TSV
//! - **Unmatched discovery**: per-sequence searches that list subject sequences with no hit
//! - **BLAST+ backend**: `makeblastdb` / `blastn -task blastn-short`, 90% identity, e-value 0.05
//! - **Bounded calls**: every engine call has a timeout and is retried once on expiry
//!
//! ## Modules
//!
//! - [`core`]: Core data types for modes, hit rows and search outcomes
//! - [`matching`]: Engine contract, BLAST+ adapter and the match orchestrator
//! - [`parsing`]: FASTA reader
//! - [`cli`]: Command-line interface implementation
//! - [`utils`]: Input validation helpers

pub mod cli;
pub mod core;
pub mod matching;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use core::types::*;
pub use matching::orchestrator::{FindMatchError, FindMatchRequest, MatchOrchestrator, MatchSummary};
pub use parsing::fasta::read_sequences;
