//! Parsers for sequence files.
//!
//! - **FASTA files**: plain or gzip/bgzip compressed, read with noodles into a
//!   `content -> identifier` mapping
//!
//! ## Example
//!
//! ```rust,no_run
//! use s_rna_tools::parsing::fasta::read_sequences;
//! use std::path::Path;
//!
//! let sequences = read_sequences(Path::new("mature.fa")).unwrap();
//! for (content, identifier) in &sequences {
//!     println!("{identifier}\t{content}");
//! }
//! ```

pub mod fasta;

pub use fasta::ParseError;
