//! Sequence matching against an external alignment engine.
//!
//! This module provides the matching pipeline:
//!
//! - [`MatchOrchestrator`]: builds the index, runs the searches, classifies and saves results
//! - [`AlignmentEngine`]: the contract an external search engine fulfils
//! - [`BlastEngine`]: the BLAST+ (`makeblastdb` / `blastn`) implementation
//! - [`Reporter`]: where user-facing messages go
//!
//! ## Modes
//!
//! 1. **known**: the whole subject file is searched once against the index and every
//!    hit row is written to `blast_results.tsv`
//! 2. **unknown**: each subject sequence is written to its own scratch file under
//!    `tmp_seq/`, searched on its own, and removed again. Sequences without a hit are
//!    written to `unmatched.tsv`
//!
//! ## Example
//!
//! ```rust,no_run
//! use s_rna_tools::matching::{BlastConfig, BlastEngine, ConsoleReporter, MatchOrchestrator};
//! use s_rna_tools::matching::orchestrator::FindMatchRequest;
//! use s_rna_tools::MatchMode;
//!
//! let engine = BlastEngine::new(BlastConfig::default()).unwrap();
//! let reporter = ConsoleReporter;
//! let orchestrator = MatchOrchestrator::new(&engine, &reporter);
//!
//! let summary = orchestrator
//!     .run(&FindMatchRequest {
//!         query_file: "collapsed_reads.fa".into(),
//!         subject_file: "mature.fa".into(),
//!         output_folder: "results".into(),
//!         mode: MatchMode::Unknown,
//!     })
//!     .unwrap();
//!
//! println!("{} sequences without a match", summary.unmatched.len());
//! ```

pub mod blast;
pub mod engine;
pub mod orchestrator;
pub mod report;

pub use blast::{BlastConfig, BlastEngine};
pub use engine::{AlignmentEngine, SearchIndex, SearchParams};
pub use orchestrator::{FindMatchError, MatchOrchestrator, MatchSummary};
pub use report::{ConsoleReporter, Reporter};
