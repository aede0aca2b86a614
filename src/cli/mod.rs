//! Command-line interface for s-rna-tools.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **find-match**: Match sequences against a query index with BLAST+
//!
//! ## Usage
//!
//! ```text
//! # Search the whole subject file and save every hit
//! s-rna-tools find-match -q reads.fa -s mature.fa -o results
//!
//! # List subject sequences that have no match in the reads
//! s-rna-tools find-match -q reads.fa -s mature.fa -o results --mode unknown
//!
//! # JSON summary and a debug log
//! s-rna-tools --format json --log-file run.log find-match -q reads.fa -s mature.fa -o results
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod find_match;

#[derive(Parser)]
#[command(name = "s-rna-tools")]
#[command(author = "BU-ISCIII")]
#[command(version)]
#[command(about = "Tools for small RNA sequence analysis")]
#[command(
    long_about = "s-rna-tools classifies small RNA sequences by matching them against a reference set.\n\nA BLAST+ index is built from the query file and the subject file is searched against it:\n- known mode saves every hit to blast_results.tsv\n- unknown mode lists the subject sequences without any hit in unmatched.tsv"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print verbose output to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Save a verbose log to a file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Output format for the run summary
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find matches of the subject sequences in the query file
    FindMatch(find_match::FindMatchArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
