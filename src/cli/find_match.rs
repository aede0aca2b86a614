use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use dialoguer::{theme::ColorfulTheme, Input};

use crate::cli::OutputFormat;
use crate::core::types::MatchMode;
use crate::matching::blast::{
    BlastConfig, BlastEngine, BLASTN_ENV_BIN, DEFAULT_BLASTN_BIN, DEFAULT_MAKEBLASTDB_BIN,
    DEFAULT_TIMEOUT_SECS, MAKEBLASTDB_ENV_BIN,
};
use crate::matching::orchestrator::{
    FindMatchError, FindMatchRequest, MatchOrchestrator, MatchSummary,
};
use crate::matching::report::{ConsoleReporter, Reporter};

#[derive(Args)]
pub struct FindMatchArgs {
    /// FASTA file with the sequences the index is built from
    #[arg(short, long, value_name = "FILE")]
    pub query: Option<PathBuf>,

    /// FASTA file with the sequences to match against the index
    #[arg(short, long, value_name = "FILE")]
    pub subject: Option<PathBuf>,

    /// Folder to save generated output files
    #[arg(short, long, value_name = "DIR")]
    pub out_folder: Option<PathBuf>,

    /// Save all hits (known) or list subject sequences without a hit (unknown)
    #[arg(short, long, value_enum, default_value = "known")]
    pub mode: MatchMode,

    /// Seconds each BLAST+ call may run before it is stopped and retried once
    #[arg(long, env = "S_RNA_TOOLS_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// makeblastdb executable
    #[arg(long, env = MAKEBLASTDB_ENV_BIN, default_value = DEFAULT_MAKEBLASTDB_BIN)]
    pub makeblastdb: String,

    /// blastn executable
    #[arg(long, env = BLASTN_ENV_BIN, default_value = DEFAULT_BLASTN_BIN)]
    pub blastn: String,
}

/// Execute find-match subcommand
///
/// # Errors
///
/// Returns an error if an input is missing, the index or a bulk search fails,
/// an output file cannot be written, or any per-sequence search failed.
/// A `FindMatchError` has already been shown to the user.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: FindMatchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let request = resolve_inputs(&args)?;
    let reporter = ConsoleReporter;

    let engine = BlastEngine::new(BlastConfig {
        makeblastdb: args.makeblastdb.clone(),
        blastn: args.blastn.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
    })?;

    if verbose {
        match engine.version() {
            Some(version) => reporter.info(&format!("Using {version}")),
            None => reporter.warn("Could not determine the blastn version"),
        }
    }

    let orchestrator = MatchOrchestrator::new(&engine, &reporter);
    let summary = match orchestrator.run(&request) {
        Ok(summary) => summary,
        Err(FindMatchError::ResultWrite {
            path,
            source,
            summary,
        }) => {
            // Still show what was classified so the write can be retried
            print_summary(&summary, format)?;
            return Err(FindMatchError::ResultWrite {
                path,
                source,
                summary,
            }
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    print_summary(&summary, format)?;

    if !summary.failures.is_empty() {
        anyhow::bail!(
            "{} of {} searches failed",
            summary.failures.len(),
            summary.failures.len() + summary.searched
        );
    }

    Ok(())
}

/// Fill in any path not given on the command line.
///
/// Prompts when stdin is a terminal; otherwise a missing path is an error.
fn resolve_inputs(args: &FindMatchArgs) -> anyhow::Result<FindMatchRequest> {
    Ok(FindMatchRequest {
        query_file: resolve_path(
            args.query.clone(),
            "--query",
            "Select the fasta file with the sequences",
        )?,
        subject_file: resolve_path(
            args.subject.clone(),
            "--subject",
            "Select the file to match against the sequences",
        )?,
        output_folder: resolve_path(
            args.out_folder.clone(),
            "--out-folder",
            "Select the folder to save results",
        )?,
        mode: args.mode,
    })
}

fn resolve_path(value: Option<PathBuf>, flag: &str, prompt: &str) -> anyhow::Result<PathBuf> {
    if let Some(path) = value {
        return Ok(path);
    }

    if !std::io::stdin().is_terminal() {
        anyhow::bail!("{flag} is required when not running interactively");
    }

    let answer: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()?;
    Ok(PathBuf::from(answer.trim()))
}

fn print_summary(summary: &MatchSummary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print_text_summary(summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Tsv => print_tsv_summary(summary),
    }
    Ok(())
}

fn print_text_summary(summary: &MatchSummary) {
    println!("Match Results");
    println!("{}", "=".repeat(60));
    println!("  Mode: {}", summary.mode);
    println!("  Searches completed: {}", summary.searched);

    match summary.mode {
        MatchMode::Known => println!("  Hits: {}", summary.hit_count),
        MatchMode::Unknown => {
            println!("  Matched: {}", summary.matched.len());
            println!("  Unmatched: {}", summary.unmatched.len());
        }
    }

    if let Some(path) = &summary.output_file {
        println!("  Output: {}", path.display());
    }

    if !summary.failures.is_empty() {
        println!("\n  Failed searches:");
        for failure in &summary.failures {
            println!("  - {}: {}", failure.identifier, failure.message);
        }
    }
}

fn print_tsv_summary(summary: &MatchSummary) {
    println!("mode\tsearched\thits\tmatched\tunmatched\tfailed\toutput");
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        summary.mode,
        summary.searched,
        summary.hit_count,
        summary.matched.len(),
        summary.unmatched.len(),
        summary.failures.len(),
        summary
            .output_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    );
}
