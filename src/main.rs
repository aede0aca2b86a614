use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod cli;
mod core;
mod matching;
mod parsing;
mod utils;

use matching::orchestrator::FindMatchError;
use matching::report::{ConsoleReporter, Reporter};

fn main() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag. Reporter messages are
    // already printed to stderr, so the console layer drops them.
    let filter = if cli.verbose {
        EnvFilter::new("s_rna_tools=debug,report=off,info")
    } else {
        EnvFilter::new("s_rna_tools=warn,report=off")
    };

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(filter);

    let log_file = match &cli.log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(EnvFilter::new("s_rna_tools=debug,report=info,info")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(log_file)
        .init();

    let result = match cli.command {
        cli::Commands::FindMatch(args) => cli::find_match::run(args, cli.format, cli.verbose),
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            // Orchestrator errors were reported when they happened
            if e.downcast_ref::<FindMatchError>().is_none() {
                ConsoleReporter.error(&format!("{e:#}"));
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
