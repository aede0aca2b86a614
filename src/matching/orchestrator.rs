use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::types::{HitRow, MatchMode, ReferenceSequences, SearchOutcome};
use crate::matching::engine::{
    AlignmentEngine, IndexBuildError, SearchError, SearchIndex, SearchParams,
};
use crate::matching::report::Reporter;
use crate::parsing::fasta::{is_fasta_file, read_sequences, ParseError};
use crate::utils::validation::{
    sanitize_identifier, validate_input_file, validate_output_folder, ValidationError,
};

/// Hit table written in `known` mode
pub const RESULTS_FILE: &str = "blast_results.tsv";

/// Sequences without a hit, written in `unknown` mode
pub const UNMATCHED_FILE: &str = "unmatched.tsv";

/// Scratch folder for per-sequence query files
pub const SCRATCH_FOLDER: &str = "tmp_seq";

#[derive(Error, Debug)]
pub enum FindMatchError {
    #[error(transparent)]
    InputNotFound(#[from] ValidationError),

    #[error("Failed to read sequences: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to build search index: {0}")]
    IndexBuild(#[from] IndexBuildError),

    #[error("Search for {query} failed: {source}")]
    Search {
        query: String,
        #[source]
        source: SearchError,
    },

    #[error("Search for {query} did not finish within {timeout_secs} seconds, even after a retry")]
    EngineUnresponsive { query: String, timeout_secs: u64 },

    #[error("Failed to prepare query file {}: {source}", .path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The classification finished but could not be saved; it is kept in `summary`.
    #[error("Failed to write {}: {source}", .path.display())]
    ResultWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        summary: Box<MatchSummary>,
    },
}

/// The three resolved locations a run needs
#[derive(Debug, Clone)]
pub struct FindMatchRequest {
    /// Sequences the index is built from
    pub query_file: PathBuf,
    /// Sequences searched against the index
    pub subject_file: PathBuf,
    /// Folder receiving results, index and scratch files
    pub output_folder: PathBuf,
    pub mode: MatchMode,
}

/// A per-sequence search that failed without stopping the run
#[derive(Debug, Clone, Serialize)]
pub struct SearchFailure {
    pub identifier: String,
    pub message: String,
}

/// Outcome of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchSummary {
    pub mode: MatchMode,

    /// Number of search calls that completed
    pub searched: usize,

    /// Hit rows of the bulk search (`known` mode)
    #[serde(skip)]
    pub hits: Vec<HitRow>,

    pub hit_count: usize,

    /// Identifiers with at least one hit (`unknown` mode)
    pub matched: Vec<String>,

    /// Identifier -> content of sequences without a hit (`unknown` mode)
    pub unmatched: IndexMap<String, String>,

    pub failures: Vec<SearchFailure>,

    /// Table written by this run, if any
    pub output_file: Option<PathBuf>,
}

/// Drives index creation, searching, classification and persistence
pub struct MatchOrchestrator<'a> {
    engine: &'a dyn AlignmentEngine,
    reporter: &'a dyn Reporter,
    params: SearchParams,
}

impl<'a> MatchOrchestrator<'a> {
    pub fn new(engine: &'a dyn AlignmentEngine, reporter: &'a dyn Reporter) -> Self {
        Self {
            engine,
            reporter,
            params: SearchParams::default(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Validate the inputs, build the index and run the requested mode.
    ///
    /// Any error returned has already been passed to the reporter.
    ///
    /// # Errors
    ///
    /// Fails before any work with `InputNotFound` when a path is missing. After
    /// that, index build failures, a failed bulk search, an unresponsive engine,
    /// and write failures are returned. Failed searches in `unknown` mode are
    /// collected in the summary instead.
    pub fn run(&self, request: &FindMatchRequest) -> Result<MatchSummary, FindMatchError> {
        let result = self.execute(request);
        if let Err(e) = &result {
            self.reporter.error(&e.to_string());
        }
        result
    }

    fn execute(&self, request: &FindMatchRequest) -> Result<MatchSummary, FindMatchError> {
        validate_input_file("fasta", &request.query_file)?;
        validate_input_file("matching", &request.subject_file)?;
        validate_output_folder(&request.output_folder)?;

        for path in [&request.query_file, &request.subject_file] {
            if !is_fasta_file(path) {
                warn!(path = %path.display(), "Input does not have a FASTA extension");
            }
        }

        fs::create_dir_all(&request.output_folder).map_err(|source| {
            FindMatchError::ResultWrite {
                path: request.output_folder.clone(),
                source,
                summary: Box::default(),
            }
        })?;

        self.reporter.info(&format!(
            "Creating {} index from {}",
            self.engine.name(),
            request.query_file.display()
        ));
        let index = self.engine.build_index(
            &request.query_file,
            &self.params,
            &request.output_folder,
        )?;
        info!(index = %index.location().display(), "Created index");

        match request.mode {
            MatchMode::Known => self.run_known(&index, request),
            MatchMode::Unknown => self.run_unknown(&index, request),
        }
    }

    /// One bulk search of the whole subject file
    fn run_known(
        &self,
        index: &SearchIndex,
        request: &FindMatchRequest,
    ) -> Result<MatchSummary, FindMatchError> {
        let label = request.subject_file.display().to_string();
        self.reporter.info(&format!("Searching {label}"));

        let outcome = self.search_with_retry(index, &request.subject_file, &label)?;

        let mut summary = MatchSummary {
            mode: MatchMode::Known,
            searched: 1,
            ..MatchSummary::default()
        };

        match outcome {
            SearchOutcome::Hit(rows) => {
                summary.hit_count = rows.len();
                summary.hits = rows;

                let path = request.output_folder.join(RESULTS_FILE);
                let table = hits_table(&summary.hits);
                if let Err(source) = fs::write(&path, table) {
                    return Err(FindMatchError::ResultWrite {
                        path,
                        source,
                        summary: Box::new(summary),
                    });
                }

                self.reporter.info(&format!(
                    "Wrote {} hits to {}",
                    summary.hit_count,
                    path.display()
                ));
                summary.output_file = Some(path);
            }
            SearchOutcome::NoHit => {
                self.reporter.info("Not found any match with the query file");
            }
        }

        Ok(summary)
    }

    /// One search per subject sequence, collecting the ones with no hit
    fn run_unknown(
        &self,
        index: &SearchIndex,
        request: &FindMatchRequest,
    ) -> Result<MatchSummary, FindMatchError> {
        let sequences = read_sequences(&request.subject_file)?;

        for (identifier, count) in repeated_identifiers(&sequences) {
            self.reporter.warn(&format!(
                "Identifier {identifier} names {count} different sequences; \
                 it may be listed as both matched and unmatched"
            ));
        }

        let scratch = request.output_folder.join(SCRATCH_FOLDER);
        fs::create_dir_all(&scratch).map_err(|source| FindMatchError::Scratch {
            path: scratch.clone(),
            source,
        })?;

        self.reporter
            .info(&format!("Searching {} sequences one by one", sequences.len()));

        let mut summary = MatchSummary {
            mode: MatchMode::Unknown,
            ..MatchSummary::default()
        };

        for (content, identifier) in &sequences {
            let query = write_query_file(&scratch, identifier, content)?;
            let result = self.search_with_retry(index, query.path(), identifier);

            // Removed before the next sequence whatever the search returned
            let query_path = query.path().to_path_buf();
            if let Err(e) = query.close() {
                self.reporter.warn(&format!(
                    "Could not remove {}: {e}",
                    query_path.display()
                ));
            }

            match result {
                Ok(SearchOutcome::NoHit) => {
                    debug!(identifier = %identifier, "No hit");
                    summary.searched += 1;
                    summary.unmatched.insert(identifier.clone(), content.clone());
                }
                Ok(SearchOutcome::Hit(rows)) => {
                    debug!(identifier = %identifier, hits = rows.len(), "Hit");
                    summary.searched += 1;
                    summary.matched.push(identifier.clone());
                }
                Err(FindMatchError::Search { query, source }) => {
                    warn!(identifier = %query, error = %source, "Search failed, skipping");
                    self.reporter
                        .error(&format!("Search for {query} failed: {source}"));
                    summary.failures.push(SearchFailure {
                        identifier: query,
                        message: source.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let path = request.output_folder.join(UNMATCHED_FILE);
        if let Err(source) = fs::write(&path, unmatched_table(&summary.unmatched)) {
            return Err(FindMatchError::ResultWrite {
                path,
                source,
                summary: Box::new(summary),
            });
        }

        self.reporter.info(&format!(
            "{} of {} sequences have no match, written to {}",
            summary.unmatched.len(),
            sequences.len(),
            path.display()
        ));
        summary.output_file = Some(path);

        Ok(summary)
    }

    /// Search once, and once more if the engine timed out.
    ///
    /// A second timeout means the engine is unresponsive and ends the run.
    fn search_with_retry(
        &self,
        index: &SearchIndex,
        query: &Path,
        label: &str,
    ) -> Result<SearchOutcome, FindMatchError> {
        let tag = |source: SearchError| FindMatchError::Search {
            query: label.to_string(),
            source,
        };

        match self.engine.search(index, query) {
            Err(SearchError::TimedOut(secs)) => {
                self.reporter.warn(&format!(
                    "Search for {label} timed out after {secs} seconds, retrying once"
                ));
                match self.engine.search(index, query) {
                    Err(SearchError::TimedOut(timeout_secs)) => {
                        Err(FindMatchError::EngineUnresponsive {
                            query: label.to_string(),
                            timeout_secs,
                        })
                    }
                    other => other.map_err(tag),
                }
            }
            other => other.map_err(tag),
        }
    }
}

/// Write a single-record query file `<scratch>/<identifier>.fa`.
///
/// The returned guard deletes the file when closed or dropped.
fn write_query_file(
    scratch: &Path,
    identifier: &str,
    content: &str,
) -> Result<NamedTempFile, FindMatchError> {
    let stem = sanitize_identifier(identifier);
    let path = scratch.join(format!("{stem}.fa"));
    let scratch_error = |source: std::io::Error| FindMatchError::Scratch {
        path: path.clone(),
        source,
    };

    // Left behind by an interrupted run
    if path.exists() {
        fs::remove_file(&path).map_err(scratch_error)?;
    }

    let mut file = tempfile::Builder::new()
        .prefix(&stem)
        .suffix(".fa")
        .rand_bytes(0)
        .tempfile_in(scratch)
        .map_err(scratch_error)?;

    write!(file, "> {identifier}\n{content}\n")
        .and_then(|()| file.flush())
        .map_err(scratch_error)?;

    Ok(file)
}

/// Identifiers shared by more than one distinct sequence, in file order
fn repeated_identifiers(sequences: &ReferenceSequences) -> Vec<(&str, usize)> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for identifier in sequences.values() {
        *counts.entry(identifier.as_str()).or_default() += 1;
    }
    counts.into_iter().filter(|(_, count)| *count > 1).collect()
}

fn hits_table(rows: &[HitRow]) -> String {
    let mut table = String::new();
    for row in rows {
        table.push_str(&row.to_tsv_line());
        table.push('\n');
    }
    table
}

fn unmatched_table(unmatched: &IndexMap<String, String>) -> String {
    let mut table = String::new();
    for (identifier, content) in unmatched {
        table.push_str(identifier);
        table.push('\t');
        table.push_str(content);
        table.push('\n');
    }
    table
}
