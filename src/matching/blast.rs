//! BLAST+ implementation of [`AlignmentEngine`].
//!
//! The index is a nucleotide BLAST database built with `makeblastdb`; searches
//! run `blastn` with tabular output (`-outfmt 6`). Each external call runs
//! under a timeout and the child process is killed when it expires.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use flate2::read::MultiGzDecoder;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::types::{HitRow, SearchOutcome};
use crate::matching::engine::{
    AlignmentEngine, IndexBuildError, SearchError, SearchIndex, SearchParams,
};
use crate::parsing::fasta::is_gzipped;
use crate::utils::validation::sanitize_identifier;

pub const DEFAULT_MAKEBLASTDB_BIN: &str = "makeblastdb";
pub const DEFAULT_BLASTN_BIN: &str = "blastn";
pub const MAKEBLASTDB_ENV_BIN: &str = "S_RNA_TOOLS_MAKEBLASTDB";
pub const BLASTN_ENV_BIN: &str = "S_RNA_TOOLS_BLASTN";

/// Default limit for a single external call
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Folder under the output folder that holds the BLAST database
pub const INDEX_FOLDER: &str = "blast_db";

/// Tabular columns requested from blastn, in `HitRow` order
pub const BLASTN_OUTFMT_FIELDS: &str =
    "6 sseqid qseqid pident length mismatch gapopen qstart qend sstart send evalue bitscore";

const BLASTN_OUTFMT_COLUMNS: usize = 12;

/// Executables and limits for BLAST+ calls
#[derive(Debug, Clone)]
pub struct BlastConfig {
    /// `makeblastdb` executable name or path
    pub makeblastdb: String,
    /// `blastn` executable name or path
    pub blastn: String,
    /// Limit for each external call
    pub timeout: Duration,
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            makeblastdb: DEFAULT_MAKEBLASTDB_BIN.to_string(),
            blastn: DEFAULT_BLASTN_BIN.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Why an external call produced no output
enum RunError {
    Io(std::io::Error),
    TimedOut,
}

/// BLAST+ engine
pub struct BlastEngine {
    config: BlastConfig,
    runtime: tokio::runtime::Runtime,
}

impl BlastEngine {
    /// Create an engine with its own single-threaded runtime for process timeouts.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the runtime cannot be created.
    pub fn new(config: BlastConfig) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { config, runtime })
    }

    /// Version line reported by `blastn -version`, if it can be run
    pub fn version(&self) -> Option<String> {
        let blastn = which::which(&self.config.blastn).ok()?;
        let output = self.run(&blastn, &["-version".to_string()]).ok()?;
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string())
    }

    fn timeout_secs(&self) -> u64 {
        self.config.timeout.as_secs()
    }

    /// Run an external program, killing it if it outlives the timeout
    fn run(&self, program: &Path, args: &[String]) -> Result<Output, RunError> {
        debug!(program = %program.display(), args = %args.join(" "), "Running external tool");

        let timeout = self.config.timeout;
        self.runtime.block_on(async {
            let output = tokio::process::Command::new(program)
                .args(args)
                .kill_on_drop(true)
                .output();

            match tokio::time::timeout(timeout, output).await {
                Ok(result) => result.map_err(RunError::Io),
                Err(_) => Err(RunError::TimedOut),
            }
        })
    }
}

impl AlignmentEngine for BlastEngine {
    fn name(&self) -> &str {
        "BLAST+"
    }

    fn build_index(
        &self,
        source: &Path,
        params: &SearchParams,
        output_folder: &Path,
    ) -> Result<SearchIndex, IndexBuildError> {
        let makeblastdb = which::which(&self.config.makeblastdb)
            .map_err(|_| IndexBuildError::EngineUnavailable(self.config.makeblastdb.clone()))?;

        let index_dir = output_folder.join(INDEX_FOLDER);
        std::fs::create_dir_all(&index_dir)?;
        let prefix = index_dir.join(index_name(source));

        // Kept until makeblastdb has finished
        let plain = plain_fasta(source, &index_dir)?;
        let input = plain.as_ref().map_or(source, NamedTempFile::path);

        let args = vec![
            "-in".to_string(),
            input.display().to_string(),
            "-dbtype".to_string(),
            "nucl".to_string(),
            "-out".to_string(),
            prefix.display().to_string(),
            "-parse_seqids".to_string(),
        ];

        let output = match self.run(&makeblastdb, &args) {
            Ok(output) => output,
            Err(RunError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IndexBuildError::EngineUnavailable(
                    self.config.makeblastdb.clone(),
                ));
            }
            Err(RunError::Io(e)) => return Err(IndexBuildError::Io(e)),
            Err(RunError::TimedOut) => return Err(IndexBuildError::TimedOut(self.timeout_secs())),
        };

        if !output.status.success() {
            return Err(IndexBuildError::Failed {
                status: output.status.code(),
                stderr: first_non_empty_line(&output.stdout, &output.stderr),
            });
        }

        if !is_index_ready(&prefix) {
            return Err(IndexBuildError::MissingIndex(prefix));
        }

        Ok(SearchIndex::new(source, prefix, params.clone()))
    }

    fn search(&self, index: &SearchIndex, query: &Path) -> Result<SearchOutcome, SearchError> {
        let blastn = which::which(&self.config.blastn)
            .map_err(|_| SearchError::EngineUnavailable(self.config.blastn.clone()))?;

        let scratch = index.location().parent().unwrap_or_else(|| Path::new("."));
        let plain = plain_fasta(query, scratch)?;
        let query = plain.as_ref().map_or(query, NamedTempFile::path);

        let params = index.params();
        let args = vec![
            "-task".to_string(),
            params.task.clone(),
            "-db".to_string(),
            index.location().display().to_string(),
            "-query".to_string(),
            query.display().to_string(),
            "-perc_identity".to_string(),
            params.min_identity.to_string(),
            "-evalue".to_string(),
            params.max_evalue.to_string(),
            "-outfmt".to_string(),
            BLASTN_OUTFMT_FIELDS.to_string(),
        ];

        let output = match self.run(&blastn, &args) {
            Ok(output) => output,
            Err(RunError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SearchError::EngineUnavailable(self.config.blastn.clone()));
            }
            Err(RunError::Io(e)) => return Err(SearchError::Io(e)),
            Err(RunError::TimedOut) => return Err(SearchError::TimedOut(self.timeout_secs())),
        };

        if !output.status.success() {
            return Err(SearchError::Failed {
                status: output.status.code(),
                stderr: first_non_empty_line(&output.stdout, &output.stderr),
            });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(query = %query.display(), "blastn: {}", stderr.trim());
        }

        let rows = parse_tabular_hits(&String::from_utf8_lossy(&output.stdout))?;
        Ok(SearchOutcome::from_rows(rows))
    }
}

/// Decompress a gzipped FASTA into `folder`, since BLAST+ only reads plain text.
///
/// Returns `None` for an uncompressed file. The copy is removed when dropped.
fn plain_fasta(source: &Path, folder: &Path) -> std::io::Result<Option<NamedTempFile>> {
    if !is_gzipped(source) {
        return Ok(None);
    }

    let mut plain = tempfile::Builder::new()
        .prefix(&format!("{}.", index_name(source)))
        .suffix(".fa")
        .tempfile_in(folder)?;
    let mut decoder = MultiGzDecoder::new(File::open(source)?);
    std::io::copy(&mut decoder, &mut plain)?;
    plain.flush()?;

    debug!(source = %source.display(), plain = %plain.path().display(), "Decompressed input for BLAST+");
    Ok(Some(plain))
}

/// Database name derived from the indexed file (`reads.fa.gz` -> `reads`)
fn index_name(source: &Path) -> String {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        "index".to_string()
    } else {
        sanitize_identifier(stem)
    }
}

fn is_index_suffix(suffix: &str) -> bool {
    matches!(
        suffix,
        "nhr" | "nin" | "nsq" | "nal" | "ndb" | "not" | "ntf" | "nto" | "nog" | "nos" | "nsd" | "nsi"
    )
}

/// List database files written next to `prefix`
fn collect_index_files(prefix: &Path) -> Vec<PathBuf> {
    let Some(parent) = prefix.parent() else {
        return vec![];
    };
    let Some(base_name) = prefix.file_name().and_then(|v| v.to_str()) else {
        return vec![];
    };
    let leading = format!("{base_name}.");

    let mut files: Vec<PathBuf> = std::fs::read_dir(parent)
        .ok()
        .into_iter()
        .flat_map(|iter| iter.flatten())
        .filter_map(|entry| {
            let name = entry.file_name();
            let suffix = name.to_str()?.strip_prefix(&leading)?.to_string();
            // Multi-volume databases add a volume number: prefix.00.nsq
            let suffix = suffix.rsplit('.').next().unwrap_or_default().to_string();
            is_index_suffix(&suffix).then(|| entry.path())
        })
        .collect();
    files.sort();
    files
}

/// A database is usable once headers, offsets and sequences exist (or an alias file)
fn is_index_ready(prefix: &Path) -> bool {
    let files = collect_index_files(prefix);
    let has = |suffix: &str| {
        files
            .iter()
            .any(|f| f.extension().and_then(|e| e.to_str()) == Some(suffix))
    };
    has("nal") || (has("nhr") && has("nin") && has("nsq"))
}

fn first_non_empty_line(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = String::from_utf8_lossy(stdout);
    stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no output")
        .to_string()
}

/// Parse `-outfmt 6` rows in [`BLASTN_OUTFMT_FIELDS`] order.
///
/// Blank lines and `#` comment lines are skipped.
///
/// # Errors
///
/// Returns `SearchError::MalformedOutput` for a row with the wrong number of
/// columns or a non-numeric value in a numeric column.
pub fn parse_tabular_hits(stdout: &str) -> Result<Vec<HitRow>, SearchError> {
    let mut hits = Vec::new();

    for (idx, line) in stdout.lines().enumerate() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let line_no = idx + 1;
        let cols: Vec<&str> = trimmed.split('\t').collect();
        if cols.len() != BLASTN_OUTFMT_COLUMNS {
            return Err(SearchError::MalformedOutput {
                line: line_no,
                message: format!(
                    "expected {BLASTN_OUTFMT_COLUMNS} tab-separated fields, got {}",
                    cols.len()
                ),
            });
        }

        let malformed = |name: &str, raw: &str| SearchError::MalformedOutput {
            line: line_no,
            message: format!("could not parse {name}='{raw}'"),
        };
        let parse_u64 = |raw: &str, name: &str| raw.parse::<u64>().map_err(|_| malformed(name, raw));
        let parse_f64 = |raw: &str, name: &str| raw.parse::<f64>().map_err(|_| malformed(name, raw));

        hits.push(HitRow {
            subject_id: cols[0].to_string(),
            query_id: cols[1].to_string(),
            identity: parse_f64(cols[2], "pident")?,
            alignment_length: parse_u64(cols[3], "length")?,
            mismatches: parse_u64(cols[4], "mismatch")?,
            gap_opens: parse_u64(cols[5], "gapopen")?,
            query_start: parse_u64(cols[6], "qstart")?,
            query_end: parse_u64(cols[7], "qend")?,
            subject_start: parse_u64(cols[8], "sstart")?,
            subject_end: parse_u64(cols[9], "send")?,
            evalue: parse_f64(cols[10], "evalue")?,
            bit_score: parse_f64(cols[11].trim(), "bitscore")?,
            raw: trimmed.to_string(),
        });
    }

    Ok(hits)
}
