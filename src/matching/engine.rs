use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::SearchOutcome;

/// Alignment mode tuned for queries shorter than ~30 nt
pub const DEFAULT_TASK: &str = "blastn-short";

/// Minimum percent identity for an alignment to count as a hit
pub const DEFAULT_MIN_IDENTITY: f64 = 90.0;

/// Maximum e-value for an alignment to count as a hit
pub const DEFAULT_MAX_EVALUE: f64 = 0.05;

/// Parameters an index is built with and every search against it uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Engine search mode (e.g. `blastn-short`)
    pub task: String,
    /// Minimum percent identity (0-100)
    pub min_identity: f64,
    /// Maximum e-value
    pub max_evalue: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            task: DEFAULT_TASK.to_string(),
            min_identity: DEFAULT_MIN_IDENTITY,
            max_evalue: DEFAULT_MAX_EVALUE,
        }
    }
}

/// A searchable index built from a sequence file.
///
/// Only the engine that built it knows what lives at `location`.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    source: PathBuf,
    location: PathBuf,
    params: SearchParams,
}

impl SearchIndex {
    pub fn new(source: impl Into<PathBuf>, location: impl Into<PathBuf>, params: SearchParams) -> Self {
        Self {
            source: source.into(),
            location: location.into(),
            params,
        }
    }

    /// The sequence file the index was built from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Engine-specific location of the index (e.g. a BLAST database prefix)
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }
}

#[derive(Error, Debug)]
pub enum IndexBuildError {
    #[error("Index builder '{0}' not found. Install BLAST+ or set S_RNA_TOOLS_MAKEBLASTDB")]
    EngineUnavailable(String),

    #[error("Failed to run index builder: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index builder failed (status {status:?}): {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("Index builder reported success but no index files were produced at {}", .0.display())]
    MissingIndex(PathBuf),

    #[error("Index builder did not finish within {0} seconds")]
    TimedOut(u64),
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search executable '{0}' not found. Install BLAST+ or set S_RNA_TOOLS_BLASTN")]
    EngineUnavailable(String),

    #[error("Failed to run search: {0}")]
    Io(#[from] std::io::Error),

    #[error("Search failed (status {status:?}): {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("Malformed search output at line {line}: {message}")]
    MalformedOutput { line: usize, message: String },

    #[error("Search did not finish within {0} seconds")]
    TimedOut(u64),
}

/// A local-alignment search engine.
///
/// Implementations build one index from a sequence file and then answer any
/// number of searches against it. Every call blocks until the engine is done.
pub trait AlignmentEngine {
    /// Short name used in log messages
    fn name(&self) -> &str;

    /// Build an index from `source`, placing any artifacts under `output_folder`.
    ///
    /// # Errors
    ///
    /// Returns an `IndexBuildError` if the engine is missing, fails, or times out.
    fn build_index(
        &self,
        source: &Path,
        params: &SearchParams,
        output_folder: &Path,
    ) -> Result<SearchIndex, IndexBuildError>;

    /// Search every record of `query` against `index`.
    ///
    /// # Errors
    ///
    /// Returns a `SearchError` if the engine fails, times out, or its output
    /// cannot be parsed. A search with no qualifying alignment is not an error.
    fn search(&self, index: &SearchIndex, query: &Path) -> Result<SearchOutcome, SearchError>;
}
