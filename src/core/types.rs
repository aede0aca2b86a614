use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Reference sequences keyed by their content, in file order.
///
/// A content seen twice keeps the position of its first occurrence but takes
/// the identifier of the last one.
pub type ReferenceSequences = IndexMap<String, String>;

/// How the subject file is matched against the query index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// One bulk search of the whole subject file
    #[default]
    Known,
    /// One search per subject sequence, collecting the ones with no hit
    Unknown,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known => write!(f, "known"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One row of tabular alignment output.
///
/// Columns follow `sseqid qseqid pident length mismatch gapopen qstart qend sstart send evalue bitscore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitRow {
    pub subject_id: String,
    pub query_id: String,
    pub identity: f64,
    pub alignment_length: u64,
    pub mismatches: u64,
    pub gap_opens: u64,
    pub query_start: u64,
    pub query_end: u64,
    pub subject_start: u64,
    pub subject_end: u64,
    pub evalue: f64,
    pub bit_score: f64,

    /// The line exactly as the engine printed it
    #[serde(skip)]
    pub raw: String,
}

impl HitRow {
    /// Render the row for a result table.
    ///
    /// Uses the engine's own text when available so numeric formatting is not altered.
    #[must_use]
    pub fn to_tsv_line(&self) -> String {
        if !self.raw.is_empty() {
            return self.raw.clone();
        }
        format!(
            "{}\t{}\t{:.3}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:e}\t{}",
            self.subject_id,
            self.query_id,
            self.identity,
            self.alignment_length,
            self.mismatches,
            self.gap_opens,
            self.query_start,
            self.query_end,
            self.subject_start,
            self.subject_end,
            self.evalue,
            self.bit_score,
        )
    }
}

/// Classification of a single search call
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// At least one alignment passed the thresholds
    Hit(Vec<HitRow>),
    NoHit,
}

impl SearchOutcome {
    /// Build an outcome from parsed rows; an empty set means no hit.
    #[must_use]
    pub fn from_rows(rows: Vec<HitRow>) -> Self {
        if rows.is_empty() {
            Self::NoHit
        } else {
            Self::Hit(rows)
        }
    }

    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    #[must_use]
    pub fn rows(&self) -> &[HitRow] {
        match self {
            Self::Hit(rows) => rows,
            Self::NoHit => &[],
        }
    }
}
