//! Reader for FASTA files using noodles.
//!
//! Builds the content-to-identifier mapping used for per-sequence matching.
//! Supports both uncompressed and gzip/bgzip compressed files.
//!
//! Supported extensions:
//! - `.fa`, `.fasta`, `.fna` (uncompressed)
//! - `.fa.gz`, `.fasta.gz`, `.fna.gz` (gzip compressed)
//! - `.fa.bgz`, `.fasta.bgz`, `.fna.bgz` (bgzip compressed)

use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::fasta;
use thiserror::Error;
use tracing::debug;

use crate::core::types::ReferenceSequences;
use crate::utils::validation::check_sequence_limit;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed FASTA file {path}: {message}")]
    Malformed { path: String, message: String },

    #[error("Too many sequences: {0} exceeds maximum allowed (1000000)")]
    TooManySequences(usize),
}

/// Check if the path has a FASTA extension
pub fn is_fasta_file(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();

    // Check for gzipped FASTA
    if path_str.ends_with(".fa.gz")
        || path_str.ends_with(".fasta.gz")
        || path_str.ends_with(".fna.gz")
        || path_str.ends_with(".fa.bgz")
        || path_str.ends_with(".fasta.bgz")
        || path_str.ends_with(".fna.bgz")
    {
        return true;
    }

    // Check for uncompressed FASTA
    matches!(
        path.extension()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .as_deref(),
        Some("fa" | "fasta" | "fna")
    )
}

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
pub fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Read every record of a FASTA file into a `content -> identifier` mapping.
///
/// The content is the sequence exactly as stored, with line breaks removed and
/// case preserved. The identifier is the record name (first word of the header,
/// so `> r1` and `>r1` both name `r1`). Entries follow file order. When the same
/// content appears more than once the last identifier wins, and the entry stays
/// where the content was first seen.
///
/// An empty file yields an empty mapping. Blank lines before the first record
/// are ignored.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Malformed`
/// if a record cannot be parsed, or `ParseError::TooManySequences` if the limit
/// is exceeded.
pub fn read_sequences(path: &Path) -> Result<ReferenceSequences, ParseError> {
    let file = std::fs::File::open(path)?;

    let mut raw = Vec::new();
    if is_gzipped(path) {
        MultiGzDecoder::new(file).read_to_end(&mut raw)?;
    } else {
        BufReader::new(file).read_to_end(&mut raw)?;
    }

    let text = normalize_headers(&raw);
    let sequences = read_sequences_from(&mut fasta::io::Reader::new(&text[..]), path)?;

    debug!(
        path = %path.display(),
        distinct = sequences.len(),
        "Read reference sequences"
    );
    Ok(sequences)
}

/// Drop blank lines ahead of the first record and the blanks between `>` and
/// the record name, which noodles rejects.
fn normalize_headers(raw: &[u8]) -> Vec<u8> {
    let mut text = Vec::with_capacity(raw.len());
    let mut started = false;

    for line in raw.split_inclusive(|&b| b == b'\n') {
        if !started && line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        started = true;

        match line.strip_prefix(b">") {
            Some(header) => {
                let name_start = header
                    .iter()
                    .position(|&b| b != b' ' && b != b'\t')
                    .unwrap_or(header.len());
                text.push(b'>');
                text.extend_from_slice(&header[name_start..]);
            }
            None => text.extend_from_slice(line),
        }
    }

    text
}

/// Collect records from a noodles FASTA reader
fn read_sequences_from<R: BufRead>(
    reader: &mut fasta::io::Reader<R>,
    path: &Path,
) -> Result<ReferenceSequences, ParseError> {
    let mut sequences = ReferenceSequences::new();
    let mut records = 0usize;

    for result in reader.records() {
        let record = result.map_err(|e| ParseError::Malformed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        if check_sequence_limit(records).is_some() {
            return Err(ParseError::TooManySequences(records));
        }
        records += 1;

        let identifier = String::from_utf8_lossy(record.name()).to_string();
        let content = String::from_utf8_lossy(record.sequence().as_ref()).to_string();

        // IndexMap keeps the original slot and replaces the value
        sequences.insert(content, identifier);
    }

    Ok(sequences)
}
