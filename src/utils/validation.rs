//! Centralized validation and helper functions.

use std::path::{Path, PathBuf};

/// Maximum number of records read from a single sequence file
pub const MAX_SEQUENCES: usize = 1_000_000;

/// Longest file stem used for a per-sequence query file
pub const MAX_FILENAME_LENGTH: usize = 200;

/// Input validation error types
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("{role} file {} does not exist", .path.display())]
    InputNotFound { role: &'static str, path: PathBuf },

    #[error("{role} path {} is a directory, expected a file", .path.display())]
    NotAFile { role: &'static str, path: PathBuf },

    #[error("Output path {} exists and is not a directory", .0.display())]
    OutputNotADirectory(PathBuf),
}

/// Check that a required input file exists.
///
/// `role` names the input in the error message (e.g. "fasta", "matching").
///
/// # Errors
///
/// Returns `ValidationError::InputNotFound` if nothing exists at `path`, or
/// `ValidationError::NotAFile` if it is a directory.
pub fn validate_input_file(role: &'static str, path: &Path) -> Result<(), ValidationError> {
    if !path.exists() {
        return Err(ValidationError::InputNotFound {
            role,
            path: path.to_path_buf(),
        });
    }
    if path.is_dir() {
        return Err(ValidationError::NotAFile {
            role,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Check that the output location is usable as a folder.
///
/// A missing folder is fine; it is created later.
///
/// # Errors
///
/// Returns `ValidationError::OutputNotADirectory` if a non-directory exists at `path`.
pub fn validate_output_folder(path: &Path) -> Result<(), ValidationError> {
    if path.exists() && !path.is_dir() {
        return Err(ValidationError::OutputNotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Check if adding another record would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new record.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_sequence_limit(count: usize) -> Option<String> {
    if count >= MAX_SEQUENCES {
        Some(format!(
            "Too many sequences: adding another would exceed maximum of {MAX_SEQUENCES}"
        ))
    } else {
        None
    }
}

/// Turn a sequence identifier into a safe file stem.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
/// Leading dots are replaced so the file is never hidden, and the result is
/// never empty.
///
/// # Examples
///
/// ```
/// use s_rna_tools::utils::validation::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("hsa-miR-21-5p"), "hsa-miR-21-5p");
/// assert_eq!(sanitize_identifier("seq|1/2"), "seq_1_2");
/// assert_eq!(sanitize_identifier("../etc"), "_._etc");
/// ```
#[must_use]
pub fn sanitize_identifier(identifier: &str) -> String {
    let mut sanitized: String = identifier
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_LENGTH)
        .collect();

    if sanitized.starts_with('.') {
        sanitized.replace_range(..1, "_");
    }
    if sanitized.is_empty() {
        sanitized.push('_');
    }
    sanitized
}
