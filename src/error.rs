//! Error types for profile merging.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while scanning, aligning or writing profile tables.
#[derive(Error, Debug)]
pub enum MergeError {
    /// Failed to read an input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A profile type found in the input has no layout entry
    #[error("{path}:{line}: no layout configured for profile type '{profile_type}'")]
    UnknownProfileType {
        path: PathBuf,
        line: usize,
        profile_type: String,
    },

    /// A data row has fewer tokens than its layout requires
    #[error("{path}:{line}: expected at least {expected} tokens, found {found}")]
    MalformedRow {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A non-blank line outside of any table
    #[error("{path}:{line}: line outside of a profile table: {text:?}")]
    UnexpectedLine {
        path: PathBuf,
        line: usize,
        text: String,
    },

    /// Reference rank has a table that a follower lacks
    #[error("table '{table}' missing from rank {rank}")]
    MissingTable { table: String, rank: String },

    /// Follower has a table that the reference rank lacks
    #[error("table '{table}' in rank {rank} does not exist in reference rank {reference}")]
    UnknownTable {
        table: String,
        rank: String,
        reference: String,
    },

    #[error("table '{table}': rank {rank} has {found} rows, reference has {expected}")]
    RowCountMismatch {
        table: String,
        rank: String,
        expected: usize,
        found: usize,
    },

    #[error("table '{table}' row {row}: rank {rank} identifies as {found:?}, reference has {expected:?}")]
    IdentityMismatch {
        table: String,
        rank: String,
        row: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("table '{table}' row {row}: rank {rank} has {found} value fields, need {expected}")]
    MissingField {
        table: String,
        rank: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("table '{table}': header row has {found} columns, need {expected}")]
    ShortHeader {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("rank {rank} has {found} retained lines, reference has {expected}")]
    LineCountMismatch {
        rank: String,
        expected: usize,
        found: usize,
    },

    #[error("line position {position}: rank {rank} has {found}, reference has {expected}")]
    StructureMismatch {
        rank: String,
        position: usize,
        expected: String,
        found: String,
    },

    /// Invalid layout entry
    #[error("invalid layout for '{profile_type}': {message}")]
    InvalidLayout {
        profile_type: String,
        message: String,
    },

    /// Layout file could not be parsed
    #[error("failed to parse layout file '{path}': {source}")]
    LayoutFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Invalid glob pattern
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
