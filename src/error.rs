//! Error types for the dashboard core.
//!
//! Each pipeline stage owns its error type so failures are reported close to
//! where they happen. The session wraps them in [`Error`] and short-circuits
//! the remaining stages.

use std::path::PathBuf;

use thiserror::Error;

/// Session-level error: one failed user interaction.
#[derive(Debug, Error)]
pub enum Error {
    /// Archive could not be extracted, or the expected member is absent
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Extracted file could not be turned into a table
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Filtered rows could not be written out
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Configuration is unusable
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An operation needs a loaded table and there is none
    #[error("no dataset loaded")]
    NoTable,

    /// A second upload was started while one is still extracting
    #[error("an upload is already in progress")]
    UploadInProgress,
}

/// Archive extraction errors.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Extraction directory could not be created
    #[error("cannot create extraction directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Archive file could not be opened
    #[error("cannot open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Container structure is broken or truncated
    #[error("malformed archive: {0}")]
    Malformed(#[from] zip::result::ZipError),

    /// A single entry failed to decompress or to be written
    #[error("cannot extract entry '{name}': {source}")]
    Entry {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Entry name points outside the extraction directory
    #[error("entry '{0}' escapes the extraction directory")]
    UnsafePath(String),

    /// The file the loader expects was not in the archive
    #[error("expected file '{name}' not found in archive (extracted to {root})")]
    MissingMember { name: String, root: PathBuf },
}

/// Tabular load errors.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited data{}: {source}", line_suffix(.line))]
    Csv {
        line: Option<u64>,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: column '{column}' is not valid {encoding}")]
    Encoding {
        line: u64,
        column: String,
        encoding: &'static str,
    },

    #[error("missing expected column(s): {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: '{value}' is not a valid non-negative volume")]
    InvalidVolume { line: u64, value: String },
}

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: character {ch:?} cannot be written as {encoding}")]
    Unencodable {
        row: usize,
        ch: char,
        encoding: &'static str,
    },
}

/// Snapshot cache errors. Never fatal: callers fall back to parsing.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("snapshot does not form a valid table: {0}")]
    Load(#[from] LoadError),

    #[error("unexpected snapshot schema: {0}")]
    Schema(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),
}

fn line_suffix(line: &Option<u64>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

/// Type alias for session-level results
pub type Result<T> = std::result::Result<T, Error>;
