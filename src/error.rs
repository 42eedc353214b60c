//! Error types for Sweeplab
//!
//! Every failure is terminal for its unit of work (one configuration,
//! one load, one merge). There are no automatic retries anywhere in
//! this crate: training runs are expensive, and a silent retry could
//! mask a nondeterministic trainer bug.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Sweeplab error types
#[derive(Error, Debug)]
pub enum Error {
    /// A result payload does not match the expected structure
    /// (wrong top-level keys, wrong episode field set, illegal move symbol).
    #[error("schema violation at `{field}`: {reason}")]
    SchemaViolation {
        /// The offending field
        field: String,
        /// What was wrong with it
        reason: String,
    },

    /// A cached result file exists but failed validation on load.
    ///
    /// Deliberately NOT healed by retraining: a bad cache entry means
    /// something wrote corrupt data, and that bug should surface.
    #[error("corrupt cache entry at {}: {source}", .path.display())]
    CorruptCacheEntry {
        /// Path of the offending result file
        path: PathBuf,
        /// The underlying validation or parse failure
        #[source]
        source: Box<Error>,
    },

    /// The external trainer process failed (nonzero exit status,
    /// termination by signal, or a clean exit that wrote no result file).
    #[error("trainer execution failed: {0}")]
    TrainerExecution(String),

    /// Two runs within a sweep produced flattened tables with different
    /// column sets. Merging is refused rather than padding or dropping.
    #[error("inconsistent sweep schema: expected columns [{expected}], found [{found}]")]
    InconsistentSweepSchema {
        /// Column set of the first table in the sweep
        expected: String,
        /// Column set of the mismatching table
        found: String,
    },

    /// Invalid caller input (zero window size, unknown column,
    /// out-of-range quantile level, type-mismatched sweep override)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet export error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl Error {
    /// Shorthand for a [`Error::SchemaViolation`].
    pub(crate) fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
