//! Batch-fatal errors raised by the import pipeline.
//!
//! Row-level problems never surface here; they are collected as messages on
//! [`crate::validate::InvalidRow`] so one bad row cannot abort an upload.

use thiserror::Error;

/// Failures that abort a whole import call before any row is classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// Input is larger than the configured maximum.
    #[error("file is too large ({size} bytes, maximum is {limit} bytes)")]
    SizeLimitExceeded { size: usize, limit: usize },

    /// Input contains no non-blank lines.
    #[error("file is empty")]
    EmptyFile,

    /// First non-blank line does not produce any header fields.
    #[error("file has no header row")]
    MissingHeader,

    /// Nothing survived validation, so there is nothing to write.
    #[error("no valid rows to import")]
    NoValidRows,
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;
