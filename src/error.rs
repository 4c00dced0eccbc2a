// Custom error types for the comps pipeline.
// Input-level failures get their own variants so the CLI can surface a useful
// message; orchestration layers above this use anyhow with context.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompsError {
    /// CSV could not be read or written (undecodable upload, malformed rows,
    /// or a failed snapshot write).
    #[error("CSV processing failed: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the CSV header row.
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// The upload is not UTF-8 text.
    #[error("uploaded file is not valid UTF-8")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// Result alias used by the ingest/store layers
pub type CompsResult<T> = Result<T, CompsError>;
