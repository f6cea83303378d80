//! Errors in the library.
use std::path::PathBuf;
use thiserror::Error;

/// Kinds of failures raised by the learning core.
///
/// Library functions return [`anyhow::Result`]; callers that need to branch on
/// the kind of a failure can `downcast_ref::<PixelDqnError>()` the error.
#[derive(Error, Debug)]
pub enum PixelDqnError {
    /// A precondition on input data was violated, e.g., a frame whose size is not
    /// divisible by the downsampling factor.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A configuration was rejected at construction time.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Saving or loading parameters failed.
    #[error("Storage failure at {path:?}: {source}")]
    Storage {
        /// File or directory being accessed.
        path: PathBuf,

        /// Underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// NaN or infinite values were detected.
    #[error("Numerical failure: {0}")]
    Numerical(String),

    /// Key was not found in a record.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Value of a record had an unexpected type.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}

impl PixelDqnError {
    /// Wraps an error as a storage failure at the given path.
    pub fn storage(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Self::Storage {
            path: path.into(),
            source: source.into(),
        }
    }
}
