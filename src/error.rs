use thiserror::Error;

/// Error taxonomy for the page writer. Mirrors the three failure classes a
/// commit can hit: an I/O failure from either file, a cache/timeout failure
/// during revision lookup, and a precondition violation that indicates a
/// caller bug rather than a runtime condition.
///
/// No variant is retried inside the writer — partial-commit safety comes
/// entirely from the dual uber-page and the last `data_sync`, not from
/// error recovery here. Once any variant is returned the writer must be
/// considered unusable.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("storage I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error("illegal writer state: {0}")]
    IllegalState(String),

    #[error("assertion failure: {0}")]
    AssertionFailure(String),
}

pub type WriterResult<T> = Result<T, WriterError>;
