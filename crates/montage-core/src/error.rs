//! Error types for Montage.

use thiserror::Error;

use crate::time::RationalTime;

/// Main error type for timeline operations.
///
/// Every variant is recoverable: a failed mutation leaves the timeline
/// exactly as it was before the call.
#[derive(Error, Debug)]
pub enum MontageError {
    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid trim: {0}")]
    InvalidTrim(String),

    #[error("invalid speed: {0}")]
    InvalidSpeed(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("overlap: {0}")]
    Overlap(String),

    #[error("caption too short: {duration} is below the minimum of {minimum}")]
    TooShort {
        duration: RationalTime,
        minimum: RationalTime,
    },

    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Fieldless discriminant of [`MontageError`], for callers that branch on
/// the kind of failure (e.g. to pick a user-facing message).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRange,
    InvalidTrim,
    InvalidSpeed,
    InvalidValue,
    OutOfRange,
    Overlap,
    TooShort,
    InvalidPermutation,
    UnsupportedOperation,
    NotFound,
    DuplicateId,
    Io,
    Serialization,
}

impl MontageError {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRange(_) => ErrorKind::InvalidRange,
            Self::InvalidTrim(_) => ErrorKind::InvalidTrim,
            Self::InvalidSpeed(_) => ErrorKind::InvalidSpeed,
            Self::InvalidValue(_) => ErrorKind::InvalidValue,
            Self::OutOfRange(_) => ErrorKind::OutOfRange,
            Self::Overlap(_) => ErrorKind::Overlap,
            Self::TooShort { .. } => ErrorKind::TooShort,
            Self::InvalidPermutation(_) => ErrorKind::InvalidPermutation,
            Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateId(_) => ErrorKind::DuplicateId,
            Self::Io(_) => ErrorKind::Io,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

/// Result type alias for Montage operations.
pub type Result<T> = std::result::Result<T, MontageError>;
