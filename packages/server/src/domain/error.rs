//! Domain error types.

use thiserror::Error;

/// Value object construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("invalid file name '{0}'")]
    PathTraversal(String),
}

/// Room registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("room id '{0}' is already registered")]
    DuplicateRoomId(String),
}

/// Errors from parsing a `Range` request header against a file size
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("unsupported range unit in '{0}'")]
    UnsupportedUnit(String),

    #[error("malformed range '{0}'")]
    Malformed(String),

    #[error("range start {start} is beyond the file size {size}")]
    StartBeyondEnd { start: u64, size: u64 },

    #[error("range end {end} is before range start {start}")]
    EndBeforeStart { start: u64, end: u64 },
}

/// Media (catalog / video / thumbnail) access errors
#[derive(Debug, Error)]
pub enum MediaError {
    #[error(transparent)]
    InvalidName(#[from] ValueObjectError),

    #[error("media '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Range(#[from] RangeError),

    /// The upload body ended with an error before it was fully read.
    #[error("upload body interrupted: {0}")]
    Incomplete(#[source] std::io::Error),

    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// External transcoding tool failures
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {output}")]
    Failed {
        tool: String,
        status: String,
        output: String,
    },

    #[error("failed to parse duration from '{0}'")]
    InvalidDuration(String),
}
