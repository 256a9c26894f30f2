//! Use case error types.

use thiserror::Error;

use crate::domain::{MediaError, RepositoryError, ValueObjectError};

/// Room creation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateRoomError {
    #[error("invalid room request: {0}")]
    InvalidInput(#[from] ValueObjectError),

    #[error("could not allocate a unique room id after {0} attempts")]
    IdSpaceExhausted(usize),
}

/// Room lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomError {
    #[error("room '{0}' not found")]
    NotFound(String),
}

/// Errors while attaching a new session to a room
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRoomError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("invalid username: {0}")]
    InvalidUsername(#[from] ValueObjectError),

    #[error("room '{0}' is closed")]
    HubClosed(String),
}

impl From<RepositoryError> for JoinRoomError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::RoomNotFound(id) | RepositoryError::DuplicateRoomId(id) => {
                Self::RoomNotFound(id)
            }
        }
    }
}

/// Video upload errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid file name: {0}")]
    InvalidName(#[from] ValueObjectError),

    /// The request body failed before it was fully received.
    #[error("upload interrupted: {0}")]
    Interrupted(#[source] std::io::Error),

    #[error("failed to store upload: {0}")]
    Storage(MediaError),
}

impl From<MediaError> for UploadError {
    fn from(error: MediaError) -> Self {
        match error {
            MediaError::Incomplete(e) => Self::Interrupted(e),
            other => Self::Storage(other),
        }
    }
}
