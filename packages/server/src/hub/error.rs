use thiserror::Error;

/// Errors talking to a room hub
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// The hub loop has stopped (room evicted).
    #[error("room hub '{0}' has stopped")]
    Closed(String),
}
