//! Value objects for the watch party domain.

use std::fmt;

use serde::Serialize;

use super::error::ValueObjectError;

/// Maximum length of a display name, in characters.
pub const USERNAME_MAX_CHARS: usize = 64;

/// Display name used when a participant connects without one.
pub const DEFAULT_USERNAME: &str = "Anonymous";

macro_rules! token_value_object {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub(super) String);

        impl $name {
            /// Create a new id, rejecting empty or whitespace-only values.
            pub fn new(value: String) -> Result<Self, ValueObjectError> {
                if value.trim().is_empty() {
                    return Err(ValueObjectError::Empty($label));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

token_value_object!(
    /// Identifier of a room (short random token).
    RoomId,
    "room id"
);

token_value_object!(
    /// Identifier of one connection's participant. Only unique per process.
    ParticipantId,
    "participant id"
);

token_value_object!(
    /// Identifier of the content (movie) a room is watching.
    ContentId,
    "content id"
);

/// Participant display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Create a username; surrounding whitespace is trimmed.
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::Empty("username"));
        }
        if trimmed.chars().count() > USERNAME_MAX_CHARS {
            return Err(ValueObjectError::TooLong {
                field: "username",
                max: USERNAME_MAX_CHARS,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Build a username from optional user input, falling back to
    /// [`DEFAULT_USERNAME`] when it is missing or blank.
    pub fn or_default(value: Option<String>) -> Result<Self, ValueObjectError> {
        match value {
            Some(v) if !v.trim().is_empty() => Self::new(v),
            _ => Ok(Self(DEFAULT_USERNAME.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix timestamp in milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).max(0)
    }
}

/// Name of a stored media file (video or thumbnail).
///
/// Only plain file names are accepted so a request can never escape the
/// media directory it is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFileName(String);

impl MediaFileName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.is_empty() {
            return Err(ValueObjectError::Empty("file name"));
        }
        if value.contains("..") || value.contains('/') || value.contains('\\') {
            return Err(ValueObjectError::PathTraversal(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        match self.0.rfind('.') {
            Some(0) | None => &self.0,
            Some(idx) => &self.0[..idx],
        }
    }
}

impl fmt::Display for MediaFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
