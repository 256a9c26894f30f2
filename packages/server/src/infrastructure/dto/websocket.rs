//! WebSocket wire envelope and per-type payloads.
//!
//! Every frame is one JSON [`Envelope`]. The `type` field selects how `data`
//! is interpreted; payloads are decoded on demand so an unknown or
//! server-only type never fails the envelope decode itself.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

/// Closed set of message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Join,
    Leave,
    Play,
    Pause,
    Seek,
    Sync,
    Chat,
    UserList,
    Error,
    Offer,
    Answer,
    IceCandidate,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Seek => "seek",
            Self::Sync => "sync",
            Self::Chat => "chat",
            Self::UserList => "userList",
            Self::Error => "error",
            Self::Offer => "offer",
            Self::Answer => "answer",
            Self::IceCandidate => "ice-candidate",
        }
    }

    /// Types only the server may originate.
    pub fn is_server_only(&self) -> bool {
        matches!(self, Self::Sync | Self::UserList | Self::Error)
    }

    /// Point-to-point signaling handshake types.
    pub fn is_signaling(&self) -> bool {
        matches!(self, Self::Offer | Self::Answer | Self::IceCandidate)
    }
}

impl FromStr for MessageType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let message_type = match s {
            "join" => Self::Join,
            "leave" => Self::Leave,
            "play" => Self::Play,
            "pause" => Self::Pause,
            "seek" => Self::Seek,
            "sync" => Self::Sync,
            "chat" => Self::Chat,
            "userList" => Self::UserList,
            "error" => Self::Error,
            "offer" => Self::Offer,
            "answer" => Self::Answer,
            "ice-candidate" => Self::IceCandidate,
            other => return Err(CodecError::UnknownType(other.to_string())),
        };
        Ok(message_type)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Codec errors. All of them are protocol errors: logged and dropped.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("missing payload for '{0}'")]
    MissingPayload(MessageType),

    #[error("malformed payload for '{kind}': {source}")]
    MalformedPayload {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Wire envelope
///
/// `user_id`, `username`, `room_id` and `timestamp` are server-populated:
/// whatever a client puts there is overwritten on ingress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Target participant id, signaling messages only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Envelope {
    /// Build a server-originated envelope.
    pub fn server(kind: MessageType, room_id: &str, data: Value, timestamp: String) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            room_id: Some(room_id.to_string()),
            user_id: None,
            username: None,
            to: None,
            data: Some(data),
            timestamp: Some(timestamp),
        }
    }

    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        serde_json::from_str(text).map_err(CodecError::MalformedEnvelope)
    }

    /// Encode into one text frame.
    pub fn encode(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Encode)
    }

    /// The typed message type, if the tag is known.
    pub fn message_type(&self) -> Result<MessageType, CodecError> {
        self.kind.parse()
    }

    /// Decode `data` into the payload shape of `kind`.
    pub fn payload<T: DeserializeOwned>(&self, kind: MessageType) -> Result<T, CodecError> {
        let data = self
            .data
            .clone()
            .ok_or(CodecError::MissingPayload(kind))?;
        serde_json::from_value(data).map_err(|source| CodecError::MalformedPayload { kind, source })
    }

    /// Overwrite the server-populated fields with the sender's identity.
    pub fn stamp(&mut self, room_id: &str, user_id: &str, username: &str, timestamp: String) {
        self.room_id = Some(room_id.to_string());
        self.user_id = Some(user_id.to_string());
        self.username = Some(username.to_string());
        self.timestamp = Some(timestamp);
    }
}

/// `play` / `pause` payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayPausePayload {
    pub current_time: f64,
}

/// `seek` payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekPayload {
    pub time: f64,
}

/// `chat` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub message: String,
}

/// `error` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// `sync` payload: Playback State snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStateDto {
    pub is_playing: bool,
    pub current_time: f64,
    pub last_update_by: String,
    pub updated_at: String,
}

/// One `userList` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
}
