//! Entities of the watch party domain.

use super::value_object::{ContentId, ParticipantId, RoomId, Timestamp, Username};

/// The single authoritative play/pause/position record of a room.
///
/// Only the room hub mutates this value; everyone else works on copies.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Position in seconds.
    pub current_time: f64,
    /// Participant who last changed the state, `None` until the first change.
    pub last_update_by: Option<ParticipantId>,
    pub updated_at: Timestamp,
}

impl PlaybackState {
    /// Paused at position zero.
    pub fn new(now: Timestamp) -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            last_update_by: None,
            updated_at: now,
        }
    }

    /// Apply a playback change made by `actor` at `now`.
    pub fn apply(&mut self, change: PlaybackChange, actor: ParticipantId, now: Timestamp) {
        match change {
            PlaybackChange::Play { position } => {
                self.is_playing = true;
                self.current_time = position;
            }
            PlaybackChange::Pause { position } => {
                self.is_playing = false;
                self.current_time = position;
            }
            PlaybackChange::Seek { position } => {
                self.current_time = position;
            }
        }
        self.last_update_by = Some(actor);
        self.updated_at = now;
    }
}

/// A playback-affecting client action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackChange {
    Play { position: f64 },
    Pause { position: f64 },
    /// Moves the position; the playing flag is left untouched.
    Seek { position: f64 },
}

/// A connected room member as seen by others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub username: Username,
}

impl Participant {
    pub fn new(id: ParticipantId, username: Username) -> Self {
        Self { id, username }
    }
}

/// Immutable facts about a room, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomProfile {
    pub id: RoomId,
    pub content_id: ContentId,
    pub name: String,
    pub host_id: ParticipantId,
    pub created_at: Timestamp,
}

/// Point-in-time view of a room, combining its profile with live state.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSummary {
    pub profile: RoomProfile,
    pub member_count: usize,
    pub playback: PlaybackState,
}

/// Catalog entry for a watchable movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    pub id: ContentId,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub video_url: String,
    /// Length in seconds.
    pub duration: u32,
    pub created_at: Timestamp,
}
