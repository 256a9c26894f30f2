//! Conversion logic between DTOs and domain entities.

use watchparty_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    ContentId, Movie, Participant, PlaybackState, RoomSummary, Timestamp, ValueObjectError,
};
use crate::infrastructure::dto::{http, websocket};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&PlaybackState> for websocket::PlaybackStateDto {
    fn from(state: &PlaybackState) -> Self {
        Self {
            is_playing: state.is_playing,
            current_time: state.current_time,
            last_update_by: state
                .last_update_by
                .as_ref()
                .map(|id| id.as_str().to_string())
                .unwrap_or_default(),
            updated_at: timestamp_to_rfc3339(state.updated_at.value()),
        }
    }
}

impl From<&Participant> for websocket::UserInfo {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id.as_str().to_string(),
            username: participant.username.as_str().to_string(),
        }
    }
}

impl From<RoomSummary> for http::RoomSummaryDto {
    fn from(summary: RoomSummary) -> Self {
        Self {
            playback_state: (&summary.playback).into(),
            id: summary.profile.id.into_string(),
            content_id: summary.profile.content_id.into_string(),
            name: summary.profile.name,
            host_id: summary.profile.host_id.into_string(),
            user_count: summary.member_count,
            created_at: timestamp_to_rfc3339(summary.profile.created_at.value()),
        }
    }
}

impl From<Movie> for http::MovieDto {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id.into_string(),
            title: movie.title,
            description: movie.description,
            thumbnail: movie.thumbnail_url,
            video_url: movie.video_url,
            duration: movie.duration,
            created_at: Some(timestamp_to_rfc3339(movie.created_at.value())),
        }
    }
}

// ========================================
// DTO → Domain Entity
// ========================================

impl http::MovieDto {
    /// Convert a catalog file entry; entries without a creation time get `loaded_at`.
    pub fn into_movie(self, loaded_at: Timestamp) -> Result<Movie, ValueObjectError> {
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|value| chrono::DateTime::parse_from_rfc3339(value).ok())
            .map(|dt| Timestamp::new(dt.timestamp_millis()))
            .unwrap_or(loaded_at);

        Ok(Movie {
            id: ContentId::new(self.id)?,
            title: self.title,
            description: self.description,
            thumbnail_url: self.thumbnail,
            video_url: self.video_url,
            duration: self.duration,
            created_at,
        })
    }
}
