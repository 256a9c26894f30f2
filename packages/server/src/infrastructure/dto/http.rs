//! HTTP API request and response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::PlaybackStateDto;

/// `POST /api/rooms` body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[serde(alias = "movieId")]
    pub content_id: String,
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// `POST /api/rooms` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room: RoomSummaryDto,
    pub user_id: String,
}

/// Room summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub content_id: String,
    pub name: String,
    pub host_id: String,
    pub user_count: usize,
    pub playback_state: PlaybackStateDto,
    pub created_at: String,
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDto {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    pub video_url: String,
    /// Length in seconds
    #[serde(default)]
    pub duration: u32,
    /// RFC 3339; catalog files may omit it
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `POST /api/upload` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
}

/// `GET /api/rooms/{id}/connect` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectQuery {
    pub username: Option<String>,
}
