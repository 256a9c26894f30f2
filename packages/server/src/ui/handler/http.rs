//! HTTP API endpoint handlers for rooms.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    infrastructure::dto::http::{CreateRoomRequest, CreateRoomResponse, RoomSummaryDto},
    ui::state::AppState,
    usecase::{CreateRoomError, GetRoomError},
};
use watchparty_shared::time::timestamp_to_rfc3339;

/// Plain `{error}` body with a status code.
pub(super) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "time": timestamp_to_rfc3339(state.clock.now_millis()),
    }))
}

/// Create a room
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!("Invalid create room request: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, "Invalid request");
        }
    };

    match state
        .create_room_usecase
        .execute(request.content_id, request.room_name, request.username)
        .await
    {
        Ok(created) => Json(CreateRoomResponse {
            room: created.summary.into(),
            user_id: created.host_id.into_string(),
        })
        .into_response(),
        Err(e @ CreateRoomError::InvalidInput(_)) => {
            tracing::warn!("Rejected create room request: {}", e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ CreateRoomError::IdSpaceExhausted(_)) => {
            tracing::error!("{}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Could not create room")
        }
    }
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.get_rooms_usecase.list().await;

    // Domain Model から DTO への変換
    Json(rooms.into_iter().map(RoomSummaryDto::from).collect())
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSummaryDto>, Response> {
    match state.get_rooms_usecase.get(room_id).await {
        Ok(summary) => Ok(Json(summary.into())),
        Err(GetRoomError::NotFound(id)) => {
            tracing::debug!("Room {} not found", id);
            Err(error_response(StatusCode::NOT_FOUND, "Room not found"))
        }
    }
}
