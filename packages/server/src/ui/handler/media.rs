//! HTTP handlers for the movie catalog, video streaming, thumbnails and uploads.

use std::{io, sync::Arc};

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::{
    domain::{ContentId, MediaError, MediaFileName},
    infrastructure::dto::http::{MovieDto, UploadResponse},
    ui::state::AppState,
    usecase::UploadError,
};

use super::http::error_response;

/// Multipart field carrying the uploaded video.
const UPLOAD_FIELD: &str = "video";

/// Get list of movies
pub async fn get_movies(State(state): State<Arc<AppState>>) -> Json<Vec<MovieDto>> {
    Json(state.catalog.list().into_iter().map(MovieDto::from).collect())
}

/// Get one movie by ID
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
) -> Result<Json<MovieDto>, Response> {
    ContentId::new(movie_id)
        .ok()
        .and_then(|id| state.catalog.get(&id))
        .map(|movie| Json(movie.into()))
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Movie not found"))
}

/// Stream a video, whole or as a single byte range
pub async fn stream_video(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Response {
    let name = match MediaFileName::new(filename) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!("Rejected video request: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid file name");
        }
    };
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let stream = match state.video_store.open(&name, range).await {
        Ok(stream) => stream,
        Err(MediaError::NotFound(_)) => {
            return error_response(StatusCode::NOT_FOUND, "Video not found");
        }
        Err(MediaError::Range(e)) => {
            tracing::debug!("Unsatisfiable range for {}: {}", name, e);
            return error_response(StatusCode::RANGE_NOT_SATISFIABLE, "Invalid range");
        }
        Err(MediaError::InvalidName(_)) => {
            return error_response(StatusCode::BAD_REQUEST, "Invalid file name");
        }
        Err(e @ (MediaError::Io(_) | MediaError::Incomplete(_))) => {
            tracing::error!("Failed to open video {}: {}", name, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Could not read video");
        }
    };

    let status = if stream.range.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };
    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
    response_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(stream.content_length()));
    if let Some(range) = stream.range {
        if let Ok(value) = HeaderValue::from_str(&range.content_range()) {
            response_headers.insert(header::CONTENT_RANGE, value);
        }
    }

    let body = Body::from_stream(ReaderStream::new(stream.reader));
    (status, response_headers, body).into_response()
}

/// Serve a thumbnail, falling back to the default one
pub async fn get_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    let name = match MediaFileName::new(filename) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!("Rejected thumbnail request: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid file name");
        }
    };

    let path = state.video_store.thumbnail_or_default(&name).await;
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = match path.extension().and_then(|ext| ext.to_str()) {
                Some("png") => "image/png",
                Some("webp") => "image/webp",
                _ => "image/jpeg",
            };
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            error_response(StatusCode::NOT_FOUND, "Thumbnail not found")
        }
        Err(e) => {
            tracing::error!("Failed to read thumbnail {}: {}", path.display(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Could not read thumbnail")
        }
    }
}

/// Upload a video (multipart field `video`)
pub async fn upload_video(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Malformed upload: {}", e);
                return error_response(rejection_status(&e), "File too large or malformed");
            }
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            return error_response(StatusCode::BAD_REQUEST, "Error retrieving file");
        };

        let reader = StreamReader::new(Box::pin(field.map_err(io::Error::other)));
        let usecase = state.process_upload_usecase.clone();
        return match usecase.execute(filename, reader).await {
            Ok(name) => {
                let response_name = name.as_str().to_string();
                // 後処理はレスポンスを待たせずにバックグラウンドで行う
                tokio::spawn(async move {
                    usecase.post_process(&name).await;
                });
                Json(UploadResponse {
                    message: "Video uploaded successfully".to_string(),
                    filename: response_name,
                })
                .into_response()
            }
            Err(UploadError::InvalidName(e)) => {
                tracing::warn!("Rejected upload: {}", e);
                error_response(StatusCode::BAD_REQUEST, "Invalid file name")
            }
            Err(UploadError::Interrupted(e)) => {
                tracing::warn!("Upload body failed: {}", e);
                let status = e
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<MultipartError>())
                    .map_or(StatusCode::BAD_REQUEST, rejection_status);
                error_response(status, "File too large or malformed")
            }
            Err(UploadError::Storage(e)) => {
                tracing::error!("Failed to save upload: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error saving file")
            }
        };
    }

    error_response(StatusCode::BAD_REQUEST, "Error retrieving file")
}

/// Client-side status for a multipart failure: 413 over the body limit, 400 otherwise.
fn rejection_status(error: &MultipartError) -> StatusCode {
    match error.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    }
}
