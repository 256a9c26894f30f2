//! Request handlers.

mod http;
mod media;
mod websocket;

pub use http::{create_room, get_room_detail, get_rooms, health_check};
pub use media::{get_movie, get_movies, get_thumbnail, stream_video, upload_video};
pub use websocket::websocket_handler;
