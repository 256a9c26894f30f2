//! Media adapters: movie catalog, local video store and the ffmpeg transcoder.

pub mod catalog;
pub mod ffmpeg;
pub mod video_store;

pub use catalog::StaticMovieCatalog;
pub use ffmpeg::FfmpegTranscoder;
pub use video_store::{LocalVideoStore, VideoStream};
