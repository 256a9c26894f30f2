//! Domain layer: value objects, entities and the ports the use cases depend on.

pub mod byte_range;
pub mod entity;
pub mod error;
pub mod factory;
pub mod media;
pub mod repository;
pub mod value_object;

pub use byte_range::ByteRange;
pub use entity::{
    Movie, Participant, PlaybackChange, PlaybackState, RoomProfile, RoomSummary,
};
pub use error::{MediaError, RangeError, RepositoryError, TranscodeError, ValueObjectError};
pub use factory::{ParticipantIdFactory, RoomIdFactory};
pub use media::{MovieCatalog, Transcoder};
#[cfg(test)]
pub use media::MockTranscoder;
pub use repository::RoomRepository;
pub use value_object::{
    ContentId, DEFAULT_USERNAME, MediaFileName, ParticipantId, RoomId, Timestamp, Username,
};
