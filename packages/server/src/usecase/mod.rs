//! Use case layer: room lifecycle, session membership, message dispatch,
//! cleanup and upload processing.

pub mod cleanup_rooms;
pub mod connect_participant;
pub mod create_room;
pub mod disconnect_participant;
pub mod error;
pub mod get_rooms;
pub mod process_upload;
pub mod send_message;

pub use cleanup_rooms::{CleanupRoomsUseCase, RoomSweeper};
pub use connect_participant::{ConnectParticipantUseCase, SessionRegistration};
pub use create_room::{CreateRoomUseCase, CreatedRoom};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{CreateRoomError, GetRoomError, JoinRoomError, UploadError};
pub use get_rooms::GetRoomsUseCase;
pub use process_upload::ProcessUploadUseCase;
pub use send_message::{Dispatch, SendMessageUseCase};
