//! Random identifier generation.

use uuid::Uuid;

use super::value_object::{ParticipantId, RoomId};

/// Length of generated room and participant tokens.
pub const TOKEN_LEN: usize = 8;

fn short_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(TOKEN_LEN);
    token
}

/// Factory for fresh room ids.
///
/// Tokens are short, so collisions are possible; the registry rejects a
/// duplicate and the caller generates another one.
pub struct RoomIdFactory;

impl RoomIdFactory {
    pub fn generate() -> RoomId {
        RoomId(short_token())
    }
}

/// Factory for fresh participant ids.
pub struct ParticipantIdFactory;

impl ParticipantIdFactory {
    pub fn generate() -> ParticipantId {
        ParticipantId(short_token())
    }
}
