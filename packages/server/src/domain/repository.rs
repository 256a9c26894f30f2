//! Repository trait 定義
//!
//! ルームレジストリ（ルーム ID → Room Hub）へのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use std::time::Duration;

use async_trait::async_trait;

use crate::hub::RoomHandle;

use super::{RepositoryError, RoomId, Timestamp};

/// Room Repository trait
///
/// The registry owns the set of live room hubs. Every method holds the
/// registry lock only for the duration of the map update; no hub operation
/// or network I/O ever happens under it.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Register a new room. Fails with `DuplicateRoomId` if the id is taken.
    async fn insert(&self, handle: RoomHandle) -> Result<(), RepositoryError>;

    /// Look up a room by id.
    async fn get(&self, room_id: &RoomId) -> Result<RoomHandle, RepositoryError>;

    /// All registered rooms, oldest first.
    async fn list(&self) -> Vec<RoomHandle>;

    /// Record that a session is about to join the room.
    ///
    /// Shares the lock with `evict_idle`, so a room is either still present
    /// (and now protected from eviction) or already gone.
    async fn attach(&self, room_id: &RoomId) -> Result<RoomHandle, RepositoryError>;

    /// Record that a session of the room has terminated at `at`.
    async fn detach(&self, room_id: &RoomId, at: Timestamp);

    /// Remove every room with no live session whose idle period started at
    /// least `grace` before `now`, returning the removed handles.
    async fn evict_idle(&self, now: Timestamp, grace: Duration) -> Vec<RoomHandle>;

    /// Number of registered rooms.
    async fn count(&self) -> usize;
}
