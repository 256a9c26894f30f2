//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリのルームレジストリとして使用します。
//!
//! ロックは map の更新の間だけ保持し、Hub への送信やネットワーク I/O を
//! ロック中に行うことはありません。

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{RepositoryError, RoomId, RoomRepository, Timestamp},
    hub::RoomHandle,
};

/// Registry entry: the hub handle plus live-session bookkeeping.
struct RoomEntry {
    handle: RoomHandle,
    /// Sessions attached and not yet detached
    sessions: usize,
    /// When `sessions` last dropped to zero; `None` while occupied
    idle_since: Option<Timestamp>,
}

/// インメモリ Room Repository 実装
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<RoomId, RoomEntry>>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn insert(&self, handle: RoomHandle) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        if rooms.contains_key(handle.id()) {
            return Err(RepositoryError::DuplicateRoomId(
                handle.id().as_str().to_string(),
            ));
        }
        let idle_since = Some(handle.profile().created_at);
        rooms.insert(
            handle.id().clone(),
            RoomEntry {
                handle,
                sessions: 0,
                idle_since,
            },
        );
        Ok(())
    }

    async fn get(&self, room_id: &RoomId) -> Result<RoomHandle, RepositoryError> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)
            .map(|entry| entry.handle.clone())
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))
    }

    async fn list(&self) -> Vec<RoomHandle> {
        let mut handles: Vec<RoomHandle> = {
            let rooms = self.rooms.lock().await;
            rooms.values().map(|entry| entry.handle.clone()).collect()
        };
        handles.sort_by(|a, b| {
            a.profile()
                .created_at
                .cmp(&b.profile().created_at)
                .then_with(|| a.id().cmp(b.id()))
        });
        handles
    }

    async fn attach(&self, room_id: &RoomId) -> Result<RoomHandle, RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let entry = rooms
            .get_mut(room_id)
            .ok_or_else(|| RepositoryError::RoomNotFound(room_id.as_str().to_string()))?;
        entry.sessions += 1;
        entry.idle_since = None;
        Ok(entry.handle.clone())
    }

    async fn detach(&self, room_id: &RoomId, at: Timestamp) {
        let mut rooms = self.rooms.lock().await;
        let Some(entry) = rooms.get_mut(room_id) else {
            tracing::debug!("Room {} already evicted, nothing to detach", room_id);
            return;
        };
        entry.sessions = entry.sessions.saturating_sub(1);
        if entry.sessions == 0 {
            entry.idle_since = Some(at);
        }
    }

    async fn evict_idle(&self, now: Timestamp, grace: Duration) -> Vec<RoomHandle> {
        let grace_millis = i64::try_from(grace.as_millis()).unwrap_or(i64::MAX);
        let mut rooms = self.rooms.lock().await;

        let expired: Vec<RoomId> = rooms
            .iter()
            .filter(|(_, entry)| {
                entry.sessions == 0
                    && entry
                        .idle_since
                        .is_some_and(|since| now.millis_since(since) >= grace_millis)
            })
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|id| rooms.remove(id))
            .map(|entry| entry.handle)
            .collect()
    }

    async fn count(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.len()
    }
}
