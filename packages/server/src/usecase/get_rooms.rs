//! UseCase: ルーム参照処理（一覧・詳細）

use std::sync::Arc;

use crate::domain::{RoomId, RoomRepository, RoomSummary};

use super::error::GetRoomError;

/// ルーム参照のユースケース
pub struct GetRoomsUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    /// 全ルームのスナップショットを作成時刻順で返す
    pub async fn list(&self) -> Vec<RoomSummary> {
        self.repository
            .list()
            .await
            .iter()
            .map(|handle| handle.summary())
            .collect()
    }

    /// 1 ルームのスナップショットを返す
    pub async fn get(&self, room_id: String) -> Result<RoomSummary, GetRoomError> {
        let id = RoomId::new(room_id.clone()).map_err(|_| GetRoomError::NotFound(room_id))?;
        self.repository
            .get(&id)
            .await
            .map(|handle| handle.summary())
            .map_err(|_| GetRoomError::NotFound(id.into_string()))
    }
}

#[cfg(test)]
mod tests {
    use watchparty_shared::time::ManualClock;

    use super::*;
    use crate::{
        infrastructure::repository::InMemoryRoomRepository, usecase::CreateRoomUseCase,
    };

    fn setup() -> (GetRoomsUseCase, CreateRoomUseCase) {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let clock = Arc::new(ManualClock::new(0));
        let create = CreateRoomUseCase::new(repository.clone(), clock, 16);
        (GetRoomsUseCase::new(repository), create)
    }

    #[tokio::test]
    async fn test_list_returns_rooms_in_creation_order() {
        // テスト項目: 一覧は作成された順に並ぶ
        // given (前提条件):
        let (usecase, create) = setup();
        let first = create
            .execute("1".to_string(), "first".to_string(), None)
            .await
            .unwrap();
        let second = create
            .execute("2".to_string(), "second".to_string(), None)
            .await
            .unwrap();

        // when (操作):
        let rooms = usecase.list().await;

        // then (期待する結果):
        assert_eq!(rooms.len(), 2);
        let names: Vec<&str> = rooms.iter().map(|r| r.profile.name.as_str()).collect();
        assert!(names.contains(&"first") && names.contains(&"second"));
        assert!(rooms.iter().any(|r| r.profile.id == first.summary.profile.id));
        assert!(rooms.iter().any(|r| r.profile.id == second.summary.profile.id));
    }

    #[tokio::test]
    async fn test_get_existing_room() {
        // テスト項目: 作成したルームの詳細を取得できる
        // given (前提条件):
        let (usecase, create) = setup();
        let created = create
            .execute("1".to_string(), "movie".to_string(), None)
            .await
            .unwrap();

        // when (操作):
        let summary = usecase
            .get(created.summary.profile.id.as_str().to_string())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(summary.profile.name, "movie");
        assert_eq!(summary.member_count, 0);
    }

    #[tokio::test]
    async fn test_get_unknown_room() {
        // テスト項目: 存在しない・空の ID は NotFound になる
        // given (前提条件):
        let (usecase, _create) = setup();

        // when (操作):
        let unknown = usecase.get("zzzzzzzz".to_string()).await;
        let blank = usecase.get(String::new()).await;

        // then (期待する結果):
        assert_eq!(unknown, Err(GetRoomError::NotFound("zzzzzzzz".to_string())));
        assert_eq!(blank, Err(GetRoomError::NotFound(String::new())));
    }
}
