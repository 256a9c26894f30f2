//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - レジストリへの attach、参加者 ID の払い出し、Hub への Join
//!
//! ### なぜこのテストが必要か
//! - 参加者は必ず sync を最初に受け取る
//! - 削除済みのルームへの参加は拒否され、レジストリのセッション数が狂わない
//!
//! ### どのような状況を想定しているか
//! - 正常系：既存ルームへの参加
//! - 異常系：存在しないルーム、停止した Hub
//! - エッジケース：ユーザー名の省略

use std::sync::Arc;

use tokio::sync::mpsc;
use watchparty_shared::time::Clock;

use crate::{
    domain::{Participant, ParticipantIdFactory, RoomId, RoomRepository, Timestamp, Username},
    hub::{Member, OutboundFrame, RoomHandle},
};

use super::error::JoinRoomError;

/// Hub に登録されたセッション
///
/// `outbox` は Hub が持つ送信側と対になる受信側。Hub がメンバーを外すと閉じる。
#[derive(Debug)]
pub struct SessionRegistration {
    pub handle: RoomHandle,
    pub participant: Participant,
    pub outbox: mpsc::Receiver<OutboundFrame>,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
    /// セッションごとの送信キュー容量
    queue_capacity: usize,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        clock: Arc<dyn Clock>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            repository,
            clock,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// WebSocket のアップグレード前にルームの存在を確認する
    pub async fn ensure_room(&self, room_id: String) -> Result<RoomId, JoinRoomError> {
        let id = RoomId::new(room_id.clone()).map_err(|_| JoinRoomError::RoomNotFound(room_id))?;
        self.repository.get(&id).await?;
        Ok(id)
    }

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `room_id` - 参加するルーム
    /// * `username` - 表示名（省略時は Anonymous）
    ///
    /// # Returns
    ///
    /// * `Ok(SessionRegistration)` - Hub に Join 済みのセッション
    /// * `Err(JoinRoomError)` - ルームが存在しない、または停止している
    pub async fn execute(
        &self,
        room_id: &RoomId,
        username: Option<String>,
    ) -> Result<SessionRegistration, JoinRoomError> {
        // 1. 入力の検証（attach 前に行い、失敗時に detach 不要にする）
        let username = Username::or_default(username)?;

        // 2. レジストリに attach（削除済みならここで失敗する）
        let handle = self.repository.attach(room_id).await?;

        // 3. 参加者 ID と送信キューを用意して Join
        let participant = Participant::new(ParticipantIdFactory::generate(), username);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        if let Err(e) = handle.join(Member::new(participant.clone(), tx)).await {
            tracing::warn!("Room {}: join failed: {}", room_id, e);
            self.repository
                .detach(room_id, Timestamp::new(self.clock.now_millis()))
                .await;
            return Err(JoinRoomError::HubClosed(room_id.as_str().to_string()));
        }

        tracing::info!(
            "Room {}: session {} ({}) attached",
            room_id,
            participant.id,
            participant.username
        );
        Ok(SessionRegistration {
            handle,
            participant,
            outbox: rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;
    use watchparty_shared::time::ManualClock;

    use super::*;
    use crate::{
        domain::{ContentId, ParticipantId, RoomProfile},
        hub::RoomHub,
        infrastructure::repository::InMemoryRoomRepository,
    };

    const GRACE: Duration = Duration::from_secs(300);

    async fn setup(spawn_hub: bool) -> (ConnectParticipantUseCase, Arc<InMemoryRoomRepository>, RoomId) {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let room_id = RoomId::new("room0001".to_string()).unwrap();
        let profile = RoomProfile {
            id: room_id.clone(),
            content_id: ContentId::new("1".to_string()).unwrap(),
            name: "test".to_string(),
            host_id: ParticipantId::new("host0001".to_string()).unwrap(),
            created_at: Timestamp::new(1_000),
        };
        let (hub, handle) = RoomHub::new(profile, clock.clone(), 16);
        repository.insert(handle).await.unwrap();
        if spawn_hub {
            hub.spawn();
        }
        let usecase = ConnectParticipantUseCase::new(repository.clone(), clock, 8);
        (usecase, repository, room_id)
    }

    #[tokio::test]
    async fn test_connect_participant_success() {
        // テスト項目: 参加者は Join され、最初のフレームとして sync を受け取る
        // given (前提条件):
        let (usecase, repository, room_id) = setup(true).await;

        // when (操作):
        let mut session = usecase
            .execute(&room_id, Some("alice".to_string()))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(session.participant.username.as_str(), "alice");
        assert_eq!(session.participant.id.as_str().len(), 8);
        let first = timeout(Duration::from_secs(1), session.outbox.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(first.contains(r#""type":"sync""#));

        // attach 済みのルームは猶予期間を過ぎても削除されない
        let evicted = repository.evict_idle(Timestamp::new(10_000_000), GRACE).await;
        assert!(evicted.is_empty());
    }

    #[tokio::test]
    async fn test_connect_participant_defaults_username() {
        // テスト項目: ユーザー名を省略すると Anonymous になる
        // given (前提条件):
        let (usecase, _repository, room_id) = setup(true).await;

        // when (操作):
        let session = usecase.execute(&room_id, None).await.unwrap();

        // then (期待する結果):
        assert_eq!(session.participant.username.as_str(), "Anonymous");
    }

    #[tokio::test]
    async fn test_connect_participant_unknown_room() {
        // テスト項目: 存在しないルームへの参加は RoomNotFound
        // given (前提条件):
        let (usecase, _repository, _room_id) = setup(true).await;
        let unknown = RoomId::new("missing0".to_string()).unwrap();

        // when (操作):
        let result = usecase.execute(&unknown, None).await;

        // then (期待する結果):
        assert!(matches!(result, Err(JoinRoomError::RoomNotFound(id)) if id == "missing0"));
    }

    #[tokio::test]
    async fn test_connect_participant_closed_hub_detaches_again() {
        // テスト項目: Hub が停止していれば参加は失敗し、attach が取り消される
        // given (前提条件): Hub を起動せずに破棄する
        let (usecase, repository, room_id) = setup(false).await;

        // when (操作):
        let result = usecase.execute(&room_id, None).await;

        // then (期待する結果): セッション数が 0 に戻り、空室として削除対象になる
        assert_eq!(
            result.map(|_| ()),
            Err(JoinRoomError::HubClosed("room0001".to_string()))
        );
        let evicted = repository.evict_idle(Timestamp::new(1_000 + 300_000), GRACE).await;
        assert_eq!(evicted.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_room() {
        // テスト項目: アップグレード前の存在確認
        // given (前提条件):
        let (usecase, _repository, _room_id) = setup(true).await;

        // when (操作):
        let found = usecase.ensure_room("room0001".to_string()).await;
        let missing = usecase.ensure_room("nothere0".to_string()).await;

        // then (期待する結果):
        assert_eq!(found.unwrap().as_str(), "room0001");
        assert_eq!(missing, Err(JoinRoomError::RoomNotFound("nothere0".to_string())));
    }
}
