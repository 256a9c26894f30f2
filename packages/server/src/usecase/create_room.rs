//! UseCase: ルーム作成処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CreateRoomUseCase::execute() メソッド
//! - ルーム ID / ホスト ID の払い出し、Hub の起動、レジストリへの登録
//!
//! ### なぜこのテストが必要か
//! - 作成直後のルームが空・一時停止・位置 0 であることを保証する
//! - ID の衝突が呼び出し側に見えないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム作成と一覧への反映
//! - 異常系：空のコンテンツ ID
//! - エッジケース：生成した ID が既存のルームと衝突する

use std::sync::Arc;

use watchparty_shared::time::Clock;

use crate::{
    domain::{
        ContentId, ParticipantId, ParticipantIdFactory, RepositoryError, RoomId, RoomIdFactory,
        RoomProfile, RoomRepository, RoomSummary, Timestamp, Username,
    },
    hub::RoomHub,
};

use super::error::CreateRoomError;

/// 衝突時に ID を引き直す上限回数
const MAX_ID_ATTEMPTS: usize = 16;

/// 作成されたルームと、作成者に割り当てたホスト ID
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedRoom {
    pub summary: RoomSummary,
    pub host_id: ParticipantId,
}

/// ルーム作成のユースケース
pub struct CreateRoomUseCase {
    repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
    mailbox_capacity: usize,
    id_source: Box<dyn Fn() -> RoomId + Send + Sync>,
}

impl CreateRoomUseCase {
    /// 新しい CreateRoomUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        clock: Arc<dyn Clock>,
        mailbox_capacity: usize,
    ) -> Self {
        Self {
            repository,
            clock,
            mailbox_capacity,
            id_source: Box::new(RoomIdFactory::generate),
        }
    }

    /// ルーム ID の生成元を差し替える
    pub fn with_id_source(mut self, id_source: impl Fn() -> RoomId + Send + Sync + 'static) -> Self {
        self.id_source = Box::new(id_source);
        self
    }

    /// ルーム作成を実行
    ///
    /// # Arguments
    ///
    /// * `content_id` - 視聴するコンテンツの ID
    /// * `room_name` - 表示名（空でもよい）
    /// * `creator_name` - 作成者の表示名（ログ用）
    ///
    /// # Returns
    ///
    /// * `Ok(CreatedRoom)` - 作成されたルームのスナップショットとホスト ID
    /// * `Err(CreateRoomError)` - 入力不正
    pub async fn execute(
        &self,
        content_id: String,
        room_name: String,
        creator_name: Option<String>,
    ) -> Result<CreatedRoom, CreateRoomError> {
        // 1. 入力の検証
        let content_id = ContentId::new(content_id)?;
        let creator = Username::or_default(creator_name)?;
        let host_id = ParticipantIdFactory::generate();
        let created_at = Timestamp::new(self.clock.now_millis());

        // 2. ID が衝突しなくなるまで Hub を作って登録する
        for _ in 0..MAX_ID_ATTEMPTS {
            let profile = RoomProfile {
                id: (self.id_source)(),
                content_id: content_id.clone(),
                name: room_name.clone(),
                host_id: host_id.clone(),
                created_at,
            };
            let (hub, handle) = RoomHub::new(profile, self.clock.clone(), self.mailbox_capacity);

            match self.repository.insert(handle.clone()).await {
                Ok(()) => {
                    // 3. 登録できた Hub だけを起動する
                    hub.spawn();
                    tracing::info!(
                        "Room created: {} for content {} by {}",
                        handle.id(),
                        handle.profile().content_id,
                        creator
                    );
                    return Ok(CreatedRoom {
                        summary: handle.summary(),
                        host_id,
                    });
                }
                Err(RepositoryError::DuplicateRoomId(id)) => {
                    tracing::warn!("Room id {} collided, generating a new one", id);
                }
                Err(RepositoryError::RoomNotFound(id)) => {
                    tracing::error!("Unexpected lookup failure while registering room {}", id);
                }
            }
        }

        Err(CreateRoomError::IdSpaceExhausted(MAX_ID_ATTEMPTS))
    }
}
