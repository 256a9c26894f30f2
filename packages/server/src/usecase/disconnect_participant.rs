//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - Hub への Leave 送信とレジストリからの detach
//!
//! ### なぜこのテストが必要か
//! - セッション終了ごとに Leave がちょうど 1 回送られ、残りのメンバーに userList が届く
//! - 最後の参加者が抜けた時刻から削除の猶予期間が数えられる
//!
//! ### どのような状況を想定しているか
//! - 正常系：2 人のうち 1 人が切断
//! - エッジケース：Hub が既に停止している

use std::sync::Arc;

use watchparty_shared::time::Clock;

use crate::{
    domain::{ParticipantId, RoomRepository, Timestamp},
    hub::RoomHandle,
};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(repository: Arc<dyn RoomRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// 参加者切断を実行
    ///
    /// Hub が停止していても detach は必ず行う。
    pub async fn execute(&self, handle: &RoomHandle, participant_id: ParticipantId) {
        // 1. Hub に Leave を送る（既に外されていれば Hub 側で無視される）
        if let Err(e) = handle.leave(participant_id.clone()).await {
            tracing::debug!("Leave for {} not delivered: {}", participant_id, e);
        }

        // 2. レジストリから detach
        self.repository
            .detach(handle.id(), Timestamp::new(self.clock.now_millis()))
            .await;

        tracing::info!("Room {}: session {} detached", handle.id(), participant_id);
    }
}
