//! UseCase: 受信メッセージの振り分け処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::classify() / execute() メソッド
//! - 受信フレームのデコード、送信者情報の上書き、タイプごとの振り分け
//!
//! ### なぜこのテストが必要か
//! - クライアントが送った userId / username がそのまま他人に届くとなりすましになる
//! - シグナリングは宛先以外に漏れてはならない
//! - プロトコル違反のフレームでセッションが落ちてはならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：play / pause / seek / chat / offer
//! - 異常系：不正な JSON、未知のタイプ、サーバー専用タイプ、ペイロード不正
//! - エッジケース：宛先が空・自分自身のシグナリング

use std::sync::Arc;

use thiserror::Error;
use watchparty_shared::time::{Clock, timestamp_to_rfc3339};

use crate::{
    domain::{Participant, ParticipantId, PlaybackChange, RoomId, Timestamp},
    hub::{Broadcast, HubError, OutboundFrame, PlaybackUpdate, RoomHandle},
    infrastructure::dto::websocket::{
        ChatPayload, CodecError, Envelope, MessageType, PlayPausePayload, SeekPayload,
    },
};

/// Hub に渡す処理内容
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// ルーム全員への配信（再生状態の変更を伴うことがある）
    Broadcast(Broadcast),
    /// 1 人だけへの転送
    Relay { to: ParticipantId, frame: OutboundFrame },
}

/// 破棄されるフレームの理由。どれもセッションは継続する。
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("'{0}' may not be sent by a client")]
    NotClientMessage(MessageType),

    #[error("'{0}' without a target participant")]
    MissingTarget(MessageType),

    #[error("'{0}' addressed to the sender itself")]
    SelfTarget(MessageType),
}

/// 受信メッセージ振り分けのユースケース
pub struct SendMessageUseCase {
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// 受信した 1 フレームを Hub に渡す
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Hub に渡した、またはプロトコル違反として破棄した
    /// * `Err(HubError)` - Hub が停止している（セッションを終了すべき）
    pub async fn execute(
        &self,
        handle: &RoomHandle,
        sender: &Participant,
        text: &str,
    ) -> Result<(), HubError> {
        match self.classify(handle.id(), sender, text) {
            Ok(Dispatch::Broadcast(broadcast)) => handle.broadcast(broadcast).await,
            Ok(Dispatch::Relay { to, frame }) => handle.relay(sender.id.clone(), to, frame).await,
            Err(e) => {
                tracing::warn!(
                    "Room {}: dropping message from {}: {}",
                    handle.id(),
                    sender.id,
                    e
                );
                Ok(())
            }
        }
    }

    /// フレームをデコードし、送信者情報を上書きして振り分け先を決める
    pub fn classify(
        &self,
        room_id: &RoomId,
        sender: &Participant,
        text: &str,
    ) -> Result<Dispatch, DispatchError> {
        // 1. デコードとタイプの判定
        let mut envelope = Envelope::decode(text)?;
        let kind = envelope.message_type()?;
        if kind.is_server_only() || matches!(kind, MessageType::Join | MessageType::Leave) {
            return Err(DispatchError::NotClientMessage(kind));
        }

        // 2. サーバーが管理するフィールドを上書き
        let now = self.clock.now_millis();
        envelope.stamp(
            room_id.as_str(),
            sender.id.as_str(),
            sender.username.as_str(),
            timestamp_to_rfc3339(now),
        );

        // 3. シグナリングは宛先 1 人への Relay（to は送られた文字列のまま照合する）
        if kind.is_signaling() {
            let to = envelope
                .to
                .clone()
                .filter(|to| !to.trim().is_empty())
                .and_then(|to| ParticipantId::new(to).ok())
                .ok_or(DispatchError::MissingTarget(kind))?;
            if to == sender.id {
                return Err(DispatchError::SelfTarget(kind));
            }
            return Ok(Dispatch::Relay {
                to,
                frame: envelope.encode()?,
            });
        }

        // 4. それ以外はブロードキャスト（再生操作は状態の変更を伴う）
        let change = match kind {
            MessageType::Play => {
                let payload: PlayPausePayload = envelope.payload(kind)?;
                Some(PlaybackChange::Play {
                    position: payload.current_time,
                })
            }
            MessageType::Pause => {
                let payload: PlayPausePayload = envelope.payload(kind)?;
                Some(PlaybackChange::Pause {
                    position: payload.current_time,
                })
            }
            MessageType::Seek => {
                let payload: SeekPayload = envelope.payload(kind)?;
                Some(PlaybackChange::Seek {
                    position: payload.time,
                })
            }
            MessageType::Chat => {
                let _: ChatPayload = envelope.payload(kind)?;
                None
            }
            _ => None,
        };

        let frame = envelope.encode()?;
        let broadcast = match change {
            Some(change) => Broadcast::with_playback(
                sender.id.clone(),
                frame,
                PlaybackUpdate {
                    change,
                    at: Timestamp::new(now),
                },
            ),
            None => Broadcast::frame(sender.id.clone(), frame),
        };
        Ok(Dispatch::Broadcast(broadcast))
    }
}
