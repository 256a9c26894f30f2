//! Shared application state.

use std::{sync::Arc, time::Duration};

use watchparty_shared::time::Clock;

use crate::{
    domain::MovieCatalog,
    infrastructure::media::LocalVideoStore,
    usecase::{
        ConnectParticipantUseCase, CreateRoomUseCase, DisconnectParticipantUseCase,
        GetRoomsUseCase, ProcessUploadUseCase, SendMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// CreateRoomUseCase（ルーム作成のユースケース）
    pub create_room_usecase: Arc<CreateRoomUseCase>,
    /// GetRoomsUseCase（ルーム参照のユースケース）
    pub get_rooms_usecase: Arc<GetRoomsUseCase>,
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// SendMessageUseCase（受信メッセージ振り分けのユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// ProcessUploadUseCase（動画アップロードのユースケース）
    pub process_upload_usecase: Arc<ProcessUploadUseCase>,
    /// 動画カタログ
    pub catalog: Arc<dyn MovieCatalog>,
    /// 動画・サムネイルの保存先
    pub video_store: LocalVideoStore,
    pub clock: Arc<dyn Clock>,
    /// WebSocket 1 回の書き込みの期限
    pub write_deadline: Duration,
}
