//! UseCase: 空室ルームの掃除
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - CleanupRoomsUseCase::execute() と RoomSweeper の定期実行
//!
//! ### なぜこのテストが必要か
//! - 猶予期間を過ぎた空室だけが削除され、Hub が停止すること
//! - 猶予期間内に再参加したルームが残ること
//!
//! ### どのような状況を想定しているか
//! - 正常系：猶予期間経過後の削除
//! - エッジケース：猶予期間のちょうど手前、再参加、キャンセルによる停止

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use watchparty_shared::time::Clock;

use crate::domain::{RoomId, RoomRepository, Timestamp};

/// 空室ルーム掃除のユースケース
pub struct CleanupRoomsUseCase {
    repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
    /// 空室になってから削除するまでの猶予期間
    grace: Duration,
}

impl CleanupRoomsUseCase {
    /// 新しい CleanupRoomsUseCase を作成
    pub fn new(repository: Arc<dyn RoomRepository>, clock: Arc<dyn Clock>, grace: Duration) -> Self {
        Self {
            repository,
            clock,
            grace,
        }
    }

    /// 猶予期間を過ぎた空室を削除し、その Hub を停止する
    ///
    /// # Returns
    ///
    /// 削除したルームの ID
    pub async fn execute(&self) -> Vec<RoomId> {
        let now = Timestamp::new(self.clock.now_millis());
        let evicted = self.repository.evict_idle(now, self.grace).await;

        let evicted: Vec<RoomId> = evicted
            .into_iter()
            .map(|handle| {
                handle.shutdown();
                tracing::info!("Room {} evicted after staying empty", handle.id());
                handle.id().clone()
            })
            .collect();

        if !evicted.is_empty() {
            let remaining = self.repository.count().await;
            tracing::info!(
                "Sweep evicted {} room(s), {} remaining",
                evicted.len(),
                remaining
            );
        }
        evicted
    }
}

/// 一定間隔で [`CleanupRoomsUseCase`] を実行するバックグラウンドタスク
pub struct RoomSweeper {
    usecase: Arc<CleanupRoomsUseCase>,
    interval: Duration,
}

impl RoomSweeper {
    pub fn new(usecase: Arc<CleanupRoomsUseCase>, interval: Duration) -> Self {
        Self { usecase, interval }
    }

    /// `shutdown` がキャンセルされるまで掃除を続けるタスクを起動する
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 最初の tick は即座に完了するので読み捨てる
            ticker.tick().await;

            tracing::info!("Room sweeper started (interval {:?})", self.interval);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.usecase.execute().await;
                    }
                }
            }
            tracing::info!("Room sweeper stopped");
        })
    }
}
