//! The room hub event loop.

use std::{ops::ControlFlow, sync::Arc};

use serde::Serialize;
use tokio::{
    sync::{mpsc, mpsc::error::TrySendError, watch},
    task::JoinHandle,
};
use watchparty_shared::time::{Clock, timestamp_to_rfc3339};

use crate::{
    domain::{ParticipantId, PlaybackState, RoomProfile},
    infrastructure::dto::websocket::{Envelope, MessageType, PlaybackStateDto, UserInfo},
};

use super::{
    event::{Broadcast, Member, OutboundFrame, RoomEvent},
    handle::{RoomHandle, RoomSnapshot},
};

/// Single-writer owner of one room's membership and Playback State.
pub struct RoomHub {
    profile: Arc<RoomProfile>,
    members: Vec<Member>,
    playback: PlaybackState,
    mailbox: mpsc::Receiver<RoomEvent>,
    snapshot: watch::Sender<RoomSnapshot>,
    clock: Arc<dyn Clock>,
}

impl RoomHub {
    /// Create a hub with empty membership and a paused Playback State, plus
    /// the handle used to reach it. The loop does not run until [`spawn`].
    ///
    /// [`spawn`]: RoomHub::spawn
    pub fn new(
        profile: RoomProfile,
        clock: Arc<dyn Clock>,
        mailbox_capacity: usize,
    ) -> (Self, RoomHandle) {
        let profile = Arc::new(profile);
        let playback = PlaybackState::new(profile.created_at);
        let (mailbox_tx, mailbox_rx) = mpsc::channel(mailbox_capacity.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(RoomSnapshot {
            members: Vec::new(),
            playback: playback.clone(),
        });

        let hub = Self {
            profile: profile.clone(),
            members: Vec::new(),
            playback,
            mailbox: mailbox_rx,
            snapshot: snapshot_tx,
            clock,
        };
        let handle = RoomHandle::new(profile, mailbox_tx, snapshot_rx);
        (hub, handle)
    }

    /// Run the event loop on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process events until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::debug!("Room {}: hub started", self.profile.id);
        while let Some(event) = self.mailbox.recv().await {
            let flow = self.handle_event(event);
            self.publish();
            if flow.is_break() {
                break;
            }
        }
        tracing::info!(
            "Room {}: hub stopped with {} member(s)",
            self.profile.id,
            self.members.len()
        );
    }

    fn handle_event(&mut self, event: RoomEvent) -> ControlFlow<()> {
        match event {
            RoomEvent::Join(member) => self.on_join(member),
            RoomEvent::Leave(participant_id) => self.on_leave(&participant_id),
            RoomEvent::Broadcast(broadcast) => self.on_broadcast(broadcast),
            RoomEvent::Relay { from, to, frame } => self.on_relay(&from, &to, frame),
            RoomEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn on_join(&mut self, member: Member) {
        let participant = member.participant.clone();
        if self.position_of(&participant.id).is_some() {
            tracing::warn!(
                "Room {}: participant {} is already a member, ignoring join",
                self.profile.id,
                participant.id
            );
            return;
        }

        // The snapshot goes out before the member can see any broadcast.
        let sync = self.server_frame(MessageType::Sync, PlaybackStateDto::from(&self.playback));
        let accepted = match sync {
            Some(frame) => member.outbox.try_send(frame).is_ok(),
            None => true,
        };
        if !accepted {
            tracing::warn!(
                "Room {}: could not deliver sync to {}, dropping the member",
                self.profile.id,
                participant.id
            );
            return;
        }

        self.members.push(member);
        tracing::info!(
            "Room {}: {} ({}) joined, {} member(s)",
            self.profile.id,
            participant.username,
            participant.id,
            self.members.len()
        );
        self.broadcast_roster();
    }

    fn on_leave(&mut self, participant_id: &ParticipantId) {
        let Some(index) = self.position_of(participant_id) else {
            tracing::debug!(
                "Room {}: leave for non-member {}, ignoring",
                self.profile.id,
                participant_id
            );
            return;
        };

        // Dropping the member closes its outbound queue.
        let member = self.members.remove(index);
        tracing::info!(
            "Room {}: {} ({}) left, {} member(s)",
            self.profile.id,
            member.participant.username,
            member.participant.id,
            self.members.len()
        );
        drop(member);
        self.broadcast_roster();
    }

    fn on_broadcast(&mut self, broadcast: Broadcast) {
        let Broadcast {
            sender,
            frame,
            playback,
        } = broadcast;
        if self.position_of(&sender).is_none() {
            tracing::warn!(
                "Room {}: broadcast from non-member {}, dropping message",
                self.profile.id,
                sender
            );
            return;
        }

        if let Some(update) = playback {
            self.playback.apply(update.change, sender, update.at);
        }
        if self.deliver_to_all(&frame) > 0 {
            self.broadcast_roster();
        }
    }

    fn on_relay(&mut self, from: &ParticipantId, to: &ParticipantId, frame: OutboundFrame) {
        if self.position_of(from).is_none() {
            tracing::warn!(
                "Room {}: relay from non-member {}, dropping message",
                self.profile.id,
                from
            );
            return;
        }
        let Some(index) = self.position_of(to) else {
            tracing::warn!(
                "Room {}: relay target {} not found, dropping message",
                self.profile.id,
                to
            );
            return;
        };

        match self.members[index].outbox.try_send(frame) {
            Ok(()) => {
                tracing::debug!("Room {}: relayed message to {}", self.profile.id, to);
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    "Room {}: outbound queue of {} is full, disconnecting it",
                    self.profile.id,
                    to
                );
                self.members.remove(index);
                self.broadcast_roster();
            }
            Err(TrySendError::Closed(_)) => {
                self.members.remove(index);
                self.broadcast_roster();
            }
        }
    }

    /// Send the current roster to every member until a pass evicts nobody.
    fn broadcast_roster(&mut self) {
        loop {
            let roster: Vec<UserInfo> = self
                .members
                .iter()
                .map(|member| UserInfo::from(&member.participant))
                .collect();
            let Some(frame) = self.server_frame(MessageType::UserList, roster) else {
                return;
            };
            if self.deliver_to_all(&frame) == 0 {
                return;
            }
        }
    }

    /// Best-effort, non-blocking fan-out. Members whose queue is full or
    /// closed are removed; returns how many were removed.
    fn deliver_to_all(&mut self, frame: &str) -> usize {
        let room_id = &self.profile.id;
        let before = self.members.len();
        self.members
            .retain(|member| match member.outbox.try_send(frame.to_string()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "Room {}: outbound queue of {} is full, disconnecting it",
                        room_id,
                        member.participant.id
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        "Room {}: outbound queue of {} is closed, removing it",
                        room_id,
                        member.participant.id
                    );
                    false
                }
            });
        before - self.members.len()
    }

    fn position_of(&self, participant_id: &ParticipantId) -> Option<usize> {
        self.members
            .iter()
            .position(|member| &member.participant.id == participant_id)
    }

    fn server_frame<T: Serialize>(&self, kind: MessageType, data: T) -> Option<OutboundFrame> {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Room {}: failed to encode {} payload: {}", self.profile.id, kind, e);
                return None;
            }
        };
        let timestamp = timestamp_to_rfc3339(self.clock.now_millis());
        match Envelope::server(kind, self.profile.id.as_str(), data, timestamp).encode() {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::error!("Room {}: {}", self.profile.id, e);
                None
            }
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(RoomSnapshot {
            members: self
                .members
                .iter()
                .map(|member| member.participant.clone())
                .collect(),
            playback: self.playback.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;
    use tokio::time::timeout;
    use watchparty_shared::time::ManualClock;

    use super::*;
    use crate::{
        domain::{
            ContentId, Participant, PlaybackChange, RoomId, Timestamp, Username,
        },
        hub::PlaybackUpdate,
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - RoomHub の Join / Leave / Broadcast / Relay の処理
    // - 参加直後の sync スナップショット、参加者リストの配信
    // - 送信キューが詰まったメンバーの切り離し
    //
    // 【なぜこのテストが必要か】
    // - Hub は再生状態とメンバーシップの唯一の書き手であり、
    //   全メンバーが同じ順序で状態遷移を観測することを保証する必要がある
    // ========================================

    fn test_hub() -> (RoomHandle, JoinHandle<()>) {
        let profile = RoomProfile {
            id: RoomId::new("room0001".to_string()).unwrap(),
            content_id: ContentId::new("1".to_string()).unwrap(),
            name: "Movie night".to_string(),
            host_id: ParticipantId::new("host0001".to_string()).unwrap(),
            created_at: Timestamp::new(1_000),
        };
        let (hub, handle) = RoomHub::new(profile, Arc::new(ManualClock::new(1_000)), 16);
        (handle, hub.spawn())
    }

    fn member(id: &str, capacity: usize) -> (Member, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        let participant = Participant::new(
            ParticipantId::new(id.to_string()).unwrap(),
            Username::new(format!("user-{id}")).unwrap(),
        );
        (Member::new(participant, tx), rx)
    }

    async fn next_frame(rx: &mut mpsc::Receiver<OutboundFrame>) -> Value {
        let frame = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("queue closed");
        serde_json::from_str(&frame).unwrap()
    }

    async fn wait_for_member_count(handle: &RoomHandle, expected: usize) {
        let mut handle = handle.clone();
        timeout(Duration::from_secs(1), async {
            while handle.snapshot().members.len() != expected {
                handle.changed().await.unwrap();
            }
        })
        .await
        .expect("member count never reached");
    }

    fn roster_ids(frame: &Value) -> Vec<String> {
        assert_eq!(frame["type"], "userList");
        frame["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|user| user["id"].as_str().unwrap().to_string())
            .collect()
    }

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id.to_string()).unwrap()
    }

    fn chat_frame(text: &str) -> OutboundFrame {
        format!(r#"{{"type":"chat","data":{{"message":"{text}"}}}}"#)
    }

    #[tokio::test]
    async fn test_join_sends_sync_before_roster() {
        // テスト項目: 参加者が最初に受け取るのは sync、その次に自分を含む userList
        // given (前提条件):
        let (handle, _task) = test_hub();
        let (alice, mut alice_rx) = member("alice", 8);

        // when (操作):
        handle.join(alice).await.unwrap();

        // then (期待する結果):
        let first = next_frame(&mut alice_rx).await;
        assert_eq!(first["type"], "sync");
        assert_eq!(first["roomId"], "room0001");
        assert_eq!(first["data"]["isPlaying"], false);
        assert_eq!(first["data"]["currentTime"], 0.0);

        let second = next_frame(&mut alice_rx).await;
        assert_eq!(roster_ids(&second), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_roster_tracks_membership_through_joins_and_leaves() {
        // テスト項目: Join / Leave の度に配信される userList が現在のメンバーと一致する
        // given (前提条件):
        let (handle, _task) = test_hub();
        let (alice, mut alice_rx) = member("alice", 16);
        let (bob, mut bob_rx) = member("bob", 16);
        let (carol, _carol_rx) = member("carol", 16);

        // when (操作):
        handle.join(alice).await.unwrap();
        handle.join(bob).await.unwrap();
        handle.join(carol).await.unwrap();
        handle
            .leave(ParticipantId::new("bob".to_string()).unwrap())
            .await
            .unwrap();

        // then (期待する結果):
        let _sync = next_frame(&mut alice_rx).await;
        assert_eq!(roster_ids(&next_frame(&mut alice_rx).await), vec!["alice"]);
        assert_eq!(
            roster_ids(&next_frame(&mut alice_rx).await),
            vec!["alice", "bob"]
        );
        assert_eq!(
            roster_ids(&next_frame(&mut alice_rx).await),
            vec!["alice", "bob", "carol"]
        );
        assert_eq!(
            roster_ids(&next_frame(&mut alice_rx).await),
            vec!["alice", "carol"]
        );

        // bob の送信キューは Leave で閉じられる
        let _sync = next_frame(&mut bob_rx).await;
        let _joined = next_frame(&mut bob_rx).await;
        let _carol_joined = next_frame(&mut bob_rx).await;
        assert!(bob_rx.recv().await.is_none());

        wait_for_member_count(&handle, 2).await;
        let snapshot = handle.snapshot();
        let ids: Vec<&str> = snapshot.members.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "carol"]);
    }

    #[tokio::test]
    async fn test_leave_for_non_member_is_noop() {
        // テスト項目: メンバーでない参加者の Leave は何も起こさない
        // given (前提条件):
        let (handle, _task) = test_hub();
        let (alice, mut alice_rx) = member("alice", 8);
        handle.join(alice).await.unwrap();
        let _sync = next_frame(&mut alice_rx).await;
        let _roster = next_frame(&mut alice_rx).await;

        // when (操作):
        handle
            .leave(ParticipantId::new("ghost".to_string()).unwrap())
            .await
            .unwrap();
        handle
            .broadcast(Broadcast::frame(pid("alice"), chat_frame("still here")))
            .await
            .unwrap();

        // then (期待する結果): 参加者リストは再送されず、次のフレームはチャット
        let next = next_frame(&mut alice_rx).await;
        assert_eq!(next["type"], "chat");
        assert_eq!(handle.snapshot().members.len(), 1);
    }

    #[tokio::test]
    async fn test_playback_update_is_applied_before_fan_out() {
        // テスト項目: play → chat → pause の後、状態は pause の位置で停止し pause した人が記録される
        // given (前提条件):
        let (handle, _task) = test_hub();
        let (alice, mut alice_rx) = member("alice", 16);
        handle.join(alice).await.unwrap();
        let alice_id = ParticipantId::new("alice".to_string()).unwrap();

        // when (操作):
        handle
            .broadcast(Broadcast::with_playback(
                alice_id.clone(),
                r#"{"type":"play"}"#.to_string(),
                PlaybackUpdate {
                    change: PlaybackChange::Play { position: 10.0 },
                    at: Timestamp::new(2_000),
                },
            ))
            .await
            .unwrap();
        handle
            .broadcast(Broadcast::frame(alice_id.clone(), chat_frame("popcorn")))
            .await
            .unwrap();
        handle
            .broadcast(Broadcast::with_playback(
                alice_id.clone(),
                r#"{"type":"pause"}"#.to_string(),
                PlaybackUpdate {
                    change: PlaybackChange::Pause { position: 25.0 },
                    at: Timestamp::new(3_000),
                },
            ))
            .await
            .unwrap();
        handle
            .broadcast(Broadcast::frame(pid("alice"), chat_frame("marker")))
            .await
            .unwrap();

        // then (期待する結果): マーカーが届いた時点で pause の状態は公開済み
        let kinds: Vec<String> = {
            let mut kinds = Vec::new();
            for _ in 0..6 {
                kinds.push(next_frame(&mut alice_rx).await["type"].as_str().unwrap().to_string());
            }
            kinds
        };
        assert_eq!(
            kinds,
            vec!["sync", "userList", "play", "chat", "pause", "chat"]
        );

        let playback = handle.snapshot().playback;
        assert!(!playback.is_playing);
        assert_eq!(playback.current_time, 25.0);
        assert_eq!(playback.last_update_by, Some(alice_id));
        assert_eq!(playback.updated_at, Timestamp::new(3_000));
    }

    #[tokio::test]
    async fn test_late_joiner_receives_current_state() {
        // テスト項目: 後から参加したメンバーには最新の再生状態が sync で届く
        // given (前提条件):
        let (handle, _task) = test_hub();
        let (alice, _alice_rx) = member("alice", 16);
        handle.join(alice).await.unwrap();
        handle
            .broadcast(Broadcast::with_playback(
                pid("alice"),
                r#"{"type":"seek"}"#.to_string(),
                PlaybackUpdate {
                    change: PlaybackChange::Seek { position: 77.0 },
                    at: Timestamp::new(5_000),
                },
            ))
            .await
            .unwrap();

        // when (操作):
        let (bob, mut bob_rx) = member("bob", 16);
        handle.join(bob).await.unwrap();

        // then (期待する結果):
        let sync = next_frame(&mut bob_rx).await;
        assert_eq!(sync["type"], "sync");
        assert_eq!(sync["data"]["currentTime"], 77.0);
        assert_eq!(sync["data"]["lastUpdateBy"], "alice");
    }

    #[tokio::test]
    async fn test_saturated_member_is_dropped_without_blocking_others() {
        // テスト項目: 送信キューが詰まったメンバーは切り離され、他のメンバーには同じブロードキャストが届く
        // given (前提条件): slow はキュー容量 3 で一切読み出さない
        let (handle, _task) = test_hub();
        let (slow, mut slow_rx) = member("slow", 3);
        let (fast, mut fast_rx) = member("fast", 16);
        handle.join(slow).await.unwrap();
        handle.join(fast).await.unwrap();

        // when (操作):
        handle
            .broadcast(Broadcast::frame(pid("fast"), chat_frame("hello")))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(next_frame(&mut fast_rx).await["type"], "sync");
        assert_eq!(
            roster_ids(&next_frame(&mut fast_rx).await),
            vec!["slow", "fast"]
        );
        assert_eq!(next_frame(&mut fast_rx).await["type"], "chat");
        assert_eq!(roster_ids(&next_frame(&mut fast_rx).await), vec!["fast"]);

        // slow のキューには詰まる前のフレームだけが残り、その後閉じられる
        assert_eq!(next_frame(&mut slow_rx).await["type"], "sync");
        assert_eq!(roster_ids(&next_frame(&mut slow_rx).await), vec!["slow"]);
        assert_eq!(
            roster_ids(&next_frame(&mut slow_rx).await),
            vec!["slow", "fast"]
        );
        assert!(slow_rx.recv().await.is_none());
        wait_for_member_count(&handle, 1).await;
    }

    #[tokio::test]
    async fn test_evicted_member_can_no_longer_change_playback() {
        // テスト項目: キュー詰まりで切り離されたメンバーの play / relay は破棄される
        // given (前提条件): slow はキュー容量 2 で読み出さず、チャットで切り離される
        let (handle, _task) = test_hub();
        let (slow, _slow_rx) = member("slow", 2);
        let (fast, mut fast_rx) = member("fast", 16);
        handle.join(slow).await.unwrap();
        handle.join(fast).await.unwrap();
        handle
            .broadcast(Broadcast::frame(pid("fast"), chat_frame("hello")))
            .await
            .unwrap();
        wait_for_member_count(&handle, 1).await;

        // when (操作):
        handle
            .broadcast(Broadcast::with_playback(
                pid("slow"),
                r#"{"type":"play"}"#.to_string(),
                PlaybackUpdate {
                    change: PlaybackChange::Play { position: 999.0 },
                    at: Timestamp::new(9_000),
                },
            ))
            .await
            .unwrap();
        handle
            .relay(pid("slow"), pid("fast"), r#"{"type":"offer"}"#.to_string())
            .await
            .unwrap();
        handle
            .broadcast(Broadcast::frame(pid("fast"), chat_frame("marker")))
            .await
            .unwrap();

        // then (期待する結果): fast にはマーカーまで play も offer も届かず、状態は変わらない
        loop {
            let frame = next_frame(&mut fast_rx).await;
            assert_ne!(frame["type"], "play");
            assert_ne!(frame["type"], "offer");
            if frame["data"]["message"] == "marker" {
                break;
            }
        }
        let playback = handle.snapshot().playback;
        assert!(!playback.is_playing);
        assert_eq!(playback.current_time, 0.0);
        assert_eq!(playback.last_update_by, None);
    }

    #[tokio::test]
    async fn test_relay_reaches_only_the_target() {
        // テスト項目: Relay は宛先のメンバーにだけ届く
        // given (前提条件):
        let (handle, _task) = test_hub();
        let (alice, mut alice_rx) = member("alice", 16);
        let (bob, mut bob_rx) = member("bob", 16);
        let (carol, mut carol_rx) = member("carol", 16);
        handle.join(alice).await.unwrap();
        handle.join(bob).await.unwrap();
        handle.join(carol).await.unwrap();

        // when (操作):
        handle
            .relay(
                pid("alice"),
                pid("bob"),
                r#"{"type":"offer","to":"bob"}"#.to_string(),
            )
            .await
            .unwrap();
        handle
            .broadcast(Broadcast::frame(pid("alice"), chat_frame("marker")))
            .await
            .unwrap();

        // then (期待する結果): bob だけが offer を受け取り、他はマーカーのチャットが先に届く
        let mut bob_kinds = Vec::new();
        for _ in 0..5 {
            bob_kinds.push(next_frame(&mut bob_rx).await["type"].as_str().unwrap().to_string());
        }
        assert_eq!(bob_kinds, vec!["sync", "userList", "userList", "offer", "chat"]);

        for rx in [&mut alice_rx, &mut carol_rx] {
            loop {
                let frame = next_frame(rx).await;
                assert_ne!(frame["type"], "offer");
                if frame["type"] == "chat" {
                    break;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_relay_to_unknown_member_is_dropped() {
        // テスト項目: 存在しない宛先への Relay は破棄され、Hub は動き続ける
        // given (前提条件):
        let (handle, _task) = test_hub();
        let (alice, mut alice_rx) = member("alice", 16);
        handle.join(alice).await.unwrap();

        // when (操作):
        handle
            .relay(
                pid("alice"),
                pid("nobody"),
                r#"{"type":"answer"}"#.to_string(),
            )
            .await
            .unwrap();
        handle
            .broadcast(Broadcast::frame(pid("alice"), chat_frame("after")))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(next_frame(&mut alice_rx).await["type"], "sync");
        assert_eq!(next_frame(&mut alice_rx).await["type"], "userList");
        assert_eq!(next_frame(&mut alice_rx).await["type"], "chat");
    }

    #[tokio::test]
    async fn test_shutdown_stops_the_loop() {
        // テスト項目: Shutdown を受け取ると Hub のループが終了する
        // given (前提条件):
        let (handle, task) = test_hub();

        // when (操作):
        handle.shutdown();

        // then (期待する結果):
        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert!(handle.is_closed());
        assert!(matches!(
            handle.broadcast(Broadcast::frame(pid("host0001"), chat_frame("late"))).await,
            Err(crate::hub::HubError::Closed(_))
        ));
    }
}
