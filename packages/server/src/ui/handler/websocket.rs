//! WebSocket connection handlers.
//!
//! Each connection runs two pumps: the read pump decodes inbound frames and
//! dispatches them to the room hub, the write pump drains the session's
//! outbound queue onto the socket. Whichever finishes first aborts the other.

use std::{fmt, sync::Arc, time::Duration};

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{
    sink::{Sink, SinkExt},
    stream::{SplitStream, StreamExt},
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{MissedTickBehavior, timeout},
};

use crate::{
    domain::{Participant, RoomId, Username},
    hub::{OutboundFrame, RoomHandle},
    infrastructure::dto::{
        http::ConnectQuery,
        websocket::{Envelope, ErrorPayload, MessageType},
    },
    ui::state::AppState,
    usecase::{JoinRoomError, SessionRegistration},
};
use watchparty_shared::time::timestamp_to_rfc3339;

use super::http::error_response;

/// Interval between keep-alive pings.
const PING_INTERVAL: Duration = Duration::from_secs(54);

/// A session with no inbound frame for this long is closed.
const READ_DEADLINE: Duration = Duration::from_secs(60);

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, Response> {
    // 存在しないルームはアップグレード前に 404
    let room_id = match state.connect_participant_usecase.ensure_room(room_id).await {
        Ok(room_id) => room_id,
        Err(e) => {
            tracing::warn!("Rejected connection: {}", e);
            return Err(error_response(StatusCode::NOT_FOUND, "Room not found"));
        }
    };
    if let Err(e) = Username::or_default(query.username.clone()) {
        tracing::warn!("Rejected connection to room {}: {}", room_id, e);
        return Err(error_response(StatusCode::BAD_REQUEST, e.to_string()));
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, query.username)))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    room_id: RoomId,
    username: Option<String>,
) {
    let (mut sender, receiver) = socket.split();

    // アップグレード中にルームが削除されていれば error を送って閉じる
    let session = match state
        .connect_participant_usecase
        .execute(&room_id, username)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Could not join room {}: {}", room_id, e);
            let message = match e {
                JoinRoomError::RoomNotFound(_) | JoinRoomError::HubClosed(_) => {
                    "Room not found".to_string()
                }
                JoinRoomError::InvalidUsername(e) => e.to_string(),
            };
            if let Some(frame) = error_frame(&state, &room_id, message) {
                let _ = timeout(state.write_deadline, sender.send(Message::Text(frame.into()))).await;
            }
            let _ = timeout(state.write_deadline, sender.send(Message::Close(None))).await;
            return;
        }
    };
    let SessionRegistration {
        handle,
        participant,
        outbox,
    } = session;

    let mut send_task = write_pump(outbox, sender, participant.clone(), state.write_deadline);
    let mut recv_task = read_pump(receiver, state.clone(), handle.clone(), participant.clone());

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state
        .disconnect_participant_usecase
        .execute(&handle, participant.id)
        .await;
}

/// Spawns the task that decodes frames from the socket and dispatches them
/// to the hub. Ends on close, transport error, read deadline or hub shutdown.
fn read_pump(
    mut receiver: SplitStream<WebSocket>,
    state: Arc<AppState>,
    handle: RoomHandle,
    participant: Participant,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let msg = match timeout(READ_DEADLINE, receiver.next()).await {
                Ok(Some(Ok(msg))) => msg,
                Ok(Some(Err(e))) => {
                    tracing::debug!("WebSocket error from {}: {}", participant.id, e);
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::info!(
                        "No frame from {} for {:?}, closing",
                        participant.id,
                        READ_DEADLINE
                    );
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received from {}: {}", participant.id, text.as_str());
                    if let Err(e) = state
                        .send_message_usecase
                        .execute(&handle, &participant, text.as_str())
                        .await
                    {
                        tracing::info!("Ending session {}: {}", participant.id, e);
                        break;
                    }
                }
                Message::Binary(_) => {
                    tracing::debug!("Ignoring binary frame from {}", participant.id);
                }
                Message::Ping(_) | Message::Pong(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Client {} requested close", participant.id);
                    break;
                }
            }
        }
    })
}

/// Spawns the task that drains the outbound queue onto the socket and sends
/// keep-alive pings. A closed queue means the hub dropped the member; a write
/// that does not finish within `write_deadline` ends the session.
fn write_pump<S>(
    mut outbox: mpsc::Receiver<OutboundFrame>,
    mut sender: S,
    participant: Participant,
    write_deadline: Duration,
) -> JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: fmt::Display,
{
    tokio::spawn(async move {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping.tick().await;

        loop {
            let message = tokio::select! {
                frame = outbox.recv() => match frame {
                    Some(frame) => Message::Text(frame.into()),
                    None => {
                        tracing::debug!("Outbound queue of {} closed", participant.id);
                        let _ = timeout(write_deadline, sender.send(Message::Close(None))).await;
                        break;
                    }
                },
                _ = ping.tick() => Message::Ping(Default::default()),
            };

            match timeout(write_deadline, sender.send(message)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!("WebSocket write to {} failed: {}", participant.id, e);
                    break;
                }
                Err(_) => {
                    tracing::warn!(
                        "Write to {} blocked for {:?}, closing",
                        participant.id,
                        write_deadline
                    );
                    break;
                }
            }
        }
    })
}

fn error_frame(state: &AppState, room_id: &RoomId, message: String) -> Option<OutboundFrame> {
    let data = serde_json::to_value(ErrorPayload { message }).ok()?;
    let timestamp = timestamp_to_rfc3339(state.clock.now_millis());
    Envelope::server(MessageType::Error, room_id.as_str(), data, timestamp)
        .encode()
        .ok()
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        pin::Pin,
        task::{Context, Poll},
    };

    use super::*;
    use crate::domain::ParticipantId;

    /// A socket whose peer never reads: every write stays pending.
    struct StalledSink;

    impl Sink<Message> for StalledSink {
        type Error = Infallible;

        fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _: Message) -> Result<(), Self::Error> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }
    }

    fn participant() -> Participant {
        Participant::new(
            ParticipantId::new("slow0001".to_string()).unwrap(),
            Username::new("slow".to_string()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_write_pump_ends_when_socket_write_stalls() {
        // テスト項目: 書き込みが期限内に終わらないソケットでは write pump が終了する
        // given (前提条件):
        let (tx, rx) = mpsc::channel(4);
        let task = write_pump(rx, StalledSink, participant(), Duration::from_millis(50));

        // when (操作):
        tx.send(r#"{"type":"chat"}"#.to_string()).await.unwrap();

        // then (期待する結果): キューの送信側が生きていても pump は終わり、受信側も閉じる
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("write pump kept waiting on a stalled socket")
            .unwrap();
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn test_write_pump_ends_when_queue_closes() {
        // テスト項目: Hub が送信キューを閉じると write pump が終了する
        // given (前提条件):
        let (tx, rx) = mpsc::channel::<OutboundFrame>(4);
        let task = write_pump(
            rx,
            futures_util::sink::drain(),
            participant(),
            Duration::from_secs(1),
        );

        // when (操作):
        tx.send(r#"{"type":"chat"}"#.to_string()).await.unwrap();
        drop(tx);

        // then (期待する結果):
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("write pump did not stop after the queue closed")
            .unwrap();
    }
}
