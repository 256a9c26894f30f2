//! Cloneable handle to a running room hub.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::domain::{Participant, ParticipantId, PlaybackState, RoomId, RoomProfile, RoomSummary};

use super::{
    error::HubError,
    event::{Broadcast, Member, OutboundFrame, RoomEvent},
};

/// State published by the hub after every event it processes.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    /// Current members in join order
    pub members: Vec<Participant>,
    pub playback: PlaybackState,
}

/// Handle to a room hub: its immutable profile, its mailbox and the latest
/// published snapshot.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    profile: Arc<RoomProfile>,
    mailbox: mpsc::Sender<RoomEvent>,
    snapshot: watch::Receiver<RoomSnapshot>,
}

impl RoomHandle {
    pub(super) fn new(
        profile: Arc<RoomProfile>,
        mailbox: mpsc::Sender<RoomEvent>,
        snapshot: watch::Receiver<RoomSnapshot>,
    ) -> Self {
        Self {
            profile,
            mailbox,
            snapshot,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.profile.id
    }

    pub fn profile(&self) -> &RoomProfile {
        &self.profile
    }

    /// Latest published hub state.
    pub fn snapshot(&self) -> RoomSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Point-in-time summary for the HTTP API.
    pub fn summary(&self) -> RoomSummary {
        let snapshot = self.snapshot.borrow();
        RoomSummary {
            profile: (*self.profile).clone(),
            member_count: snapshot.members.len(),
            playback: snapshot.playback.clone(),
        }
    }

    /// Wait until the hub publishes a new snapshot.
    pub async fn changed(&mut self) -> Result<(), HubError> {
        let result = self.snapshot.changed().await;
        result.map_err(|_| self.closed())
    }

    /// Whether the hub loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    pub async fn join(&self, member: Member) -> Result<(), HubError> {
        self.send(RoomEvent::Join(member)).await
    }

    pub async fn leave(&self, participant_id: ParticipantId) -> Result<(), HubError> {
        self.send(RoomEvent::Leave(participant_id)).await
    }

    pub async fn broadcast(&self, broadcast: Broadcast) -> Result<(), HubError> {
        self.send(RoomEvent::Broadcast(broadcast)).await
    }

    pub async fn relay(
        &self,
        from: ParticipantId,
        to: ParticipantId,
        frame: OutboundFrame,
    ) -> Result<(), HubError> {
        self.send(RoomEvent::Relay { from, to, frame }).await
    }

    /// Ask the hub to stop without waiting for mailbox capacity.
    ///
    /// If the mailbox is full the hub still stops once every handle is dropped.
    pub fn shutdown(&self) {
        if self.mailbox.try_send(RoomEvent::Shutdown).is_err() {
            tracing::debug!(
                "Room {}: shutdown not queued, hub stops when its handles are dropped",
                self.profile.id
            );
        }
    }

    /// Queue an event, waiting for mailbox capacity.
    pub async fn send(&self, event: RoomEvent) -> Result<(), HubError> {
        self.mailbox.send(event).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> HubError {
        HubError::Closed(self.profile.id.as_str().to_string())
    }
}
