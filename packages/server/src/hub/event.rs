//! Messages processed by the room hub.

use tokio::sync::mpsc;

use crate::domain::{Participant, ParticipantId, PlaybackChange, Timestamp};

/// One encoded text frame queued for a session's write pump.
pub type OutboundFrame = String;

/// Sending half of a session's bounded outbound queue.
pub type SessionSender = mpsc::Sender<OutboundFrame>;

/// A session registered with a hub.
///
/// The hub holds the only sender of the session's outbound queue, so
/// dropping the member closes the queue and ends the session's write pump.
#[derive(Debug)]
pub struct Member {
    pub participant: Participant,
    pub outbox: SessionSender,
}

impl Member {
    pub fn new(participant: Participant, outbox: SessionSender) -> Self {
        Self {
            participant,
            outbox,
        }
    }
}

/// A playback mutation carried by a broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackUpdate {
    pub change: PlaybackChange,
    pub at: Timestamp,
}

/// A frame fanned out to every member, optionally preceded by a playback
/// mutation applied in the same hub step.
///
/// The hub drops it unless `sender` is still a member.
#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    pub sender: ParticipantId,
    pub frame: OutboundFrame,
    pub playback: Option<PlaybackUpdate>,
}

impl Broadcast {
    pub fn frame(sender: ParticipantId, frame: OutboundFrame) -> Self {
        Self {
            sender,
            frame,
            playback: None,
        }
    }

    pub fn with_playback(sender: ParticipantId, frame: OutboundFrame, update: PlaybackUpdate) -> Self {
        Self {
            sender,
            frame,
            playback: Some(update),
        }
    }
}

/// Hub mailbox message. Processed strictly in arrival order.
#[derive(Debug)]
pub enum RoomEvent {
    Join(Member),
    Leave(ParticipantId),
    Broadcast(Broadcast),
    /// Deliver a frame from one member to exactly one other member.
    Relay {
        from: ParticipantId,
        to: ParticipantId,
        frame: OutboundFrame,
    },
    /// Stop the hub loop.
    Shutdown,
}
