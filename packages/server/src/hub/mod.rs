//! Room hub: one actor per room.
//!
//! The hub owns membership and the Playback State of its room. Sessions and
//! use cases talk to it only through its mailbox ([`RoomHandle`]), and read
//! its state only through published [`RoomSnapshot`] copies, so every
//! mutation is linearized without locks.

mod actor;
mod error;
mod event;
mod handle;

pub use actor::RoomHub;
pub use error::HubError;
pub use event::{Broadcast, Member, OutboundFrame, PlaybackUpdate, RoomEvent, SessionSender};
pub use handle::{RoomHandle, RoomSnapshot};

/// Default capacity of a hub mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;
