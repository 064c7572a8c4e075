//! Record types: what the registry stores about a participant's rooms.
//!
//! A [`RoomRecord`] is the full `(participant, handle, room_name, entered)`
//! tuple a caller hands to [`Registry::add`](crate::Registry::add). Inside
//! the registry the participant id is the key, so lookups hand back
//! [`Membership`] values without it.

use std::fmt;

use roomkit_protocol::ParticipantId;
use roomkit_room::{RoomBehavior, RoomHandle};

use crate::RegistryError;

// ---------------------------------------------------------------------------
// RoomRecord
// ---------------------------------------------------------------------------

/// One participant's membership in one room.
pub struct RoomRecord<B: RoomBehavior> {
    /// Who the membership belongs to. Must be positive.
    pub participant: ParticipantId,

    /// The room actor. The registry watches it and drops this record once
    /// the actor terminates.
    pub handle: RoomHandle<B>,

    /// The room's name as the participant knows it. Must be non-empty and
    /// is unique per participant.
    pub room_name: String,

    /// Whether the participant has actively joined the room, as opposed to
    /// merely being listed for it.
    pub entered: bool,
}

impl<B: RoomBehavior> RoomRecord<B> {
    pub fn new(
        participant: ParticipantId,
        handle: RoomHandle<B>,
        room_name: impl Into<String>,
        entered: bool,
    ) -> Self {
        Self {
            participant,
            handle,
            room_name: room_name.into(),
            entered,
        }
    }

    /// Checks the record's shape.
    ///
    /// The handle and the flag are well-formed by construction; only the
    /// participant id and the name need checking.
    ///
    /// # Errors
    /// [`RegistryError::InvalidRecord`] naming the offending field.
    pub fn validate(&self) -> Result<(), RegistryError> {
        Self::validate_key(self.participant, &self.room_name)
    }

    /// Runs the same checks as [`validate`](Self::validate) before any
    /// handle exists, so callers can reject a record before spawning or
    /// changing a room for it.
    pub fn validate_key(participant: ParticipantId, room_name: &str) -> Result<(), RegistryError> {
        if !participant.is_valid() {
            return Err(RegistryError::InvalidRecord(format!(
                "participant id must be positive, got {}",
                participant.0
            )));
        }
        if room_name.is_empty() {
            return Err(RegistryError::InvalidRecord(
                "room name must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_membership(self) -> (ParticipantId, Membership<B>) {
        (
            self.participant,
            Membership {
                handle: self.handle,
                room_name: self.room_name,
                entered: self.entered,
            },
        )
    }
}

impl<B: RoomBehavior> Clone for RoomRecord<B> {
    fn clone(&self) -> Self {
        Self {
            participant: self.participant,
            handle: self.handle.clone(),
            room_name: self.room_name.clone(),
            entered: self.entered,
        }
    }
}

impl<B: RoomBehavior> fmt::Debug for RoomRecord<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomRecord")
            .field("participant", &self.participant)
            .field("handle", &self.handle)
            .field("room_name", &self.room_name)
            .field("entered", &self.entered)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// A stored `(handle, room_name, entered)` tuple, as returned by
/// [`Registry::lookup`](crate::Registry::lookup).
pub struct Membership<B: RoomBehavior> {
    pub handle: RoomHandle<B>,
    pub room_name: String,
    pub entered: bool,
}

impl<B: RoomBehavior> Clone for Membership<B> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            room_name: self.room_name.clone(),
            entered: self.entered,
        }
    }
}

impl<B: RoomBehavior> PartialEq for Membership<B> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
            && self.room_name == other.room_name
            && self.entered == other.entered
    }
}

impl<B: RoomBehavior> Eq for Membership<B> {}

impl<B: RoomBehavior> fmt::Debug for Membership<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Membership")
            .field("handle", &self.handle)
            .field("room_name", &self.room_name)
            .field("entered", &self.entered)
            .finish()
    }
}
