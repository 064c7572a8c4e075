//! Error types for the room layer.

use roomkit_protocol::RoomId;

/// Errors returned to callers of a [`RoomHandle`](crate::RoomHandle).
///
/// Every variant is delivered to the direct caller; nothing is swallowed
/// between the caller and the actor. A failed operation never changes the
/// actor's state.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The actor is dead, its mailbox is closed, or it did not answer
    /// within the configured timeout.
    #[error("room {0} is unreachable")]
    Unreachable(RoomId),

    /// A close was attempted by a member the behavior does not consider
    /// an admin. The room keeps running.
    #[error("member {member} is not an admin of room {room_id}")]
    NotAdmin { room_id: RoomId, member: String },

    /// The pluggable behavior rejected the operation (e.g. "not a member").
    #[error("room {room_id} rejected the operation: {reason}")]
    Adapter { room_id: RoomId, reason: String },

    /// A live state rewrite panicked; the previous state was kept.
    #[error("replacing the state of room {room_id} failed: {reason}")]
    ReplaceFailed { room_id: RoomId, reason: String },

    /// No room with this id is tracked by the [`RoomManager`](crate::RoomManager).
    #[error("room {0} not found")]
    NotFound(RoomId),
}

impl RoomError {
    /// Returns the id of the room the error refers to.
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::Unreachable(id) | Self::NotFound(id) => *id,
            Self::NotAdmin { room_id, .. }
            | Self::Adapter { room_id, .. }
            | Self::ReplaceFailed { room_id, .. } => *room_id,
        }
    }
}
