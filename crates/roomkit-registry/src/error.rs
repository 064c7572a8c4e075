//! Error types for the registry layer.

use std::path::PathBuf;

use roomkit_protocol::{ParticipantId, ProtocolError};

/// Errors returned by [`Registry`](crate::Registry) operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The record failed shape validation and was not inserted.
    #[error("invalid room record: {0}")]
    InvalidRecord(String),

    /// No tuple matches `(participant, room_name)`.
    #[error("no room named {room_name:?} registered for participant {participant}")]
    NotFound {
        participant: ParticipantId,
        room_name: String,
    },

    /// The registry task has stopped or did not answer in time.
    #[error("membership registry is unavailable")]
    Unavailable,

    /// Reading or writing a snapshot file failed.
    #[error("snapshot i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot could not be encoded, or the file is not a valid
    /// snapshot.
    #[error("snapshot is malformed: {0}")]
    Snapshot(#[from] ProtocolError),
}
