//! Unified error type for roomkit.

use roomkit_protocol::ProtocolError;
use roomkit_registry::RegistryError;
use roomkit_room::RoomError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RoomkitError {
    /// Encoding or decoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room call failed (unreachable, not an admin, behavior refused).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A registry call failed (invalid record, not found, snapshot i/o).
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
