//! Membership registry for roomkit.
//!
//! Tracks which rooms each participant belongs to:
//!
//! 1. **Membership tuples**: `(participant, room handle, room name,
//!    entered)`, unique per `(participant, room name)` ([`Registry`])
//! 2. **Liveness cleanup**: every referenced room is monitored and its
//!    tuples vanish once it terminates
//! 3. **Snapshots**: the whole table can be written to disk and loaded
//!    back, with room ids resolved to live handles ([`SnapshotFile`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Facade (above)  ← joins participants to rooms, keeps the registry in sync
//!     ↕
//! Registry Layer (this crate)  ← who is in which room, survives restarts
//!     ↕
//! Room Layer (below)  ← room actors, handles, RoomManager
//! ```

mod config;
mod error;
mod monitor;
mod record;
mod registry;
mod snapshot;

pub use config::RegistrySettings;
pub use error::RegistryError;
pub use record::{Membership, RoomRecord};
pub use registry::{Registry, RegistryStats};
pub use snapshot::{SNAPSHOT_VERSION, SnapshotEntry, SnapshotFile};
