//! # Roomkit
//!
//! Actor-based chat rooms with a membership registry.
//!
//! Each room runs as its own Tokio task around a pluggable
//! [`RoomBehavior`](roomkit_room::RoomBehavior) backend. A single registry
//! task remembers which rooms each participant belongs to, forgets rooms
//! as soon as they terminate, and can snapshot itself to disk.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomkit::prelude::*;
//!
//! // Implement RoomBehavior for your backend, then:
//! // let kit = RoomkitBuilder::new().build(MyBackend::default());
//! // let room = kit.open_room(ParticipantId(1), "general").await?;
//! // kit.join(ParticipantId(2), &room, "general", "member").await?;
//! // kit.persist("registry.json").await?;
//! ```

mod config;
mod error;
mod service;

pub use config::RoomkitSettings;
pub use error::RoomkitError;
pub use service::{Roomkit, RoomkitBuilder};

pub use roomkit_protocol as protocol;
pub use roomkit_registry as registry;
pub use roomkit_room as room;

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that prints to stdout.
///
/// The filter comes from `RUST_LOG`, falling back to `info`. Calling it
/// again, or after another subscriber was installed, does nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    pub use crate::{Roomkit, RoomkitBuilder, RoomkitError, RoomkitSettings, init_tracing};
    pub use roomkit_protocol::{Codec, JsonCodec, ParticipantId, RoomId, SearchParams};
    pub use roomkit_registry::{
        Membership, Registry, RegistryError, RegistrySettings, RegistryStats, RoomRecord,
    };
    pub use roomkit_room::{
        RoomBehavior, RoomConfig, RoomError, RoomHandle, RoomLifecycle, RoomManager,
        RoomSettings, RoomStatus, spawn_room,
    };
}
