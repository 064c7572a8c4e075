//! Room actors for roomkit.
//!
//! Each room runs as an isolated Tokio task (actor model) owning a
//! `(behavior, state)` pair. Callers talk to it through a [`RoomHandle`];
//! every call is bounded by a timeout, so a dead room shows up as
//! [`RoomError::Unreachable`] rather than a hang.
//!
//! # Key types
//!
//! - [`RoomBehavior`]: the trait room backends implement
//! - [`RoomHandle`]: send requests to a running room actor
//! - [`RoomConfig`]: the `(behavior, state)` pair a room owns
//! - [`RoomSettings`]: call timeouts and mailbox size
//! - [`RoomManager`]: spawns rooms and resolves handles by id

mod behavior;
mod client;
mod config;
mod error;
mod manager;
mod room;

pub use behavior::RoomBehavior;
pub use config::{RoomConfig, RoomLifecycle, RoomSettings};
pub use error::RoomError;
pub use manager::RoomManager;
pub use room::{RoomHandle, RoomStatus, spawn_room};
