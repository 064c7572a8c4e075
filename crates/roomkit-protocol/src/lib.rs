//! Shared vocabulary for roomkit.
//!
//! - **Types** ([`ParticipantId`], [`RoomId`], [`SearchParams`]): the
//!   identities and query values every other crate speaks in.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how registry snapshots
//!   are turned into bytes and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! ```text
//! roomkit (facade) → roomkit-registry → roomkit-room → roomkit-protocol
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ParticipantId, RoomId, SearchParams};
