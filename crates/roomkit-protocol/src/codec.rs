//! Codec trait and implementations for serializing roomkit values.
//!
//! The registry writes its snapshots through a [`Codec`], so the on-disk
//! encoding can change without touching the registry itself. Only
//! round-trip fidelity is promised, never specific bytes.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because a codec lives inside long-running
/// Tokio tasks (the registry loop) for the life of the process.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Snapshots stay human-readable, which helps when inspecting a registry
/// image by hand. Behind the `json` feature (on by default).
///
/// ```rust
/// use roomkit_protocol::{Codec, JsonCodec, SearchParams};
///
/// let codec = JsonCodec;
/// let params = SearchParams::new().with("name", "general");
///
/// let bytes = codec.encode(&params).unwrap();
/// let decoded: SearchParams = codec.decode(&bytes).unwrap();
/// assert_eq!(params, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec_pretty(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
