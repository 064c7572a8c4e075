//! Error types for the protocol layer.
//!
//! Each roomkit crate defines its own error enum. A `ProtocolError` always
//! means bytes could not be turned into values (or back), never that a
//! room or the registry misbehaved.

/// Errors raised while encoding or decoding roomkit values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed input, missing fields, wrong
    /// types, or a truncated file.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The bytes decoded, but the value violates a format rule, e.g. a
    /// snapshot written by an unsupported format version.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
