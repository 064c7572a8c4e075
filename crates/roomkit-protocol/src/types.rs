//! Core identity and query types shared by every roomkit crate.
//!
//! These are the values that cross crate boundaries and end up inside
//! registry snapshots, so they all derive serde traits.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies a chat participant in the membership registry.
///
/// A newtype over `u64` so it can't be confused with a [`RoomId`].
/// Valid ids are strictly positive; `0` is reserved and rejected by the
/// registry (see [`ParticipantId::is_valid`]).
///
/// `#[serde(transparent)]` serializes `ParticipantId(7)` as plain `7`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    /// Returns `true` if the id is a positive integer.
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// Identifies one room actor instance for the lifetime of the process.
///
/// Room ids are handed out by a process-wide counter when an actor is
/// spawned and are never reused, so two handles with the same id always
/// refer to the same worker (live or dead).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SearchParams
// ---------------------------------------------------------------------------

/// Keyword parameters for a room search.
///
/// The framework never interprets these; they are handed to the
/// behavior's `search_room` untouched. Keys are kept sorted so two
/// parameter sets with the same pairs compare (and log) identically.
///
/// ```rust
/// use roomkit_protocol::SearchParams;
///
/// let params = SearchParams::new()
///     .with("name", "general")
///     .with("limit", "10");
/// assert_eq!(params.get("name"), Some("general"));
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchParams(BTreeMap<String, String>);

impl SearchParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or overwrites) a keyword and returns the updated set.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Looks up a keyword.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterates over `(keyword, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for SearchParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ParticipantId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_participant_id_deserializes_from_plain_number() {
        let id: ParticipantId = serde_json::from_str("7").unwrap();
        assert_eq!(id, ParticipantId(7));
    }

    #[test]
    fn test_participant_id_zero_is_invalid() {
        assert!(!ParticipantId(0).is_valid());
        assert!(ParticipantId(1).is_valid());
    }

    #[test]
    fn test_participant_id_display() {
        assert_eq!(ParticipantId(9).to_string(), "U-9");
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId(3).to_string(), "R-3");
    }

    #[test]
    fn test_search_params_with_overwrites_existing_key() {
        let params = SearchParams::new().with("name", "a").with("name", "b");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("name"), Some("b"));
    }

    #[test]
    fn test_search_params_iterates_in_key_order() {
        let params: SearchParams =
            [("z", "1"), ("a", "2"), ("m", "3")].into_iter().collect();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_search_params_serializes_as_object() {
        let params = SearchParams::new().with("topic", "rust");
        let json: serde_json::Value = serde_json::to_value(&params).unwrap();
        assert_eq!(json["topic"], "rust");
    }
}
