//! On-disk registry snapshots.
//!
//! Room handles can't be written to disk, so a snapshot stores each tuple
//! with its room's [`RoomId`] instead. Loading turns ids back into handles
//! through whatever rooms the loading registry can resolve.

use std::path::{Path, PathBuf};

use roomkit_protocol::{Codec, ParticipantId, ProtocolError, RoomId};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::RegistryError;

/// Format version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub version: u32,
    pub records: Vec<SnapshotEntry>,
}

/// One tuple, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub participant: ParticipantId,
    pub room_id: RoomId,
    pub room_name: String,
    pub entered: bool,
}

impl SnapshotFile {
    pub fn new(records: Vec<SnapshotEntry>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            records,
        }
    }

    /// Rejects files from another format version and entries that
    /// [`RoomRecord::validate`](crate::RoomRecord::validate) would reject.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(ProtocolError::InvalidData(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        for (index, entry) in self.records.iter().enumerate() {
            if !entry.participant.is_valid() {
                return Err(ProtocolError::InvalidData(format!(
                    "record {index}: participant id must be positive"
                )));
            }
            if entry.room_name.is_empty() {
                return Err(ProtocolError::InvalidData(format!(
                    "record {index}: room name must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Writes `snapshot` next to `path` and renames it into place, so readers
/// never see a half-written file.
pub async fn write_snapshot<C: Codec>(
    codec: &C,
    path: &Path,
    snapshot: &SnapshotFile,
) -> Result<(), RegistryError> {
    let bytes = codec.encode(snapshot)?;
    let tmp_path = tmp_path_for(path);

    fs::write(&tmp_path, bytes)
        .await
        .map_err(|source| io_error(&tmp_path, source))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|source| io_error(path, source))?;

    Ok(())
}

/// Reads and validates the snapshot at `path`.
pub async fn read_snapshot<C: Codec>(codec: &C, path: &Path) -> Result<SnapshotFile, RegistryError> {
    let bytes = fs::read(path)
        .await
        .map_err(|source| io_error(path, source))?;
    let snapshot: SnapshotFile = codec.decode(&bytes)?;
    snapshot.validate()?;
    Ok(snapshot)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn io_error(path: &Path, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomkit_protocol::JsonCodec;

    fn entry(participant: u64, room_id: u64, name: &str) -> SnapshotEntry {
        SnapshotEntry {
            participant: ParticipantId(participant),
            room_id: RoomId(room_id),
            room_name: name.into(),
            entered: false,
        }
    }

    #[test]
    fn test_tmp_path_for_appends_suffix() {
        let path = Path::new("/var/lib/roomkit/registry.json");
        assert_eq!(
            tmp_path_for(path),
            PathBuf::from("/var/lib/roomkit/registry.json.tmp")
        );
    }

    #[test]
    fn test_validate_rejects_other_version() {
        let mut snapshot = SnapshotFile::new(vec![]);
        snapshot.version = 99;
        assert!(matches!(
            snapshot.validate(),
            Err(ProtocolError::InvalidData(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_participant() {
        let snapshot = SnapshotFile::new(vec![entry(1, 1, "general"), entry(0, 1, "general")]);
        let err = snapshot.validate().unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let snapshot = SnapshotFile::new(vec![entry(1, 1, "")]);
        assert!(snapshot.validate().is_err());
    }

    #[tokio::test]
    async fn test_write_then_read_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let snapshot = SnapshotFile::new(vec![entry(1, 7, "general"), entry(2, 7, "general")]);

        write_snapshot(&JsonCodec, &path, &snapshot).await.unwrap();
        let read = read_snapshot(&JsonCodec, &path).await.unwrap();

        assert_eq!(read, snapshot);
        assert!(!tmp_path_for(&path).exists());
    }

    #[tokio::test]
    async fn test_read_snapshot_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = read_snapshot(&JsonCodec, &path).await.unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
    }
}
