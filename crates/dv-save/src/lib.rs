//! dv-save: Snapshot persistence for delve dungeons
//!
//! A snapshot is one JSON document per dungeon id: a small header used for
//! listing plus the complete dungeon. [`FileStore`] keeps them on disk,
//! optionally gzip-compressed; [`MemoryStore`] keeps them in a map for tests
//! and ephemeral setups.

mod file;
mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use dv_core::DungeonId;
use dv_core::dungeon::Dungeon;

pub use file::{FileStore, default_save_dir};
pub use memory::MemoryStore;

/// Current snapshot format version
pub const SAVE_VERSION: u32 = 1;

/// Snapshot errors
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No snapshot for dungeon {0}")]
    NotFound(DungeonId),

    #[error("Snapshot corrupted: {0}")]
    Corrupted(String),

    #[error("Incompatible snapshot version: expected {expected}, found {found}")]
    IncompatibleVersion { expected: u32, found: u32 },

    #[error("Invalid snapshot header")]
    InvalidHeader,
}

/// Snapshot header, enough to list saves without showing the grids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    /// Magic identifier
    pub magic: String,
    /// Snapshot format version
    pub version: u32,
    pub dungeon_id: DungeonId,
    pub name: String,
    /// Zero-based floor the party was on
    pub floor: usize,
    pub floor_count: usize,
    pub completed: bool,
    pub saved_at: DateTime<Utc>,
}

impl SaveHeader {
    const MAGIC: &'static str = "DLVS";

    pub fn new(dungeon: &Dungeon, now: DateTime<Utc>) -> Self {
        Self {
            magic: Self::MAGIC.to_string(),
            version: SAVE_VERSION,
            dungeon_id: dungeon.id.clone(),
            name: dungeon.name.clone(),
            floor: dungeon.current_floor,
            floor_count: dungeon.floor_count(),
            completed: dungeon.completed,
            saved_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        if self.magic != Self::MAGIC {
            return Err(SaveError::InvalidHeader);
        }
        if self.version != SAVE_VERSION {
            return Err(SaveError::IncompatibleVersion {
                expected: SAVE_VERSION,
                found: self.version,
            });
        }
        Ok(())
    }

    /// `Floor n/m`
    pub fn progress(&self) -> String {
        format!("Floor {}/{}", self.floor + 1, self.floor_count)
    }
}

/// Complete snapshot document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFile {
    pub header: SaveHeader,
    pub dungeon: Dungeon,
}

/// Only the header of a snapshot; the rest of the document is skipped
#[derive(Deserialize)]
struct HeaderOnly {
    header: SaveHeader,
}

impl SaveFile {
    pub fn new(dungeon: Dungeon, now: DateTime<Utc>) -> Self {
        Self {
            header: SaveHeader::new(&dungeon, now),
            dungeon,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, SaveError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse and check a snapshot, rebuilding derived data
    pub fn from_json(bytes: &[u8]) -> Result<Self, SaveError> {
        let mut file: SaveFile = serde_json::from_slice(bytes).map_err(classify)?;
        file.header.validate()?;
        if file.header.dungeon_id != file.dungeon.id {
            return Err(SaveError::Corrupted(format!(
                "header names {} but dungeon is {}",
                file.header.dungeon_id, file.dungeon.id
            )));
        }
        if !file.dungeon.is_well_formed() {
            return Err(SaveError::Corrupted(format!(
                "dungeon {} has malformed floors",
                file.dungeon.id
            )));
        }
        file.dungeon.reindex();
        Ok(file)
    }
}

/// Read just the header of a snapshot document
pub fn read_header(bytes: &[u8]) -> Result<SaveHeader, SaveError> {
    let only: HeaderOnly = serde_json::from_slice(bytes).map_err(classify)?;
    only.header.validate()?;
    Ok(only.header)
}

/// Well-formed JSON with the wrong contents (a fog cell in a grid, a
/// negative coordinate) is corruption; anything else is a plain parse error
fn classify(e: serde_json::Error) -> SaveError {
    if e.is_data() {
        SaveError::Corrupted(e.to_string())
    } else {
        SaveError::Serialization(e)
    }
}

/// Somewhere snapshots live
pub trait SnapshotStore: Send + Sync {
    /// Write the dungeon's snapshot, replacing any earlier one
    fn save(&self, dungeon: &Dungeon) -> Result<SaveHeader, SaveError>;

    fn load(&self, id: &DungeonId) -> Result<Dungeon, SaveError>;

    /// Headers of every readable snapshot, newest first
    fn list(&self) -> Result<Vec<SaveHeader>, SaveError>;

    fn delete(&self, id: &DungeonId) -> Result<(), SaveError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dv_core::dungeon::{DungeonGenerator, DungeonParams};

    fn dungeon() -> Dungeon {
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap();
        DungeonGenerator::with_seed(4).generate_at(DungeonParams::default(), None, now)
    }

    #[test]
    fn test_header_validation() {
        let d = dungeon();
        let header = SaveHeader::new(&d, d.created_at);
        assert!(header.validate().is_ok());

        let mut bad_header = header.clone();
        bad_header.magic = "XXXX".to_string();
        assert!(matches!(bad_header.validate(), Err(SaveError::InvalidHeader)));

        let mut old_header = header;
        old_header.version = 999;
        assert!(matches!(
            old_header.validate(),
            Err(SaveError::IncompatibleVersion { expected: 1, found: 999 })
        ));
    }

    #[test]
    fn test_header_only_read() {
        let d = dungeon();
        let bytes = SaveFile::new(d.clone(), d.created_at).to_json().unwrap();
        let header = read_header(&bytes).unwrap();
        assert_eq!(header.dungeon_id, d.id);
        assert_eq!(header.progress(), format!("Floor 1/{}", d.floor_count()));
    }

    #[test]
    fn test_fog_in_grid_is_corruption() {
        let d = dungeon();
        let mut value = serde_json::to_value(SaveFile::new(d.clone(), d.created_at)).unwrap();
        value["dungeon"]["floors"][0]["grid"][0][0] = serde_json::json!(11);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(SaveFile::from_json(&bytes), Err(SaveError::Corrupted(_))));
    }

    #[test]
    fn test_truncated_is_serialization_error() {
        let d = dungeon();
        let bytes = SaveFile::new(d.clone(), d.created_at).to_json().unwrap();
        let cut = &bytes[..bytes.len() / 2];
        assert!(matches!(SaveFile::from_json(cut), Err(SaveError::Serialization(_))));
    }

    #[test]
    fn test_malformed_floor_is_corruption() {
        let mut d = dungeon();
        d.floors[0].grid.pop();
        let bytes = SaveFile::new(d.clone(), d.created_at).to_json().unwrap();
        assert!(matches!(SaveFile::from_json(&bytes), Err(SaveError::Corrupted(_))));
    }
}
