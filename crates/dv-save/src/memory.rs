//! Snapshots kept in memory

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use dv_core::DungeonId;
use dv_core::dungeon::Dungeon;

use crate::{SaveError, SaveFile, SaveHeader, SnapshotStore};

/// Holds serialized snapshots, so loads go through the same decoding and
/// checks as files do
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<BTreeMap<DungeonId, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshots(&self) -> MutexGuard<'_, BTreeMap<DungeonId, Vec<u8>>> {
        self.snapshots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.snapshots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots().is_empty()
    }

    /// Replace a stored snapshot with raw bytes
    pub fn insert_raw(&self, id: DungeonId, bytes: Vec<u8>) {
        self.snapshots().insert(id, bytes);
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, dungeon: &Dungeon) -> Result<SaveHeader, SaveError> {
        let file = SaveFile::new(dungeon.clone(), Utc::now());
        let bytes = file.to_json()?;
        self.snapshots().insert(dungeon.id.clone(), bytes);
        Ok(file.header)
    }

    fn load(&self, id: &DungeonId) -> Result<Dungeon, SaveError> {
        let bytes = self
            .snapshots()
            .get(id)
            .cloned()
            .ok_or_else(|| SaveError::NotFound(id.clone()))?;
        Ok(SaveFile::from_json(&bytes)?.dungeon)
    }

    fn list(&self) -> Result<Vec<SaveHeader>, SaveError> {
        let mut saves: Vec<SaveHeader> = self
            .snapshots()
            .values()
            .filter_map(|b| crate::read_header(b).ok())
            .collect();
        saves.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(saves)
    }

    fn delete(&self, id: &DungeonId) -> Result<(), SaveError> {
        self.snapshots()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SaveError::NotFound(id.clone()))
    }
}
