//! Snapshots as files in a directory

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::{debug, warn};

use dv_core::DungeonId;
use dv_core::config::SaveConfig;
use dv_core::dungeon::Dungeon;

use crate::{SaveError, SaveFile, SaveHeader, SnapshotStore, read_header};

const PLAIN_EXT: &str = "json";
const GZ_EXT: &str = "json.gz";

/// Platform data directory, `.../delve/saves`
pub fn default_save_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("delve");
    path.push("saves");
    path
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    compress: bool,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            dir: dir.into(),
            compress,
        }
    }

    pub fn from_config(config: &SaveConfig) -> Self {
        let dir = config.dir.clone().unwrap_or_else(default_save_dir);
        Self::new(dir, config.compress)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File stem for an id; anything outside `[A-Za-z0-9_-]` becomes `_`
    fn stem(id: &DungeonId) -> String {
        id.as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect()
    }

    fn path_for(&self, id: &DungeonId, compressed: bool) -> PathBuf {
        let ext = if compressed { GZ_EXT } else { PLAIN_EXT };
        self.dir.join(format!("{}.{ext}", Self::stem(id)))
    }

    fn read_bytes(path: &Path) -> Result<Vec<u8>, SaveError> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut bytes = Vec::new();
        if path.to_string_lossy().ends_with(GZ_EXT) {
            GzDecoder::new(reader).read_to_end(&mut bytes)?;
        } else {
            reader.read_to_end(&mut bytes)?;
        }
        Ok(bytes)
    }

    /// Write to a temporary file and rename it into place
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), SaveError> {
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("tmp");
        {
            let writer = BufWriter::new(File::create(&tmp)?);
            if self.compress {
                let mut encoder = GzEncoder::new(writer, Compression::default());
                encoder.write_all(bytes)?;
                encoder.finish()?.flush()?;
            } else {
                let mut writer = writer;
                writer.write_all(bytes)?;
                writer.flush()?;
            }
        }
        if let Err(e) = fs::rename(&tmp, path) {
            fs::remove_file(&tmp).ok();
            return Err(e.into());
        }
        Ok(())
    }

    fn is_snapshot(path: &Path) -> bool {
        let name = path.to_string_lossy();
        name.ends_with(GZ_EXT) || name.ends_with(".json")
    }
}

impl SnapshotStore for FileStore {
    fn save(&self, dungeon: &Dungeon) -> Result<SaveHeader, SaveError> {
        let file = SaveFile::new(dungeon.clone(), Utc::now());
        let bytes = file.to_json()?;
        let path = self.path_for(&dungeon.id, self.compress);
        self.write_bytes(&path, &bytes)?;

        // Drop a copy left in the other encoding so loads see only this one
        fs::remove_file(self.path_for(&dungeon.id, !self.compress)).ok();
        debug!(dungeon = %dungeon.id, path = %path.display(), "snapshot written");
        Ok(file.header)
    }

    fn load(&self, id: &DungeonId) -> Result<Dungeon, SaveError> {
        let path = [self.path_for(id, true), self.path_for(id, false)]
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| SaveError::NotFound(id.clone()))?;
        let bytes = Self::read_bytes(&path)?;
        let file = SaveFile::from_json(&bytes)?;
        if &file.dungeon.id != id {
            return Err(SaveError::Corrupted(format!(
                "{} holds dungeon {}",
                path.display(),
                file.dungeon.id
            )));
        }
        Ok(file.dungeon)
    }

    fn list(&self) -> Result<Vec<SaveHeader>, SaveError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut saves = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !Self::is_snapshot(&path) {
                continue;
            }
            match Self::read_bytes(&path).and_then(|b| read_header(&b)) {
                Ok(header) => saves.push(header),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable snapshot"),
            }
        }

        // Newest first
        saves.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(saves)
    }

    fn delete(&self, id: &DungeonId) -> Result<(), SaveError> {
        let mut found = false;
        for path in [self.path_for(id, true), self.path_for(id, false)] {
            if path.exists() {
                fs::remove_file(path)?;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(SaveError::NotFound(id.clone()))
        }
    }
}
