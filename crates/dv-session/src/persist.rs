//! Snapshot writes off the async runtime

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use dv_core::DungeonId;
use dv_core::dungeon::Dungeon;
use dv_save::{SaveError, SaveHeader, SnapshotStore};

pub const SAVE_ATTEMPTS: u32 = 3;
pub const SAVE_BACKOFF: Duration = Duration::from_millis(200);

/// Save on the blocking pool, retrying with linear backoff
pub async fn save_with_retry(
    store: Arc<dyn SnapshotStore>,
    dungeon: Dungeon,
) -> Result<SaveHeader, SaveError> {
    let dungeon = Arc::new(dungeon);
    let mut attempt = 1;
    loop {
        let result = {
            let store = Arc::clone(&store);
            let dungeon = Arc::clone(&dungeon);
            tokio::task::spawn_blocking(move || store.save(&dungeon))
                .await
                .unwrap_or_else(|e| Err(SaveError::Io(std::io::Error::other(e))))
        };
        match result {
            Ok(header) => return Ok(header),
            Err(e) if attempt < SAVE_ATTEMPTS => {
                warn!(dungeon = %dungeon.id, attempt, error = %e, "save failed, retrying");
                tokio::time::sleep(SAVE_BACKOFF * attempt).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(dungeon = %dungeon.id, attempt, error = %e, "save failed");
                return Err(e);
            }
        }
    }
}

pub async fn load(store: Arc<dyn SnapshotStore>, id: DungeonId) -> Result<Dungeon, SaveError> {
    tokio::task::spawn_blocking(move || store.load(&id))
        .await
        .unwrap_or_else(|e| Err(SaveError::Io(std::io::Error::other(e))))
}

pub async fn list(store: Arc<dyn SnapshotStore>) -> Result<Vec<SaveHeader>, SaveError> {
    tokio::task::spawn_blocking(move || store.list())
        .await
        .unwrap_or_else(|e| Err(SaveError::Io(std::io::Error::other(e))))
}
