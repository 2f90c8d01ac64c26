//! File and memory store behaviour

use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use dv_core::dungeon::{
    ComplexityTier, DifficultyTier, Dungeon, DungeonGenerator, DungeonParams, FloorCountTier,
    SizeTier,
};
use dv_core::{DungeonId, PlayerId};
use dv_save::{FileStore, MemoryStore, SaveError, SnapshotStore};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("delve_test_{name}_{}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    dir
}

fn dungeon(seed: u64) -> Dungeon {
    let params = DungeonParams::new(
        SizeTier::Small,
        ComplexityTier::Normal,
        FloorCountTier::Medium,
        DifficultyTier::Hard,
    );
    let now = Utc.with_ymd_and_hms(2025, 5, 5, 5, 5, 5).unwrap();
    let mut d = DungeonGenerator::with_seed(seed).generate_at(params, None, now);
    // Some live state worth preserving
    d.current_floor = 2;
    d.leader = Some(PlayerId::from("7"));
    let floor = &mut d.floors[2];
    let start = floor.start;
    floor.players.insert(PlayerId::from("7"), start);
    floor.reveal_around(start, 1);
    d.view_handle = Some("msg-1".to_string());
    d
}

#[test]
fn test_file_round_trip() {
    let dir = scratch_dir("plain");
    let store = FileStore::new(&dir, false);
    let d = dungeon(1);

    let header = store.save(&d).unwrap();
    assert_eq!(header.dungeon_id, d.id);
    assert_eq!(header.floor, 2);
    assert!(dir.join(format!("{}.json", d.id)).exists());

    let loaded = store.load(&d.id).unwrap();
    assert_eq!(loaded, d);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_compressed_round_trip() {
    let dir = scratch_dir("gz");
    let store = FileStore::new(&dir, true);
    let d = dungeon(2);

    store.save(&d).unwrap();
    assert!(dir.join(format!("{}.json.gz", d.id)).exists());
    assert!(!dir.join(format!("{}.json", d.id)).exists());
    assert_eq!(store.load(&d.id).unwrap(), d);

    // Switching encodings leaves a single snapshot behind
    let plain = FileStore::new(&dir, false);
    plain.save(&d).unwrap();
    assert!(!dir.join(format!("{}.json.gz", d.id)).exists());
    assert_eq!(plain.list().unwrap().len(), 1);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_list_skips_junk() {
    let dir = scratch_dir("list");
    let store = FileStore::new(&dir, false);
    store.save(&dungeon(3)).unwrap();
    store.save(&dungeon(4)).unwrap();
    std::fs::write(dir.join("broken.json"), b"{ nope").unwrap();
    std::fs::write(dir.join("notes.txt"), b"hello").unwrap();

    let saves = store.list().unwrap();
    assert_eq!(saves.len(), 2);
    assert!(saves[0].saved_at >= saves[1].saved_at);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_dir_lists_nothing() {
    let store = FileStore::new(scratch_dir("absent"), false);
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_load_nonexistent() {
    let store = FileStore::new(scratch_dir("missing"), false);
    let id = DungeonId::from("dungeon_19700101000000_1234");
    assert!(matches!(store.load(&id), Err(SaveError::NotFound(_))));
    assert!(matches!(store.delete(&id), Err(SaveError::NotFound(_))));
}

#[test]
fn test_delete() {
    let dir = scratch_dir("delete");
    let store = FileStore::new(&dir, false);
    let d = dungeon(5);
    store.save(&d).unwrap();
    store.delete(&d.id).unwrap();
    assert!(matches!(store.load(&d.id), Err(SaveError::NotFound(_))));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_memory_store() {
    let store = MemoryStore::new();
    let d = dungeon(6);
    store.save(&d).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.load(&d.id).unwrap(), d);
    assert_eq!(store.list().unwrap()[0].name, d.name);

    store.insert_raw(d.id.clone(), b"[]".to_vec());
    assert!(store.load(&d.id).is_err());
    assert!(store.list().unwrap().is_empty());

    store.delete(&d.id).unwrap();
    assert!(store.is_empty());
}
