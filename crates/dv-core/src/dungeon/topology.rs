//! Dungeon structure: an ordered stack of floors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::coord::Pos;
use super::level::Floor;
use super::tier::DungeonParams;
use crate::{DungeonId, DungeonRng, PlayerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dungeon {
    pub id: DungeonId,
    pub name: String,
    #[serde(flatten)]
    pub params: DungeonParams,
    pub creator: Option<PlayerId>,
    pub leader: Option<PlayerId>,
    pub floors: Vec<Floor>,
    pub current_floor: usize,
    /// Opaque handle of whatever is displaying this dungeon
    #[serde(default)]
    pub view_handle: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set once the final boss falls
    #[serde(default)]
    pub completed: bool,
}

impl Dungeon {
    /// `dungeon_<timestamp>_<4 digits>`
    pub fn make_id(now: DateTime<Utc>, rng: &mut DungeonRng) -> DungeonId {
        DungeonId::new(format!(
            "dungeon_{}_{}",
            now.format("%Y%m%d%H%M%S"),
            rng.range(1000, 9999)
        ))
    }

    pub fn floor_count(&self) -> usize {
        self.floors.len()
    }

    pub fn floor(&self, index: usize) -> Option<&Floor> {
        self.floors.get(index)
    }

    pub fn current(&self) -> Option<&Floor> {
        self.floors.get(self.current_floor)
    }

    pub fn current_mut(&mut self) -> Option<&mut Floor> {
        self.floors.get_mut(self.current_floor)
    }

    pub fn is_final_floor(&self) -> bool {
        self.current_floor + 1 >= self.floors.len()
    }

    /// One-based level used by the loot and boss tables
    pub fn level(&self) -> u32 {
        self.current_floor as u32 + 1
    }

    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.current().is_some_and(|f| f.players.contains_key(player))
    }

    pub fn position_of(&self, player: &PlayerId) -> Option<Pos> {
        self.current().and_then(|f| f.players.get(player).copied())
    }

    /// Players on the current floor, ordered by id
    pub fn players(&self) -> Vec<PlayerId> {
        self.current()
            .map(|f| f.players.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Rebuild derived per-floor data after deserializing
    pub fn reindex(&mut self) {
        for floor in &mut self.floors {
            floor.reindex();
        }
    }

    /// Structural sanity check for loaded snapshots
    pub fn is_well_formed(&self) -> bool {
        !self.floors.is_empty()
            && self.current_floor < self.floors.len()
            && self.floors.iter().all(Floor::is_well_formed)
    }
}
