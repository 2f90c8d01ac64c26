//! Dungeon generation
//!
//! Floors are carved independently: maze, endpoints, element placement.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::cell::CellKind;
use super::level::Floor;
use super::maze;
use super::placement;
use super::tier::DungeonParams;
use super::topology::Dungeon;
use crate::DungeonRng;

/// Builds dungeons from tier parameters
#[derive(Debug, Clone, Default)]
pub struct DungeonGenerator {
    rng: DungeonRng,
}

impl DungeonGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator whose output is fully determined by `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: DungeonRng::new(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn generate(&mut self, params: DungeonParams) -> Dungeon {
        self.generate_at(params, None, Utc::now())
    }

    /// Generate with an optional custom name and an explicit timestamp
    pub fn generate_at(
        &mut self,
        params: DungeonParams,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Dungeon {
        let (min, max) = params.floors.range();
        let floor_count = self.rng.range(min as i32, max as i32).max(1) as usize;
        let id = Dungeon::make_id(now, &mut self.rng);

        let floors = (0..floor_count)
            .map(|n| self.generate_floor(n, &params, n + 1 == floor_count))
            .collect();

        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} ({} Complexity)", params.size.label(), params.complexity));

        info!(dungeon = %id, floors = floor_count, size = %params.size, difficulty = %params.difficulty, "generated dungeon");

        Dungeon {
            id,
            name,
            params,
            creator: None,
            leader: None,
            floors,
            current_floor: 0,
            view_handle: None,
            created_at: now,
            completed: false,
        }
    }

    fn generate_floor(&mut self, number: usize, params: &DungeonParams, is_final: bool) -> Floor {
        let (width, height) = params.size.dimensions();
        let mut floor = Floor::new(number, width, height);

        let (start, goal, stats) = maze::carve(&mut floor, params.complexity, &mut self.rng);
        floor.start = start;
        floor.terminal = goal;
        floor.set_cell(start, CellKind::Start);
        floor.set_cell(
            goal,
            if is_final {
                CellKind::End
            } else {
                CellKind::StairsUp
            },
        );

        let placed = placement::place_elements(
            &mut floor,
            params.complexity,
            params.difficulty,
            is_final,
            &mut self.rng,
        );
        floor.reindex();

        debug!(
            floor = number,
            open = floor.open_cells().count(),
            loops = stats.loops,
            chests = placed.chests,
            "floor ready"
        );
        floor
    }
}
