//! Spreading chests, traps and enemies over a floor
//!
//! Free path cells are bucketed into square regions. Each draw takes a cell
//! from a region not yet used in the current pass, so elements do not pile
//! up in one corner of the maze.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cell::CellKind;
use super::coord::Pos;
use super::level::Floor;
use super::tier::{ComplexityTier, DifficultyTier};
use crate::{DungeonRng, FINAL_FLOOR_EXTRA_CHESTS, FINAL_FLOOR_EXTRA_ENEMIES, REGION_SIZE};

/// Cells grouped by region, drawn without replacement
#[derive(Debug, Clone)]
pub struct RegionPool {
    regions: Vec<Vec<Pos>>,
    used: Vec<bool>,
}

impl RegionPool {
    pub fn new(cells: impl IntoIterator<Item = Pos>, width: usize, height: usize) -> Self {
        let per_row = width.div_ceil(REGION_SIZE).max(1);
        let count = per_row * height.div_ceil(REGION_SIZE).max(1);
        let mut regions = vec![Vec::new(); count];
        for p in cells {
            let r = (p.row / REGION_SIZE) * per_row + p.col / REGION_SIZE;
            if let Some(region) = regions.get_mut(r) {
                region.push(p);
            }
        }
        Self {
            used: vec![false; count],
            regions,
        }
    }

    pub fn remaining(&self) -> usize {
        self.regions.iter().map(Vec::len).sum()
    }

    /// Take one cell, or `None` once every region is empty
    pub fn draw(&mut self, rng: &mut DungeonRng) -> Option<Pos> {
        let mut candidates = self.candidates();
        if candidates.is_empty() {
            self.used.iter_mut().for_each(|u| *u = false);
            candidates = self.candidates();
        }
        let &r = rng.choose(&candidates)?;
        self.used[r] = true;
        let region = &mut self.regions[r];
        let i = rng.rn2(region.len() as u32) as usize;
        Some(region.swap_remove(i))
    }

    fn candidates(&self) -> Vec<usize> {
        (0..self.regions.len())
            .filter(|&r| !self.used[r] && !self.regions[r].is_empty())
            .collect()
    }
}

/// How many of each element a floor gets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCounts {
    pub chests: usize,
    pub traps: usize,
    pub enemies: usize,
}

impl ElementCounts {
    /// Targets for a floor with `free` plain path cells
    pub fn for_floor(
        free: usize,
        complexity: ComplexityTier,
        difficulty: DifficultyTier,
        is_final: bool,
    ) -> Self {
        if free == 0 {
            return Self::default();
        }
        let mut counts = Self {
            chests: (free / 15).max(1),
            traps: ((free as f64 * difficulty.trap_chance()) as usize).max(1),
            enemies: ((free as f64 / 10.0 * complexity.encounter_factor()) as usize).max(2),
        };
        if is_final {
            counts.chests += FINAL_FLOOR_EXTRA_CHESTS;
            counts.enemies += FINAL_FLOOR_EXTRA_ENEMIES;
        }
        counts
    }

    /// Unclaimed elements on a floor
    pub fn remaining(floor: &Floor) -> Self {
        let index = floor.index();
        Self {
            chests: index.chests.len(),
            traps: index.traps.len(),
            enemies: index.enemies.len(),
        }
    }
}

/// Place chests, then traps, then enemies. Stops early if the floor runs out
/// of free cells; returns what was actually placed.
pub fn place_elements(
    floor: &mut Floor,
    complexity: ComplexityTier,
    difficulty: DifficultyTier,
    is_final: bool,
    rng: &mut DungeonRng,
) -> ElementCounts {
    let free: Vec<Pos> = floor
        .positions()
        .filter(|p| floor.cell(*p) == CellKind::Path)
        .collect();
    let wanted = ElementCounts::for_floor(free.len(), complexity, difficulty, is_final);
    let mut pool = RegionPool::new(free, floor.width, floor.height);
    let mut placed = ElementCounts::default();

    let plan = [
        (CellKind::Chest, wanted.chests),
        (CellKind::Trap, wanted.traps),
        (CellKind::Enemy, wanted.enemies),
    ];
    'plan: for (kind, n) in plan {
        for _ in 0..n {
            let Some(p) = pool.draw(rng) else {
                break 'plan;
            };
            floor.set_cell(p, kind);
            match kind {
                CellKind::Chest => placed.chests += 1,
                CellKind::Trap => placed.traps += 1,
                _ => placed.enemies += 1,
            }
        }
    }

    debug!(
        floor = floor.number,
        chests = placed.chests,
        traps = placed.traps,
        enemies = placed.enemies,
        "placed elements"
    );
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn counts_follow_tiers() {
        let c = ElementCounts::for_floor(30, ComplexityTier::Normal, DifficultyTier::Easy, false);
        assert_eq!(c, ElementCounts { chests: 2, traps: 3, enemies: 3 });

        let c = ElementCounts::for_floor(5, ComplexityTier::Easy, DifficultyTier::Easy, true);
        assert_eq!(c, ElementCounts { chests: 2, traps: 1, enemies: 4 });

        assert_eq!(
            ElementCounts::for_floor(0, ComplexityTier::Hard, DifficultyTier::Lunatic, true),
            ElementCounts::default()
        );
    }

    #[test]
    fn pool_draws_each_cell_once() {
        let cells: Vec<Pos> = (0..12).flat_map(|r| (0..12).map(move |c| Pos::new(r, c))).collect();
        let mut pool = RegionPool::new(cells.clone(), 12, 12);
        let mut rng = DungeonRng::new(1);
        let mut seen = BTreeSet::new();
        while let Some(p) = pool.draw(&mut rng) {
            assert!(seen.insert(p));
        }
        assert_eq!(seen.len(), cells.len());
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn pool_spreads_across_regions_per_pass() {
        // 10x10 splits into four 5x5 regions
        let cells: Vec<Pos> = (0..10).flat_map(|r| (0..10).map(move |c| Pos::new(r, c))).collect();
        let mut pool = RegionPool::new(cells, 10, 10);
        let mut rng = DungeonRng::new(9);
        let quadrants: BTreeSet<(usize, usize)> = (0..4)
            .filter_map(|_| pool.draw(&mut rng))
            .map(|p| (p.row / 5, p.col / 5))
            .collect();
        assert_eq!(quadrants.len(), 4);
    }

    #[test]
    fn placement_stops_when_floor_is_full() {
        let mut floor = Floor::new(0, 4, 3);
        floor.set_cell(Pos::new(1, 1), CellKind::Path);
        floor.set_cell(Pos::new(1, 2), CellKind::Path);
        let mut rng = DungeonRng::new(2);
        let placed = place_elements(
            &mut floor,
            ComplexityTier::Normal,
            DifficultyTier::Normal,
            false,
            &mut rng,
        );
        assert_eq!(placed, ElementCounts { chests: 1, traps: 1, enemies: 0 });
        assert_eq!(floor.count(CellKind::Path), 0);
    }
}
