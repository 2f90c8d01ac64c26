//! A single dungeon floor

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::cell::CellKind;
use super::coord::{Direction, Pos};
use crate::PlayerId;

/// Where the interactive cells of a floor are.
///
/// Derived from the grid, never persisted. Rebuilt with [`Floor::reindex`]
/// after loading and kept in step by [`Floor::consume`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementIndex {
    pub chests: BTreeSet<Pos>,
    pub traps: BTreeSet<Pos>,
    pub enemies: BTreeSet<Pos>,
    pub stairs_up: Option<Pos>,
    pub stairs_down: Option<Pos>,
    pub start: Option<Pos>,
    pub end: Option<Pos>,
}

impl ElementIndex {
    fn record(&mut self, pos: Pos, kind: CellKind) {
        match kind {
            CellKind::Chest => {
                self.chests.insert(pos);
            }
            CellKind::Trap => {
                self.traps.insert(pos);
            }
            CellKind::Enemy => {
                self.enemies.insert(pos);
            }
            CellKind::StairsUp => self.stairs_up = Some(pos),
            CellKind::StairsDown => self.stairs_down = Some(pos),
            CellKind::Start => self.start = Some(pos),
            CellKind::End => self.end = Some(pos),
            _ => {}
        }
    }

    fn forget(&mut self, pos: Pos, kind: CellKind) {
        match kind {
            CellKind::Chest => {
                self.chests.remove(&pos);
            }
            CellKind::Trap => {
                self.traps.remove(&pos);
            }
            CellKind::Enemy => {
                self.enemies.remove(&pos);
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    /// Zero-based floor number
    pub number: usize,
    pub width: usize,
    pub height: usize,
    /// Indexed `[row][col]`
    pub grid: Vec<Vec<CellKind>>,
    pub start: Pos,
    /// `End` on the last floor, `StairsUp` elsewhere
    pub terminal: Pos,
    /// Cells any player has ever seen
    pub revealed: Vec<Vec<bool>>,
    pub players: BTreeMap<PlayerId, Pos>,
    #[serde(skip)]
    index: ElementIndex,
}

impl Floor {
    /// Solid floor of the given size
    pub fn new(number: usize, width: usize, height: usize) -> Self {
        Self {
            number,
            width,
            height,
            grid: vec![vec![CellKind::Wall; width]; height],
            start: Pos::new(0, 0),
            terminal: Pos::new(0, 0),
            revealed: vec![vec![false; width]; height],
            players: BTreeMap::new(),
            index: ElementIndex::default(),
        }
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.row < self.height && pos.col < self.width
    }

    /// Cell kind at `pos`; outside the grid reads as wall
    pub fn cell(&self, pos: Pos) -> CellKind {
        self.grid
            .get(pos.row)
            .and_then(|row| row.get(pos.col))
            .copied()
            .unwrap_or(CellKind::Wall)
    }

    pub fn set_cell(&mut self, pos: Pos, kind: CellKind) {
        if !self.in_bounds(pos) {
            return;
        }
        let old = self.grid[pos.row][pos.col];
        self.index.forget(pos, old);
        self.grid[pos.row][pos.col] = kind;
        self.index.record(pos, kind);
    }

    pub fn is_open(&self, pos: Pos) -> bool {
        self.cell(pos).is_open()
    }

    /// In-bounds neighbour of `pos` in `dir`
    pub fn neighbor(&self, pos: Pos, dir: Direction) -> Option<Pos> {
        pos.step(dir, 1).filter(|p| self.in_bounds(*p))
    }

    /// Open 4-neighbours of `pos`
    pub fn open_neighbors(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |d| self.neighbor(pos, d))
            .filter(|p| self.is_open(*p))
    }

    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.height).flat_map(move |row| (0..self.width).map(move |col| Pos::new(row, col)))
    }

    pub fn open_cells(&self) -> impl Iterator<Item = Pos> + '_ {
        self.positions().filter(|p| self.is_open(*p))
    }

    pub fn count(&self, kind: CellKind) -> usize {
        self.grid.iter().flatten().filter(|k| **k == kind).count()
    }

    pub fn is_terminal(&self, pos: Pos) -> bool {
        pos == self.terminal
    }

    pub fn index(&self) -> &ElementIndex {
        &self.index
    }

    /// Rebuild the element index from the grid
    pub fn reindex(&mut self) {
        let mut index = ElementIndex::default();
        for (row, cells) in self.grid.iter().enumerate() {
            for (col, kind) in cells.iter().enumerate() {
                index.record(Pos::new(row, col), *kind);
            }
        }
        self.index = index;
    }

    /// Use up a single-use element, turning the cell back into path.
    /// Returns the kind that was there, or `None` if nothing was consumed.
    pub fn consume(&mut self, pos: Pos) -> Option<CellKind> {
        let kind = self.cell(pos);
        if !kind.is_single_use() {
            return None;
        }
        self.set_cell(pos, CellKind::Path);
        Some(kind)
    }

    /// Whether grid and reveal dimensions agree with `width` and `height`
    pub fn is_well_formed(&self) -> bool {
        self.grid.len() == self.height
            && self.grid.iter().all(|r| r.len() == self.width)
            && self.revealed.len() == self.height
            && self.revealed.iter().all(|r| r.len() == self.width)
            && self.in_bounds(self.start)
            && self.in_bounds(self.terminal)
            && self.players.values().all(|p| self.in_bounds(*p))
    }

    /// Text dump, one glyph per cell, players as `@`
    pub fn ascii(&self) -> String {
        let occupied: BTreeSet<Pos> = self.players.values().copied().collect();
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for (row, cells) in self.grid.iter().enumerate() {
            for (col, kind) in cells.iter().enumerate() {
                if occupied.contains(&Pos::new(row, col)) {
                    out.push('@');
                } else {
                    out.push(kind.symbol());
                }
            }
            out.push('\n');
        }
        out
    }
}
