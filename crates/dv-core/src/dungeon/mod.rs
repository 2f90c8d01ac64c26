//! Dungeon system
//!
//! Cell model, floors, tiers and the maze generator.

mod cell;
mod coord;
mod generation;
mod level;
pub mod maze;
pub mod pathfind;
pub mod placement;
mod tier;
mod topology;
pub mod vision;

pub use cell::CellKind;
pub use coord::{Direction, Pos};
pub use generation::DungeonGenerator;
pub use level::{ElementIndex, Floor};
pub use tier::{ComplexityTier, DifficultyTier, DungeonParams, FloorCountTier, SizeTier};
pub use topology::Dungeon;
