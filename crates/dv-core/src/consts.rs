//! Core dungeon constants

/// Side length of the square regions used to spread elements over a floor
pub const REGION_SIZE: usize = 5;

/// Loop-injection density: openings per interior cell per unit of branch factor
pub const LOOP_DENSITY: f64 = 0.02;

/// Attempts per requested opening before loop injection or dead-end
/// thinning gives up
pub const OPENING_ATTEMPTS: usize = 50;

/// Faces on the skill-check die
pub const SKILL_DIE: u32 = 20;

/// Number of distinct player marker colours
pub const PLAYER_PALETTE_SIZE: usize = 8;

/// Final floor bonus elements
pub const FINAL_FLOOR_EXTRA_CHESTS: usize = 1;
pub const FINAL_FLOOR_EXTRA_ENEMIES: usize = 2;
