//! Runtime configuration
//!
//! Every field has a default so a partial `delve.toml` (or none at all) is
//! valid. File loading lives in `dv-session`; this crate only defines the shape.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DelveConfig {
    pub fog: FogConfig,
    pub encounters: EncounterConfig,
    pub session: SessionConfig,
    pub save: SaveConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    pub enabled: bool,
    /// Cells visible around each player (1 = 3x3 square)
    pub radius: usize,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: 1,
        }
    }
}

/// Relative weights of the random encounter kinds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterWeights {
    pub trap: f64,
    pub battle: f64,
    pub event: f64,
}

impl Default for EncounterWeights {
    fn default() -> Self {
        Self {
            trap: 0.3,
            battle: 0.5,
            event: 0.2,
        }
    }
}

/// Stand-in numbers for the character system that lives outside this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    pub stat_bonus: (i32, i32),
    pub attack_bonus: (i32, i32),
    pub weapon_damage: (i32, i32),
    pub weapon_bonus: (i32, i32),
    pub base_defense: i32,
    pub defend_bonus: i32,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            stat_bonus: (0, 5),
            attack_bonus: (1, 5),
            weapon_damage: (5, 10),
            weapon_bonus: (0, 3),
            base_defense: 10,
            defend_bonus: 5,
        }
    }
}

impl PlayerProfile {
    /// Smallest damage a landed hit can do
    pub fn min_damage(&self) -> i32 {
        self.weapon_damage.0.min(self.weapon_damage.1) + self.weapon_bonus.0.min(self.weapon_bonus.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Chance per successful move of a random encounter
    pub random_move_chance: f64,
    /// Seconds a player is immune to random encounters after one fires
    pub cooldown_secs: u64,
    pub trap_expiry_secs: u64,
    pub battle_expiry_secs: u64,
    pub flee_chance: f64,
    pub weights: EncounterWeights,
    pub player: PlayerProfile,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            random_move_chance: 0.05,
            cooldown_secs: 60,
            trap_expiry_secs: 120,
            battle_expiry_secs: 300,
            flee_chance: 0.7,
            weights: EncounterWeights::default(),
            player: PlayerProfile::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long an empty session waits for an end confirmation
    pub pending_end_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pending_end_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    pub enabled: bool,
    pub auto_save_minutes: u64,
    /// Snapshot directory; the platform data directory is used when unset
    pub dir: Option<PathBuf>,
    /// Write gzip-compressed snapshots
    pub compress: bool,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_save_minutes: 5,
            dir: None,
            compress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Pixels per grid cell
    pub cell_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { cell_size: 32 }
    }
}
