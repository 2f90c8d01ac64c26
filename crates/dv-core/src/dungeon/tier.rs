//! Parameter tiers
//!
//! Each tier is a closed set of presets. Lookups are exhaustive matches, so
//! adding a tier fails to compile until every table has a row for it.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::ValidationError;

fn parse_tier<T>(kind: &'static str, s: &str) -> Result<T, ValidationError>
where
    T: IntoEnumIterator + ToString,
{
    let wanted = s.trim();
    T::iter()
        .find(|t| t.to_string().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| ValidationError::UnknownTier {
            kind,
            value: s.to_string(),
        })
}

/// Grid dimensions
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SizeTier {
    Small,
    #[default]
    Medium,
    Large,
}

impl SizeTier {
    /// (width, height) including the outer wall
    pub const fn dimensions(&self) -> (usize, usize) {
        match self {
            SizeTier::Small => (10, 10),
            SizeTier::Medium => (15, 15),
            SizeTier::Large => (20, 20),
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            SizeTier::Small => "Small Dungeon",
            SizeTier::Medium => "Medium Dungeon",
            SizeTier::Large => "Large Dungeon",
        }
    }
}

impl FromStr for SizeTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tier("size", s)
    }
}

/// Maze shape: how many loops and how few dead ends
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexityTier {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl ComplexityTier {
    pub const fn branch_factor(&self) -> f64 {
        match self {
            ComplexityTier::Easy => 0.2,
            ComplexityTier::Normal => 0.4,
            ComplexityTier::Hard => 0.6,
        }
    }

    /// How many dead ends get opened into loops
    pub const fn dead_ends(&self) -> usize {
        match self {
            ComplexityTier::Easy => 2,
            ComplexityTier::Normal => 4,
            ComplexityTier::Hard => 8,
        }
    }

    /// Scales the enemy count
    pub const fn encounter_factor(&self) -> f64 {
        match self {
            ComplexityTier::Easy => 0.8,
            ComplexityTier::Normal => 1.0,
            ComplexityTier::Hard => 1.2,
        }
    }
}

impl FromStr for ComplexityTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tier("complexity", s)
    }
}

/// How tall the tower is
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FloorCountTier {
    #[default]
    Small,
    Medium,
    Large,
    Extreme,
}

impl FloorCountTier {
    /// Inclusive (min, max) floor count
    pub const fn range(&self) -> (usize, usize) {
        match self {
            FloorCountTier::Small => (1, 3),
            FloorCountTier::Medium => (4, 6),
            FloorCountTier::Large => (7, 10),
            FloorCountTier::Extreme => (20, 20),
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            FloorCountTier::Small => "Few Floors",
            FloorCountTier::Medium => "Several Floors",
            FloorCountTier::Large => "Many Floors",
            FloorCountTier::Extreme => "Extreme Tower",
        }
    }
}

impl FromStr for FloorCountTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tier("floors", s)
    }
}

/// Encounter strength, trap density and reward scaling
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DifficultyTier {
    Easy,
    #[default]
    Normal,
    Hard,
    Lunatic,
}

impl DifficultyTier {
    /// Position in trap tables
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Share of placement cells that become traps; also the chest trap chance
    pub const fn trap_chance(&self) -> f64 {
        match self {
            DifficultyTier::Easy => 0.1,
            DifficultyTier::Normal => 0.2,
            DifficultyTier::Hard => 0.3,
            DifficultyTier::Lunatic => 0.4,
        }
    }

    pub const fn enemy_strength(&self) -> f64 {
        match self {
            DifficultyTier::Easy => 0.8,
            DifficultyTier::Normal => 1.0,
            DifficultyTier::Hard => 1.3,
            DifficultyTier::Lunatic => 1.8,
        }
    }

    /// Gold and item-count multiplier for chests
    pub const fn loot_multiplier(&self) -> f64 {
        match self {
            DifficultyTier::Easy => 1.0,
            DifficultyTier::Normal => 1.5,
            DifficultyTier::Hard => 2.0,
            DifficultyTier::Lunatic => 3.0,
        }
    }

    pub const fn boss_multiplier(&self) -> f64 {
        match self {
            DifficultyTier::Easy => 0.75,
            DifficultyTier::Normal => 1.0,
            DifficultyTier::Hard => 1.5,
            DifficultyTier::Lunatic => 2.0,
        }
    }

    /// Item stat scaling
    pub const fn item_scale(&self) -> f64 {
        match self {
            DifficultyTier::Easy => 1.0,
            DifficultyTier::Normal => 1.2,
            DifficultyTier::Hard => 1.5,
            DifficultyTier::Lunatic => 2.0,
        }
    }

    /// How quickly better item prefixes unlock
    pub const fn prefix_scale(&self) -> f64 {
        match self {
            DifficultyTier::Easy => 0.5,
            DifficultyTier::Normal => 1.0,
            DifficultyTier::Hard => 1.5,
            DifficultyTier::Lunatic => 2.0,
        }
    }
}

impl FromStr for DifficultyTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_tier("difficulty", s)
    }
}

/// The four tier choices that define a dungeon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DungeonParams {
    pub size: SizeTier,
    pub complexity: ComplexityTier,
    #[serde(rename = "floors_type")]
    pub floors: FloorCountTier,
    pub difficulty: DifficultyTier,
}

impl DungeonParams {
    pub const fn new(
        size: SizeTier,
        complexity: ComplexityTier,
        floors: FloorCountTier,
        difficulty: DifficultyTier,
    ) -> Self {
        Self {
            size,
            complexity,
            floors,
            difficulty,
        }
    }

    /// Parse tier names in size, complexity, floors, difficulty order.
    /// Missing names keep their default.
    pub fn parse<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<Self, ValidationError> {
        let mut params = Self::default();
        if let Some(w) = words.next() {
            params.size = w.parse()?;
        }
        if let Some(w) = words.next() {
            params.complexity = w.parse()?;
        }
        if let Some(w) = words.next() {
            params.floors = w.parse()?;
        }
        if let Some(w) = words.next() {
            params.difficulty = w.parse()?;
        }
        Ok(params)
    }
}
