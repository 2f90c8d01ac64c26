//! Trap definitions and skill checks

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use super::Stat;
use crate::config::PlayerProfile;
use crate::dungeon::DifficultyTier;
use crate::DungeonRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum TrapKind {
    #[strum(serialize = "Pit Trap")]
    Pit,
    #[strum(serialize = "Poison Darts")]
    PoisonDarts,
    #[strum(serialize = "Magical Runes")]
    MagicalRunes,
    #[strum(serialize = "Falling Rocks")]
    FallingRocks,
    #[strum(serialize = "Poisonous Gas")]
    PoisonousGas,
}

/// DC and damage range of one trap at one difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapCheck {
    pub dc: i32,
    pub damage: (i32, i32),
}

impl TrapKind {
    pub fn random(rng: &mut DungeonRng) -> TrapKind {
        let all: Vec<TrapKind> = TrapKind::iter().collect();
        rng.choose(&all).copied().unwrap_or(TrapKind::Pit)
    }

    pub const fn skill(&self) -> Stat {
        match self {
            TrapKind::Pit | TrapKind::PoisonDarts => Stat::Dexterity,
            TrapKind::MagicalRunes => Stat::Intelligence,
            TrapKind::FallingRocks => Stat::Strength,
            TrapKind::PoisonousGas => Stat::Constitution,
        }
    }

    pub const fn check(&self, difficulty: DifficultyTier) -> TrapCheck {
        // [easy, normal, hard, lunatic]
        let table: [(i32, i32, i32); 4] = match self {
            TrapKind::Pit => [(10, 5, 10), (12, 10, 20), (15, 15, 30), (18, 20, 40)],
            TrapKind::PoisonDarts => [(11, 5, 15), (13, 10, 25), (16, 15, 35), (19, 20, 45)],
            TrapKind::MagicalRunes => [(10, 10, 15), (12, 15, 25), (15, 20, 35), (18, 25, 50)],
            TrapKind::FallingRocks => [(10, 5, 15), (12, 10, 25), (15, 15, 35), (18, 20, 45)],
            TrapKind::PoisonousGas => [(11, 5, 10), (13, 10, 20), (16, 15, 30), (19, 20, 40)],
        };
        let (dc, lo, hi) = table[difficulty.index()];
        TrapCheck { dc, damage: (lo, hi) }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            TrapKind::Pit => "The floor suddenly gives way beneath you!",
            TrapKind::PoisonDarts => "Darts shoot out from hidden holes in the walls!",
            TrapKind::MagicalRunes => "Arcane runes on the floor begin to glow with dangerous energy!",
            TrapKind::FallingRocks => "You hear a rumbling from above as rocks begin to fall!",
            TrapKind::PoisonousGas => "A noxious green gas begins filling the room!",
        }
    }

    pub const fn success_message(&self) -> &'static str {
        match self {
            TrapKind::Pit => "You catch yourself on the edge just in time and pull yourself up safely.",
            TrapKind::PoisonDarts => "You dodge the darts with impressive reflexes!",
            TrapKind::MagicalRunes => "You quickly decipher the runes and safely disable them.",
            TrapKind::FallingRocks => "You shield yourself and push through the falling debris!",
            TrapKind::PoisonousGas => "You hold your breath and make it through the gas cloud!",
        }
    }

    pub fn failure_message(&self, damage: i32) -> String {
        match self {
            TrapKind::Pit => format!("You fall into the pit, taking {damage} damage!"),
            TrapKind::PoisonDarts => {
                format!("The darts strike you, inflicting {damage} damage and mild poison!")
            }
            TrapKind::MagicalRunes => {
                format!("The runes explode with magical energy, dealing {damage} damage!")
            }
            TrapKind::FallingRocks => format!("You're caught in the rockfall, taking {damage} damage!"),
            TrapKind::PoisonousGas => {
                format!("You inhale the gas, coughing violently and taking {damage} damage!")
            }
        }
    }
}

/// An armed trap waiting for the player's roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapState {
    pub trap: TrapKind,
    pub difficulty: DifficultyTier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapOutcome {
    pub trap: TrapKind,
    pub skill: Stat,
    pub roll: i32,
    pub bonus: i32,
    pub dc: i32,
    pub success: bool,
    /// Zero on success
    pub damage: i32,
}

impl TrapOutcome {
    pub fn total(&self) -> i32 {
        self.roll + self.bonus
    }

    pub fn message(&self) -> String {
        if self.success {
            self.trap.success_message().to_string()
        } else {
            self.trap.failure_message(self.damage)
        }
    }
}

impl TrapState {
    /// `d20 + stat bonus` against the DC; damage only on failure
    pub fn resolve(&self, profile: &PlayerProfile, rng: &mut DungeonRng) -> TrapOutcome {
        let check = self.trap.check(self.difficulty);
        let roll = rng.d20();
        let bonus = rng.range(profile.stat_bonus.0, profile.stat_bonus.1);
        let success = roll + bonus >= check.dc;
        let damage = if success {
            0
        } else {
            rng.range(check.damage.0, check.damage.1)
        };
        TrapOutcome {
            trap: self.trap,
            skill: self.trap.skill(),
            roll,
            bonus,
            dc: check.dc,
            success,
            damage,
        }
    }
}
