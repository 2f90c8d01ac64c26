//! Encounters: traps, battles, chests, random events and bosses
//!
//! Each player holds at most one active encounter. Traps and battles stay
//! active until the player acts on them or they expire; chests and events
//! resolve the moment they trigger.

mod battle;
mod bestiary;
mod engine;
mod event;
mod loot;
mod trap;

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{PlayerId, SessionId, ValidationError};

pub use battle::{BattleState, EnemyStrike, PlayerMove, Reward, StatusEffect, TurnOutcome};
pub use bestiary::{BossTemplate, Enemy, EnemyTemplate, Special, bosses_for_level, enemies_for};
pub use engine::{ActionOutcome, EncounterContext, EncounterEngine, Trigger, deadline_after};
pub use event::{EventEffect, EventKind, EventOutcome};
pub use loot::{Item, ItemCategory, Loot, Rarity};
pub use trap::{TrapCheck, TrapKind, TrapOutcome, TrapState};

/// Player attributes named by skill checks and buffs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Stat {
    Strength,
    Dexterity,
    Intelligence,
    Constitution,
    Luck,
}

/// Who an encounter belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EncounterKey {
    pub session: SessionId,
    pub player: PlayerId,
}

impl EncounterKey {
    pub fn new(session: SessionId, player: PlayerId) -> Self {
        Self { session, player }
    }
}

impl fmt::Display for EncounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session, self.player)
    }
}

/// Sequence number distinguishing successive encounters of one key
pub type EncounterId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EncounterKind {
    Trap(TrapState),
    Battle(BattleState),
}

impl EncounterKind {
    pub fn label(&self) -> &'static str {
        match self {
            EncounterKind::Trap(_) => "trap",
            EncounterKind::Battle(b) if b.enemy.is_boss => "boss",
            EncounterKind::Battle(_) => "battle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub key: EncounterKey,
    pub kind: EncounterKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Presentation message showing this encounter, if any
    pub view_handle: Option<String>,
}

impl Encounter {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What a player does in response to an encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Action {
    /// Make the skill check of a trap
    Roll,
    Attack,
    Defend,
    Skill,
    Item,
    Flee,
}

impl FromStr for Action {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "roll" | "dice" | "check" => Ok(Action::Roll),
            "attack" | "a" | "fight" => Ok(Action::Attack),
            "defend" | "block" => Ok(Action::Defend),
            "skill" => Ok(Action::Skill),
            "item" | "use" => Ok(Action::Item),
            "flee" | "run" => Ok(Action::Flee),
            _ => Err(ValidationError::UnknownAction(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_actions() {
        assert_eq!("Attack".parse::<Action>().unwrap(), Action::Attack);
        assert_eq!("run".parse::<Action>().unwrap(), Action::Flee);
        assert_eq!("dice".parse::<Action>().unwrap(), Action::Roll);
        assert!(matches!(
            "dance".parse::<Action>(),
            Err(ValidationError::UnknownAction(_))
        ));
    }

    #[test]
    fn key_display() {
        let key = EncounterKey::new(SessionId::from("chan"), PlayerId::from("42"));
        assert_eq!(key.to_string(), "chan/42");
    }
}
