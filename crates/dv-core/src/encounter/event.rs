//! Random dungeon events

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use super::Stat;
use crate::DungeonRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum EventKind {
    #[strum(serialize = "Healing Fountain")]
    HealingFountain,
    #[strum(serialize = "Hidden Treasure")]
    HiddenTreasure,
    #[strum(serialize = "Magical Shrine")]
    MagicalShrine,
    #[strum(serialize = "Collapsed Passage")]
    CollapsedPassage,
    #[strum(serialize = "Mysterious Stranger")]
    MysteriousStranger,
}

impl EventKind {
    pub const fn description(&self) -> &'static str {
        match self {
            EventKind::HealingFountain => "You discover a magical fountain that restores health!",
            EventKind::HiddenTreasure => "You find a small cache of gold hidden in a loose stone!",
            EventKind::MagicalShrine => "You come across a small shrine radiating magical energy.",
            EventKind::CollapsedPassage => "Part of the dungeon has collapsed, blocking your path!",
            EventKind::MysteriousStranger => "You encounter a hooded figure who offers you advice.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventEffect {
    Heal(i32),
    Gold(u32),
    Buff { stat: Stat, amount: i32 },
    /// Cleared with a strength check that always succeeds
    Obstacle,
    Hint(String),
}

const HEAL_AMOUNT: i32 = 30;
const SHRINE_BONUS: i32 = 2;
const SHRINE_STATS: [Stat; 4] = [Stat::Strength, Stat::Dexterity, Stat::Intelligence, Stat::Luck];

const HINTS: [&str; 5] = [
    "Beware the eastern passage...",
    "The north chamber holds great treasure.",
    "Look for hidden symbols on the walls.",
    "Sometimes running is wiser than fighting.",
    "The next floor has more dangerous enemies.",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOutcome {
    pub kind: EventKind,
    pub effect: EventEffect,
}

impl EventOutcome {
    /// Pick an event uniformly and roll its effect
    pub fn random(rng: &mut DungeonRng) -> EventOutcome {
        let kinds: Vec<EventKind> = EventKind::iter().collect();
        let kind = rng.choose(&kinds).copied().unwrap_or(EventKind::HealingFountain);
        let effect = match kind {
            EventKind::HealingFountain => EventEffect::Heal(HEAL_AMOUNT),
            EventKind::HiddenTreasure => EventEffect::Gold(rng.range(20, 50) as u32),
            EventKind::MagicalShrine => EventEffect::Buff {
                stat: rng.choose(&SHRINE_STATS).copied().unwrap_or(Stat::Luck),
                amount: SHRINE_BONUS,
            },
            EventKind::CollapsedPassage => EventEffect::Obstacle,
            EventKind::MysteriousStranger => {
                EventEffect::Hint(rng.choose(&HINTS).copied().unwrap_or_default().to_string())
            }
        };
        EventOutcome { kind, effect }
    }

    pub fn message(&self) -> String {
        match &self.effect {
            EventEffect::Heal(hp) => {
                format!("You drink from the fountain and feel revitalized! (+{hp} HP)")
            }
            EventEffect::Gold(gold) => format!("You pocket {gold} gold coins!"),
            EventEffect::Buff { stat, amount } => {
                format!("The shrine's magic infuses you with power! ({stat} +{amount})")
            }
            EventEffect::Obstacle => "You manage to clear a path through the debris.".to_string(),
            EventEffect::Hint(hint) => format!("The stranger whispers: '{hint}'"),
        }
    }
}
