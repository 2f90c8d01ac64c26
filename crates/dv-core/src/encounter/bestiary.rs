//! Enemy and boss tables

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::dungeon::DifficultyTier;
use crate::DungeonRng;

/// Signature ability of an enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
pub enum Special {
    #[default]
    None,
    Undead,
    Poison,
    Rage,
    Drain,
    Charge,
    Breath,
    Magic,
    Fire,
}

impl Special {
    /// Side effect reported when an enemy with this special lands a hit
    pub const fn on_hit(&self) -> Option<&'static str> {
        match self {
            Special::Poison => Some("You are poisoned!"),
            Special::Drain => Some("You feel your energy being drained!"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub xp: u32,
    pub gold: u32,
    pub special: Special,
}

const fn enemy(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    stats: (i32, i32, i32, u32, u32),
    special: Special,
) -> EnemyTemplate {
    let (hp, attack, defense, xp, gold) = stats;
    EnemyTemplate {
        id,
        name,
        description,
        hp,
        attack,
        defense,
        xp,
        gold,
        special,
    }
}

static EASY_ENEMIES: [EnemyTemplate; 3] = [
    enemy("goblin_scout", "Goblin Scout", "A small, sneaky goblin wielding a knife!", (20, 5, 3, 50, 10), Special::None),
    enemy("giant_rat", "Giant Rat", "An oversized rodent with vicious teeth!", (15, 4, 2, 30, 5), Special::None),
    enemy("skeleton", "Skeleton", "A reanimated skeleton wielding a rusty sword!", (25, 6, 4, 60, 15), Special::Undead),
];

static NORMAL_ENEMIES: [EnemyTemplate; 3] = [
    enemy("goblin_warrior", "Goblin Warrior", "A battle-hardened goblin with crude but effective armor!", (40, 8, 6, 100, 25), Special::None),
    enemy("zombie", "Zombie", "A shambling undead creature with rotting flesh!", (50, 7, 5, 90, 20), Special::Undead),
    enemy("giant_spider", "Giant Spider", "A massive arachnid with venomous fangs!", (35, 9, 4, 110, 30), Special::Poison),
];

static HARD_ENEMIES: [EnemyTemplate; 3] = [
    enemy("orc_warrior", "Orc Warrior", "A muscular orc with a massive battleaxe!", (80, 12, 8, 200, 50), Special::Rage),
    enemy("wraith", "Wraith", "A malevolent spirit that seems to float through the air!", (65, 14, 10, 220, 60), Special::Drain),
    enemy("minotaur", "Minotaur", "A towering bull-headed humanoid with a massive hammer!", (100, 15, 12, 250, 70), Special::Charge),
];

static LUNATIC_ENEMIES: [EnemyTemplate; 3] = [
    enemy("dragon_wyrmling", "Dragon Wyrmling", "A young dragon with developing scales and growing power!", (150, 20, 15, 500, 200), Special::Breath),
    enemy("lich", "Lich", "An undead sorcerer of immense power!", (120, 25, 18, 450, 180), Special::Magic),
    enemy("demon", "Lesser Demon", "A terrifying fiend from another plane of existence!", (180, 22, 16, 550, 250), Special::Fire),
];

pub fn enemies_for(difficulty: DifficultyTier) -> &'static [EnemyTemplate] {
    match difficulty {
        DifficultyTier::Easy => &EASY_ENEMIES,
        DifficultyTier::Normal => &NORMAL_ENEMIES,
        DifficultyTier::Hard => &HARD_ENEMIES,
        DifficultyTier::Lunatic => &LUNATIC_ENEMIES,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BossTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub ability: &'static str,
    pub xp: u32,
    pub gold: u32,
    pub drop: &'static str,
}

static EARLY_BOSSES: [BossTemplate; 2] = [
    BossTemplate {
        name: "Giant Slime",
        description: "A massive, pulsating slime that consumes everything in its path!",
        hp: 150, attack: 15, defense: 10,
        ability: "Splits into smaller slimes when damaged",
        xp: 300, gold: 150, drop: "Slime Core",
    },
    BossTemplate {
        name: "Goblin King",
        description: "A large, cunning goblin wearing a crude crown and wielding a spiked club!",
        hp: 180, attack: 20, defense: 12,
        ability: "Calls goblin minions",
        xp: 350, gold: 200, drop: "Goblin Crown",
    },
];

static MID_BOSSES: [BossTemplate; 2] = [
    BossTemplate {
        name: "Stone Golem",
        description: "A massive construct of animated stone with glowing runes etched into its surface!",
        hp: 300, attack: 25, defense: 20,
        ability: "Earthquake attack",
        xp: 600, gold: 300, drop: "Golem Core",
    },
    BossTemplate {
        name: "Necromancer",
        description: "A sinister spellcaster surrounded by floating skeletal minions!",
        hp: 250, attack: 30, defense: 15,
        ability: "Raises undead minions",
        xp: 550, gold: 350, drop: "Necromantic Tome",
    },
];

static LATE_BOSSES: [BossTemplate; 2] = [
    BossTemplate {
        name: "Ancient Dragon",
        description: "A massive, ancient dragon with scales that shimmer with magical energy!",
        hp: 500, attack: 40, defense: 30,
        ability: "Breath weapon",
        xp: 1200, gold: 800, drop: "Dragon Scale",
    },
    BossTemplate {
        name: "Lich Lord",
        description: "A powerful undead sorcerer radiating dark energy and ancient knowledge!",
        hp: 450, attack: 45, defense: 25,
        ability: "Soul drain",
        xp: 1100, gold: 750, drop: "Phylactery Shard",
    },
];

static FINAL_BOSSES: [BossTemplate; 2] = [
    BossTemplate {
        name: "Dungeon Master",
        description: "The powerful entity that controls this entire dungeon, now manifesting to face you directly!",
        hp: 800, attack: 60, defense: 40,
        ability: "Reality warping",
        xp: 2000, gold: 1500, drop: "Master's Key",
    },
    BossTemplate {
        name: "Void Leviathan",
        description: "A colossal entity from beyond reality that has nested in the depths of this dungeon!",
        hp: 1000, attack: 70, defense: 50,
        ability: "Void corruption",
        xp: 2500, gold: 2000, drop: "Void Essence",
    },
];

/// Boss pool for a one-based floor level
pub fn bosses_for_level(level: u32) -> &'static [BossTemplate] {
    match level {
        0..=3 => &EARLY_BOSSES,
        4..=6 => &MID_BOSSES,
        7..=10 => &LATE_BOSSES,
        _ => &FINAL_BOSSES,
    }
}

/// A live opponent with its stats already scaled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub description: String,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub xp: u32,
    pub gold: u32,
    pub special: Special,
    /// Boss ability text
    pub ability: Option<String>,
    pub drop: Option<String>,
    pub is_boss: bool,
}

fn scale(v: i32, factor: f64) -> i32 {
    ((v as f64 * factor) as i32).max(1)
}

impl Enemy {
    /// Random enemy of the difficulty's table, hp and attack scaled by
    /// the difficulty's enemy strength
    pub fn spawn(difficulty: DifficultyTier, rng: &mut DungeonRng) -> Enemy {
        let t = rng
            .choose(enemies_for(difficulty))
            .copied()
            .unwrap_or(EASY_ENEMIES[0]);
        let strength = difficulty.enemy_strength();
        Enemy {
            name: t.name.to_string(),
            description: t.description.to_string(),
            max_hp: scale(t.hp, strength),
            attack: scale(t.attack, strength),
            defense: t.defense,
            xp: t.xp,
            gold: t.gold,
            special: t.special,
            ability: None,
            drop: None,
            is_boss: false,
        }
    }

    /// Boss for `level`, scaled by difficulty and then by party size
    pub fn boss(difficulty: DifficultyTier, level: u32, party: usize, rng: &mut DungeonRng) -> Enemy {
        let t = rng
            .choose(bosses_for_level(level))
            .copied()
            .unwrap_or(EARLY_BOSSES[0]);
        let mult = difficulty.boss_multiplier();
        let extra = party.saturating_sub(1) as f64;
        Enemy {
            name: t.name.to_string(),
            description: t.description.to_string(),
            max_hp: scale(scale(t.hp, mult), 1.0 + 0.5 * extra),
            attack: scale(scale(t.attack, mult), 1.0 + 0.3 * extra),
            defense: scale(t.defense, mult),
            xp: (t.xp as f64 * mult) as u32,
            gold: (t.gold as f64 * mult) as u32,
            special: Special::None,
            ability: Some(t.ability.to_string()),
            drop: Some(t.drop.to_string()),
            is_boss: true,
        }
    }
}
