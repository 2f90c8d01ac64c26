//! Chest loot

use core::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::DungeonRng;
use crate::dungeon::DifficultyTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ItemCategory {
    Weapon,
    Armor,
    Consumable,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Rarity {
    Uncommon,
    Rare,
    #[strum(serialize = "Very Rare")]
    VeryRare,
    Legendary,
}

impl From<DifficultyTier> for Rarity {
    fn from(d: DifficultyTier) -> Self {
        match d {
            DifficultyTier::Easy => Rarity::Uncommon,
            DifficultyTier::Normal => Rarity::Rare,
            DifficultyTier::Hard => Rarity::VeryRare,
            DifficultyTier::Lunatic => Rarity::Legendary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    Weapon { name: String, power: i32 },
    Armor { name: String, defense: i32 },
    Consumable { name: String, effect: String, power: i32 },
    Special { name: String, rarity: Rarity },
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Weapon { name, .. }
            | Item::Armor { name, .. }
            | Item::Consumable { name, .. }
            | Item::Special { name, .. } => name,
        }
    }

    pub fn category(&self) -> ItemCategory {
        match self {
            Item::Weapon { .. } => ItemCategory::Weapon,
            Item::Armor { .. } => ItemCategory::Armor,
            Item::Consumable { .. } => ItemCategory::Consumable,
            Item::Special { .. } => ItemCategory::Special,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Item::Weapon { power, .. } => format!("Deals {power} damage"),
            Item::Armor { defense, .. } => format!("Provides {defense} defense"),
            Item::Consumable { effect, power, .. } => format!("{effect} ({power})"),
            Item::Special { rarity, .. } => {
                format!("A valuable treasure with mysterious properties. ({rarity})")
            }
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name(), self.description())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loot {
    pub gold: u32,
    pub items: Vec<Item>,
}

const WEAPONS: [&str; 8] = ["Dagger", "Sword", "Axe", "Mace", "Spear", "Bow", "Staff", "Wand"];
const WEAPON_PREFIXES: [&str; 7] = [
    "", "Sharp ", "Sturdy ", "Precise ", "Balanced ", "Ancient ", "Enchanted ",
];
const ARMORS: [&str; 7] = [
    "Helmet", "Chestplate", "Leggings", "Boots", "Shield", "Gauntlets", "Cloak",
];
const ARMOR_PREFIXES: [&str; 7] = [
    "", "Sturdy ", "Reinforced ", "Protective ", "Heavy ", "Lightweight ", "Enchanted ",
];
const CONSUMABLES: [&str; 7] = [
    "Health Potion", "Mana Potion", "Antidote", "Elixir", "Scroll", "Bomb", "Throwing Knife",
];
const SPECIALS: [&str; 7] = [
    "Ancient Relic", "Magic Orb", "Enchanted Gem", "Mysterious Artifact", "Rare Crystal",
    "Legendary Fragment", "Dungeon Key",
];

fn pick(names: &[&'static str], rng: &mut DungeonRng) -> &'static str {
    rng.choose(names).copied().unwrap_or_default()
}

impl Loot {
    /// Roll the contents of a chest on the given one-based floor level
    pub fn chest(difficulty: DifficultyTier, level: u32, rng: &mut DungeonRng) -> Loot {
        let mult = difficulty.loot_multiplier();
        let floor_mult = 1.0 + level as f64 * 0.1;
        let gold = (rng.range(20, 50) as f64 * mult * floor_mult) as u32;

        let max_items = ((mult + (level / 2) as f64) as i32).min(3);
        let count = rng.range(0, max_items);
        let special_chance = 0.05 * mult * floor_mult;

        let items = (0..count)
            .map(|_| {
                let category = roll_category(special_chance, rng);
                roll_item(category, difficulty, level, rng)
            })
            .collect();

        Loot { gold, items }
    }
}

fn roll_category(special_chance: f64, rng: &mut DungeonRng) -> ItemCategory {
    let roll = rng.unit();
    if roll < special_chance {
        ItemCategory::Special
    } else if roll < 0.3 {
        ItemCategory::Weapon
    } else if roll < 0.6 {
        ItemCategory::Armor
    } else {
        ItemCategory::Consumable
    }
}

/// Roll one item of `category`, scaled by difficulty and floor level
pub fn roll_item(
    category: ItemCategory,
    difficulty: DifficultyTier,
    level: u32,
    rng: &mut DungeonRng,
) -> Item {
    let scale = difficulty.item_scale();
    let lvl = level as f64;
    let prefix = |prefixes: &[&'static str], rng: &mut DungeonRng| {
        let i = (rng.unit() * (level / 2) as f64 * difficulty.prefix_scale()) as usize;
        prefixes[i.min(prefixes.len() - 1)]
    };

    match category {
        ItemCategory::Weapon => {
            let p = prefix(&WEAPON_PREFIXES, rng);
            Item::Weapon {
                name: format!("{p}{}", pick(&WEAPONS, rng)),
                power: (5.0 + lvl * 0.5 * scale) as i32,
            }
        }
        ItemCategory::Armor => {
            let p = prefix(&ARMOR_PREFIXES, rng);
            Item::Armor {
                name: format!("{p}{}", pick(&ARMORS, rng)),
                defense: (3.0 + lvl * 0.3 * scale) as i32,
            }
        }
        ItemCategory::Consumable => {
            let name = pick(&CONSUMABLES, rng);
            let (effect, power) = match name {
                "Health Potion" => ("Restores health", (20.0 + lvl * 5.0 * scale) as i32),
                "Mana Potion" => ("Restores mana", (15.0 + lvl * 4.0 * scale) as i32),
                "Antidote" => ("Cures poison", 1),
                "Elixir" => ("Temporary stat boost", (2.0 + lvl * 0.2 * scale) as i32),
                "Scroll" => ("One-use spell", (10.0 + lvl * 2.0 * scale) as i32),
                _ => ("Deals damage", (15.0 + lvl * 3.0 * scale) as i32),
            };
            Item::Consumable {
                name: name.to_string(),
                effect: effect.to_string(),
                power,
            }
        }
        ItemCategory::Special => Item::Special {
            name: pick(&SPECIALS, rng).to_string(),
            rarity: Rarity::from(difficulty),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn chest_gold_and_item_bounds() {
        let mut rng = DungeonRng::new(44);
        for difficulty in DifficultyTier::iter() {
            for level in 1..=12 {
                let mult = difficulty.loot_multiplier();
                let floor_mult = 1.0 + level as f64 * 0.1;
                let lo = (20.0 * mult * floor_mult) as u32;
                let hi = (50.0 * mult * floor_mult) as u32;
                for _ in 0..20 {
                    let loot = Loot::chest(difficulty, level, &mut rng);
                    assert!((lo..=hi).contains(&loot.gold), "{} not in {lo}..={hi}", loot.gold);
                    assert!(loot.items.len() <= 3);
                }
            }
        }
    }

    #[test]
    fn level_one_easy_never_gets_prefixes() {
        let mut rng = DungeonRng::new(2);
        for _ in 0..30 {
            let item = roll_item(ItemCategory::Weapon, DifficultyTier::Easy, 1, &mut rng);
            assert!(WEAPONS.contains(&item.name()), "{}", item.name());
            assert_eq!(item, Item::Weapon { name: item.name().to_string(), power: 5 });
        }
    }

    #[test]
    fn item_stats_scale() {
        let mut rng = DungeonRng::new(6);
        let armor = roll_item(ItemCategory::Armor, DifficultyTier::Lunatic, 10, &mut rng);
        assert!(matches!(armor, Item::Armor { defense: 9, .. }));
        let special = roll_item(ItemCategory::Special, DifficultyTier::Hard, 3, &mut rng);
        assert_eq!(special.category(), ItemCategory::Special);
        assert!(special.description().contains("Very Rare"));
    }

    #[test]
    fn items_serialize_with_type_tag() {
        let item = Item::Weapon {
            name: "Sword".into(),
            power: 6,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(json, r#"{"type":"weapon","name":"Sword","power":6}"#);
    }
}
