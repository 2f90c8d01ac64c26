//! Turn-based battles
//!
//! Every action the player takes is answered by an enemy counter-attack,
//! except a finishing blow or a successful escape.

use serde::{Deserialize, Serialize};

use super::Action;
use super::bestiary::Enemy;
use crate::config::EncounterConfig;
use crate::{DungeonRng, PlayerId};

/// Temporary effect on the player, counted in enemy turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusEffect {
    Defending { turns: u32 },
}

/// Dice mode for the enemy's counter-attack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RollMode {
    Normal,
    Advantage,
    Disadvantage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleState {
    pub enemy: Enemy,
    pub enemy_hp: i32,
    pub turn: u32,
    pub effects: Vec<StatusEffect>,
    /// Damage the player has taken so far in this battle
    pub damage_taken: i32,
    /// Everyone who shares the reward
    pub party: Vec<PlayerId>,
}

/// The player's half of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerMove {
    Attack { roll: i32, bonus: i32, hit: bool, damage: i32 },
    Defend,
    /// Skill or item with nothing behind it; the turn is spent
    Fumbled(Action),
    FleeFailed,
}

/// The enemy's counter-attack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyStrike {
    pub roll: i32,
    pub bonus: i32,
    pub defense: i32,
    pub hit: bool,
    pub damage: i32,
    pub effect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub xp: u32,
    pub gold: u32,
    pub drop: Option<String>,
    /// Players the reward is split between
    pub party: Vec<PlayerId>,
    pub boss: bool,
}

impl Reward {
    /// Per-player (xp, gold) when split evenly across the party
    pub fn share(&self) -> (u32, u32) {
        let n = self.party.len().max(1) as u32;
        (self.xp / n, self.gold / n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    Victory { player: PlayerMove, reward: Reward },
    Fled,
    Continued {
        player: PlayerMove,
        counter: EnemyStrike,
        enemy_hp: i32,
    },
}

impl TurnOutcome {
    pub fn is_over(&self) -> bool {
        !matches!(self, TurnOutcome::Continued { .. })
    }
}

impl BattleState {
    pub fn new(enemy: Enemy, party: Vec<PlayerId>) -> Self {
        Self {
            enemy_hp: enemy.max_hp,
            enemy,
            turn: 0,
            effects: Vec::new(),
            damage_taken: 0,
            party,
        }
    }

    pub fn is_defending(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, StatusEffect::Defending { turns } if *turns > 0))
    }

    /// Play one turn. `Roll` is not a battle action; callers filter it out.
    pub fn take_turn(
        &mut self,
        action: Action,
        config: &EncounterConfig,
        rng: &mut DungeonRng,
    ) -> TurnOutcome {
        let profile = &config.player;
        let (player, mode) = match action {
            Action::Attack => {
                let roll = rng.d20();
                let bonus = rng.range(profile.attack_bonus.0, profile.attack_bonus.1);
                let hit = roll + bonus > self.enemy.defense;
                let damage = if hit {
                    rng.range(profile.weapon_damage.0, profile.weapon_damage.1)
                        + rng.range(profile.weapon_bonus.0, profile.weapon_bonus.1)
                } else {
                    0
                };
                self.enemy_hp -= damage;
                let player = PlayerMove::Attack {
                    roll,
                    bonus,
                    hit,
                    damage,
                };
                if self.enemy_hp <= 0 {
                    return TurnOutcome::Victory {
                        player,
                        reward: self.reward(),
                    };
                }
                (player, RollMode::Normal)
            }
            Action::Defend => {
                self.effects.push(StatusEffect::Defending { turns: 1 });
                (PlayerMove::Defend, RollMode::Disadvantage)
            }
            Action::Flee => {
                if rng.chance(config.flee_chance) {
                    return TurnOutcome::Fled;
                }
                (PlayerMove::FleeFailed, RollMode::Advantage)
            }
            Action::Skill | Action::Item | Action::Roll => {
                (PlayerMove::Fumbled(action), RollMode::Normal)
            }
        };

        let counter = self.enemy_attack(config, mode, rng);
        TurnOutcome::Continued {
            player,
            counter,
            enemy_hp: self.enemy_hp,
        }
    }

    fn enemy_attack(
        &mut self,
        config: &EncounterConfig,
        mode: RollMode,
        rng: &mut DungeonRng,
    ) -> EnemyStrike {
        let roll = match mode {
            RollMode::Normal => rng.d20(),
            RollMode::Advantage => rng.d20().max(rng.d20()),
            RollMode::Disadvantage => rng.d20().min(rng.d20()),
        };
        let bonus = self.enemy.attack / 4;
        let defending = self
            .effects
            .iter()
            .filter(|e| matches!(e, StatusEffect::Defending { .. }))
            .count() as i32;
        let defense = config.player.base_defense + config.player.defend_bonus * defending;
        let hit = roll + bonus > defense;
        let (damage, effect) = if hit {
            let damage = rng.range(self.enemy.attack / 2, self.enemy.attack);
            (damage, self.enemy.special.on_hit().map(str::to_string))
        } else {
            (0, None)
        };
        self.damage_taken += damage;

        self.turn += 1;
        self.effects = self
            .effects
            .iter()
            .filter_map(|e| match *e {
                StatusEffect::Defending { turns } if turns > 1 => {
                    Some(StatusEffect::Defending { turns: turns - 1 })
                }
                StatusEffect::Defending { .. } => None,
            })
            .collect();

        EnemyStrike {
            roll,
            bonus,
            defense,
            hit,
            damage,
            effect,
        }
    }

    fn reward(&self) -> Reward {
        Reward {
            xp: self.enemy.xp,
            gold: self.enemy.gold,
            drop: self.enemy.drop.clone(),
            party: self.party.clone(),
            boss: self.enemy.is_boss,
        }
    }
}
