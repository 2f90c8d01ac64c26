//! Encounter bookkeeping: who is fighting what, until when

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::battle::{BattleState, TurnOutcome};
use super::bestiary::Enemy;
use super::event::EventOutcome;
use super::loot::Loot;
use super::trap::{TrapCheck, TrapKind, TrapOutcome, TrapState};
use super::{Action, Encounter, EncounterId, EncounterKey, EncounterKind};
use crate::config::EncounterConfig;
use crate::dungeon::DifficultyTier;
use crate::{DungeonRng, PlayerId};

/// Where an encounter happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncounterContext {
    pub difficulty: DifficultyTier,
    /// One-based floor level
    pub level: u32,
}

/// What starting an encounter produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Trigger {
    Trap {
        id: EncounterId,
        trap: TrapKind,
        check: TrapCheck,
        expires_at: DateTime<Utc>,
    },
    /// Regular battle or boss fight, see `enemy.is_boss`
    Battle {
        id: EncounterId,
        enemy: Enemy,
        expires_at: DateTime<Utc>,
    },
    Event(EventOutcome),
    Loot(Loot),
}

impl Trigger {
    /// Encounter id for triggers that leave an active encounter behind
    pub fn encounter_id(&self) -> Option<EncounterId> {
        match self {
            Trigger::Trap { id, .. } | Trigger::Battle { id, .. } => Some(*id),
            Trigger::Event(_) | Trigger::Loot(_) => None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Trap { expires_at, .. } | Trigger::Battle { expires_at, .. } => {
                Some(*expires_at)
            }
            Trigger::Event(_) | Trigger::Loot(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionOutcome {
    /// Nothing active for this player, or it already expired
    NoEncounter,
    Trap(TrapOutcome),
    Battle(TurnOutcome),
    /// The action does not apply to the active encounter
    Ignored(Action),
}

/// Random encounter kinds, in weight order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RandomKind {
    Trap,
    Battle,
    Event,
}

#[derive(Debug, Clone)]
pub struct EncounterEngine {
    config: EncounterConfig,
    active: BTreeMap<EncounterKey, Encounter>,
    cooldowns: BTreeMap<EncounterKey, DateTime<Utc>>,
    next_id: EncounterId,
}

/// `now` plus `secs` seconds, saturating at the latest representable time
pub fn deadline_after(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    Duration::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX))
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl EncounterEngine {
    pub fn new(config: EncounterConfig) -> Self {
        Self {
            config,
            active: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &EncounterConfig {
        &self.config
    }

    pub fn get(&self, key: &EncounterKey) -> Option<&Encounter> {
        self.active.get(key)
    }

    pub fn is_busy(&self, key: &EncounterKey) -> bool {
        self.active.contains_key(key)
    }

    pub fn active(&self) -> impl Iterator<Item = &Encounter> {
        self.active.values()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn on_cooldown(&self, key: &EncounterKey, now: DateTime<Utc>) -> bool {
        self.cooldowns.get(key).is_some_and(|until| now < *until)
    }

    pub fn set_cooldown(&mut self, key: &EncounterKey, now: DateTime<Utc>) {
        self.cooldowns
            .insert(key.clone(), deadline_after(now, self.config.cooldown_secs));
    }

    pub fn set_view_handle(&mut self, key: &EncounterKey, handle: Option<String>) -> bool {
        match self.active.get_mut(key) {
            Some(enc) => {
                enc.view_handle = handle;
                true
            }
            None => false,
        }
    }

    fn begin(
        &mut self,
        key: &EncounterKey,
        kind: EncounterKind,
        ttl_secs: u64,
        now: DateTime<Utc>,
    ) -> (EncounterId, DateTime<Utc>) {
        let id = self.next_id;
        self.next_id += 1;
        let expires_at = deadline_after(now, ttl_secs);
        self.active.insert(
            key.clone(),
            Encounter {
                id,
                key: key.clone(),
                kind,
                created_at: now,
                expires_at,
                view_handle: None,
            },
        );
        (id, expires_at)
    }

    /// Maybe start a random encounter after a plain move
    pub fn roll_random(
        &mut self,
        key: &EncounterKey,
        ctx: EncounterContext,
        now: DateTime<Utc>,
        rng: &mut DungeonRng,
    ) -> Option<Trigger> {
        if self.is_busy(key) || self.on_cooldown(key, now) {
            return None;
        }
        if !rng.chance(self.config.random_move_chance) {
            return None;
        }
        let w = self.config.weights;
        let kinds = [RandomKind::Trap, RandomKind::Battle, RandomKind::Event];
        let kind = kinds[rng.weighted_index(&[w.trap, w.battle, w.event])?];
        self.set_cooldown(key, now);
        debug!(encounter = %key, ?kind, "random encounter");

        Some(match kind {
            RandomKind::Trap => self.start_trap(key, ctx, now, rng),
            RandomKind::Battle => self.start_battle(key, ctx, now, rng),
            RandomKind::Event => self.random_event(rng),
        })
    }

    pub fn start_trap(
        &mut self,
        key: &EncounterKey,
        ctx: EncounterContext,
        now: DateTime<Utc>,
        rng: &mut DungeonRng,
    ) -> Trigger {
        let trap = TrapKind::random(rng);
        let state = TrapState {
            trap,
            difficulty: ctx.difficulty,
        };
        let ttl = self.config.trap_expiry_secs;
        let (id, expires_at) = self.begin(key, EncounterKind::Trap(state), ttl, now);
        Trigger::Trap {
            id,
            trap,
            check: trap.check(ctx.difficulty),
            expires_at,
        }
    }

    pub fn start_battle(
        &mut self,
        key: &EncounterKey,
        ctx: EncounterContext,
        now: DateTime<Utc>,
        rng: &mut DungeonRng,
    ) -> Trigger {
        let enemy = Enemy::spawn(ctx.difficulty, rng);
        let state = BattleState::new(enemy.clone(), vec![key.player.clone()]);
        let ttl = self.config.battle_expiry_secs;
        let (id, expires_at) = self.begin(key, EncounterKind::Battle(state), ttl, now);
        Trigger::Battle {
            id,
            enemy,
            expires_at,
        }
    }

    /// Boss fight held by `key` on behalf of the whole party
    pub fn start_boss(
        &mut self,
        key: &EncounterKey,
        party: Vec<PlayerId>,
        ctx: EncounterContext,
        now: DateTime<Utc>,
        rng: &mut DungeonRng,
    ) -> Trigger {
        let enemy = Enemy::boss(ctx.difficulty, ctx.level, party.len(), rng);
        let state = BattleState::new(enemy.clone(), party);
        let ttl = self.config.battle_expiry_secs;
        let (id, expires_at) = self.begin(key, EncounterKind::Battle(state), ttl, now);
        Trigger::Battle {
            id,
            enemy,
            expires_at,
        }
    }

    /// A chest is trapped with the difficulty's trap chance; otherwise it
    /// holds loot
    pub fn open_chest(
        &mut self,
        key: &EncounterKey,
        ctx: EncounterContext,
        now: DateTime<Utc>,
        rng: &mut DungeonRng,
    ) -> Trigger {
        if rng.chance(ctx.difficulty.trap_chance()) {
            debug!(encounter = %key, "trapped chest");
            return self.start_trap(key, ctx, now, rng);
        }
        Trigger::Loot(Loot::chest(ctx.difficulty, ctx.level, rng))
    }

    pub fn random_event(&self, rng: &mut DungeonRng) -> Trigger {
        Trigger::Event(EventOutcome::random(rng))
    }

    /// Apply a player action to their active encounter
    pub fn act(
        &mut self,
        key: &EncounterKey,
        action: Action,
        now: DateTime<Utc>,
        rng: &mut DungeonRng,
    ) -> ActionOutcome {
        let Some(encounter) = self.active.get_mut(key) else {
            return ActionOutcome::NoEncounter;
        };
        if encounter.is_expired(now) {
            self.active.remove(key);
            return ActionOutcome::NoEncounter;
        }

        let (outcome, finished) = match &mut encounter.kind {
            EncounterKind::Trap(trap) => {
                let out = trap.resolve(&self.config.player, rng);
                (ActionOutcome::Trap(out), true)
            }
            EncounterKind::Battle(_) if action == Action::Roll => {
                (ActionOutcome::Ignored(action), false)
            }
            EncounterKind::Battle(battle) => {
                let out = battle.take_turn(action, &self.config, rng);
                let over = out.is_over();
                (ActionOutcome::Battle(out), over)
            }
        };
        if finished {
            self.active.remove(key);
        }
        outcome
    }

    /// Drop `key`'s encounter if it is still encounter `id` and has expired.
    /// A newer encounter for the same key is left alone.
    pub fn expire(
        &mut self,
        key: &EncounterKey,
        id: EncounterId,
        now: DateTime<Utc>,
    ) -> Option<Encounter> {
        let current = self.active.get(key)?;
        if current.id != id || !current.is_expired(now) {
            return None;
        }
        self.active.remove(key)
    }

    /// Drop every expired encounter
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<Encounter> {
        let expired: Vec<EncounterKey> = self
            .active
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        expired
            .iter()
            .filter_map(|k| self.active.remove(k))
            .collect()
    }

    /// Forget everything about a player who left
    pub fn remove_player(&mut self, key: &EncounterKey) -> Option<Encounter> {
        self.cooldowns.remove(key);
        self.active.remove(key)
    }
}

impl Default for EncounterEngine {
    fn default() -> Self {
        Self::new(EncounterConfig::default())
    }
}
