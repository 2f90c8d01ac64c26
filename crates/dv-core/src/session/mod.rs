//! Per-session state machine
//!
//! A [`Session`] owns one dungeon, the encounters of its players and the
//! pending-end bookkeeping. It is driven synchronously: every call runs to
//! completion and either applies its whole change or returns an error having
//! changed nothing. Scheduling, timers and persistence live outside.

mod outcome;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{DelveConfig, FogConfig, SessionConfig};
use crate::dungeon::placement::ElementCounts;
use crate::dungeon::{CellKind, Direction, Dungeon, Pos};
use crate::encounter::{
    Action, ActionOutcome, Encounter, EncounterContext, EncounterEngine, EncounterId,
    EncounterKey, EncounterKind, TurnOutcome, deadline_after,
};
use crate::{DungeonRng, PlayerId, SessionId, StateConflict};

pub use outcome::{
    AdvanceOutcome, JoinOutcome, LeaveOutcome, MoveEvent, MoveOutcome, PlayerStatus,
    StatusSummary,
};

/// Lifecycle of a session once it exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    /// Everyone left; waiting for a confirm or cancel
    PendingEnd { deadline: DateTime<Utc> },
    Ended,
}

#[derive(Debug, Clone)]
pub struct Session {
    key: SessionId,
    dungeon: Dungeon,
    encounters: EncounterEngine,
    fog: FogConfig,
    settings: SessionConfig,
    phase: Phase,
    rng: DungeonRng,
}

impl Session {
    /// Wrap a dungeon without touching its players
    pub fn new(key: SessionId, dungeon: Dungeon, config: &DelveConfig, rng: DungeonRng) -> Self {
        Self {
            key,
            dungeon,
            encounters: EncounterEngine::new(config.encounters),
            fog: config.fog,
            settings: config.session,
            phase: Phase::Active,
            rng,
        }
    }

    /// Start a fresh dungeon with `creator` as leader on the current floor start
    pub fn create(
        key: SessionId,
        mut dungeon: Dungeon,
        creator: PlayerId,
        config: &DelveConfig,
        rng: DungeonRng,
    ) -> Self {
        dungeon.creator = Some(creator.clone());
        dungeon.leader = Some(creator.clone());
        let mut session = Self::new(key, dungeon, config, rng);
        session.place(creator);
        info!(session = %session.key, dungeon = %session.dungeon.id, "session created");
        session
    }

    /// Resume a saved dungeon. Derived data is rebuilt and the presentation
    /// handle dropped.
    pub fn restore(key: SessionId, mut dungeon: Dungeon, config: &DelveConfig, rng: DungeonRng) -> Self {
        dungeon.reindex();
        dungeon.view_handle = None;
        info!(session = %key, dungeon = %dungeon.id, floor = dungeon.current_floor, "session restored");
        Self::new(key, dungeon, config, rng)
    }

    pub fn key(&self) -> &SessionId {
        &self.key
    }

    pub fn dungeon(&self) -> &Dungeon {
        &self.dungeon
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn fog_radius(&self) -> usize {
        if self.fog.enabled {
            self.fog.radius
        } else {
            self.dungeon
                .current()
                .map(|f| f.width.max(f.height))
                .unwrap_or_default()
        }
    }

    pub fn encounters(&self) -> &EncounterEngine {
        &self.encounters
    }

    pub fn encounter_of(&self, player: &PlayerId) -> Option<&Encounter> {
        self.encounters.get(&self.encounter_key(player))
    }

    pub fn set_view_handle(&mut self, handle: Option<String>) {
        self.dungeon.view_handle = handle;
    }

    /// Attach a presentation handle to the player's active encounter
    pub fn set_encounter_view(&mut self, player: &PlayerId, handle: Option<String>) -> bool {
        let key = self.encounter_key(player);
        self.encounters.set_view_handle(&key, handle)
    }

    fn encounter_key(&self, player: &PlayerId) -> EncounterKey {
        EncounterKey::new(self.key.clone(), player.clone())
    }

    fn context(&self) -> EncounterContext {
        EncounterContext {
            difficulty: self.dungeon.params.difficulty,
            level: self.dungeon.level(),
        }
    }

    fn ensure_live(&self) -> Result<(), StateConflict> {
        match self.phase {
            Phase::Ended => Err(StateConflict::SessionEnded),
            _ => Ok(()),
        }
    }

    fn ensure_joined(&self, player: &PlayerId) -> Result<Pos, StateConflict> {
        self.ensure_live()?;
        self.dungeon
            .position_of(player)
            .ok_or(StateConflict::NotJoined)
    }

    /// Put a player on the current floor's start and reveal around them
    fn place(&mut self, player: PlayerId) -> Pos {
        let radius = self.fog_radius();
        let Some(floor) = self.dungeon.current_mut() else {
            return Pos::new(0, 0);
        };
        let start = floor.start;
        floor.players.insert(player, start);
        floor.reveal_around(start, radius);
        start
    }

    pub fn join(&mut self, player: PlayerId) -> Result<JoinOutcome, StateConflict> {
        self.ensure_live()?;
        if self.dungeon.has_player(&player) {
            return Err(StateConflict::AlreadyJoined);
        }
        let cancelled_pending_end = matches!(self.phase, Phase::PendingEnd { .. });
        self.phase = Phase::Active;

        let leader = self.dungeon.leader.is_none();
        if leader {
            self.dungeon.leader = Some(player.clone());
        }
        info!(session = %self.key, player = %player, "player joined");
        let pos = self.place(player);
        Ok(JoinOutcome {
            pos,
            leader,
            cancelled_pending_end,
        })
    }

    /// Remove a player. Leadership passes to the lowest remaining id; the
    /// last one out puts the session into pending end.
    pub fn leave(&mut self, player: &PlayerId, now: DateTime<Utc>) -> Result<LeaveOutcome, StateConflict> {
        self.ensure_joined(player)?;
        let key = self.encounter_key(player);
        let dropped_encounter = self.encounters.remove_player(&key).map(|e| e.id);

        let remaining = match self.dungeon.current_mut() {
            Some(floor) => {
                floor.players.remove(player);
                floor.players.keys().next().cloned()
            }
            None => None,
        };

        let mut new_leader = None;
        if self.dungeon.leader.as_ref() == Some(player) {
            self.dungeon.leader = remaining.clone();
            new_leader = remaining.clone();
        }

        let pending_end_until = if remaining.is_none() {
            let deadline = deadline_after(now, self.settings.pending_end_timeout_secs);
            self.phase = Phase::PendingEnd { deadline };
            self.dungeon.leader = None;
            Some(deadline)
        } else {
            None
        };

        info!(
            session = %self.key,
            player = %player,
            new_leader = ?new_leader,
            empty = pending_end_until.is_some(),
            "player left"
        );
        Ok(LeaveOutcome {
            new_leader,
            dropped_encounter,
            pending_end_until,
        })
    }

    pub fn confirm_end(&mut self) -> Result<(), StateConflict> {
        match self.phase {
            Phase::PendingEnd { .. } => {
                self.phase = Phase::Ended;
                info!(session = %self.key, "session ended after everyone left");
                Ok(())
            }
            Phase::Ended => Err(StateConflict::SessionEnded),
            Phase::Active => Err(StateConflict::NotPendingEnd),
        }
    }

    pub fn cancel_end(&mut self) -> Result<(), StateConflict> {
        match self.phase {
            Phase::PendingEnd { .. } => {
                self.phase = Phase::Active;
                Ok(())
            }
            Phase::Ended => Err(StateConflict::SessionEnded),
            Phase::Active => Err(StateConflict::NotPendingEnd),
        }
    }

    /// Pending end timed out: stay active with no players. Returns whether
    /// anything changed.
    pub fn end_timeout(&mut self, now: DateTime<Utc>) -> bool {
        match self.phase {
            Phase::PendingEnd { deadline } if now >= deadline => {
                self.phase = Phase::Active;
                debug!(session = %self.key, "pending end timed out");
                true
            }
            _ => false,
        }
    }

    /// Leader ends the session outright
    pub fn end(&mut self, player: &PlayerId) -> Result<(), StateConflict> {
        self.ensure_live()?;
        if self.dungeon.leader.as_ref() != Some(player) {
            return Err(StateConflict::NotLeader);
        }
        self.phase = Phase::Ended;
        info!(session = %self.key, player = %player, "session ended by leader");
        Ok(())
    }

    pub fn move_player(
        &mut self,
        player: &PlayerId,
        dir: Direction,
        now: DateTime<Utc>,
    ) -> Result<MoveOutcome, StateConflict> {
        let from = self.ensure_joined(player)?;
        let key = self.encounter_key(player);
        if self.encounters.is_busy(&key) {
            return Err(StateConflict::EncounterInProgress);
        }

        let radius = self.fog_radius();
        let Some(floor) = self.dungeon.current_mut() else {
            return Err(StateConflict::NoActiveSession);
        };
        let Some(to) = floor.neighbor(from, dir).filter(|p| floor.is_open(*p)) else {
            return Ok(MoveOutcome::Blocked);
        };
        floor.players.insert(player.clone(), to);
        floor.reveal_players(radius);

        let kind = floor.consume(to).unwrap_or_else(|| floor.cell(to));
        let ctx = self.context();
        let mut events = Vec::new();
        let fixed = match kind {
            CellKind::Chest => Some(self.encounters.open_chest(&key, ctx, now, &mut self.rng)),
            CellKind::Trap => Some(self.encounters.start_trap(&key, ctx, now, &mut self.rng)),
            CellKind::Enemy => Some(self.encounters.start_battle(&key, ctx, now, &mut self.rng)),
            CellKind::End if !self.dungeon.completed && !self.boss_active() => {
                let party = self.dungeon.players();
                Some(self.encounters.start_boss(&key, party, ctx, now, &mut self.rng))
            }
            CellKind::StairsUp => {
                events.push(MoveEvent::OnStairs);
                None
            }
            _ => None,
        };

        let trigger = match fixed {
            Some(t) => Some(t),
            None if events.is_empty() && kind != CellKind::End => {
                self.encounters.roll_random(&key, ctx, now, &mut self.rng)
            }
            None => None,
        };
        if let Some(t) = trigger {
            debug!(session = %self.key, player = %player, ?kind, "encounter triggered");
            events.push(MoveEvent::Encounter(t));
        }

        Ok(MoveOutcome::Moved { pos: to, events })
    }

    fn boss_active(&self) -> bool {
        self.encounters
            .active()
            .any(|e| matches!(&e.kind, EncounterKind::Battle(b) if b.enemy.is_boss))
    }

    /// Take the whole party up the stairs `player` is standing on
    pub fn advance_floor(&mut self, player: &PlayerId) -> Result<AdvanceOutcome, StateConflict> {
        let pos = self.ensure_joined(player)?;
        if self.dungeon.is_final_floor() {
            return Err(StateConflict::AlreadyTopFloor);
        }
        let on_stairs = self
            .dungeon
            .current()
            .is_some_and(|f| f.cell(pos) == CellKind::StairsUp);
        if !on_stairs {
            return Err(StateConflict::NotOnStairs);
        }

        let radius = self.fog_radius();
        let next = self.dungeon.current_floor + 1;
        let party = match self.dungeon.current_mut() {
            Some(floor) => std::mem::take(&mut floor.players),
            None => Default::default(),
        };
        let dropped_encounters = party
            .keys()
            .filter_map(|p| {
                let key = EncounterKey::new(self.key.clone(), p.clone());
                self.encounters.remove_player(&key).map(|e| e.id)
            })
            .collect();

        self.dungeon.current_floor = next;
        let moved: Vec<PlayerId> = party.into_keys().collect();
        if let Some(floor) = self.dungeon.current_mut() {
            let start = floor.start;
            for p in &moved {
                floor.players.insert(p.clone(), start);
            }
            floor.reveal_around(start, radius);
        }

        info!(session = %self.key, floor = next, players = moved.len(), "party advanced");
        Ok(AdvanceOutcome {
            floor: next,
            moved,
            dropped_encounters,
        })
    }

    /// Apply an action to the player's active encounter
    pub fn act(
        &mut self,
        player: &PlayerId,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, StateConflict> {
        self.ensure_joined(player)?;
        let key = self.encounter_key(player);
        let outcome = self.encounters.act(&key, action, now, &mut self.rng);
        if let ActionOutcome::Battle(TurnOutcome::Victory { reward, .. }) = &outcome {
            if reward.boss && self.dungeon.is_final_floor() {
                self.dungeon.completed = true;
                info!(session = %self.key, dungeon = %self.dungeon.id, "dungeon completed");
            }
        }
        Ok(outcome)
    }

    /// Expire one specific encounter if it is still current and overdue
    pub fn expire(&mut self, player: &PlayerId, id: EncounterId, now: DateTime<Utc>) -> Option<Encounter> {
        let key = self.encounter_key(player);
        self.encounters.expire(&key, id, now)
    }

    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<Encounter> {
        self.encounters.sweep(now)
    }

    pub fn status(&self) -> StatusSummary {
        let d = &self.dungeon;
        let players = d
            .current()
            .map(|f| {
                f.players
                    .iter()
                    .map(|(id, pos)| PlayerStatus {
                        id: id.clone(),
                        pos: *pos,
                        leader: d.leader.as_ref() == Some(id),
                        encounter: self
                            .encounter_of(id)
                            .map(|e| e.kind.label().to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        StatusSummary {
            session: self.key.clone(),
            dungeon: d.id.clone(),
            name: d.name.clone(),
            params: d.params,
            floor: d.current_floor,
            floor_count: d.floor_count(),
            leader: d.leader.clone(),
            players,
            remaining: d.current().map(ElementCounts::remaining).unwrap_or_default(),
            revealed_cells: d.current().map(|f| f.revealed_count()).unwrap_or_default(),
            pending_end: matches!(self.phase, Phase::PendingEnd { .. }),
            completed: d.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::{
        ComplexityTier, DifficultyTier, DungeonGenerator, DungeonParams, FloorCountTier, SizeTier,
    };
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 2, 10, 0, 0).unwrap()
    }

    fn quiet_config() -> DelveConfig {
        let mut config = DelveConfig::default();
        config.encounters.random_move_chance = 0.0;
        config
    }

    fn session(floors: FloorCountTier) -> Session {
        let params = DungeonParams::new(SizeTier::Small, ComplexityTier::Easy, floors, DifficultyTier::Easy);
        let dungeon = DungeonGenerator::with_seed(10).generate_at(params, None, t0());
        Session::create(
            SessionId::from("chan"),
            dungeon,
            PlayerId::from("1"),
            &quiet_config(),
            DungeonRng::new(10),
        )
    }

    fn p(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    #[test]
    fn creator_leads_from_the_start() {
        let s = session(FloorCountTier::Small);
        let d = s.dungeon();
        assert_eq!(d.leader, Some(p("1")));
        assert_eq!(d.creator, Some(p("1")));
        let start = d.current().unwrap().start;
        assert_eq!(d.position_of(&p("1")), Some(start));
        assert!(d.current().unwrap().is_revealed(start));
    }

    #[test]
    fn join_twice_conflicts() {
        let mut s = session(FloorCountTier::Small);
        assert!(s.join(p("2")).is_ok());
        assert_eq!(s.join(p("2")), Err(StateConflict::AlreadyJoined));
        assert_eq!(s.join(p("1")), Err(StateConflict::AlreadyJoined));
    }

    #[test]
    fn leadership_goes_to_lowest_id() {
        let mut s = session(FloorCountTier::Small);
        s.join(p("3")).unwrap();
        s.join(p("2")).unwrap();
        let out = s.leave(&p("1"), t0()).unwrap();
        assert_eq!(out.new_leader, Some(p("2")));
        assert_eq!(s.dungeon().leader, Some(p("2")));
        let out = s.leave(&p("3"), t0()).unwrap();
        assert_eq!(out.new_leader, None);
        assert_eq!(s.dungeon().leader, Some(p("2")));
    }

    #[test]
    fn last_leave_starts_pending_end() {
        let mut s = session(FloorCountTier::Small);
        let out = s.leave(&p("1"), t0()).unwrap();
        let deadline = out.pending_end_until.unwrap();
        assert_eq!(deadline, t0() + Duration::seconds(60));
        assert!(matches!(s.phase(), Phase::PendingEnd { .. }));

        assert!(!s.end_timeout(t0() + Duration::seconds(59)));
        assert!(s.end_timeout(deadline));
        assert_eq!(s.phase(), Phase::Active);
        assert_eq!(s.cancel_end(), Err(StateConflict::NotPendingEnd));

        let joined = s.join(p("9")).unwrap();
        assert!(joined.leader);
    }

    #[test]
    fn unbounded_pending_end_timeout() {
        let params = DungeonParams::default();
        let dungeon = DungeonGenerator::with_seed(3).generate_at(params, None, t0());
        let mut config = quiet_config();
        config.session.pending_end_timeout_secs = u64::MAX;
        let mut s = Session::create(SessionId::from("chan"), dungeon, p("1"), &config, DungeonRng::new(3));
        let out = s.leave(&p("1"), t0()).unwrap();
        assert_eq!(out.pending_end_until, Some(DateTime::<Utc>::MAX_UTC));
        assert!(!s.end_timeout(t0() + Duration::days(365)));
    }

    #[test]
    fn confirm_and_cancel_end() {
        let mut s = session(FloorCountTier::Small);
        s.leave(&p("1"), t0()).unwrap();
        s.cancel_end().unwrap();
        assert_eq!(s.phase(), Phase::Active);

        s.join(p("1")).unwrap();
        s.leave(&p("1"), t0()).unwrap();
        s.confirm_end().unwrap();
        assert_eq!(s.phase(), Phase::Ended);
        assert_eq!(s.join(p("1")), Err(StateConflict::SessionEnded));
    }

    #[test]
    fn join_cancels_pending_end() {
        let mut s = session(FloorCountTier::Small);
        s.leave(&p("1"), t0()).unwrap();
        let out = s.join(p("4")).unwrap();
        assert!(out.cancelled_pending_end);
        assert_eq!(s.phase(), Phase::Active);
    }

    #[test]
    fn only_the_leader_ends() {
        let mut s = session(FloorCountTier::Small);
        s.join(p("2")).unwrap();
        assert_eq!(s.end(&p("2")), Err(StateConflict::NotLeader));
        s.end(&p("1")).unwrap();
        assert_eq!(s.phase(), Phase::Ended);
    }

    #[test]
    fn walls_block_without_change() {
        let mut s = session(FloorCountTier::Small);
        // Row 0 is border wall, so anything open on row 1 is blocked upwards
        let floor = s.dungeon().current().unwrap();
        let edge = floor.open_cells().find(|c| c.row == 1).unwrap();
        s.dungeon.current_mut().unwrap().players.insert(p("1"), edge);
        let before = s.dungeon().clone();
        assert_eq!(s.move_player(&p("1"), Direction::Up, t0()), Ok(MoveOutcome::Blocked));
        assert_eq!(s.dungeon(), &before);
    }

    #[test]
    fn not_joined_cannot_move() {
        let mut s = session(FloorCountTier::Small);
        assert_eq!(
            s.move_player(&p("x"), Direction::Up, t0()),
            Err(StateConflict::NotJoined)
        );
    }

    #[test]
    fn advance_requires_stairs() {
        let mut s = session(FloorCountTier::Medium);
        assert_eq!(s.advance_floor(&p("1")), Err(StateConflict::NotOnStairs));
    }

    #[test]
    fn party_advances_together() {
        let mut s = session(FloorCountTier::Medium);
        s.join(p("2")).unwrap();
        let stairs = s.dungeon().current().unwrap().terminal;
        // Stand player 1 on the stairs directly
        if let Some(floor) = s.dungeon.current_mut() {
            floor.players.insert(p("1"), stairs);
        }
        let out = s.advance_floor(&p("1")).unwrap();
        assert_eq!(out.floor, 1);
        assert_eq!(out.moved, vec![p("1"), p("2")]);
        let floor = s.dungeon().current().unwrap();
        assert_eq!(floor.players.get(&p("2")), Some(&floor.start));
        assert!(s.dungeon().floors[0].players.is_empty());
    }

    #[test]
    fn top_floor_cannot_advance() {
        let mut s = session(FloorCountTier::Small);
        let last = s.dungeon().floor_count() - 1;
        s.dungeon.current_floor = last;
        let start = s.dungeon().current().unwrap().start;
        if let Some(floor) = s.dungeon.current_mut() {
            floor.players.insert(p("1"), start);
        }
        assert_eq!(s.advance_floor(&p("1")), Err(StateConflict::AlreadyTopFloor));
    }

    #[test]
    fn status_reports_players_and_progress() {
        let mut s = session(FloorCountTier::Small);
        s.join(p("2")).unwrap();
        let status = s.status();
        assert_eq!(status.players.len(), 2);
        assert!(status.players[0].leader);
        assert_eq!(status.floor, 0);
        assert!(status.progress().starts_with("Floor 1/"));
        assert!(!status.pending_end);
    }
}
