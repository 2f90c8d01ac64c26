//! Results of session operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dungeon::{DungeonParams, Pos};
use crate::dungeon::placement::ElementCounts;
use crate::encounter::{EncounterId, Trigger};
use crate::{DungeonId, PlayerId, SessionId};

/// Something a successful move set off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveEvent {
    /// Fixed or random encounter started, or a chest/event resolved
    Encounter(Trigger),
    /// Standing on the up stairs; a confirm advances the party
    OnStairs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveOutcome {
    Moved { pos: Pos, events: Vec<MoveEvent> },
    /// Wall or edge of the map; nothing changed
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    pub pos: Pos,
    /// The joiner became leader of an empty session
    pub leader: bool,
    /// Joining cancelled a pending end
    pub cancelled_pending_end: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveOutcome {
    pub new_leader: Option<PlayerId>,
    pub dropped_encounter: Option<EncounterId>,
    /// Set when the last player left: the session ends unless someone
    /// cancels or rejoins before this instant
    pub pending_end_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceOutcome {
    /// Zero-based index of the floor the party is now on
    pub floor: usize,
    pub moved: Vec<PlayerId>,
    pub dropped_encounters: Vec<EncounterId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub id: PlayerId,
    pub pos: Pos,
    pub leader: bool,
    /// Label of the player's active encounter, if any
    pub encounter: Option<String>,
}

/// Everything a presentation layer needs to describe a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub session: SessionId,
    pub dungeon: DungeonId,
    pub name: String,
    pub params: DungeonParams,
    /// Zero-based current floor
    pub floor: usize,
    pub floor_count: usize,
    pub leader: Option<PlayerId>,
    pub players: Vec<PlayerStatus>,
    /// Elements still unclaimed on the current floor
    pub remaining: ElementCounts,
    pub revealed_cells: usize,
    pub pending_end: bool,
    pub completed: bool,
}

impl StatusSummary {
    /// `Floor n/m` with a one-based floor number
    pub fn progress(&self) -> String {
        format!("Floor {}/{}", self.floor + 1, self.floor_count)
    }
}
