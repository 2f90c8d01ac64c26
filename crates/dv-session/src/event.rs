//! Things that happen to a session without anyone asking

use chrono::{DateTime, Utc};

use dv_core::encounter::EncounterId;
use dv_core::{DungeonId, PlayerId, SessionId};

/// Published on the manager's broadcast channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Created {
        session: SessionId,
        dungeon: DungeonId,
    },
    Loaded {
        session: SessionId,
        dungeon: DungeonId,
    },
    LeaderChanged {
        session: SessionId,
        leader: PlayerId,
    },
    FloorAdvanced {
        session: SessionId,
        floor: usize,
    },
    EncounterExpired {
        session: SessionId,
        player: PlayerId,
        id: EncounterId,
        /// `trap`, `battle` or `boss`
        kind: &'static str,
    },
    PendingEnd {
        session: SessionId,
        until: DateTime<Utc>,
    },
    /// Nobody confirmed the end in time; the session stays open and empty
    PendingEndTimedOut { session: SessionId },
    Ended { session: SessionId },
    Saved {
        session: SessionId,
        dungeon: DungeonId,
    },
    SaveFailed {
        session: SessionId,
        dungeon: DungeonId,
        error: String,
    },
}

impl SessionEvent {
    pub fn session(&self) -> &SessionId {
        match self {
            SessionEvent::Created { session, .. }
            | SessionEvent::Loaded { session, .. }
            | SessionEvent::LeaderChanged { session, .. }
            | SessionEvent::FloorAdvanced { session, .. }
            | SessionEvent::EncounterExpired { session, .. }
            | SessionEvent::PendingEnd { session, .. }
            | SessionEvent::PendingEndTimedOut { session }
            | SessionEvent::Ended { session }
            | SessionEvent::Saved { session, .. }
            | SessionEvent::SaveFailed { session, .. } => session,
        }
    }
}
