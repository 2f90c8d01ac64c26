//! Error types reported to callers
//!
//! Validation errors reject malformed input before anything is touched;
//! state conflicts reject a well-formed request that does not fit the
//! session's current state. Neither leaves a partial mutation behind.

use thiserror::Error;

/// Malformed tier, direction or action input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown {kind} tier '{value}'")]
    UnknownTier { kind: &'static str, value: String },

    #[error("unknown direction '{0}'")]
    UnknownDirection(String),

    #[error("unknown battle action '{0}'")]
    UnknownAction(String),

    #[error("unknown command '{0}'")]
    UnknownIntent(String),

    #[error("missing argument for '{0}'")]
    MissingArgument(&'static str),
}

/// Request does not fit the current session state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateConflict {
    #[error("a dungeon is already active for this session")]
    AlreadyActive,

    #[error("no active dungeon for this session")]
    NoActiveSession,

    #[error("player is already in the dungeon")]
    AlreadyJoined,

    #[error("player is not in the dungeon")]
    NotJoined,

    #[error("player is not standing on the stairs")]
    NotOnStairs,

    #[error("this is already the highest floor")]
    AlreadyTopFloor,

    #[error("the session is not waiting for an end confirmation")]
    NotPendingEnd,

    #[error("only the dungeon leader can do that")]
    NotLeader,

    #[error("player must finish the current encounter first")]
    EncounterInProgress,

    #[error("the session has ended")]
    SessionEnded,
}
