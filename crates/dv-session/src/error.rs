//! Session error types

use dv_core::{SessionId, StateConflict, ValidationError};
use dv_render::RenderError;
use dv_save::SaveError;

use crate::config::ConfigError;

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Conflict(#[from] StateConflict),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Snapshot error: {0}")]
    Save(#[from] SaveError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The session's task stopped before answering
    #[error("Session {0} is no longer running")]
    ActorGone(SessionId),
}

impl SessionError {
    /// The state conflict behind this error, if that is what it is
    pub fn conflict(&self) -> Option<StateConflict> {
        match self {
            SessionError::Conflict(c) => Some(*c),
            _ => None,
        }
    }
}
