//! Intents in, replies out

use core::str::FromStr;

use dv_core::dungeon::{Direction, DungeonParams};
use dv_core::encounter::{Action, ActionOutcome};
use dv_core::session::{AdvanceOutcome, JoinOutcome, LeaveOutcome, MoveOutcome, StatusSummary};
use dv_core::{DungeonId, ValidationError};
use dv_save::SaveHeader;

/// What a player asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Create {
        params: DungeonParams,
        name: Option<String>,
    },
    Join,
    Leave,
    Move(Direction),
    /// End a pending session, or take the stairs
    Confirm,
    Cancel,
    End,
    Save,
    Load(DungeonId),
    ListSaved,
    Act(Action),
    Status,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Created {
        id: DungeonId,
        name: String,
        floors: usize,
    },
    Joined(JoinOutcome),
    Left(LeaveOutcome),
    Moved(MoveOutcome),
    Advanced(AdvanceOutcome),
    Ended,
    EndCancelled,
    Saved(SaveHeader),
    Loaded(StatusSummary),
    Saves(Vec<SaveHeader>),
    Acted(ActionOutcome),
    Status(StatusSummary),
}

/// Parses lines like `create small hard large easy Crypt`, `move up`,
/// `north`, `attack`, `load dungeon_20240101120000_0042`.
impl FromStr for Intent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(ValidationError::UnknownIntent(String::new()));
        };
        let intent = match verb.to_ascii_lowercase().as_str() {
            "create" | "new" => {
                let params = DungeonParams::parse(words.by_ref().take(4))?;
                let rest: Vec<&str> = words.collect();
                let name = (!rest.is_empty()).then(|| rest.join(" "));
                Intent::Create { params, name }
            }
            "join" => Intent::Join,
            "leave" | "quit" => Intent::Leave,
            "move" | "go" => {
                let dir = words.next().ok_or(ValidationError::MissingArgument("move"))?;
                Intent::Move(dir.parse()?)
            }
            "confirm" | "yes" | "climb" => Intent::Confirm,
            "cancel" | "no" => Intent::Cancel,
            "end" => Intent::End,
            "save" => Intent::Save,
            "load" => {
                let id = words.next().ok_or(ValidationError::MissingArgument("load"))?;
                Intent::Load(DungeonId::new(id))
            }
            "saves" | "list" => Intent::ListSaved,
            "status" | "info" => Intent::Status,
            other => {
                if let Ok(dir) = other.parse::<Direction>() {
                    Intent::Move(dir)
                } else if let Ok(action) = other.parse::<Action>() {
                    Intent::Act(action)
                } else {
                    return Err(ValidationError::UnknownIntent(verb.to_string()));
                }
            }
        };
        Ok(intent)
    }
}
