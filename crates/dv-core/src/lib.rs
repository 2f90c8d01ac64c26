//! dv-core: Core logic for delve dungeons
//!
//! This crate contains the maze generator, the encounter engine and the
//! per-session state machine. It performs no I/O: persistence, rendering and
//! scheduling live in the sibling crates.

pub mod config;
pub mod dungeon;
pub mod encounter;
pub mod session;

mod consts;
mod error;
mod ids;
mod rng;

pub use consts::*;
pub use error::{StateConflict, ValidationError};
pub use ids::{DungeonId, PlayerId, SessionId};
pub use rng::DungeonRng;
