//! dv-session: live dungeon sessions
//!
//! [`SessionManager`] keeps one actor task per session key. Everything that
//! touches a session, player requests and timers alike, goes through that
//! actor's mailbox.

mod actor;
mod clock;
pub mod config;
mod error;
mod event;
mod intent;
mod manager;
mod persist;

pub use actor::{ConfirmOutcome, View};
pub use clock::Clock;
pub use config::{ConfigError, discover_config, load_config};
pub use error::SessionError;
pub use event::SessionEvent;
pub use intent::{Intent, Reply};
pub use manager::SessionManager;
pub use persist::{SAVE_ATTEMPTS, save_with_retry};
