//! Wall-clock time that follows the tokio clock
//!
//! Encounter deadlines are wall-clock timestamps, but timers run on tokio's
//! clock. Deriving `now` from a fixed anchor plus tokio's elapsed time keeps
//! the two in step, including when the tokio clock is paused in tests.

use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor: DateTime<Utc>,
    started: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self::anchored(Utc::now())
    }

    pub fn anchored(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            started: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.started.elapsed()).unwrap_or(Duration::zero());
        self.anchor + elapsed
    }

    /// Time left until `deadline`, zero if it has passed
    pub fn until(&self, deadline: DateTime<Utc>) -> std::time::Duration {
        (deadline - self.now()).to_std().unwrap_or_default()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
