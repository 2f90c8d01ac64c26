//! One task per session key
//!
//! The actor owns its [`Session`] outright. Foreground requests and timer
//! firings arrive through the same mailbox, so they never interleave.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use dv_core::dungeon::{Direction, Dungeon};
use dv_core::encounter::{Action, ActionOutcome, EncounterId};
use dv_core::session::{
    AdvanceOutcome, JoinOutcome, LeaveOutcome, MoveEvent, MoveOutcome, Phase, Session,
    StatusSummary,
};
use dv_core::{PlayerId, SessionId};
use dv_save::{SaveHeader, SnapshotStore};

use crate::clock::Clock;
use crate::error::SessionError;
use crate::event::SessionEvent;
use crate::persist;

const MAILBOX: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// What a `Confirm` turned out to mean
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Ended,
    Advanced(AdvanceOutcome),
}

/// Read-only copy of what a renderer needs
#[derive(Debug, Clone)]
pub struct View {
    pub dungeon: Dungeon,
    pub radius: usize,
}

pub(crate) enum Command {
    Join {
        player: PlayerId,
        reply: Reply<JoinOutcome>,
    },
    Leave {
        player: PlayerId,
        reply: Reply<LeaveOutcome>,
    },
    Move {
        player: PlayerId,
        dir: Direction,
        reply: Reply<MoveOutcome>,
    },
    Advance {
        player: PlayerId,
        reply: Reply<AdvanceOutcome>,
    },
    Confirm {
        player: PlayerId,
        reply: Reply<ConfirmOutcome>,
    },
    ConfirmEnd {
        reply: Reply<()>,
    },
    CancelEnd {
        reply: Reply<()>,
    },
    End {
        player: PlayerId,
        reply: Reply<()>,
    },
    Act {
        player: PlayerId,
        action: Action,
        reply: Reply<ActionOutcome>,
    },
    Status {
        reply: Reply<StatusSummary>,
    },
    View {
        reply: Reply<View>,
    },
    SetViewHandle {
        handle: Option<String>,
        reply: Reply<()>,
    },
    SetEncounterHandle {
        player: PlayerId,
        handle: Option<String>,
        reply: Reply<bool>,
    },
    Save {
        reply: Reply<SaveHeader>,
    },
    AutoSave {
        reply: Reply<SaveHeader>,
    },
    ExpireEncounter {
        player: PlayerId,
        id: EncounterId,
    },
    PendingEndTimeout,
}

/// Cheap handle the manager keeps per session
#[derive(Debug, Clone)]
pub(crate) struct ActorHandle {
    key: SessionId,
    tx: mpsc::Sender<Command>,
}

impl ActorHandle {
    pub(crate) async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| SessionError::ActorGone(self.key.clone()))?;
        rx.await
            .map_err(|_| SessionError::ActorGone(self.key.clone()))?
    }
}

pub(crate) struct SessionActor {
    session: Session,
    store: Arc<dyn SnapshotStore>,
    events: broadcast::Sender<SessionEvent>,
    clock: Clock,
    auto_persist: bool,
    mailbox: mpsc::Receiver<Command>,
    /// Timers hold this so a dropped manager handle still stops the actor
    weak: mpsc::WeakSender<Command>,
}

/// Spawn the task for `session` and return its handle
pub(crate) fn spawn(
    session: Session,
    store: Arc<dyn SnapshotStore>,
    events: broadcast::Sender<SessionEvent>,
    clock: Clock,
    auto_persist: bool,
) -> ActorHandle {
    let (tx, mailbox) = mpsc::channel(MAILBOX);
    let key = session.key().clone();
    let actor = SessionActor {
        session,
        store,
        events,
        clock,
        auto_persist,
        mailbox,
        weak: tx.downgrade(),
    };
    tokio::spawn(actor.run());
    ActorHandle { key, tx }
}

impl SessionActor {
    async fn run(mut self) {
        debug!(session = %self.session.key(), "session actor started");
        while let Some(cmd) = self.mailbox.recv().await {
            if self.handle(cmd).await {
                break;
            }
        }
        debug!(session = %self.session.key(), "session actor stopped");
    }

    fn key(&self) -> SessionId {
        self.session.key().clone()
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Returns true when the actor should stop
    async fn handle(&mut self, cmd: Command) -> bool {
        let now = self.clock.now();
        match cmd {
            Command::Join { player, reply } => {
                let result = self.session.join(player.clone());
                if let Ok(outcome) = &result {
                    if outcome.leader {
                        self.publish(SessionEvent::LeaderChanged {
                            session: self.key(),
                            leader: player,
                        });
                    }
                }
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::Leave { player, reply } => {
                let result = self.session.leave(&player, now);
                if let Ok(outcome) = &result {
                    self.after_leave(outcome).await;
                }
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::Move { player, dir, reply } => {
                let result = self.session.move_player(&player, dir, now);
                if let Ok(MoveOutcome::Moved { events, .. }) = &result {
                    for event in events {
                        if let MoveEvent::Encounter(trigger) = event {
                            if let (Some(id), Some(at)) =
                                (trigger.encounter_id(), trigger.expires_at())
                            {
                                self.schedule_expiry(player.clone(), id, at);
                            }
                        }
                    }
                }
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::Advance { player, reply } => {
                let result = self.advance(&player);
                let _ = reply.send(result);
            }
            Command::Confirm { player, reply } => {
                if matches!(self.session.phase(), Phase::PendingEnd { .. }) {
                    let result = self.session.confirm_end();
                    let stop = result.is_ok();
                    if stop {
                        self.finish();
                    }
                    let _ = reply.send(result.map(|()| ConfirmOutcome::Ended).map_err(Into::into));
                    return stop;
                }
                let result = self.advance(&player).map(ConfirmOutcome::Advanced);
                let _ = reply.send(result);
            }
            Command::ConfirmEnd { reply } => {
                let result = self.session.confirm_end();
                let stop = result.is_ok();
                if stop {
                    self.finish();
                }
                let _ = reply.send(result.map_err(Into::into));
                return stop;
            }
            Command::CancelEnd { reply } => {
                let result = self.session.cancel_end();
                if result.is_ok() {
                    info!(session = %self.key(), "pending end cancelled");
                }
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::End { player, reply } => {
                if let Err(e) = self.session.end(&player) {
                    let _ = reply.send(Err(e.into()));
                    return false;
                }
                if self.auto_persist {
                    self.save().await.ok();
                }
                self.finish();
                let _ = reply.send(Ok(()));
                return true;
            }
            Command::Act {
                player,
                action,
                reply,
            } => {
                let result = self.session.act(&player, action, now);
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::Status { reply } => {
                let _ = reply.send(Ok(self.session.status()));
            }
            Command::View { reply } => {
                let _ = reply.send(Ok(View {
                    dungeon: self.session.dungeon().clone(),
                    radius: self.session.fog_radius(),
                }));
            }
            Command::SetViewHandle { handle, reply } => {
                self.session.set_view_handle(handle);
                let _ = reply.send(Ok(()));
            }
            Command::SetEncounterHandle {
                player,
                handle,
                reply,
            } => {
                let _ = reply.send(Ok(self.session.set_encounter_view(&player, handle)));
            }
            Command::Save { reply } => {
                let _ = reply.send(self.save().await);
            }
            Command::AutoSave { reply } => {
                debug!(session = %self.key(), "auto-save");
                let _ = reply.send(self.save().await);
            }
            Command::ExpireEncounter { player, id } => {
                if let Some(expired) = self.session.expire(&player, id, now) {
                    info!(session = %self.key(), player = %player, id, "encounter expired");
                    self.publish(SessionEvent::EncounterExpired {
                        session: self.key(),
                        player,
                        id,
                        kind: expired.kind.label(),
                    });
                }
            }
            Command::PendingEndTimeout => {
                if self.session.end_timeout(now) {
                    info!(session = %self.key(), "pending end timed out");
                    self.publish(SessionEvent::PendingEndTimedOut {
                        session: self.key(),
                    });
                }
            }
        }
        false
    }

    fn advance(&mut self, player: &PlayerId) -> Result<AdvanceOutcome, SessionError> {
        let outcome = self.session.advance_floor(player)?;
        self.publish(SessionEvent::FloorAdvanced {
            session: self.key(),
            floor: outcome.floor,
        });
        Ok(outcome)
    }

    async fn after_leave(&mut self, outcome: &LeaveOutcome) {
        if let Some(leader) = &outcome.new_leader {
            self.publish(SessionEvent::LeaderChanged {
                session: self.key(),
                leader: leader.clone(),
            });
        }
        let Some(until) = outcome.pending_end_until else {
            return;
        };
        if self.auto_persist {
            // A failure is already reported on the event channel
            self.save().await.ok();
        }
        self.publish(SessionEvent::PendingEnd {
            session: self.key(),
            until,
        });
        let delay = self.clock.until(until);
        self.schedule(delay, Command::PendingEndTimeout);
    }

    fn finish(&self) {
        debug!(session = %self.key(), dungeon = %self.session.dungeon().id, "closing session actor");
        self.publish(SessionEvent::Ended {
            session: self.key(),
        });
    }

    async fn save(&mut self) -> Result<SaveHeader, SessionError> {
        let dungeon = self.session.dungeon().clone();
        let id = dungeon.id.clone();
        match persist::save_with_retry(Arc::clone(&self.store), dungeon).await {
            Ok(header) => {
                info!(session = %self.key(), dungeon = %id, "dungeon saved");
                self.publish(SessionEvent::Saved {
                    session: self.key(),
                    dungeon: id,
                });
                Ok(header)
            }
            Err(e) => {
                self.publish(SessionEvent::SaveFailed {
                    session: self.key(),
                    dungeon: id,
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    fn schedule_expiry(&self, player: PlayerId, id: EncounterId, at: chrono::DateTime<chrono::Utc>) {
        let delay = self.clock.until(at);
        self.schedule(delay, Command::ExpireEncounter { player, id });
    }

    /// Post `cmd` to our own mailbox after `delay`
    fn schedule(&self, delay: std::time::Duration, cmd: Command) {
        let weak = self.weak.clone();
        let session = self.key();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(tx) = weak.upgrade() else {
                debug!(session = %session, "timer fired after session closed");
                return;
            };
            if tx.send(cmd).await.is_err() {
                warn!(session = %session, "dropped timer message");
            }
        });
    }
}
