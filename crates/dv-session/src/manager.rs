//! Session manager: routes requests to per-session actors

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use image::RgbImage;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use dv_core::config::DelveConfig;
use dv_core::dungeon::{Direction, Dungeon, DungeonGenerator, DungeonParams};
use dv_core::encounter::{Action, ActionOutcome};
use dv_core::session::{
    AdvanceOutcome, JoinOutcome, LeaveOutcome, MoveOutcome, Session, StatusSummary,
};
use dv_core::{DungeonId, DungeonRng, PlayerId, SessionId, StateConflict};
use dv_render::RenderOptions;
use dv_save::{FileStore, SaveHeader, SnapshotStore};

use crate::actor::{self, ActorHandle, Command, ConfirmOutcome, View};
use crate::clock::Clock;
use crate::error::SessionError;
use crate::event::SessionEvent;
use crate::intent::{Intent, Reply};
use crate::persist;

const EVENT_CAPACITY: usize = 256;

/// Owns every live session and the collaborators they share
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, ActorHandle>>,
    store: Arc<dyn SnapshotStore>,
    config: DelveConfig,
    events: broadcast::Sender<SessionEvent>,
    rng: Mutex<DungeonRng>,
    clock: Clock,
}

impl SessionManager {
    pub fn new(config: DelveConfig, store: Arc<dyn SnapshotStore>) -> Self {
        Self::with_rng(config, store, DungeonRng::from_entropy())
    }

    /// Manager whose dungeons and encounter rolls all derive from `seed`
    pub fn with_seed(config: DelveConfig, store: Arc<dyn SnapshotStore>, seed: u64) -> Self {
        Self::with_rng(config, store, DungeonRng::new(seed))
    }

    /// File-backed manager as configured in `[save]`
    pub fn from_config(config: DelveConfig) -> Self {
        let store = Arc::new(FileStore::from_config(&config.save));
        Self::new(config, store)
    }

    fn with_rng(config: DelveConfig, store: Arc<dyn SnapshotStore>, rng: DungeonRng) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
            config,
            events,
            rng: Mutex::new(rng),
            clock: Clock::new(),
        }
    }

    pub fn config(&self) -> &DelveConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn is_active(&self, key: &SessionId) -> bool {
        self.sessions.read().await.contains_key(key)
    }

    pub async fn active_sessions(&self) -> Vec<SessionId> {
        let mut keys: Vec<_> = self.sessions.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn next_seed(&self) -> u64 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.next_seed()
    }

    fn spawn(&self, session: Session) -> ActorHandle {
        actor::spawn(
            session,
            Arc::clone(&self.store),
            self.events.clone(),
            self.clock,
            self.config.save.enabled,
        )
    }

    async fn actor(&self, key: &SessionId) -> Result<ActorHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or(SessionError::Conflict(StateConflict::NoActiveSession))
    }

    async fn forget(&self, key: &SessionId) {
        self.sessions.write().await.remove(key);
    }

    /// Generate a dungeon for `key` with `creator` as its leader
    pub async fn create(
        &self,
        key: SessionId,
        params: DungeonParams,
        name: Option<&str>,
        creator: PlayerId,
    ) -> Result<Dungeon, SessionError> {
        let handle = {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&key) {
                return Err(StateConflict::AlreadyActive.into());
            }
            let mut generator = DungeonGenerator::with_seed(self.next_seed());
            let dungeon = generator.generate_at(params, name, self.clock.now());
            let rng = DungeonRng::new(self.next_seed());
            let session = Session::create(key.clone(), dungeon, creator, &self.config, rng);
            let handle = self.spawn(session);
            sessions.insert(key.clone(), handle.clone());
            handle
        };

        let view = handle.request(|reply| Command::View { reply }).await?;
        let dungeon = view.dungeon;
        self.publish(SessionEvent::Created {
            session: key.clone(),
            dungeon: dungeon.id.clone(),
        });
        if self.config.save.enabled {
            if let Err(e) = handle.request(|reply| Command::Save { reply }).await {
                warn!(session = %key, error = %e, "initial save failed");
            }
        }
        Ok(dungeon)
    }

    pub async fn join(&self, key: &SessionId, player: PlayerId) -> Result<JoinOutcome, SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::Join { player, reply })
            .await
    }

    pub async fn leave(&self, key: &SessionId, player: PlayerId) -> Result<LeaveOutcome, SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::Leave { player, reply })
            .await
    }

    pub async fn move_player(
        &self,
        key: &SessionId,
        player: PlayerId,
        dir: Direction,
    ) -> Result<MoveOutcome, SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::Move { player, dir, reply })
            .await
    }

    pub async fn advance_floor(
        &self,
        key: &SessionId,
        player: PlayerId,
    ) -> Result<AdvanceOutcome, SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::Advance { player, reply })
            .await
    }

    /// Confirm the end while one is pending, otherwise take the stairs
    pub async fn confirm(&self, key: &SessionId, player: PlayerId) -> Result<ConfirmOutcome, SessionError> {
        let outcome = self
            .actor(key)
            .await?
            .request(|reply| Command::Confirm { player, reply })
            .await?;
        if outcome == ConfirmOutcome::Ended {
            self.forget(key).await;
        }
        Ok(outcome)
    }

    pub async fn confirm_end(&self, key: &SessionId) -> Result<(), SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::ConfirmEnd { reply })
            .await?;
        self.forget(key).await;
        Ok(())
    }

    pub async fn cancel_end(&self, key: &SessionId) -> Result<(), SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::CancelEnd { reply })
            .await
    }

    /// Leader-only: save and close the session
    pub async fn end(&self, key: &SessionId, player: PlayerId) -> Result<(), SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::End { player, reply })
            .await?;
        self.forget(key).await;
        Ok(())
    }

    pub async fn act(
        &self,
        key: &SessionId,
        player: PlayerId,
        action: Action,
    ) -> Result<ActionOutcome, SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::Act {
                player,
                action,
                reply,
            })
            .await
    }

    pub async fn status(&self, key: &SessionId) -> Result<StatusSummary, SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::Status { reply })
            .await
    }

    /// Copy of the dungeon as it stands
    pub async fn dungeon(&self, key: &SessionId) -> Result<Dungeon, SessionError> {
        Ok(self.view(key).await?.dungeon)
    }

    async fn view(&self, key: &SessionId) -> Result<View, SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::View { reply })
            .await
    }

    /// Render the current floor with fog applied
    pub async fn render(&self, key: &SessionId) -> Result<RgbImage, SessionError> {
        let view = self.view(key).await?;
        let mut options = RenderOptions::from_config(&self.config);
        options.radius = view.radius;
        let floor = view.dungeon.current_floor;
        let image = tokio::task::spawn_blocking(move || dv_render::render(&view.dungeon, floor, &options))
            .await
            .map_err(|_| SessionError::ActorGone(key.clone()))?;
        Ok(image)
    }

    pub async fn render_png(&self, key: &SessionId) -> Result<Vec<u8>, SessionError> {
        let image = self.render(key).await?;
        Ok(dv_render::encode_png(&image)?)
    }

    pub async fn set_view_handle(&self, key: &SessionId, handle: Option<String>) -> Result<(), SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::SetViewHandle { handle, reply })
            .await
    }

    /// Attach a presentation handle to a player's active encounter
    pub async fn set_encounter_handle(
        &self,
        key: &SessionId,
        player: PlayerId,
        handle: Option<String>,
    ) -> Result<bool, SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::SetEncounterHandle {
                player,
                handle,
                reply,
            })
            .await
    }

    pub async fn save(&self, key: &SessionId) -> Result<SaveHeader, SessionError> {
        self.actor(key)
            .await?
            .request(|reply| Command::Save { reply })
            .await
    }

    /// Resume a snapshot under `key`, which must not be active
    pub async fn load(&self, key: SessionId, id: DungeonId) -> Result<StatusSummary, SessionError> {
        if self.is_active(&key).await {
            return Err(StateConflict::AlreadyActive.into());
        }
        // Read the snapshot without holding the session map
        let dungeon = persist::load(Arc::clone(&self.store), id).await?;
        let handle = {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&key) {
                return Err(StateConflict::AlreadyActive.into());
            }
            let rng = DungeonRng::new(self.next_seed());
            let session = Session::restore(key.clone(), dungeon, &self.config, rng);
            let handle = self.spawn(session);
            sessions.insert(key.clone(), handle.clone());
            handle
        };
        let status = handle.request(|reply| Command::Status { reply }).await?;
        info!(session = %key, dungeon = %status.dungeon, "dungeon loaded");
        self.publish(SessionEvent::Loaded {
            session: key,
            dungeon: status.dungeon.clone(),
        });
        Ok(status)
    }

    pub async fn list_saved(&self) -> Result<Vec<SaveHeader>, SessionError> {
        Ok(persist::list(Arc::clone(&self.store)).await?)
    }

    /// Save every live session through its mailbox; returns how many succeeded
    pub async fn auto_save(&self) -> usize {
        let handles: Vec<ActorHandle> = self.sessions.read().await.values().cloned().collect();
        let mut saved = 0;
        for handle in handles {
            match handle.request(|reply| Command::AutoSave { reply }).await {
                Ok(_) => saved += 1,
                Err(e) => warn!(error = %e, "auto-save failed"),
            }
        }
        saved
    }

    /// Run [`auto_save`](Self::auto_save) on the configured interval until
    /// the manager is dropped. `None` when auto-save is disabled.
    pub fn spawn_auto_save(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let save = &self.config.save;
        if !save.enabled || save.auto_save_minutes == 0 {
            return None;
        }
        let period = Duration::from_secs(save.auto_save_minutes.saturating_mul(60));
        let manager: Weak<Self> = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let saved = manager.auto_save().await;
                info!(saved, "auto-save sweep");
            }
        }))
    }

    /// Save every session and close them all
    pub async fn shutdown(&self) {
        if self.config.save.enabled {
            self.auto_save().await;
        }
        self.sessions.write().await.clear();
    }

    fn publish(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Run one intent on behalf of `player`
    pub async fn dispatch(
        &self,
        key: &SessionId,
        player: &PlayerId,
        intent: Intent,
    ) -> Result<Reply, SessionError> {
        let player = player.clone();
        let reply = match intent {
            Intent::Create { params, name } => {
                let dungeon = self
                    .create(key.clone(), params, name.as_deref(), player)
                    .await?;
                Reply::Created {
                    id: dungeon.id,
                    name: dungeon.name,
                    floors: dungeon.floors.len(),
                }
            }
            Intent::Join => Reply::Joined(self.join(key, player).await?),
            Intent::Leave => Reply::Left(self.leave(key, player).await?),
            Intent::Move(dir) => Reply::Moved(self.move_player(key, player, dir).await?),
            Intent::Confirm => match self.confirm(key, player).await? {
                ConfirmOutcome::Ended => Reply::Ended,
                ConfirmOutcome::Advanced(outcome) => Reply::Advanced(outcome),
            },
            Intent::Cancel => {
                self.cancel_end(key).await?;
                Reply::EndCancelled
            }
            Intent::End => {
                self.end(key, player).await?;
                Reply::Ended
            }
            Intent::Save => Reply::Saved(self.save(key).await?),
            Intent::Load(id) => Reply::Loaded(self.load(key.clone(), id).await?),
            Intent::ListSaved => Reply::Saves(self.list_saved().await?),
            Intent::Act(action) => Reply::Acted(self.act(key, player, action).await?),
            Intent::Status => Reply::Status(self.status(key).await?),
        };
        Ok(reply)
    }
}
