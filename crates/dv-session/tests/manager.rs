use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use dv_core::config::DelveConfig;
use dv_core::dungeon::{
    ComplexityTier, DifficultyTier, Direction, DungeonGenerator, DungeonParams, FloorCountTier,
    SizeTier,
};
use dv_core::encounter::{Action, ActionOutcome};
use dv_core::session::{MoveEvent, MoveOutcome};
use dv_core::{DungeonId, PlayerId, SessionId, StateConflict};
use dv_save::{MemoryStore, SaveError, SnapshotStore};
use dv_session::{Intent, Reply, SessionError, SessionEvent, SessionManager};

fn quiet() -> DelveConfig {
    let mut config = DelveConfig::default();
    config.encounters.random_move_chance = 0.0;
    config
}

fn manager(config: DelveConfig) -> (Arc<MemoryStore>, SessionManager) {
    let store = Arc::new(MemoryStore::new());
    let manager = SessionManager::with_seed(config, store.clone(), 7);
    (store, manager)
}

fn key(s: &str) -> SessionId {
    SessionId::new(s)
}

fn player(s: &str) -> PlayerId {
    PlayerId::new(s)
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn conflict<T: std::fmt::Debug>(result: Result<T, SessionError>) -> StateConflict {
    result.unwrap_err().conflict().expect("state conflict")
}

#[tokio::test]
async fn create_join_leave_confirm() {
    let (store, m) = manager(quiet());
    let mut events = m.subscribe();
    let chan = key("chan");

    let dungeon = m
        .create(chan.clone(), DungeonParams::default(), None, player("1"))
        .await
        .unwrap();
    assert_eq!(dungeon.leader, Some(player("1")));
    assert_eq!(dungeon.creator, Some(player("1")));
    assert_eq!(store.len(), 1);

    assert_eq!(
        conflict(m.create(chan.clone(), DungeonParams::default(), None, player("2")).await),
        StateConflict::AlreadyActive
    );

    m.join(&chan, player("2")).await.unwrap();
    assert_eq!(conflict(m.join(&chan, player("2")).await), StateConflict::AlreadyJoined);

    let left = m.leave(&chan, player("1")).await.unwrap();
    assert_eq!(left.new_leader, Some(player("2")));
    assert!(left.pending_end_until.is_none());

    let left = m.leave(&chan, player("2")).await.unwrap();
    assert!(left.pending_end_until.is_some());
    assert!(m.status(&chan).await.unwrap().pending_end);

    m.confirm_end(&chan).await.unwrap();
    assert!(!m.is_active(&chan).await);
    assert_eq!(conflict(m.join(&chan, player("1")).await), StateConflict::NoActiveSession);

    let seen = drain(&mut events);
    assert!(seen.contains(&SessionEvent::Created {
        session: chan.clone(),
        dungeon: dungeon.id.clone()
    }));
    assert!(seen.contains(&SessionEvent::LeaderChanged {
        session: chan.clone(),
        leader: player("2")
    }));
    assert!(seen.iter().any(|e| matches!(e, SessionEvent::PendingEnd { .. })));
    assert!(seen.contains(&SessionEvent::Ended { session: chan }));
}

#[tokio::test]
async fn rejoining_cancels_pending_end() {
    let (_, m) = manager(quiet());
    let chan = key("chan");
    m.create(chan.clone(), DungeonParams::default(), None, player("1"))
        .await
        .unwrap();
    m.leave(&chan, player("1")).await.unwrap();

    let joined = m.join(&chan, player("5")).await.unwrap();
    assert!(joined.cancelled_pending_end);
    assert!(joined.leader);
    let status = m.status(&chan).await.unwrap();
    assert!(!status.pending_end);
    assert_eq!(status.leader, Some(player("5")));
    assert_eq!(conflict(m.confirm_end(&chan).await), StateConflict::NotPendingEnd);
}

#[tokio::test(start_paused = true)]
async fn pending_end_times_out_to_an_empty_session() {
    let (_, m) = manager(quiet());
    let mut events = m.subscribe();
    let chan = key("chan");
    m.create(chan.clone(), DungeonParams::default(), None, player("1"))
        .await
        .unwrap();
    m.leave(&chan, player("1")).await.unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;

    let status = m.status(&chan).await.unwrap();
    assert!(!status.pending_end);
    assert!(status.players.is_empty());
    assert!(m.is_active(&chan).await);
    assert!(drain(&mut events).contains(&SessionEvent::PendingEndTimedOut { session: chan.clone() }));
    assert_eq!(conflict(m.confirm_end(&chan).await), StateConflict::NotPendingEnd);
    assert_eq!(conflict(m.cancel_end(&chan).await), StateConflict::NotPendingEnd);
}

#[tokio::test(start_paused = true)]
async fn unanswered_encounters_expire() {
    let mut config = DelveConfig::default();
    config.encounters.random_move_chance = 1.0;
    config.encounters.cooldown_secs = 0;
    config.encounters.trap_expiry_secs = 30;
    config.encounters.battle_expiry_secs = 30;
    config.encounters.weights.trap = 1.0;
    config.encounters.weights.battle = 0.0;
    config.encounters.weights.event = 0.0;
    let (_, m) = manager(config);
    let mut events = m.subscribe();
    let chan = key("chan");
    let p = player("1");
    m.create(chan.clone(), DungeonParams::default(), None, p.clone())
        .await
        .unwrap();

    let mut started = None;
    for step in 0..40 {
        let dungeon = m.dungeon(&chan).await.unwrap();
        let floor = dungeon.current().unwrap();
        let pos = dungeon.position_of(&p).unwrap();
        let open: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|d| floor.neighbor(pos, *d).is_some_and(|n| floor.is_open(n)))
            .collect();
        let dir = open[step % open.len()];
        let MoveOutcome::Moved { events, .. } = m.move_player(&chan, p.clone(), dir).await.unwrap() else {
            panic!("open neighbour reported as blocked");
        };
        started = events.into_iter().find_map(|e| match e {
            MoveEvent::Encounter(t) => t.encounter_id(),
            MoveEvent::OnStairs => None,
        });
        if started.is_some() {
            break;
        }
    }
    let id = started.expect("an encounter within 40 moves");

    let status = m.status(&chan).await.unwrap();
    assert!(status.players[0].encounter.is_some());
    assert_eq!(
        conflict(m.move_player(&chan, p.clone(), Direction::Up).await),
        StateConflict::EncounterInProgress
    );
    assert!(m.set_encounter_handle(&chan, p.clone(), Some("msg-1".into())).await.unwrap());

    tokio::time::sleep(Duration::from_secs(31)).await;

    let status = m.status(&chan).await.unwrap();
    assert!(status.players[0].encounter.is_none());
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        SessionEvent::EncounterExpired { id: expired, .. } if *expired == id
    )));
    assert_eq!(
        m.act(&chan, p.clone(), Action::Attack).await.unwrap(),
        ActionOutcome::NoEncounter
    );
    assert!(!m.set_encounter_handle(&chan, p, None).await.unwrap());
}

#[tokio::test]
async fn only_the_leader_ends() {
    let (store, m) = manager(quiet());
    let mut events = m.subscribe();
    let chan = key("chan");
    let dungeon = m
        .create(chan.clone(), DungeonParams::default(), None, player("1"))
        .await
        .unwrap();
    m.join(&chan, player("2")).await.unwrap();

    assert_eq!(conflict(m.end(&chan, player("2")).await), StateConflict::NotLeader);
    assert!(m.is_active(&chan).await);

    m.end(&chan, player("1")).await.unwrap();
    assert!(!m.is_active(&chan).await);
    let saved = store.load(&dungeon.id).unwrap();
    assert_eq!(saved.floors[saved.current_floor].players.len(), 2);

    let seen = drain(&mut events);
    let saves = seen
        .iter()
        .filter(|e| matches!(e, SessionEvent::Saved { .. }))
        .count();
    assert_eq!(saves, 2);
}

#[tokio::test]
async fn sessions_are_independent() {
    let (_, m) = manager(quiet());
    let (a, b) = (key("a"), key("b"));
    m.create(a.clone(), DungeonParams::default(), None, player("1"))
        .await
        .unwrap();
    m.create(b.clone(), DungeonParams::default(), Some("Other"), player("1"))
        .await
        .unwrap();
    m.join(&a, player("2")).await.unwrap();

    assert_eq!(m.status(&a).await.unwrap().players.len(), 2);
    let other = m.status(&b).await.unwrap();
    assert_eq!(other.players.len(), 1);
    assert_eq!(other.name, "Other");
    assert_eq!(m.active_sessions().await, vec![a, b]);
}

#[tokio::test]
async fn save_and_load_through_the_store() {
    let (_, m) = manager(quiet());
    let chan = key("chan");
    let dungeon = m
        .create(chan.clone(), DungeonParams::default(), None, player("1"))
        .await
        .unwrap();
    m.set_view_handle(&chan, Some("msg-9".into())).await.unwrap();

    let header = m.save(&chan).await.unwrap();
    assert_eq!(header.dungeon_id, dungeon.id);

    assert_eq!(
        conflict(m.load(chan.clone(), dungeon.id.clone()).await),
        StateConflict::AlreadyActive
    );

    let copy = key("copy");
    let status = m.load(copy.clone(), dungeon.id.clone()).await.unwrap();
    assert_eq!(status.dungeon, dungeon.id);
    assert_eq!(status.players.len(), 1);
    let restored = m.dungeon(&copy).await.unwrap();
    assert_eq!(restored.view_handle, None);
    assert_eq!(restored.floors, m.dungeon(&chan).await.unwrap().floors);

    let saves = m.list_saved().await.unwrap();
    assert_eq!(saves.len(), 1);

    let missing = m.load(key("nope"), DungeonId::new("dungeon_0")).await;
    assert!(matches!(missing, Err(SessionError::Save(SaveError::NotFound(_)))));
    assert!(!m.is_active(&key("nope")).await);
}

#[tokio::test]
async fn confirm_climbs_stairs_then_ends() {
    let (store, m) = manager(quiet());
    let params = DungeonParams::new(
        SizeTier::Small,
        ComplexityTier::Easy,
        FloorCountTier::Medium,
        DifficultyTier::Easy,
    );
    let mut dungeon = DungeonGenerator::with_seed(11).generate_at(params, None, Utc::now());
    let stairs = dungeon.floors[0].index().stairs_up.unwrap();
    dungeon.floors[0].players.insert(player("1"), stairs);
    dungeon.leader = Some(player("1"));
    store.save(&dungeon).unwrap();

    let chan = key("chan");
    let me = player("1");
    m.load(chan.clone(), dungeon.id.clone()).await.unwrap();

    let reply = m.dispatch(&chan, &me, Intent::Confirm).await.unwrap();
    let Reply::Advanced(outcome) = reply else {
        panic!("expected the party to climb, got {reply:?}");
    };
    assert_eq!(outcome.floor, 1);
    assert_eq!(outcome.moved, vec![me.clone()]);
    assert_eq!(
        m.dispatch(&chan, &me, Intent::Confirm).await.unwrap_err().conflict(),
        Some(StateConflict::NotOnStairs)
    );

    m.dispatch(&chan, &me, Intent::Leave).await.unwrap();
    assert_eq!(m.dispatch(&chan, &me, Intent::Confirm).await.unwrap(), Reply::Ended);
    assert!(!m.is_active(&chan).await);
}

#[tokio::test]
async fn dispatch_parsed_intents() {
    let (_, m) = manager(quiet());
    let chan = key("chan");
    let me = player("1");

    let intent: Intent = "create small easy small easy Cellar".parse().unwrap();
    let Reply::Created { name, floors, .. } = m.dispatch(&chan, &me, intent).await.unwrap() else {
        panic!("expected Created");
    };
    assert_eq!(name, "Cellar");
    assert!((1..=3).contains(&floors));

    let Reply::Status(status) = m.dispatch(&chan, &me, Intent::Status).await.unwrap() else {
        panic!("expected Status");
    };
    assert_eq!(status.leader, Some(me.clone()));

    let Reply::Acted(outcome) = m
        .dispatch(&chan, &me, "attack".parse().unwrap())
        .await
        .unwrap()
    else {
        panic!("expected Acted");
    };
    assert_eq!(outcome, ActionOutcome::NoEncounter);

    assert!(matches!(
        m.dispatch(&chan, &me, Intent::Save).await.unwrap(),
        Reply::Saved(_)
    ));
    assert!(matches!(
        m.dispatch(&chan, &me, Intent::ListSaved).await.unwrap(),
        Reply::Saves(list) if list.len() == 1
    ));
    assert_eq!(
        m.dispatch(&chan, &player("2"), Intent::Cancel).await.unwrap_err().conflict(),
        Some(StateConflict::NotPendingEnd)
    );
    assert_eq!(m.dispatch(&chan, &me, Intent::End).await.unwrap(), Reply::Ended);
}

#[tokio::test]
async fn render_matches_floor_size() {
    let (_, m) = manager(quiet());
    let chan = key("chan");
    let dungeon = m
        .create(chan.clone(), DungeonParams::default(), None, player("1"))
        .await
        .unwrap();
    let floor = dungeon.current().unwrap();

    let image = m.render(&chan).await.unwrap();
    assert_eq!(image.width(), floor.width as u32 * 32);
    assert_eq!(image.height(), floor.height as u32 * 32 + dv_render::FOOTER_HEIGHT);

    let png = m.render_png(&chan).await.unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn auto_save_visits_every_session() {
    let mut config = quiet();
    config.save.enabled = false;
    let (store, m) = manager(config);
    for k in ["a", "b", "c"] {
        m.create(key(k), DungeonParams::default(), None, player("1"))
            .await
            .unwrap();
    }
    assert!(store.is_empty());
    assert_eq!(m.auto_save().await, 3);
    assert_eq!(store.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn auto_save_runs_on_its_interval() {
    let mut config = quiet();
    config.save.auto_save_minutes = 1;
    let (_, m) = manager(config);
    let m = Arc::new(m);
    let chan = key("chan");
    m.create(chan.clone(), DungeonParams::default(), None, player("1"))
        .await
        .unwrap();
    let mut events = m.subscribe();
    let task = m.spawn_auto_save().expect("auto-save enabled");

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(drain(&mut events).contains(&SessionEvent::Saved {
        session: chan,
        dungeon: m.status(&key("chan")).await.unwrap().dungeon,
    }));
    task.abort();
}

#[tokio::test]
async fn disabled_auto_save_spawns_nothing() {
    let mut config = quiet();
    config.save.enabled = false;
    let (_, m) = manager(config);
    assert!(Arc::new(m).spawn_auto_save().is_none());
}

/// Store whose `load` parks until the test lets it through
struct GatedStore {
    inner: MemoryStore,
    entered: tokio::sync::mpsc::UnboundedSender<()>,
    release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
}

impl SnapshotStore for GatedStore {
    fn save(&self, dungeon: &dv_core::dungeon::Dungeon) -> Result<dv_save::SaveHeader, SaveError> {
        self.inner.save(dungeon)
    }

    fn load(&self, id: &DungeonId) -> Result<dv_core::dungeon::Dungeon, SaveError> {
        let _ = self.entered.send(());
        let _ = self.release.lock().unwrap().recv();
        self.inner.load(id)
    }

    fn list(&self) -> Result<Vec<dv_save::SaveHeader>, SaveError> {
        self.inner.list()
    }

    fn delete(&self, id: &DungeonId) -> Result<(), SaveError> {
        self.inner.delete(id)
    }
}

#[tokio::test]
async fn slow_load_does_not_block_other_sessions() {
    let (entered_tx, mut entered) = tokio::sync::mpsc::unbounded_channel();
    let (release, release_rx) = std::sync::mpsc::channel();
    let store = Arc::new(GatedStore {
        inner: MemoryStore::new(),
        entered: entered_tx,
        release: std::sync::Mutex::new(release_rx),
    });
    let m = Arc::new(SessionManager::with_seed(quiet(), store, 7));
    let live = key("live");
    let dungeon = m
        .create(live.clone(), DungeonParams::default(), None, player("1"))
        .await
        .unwrap();
    m.save(&live).await.unwrap();

    let loader = {
        let m = Arc::clone(&m);
        let id = dungeon.id.clone();
        tokio::spawn(async move { m.load(key("copy"), id).await })
    };
    entered.recv().await.unwrap();

    let status = tokio::time::timeout(Duration::from_secs(5), m.status(&live))
        .await
        .expect("status waited on the pending load")
        .unwrap();
    assert_eq!(status.dungeon, dungeon.id);
    assert!(!m.is_active(&key("copy")).await);

    release.send(()).unwrap();
    let loaded = loader.await.unwrap().unwrap();
    assert_eq!(loaded.dungeon, dungeon.id);
    assert!(m.is_active(&key("copy")).await);
}
