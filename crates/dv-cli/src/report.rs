//! Plain-text descriptions for the terminal

use std::fmt::Write;

use dv_core::dungeon::{CellKind, Dungeon, Pos};
use dv_core::encounter::{ActionOutcome, PlayerMove, Trigger, TurnOutcome};
use dv_core::session::{MoveEvent, MoveOutcome, StatusSummary};
use dv_save::SaveHeader;
use dv_session::{Reply, SessionEvent};

/// Current floor as text, hidden cells blank, players as `@`
pub fn map(dungeon: &Dungeon, radius: usize, fog: bool) -> String {
    let Some(floor) = dungeon.current() else {
        return String::new();
    };
    let visible = floor.visibility(radius);
    let mut out = String::with_capacity((floor.width + 1) * floor.height);
    for (row, cells) in floor.grid.iter().enumerate() {
        for (col, kind) in cells.iter().enumerate() {
            let here = Pos::new(row, col);
            let glyph = if floor.players.values().any(|p| *p == here) {
                '@'
            } else if fog && !visible[row][col] {
                ' '
            } else if *kind == CellKind::Fog {
                ' '
            } else {
                kind.symbol()
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}

fn trigger(t: &Trigger) -> String {
    match t {
        Trigger::Trap { trap, check, .. } => format!(
            "{} ({} check, DC {}). Type `roll`.",
            trap.description(),
            trap.skill(),
            check.dc
        ),
        Trigger::Battle { enemy, .. } if enemy.is_boss => format!(
            "BOSS: {} appears! HP {} ATK {} DEF {}",
            enemy.name, enemy.max_hp, enemy.attack, enemy.defense
        ),
        Trigger::Battle { enemy, .. } => format!(
            "A {} blocks the way. HP {} ATK {} DEF {}",
            enemy.name, enemy.max_hp, enemy.attack, enemy.defense
        ),
        Trigger::Event(event) => event.message(),
        Trigger::Loot(loot) => {
            let mut s = format!("Chest: {} gold", loot.gold);
            for item in &loot.items {
                let _ = write!(s, ", {item}");
            }
            s
        }
    }
}

fn player_move(m: &PlayerMove) -> String {
    match m {
        PlayerMove::Attack {
            roll,
            bonus,
            hit: true,
            damage,
        } => format!("You roll {roll}+{bonus} and hit for {damage}."),
        PlayerMove::Attack { roll, bonus, .. } => format!("You roll {roll}+{bonus} and miss."),
        PlayerMove::Defend => "You brace yourself.".to_string(),
        PlayerMove::Fumbled(action) => format!("{action} does nothing here."),
        PlayerMove::FleeFailed => "You fail to get away!".to_string(),
    }
}

pub fn action(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::NoEncounter => "Nothing to act on.".to_string(),
        ActionOutcome::Ignored(a) => format!("{a} has no effect on this encounter."),
        ActionOutcome::Trap(t) => format!("[{} vs DC {}] {}", t.total(), t.dc, t.message()),
        ActionOutcome::Battle(TurnOutcome::Fled) => "You escaped.".to_string(),
        ActionOutcome::Battle(TurnOutcome::Victory { player, reward }) => {
            let (xp, gold) = reward.share();
            let mut s = format!("{} Victory! {xp} xp and {gold} gold each", player_move(player));
            if let Some(drop) = &reward.drop {
                let _ = write!(s, ", dropped {drop}");
            }
            s
        }
        ActionOutcome::Battle(TurnOutcome::Continued {
            player,
            counter,
            enemy_hp,
        }) => {
            let mut s = player_move(player);
            if counter.hit {
                let _ = write!(s, " The enemy hits you for {}.", counter.damage);
            } else {
                s.push_str(" The enemy misses.");
            }
            if let Some(effect) = &counter.effect {
                let _ = write!(s, " {effect}");
            }
            let _ = write!(s, " Enemy HP {enemy_hp}.");
            s
        }
    }
}

pub fn status(s: &StatusSummary) -> String {
    let mut out = format!(
        "{} [{}] {} / {} / {} / {}",
        s.name,
        s.progress(),
        s.params.size,
        s.params.complexity,
        s.params.floors,
        s.params.difficulty
    );
    if s.completed {
        out.push_str(" (completed)");
    }
    if s.pending_end {
        out.push_str(" (waiting to end)");
    }
    for p in &s.players {
        let _ = write!(out, "\n  {} at {}", p.id, p.pos);
        if p.leader {
            out.push_str(" [leader]");
        }
        if let Some(e) = &p.encounter {
            let _ = write!(out, " in {e}");
        }
    }
    let _ = write!(
        out,
        "\n  chests {} traps {} enemies {}, {} cells explored",
        s.remaining.chests, s.remaining.traps, s.remaining.enemies, s.revealed_cells
    );
    out
}

pub fn save(h: &SaveHeader) -> String {
    format!(
        "{}  {}  {}{}  saved {}",
        h.dungeon_id,
        h.name,
        h.progress(),
        if h.completed { " (completed)" } else { "" },
        h.saved_at.format("%Y-%m-%d %H:%M")
    )
}

pub fn reply(r: &Reply) -> String {
    match r {
        Reply::Created { id, name, floors } => format!("Created {name} ({id}) with {floors} floors."),
        Reply::Joined(j) => {
            let mut s = format!("Joined at {}.", j.pos);
            if j.leader {
                s.push_str(" You lead the party.");
            }
            s
        }
        Reply::Left(l) => match (&l.new_leader, l.pending_end_until) {
            (_, Some(until)) => format!(
                "Everyone left. `confirm` to end, or it stays open after {}.",
                until.format("%H:%M:%S")
            ),
            (Some(leader), None) => format!("Left. {leader} now leads."),
            (None, None) => "Left.".to_string(),
        },
        Reply::Moved(MoveOutcome::Blocked) => "A wall blocks the way.".to_string(),
        Reply::Moved(MoveOutcome::Moved { pos, events }) => {
            let mut s = format!("Moved to {pos}.");
            for e in events {
                match e {
                    MoveEvent::OnStairs => s.push_str(" Stairs up: `confirm` to climb."),
                    MoveEvent::Encounter(t) => {
                        s.push(' ');
                        s.push_str(&trigger(t));
                    }
                }
            }
            s
        }
        Reply::Advanced(a) => format!("The party climbs to floor {}.", a.floor + 1),
        Reply::Ended => "The dungeon is closed.".to_string(),
        Reply::EndCancelled => "The dungeon stays open.".to_string(),
        Reply::Saved(h) => format!("Saved {}.", save(h)),
        Reply::Loaded(s) => format!("Loaded {}", status(s)),
        Reply::Saves(list) if list.is_empty() => "No saved dungeons.".to_string(),
        Reply::Saves(list) => list.iter().map(save).collect::<Vec<_>>().join("\n"),
        Reply::Acted(a) => action(a),
        Reply::Status(s) => status(s),
    }
}

pub fn event(e: &SessionEvent) -> Option<String> {
    match e {
        SessionEvent::EncounterExpired { player, kind, .. } => {
            Some(format!("{player}'s {kind} encounter timed out."))
        }
        SessionEvent::LeaderChanged { leader, .. } => Some(format!("{leader} now leads.")),
        SessionEvent::PendingEndTimedOut { .. } => {
            Some("Nobody confirmed; the dungeon stays open.".to_string())
        }
        SessionEvent::SaveFailed { error, .. } => Some(format!("Save failed: {error}")),
        _ => None,
    }
}
