//! Maze carving
//!
//! Rooms sit on odd (row, col) coordinates; the cells between two rooms are
//! edge walls and the even-even cells are pillars that always stay solid.
//! A randomized spanning tree links every room, then a few extra edges are
//! opened to create loops and thin out dead ends.

use std::collections::VecDeque;

use tracing::debug;

use super::cell::CellKind;
use super::coord::{Direction, Pos};
use super::level::Floor;
use super::pathfind::{self, Bounds, completes_block, is_pillar};
use super::tier::ComplexityTier;
use crate::{DungeonRng, LOOP_DENSITY, OPENING_ATTEMPTS};

/// Room lattice of a floor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    /// Interior rectangle that carving may touch
    pub bounds: Bounds,
    /// Room coordinates in row-major order
    pub rooms: Vec<Pos>,
    /// Floor centre, splitting it into quadrants
    pub mid: Pos,
}

impl Lattice {
    /// Lattice for a `width` x `height` floor with a one-cell border.
    ///
    /// The interior is trimmed to the largest odd extent so that it both
    /// starts and ends on a room row/column.
    pub fn for_floor(width: usize, height: usize) -> Self {
        let last_odd = |dim: usize| {
            let inner = dim.saturating_sub(2).max(1);
            if inner % 2 == 1 { inner } else { inner - 1 }
        };
        let max = Pos::new(last_odd(height), last_odd(width));
        let rooms = (1..=max.row)
            .step_by(2)
            .flat_map(|row| (1..=max.col).step_by(2).map(move |col| Pos::new(row, col)))
            .collect();
        Self {
            bounds: Bounds {
                min: Pos::new(1, 1),
                max,
            },
            rooms,
            mid: Pos::new(height / 2, width / 2),
        }
    }

    fn room_index(&self, p: Pos) -> Option<usize> {
        if p.row % 2 == 0 || p.col % 2 == 0 || !self.bounds.contains(p) {
            return None;
        }
        let per_row = (self.bounds.max.col + 1) / 2;
        Some((p.row / 2) * per_row + p.col / 2)
    }

    /// Pick start and goal rooms: the start from the top-left quadrant, the
    /// goal from the bottom-right one. A quadrant without rooms falls back
    /// to the first or second half of the lattice.
    pub fn pick_endpoints(&self, rng: &mut DungeonRng) -> (Pos, Pos) {
        let half = (self.rooms.len() / 2).max(1).min(self.rooms.len());
        let (first, second) = self.rooms.split_at(half);
        let top_left: Vec<Pos> = self
            .rooms
            .iter()
            .copied()
            .filter(|p| p.row < self.mid.row && p.col < self.mid.col)
            .collect();
        let bottom_right: Vec<Pos> = self
            .rooms
            .iter()
            .copied()
            .filter(|p| p.row >= self.mid.row && p.col >= self.mid.col)
            .collect();
        let start_pool: &[Pos] = if top_left.is_empty() { first } else { &top_left };
        let goal_pool: &[Pos] = if bottom_right.is_empty() { second } else { &bottom_right };

        let start = rng.choose(start_pool).copied().unwrap_or(self.bounds.min);
        let goal = rng
            .choose(goal_pool)
            .copied()
            .or_else(|| self.rooms.last().copied())
            .unwrap_or(self.bounds.max);
        if goal == start {
            (start, self.rooms.last().copied().unwrap_or(self.bounds.max))
        } else {
            (start, goal)
        }
    }
}

/// Rooms partitioned into linked groups
struct RoomSets {
    parent: Vec<usize>,
}

impl RoomSets {
    fn new(count: usize) -> Self {
        Self {
            parent: (0..count).collect(),
        }
    }

    fn find(&mut self, mut a: usize) -> usize {
        while self.parent[a] != a {
            self.parent[a] = self.parent[self.parent[a]];
            a = self.parent[a];
        }
        a
    }

    /// Merge the groups of `a` and `b`; false if already together
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent[rb] = ra;
        true
    }
}

/// What carving did to a floor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarveStats {
    pub links: usize,
    pub repaired: usize,
    pub loops: usize,
    pub dead_ends_opened: usize,
}

/// Open every room and link them with a random spanning tree
pub fn carve_spanning_tree(floor: &mut Floor, lattice: &Lattice, rng: &mut DungeonRng) -> usize {
    for room in &lattice.rooms {
        floor.set_cell(*room, CellKind::Path);
    }

    let mut sets = RoomSets::new(lattice.rooms.len());
    let mut order: Vec<usize> = (0..lattice.rooms.len()).collect();
    rng.shuffle(&mut order);
    let mut queue: VecDeque<usize> = order.into();
    let mut links = 0;

    while let Some(i) = queue.pop_front() {
        let room = lattice.rooms[i];
        let mut dirs = Direction::ALL;
        rng.shuffle(&mut dirs);

        let linked = dirs.into_iter().find_map(|dir| {
            let other = room.step(dir, 2)?;
            let j = lattice.room_index(other)?;
            sets.union(i, j).then_some(dir)
        });

        if let Some(dir) = linked {
            if let Some(wall) = room.step(dir, 1) {
                floor.set_cell(wall, CellKind::Path);
            }
            links += 1;
            queue.push_back(i);
        }
    }

    links
}

fn is_edge_wall(floor: &Floor, lattice: &Lattice, p: Pos) -> bool {
    lattice.bounds.contains(p)
        && floor.cell(p) == CellKind::Wall
        && !is_pillar(p)
        && p.row % 2 != p.col % 2
}

/// The two rooms an edge wall separates
fn flanks(p: Pos) -> Option<(Pos, Pos)> {
    if p.row % 2 == 1 {
        Some((p.step(Direction::Left, 1)?, p.step(Direction::Right, 1)?))
    } else {
        Some((p.step(Direction::Up, 1)?, p.step(Direction::Down, 1)?))
    }
}

/// Open extra edges between already-open rooms to create loops
pub fn add_loops(
    floor: &mut Floor,
    lattice: &Lattice,
    complexity: ComplexityTier,
    rng: &mut DungeonRng,
) -> usize {
    let area = floor.width.saturating_sub(2) * floor.height.saturating_sub(2);
    let wanted = (area as f64 * complexity.branch_factor() * LOOP_DENSITY) as usize;
    let (min, max) = (lattice.bounds.min, lattice.bounds.max);
    let mut opened = 0;

    for _ in 0..wanted * OPENING_ATTEMPTS {
        if opened >= wanted {
            break;
        }
        let p = Pos::new(
            min.row + rng.rn2((max.row - min.row + 1) as u32) as usize,
            min.col + rng.rn2((max.col - min.col + 1) as u32) as usize,
        );
        if !is_edge_wall(floor, lattice, p) || completes_block(floor, p) {
            continue;
        }
        let Some((a, b)) = flanks(p) else { continue };
        if floor.is_open(a) && floor.is_open(b) {
            floor.set_cell(p, CellKind::Path);
            opened += 1;
        }
    }

    opened
}

/// Open cell with exactly three solid neighbours
fn is_dead_end(floor: &Floor, p: Pos) -> bool {
    floor.is_open(p) && floor.open_neighbors(p).count() == 1
}

/// Break through the end wall of up to `complexity.dead_ends()` dead ends
pub fn thin_dead_ends(
    floor: &mut Floor,
    lattice: &Lattice,
    complexity: ComplexityTier,
    rng: &mut DungeonRng,
) -> usize {
    let wanted = complexity.dead_ends();
    let mut opened = 0;

    for _ in 0..wanted * OPENING_ATTEMPTS {
        if opened >= wanted {
            break;
        }
        let dead_ends: Vec<Pos> = lattice
            .rooms
            .iter()
            .copied()
            .filter(|p| is_dead_end(floor, *p))
            .collect();
        let Some(&cell) = rng.choose(&dead_ends) else {
            break;
        };

        let options: Vec<Pos> = Direction::ALL
            .into_iter()
            .filter_map(|dir| {
                let wall = cell.step(dir, 1)?;
                let beyond = cell.step(dir, 2)?;
                (is_edge_wall(floor, lattice, wall)
                    && lattice.bounds.contains(beyond)
                    && floor.is_open(beyond)
                    && !completes_block(floor, wall))
                .then_some(wall)
            })
            .collect();
        if let Some(&wall) = rng.choose(&options) {
            floor.set_cell(wall, CellKind::Path);
            opened += 1;
        }
    }

    opened
}

/// Carve a complete maze into an all-wall floor and return its endpoints.
///
/// The returned start and goal are guaranteed to be connected.
pub fn carve(
    floor: &mut Floor,
    complexity: ComplexityTier,
    rng: &mut DungeonRng,
) -> (Pos, Pos, CarveStats) {
    let lattice = Lattice::for_floor(floor.width, floor.height);
    let links = carve_spanning_tree(floor, &lattice, rng);
    let (start, goal) = lattice.pick_endpoints(rng);

    let repaired = pathfind::carve_route(floor, lattice.bounds, start, goal).unwrap_or_default();
    let loops = add_loops(floor, &lattice, complexity, rng);
    let dead_ends_opened = thin_dead_ends(floor, &lattice, complexity, rng);

    let stats = CarveStats {
        links,
        repaired,
        loops,
        dead_ends_opened,
    };
    debug!(
        floor = floor.number,
        links, repaired, loops, dead_ends_opened, "carved maze"
    );
    debug_assert!(pathfind::bfs_path(floor, start, goal).is_some());
    (start, goal, stats)
}
