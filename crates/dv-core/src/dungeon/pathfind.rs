//! Path search over floor grids
//!
//! A* carves a guaranteed route from start to terminal during generation;
//! BFS answers plain reachability questions on finished floors.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use super::cell::CellKind;
use super::coord::{Direction, Pos};
use super::level::Floor;

/// Rectangle of the grid a search may touch, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: Pos,
    pub max: Pos,
}

impl Bounds {
    pub fn contains(&self, p: Pos) -> bool {
        (self.min.row..=self.max.row).contains(&p.row) && (self.min.col..=self.max.col).contains(&p.col)
    }
}

/// A* node for the priority queue
#[derive(Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    pos: Pos,
    g_cost: usize,
    f_cost: usize,
    /// Walls opened so far along this route
    carved: usize,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behaviour
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.carved.cmp(&self.carved))
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lattice pillar: both coordinates even
pub fn is_pillar(p: Pos) -> bool {
    p.row % 2 == 0 && p.col % 2 == 0
}

/// Would opening `p` leave some 2x2 square fully open?
pub fn completes_block(floor: &Floor, p: Pos) -> bool {
    let open = |row: usize, col: usize| Pos::new(row, col) == p || floor.is_open(Pos::new(row, col));
    let rows = p.row.saturating_sub(1)..=p.row;
    rows.flat_map(|r| (p.col.saturating_sub(1)..=p.col).map(move |c| (r, c)))
        .filter(|&(r, c)| r + 1 < floor.height && c + 1 < floor.width)
        .any(|(r, c)| open(r, c) && open(r + 1, c) && open(r, c + 1) && open(r + 1, c + 1))
}

fn carvable(floor: &Floor, bounds: &Bounds, p: Pos) -> bool {
    bounds.contains(p)
        && floor.cell(p) == CellKind::Wall
        && !is_pillar(p)
        && !completes_block(floor, p)
}

/// Find a route from `start` to `goal` that may pass through carvable walls,
/// then open those walls. Returns how many walls were opened, or `None` when
/// no route exists inside `bounds`.
pub fn carve_route(floor: &mut Floor, bounds: Bounds, start: Pos, goal: Pos) -> Option<usize> {
    let route = astar(floor, &bounds, start, goal)?;
    let mut opened = 0;
    for p in route {
        if floor.cell(p) == CellKind::Wall {
            floor.set_cell(p, CellKind::Path);
            opened += 1;
        }
    }
    Some(opened)
}

fn astar(floor: &Floor, bounds: &Bounds, start: Pos, goal: Pos) -> Option<Vec<Pos>> {
    if !bounds.contains(start) || !bounds.contains(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let (w, h) = (floor.width, floor.height);
    let idx = |p: Pos| p.row * w + p.col;
    let mut g_scores = vec![usize::MAX; w * h];
    let mut came_from: Vec<Option<Pos>> = vec![None; w * h];
    let mut closed = vec![false; w * h];
    let mut open_set = BinaryHeap::new();

    g_scores[idx(start)] = 0;
    open_set.push(AStarNode {
        pos: start,
        g_cost: 0,
        f_cost: start.manhattan(goal),
        carved: 0,
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            let mut path = vec![goal];
            let mut at = goal;
            while let Some(prev) = came_from[idx(at)] {
                path.push(prev);
                at = prev;
            }
            path.reverse();
            return Some(path);
        }
        if closed[idx(current.pos)] {
            continue;
        }
        closed[idx(current.pos)] = true;

        for dir in Direction::ALL {
            let Some(next) = floor.neighbor(current.pos, dir) else {
                continue;
            };
            if !bounds.contains(next) || closed[idx(next)] {
                continue;
            }
            let is_wall = !floor.is_open(next);
            if is_wall && !carvable(floor, bounds, next) {
                continue;
            }
            let g_cost = current.g_cost + 1;
            if g_cost >= g_scores[idx(next)] {
                continue;
            }
            g_scores[idx(next)] = g_cost;
            came_from[idx(next)] = Some(current.pos);
            open_set.push(AStarNode {
                pos: next,
                g_cost,
                f_cost: g_cost + next.manhattan(goal),
                carved: current.carved + usize::from(is_wall),
            });
        }
    }

    None
}

/// Shortest open-cell path from `from` to `to`, both ends included
pub fn bfs_path(floor: &Floor, from: Pos, to: Pos) -> Option<Vec<Pos>> {
    if !floor.is_open(from) || !floor.is_open(to) {
        return None;
    }
    let w = floor.width;
    let idx = |p: Pos| p.row * w + p.col;
    let mut came_from: Vec<Option<Pos>> = vec![None; w * floor.height];
    let mut seen = vec![false; w * floor.height];
    let mut queue = VecDeque::from([from]);
    seen[idx(from)] = true;

    while let Some(at) = queue.pop_front() {
        if at == to {
            let mut path = vec![to];
            let mut cur = to;
            while let Some(prev) = came_from[idx(cur)] {
                path.push(prev);
                cur = prev;
            }
            path.reverse();
            return Some(path);
        }
        for next in floor.open_neighbors(at) {
            if !seen[idx(next)] {
                seen[idx(next)] = true;
                came_from[idx(next)] = Some(at);
                queue.push_back(next);
            }
        }
    }
    None
}

/// Every open cell reachable from `from`, as a `[row][col]` mask
pub fn reachable(floor: &Floor, from: Pos) -> Vec<Vec<bool>> {
    let mut seen = vec![vec![false; floor.width]; floor.height];
    if !floor.is_open(from) {
        return seen;
    }
    let mut queue = VecDeque::from([from]);
    seen[from.row][from.col] = true;
    while let Some(at) = queue.pop_front() {
        for next in floor.open_neighbors(at) {
            if !seen[next.row][next.col] {
                seen[next.row][next.col] = true;
                queue.push_back(next);
            }
        }
    }
    seen
}

/// Whether every open cell can be reached from `from`
pub fn is_connected(floor: &Floor, from: Pos) -> bool {
    let seen = reachable(floor, from);
    floor.open_cells().all(|p| seen[p.row][p.col])
}
