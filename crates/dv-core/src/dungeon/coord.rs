//! Grid positions and movement directions

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::ValidationError;

/// A (row, col) grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Step `n` cells in `dir`, or `None` when that leaves the grid's
    /// non-negative quadrant. Upper bounds are the caller's job.
    pub fn step(self, dir: Direction, n: usize) -> Option<Pos> {
        let (dr, dc) = dir.delta();
        let row = offset(self.row, dr, n)?;
        let col = offset(self.col, dc, n)?;
        Some(Pos { row, col })
    }

    pub fn manhattan(self, other: Pos) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// Chebyshev distance, the metric of the square visibility window
    pub fn chebyshev(self, other: Pos) -> usize {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }
}

fn offset(v: usize, d: i32, n: usize) -> Option<usize> {
    match d {
        0 => Some(v),
        1 => v.checked_add(n),
        _ => v.checked_sub(n),
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Cardinal movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// (row delta, col delta)
    pub const fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub const fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub const fn is_vertical(&self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "u" | "north" | "n" => Ok(Direction::Up),
            "down" | "d" | "south" | "s" => Ok(Direction::Down),
            "left" | "l" | "west" | "w" => Ok(Direction::Left),
            "right" | "r" | "east" | "e" => Ok(Direction::Right),
            _ => Err(ValidationError::UnknownDirection(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_stops_at_zero() {
        let p = Pos::new(0, 3);
        assert_eq!(p.step(Direction::Up, 1), None);
        assert_eq!(p.step(Direction::Down, 2), Some(Pos::new(2, 3)));
        assert_eq!(p.step(Direction::Left, 3), Some(Pos::new(0, 0)));
    }

    #[test]
    fn distances() {
        let a = Pos::new(1, 1);
        let b = Pos::new(4, 3);
        assert_eq!(a.manhattan(b), 5);
        assert_eq!(a.chebyshev(b), 3);
    }

    #[test]
    fn parse_directions() {
        assert_eq!("UP".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("west".parse::<Direction>().unwrap(), Direction::Left);
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(ValidationError::UnknownDirection(_))
        ));
    }
}
