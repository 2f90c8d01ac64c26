//! Fog of war
//!
//! Each player sees a square of radius `r` around themselves. What has been
//! seen stays revealed for good; the live square is only added at render time.

use super::coord::Pos;
use super::level::Floor;

/// Positions in the square of `radius` around `center`, clipped to the grid
pub fn square(center: Pos, radius: usize, width: usize, height: usize) -> impl Iterator<Item = Pos> {
    let rows = center.row.saturating_sub(radius)..(center.row + radius + 1).min(height);
    let cols = center.col.saturating_sub(radius)..(center.col + radius + 1).min(width);
    rows.flat_map(move |row| cols.clone().map(move |col| Pos::new(row, col)))
}

impl Floor {
    /// Mark the square around `center` as revealed
    pub fn reveal_around(&mut self, center: Pos, radius: usize) {
        for p in square(center, radius, self.width, self.height) {
            self.revealed[p.row][p.col] = true;
        }
    }

    /// Reveal around every player on this floor
    pub fn reveal_players(&mut self, radius: usize) {
        let centers: Vec<Pos> = self.players.values().copied().collect();
        for center in centers {
            self.reveal_around(center, radius);
        }
    }

    pub fn is_revealed(&self, pos: Pos) -> bool {
        self.revealed
            .get(pos.row)
            .and_then(|row| row.get(pos.col))
            .copied()
            .unwrap_or(false)
    }

    /// Revealed cells plus the live square around each player
    pub fn visibility(&self, radius: usize) -> Vec<Vec<bool>> {
        let mut mask = self.revealed.clone();
        for center in self.players.values() {
            for p in square(*center, radius, self.width, self.height) {
                mask[p.row][p.col] = true;
            }
        }
        mask
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed.iter().flatten().filter(|v| **v).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlayerId;

    #[test]
    fn square_clips_at_edges() {
        let cells: Vec<Pos> = square(Pos::new(0, 0), 1, 5, 5).collect();
        assert_eq!(cells.len(), 4);
        let cells: Vec<Pos> = square(Pos::new(2, 2), 1, 5, 5).collect();
        assert_eq!(cells.len(), 9);
        let cells: Vec<Pos> = square(Pos::new(4, 4), 2, 5, 5).collect();
        assert_eq!(cells.len(), 9);
    }

    #[test]
    fn visibility_does_not_persist() {
        let mut floor = Floor::new(0, 6, 6);
        floor.players.insert(PlayerId::from("a"), Pos::new(3, 3));
        let mask = floor.visibility(1);
        assert!(mask[2][2]);
        assert!(!floor.is_revealed(Pos::new(2, 2)));

        floor.reveal_players(1);
        assert!(floor.is_revealed(Pos::new(4, 4)));
        assert_eq!(floor.revealed_count(), 9);
    }
}
