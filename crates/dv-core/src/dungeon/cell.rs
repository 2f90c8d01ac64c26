//! Map cell kinds

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// What occupies a single grid cell.
///
/// Stored grids hold every kind except `Fog`, which only exists in rendered
/// output. Snapshots encode each kind as its discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter)]
#[repr(u8)]
pub enum CellKind {
    #[default]
    Wall = 0,
    Path = 1,
    Start = 2,
    End = 3,
    StairsUp = 4,
    StairsDown = 5,
    Chest = 6,
    Trap = 7,
    Enemy = 8,
    Key = 9,
    Door = 10,
    Fog = 11,
}

impl CellKind {
    /// Anything a player can stand on
    pub const fn is_open(&self) -> bool {
        !matches!(self, CellKind::Wall | CellKind::Fog)
    }

    pub const fn is_stairs(&self) -> bool {
        matches!(self, CellKind::StairsUp | CellKind::StairsDown)
    }

    /// Start, end or stairs: the cells every floor must connect
    pub const fn is_landmark(&self) -> bool {
        matches!(
            self,
            CellKind::Start | CellKind::End | CellKind::StairsUp | CellKind::StairsDown
        )
    }

    /// Elements that are used up the first time someone steps on them
    pub const fn is_single_use(&self) -> bool {
        matches!(self, CellKind::Chest | CellKind::Trap | CellKind::Enemy)
    }

    /// Glyph for text dumps
    pub const fn symbol(&self) -> char {
        match self {
            CellKind::Wall => '#',
            CellKind::Path => '.',
            CellKind::Start => 'S',
            CellKind::End => 'E',
            CellKind::StairsUp => '<',
            CellKind::StairsDown => '>',
            CellKind::Chest => 'C',
            CellKind::Trap => 'T',
            CellKind::Enemy => 'X',
            CellKind::Key => 'k',
            CellKind::Door => '+',
            CellKind::Fog => ' ',
        }
    }

    /// Decode a stored cell. `Fog` is not a storable kind.
    pub const fn from_stored(code: u8) -> Option<Self> {
        Some(match code {
            0 => CellKind::Wall,
            1 => CellKind::Path,
            2 => CellKind::Start,
            3 => CellKind::End,
            4 => CellKind::StairsUp,
            5 => CellKind::StairsDown,
            6 => CellKind::Chest,
            7 => CellKind::Trap,
            8 => CellKind::Enemy,
            9 => CellKind::Key,
            10 => CellKind::Door,
            _ => return None,
        })
    }
}

impl Serialize for CellKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (*self as u8).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = u8::deserialize(deserializer)?;
        CellKind::from_stored(code).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid stored cell kind {code}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn stored_codes_round_trip() {
        for kind in CellKind::iter().filter(|k| *k != CellKind::Fog) {
            assert_eq!(CellKind::from_stored(kind as u8), Some(kind));
        }
        assert_eq!(CellKind::from_stored(CellKind::Fog as u8), None);
    }

    #[test]
    fn serializes_as_small_integer() {
        assert_eq!(serde_json::to_string(&CellKind::Trap).unwrap(), "7");
        let kind: CellKind = serde_json::from_str("4").unwrap();
        assert_eq!(kind, CellKind::StairsUp);
        assert!(serde_json::from_str::<CellKind>("11").is_err());
    }

    #[test]
    fn walls_are_closed() {
        assert!(!CellKind::Wall.is_open());
        assert!(CellKind::Trap.is_open());
        assert!(CellKind::Trap.is_single_use());
        assert!(!CellKind::Start.is_single_use());
    }
}
