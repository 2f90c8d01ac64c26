//! Colours

use image::Rgb;

use dv_core::dungeon::{CellKind, DifficultyTier};

pub const GRID_LINE: Rgb<u8> = Rgb([0, 0, 0]);
pub const GLYPH: Rgb<u8> = Rgb([0, 0, 0]);
pub const FOOTER: Rgb<u8> = Rgb([0, 0, 0]);
pub const SEGMENT_DONE: Rgb<u8> = Rgb([90, 90, 90]);
pub const SEGMENT_CURRENT: Rgb<u8> = Rgb([255, 255, 255]);
pub const SEGMENT_AHEAD: Rgb<u8> = Rgb([40, 40, 40]);
pub const PLAYER_OUTLINE: Rgb<u8> = Rgb([0, 0, 0]);

/// Player disc colours, indexed by `PlayerId::palette_index`
pub const PLAYERS: [Rgb<u8>; dv_core::PLAYER_PALETTE_SIZE] = [
    Rgb([255, 0, 0]),
    Rgb([0, 0, 255]),
    Rgb([0, 255, 0]),
    Rgb([255, 255, 0]),
    Rgb([255, 0, 255]),
    Rgb([0, 255, 255]),
    Rgb([255, 165, 0]),
    Rgb([128, 0, 128]),
];

pub const fn cell(kind: CellKind) -> Rgb<u8> {
    match kind {
        CellKind::Wall => Rgb([50, 50, 50]),
        CellKind::Path => Rgb([200, 200, 200]),
        CellKind::Start => Rgb([0, 255, 0]),
        CellKind::End => Rgb([255, 0, 0]),
        CellKind::StairsUp | CellKind::StairsDown => Rgb([150, 75, 0]),
        CellKind::Chest => Rgb([255, 215, 0]),
        CellKind::Trap => Rgb([255, 0, 255]),
        CellKind::Enemy => Rgb([220, 100, 100]),
        CellKind::Door => Rgb([140, 100, 50]),
        CellKind::Key => Rgb([150, 150, 150]),
        CellKind::Fog => Rgb([30, 30, 30]),
    }
}

/// Swatch at the right end of the footer
pub const fn difficulty(tier: DifficultyTier) -> Rgb<u8> {
    match tier {
        DifficultyTier::Easy => Rgb([0, 200, 0]),
        DifficultyTier::Normal => Rgb([230, 200, 0]),
        DifficultyTier::Hard => Rgb([230, 120, 0]),
        DifficultyTier::Lunatic => Rgb([200, 0, 0]),
    }
}
