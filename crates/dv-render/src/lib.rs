//! dv-render: Pixel rendering of dungeon floors
//!
//! One floor becomes one `RgbImage`: a `cell_size` square per grid cell,
//! hidden cells drawn as fog, players as coloured discs and a footer bar
//! showing progress through the floors. Rendering is pure; encoding to PNG
//! is a separate step.

pub mod palette;

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use thiserror::Error;

use dv_core::PLAYER_PALETTE_SIZE;
use dv_core::config::DelveConfig;
use dv_core::dungeon::{CellKind, Dungeon, Floor, Pos};

/// Height of the progress bar under the map
pub const FOOTER_HEIGHT: u32 = 20;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Pixels per grid cell
    pub cell_size: u32,
    /// Hide what nobody has seen
    pub fog: bool,
    /// Live sight radius around each player
    pub radius: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            cell_size: 32,
            fog: true,
            radius: 1,
        }
    }
}

impl RenderOptions {
    pub fn from_config(config: &DelveConfig) -> Self {
        Self {
            cell_size: config.render.cell_size.max(4),
            fog: config.fog.enabled,
            radius: config.fog.radius,
        }
    }
}

/// Render one floor of `dungeon`. An index past the last floor renders
/// floor 0 instead.
pub fn render(dungeon: &Dungeon, floor_index: usize, options: &RenderOptions) -> RgbImage {
    let index = if floor_index < dungeon.floor_count() {
        floor_index
    } else {
        0
    };
    let Some(floor) = dungeon.floor(index) else {
        return RgbImage::new(options.cell_size, options.cell_size + FOOTER_HEIGHT);
    };

    let cell = options.cell_size;
    let map_w = floor.width as u32 * cell;
    let map_h = floor.height as u32 * cell;
    let mut img = RgbImage::from_pixel(map_w, map_h + FOOTER_HEIGHT, Rgb([100, 100, 100]));

    draw_cells(&mut img, floor, options);
    draw_grid(&mut img, floor, cell);
    for (id, pos) in &floor.players {
        let color = palette::PLAYERS[id.palette_index(PLAYER_PALETTE_SIZE)];
        draw_player(&mut img, *pos, cell, color);
    }
    draw_footer(&mut img, dungeon, index, map_h);
    img
}

/// Encode a rendered image as PNG bytes
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// What a viewer is shown at `pos`
pub fn shown_kind(floor: &Floor, visible: &[Vec<bool>], pos: Pos) -> CellKind {
    let seen = visible
        .get(pos.row)
        .and_then(|row| row.get(pos.col))
        .copied()
        .unwrap_or(false);
    if seen { floor.cell(pos) } else { CellKind::Fog }
}

fn has_glyph(kind: CellKind) -> bool {
    kind.is_landmark() || kind.is_single_use()
}

fn draw_cells(img: &mut RgbImage, floor: &Floor, options: &RenderOptions) {
    let visible = if options.fog {
        floor.visibility(options.radius)
    } else {
        vec![vec![true; floor.width]; floor.height]
    };
    let cell = options.cell_size;
    for pos in floor.positions() {
        let kind = shown_kind(floor, &visible, pos);
        let (x, y) = (pos.col as u32 * cell, pos.row as u32 * cell);
        fill_rect(img, x, y, cell, cell, palette::cell(kind));
        if has_glyph(kind) {
            let inset = cell / 3;
            fill_rect(img, x + inset, y + inset, cell - 2 * inset, cell - 2 * inset, palette::GLYPH);
        }
    }
}

/// One-pixel lines on every cell edge
fn draw_grid(img: &mut RgbImage, floor: &Floor, cell: u32) {
    let (w, h) = (floor.width as u32 * cell, floor.height as u32 * cell);
    for i in 0..=floor.width as u32 {
        fill_rect(img, (i * cell).min(w - 1), 0, 1, h, palette::GRID_LINE);
    }
    for j in 0..=floor.height as u32 {
        fill_rect(img, 0, (j * cell).min(h - 1), w, 1, palette::GRID_LINE);
    }
}

fn draw_player(img: &mut RgbImage, pos: Pos, cell: u32, color: Rgb<u8>) {
    let cx = (pos.col as u32 * cell + cell / 2) as i64;
    let cy = (pos.row as u32 * cell + cell / 2) as i64;
    let r = (cell / 3) as i64;
    let inner = (r - 2).max(0);
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = dx * dx + dy * dy;
            if d2 > r * r {
                continue;
            }
            let (px, py) = (cx + dx, cy + dy);
            if px < 0 || py < 0 || px >= img.width() as i64 || py >= img.height() as i64 {
                continue;
            }
            let c = if d2 > inner * inner { palette::PLAYER_OUTLINE } else { color };
            img.put_pixel(px as u32, py as u32, c);
        }
    }
}

/// Progress segments, one per floor, plus a difficulty swatch
fn draw_footer(img: &mut RgbImage, dungeon: &Dungeon, index: usize, top: u32) {
    let width = img.width();
    fill_rect(img, 0, top, width, FOOTER_HEIGHT, palette::FOOTER);

    let swatch = FOOTER_HEIGHT - 8;
    fill_rect(
        img,
        width.saturating_sub(swatch + 4),
        top + 4,
        swatch,
        swatch,
        palette::difficulty(dungeon.params.difficulty),
    );

    let count = dungeon.floor_count().max(1) as u32;
    let track = width.saturating_sub(swatch + 16);
    let seg = (track / count).max(1);
    for i in 0..count {
        let color = match (i as usize).cmp(&index) {
            std::cmp::Ordering::Less => palette::SEGMENT_DONE,
            std::cmp::Ordering::Equal => palette::SEGMENT_CURRENT,
            std::cmp::Ordering::Greater => palette::SEGMENT_AHEAD,
        };
        let x = 4 + i * seg;
        if x >= track + 4 {
            break;
        }
        fill_rect(img, x, top + 6, seg.saturating_sub(2).max(1), FOOTER_HEIGHT - 12, color);
    }
}

/// Fill a rectangle, clipped to the image
fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let (iw, ih) = (img.width(), img.height());
    for py in y..(y + h).min(ih) {
        for px in x..(x + w).min(iw) {
            img.put_pixel(px, py, color);
        }
    }
}
