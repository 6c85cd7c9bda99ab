//! Tile addressing used for undo snapshots

use serde::{Deserialize, Serialize};

use crate::types::DirtyRect;

/// Tile coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

/// Pixel bounds of a tile, clipped at the field edge
pub fn tile_bounds(coord: TileCoord, tile_size: u32, width: u32, height: u32) -> DirtyRect {
    let start_x = coord.x * tile_size;
    let start_y = coord.y * tile_size;
    let tile_width = tile_size.min(width.saturating_sub(start_x));
    let tile_height = tile_size.min(height.saturating_sub(start_y));
    DirtyRect::new(start_x, start_y, tile_width, tile_height)
}

/// All tiles touched by a rectangle
pub fn tiles_overlapping(rect: DirtyRect, tile_size: u32) -> impl Iterator<Item = TileCoord> {
    let (x0, y0, x1, y1) = if rect.is_empty() {
        (1, 1, 0, 0)
    } else {
        (
            rect.x / tile_size,
            rect.y / tile_size,
            (rect.right() - 1) / tile_size,
            (rect.bottom() - 1) / tile_size,
        )
    };
    (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| TileCoord { x, y }))
}
