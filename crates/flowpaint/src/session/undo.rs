//! Tile snapshots taken while a stroke runs

use std::collections::HashMap;

use tracing::debug;

use crate::constants::DEFAULT_TILE_SIZE;
use crate::field::{FieldError, FlowField, Texel, TileCoord, tile_bounds, tiles_overlapping};
use crate::types::DirtyRect;

/// Before/after texels of one tile
#[derive(Debug, Clone, PartialEq)]
pub struct TilePatch {
    pub rect: DirtyRect,
    pub before: Vec<Texel>,
    pub after: Vec<Texel>,
}

/// Everything a stroke changed, as per-tile snapshots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeDiff {
    pub tiles: HashMap<TileCoord, TilePatch>,
}

impl StrokeDiff {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Rectangles of all changed tiles
    pub fn dirty_rects(&self) -> Vec<DirtyRect> {
        self.tiles.values().map(|patch| patch.rect).collect()
    }

    /// Fail before writing anything if a tile no longer fits the field
    fn check_fits(&self, field: &FlowField) -> Result<(), FieldError> {
        match self
            .tiles
            .values()
            .find(|patch| patch.rect.right() > field.width() || patch.rect.bottom() > field.height())
        {
            Some(patch) => Err(FieldError::RegionOutOfBounds {
                rect: patch.rect,
                width: field.width(),
                height: field.height(),
            }),
            None => Ok(()),
        }
    }

    /// Restore the pre-stroke texels
    pub fn revert(&self, field: &mut FlowField) -> Result<Vec<DirtyRect>, FieldError> {
        self.check_fits(field)?;
        for patch in self.tiles.values() {
            field.write_region(patch.rect, &patch.before)?;
        }
        Ok(self.dirty_rects())
    }

    /// Re-apply the post-stroke texels
    pub fn reapply(&self, field: &mut FlowField) -> Result<Vec<DirtyRect>, FieldError> {
        self.check_fits(field)?;
        for patch in self.tiles.values() {
            field.write_region(patch.rect, &patch.after)?;
        }
        Ok(self.dirty_rects())
    }
}

/// Collects pre-modification tiles the first time a stroke touches them
#[derive(Debug, Clone)]
pub struct StrokeCapture {
    tile_size: u32,
    before: HashMap<TileCoord, (DirtyRect, Vec<Texel>)>,
}

impl Default for StrokeCapture {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_SIZE)
    }
}

impl StrokeCapture {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size: tile_size.max(1),
            before: HashMap::new(),
        }
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.before.len()
    }

    /// Snapshot every not-yet-captured tile overlapping `rect`
    pub fn capture(&mut self, field: &FlowField, rect: DirtyRect) {
        for coord in tiles_overlapping(rect, self.tile_size) {
            if self.before.contains_key(&coord) {
                continue;
            }
            let bounds = tile_bounds(coord, self.tile_size, field.width(), field.height());
            if let Ok(texels) = field.region(bounds) {
                self.before.insert(coord, (bounds, texels));
            }
        }
    }

    /// Pair captured tiles with their current contents; unchanged tiles are dropped
    pub fn finish(self, field: &FlowField) -> StrokeDiff {
        let captured = self.before.len();
        let tiles: HashMap<TileCoord, TilePatch> = self
            .before
            .into_iter()
            .filter_map(|(coord, (rect, before))| {
                let after = field.region(rect).ok()?;
                (after != before).then_some((coord, TilePatch { rect, before, after }))
            })
            .collect();
        debug!(
            "StrokeCapture::finish: {} tiles captured, {} changed",
            captured,
            tiles.len()
        );
        StrokeDiff { tiles }
    }
}
