//! Blur stamp: blend toward a box mean computed in two passes
//!
//! The window is clamped at the field edges, or wrapped around them for
//! seamless stamps so that both sides of a seam average the same texels.

use glam::Vec2;

use super::radial_falloff;
use super::stamp::{TouchedBounds, disc_bounds};
use crate::constants::NEUTRAL_TEXEL;
use crate::field::{FlowField, Texel};
use crate::types::DirtyRect;

/// Inclusive window `[c - k, c + k]` clamped to `[0, last]`
#[inline]
fn window(c: u32, k: u32, last: u32) -> (u32, u32) {
    (c.saturating_sub(k), (c + k).min(last))
}

/// Window in signed texel space, unclamped when the field wraps
#[inline]
fn signed_window(c: u32, k: u32, last: u32, wrap: bool) -> (i64, i64) {
    if wrap {
        (c as i64 - k as i64, c as i64 + k as i64)
    } else {
        let (lo, hi) = window(c, k, last);
        (lo as i64, hi as i64)
    }
}

/// Mean over `prefix[lo..=hi]` of an exclusive prefix-sum array
#[inline]
fn prefix_mean(prefix: &[[f64; 2]], lo: usize, hi: usize) -> [f64; 2] {
    let n = (hi - lo + 1) as f64;
    [
        (prefix[hi + 1][0] - prefix[lo][0]) / n,
        (prefix[hi + 1][1] - prefix[lo][1]) / n,
    ]
}

/// Row-major copy of the signed rectangle `[x0, x1] x [y0, y1]`, reading
/// out-of-field texels from the opposite edge
fn wrapped_snapshot(field: &FlowField, x0: i64, y0: i64, x1: i64, y1: i64) -> Vec<Texel> {
    let width = field.width() as i64;
    let height = field.height() as i64;
    let mut data = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
    for y in y0..=y1 {
        let wy = y.rem_euclid(height) as u32;
        for x in x0..=x1 {
            let wx = x.rem_euclid(width) as u32;
            data.push(field.get(wx, wy).unwrap_or(NEUTRAL_TEXEL));
        }
    }
    data
}

/// Blurred texels of one disc, computed before anything is written
#[derive(Debug, Clone, PartialEq)]
pub(super) struct BlurPatch {
    texels: Vec<(u32, u32, Texel)>,
}

impl BlurPatch {
    /// Write the patch, returning the bounds of the texels it changed
    pub(super) fn write(self, field: &mut FlowField) -> Option<DirtyRect> {
        let mut touched = TouchedBounds::default();
        for (x, y, texel) in self.texels {
            field.set(x, y, texel);
            touched.include(x, y);
        }
        touched.into_rect()
    }
}

/// Blur one disc without writing, reading neighbourhoods from `field`
pub(super) fn blur_patch(
    field: &FlowField,
    center: Vec2,
    radius: f32,
    strength: f32,
    threshold: f32,
    window_factor: f32,
    wrap: bool,
) -> Option<BlurPatch> {
    let bounds = disc_bounds(center, radius, field.width(), field.height())?;
    let k = ((radius * window_factor) as u32).max(1);
    let last_x = field.width() - 1;
    let last_y = field.height() - 1;

    // Snapshot covers the disc bounds plus the window on every side
    let (sx0, _) = signed_window(bounds.x, k, last_x, wrap);
    let (_, sx1) = signed_window(bounds.right() - 1, k, last_x, wrap);
    let (sy0, _) = signed_window(bounds.y, k, last_y, wrap);
    let (_, sy1) = signed_window(bounds.bottom() - 1, k, last_y, wrap);
    let snapshot = if wrap {
        wrapped_snapshot(field, sx0, sy0, sx1, sy1)
    } else {
        let rect = DirtyRect::from_inclusive(sx0 as u32, sy0 as u32, sx1 as u32, sy1 as u32);
        field.region(rect).ok()?
    };
    let snap_w = (sx1 - sx0 + 1) as usize;
    let snap_h = (sy1 - sy0 + 1) as usize;
    let cols = bounds.width as usize;

    // Horizontal pass: row means for every snapshot row, target columns only
    let mut row_means = vec![[0.0f64; 2]; snap_h * cols];
    let mut prefix = vec![[0.0f64; 2]; snap_w + 1];
    for row in 0..snap_h {
        let src = &snapshot[row * snap_w..(row + 1) * snap_w];
        for (i, texel) in src.iter().enumerate() {
            prefix[i + 1] = [
                prefix[i][0] + texel[0] as f64,
                prefix[i][1] + texel[1] as f64,
            ];
        }
        for col in 0..cols {
            let (lo, hi) = signed_window(bounds.x + col as u32, k, last_x, wrap);
            row_means[row * cols + col] =
                prefix_mean(&prefix, (lo - sx0) as usize, (hi - sx0) as usize);
        }
    }

    // Vertical pass over the row means gives the full window mean
    let mut column_prefix = vec![[0.0f64; 2]; snap_h + 1];
    let mut means: Vec<Texel> = vec![[0.0; 2]; cols * bounds.height as usize];
    for col in 0..cols {
        for row in 0..snap_h {
            let m = row_means[row * cols + col];
            column_prefix[row + 1] = [column_prefix[row][0] + m[0], column_prefix[row][1] + m[1]];
        }
        for dy in 0..bounds.height {
            let (lo, hi) = signed_window(bounds.y + dy, k, last_y, wrap);
            let mean = prefix_mean(&column_prefix, (lo - sy0) as usize, (hi - sy0) as usize);
            means[dy as usize * cols + col] = [mean[0] as f32, mean[1] as f32];
        }
    }

    let radius_sq = radius * radius;
    let mut texels = Vec::new();
    for py in bounds.y..bounds.bottom() {
        let dy = py as f32 - center.y;
        for px in bounds.x..bounds.right() {
            let dx = px as f32 - center.x;
            let falloff = radial_falloff(dx * dx + dy * dy, radius_sq);
            if falloff <= threshold {
                continue;
            }
            let blend = (falloff * strength).min(1.0);
            let mean = means[(py - bounds.y) as usize * cols + (px - bounds.x) as usize];
            let snap_index = (py as i64 - sy0) as usize * snap_w + (px as i64 - sx0) as usize;
            let texel = snapshot[snap_index];
            texels.push((
                px,
                py,
                [
                    texel[0] * (1.0 - blend) + mean[0] * blend,
                    texel[1] * (1.0 - blend) + mean[1] * blend,
                ],
            ));
        }
    }
    Some(BlurPatch { texels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::{BrushRasterizer, BrushStamp};

    fn apply_blur(
        field: &mut FlowField,
        center: Vec2,
        radius: f32,
        strength: f32,
        threshold: f32,
        window_factor: f32,
        wrap: bool,
    ) -> Option<DirtyRect> {
        blur_patch(field, center, radius, strength, threshold, window_factor, wrap)?.write(field)
    }

    #[test]
    fn test_window_clamps() {
        assert_eq!(window(1, 3, 10), (0, 4));
        assert_eq!(window(9, 3, 10), (6, 10));
    }

    #[test]
    fn test_separable_mean_matches_nested_mean() {
        let mut field = FlowField::new(20, 20).unwrap();
        for y in 0..20 {
            for x in 0..20 {
                field.set(x, y, [(x as f32 * 0.37).fract(), (y as f32 * 0.61).fract()]);
            }
        }
        let original = field.clone();
        let center = Vec2::new(3.0, 4.0);
        let radius = 6.0;
        apply_blur(&mut field, center, radius, 1.0, 0.01, 0.5, false).unwrap();

        // Nested per-texel window mean, clamped to the field
        let k = 3u32;
        let (x, y) = (3u32, 4u32);
        let (x0, x1) = window(x, k, 19);
        let (y0, y1) = window(y, k, 19);
        let mut sum = [0.0f64; 2];
        for yy in y0..=y1 {
            for xx in x0..=x1 {
                let t = original.get(xx, yy).unwrap();
                sum[0] += t[0] as f64;
                sum[1] += t[1] as f64;
            }
        }
        let n = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
        let got = field.get(x, y).unwrap();
        // Center has falloff 1 and strength 1, so it equals the mean
        assert!((got[0] as f64 - sum[0] / n).abs() < 1e-5);
        assert!((got[1] as f64 - sum[1] / n).abs() < 1e-5);
    }

    #[test]
    fn test_wrapped_window_reads_across_seam() {
        // Column 0 is 1.0, the rest neutral
        let mut field = FlowField::new(16, 16).unwrap();
        for y in 0..16 {
            field.set(0, y, [1.0, 0.5]);
        }
        let original = field.clone();

        // Stamp on the right edge: the wrapped 3x3 window at (15, 8) reaches column 0
        let mut wrapped = original.clone();
        apply_blur(&mut wrapped, Vec2::new(15.0, 8.0), 5.0, 1.0, 0.01, 0.25, true).unwrap();
        let got = wrapped.get(15, 8).unwrap();
        assert!((got[0] - (0.5 + 0.5 / 3.0)).abs() < 1e-5, "{got:?}");

        // Clamped window never sees column 0
        let mut clamped = original.clone();
        apply_blur(&mut clamped, Vec2::new(15.0, 8.0), 5.0, 1.0, 0.01, 0.25, false).unwrap();
        assert_eq!(clamped.get(15, 8), Some([0.5, 0.5]));
    }

    #[test]
    fn test_seamless_blur_matches_across_edge() {
        let rasterizer = BrushRasterizer::default();
        let mut field = FlowField::new(32, 32).unwrap();
        for y in 0..32 {
            for x in 0..32 {
                field.set(x, y, [(x as f32 * 0.29).fract(), (y as f32 * 0.53).fract()]);
            }
        }
        let mut shifted = FlowField::new(32, 32).unwrap();
        for y in 0..32 {
            for x in 0..32 {
                shifted.set((x + 16) % 32, y, field.get(x, y).unwrap());
            }
        }

        // The same stamp on a torus shifted by half a period lands identically
        let stamp = BrushStamp::blur(Vec2::new(30.0, 12.0), 6.0, 1.0).with_wrap(true);
        let moved = BrushStamp::blur(Vec2::new(14.0, 12.0), 6.0, 1.0).with_wrap(true);
        rasterizer.apply_stamp(&mut field, &stamp);
        rasterizer.apply_stamp(&mut shifted, &moved);
        for y in 0..32 {
            for x in 0..32 {
                let a = field.get(x, y).unwrap();
                let b = shifted.get((x + 16) % 32, y).unwrap();
                assert!((a[0] - b[0]).abs() < 1e-5 && (a[1] - b[1]).abs() < 1e-5, "({x}, {y})");
            }
        }
    }
}
