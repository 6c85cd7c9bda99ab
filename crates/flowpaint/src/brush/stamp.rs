//! Per-texel disc rasterization for flow and erase stamps

use glam::Vec2;

use super::radial_falloff;
use crate::constants::NEUTRAL_CHANNEL;
use crate::field::{FlowField, Texel};
use crate::types::DirtyRect;

/// What happens to a texel under the disc
#[derive(Debug, Clone, Copy)]
pub(super) enum TexelOp {
    /// Linear blend toward an encoded flow texel
    Paint(Texel),
    /// Clamp the deviation from neutral to `(1 - blend) * 0.5`
    Erase,
}

/// Candidate texel bounds of a disc, clamped to the field
pub(super) fn disc_bounds(center: Vec2, radius: f32, width: u32, height: u32) -> Option<DirtyRect> {
    let x_min = (center.x - radius).floor().max(0.0);
    let y_min = (center.y - radius).floor().max(0.0);
    let x_max = (center.x + radius).ceil().min(width as f32 - 1.0);
    let y_max = (center.y + radius).ceil().min(height as f32 - 1.0);

    if x_min > x_max || y_min > y_max {
        return None;
    }
    Some(DirtyRect::from_inclusive(
        x_min as u32,
        y_min as u32,
        x_max as u32,
        y_max as u32,
    ))
}

/// Inclusive bounds accumulator for touched texels
#[derive(Debug, Default)]
pub(super) struct TouchedBounds(Option<(u32, u32, u32, u32)>);

impl TouchedBounds {
    #[inline]
    pub(super) fn include(&mut self, x: u32, y: u32) {
        self.0 = Some(match self.0 {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    pub(super) fn into_rect(self) -> Option<DirtyRect> {
        self.0
            .map(|(x0, y0, x1, y1)| DirtyRect::from_inclusive(x0, y0, x1, y1))
    }
}

#[inline]
fn erase_texel(texel: Texel, blend: f32) -> Texel {
    let dx = texel[0] - NEUTRAL_CHANNEL;
    let dy = texel[1] - NEUTRAL_CHANNEL;
    let len = (dx * dx + dy * dy).sqrt();
    let max_len = (1.0 - blend) * 0.5;
    if len <= max_len {
        return texel;
    }
    let scale = max_len / len;
    [NEUTRAL_CHANNEL + dx * scale, NEUTRAL_CHANNEL + dy * scale]
}

/// Rasterize one disc. Returns the exact bounds of texels with falloff > 0.
pub(super) fn apply_disc(
    field: &mut FlowField,
    center: Vec2,
    radius: f32,
    strength: f32,
    op: TexelOp,
) -> Option<DirtyRect> {
    let bounds = disc_bounds(center, radius, field.width(), field.height())?;
    let radius_sq = radius * radius;
    let stride = field.width() as usize;
    let texels = field.texels_mut();
    let mut touched = TouchedBounds::default();

    for py in bounds.y..bounds.bottom() {
        let dy = py as f32 - center.y;
        let row = py as usize * stride;
        for px in bounds.x..bounds.right() {
            let dx = px as f32 - center.x;
            let falloff = radial_falloff(dx * dx + dy * dy, radius_sq);
            if falloff <= 0.0 {
                continue;
            }
            let blend = (falloff * strength).min(1.0);
            let texel = &mut texels[row + px as usize];
            *texel = match op {
                TexelOp::Paint(target) => [
                    texel[0] * (1.0 - blend) + target[0] * blend,
                    texel[1] * (1.0 - blend) + target[1] * blend,
                ],
                TexelOp::Erase => erase_texel(*texel, blend),
            };
            touched.include(px, py);
        }
    }

    touched.into_rect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disc_bounds_clamped() {
        let rect = disc_bounds(Vec2::new(2.0, 2.0), 5.0, 16, 16).unwrap();
        assert_eq!(rect, DirtyRect::from_inclusive(0, 0, 7, 7));
        assert!(disc_bounds(Vec2::new(40.0, 2.0), 5.0, 16, 16).is_none());
    }

    #[test]
    fn test_erase_texel_limits_deviation() {
        let out = erase_texel([1.0, 0.5], 0.5);
        assert!((out[0] - 0.75).abs() < 1e-6);
        // Already within the allowed deviation
        assert_eq!(erase_texel([0.6, 0.5], 0.5), [0.6, 0.5]);
    }
}
