//! Brush rasterizer
//!
//! A stamp is a disc of radius `r` around a texel-space center. Every texel
//! inside the disc gets a blend weight `falloff(d) * strength` with
//! `falloff(d) = clamp(1 - d²/r², 0, 1)²`, measured from the texel's integer
//! coordinates. What the weight is used for depends on the [`StampKind`].
//!
//! With `wrap` set the field is a torus: the center is reduced into the
//! field and the stamp is repeated at `center ± size` on every axis where the
//! disc crosses an edge.

mod blur;
mod seamless;
mod stamp;

pub use seamless::mirror_centers;

use glam::Vec2;
use tracing::debug;

use crate::config::BrushConfig;
use crate::field::{FlowField, encode_flow};
use crate::types::{BrushMode, DirtyRect};
use crate::validation::validate_stamp;

use stamp::TexelOp;

/// What a stamp writes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StampKind {
    /// Blend toward the encoding of this flow vector
    Flow(Vec2),
    /// Pull toward the zero vector
    Erase,
    /// Blend toward the local neighborhood mean
    Blur,
}

impl StampKind {
    pub fn mode(&self) -> BrushMode {
        match self {
            StampKind::Flow(_) => BrushMode::Flow,
            StampKind::Erase => BrushMode::Erase,
            StampKind::Blur => BrushMode::Blur,
        }
    }
}

/// One discrete brush application
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushStamp {
    /// Center in texel coordinates
    pub center: Vec2,
    /// Radius in texels
    pub radius: f32,
    pub kind: StampKind,
    /// Blend multiplier, 0.0-1.0
    pub strength: f32,
    /// Seamless (toroidal) application
    pub wrap: bool,
}

impl BrushStamp {
    pub fn flow(center: Vec2, radius: f32, flow: Vec2, strength: f32) -> Self {
        Self {
            center,
            radius,
            kind: StampKind::Flow(flow),
            strength,
            wrap: false,
        }
    }

    pub fn erase(center: Vec2, radius: f32, strength: f32) -> Self {
        Self {
            kind: StampKind::Erase,
            ..Self::flow(center, radius, Vec2::ZERO, strength)
        }
    }

    pub fn blur(center: Vec2, radius: f32, strength: f32) -> Self {
        Self {
            kind: StampKind::Blur,
            ..Self::flow(center, radius, Vec2::ZERO, strength)
        }
    }

    /// Stamp for a brush mode; `flow` is ignored outside [`BrushMode::Flow`]
    pub fn for_mode(mode: BrushMode, center: Vec2, radius: f32, flow: Vec2, strength: f32) -> Self {
        match mode {
            BrushMode::Flow => Self::flow(center, radius, flow, strength),
            BrushMode::Erase => Self::erase(center, radius, strength),
            BrushMode::Blur => Self::blur(center, radius, strength),
        }
    }

    pub fn with_wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }
}

/// Radial falloff `clamp(1 - d²/r², 0, 1)²`
#[inline]
pub fn radial_falloff(dist_sq: f32, radius_sq: f32) -> f32 {
    let t = (1.0 - dist_sq / radius_sq).clamp(0.0, 1.0);
    t * t
}

/// Applies stamps to a [`FlowField`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushRasterizer {
    /// Blur leaves texels with falloff at or below this untouched
    pub blur_threshold: f32,
    /// Blur window half-size as a fraction of the radius
    pub blur_window: f32,
}

impl Default for BrushRasterizer {
    fn default() -> Self {
        Self {
            blur_threshold: 0.01,
            blur_window: 0.2,
        }
    }
}

impl From<&BrushConfig> for BrushRasterizer {
    fn from(config: &BrushConfig) -> Self {
        Self {
            blur_threshold: config.blur_threshold,
            blur_window: config.blur_window,
        }
    }
}

impl BrushRasterizer {
    /// Centers the stamp is applied at: the main center first, then mirrors
    pub fn stamp_centers(&self, field: &FlowField, stamp: &BrushStamp) -> Vec<Vec2> {
        if !stamp.wrap {
            return vec![stamp.center];
        }
        let center = stamp.center.rem_euclid(field.size());
        let mut centers = vec![center];
        centers.extend(mirror_centers(
            center,
            stamp.radius,
            field.width(),
            field.height(),
        ));
        centers
    }

    /// Conservative texel bounds a stamp may write, one per applied center
    ///
    /// Used to snapshot the field before the stamp lands.
    pub fn footprint(&self, field: &FlowField, stamp: &BrushStamp) -> Vec<DirtyRect> {
        if validate_stamp(stamp).is_err() {
            return Vec::new();
        }
        self.stamp_centers(field, stamp)
            .into_iter()
            .filter_map(|c| stamp::disc_bounds(c, stamp.radius, field.width(), field.height()))
            .collect()
    }

    /// Apply a stamp, returning the exact bounds of modified texels per
    /// applied center (main and mirrors)
    ///
    /// Invalid stamps are skipped and leave the field untouched.
    pub fn apply_stamp(&self, field: &mut FlowField, stamp: &BrushStamp) -> Vec<DirtyRect> {
        if let Err(err) = validate_stamp(stamp) {
            debug!("BrushRasterizer::apply_stamp: skipped ({})", err);
            return Vec::new();
        }
        if stamp.strength <= 0.0 {
            return Vec::new();
        }

        let centers = self.stamp_centers(field, stamp);
        debug!(
            "BrushRasterizer::apply_stamp: center=({:.1}, {:.1}), radius={:.1}, strength={:.2}, kind={:?}, copies={}",
            stamp.center.x,
            stamp.center.y,
            stamp.radius,
            stamp.strength,
            stamp.kind,
            centers.len()
        );

        if matches!(stamp.kind, StampKind::Blur) {
            // Every copy reads the pre-stamp field before any is written
            let source: &FlowField = field;
            let patches: Vec<_> = centers
                .into_iter()
                .filter_map(|center| {
                    blur::blur_patch(
                        source,
                        center,
                        stamp.radius,
                        stamp.strength,
                        self.blur_threshold,
                        self.blur_window,
                        stamp.wrap,
                    )
                })
                .collect();
            return patches.into_iter().filter_map(|patch| patch.write(field)).collect();
        }

        centers
            .into_iter()
            .filter_map(|center| match stamp.kind {
                StampKind::Flow(flow) => stamp::apply_disc(
                    field,
                    center,
                    stamp.radius,
                    stamp.strength,
                    TexelOp::Paint(encode_flow(flow)),
                ),
                StampKind::Erase => {
                    stamp::apply_disc(field, center, stamp.radius, stamp.strength, TexelOp::Erase)
                }
                StampKind::Blur => None,
            })
            .collect()
    }
}
