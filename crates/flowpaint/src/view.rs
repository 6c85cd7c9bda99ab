//! Screen, scene and texel coordinate mapping.
//!
//! - Screen: viewport pixels, origin top-left, Y down.
//! - Scene: texture UV space, `[0, 1)²` covers the field, Y up.
//! - Texel: `scene * field_size`, row `y` matches V.
//!
//! The texture is cover-fitted to the viewport: its aspect ratio is kept and
//! the axis that overflows is cropped symmetrically. Zoom scales about the
//! scene origin and pan offsets in scene units.
//!
//! The transform state and both mappings run in `f64` so that a screen point
//! survives a scene round trip to well under a hundredth of a pixel at any
//! zoom. Callers drop to `f32` once they are in scene or texel space.

use glam::{DVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::ViewConfig;

/// Pan/zoom state plus the cover-fit derived from viewport and texture sizes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Pan offset in scene units
    pub pan: DVec2,
    /// Zoom factor, clamped to `[min_zoom, max_zoom]`
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    viewport: DVec2,
    texture: DVec2,
    fit_scale: DVec2,
    fit_offset: DVec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(Vec2::ONE, Vec2::ONE)
    }
}

impl ViewTransform {
    /// Identity pan/zoom for a viewport and texture size (both in pixels)
    pub fn new(viewport: Vec2, texture: Vec2) -> Self {
        let config = ViewConfig::default();
        let mut view = Self {
            pan: DVec2::ZERO,
            zoom: 1.0,
            min_zoom: f64::from(config.min_zoom),
            max_zoom: f64::from(config.max_zoom),
            viewport: sanitize_size(viewport),
            texture: sanitize_size(texture),
            fit_scale: DVec2::ONE,
            fit_offset: DVec2::ZERO,
        };
        view.refit();
        view
    }

    /// Apply zoom limits from configuration
    pub fn with_limits(mut self, config: &ViewConfig) -> Self {
        self.min_zoom = f64::from(config.min_zoom);
        self.max_zoom = f64::from(config.max_zoom).max(self.min_zoom);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
        self
    }

    fn refit(&mut self) {
        let viewport_aspect = self.viewport.x / self.viewport.y;
        let texture_aspect = self.texture.x / self.texture.y;
        if texture_aspect > viewport_aspect {
            // Texture is wider: crop left and right
            self.fit_scale = DVec2::new(viewport_aspect / texture_aspect, 1.0);
            self.fit_offset = DVec2::new((1.0 - self.fit_scale.x) * 0.5, 0.0);
        } else {
            self.fit_scale = DVec2::new(1.0, texture_aspect / viewport_aspect);
            self.fit_offset = DVec2::new(0.0, (1.0 - self.fit_scale.y) * 0.5);
        }
    }

    #[inline]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[inline]
    pub fn viewport(&self) -> DVec2 {
        self.viewport
    }

    #[inline]
    pub fn texture_size(&self) -> DVec2 {
        self.texture
    }

    #[inline]
    pub fn fit_scale(&self) -> DVec2 {
        self.fit_scale
    }

    #[inline]
    pub fn fit_offset(&self) -> DVec2 {
        self.fit_offset
    }

    pub fn resize_viewport(&mut self, viewport: Vec2) {
        self.viewport = sanitize_size(viewport);
        self.refit();
    }

    pub fn set_texture_size(&mut self, texture: Vec2) {
        self.texture = sanitize_size(texture);
        self.refit();
    }

    /// Set zoom about the scene origin, clamped
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Screen pixel to fitted texture coordinates before zoom and pan
    #[inline]
    fn screen_to_fit(&self, screen: DVec2) -> DVec2 {
        let normalized = DVec2::new(screen.x / self.viewport.x, 1.0 - screen.y / self.viewport.y);
        normalized * self.fit_scale + self.fit_offset
    }

    pub fn screen_to_scene(&self, screen: DVec2) -> DVec2 {
        self.screen_to_fit(screen) / self.zoom - self.pan
    }

    pub fn scene_to_screen(&self, scene: DVec2) -> DVec2 {
        let fit = (scene + self.pan) * self.zoom;
        let normalized = (fit - self.fit_offset) / self.fit_scale;
        DVec2::new(
            normalized.x * self.viewport.x,
            (1.0 - normalized.y) * self.viewport.y,
        )
    }

    /// Scene position under a pointer, narrowed for texel maths
    #[inline]
    pub fn pointer_to_scene(&self, screen: Vec2) -> Vec2 {
        self.screen_to_scene(screen.as_dvec2()).as_vec2()
    }

    /// Pan so that content follows a pointer drag of `delta` pixels
    pub fn pan_by_pixels(&mut self, delta: Vec2) {
        if !delta.is_finite() {
            return;
        }
        let delta = delta.as_dvec2();
        let fit_delta = self.fit_scale * DVec2::new(delta.x / self.viewport.x, -delta.y / self.viewport.y);
        self.pan += fit_delta / self.zoom;
    }

    /// Change zoom keeping the scene point under `screen` fixed
    pub fn zoom_about(&mut self, screen: Vec2, zoom: f64) {
        if !screen.is_finite() || !zoom.is_finite() {
            return;
        }
        let screen = screen.as_dvec2();
        let anchor = self.screen_to_scene(screen);
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.pan = self.screen_to_fit(screen) / self.zoom - anchor;
    }

    /// Reset pan and zoom
    pub fn reset(&mut self) {
        self.pan = DVec2::ZERO;
        self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
    }
}

fn sanitize_size(size: Vec2) -> DVec2 {
    if size.is_finite() {
        size.max(Vec2::ONE).as_dvec2()
    } else {
        DVec2::ONE
    }
}

/// Reduce a scene position into `[0, 1)²`
#[inline]
pub fn wrap_scene(scene: Vec2) -> Vec2 {
    scene - scene.floor()
}

/// Shortest toroidal delta per axis: components beyond half a period are
/// replaced by the path the other way around
#[inline]
pub fn wrap_delta(delta: Vec2) -> Vec2 {
    let wrap = |d: f32| {
        if d.abs() > 0.5 {
            -d.signum() * (1.0 - d.abs())
        } else {
            d
        }
    };
    Vec2::new(wrap(delta.x), wrap(delta.y))
}

/// Scene to continuous texel coordinates
#[inline]
pub fn scene_to_texel(scene: Vec2, field_size: Vec2) -> Vec2 {
    scene * field_size
}

/// Continuous texel coordinates to scene
#[inline]
pub fn texel_to_scene(texel: Vec2, field_size: Vec2) -> Vec2 {
    texel / field_size
}

/// Scene position lies on the canvas
#[inline]
pub fn is_inside_unit(scene: Vec2) -> bool {
    (0.0..1.0).contains(&scene.x) && (0.0..1.0).contains(&scene.y)
}
