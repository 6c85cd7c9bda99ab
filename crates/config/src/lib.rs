//! Shared configuration for flowpaint
//!
//! This crate is the single source of truth for canvas dimensions, brush
//! defaults, view limits and input timing. The engine receives an
//! [`EngineConfig`] at construction; nothing reads global settings.

use serde::{Deserialize, Serialize};

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default flow field width in texels
pub const DEFAULT_FIELD_WIDTH: u32 = 1024;

/// Default flow field height in texels
pub const DEFAULT_FIELD_HEIGHT: u32 = 1024;

/// Field size used by the high resolution preset
pub const HIGH_RES_FIELD_SIZE: u32 = 2048;

/// Default brush radius in texels
pub const DEFAULT_BRUSH_RADIUS: f32 = 40.0;

/// Brush radius limits in texels
pub const MIN_BRUSH_RADIUS: f32 = 5.0;
pub const MAX_BRUSH_RADIUS: f32 = 200.0;

/// Default brush strength
pub const DEFAULT_BRUSH_STRENGTH: f32 = 0.5;

/// Brush strength limits
pub const MIN_BRUSH_STRENGTH: f32 = 0.01;
pub const MAX_BRUSH_STRENGTH: f32 = 1.0;

/// Default pointer speed sensitivity (0 = speed ignored, 1 = fully speed driven)
pub const DEFAULT_SPEED_SENSITIVITY: f32 = 0.7;

/// Zoom limits for the 2D view
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 10.0;

/// Input coalescing interval (~60 Hz)
pub const DEFAULT_THROTTLE_MS: f64 = 16.0;

/// Default BVH leaf size
pub const DEFAULT_LEAF_SIZE: usize = 16;

/// Canvas (flow field) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Field width in texels
    pub width: u32,
    /// Field height in texels
    pub height: u32,
    /// Treat the field as a torus (seamless tiling)
    pub seamless: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_FIELD_WIDTH,
            height: DEFAULT_FIELD_HEIGHT,
            seamless: false,
        }
    }
}

impl CanvasConfig {
    /// Create a canvas config with the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// The square high resolution preset
    pub fn high_resolution() -> Self {
        Self::new(HIGH_RES_FIELD_SIZE, HIGH_RES_FIELD_SIZE)
    }

    /// Width over height
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Brush behaviour configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    /// Radius in texels
    pub radius: f32,
    /// Base strength 0.0-1.0
    pub strength: f32,
    /// How much pointer speed modulates strength when no pressure is reported
    pub speed_sensitivity: f32,
    /// Minimum motion (texels) before a 2D sample produces a stamp
    pub min_motion: f32,
    /// Motion length (texels) that counts as full speed
    pub speed_normalization: f32,
    /// Samples further apart than `spacing * radius` get interpolated stamps
    pub spacing: f32,
    /// Falloff below which blur leaves a texel untouched
    pub blur_threshold: f32,
    /// Blur window radius as a fraction of the brush radius
    pub blur_window: f32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_BRUSH_RADIUS,
            strength: DEFAULT_BRUSH_STRENGTH,
            speed_sensitivity: DEFAULT_SPEED_SENSITIVITY,
            min_motion: 0.1,
            speed_normalization: 100.0,
            spacing: 0.5,
            blur_threshold: 0.01,
            blur_window: 0.2,
        }
    }
}

/// 2D view (pan/zoom) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Zoom step per wheel notch
    pub scroll_sensitivity: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            scroll_sensitivity: 0.1,
        }
    }
}

/// Pointer input configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Samples closer together in time than this are coalesced
    pub throttle_ms: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            throttle_ms: DEFAULT_THROTTLE_MS,
        }
    }
}

/// Spatial index configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Maximum triangles per BVH leaf
    pub leaf_size: usize,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}

/// Presentation options applied when the field leaves the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Invert the X channel on export/preview
    pub invert_x: bool,
    /// Invert the Y channel on export/preview
    pub invert_y: bool,
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct EngineConfig {
    pub canvas: CanvasConfig,
    pub brush: BrushConfig,
    pub view: ViewConfig,
    pub input: InputConfig,
    pub spatial: SpatialConfig,
    pub export: ExportConfig,
}

impl EngineConfig {
    /// Create a config with the given field dimensions and defaults elsewhere
    pub fn with_field_size(width: u32, height: u32) -> Self {
        Self {
            canvas: CanvasConfig::new(width, height),
            ..Default::default()
        }
    }

    /// Return a copy with every value clamped into its valid range
    pub fn validated(mut self) -> Self {
        self.canvas.width = self.canvas.width.max(1);
        self.canvas.height = self.canvas.height.max(1);

        let brush = &mut self.brush;
        brush.radius = clamp_or(brush.radius, MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS, DEFAULT_BRUSH_RADIUS);
        brush.strength = clamp_or(
            brush.strength,
            MIN_BRUSH_STRENGTH,
            MAX_BRUSH_STRENGTH,
            DEFAULT_BRUSH_STRENGTH,
        );
        brush.speed_sensitivity =
            clamp_or(brush.speed_sensitivity, 0.0, 1.0, DEFAULT_SPEED_SENSITIVITY);
        brush.min_motion = clamp_or(brush.min_motion, 0.0, f32::MAX, 0.1);
        brush.speed_normalization = clamp_or(brush.speed_normalization, 1e-3, f32::MAX, 100.0);
        brush.spacing = clamp_or(brush.spacing, 0.05, 4.0, 0.5);
        brush.blur_threshold = clamp_or(brush.blur_threshold, 0.0, 1.0, 0.01);
        brush.blur_window = clamp_or(brush.blur_window, 0.0, 1.0, 0.2);

        let view = &mut self.view;
        view.min_zoom = clamp_or(view.min_zoom, 1e-3, MAX_ZOOM, MIN_ZOOM);
        view.max_zoom = clamp_or(view.max_zoom, view.min_zoom, 1e3, MAX_ZOOM);
        view.scroll_sensitivity = clamp_or(view.scroll_sensitivity, 0.0, 1.0, 0.1);

        if !self.input.throttle_ms.is_finite() || self.input.throttle_ms < 0.0 {
            self.input.throttle_ms = DEFAULT_THROTTLE_MS;
        }
        self.spatial.leaf_size = self.spatial.leaf_size.max(1);
        self
    }
}

/// Clamp a value, replacing NaN with a fallback
fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.canvas.width, DEFAULT_FIELD_WIDTH);
        assert_eq!(config.canvas.height, DEFAULT_FIELD_HEIGHT);
        assert!(!config.canvas.seamless);
        assert_eq!(config.brush.radius, DEFAULT_BRUSH_RADIUS);
        assert_eq!(config.input.throttle_ms, DEFAULT_THROTTLE_MS);
        assert_eq!(config.spatial.leaf_size, DEFAULT_LEAF_SIZE);
    }

    #[test]
    fn test_high_resolution_preset() {
        let canvas = CanvasConfig::high_resolution();
        assert_eq!(canvas.width, 2048);
        assert_eq!(canvas.height, 2048);
        assert_eq!(canvas.aspect_ratio(), 1.0);
    }

    #[test]
    fn test_validated_clamps_out_of_range() {
        let mut config = EngineConfig::with_field_size(0, 512);
        config.brush.radius = 1000.0;
        config.brush.strength = f32::NAN;
        config.brush.speed_sensitivity = -3.0;
        config.view.max_zoom = 0.0;
        config.spatial.leaf_size = 0;

        let config = config.validated();
        assert_eq!(config.canvas.width, 1);
        assert_eq!(config.brush.radius, MAX_BRUSH_RADIUS);
        assert_eq!(config.brush.strength, DEFAULT_BRUSH_STRENGTH);
        assert_eq!(config.brush.speed_sensitivity, 0.0);
        assert!(config.view.max_zoom >= config.view.min_zoom);
        assert_eq!(config.spatial.leaf_size, 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "canvas": { "seamless": true }, "brush": { "radius": 12.0 } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(config.canvas.seamless);
        assert_eq!(config.canvas.width, DEFAULT_FIELD_WIDTH);
        assert_eq!(config.brush.radius, 12.0);
        assert_eq!(config.brush.strength, DEFAULT_BRUSH_STRENGTH);
        assert_eq!(config.view, ViewConfig::default());
    }
}
