//! Paint session
//!
//! Connects the pieces of the engine into one stateful object driven by the
//! UI layer:
//! - 2D pointer input mapped through the [`ViewTransform`]
//! - 3D surface input resolved through the [`SurfaceModel`]
//! - Stamps applied by the [`BrushRasterizer`]
//! - Tiles captured for undo while a stroke runs
//!
//! Every mutating call returns the rectangles it changed; nothing is
//! signalled implicitly.

mod stroke;
mod surface_stroke;
mod throttle;
mod undo;

use glam::Vec2;
use tracing::{debug, info};

use crate::brush::{BrushRasterizer, BrushStamp};
use crate::config::EngineConfig;
use crate::constants::{DEFAULT_TILE_SIZE, MAX_INTERPOLATED_STAMPS};
use crate::field::{ExportOptions, FieldError, FlowField};
use crate::history::CommandTarget;
use crate::mesh::{Mesh, MeshError};
use crate::params::{AdjustAnchor, BrushSettings, ParamKey, ParameterRegistry};
use crate::raycast::Ray;
use crate::surface::{SurfaceHit, SurfaceModel};
use crate::types::{BrushMode, DirtyRect, PointerSample, StrokeState, SurfaceSample};
use crate::validation::{sanitize_pressure, validate_ray};
use crate::view::{ViewTransform, is_inside_unit};

pub use throttle::InputThrottle;
pub use undo::{StrokeCapture, StrokeDiff, TilePatch};

/// Where the samples of the active stroke come from
#[derive(Debug, Clone)]
pub(crate) enum StrokeInput {
    /// Viewport pointer. `last_scene` is the last position that produced
    /// stamps (wrapped in seamless mode).
    Pointer {
        last_scene: Option<Vec2>,
        throttle: InputThrottle<PointerSample>,
    },
    /// Rays against the loaded mesh. `last` is cleared when the ray misses.
    Surface {
        last: Option<(Ray, SurfaceHit)>,
        throttle: InputThrottle<SurfaceSample>,
    },
}

/// State of the stroke between begin and end
#[derive(Debug, Clone)]
pub(crate) struct ActiveStroke {
    pub(crate) mode: BrushMode,
    pub(crate) capture: StrokeCapture,
    pub(crate) input: StrokeInput,
    /// Stamps applied so far
    pub(crate) stamps: usize,
}

/// Painting engine state for one canvas
pub struct PaintSession {
    pub(crate) config: EngineConfig,
    pub(crate) field: FlowField,
    pub(crate) settings: BrushSettings,
    pub(crate) rasterizer: BrushRasterizer,
    pub(crate) view: ViewTransform,
    /// Mesh with BVH and tangent frames; None until a mesh is loaded
    pub(crate) surface: Option<SurfaceModel>,
    pub(crate) stroke: Option<ActiveStroke>,
}

impl PaintSession {
    /// Create a session over `field`. The configuration is clamped first.
    pub fn new(config: EngineConfig, field: FlowField) -> Self {
        let mut config = config.validated();
        config.canvas.width = field.width();
        config.canvas.height = field.height();
        let view = ViewTransform::new(field.size(), field.size()).with_limits(&config.view);
        info!(
            "PaintSession::new: field {}x{}, seamless={}",
            field.width(),
            field.height(),
            config.canvas.seamless
        );
        Self {
            settings: BrushSettings::from_config(&config),
            rasterizer: BrushRasterizer::from(&config.brush),
            view,
            field,
            config,
            surface: None,
            stroke: None,
        }
    }

    /// Session with a neutral field of the configured canvas size
    pub fn with_config(config: EngineConfig) -> Result<Self, FieldError> {
        let field = FlowField::new(config.canvas.width, config.canvas.height)?;
        Ok(Self::new(config, field))
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn field(&self) -> &FlowField {
        &self.field
    }

    #[inline]
    pub fn settings(&self) -> &BrushSettings {
        &self.settings
    }

    #[inline]
    pub fn settings_mut(&mut self) -> &mut BrushSettings {
        &mut self.settings
    }

    #[inline]
    pub fn rasterizer(&self) -> &BrushRasterizer {
        &self.rasterizer
    }

    #[inline]
    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    #[inline]
    pub fn surface(&self) -> Option<&SurfaceModel> {
        self.surface.as_ref()
    }

    /// Whether 3D input can be resolved (mesh loaded, BVH and frames built)
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.surface.is_some()
    }

    pub fn state(&self) -> StrokeState {
        if self.stroke.is_some() {
            StrokeState::Painting
        } else {
            StrokeState::Idle
        }
    }

    #[inline]
    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    /// Mode of the active stroke
    pub fn stroke_mode(&self) -> Option<BrushMode> {
        self.stroke.as_ref().map(|s| s.mode)
    }

    // ---- Mesh ----

    /// Build the surface model for `mesh` on UV set 0
    pub fn load_mesh(&mut self, mesh: Mesh) -> Result<(), MeshError> {
        self.load_mesh_with_uv_set(mesh, 0)
    }

    /// Build the surface model for `mesh`, mapping hits through `uv_set`.
    ///
    /// On failure the previously loaded surface stays in place.
    pub fn load_mesh_with_uv_set(&mut self, mesh: Mesh, uv_set: usize) -> Result<(), MeshError> {
        let model = SurfaceModel::build(mesh, self.config.spatial.leaf_size, uv_set)?;
        self.surface = Some(model);
        self.forget_surface_hit();
        Ok(())
    }

    pub fn unload_mesh(&mut self) {
        if self.surface.take().is_some() {
            info!("PaintSession::unload_mesh");
        }
        self.forget_surface_hit();
    }

    /// A surface stroke must not interpolate across a mesh swap
    fn forget_surface_hit(&mut self) {
        if let Some(ActiveStroke {
            input: StrokeInput::Surface { last, .. },
            ..
        }) = self.stroke.as_mut()
        {
            *last = None;
        }
    }

    // ---- View ----

    /// Replace the view transform. Zoom limits come from configuration.
    pub fn set_view(&mut self, view: ViewTransform) {
        let mut view = view.with_limits(&self.config.view);
        view.set_texture_size(self.field.size());
        self.view = view;
    }

    pub fn resize_viewport(&mut self, viewport: Vec2) {
        self.view.resize_viewport(viewport);
        debug!("PaintSession::resize_viewport: {:?}", self.view.viewport());
    }

    /// Pan by a pointer drag of `delta` pixels
    pub fn pan_by(&mut self, delta: Vec2) {
        self.view.pan_by_pixels(delta);
    }

    /// Zoom to `zoom` keeping the scene point under `screen` fixed
    pub fn zoom_about(&mut self, screen: Vec2, zoom: f32) {
        self.view.zoom_about(screen, f64::from(zoom));
    }

    /// Wheel zoom: each notch scales by `1 + scroll_sensitivity`, negative
    /// notches zoom out
    pub fn zoom_by_wheel(&mut self, screen: Vec2, notches: f32) {
        if !notches.is_finite() {
            return;
        }
        let step = 1.0 + f64::from(self.config.view.scroll_sensitivity);
        let zoom = self.view.zoom() * step.powf(f64::from(notches));
        self.view.zoom_about(screen, zoom);
    }

    /// Whether the pointer at `screen` is over paintable canvas
    ///
    /// Always true in seamless mode.
    pub fn is_over_paintable(&self, screen: Vec2) -> bool {
        let scene = self.view.pointer_to_scene(screen);
        scene.is_finite() && (self.settings.seamless || is_inside_unit(scene))
    }

    /// Whether `ray` hits the loaded mesh
    pub fn is_ray_over_surface(&self, ray: &Ray) -> bool {
        validate_ray(ray.origin, ray.direction).is_ok()
            && self.surface.as_ref().and_then(|s| s.cast(ray)).is_some()
    }

    // ---- Field ----

    /// Reinitialize the field to neutral at a new size.
    ///
    /// An in-progress stroke is dropped without producing a diff. Returns
    /// whether one was interrupted.
    pub fn resize_field(&mut self, width: u32, height: u32) -> Result<bool, FieldError> {
        let field = FlowField::new(width, height)?;
        Ok(self.replace_field(field))
    }

    /// Swap in a new field (e.g. an imported one), ending any stroke
    /// like [`PaintSession::resize_field`]
    pub fn replace_field(&mut self, field: FlowField) -> bool {
        let interrupted = self.stroke.take().is_some();
        self.config.canvas.width = field.width();
        self.config.canvas.height = field.height();
        self.view.set_texture_size(field.size());
        self.field = field;
        info!(
            "PaintSession::replace_field: {}x{}, interrupted stroke={}",
            self.field.width(),
            self.field.height(),
            interrupted
        );
        interrupted
    }

    /// Set every texel to `flow`. Ends any active stroke first.
    pub fn fill(&mut self, flow: Vec2) -> StrokeDiff {
        self.whole_field_edit(|field| field.fill(flow))
    }

    /// Reset every texel to neutral. Ends any active stroke first.
    pub fn clear(&mut self) -> StrokeDiff {
        self.whole_field_edit(FlowField::clear)
    }

    fn whole_field_edit(&mut self, edit: impl FnOnce(&mut FlowField)) -> StrokeDiff {
        if self.stroke.take().is_some() {
            debug!("PaintSession: whole-field edit dropped the active stroke");
        }
        let mut capture = StrokeCapture::new(DEFAULT_TILE_SIZE);
        capture.capture(&self.field, self.field.bounds());
        edit(&mut self.field);
        capture.finish(&self.field)
    }

    /// Options for writing the field to an image, from the current
    /// presentation flags
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            invert_x: self.settings.invert_x,
            invert_y: self.settings.invert_y,
            ..Default::default()
        }
    }

    // ---- Brush parameters ----

    /// Quick-adjust drag relative to `anchor` (see [`BrushSettings::quick_adjust`])
    pub fn adjust_brush(&mut self, anchor: AdjustAnchor, delta: Vec2) -> Option<ParamKey> {
        self.settings.quick_adjust(anchor, delta)
    }

    // ---- Stamp helpers shared by both input paths ----

    /// Strength for a segment of `motion` texels.
    ///
    /// Real pressure scales the brush strength directly. Without it, speed
    /// stands in: `min(1, motion / speed_normalization)` weighted by the
    /// speed sensitivity, with `(1 - sensitivity) / 2` as the floor. Blur
    /// ignores speed.
    pub(crate) fn segment_strength(&self, mode: BrushMode, motion: f32, pressure: Option<f32>) -> f32 {
        let strength = self.settings.strength;
        if let Some(pressure) = sanitize_pressure(pressure) {
            return strength * pressure;
        }
        if mode == BrushMode::Blur {
            return strength;
        }
        let speed = (motion / self.config.brush.speed_normalization).clamp(0.0, 1.0);
        let sensitivity = self.settings.speed_sensitivity;
        strength * (speed * sensitivity + (1.0 - sensitivity) * 0.5)
    }

    /// Stamps needed to cover `distance` texels without gaps
    pub(crate) fn interpolation_steps(&self, distance: f32) -> usize {
        let spacing = self.settings.radius * self.config.brush.spacing;
        if !distance.is_finite() || spacing <= 0.0 || distance <= spacing {
            return 1;
        }
        ((distance / spacing).ceil() as usize).clamp(1, MAX_INTERPOLATED_STAMPS)
    }

    /// Capture the stamp's footprint for undo, then apply it
    pub(crate) fn apply_stroke_stamp(&mut self, stamp: BrushStamp) -> Vec<DirtyRect> {
        let Some(stroke) = self.stroke.as_mut() else {
            return Vec::new();
        };
        for rect in self.rasterizer.footprint(&self.field, &stamp) {
            stroke.capture.capture(&self.field, rect);
        }
        let dirty = self.rasterizer.apply_stamp(&mut self.field, &stamp);
        if !dirty.is_empty() {
            stroke.stamps += 1;
        }
        dirty
    }

    /// Stamp shaped by the current settings
    pub(crate) fn make_stamp(&self, mode: BrushMode, center: Vec2, flow: Vec2, strength: f32) -> BrushStamp {
        BrushStamp::for_mode(mode, center, self.settings.radius, flow, strength)
            .with_wrap(self.settings.seamless)
    }

    pub(crate) fn start_stroke(&mut self, mode: BrushMode, input: StrokeInput) {
        self.stroke = Some(ActiveStroke {
            mode,
            capture: StrokeCapture::new(DEFAULT_TILE_SIZE),
            input,
            stamps: 0,
        });
    }

    /// Process whichever sample is waiting in the throttle
    pub fn flush_pending(&mut self) -> Vec<DirtyRect> {
        let Some(stroke) = self.stroke.as_mut() else {
            return Vec::new();
        };
        let (pointer, surface) = match &mut stroke.input {
            StrokeInput::Pointer { throttle, .. } => (throttle.take_pending(), None),
            StrokeInput::Surface { throttle, .. } => (None, throttle.take_pending()),
        };
        if let Some(sample) = pointer {
            return self.process_pointer_sample(sample);
        }
        match surface {
            Some(sample) => self.process_surface_sample(sample),
            None => Vec::new(),
        }
    }

    /// Whether a coalesced sample is waiting for [`PaintSession::flush_pending`]
    pub fn has_pending(&self) -> bool {
        match self.stroke.as_ref().map(|s| &s.input) {
            Some(StrokeInput::Pointer { throttle, .. }) => throttle.has_pending(),
            Some(StrokeInput::Surface { throttle, .. }) => throttle.has_pending(),
            None => false,
        }
    }

    /// Finish the stroke: process the pending sample and return the diff.
    ///
    /// None when no stroke is active (never begun, or aborted by a field
    /// resize). The diff may be empty if no stamp changed anything.
    pub fn end_stroke(&mut self) -> Option<StrokeDiff> {
        if self.stroke.is_none() {
            debug!("end_stroke: no active stroke, ignoring");
            return None;
        }
        self.flush_pending();
        let stroke = self.stroke.take()?;
        let diff = stroke.capture.finish(&self.field);
        debug!(
            "end_stroke: mode={:?}, stamps={}, tiles={}",
            stroke.mode,
            stroke.stamps,
            diff.tile_count()
        );
        Some(diff)
    }

    /// Drop the active stroke, restoring the field to its state at begin
    pub fn cancel_stroke(&mut self) -> Vec<DirtyRect> {
        let Some(stroke) = self.stroke.take() else {
            return Vec::new();
        };
        let diff = stroke.capture.finish(&self.field);
        match diff.revert(&mut self.field) {
            Ok(rects) => {
                debug!("cancel_stroke: reverted {} tiles", rects.len());
                rects
            }
            Err(err) => {
                debug!("cancel_stroke: revert failed ({})", err);
                Vec::new()
            }
        }
    }
}

impl CommandTarget for PaintSession {
    fn field_mut(&mut self) -> &mut FlowField {
        &mut self.field
    }

    fn registry_mut(&mut self) -> &mut dyn ParameterRegistry {
        &mut self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Command, History};
    use crate::mesh::test_meshes;

    fn session(size: u32) -> PaintSession {
        let config = EngineConfig::with_field_size(size, size);
        let field = FlowField::new(size, size).unwrap();
        let mut session = PaintSession::new(config, field);
        // Viewport pixels equal texels
        session.resize_viewport(Vec2::splat(size as f32));
        session
    }

    #[test]
    fn test_new_session_is_idle() {
        let s = session(64);
        assert_eq!(s.state(), StrokeState::Idle);
        assert!(!s.is_ready());
        assert_eq!(s.view().texture_size(), glam::DVec2::splat(64.0));
    }

    #[test]
    fn test_with_config_builds_field() {
        let s = PaintSession::with_config(EngineConfig::with_field_size(32, 16)).unwrap();
        assert_eq!((s.field().width(), s.field().height()), (32, 16));
        assert!(PaintSession::with_config(EngineConfig::with_field_size(0, 16)).is_err());
    }

    #[test]
    fn test_load_and_unload_mesh() {
        let mut s = session(64);
        s.load_mesh(test_meshes::quad()).unwrap();
        assert!(s.is_ready());
        assert!(s.load_mesh_with_uv_set(test_meshes::quad(), 3).is_err());
        assert!(s.is_ready());
        s.unload_mesh();
        assert!(!s.is_ready());
    }

    #[test]
    fn test_is_over_paintable() {
        let mut s = session(100);
        assert!(s.is_over_paintable(Vec2::new(50.0, 50.0)));
        s.pan_by(Vec2::new(80.0, 0.0));
        assert!(!s.is_over_paintable(Vec2::new(10.0, 50.0)));
        s.settings_mut().seamless = true;
        assert!(s.is_over_paintable(Vec2::new(10.0, 50.0)));
    }

    #[test]
    fn test_is_ray_over_surface() {
        let mut s = session(64);
        let ray = Ray::new(glam::Vec3::new(0.3, 0.6, 1.0), -glam::Vec3::Z);
        assert!(!s.is_ray_over_surface(&ray));
        s.load_mesh(test_meshes::quad()).unwrap();
        assert!(s.is_ray_over_surface(&ray));
        assert!(!s.is_ray_over_surface(&Ray::new(glam::Vec3::ZERO, glam::Vec3::ZERO)));
    }

    #[test]
    fn test_wheel_zoom() {
        let mut s = session(100);
        let anchor = Vec2::new(30.0, 70.0);
        let before = s.view().screen_to_scene(anchor.as_dvec2());
        s.zoom_by_wheel(anchor, 1.0);
        assert!((s.view().zoom() - 1.1).abs() < 1e-5);
        s.zoom_by_wheel(anchor, -2.0);
        assert!((s.view().zoom() - 1.1 / 1.21).abs() < 1e-5);
        assert!((s.view().screen_to_scene(anchor.as_dvec2()) - before).length() < 1e-9);
    }

    #[test]
    fn test_fill_is_undoable() {
        let mut s = session(64);
        let mut history = History::default();
        let diff = s.fill(Vec2::X);
        assert_eq!(s.field().flow_at(5, 5), Some(Vec2::X));
        history.push(Command::Stroke(diff));

        history.undo(&mut s).unwrap();
        assert_eq!(s.field(), &FlowField::new(64, 64).unwrap());
        history.redo(&mut s).unwrap();
        assert_eq!(s.field().flow_at(63, 63), Some(Vec2::X));

        let diff = s.clear();
        assert!(!diff.is_empty());
        assert_eq!(s.field(), &FlowField::new(64, 64).unwrap());
    }

    #[test]
    fn test_segment_strength() {
        let mut s = session(64);
        s.settings_mut().strength = 1.0;
        s.settings_mut().speed_sensitivity = 0.7;
        // Full speed: 0.7 + 0.15
        assert!((s.segment_strength(BrushMode::Flow, 200.0, None) - 0.85).abs() < 1e-5);
        // At rest only the floor remains
        assert!((s.segment_strength(BrushMode::Flow, 0.0, None) - 0.15).abs() < 1e-5);
        assert!((s.segment_strength(BrushMode::Flow, 1.0, Some(0.4)) - 0.4).abs() < 1e-5);
        assert_eq!(s.segment_strength(BrushMode::Blur, 0.0, None), 1.0);
    }

    #[test]
    fn test_interpolation_steps() {
        let mut s = session(64);
        s.settings_mut().radius = 10.0;
        assert_eq!(s.interpolation_steps(3.0), 1);
        assert_eq!(s.interpolation_steps(5.0), 1);
        assert_eq!(s.interpolation_steps(12.0), 3);
        assert_eq!(s.interpolation_steps(1.0e9), MAX_INTERPOLATED_STAMPS);
        assert_eq!(s.interpolation_steps(f32::NAN), 1);
    }

    #[test]
    fn test_export_options_follow_settings() {
        let mut s = session(16);
        s.settings_mut().invert_y = true;
        let options = s.export_options();
        assert!(options.invert_y && !options.invert_x && options.flip_vertical);
    }
}
