//! 2D pointer strokes
//!
//! Pointer samples are mapped screen -> scene -> texel. The flow of a
//! segment is its normalized texel-space motion. Segments longer than the
//! stamp spacing are filled with evenly spaced intermediate stamps.

use glam::Vec2;
use tracing::debug;

use super::{ActiveStroke, InputThrottle, PaintSession, StrokeInput};
use crate::types::{BrushMode, DirtyRect, PointerSample};
use crate::view::{is_inside_unit, wrap_delta, wrap_scene};

impl PaintSession {
    /// Begin a pointer stroke at `sample`.
    ///
    /// Flow and erase need motion, so the press itself only anchors the
    /// stroke; blur stamps right away. Ignored while a stroke is active.
    pub fn begin_stroke(&mut self, mode: BrushMode, sample: PointerSample) -> Vec<DirtyRect> {
        if self.stroke.is_some() {
            debug!("begin_stroke: stroke already active, ignoring");
            return Vec::new();
        }
        debug!(
            "begin_stroke: mode={:?}, position=({:.1}, {:.1})",
            mode, sample.position.x, sample.position.y
        );
        self.start_stroke(
            mode,
            StrokeInput::Pointer {
                last_scene: None,
                throttle: InputThrottle::new(self.config.input.throttle_ms),
            },
        );
        self.add_sample(sample)
    }

    /// Begin a pointer stroke in the brush mode selected in the settings
    pub fn begin_selected_stroke(&mut self, sample: PointerSample) -> Vec<DirtyRect> {
        self.begin_stroke(self.settings.mode, sample)
    }

    /// Feed a pointer sample. Returns the rectangles changed by it, or
    /// nothing if it was coalesced for a later [`PaintSession::flush_pending`].
    pub fn add_sample(&mut self, sample: PointerSample) -> Vec<DirtyRect> {
        let Some(ActiveStroke {
            input: StrokeInput::Pointer { throttle, .. },
            ..
        }) = self.stroke.as_mut()
        else {
            debug!("add_sample: no active pointer stroke, ignoring");
            return Vec::new();
        };
        let due = throttle.offer(sample, sample.timestamp_ms);
        match due {
            Some(sample) => self.process_pointer_sample(sample),
            None => Vec::new(),
        }
    }

    fn set_last_scene(&mut self, scene: Option<Vec2>) {
        if let Some(ActiveStroke {
            input: StrokeInput::Pointer { last_scene, .. },
            ..
        }) = self.stroke.as_mut()
        {
            *last_scene = scene;
        }
    }

    pub(crate) fn process_pointer_sample(&mut self, sample: PointerSample) -> Vec<DirtyRect> {
        let Some(ActiveStroke {
            mode,
            input: StrokeInput::Pointer { last_scene, .. },
            ..
        }) = self.stroke.as_ref()
        else {
            return Vec::new();
        };
        let (mode, last_scene) = (*mode, *last_scene);

        let scene = self.view.pointer_to_scene(sample.position);
        if !scene.is_finite() {
            debug!("add_sample: non-finite position {:?}, skipped", sample.position);
            return Vec::new();
        }

        let seamless = self.settings.seamless;
        let scene = if seamless {
            wrap_scene(scene)
        } else if is_inside_unit(scene) {
            scene
        } else {
            // Leaving the canvas breaks the segment
            self.set_last_scene(None);
            return Vec::new();
        };

        let size = self.field.size();
        let end = (scene * size).floor();

        let Some(last) = last_scene else {
            self.set_last_scene(Some(scene));
            if mode != BrushMode::Blur {
                return Vec::new();
            }
            let strength = self.segment_strength(mode, 0.0, sample.pressure);
            let stamp = self.make_stamp(mode, end, Vec2::ZERO, strength);
            return self.apply_stroke_stamp(stamp);
        };

        let delta = if seamless {
            wrap_delta(scene - last)
        } else {
            scene - last
        };
        let motion = delta * size;
        let distance = motion.length();
        if mode != BrushMode::Blur && distance < self.config.brush.min_motion {
            // Keep the anchor so slow drags accumulate
            return Vec::new();
        }

        let flow = motion.normalize_or_zero();
        let strength = self.segment_strength(mode, distance, sample.pressure);
        let start = last * size;
        let steps = self.interpolation_steps(distance);

        let mut dirty = Vec::new();
        for i in 1..=steps {
            let center = if i == steps {
                end
            } else {
                (start + motion * (i as f32 / steps as f32)).floor()
            };
            let stamp = self.make_stamp(mode, center, flow, strength);
            dirty.extend(self.apply_stroke_stamp(stamp));
        }
        self.set_last_scene(Some(scene));

        debug!(
            "add_sample: distance={:.2}, flow=({:.2}, {:.2}), strength={:.3}, stamps={}",
            distance, flow.x, flow.y, strength, steps
        );
        dirty
    }
}
