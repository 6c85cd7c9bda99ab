//! 3D surface strokes
//!
//! Each sample is a ray. The hit's UV picks the stamp center; the flow is
//! the hit-to-hit world motion projected into the tangent frame at the
//! stamp. Long segments are filled by re-casting interpolated rays.

use glam::Vec2;
use tracing::debug;

use super::{ActiveStroke, InputThrottle, PaintSession, StrokeInput};
use crate::brush::BrushStamp;
use crate::raycast::Ray;
use crate::surface::SurfaceHit;
use crate::types::{BrushMode, DirtyRect, SurfaceSample};
use crate::validation::validate_ray;
use crate::view::{is_inside_unit, wrap_delta, wrap_scene};

impl PaintSession {
    /// Begin a stroke on the loaded mesh.
    ///
    /// Ignored while a stroke is active or before a mesh is loaded.
    pub fn begin_surface_stroke(&mut self, mode: BrushMode, sample: SurfaceSample) -> Vec<DirtyRect> {
        if self.stroke.is_some() {
            debug!("begin_surface_stroke: stroke already active, ignoring");
            return Vec::new();
        }
        if self.surface.is_none() {
            debug!("begin_surface_stroke: no mesh loaded, ignoring");
            return Vec::new();
        }
        debug!("begin_surface_stroke: mode={:?}", mode);
        self.start_stroke(
            mode,
            StrokeInput::Surface {
                last: None,
                throttle: InputThrottle::new(self.config.input.throttle_ms),
            },
        );
        self.add_surface_sample(sample)
    }

    /// Begin a surface stroke in the brush mode selected in the settings
    pub fn begin_selected_surface_stroke(&mut self, sample: SurfaceSample) -> Vec<DirtyRect> {
        self.begin_surface_stroke(self.settings.mode, sample)
    }

    /// Feed a ray sample. Same coalescing rules as [`PaintSession::add_sample`].
    pub fn add_surface_sample(&mut self, sample: SurfaceSample) -> Vec<DirtyRect> {
        let Some(ActiveStroke {
            input: StrokeInput::Surface { throttle, .. },
            ..
        }) = self.stroke.as_mut()
        else {
            debug!("add_surface_sample: no active surface stroke, ignoring");
            return Vec::new();
        };
        let due = throttle.offer(sample, sample.timestamp_ms);
        match due {
            Some(sample) => self.process_surface_sample(sample),
            None => Vec::new(),
        }
    }

    fn set_last_hit(&mut self, hit: Option<(Ray, SurfaceHit)>) {
        if let Some(ActiveStroke {
            input: StrokeInput::Surface { last, .. },
            ..
        }) = self.stroke.as_mut()
        {
            *last = hit;
        }
    }

    /// Texel center of a hit; None when it falls off a non-wrapping canvas
    fn hit_texel(&self, hit: &SurfaceHit) -> Option<Vec2> {
        let uv = if self.settings.seamless {
            wrap_scene(hit.uv)
        } else if is_inside_unit(hit.uv) {
            hit.uv
        } else {
            return None;
        };
        Some((uv * self.field.size()).floor())
    }

    pub(crate) fn process_surface_sample(&mut self, sample: SurfaceSample) -> Vec<DirtyRect> {
        let Some(ActiveStroke {
            mode,
            input: StrokeInput::Surface { last, .. },
            ..
        }) = self.stroke.as_ref()
        else {
            return Vec::new();
        };
        let (mode, last) = (*mode, *last);

        let ray = sample.ray;
        if let Err(err) = validate_ray(ray.origin, ray.direction) {
            debug!("add_surface_sample: skipped ({})", err);
            return Vec::new();
        }
        let Some(model) = self.surface.as_ref() else {
            return Vec::new();
        };
        let Some(hit) = model.cast(&ray) else {
            // Leaving the mesh breaks the segment
            self.set_last_hit(None);
            return Vec::new();
        };

        let Some((last_ray, last_hit)) = last else {
            self.set_last_hit(Some((ray, hit)));
            if mode != BrushMode::Blur {
                return Vec::new();
            }
            let strength = self.segment_strength(mode, 0.0, sample.pressure);
            let Some(center) = self.hit_texel(&hit) else {
                return Vec::new();
            };
            let stamp = self.make_stamp(mode, center, Vec2::ZERO, strength);
            return self.apply_stroke_stamp(stamp);
        };

        let uv_delta = if self.settings.seamless {
            wrap_delta(wrap_scene(hit.uv) - wrap_scene(last_hit.uv))
        } else {
            hit.uv - last_hit.uv
        };
        let distance = (uv_delta * self.field.size()).length();
        if mode != BrushMode::Blur && distance < self.config.brush.min_motion {
            return Vec::new();
        }

        let motion = hit.position - last_hit.position;
        let strength = self.segment_strength(mode, distance, sample.pressure);
        let steps = self.interpolation_steps(distance);

        // Resolve every stamp first; the model is borrowed from the session
        let stamps: Vec<BrushStamp> = (1..=steps)
            .filter_map(|i| {
                let stamp_hit = if i == steps {
                    hit
                } else {
                    model.cast(&last_ray.lerp(&ray, i as f32 / steps as f32))?
                };
                let flow = match mode {
                    BrushMode::Flow => model.flow_at(motion, &stamp_hit)?,
                    BrushMode::Erase | BrushMode::Blur => Vec2::ZERO,
                };
                let center = self.hit_texel(&stamp_hit)?;
                Some(self.make_stamp(mode, center, flow, strength))
            })
            .collect();

        self.set_last_hit(Some((ray, hit)));
        debug!(
            "add_surface_sample: triangle={}, uv=({:.3}, {:.3}), distance={:.2}, stamps={}/{}",
            hit.triangle,
            hit.uv.x,
            hit.uv.y,
            distance,
            stamps.len(),
            steps
        );

        let mut dirty = Vec::new();
        for stamp in stamps {
            dirty.extend(self.apply_stroke_stamp(stamp));
        }
        dirty
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use crate::config::EngineConfig;
    use crate::constants::NEUTRAL_TEXEL;
    use crate::field::FlowField;
    use crate::mesh::{Mesh, test_meshes};
    use crate::raycast::Ray;
    use crate::session::PaintSession;
    use crate::types::{BrushMode, StrokeState, SurfaceSample};

    const SIZE: u32 = 128;

    fn session() -> PaintSession {
        let config = EngineConfig::with_field_size(SIZE, SIZE);
        let mut session = PaintSession::new(config, FlowField::new(SIZE, SIZE).unwrap());
        session.settings_mut().strength = 1.0;
        session.settings_mut().radius = 6.0;
        session.load_mesh(test_meshes::quad()).unwrap();
        session
    }

    /// Straight-down ray onto the unit quad at (x, y); UV equals (x, y)
    fn down(x: f32, y: f32, t: f64) -> SurfaceSample {
        SurfaceSample::new(Ray::new(Vec3::new(x, y, 1.0), -Vec3::Z), t).with_pressure(0.5)
    }

    #[test]
    fn test_requires_mesh() {
        let mut s = session();
        s.unload_mesh();
        s.begin_surface_stroke(BrushMode::Flow, down(0.5, 0.5, 0.0));
        assert_eq!(s.state(), StrokeState::Idle);
    }

    #[test]
    fn test_surface_stroke_paints_along_motion() {
        let mut s = session();
        s.begin_surface_stroke(BrushMode::Flow, down(0.3, 0.5, 0.0));
        let dirty = s.add_surface_sample(down(0.3, 0.53, 20.0));
        assert!(!dirty.is_empty());

        // UV (0.3, 0.53) is texel (38, 67); motion is +V
        let texel = s.field().get(38, 67).unwrap();
        assert!((texel[0] - 0.5).abs() < 1e-4);
        assert!(texel[1] > 0.7);

        let diff = s.end_stroke().unwrap();
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_miss_breaks_segment() {
        let mut s = session();
        s.begin_surface_stroke(BrushMode::Flow, down(0.2, 0.5, 0.0));
        assert!(s.add_surface_sample(down(3.0, 0.5, 20.0)).is_empty());
        // New anchor after the miss: nothing painted between 0.2 and 0.8
        assert!(s.add_surface_sample(down(0.8, 0.5, 40.0)).is_empty());
        assert!(!s.add_surface_sample(down(0.83, 0.5, 60.0)).is_empty());
        assert_eq!(s.field().get(64, 64), Some(NEUTRAL_TEXEL));
    }

    #[test]
    fn test_invalid_ray_is_skipped() {
        let mut s = session();
        s.begin_surface_stroke(BrushMode::Flow, down(0.3, 0.5, 0.0));
        let bad = SurfaceSample::new(Ray::new(Vec3::splat(f32::NAN), -Vec3::Z), 20.0);
        assert!(s.add_surface_sample(bad).is_empty());
        assert_eq!(s.state(), StrokeState::Painting);
    }

    #[test]
    fn test_long_segment_is_interpolated() {
        let mut s = session();
        s.begin_surface_stroke(BrushMode::Flow, down(0.2, 0.5, 0.0));
        s.add_surface_sample(down(0.8, 0.5, 20.0));
        for x in [32, 48, 64, 80, 96] {
            let texel = s.field().get(x, 64).unwrap();
            assert!(texel[0] > 0.6, "gap at x={x}");
        }
    }

    #[test]
    fn test_surface_stroke_matches_pointer_convention() {
        let mut s = session();
        s.begin_surface_stroke(BrushMode::Flow, down(0.6, 0.5, 0.0));
        s.add_surface_sample(down(0.55, 0.5, 20.0));
        // Motion toward -U paints -x
        let texel = s.field().get(70, 64).unwrap();
        assert!(texel[0] < 0.3);
        assert!((texel[1] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_throttled_surface_sample_flushed_at_end() {
        let mut s = session();
        s.begin_surface_stroke(BrushMode::Flow, down(0.5, 0.4, 0.0));
        assert!(s.add_surface_sample(down(0.53, 0.4, 4.0)).is_empty());
        assert!(s.has_pending());
        let diff = s.end_stroke().unwrap();
        assert!(!diff.is_empty());
        assert_ne!(s.field().get(67, 51), Some(NEUTRAL_TEXEL));
    }

    #[test]
    fn test_seamless_hit_near_edge_mirrors() {
        let mut s = session();
        s.settings_mut().seamless = true;
        s.begin_surface_stroke(BrushMode::Flow, down(0.97, 0.5, 0.0));
        s.add_surface_sample(down(0.995, 0.5, 20.0));
        // Texel 127 stamp spills over onto column 0
        assert_ne!(s.field().get(1, 64), Some(NEUTRAL_TEXEL));
        assert!(s.field().get(1, 64).map(|t| t[0] > 0.5).unwrap_or(false));
    }

    /// 2x1 world quad stretched over the unit UV square
    fn wide_quad() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let uvs = vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y];
        Mesh::new(positions, vec![Vec3::Z; 4], vec![uvs], vec![0, 1, 2, 0, 2, 3]).unwrap()
    }

    #[test]
    fn test_flow_follows_world_motion_not_uv_delta() {
        let mut s = session();
        s.load_mesh(wide_quad()).unwrap();
        let down = |x: f32, y: f32, t: f64| {
            SurfaceSample::new(Ray::new(Vec3::new(x, y, 1.0), -Vec3::Z), t).with_pressure(1.0)
        };

        // World diagonal; the UV delta is (0.015, 0.03), steeper than 45 degrees
        s.begin_surface_stroke(BrushMode::Flow, down(0.6, 0.5, 0.0));
        s.add_surface_sample(down(0.63, 0.53, 20.0));

        // End hit at UV (0.315, 0.53) is texel (40, 67), stamped at full blend
        let texel = s.field().get(40, 67).unwrap();
        let expected = 0.5 + 0.5 * std::f32::consts::FRAC_1_SQRT_2;
        assert!((texel[0] - expected).abs() < 1e-3, "{texel:?}");
        assert!((texel[1] - expected).abs() < 1e-3, "{texel:?}");
    }

    #[test]
    fn test_mesh_swap_clears_anchor() {
        let mut s = session();
        s.begin_surface_stroke(BrushMode::Flow, down(0.2, 0.5, 0.0));
        s.load_mesh(test_meshes::quad()).unwrap();
        assert!(s.add_surface_sample(down(0.8, 0.5, 20.0)).is_empty());
    }
}
