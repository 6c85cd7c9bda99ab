use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::raycast::Ray;

/// What a brush does to the texels under it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum BrushMode {
    /// Paint the stroke direction
    #[default]
    Flow = 0,
    /// Pull texels back toward the zero vector
    Erase = 1,
    /// Average texels with their neighborhood
    Blur = 2,
}

/// Stroke lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StrokeState {
    #[default]
    Idle,
    Painting,
}

/// Axis-aligned rectangle of texels (x, y, width, height)
///
/// Returned by every field mutation so the renderer can upload only the
/// modified region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirtyRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DirtyRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from inclusive texel bounds
    pub fn from_inclusive(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersects(&self, other: &DirtyRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &DirtyRect) -> DirtyRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        DirtyRect::new(x, y, right - x, bottom - y)
    }
}

/// Bounding rectangle of a batch, or None for an empty batch
pub fn bounding_rect(rects: &[DirtyRect]) -> Option<DirtyRect> {
    rects
        .iter()
        .filter(|r| !r.is_empty())
        .copied()
        .reduce(|acc, r| acc.union(&r))
}

/// A 2D pointer sample in viewport pixels (origin top-left, Y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub position: Vec2,
    /// Event time in milliseconds (any monotonic clock)
    pub timestamp_ms: f64,
    /// Pen pressure 0.0-1.0, None for devices without pressure
    pub pressure: Option<f32>,
}

impl PointerSample {
    pub fn new(position: Vec2, timestamp_ms: f64) -> Self {
        Self {
            position,
            timestamp_ms,
            pressure: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }
}

/// A 3D surface sample: a pick ray in mesh space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub ray: Ray,
    pub timestamp_ms: f64,
    pub pressure: Option<f32>,
}

impl SurfaceSample {
    pub fn new(ray: Ray, timestamp_ms: f64) -> Self {
        Self {
            ray,
            timestamp_ms,
            pressure: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_rect_union() {
        let a = DirtyRect::new(10, 10, 5, 5);
        let b = DirtyRect::new(12, 0, 10, 3);
        let u = a.union(&b);
        assert_eq!(u, DirtyRect::new(10, 0, 12, 15));
        assert_eq!(a.union(&DirtyRect::new(0, 0, 0, 0)), a);
    }

    #[test]
    fn test_dirty_rect_inclusive() {
        let r = DirtyRect::from_inclusive(109, 109, 147, 147);
        assert_eq!(r.width, 39);
        assert!(r.contains(147, 147));
        assert!(!r.contains(148, 147));
    }

    #[test]
    fn test_bounding_rect() {
        assert_eq!(bounding_rect(&[]), None);
        let rects = [DirtyRect::new(0, 0, 2, 2), DirtyRect::new(8, 8, 2, 2)];
        assert_eq!(bounding_rect(&rects), Some(DirtyRect::new(0, 0, 10, 10)));
    }

    #[test]
    fn test_intersects() {
        let a = DirtyRect::new(0, 0, 10, 10);
        assert!(a.intersects(&DirtyRect::new(9, 9, 4, 4)));
        assert!(!a.intersects(&DirtyRect::new(10, 0, 4, 4)));
    }
}
