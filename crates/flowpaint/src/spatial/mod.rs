//! Bounding volume hierarchy over mesh triangles.
//!
//! The tree is stored as flat arrays: per-node bounds, per-node child/leaf
//! data and a permutation of triangle indices. Leaves reference contiguous
//! ranges of that permutation. Triangle vertex data is duplicated in leaf
//! order (`v0`, `e1 = v1 - v0`, `e2 = v2 - v0`) so leaf tests walk
//! contiguous memory.

mod build;

use glam::Vec3;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn from_triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::new(a.min(b).min(c), a.max(b).max(c))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn include_aabb(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Index (0 = x, 1 = y, 2 = z) of the longest side
    pub fn largest_axis(&self) -> usize {
        let size = self.size();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }

    /// Contains `point`, with a tolerance for float error
    pub fn contains_point(&self, point: Vec3, tolerance: f32) -> bool {
        point.cmpge(self.min - tolerance).all() && point.cmple(self.max + tolerance).all()
    }

    /// Slab test. `inv_dir` is the componentwise reciprocal of the ray
    /// direction (infinite components are fine).
    ///
    /// Returns the `[t_enter, t_exit]` interval clipped to `t >= 0`.
    #[inline]
    pub fn ray_interval(&self, origin: Vec3, inv_dir: Vec3) -> Option<(f32, f32)> {
        let t1 = (self.min - origin) * inv_dir;
        let t2 = (self.max - origin) * inv_dir;
        let t_near = t1.min(t2);
        let t_far = t1.max(t2);
        let t_enter = t_near.max_element().max(0.0);
        let t_exit = t_far.min_element();
        if t_enter > t_exit {
            return None;
        }
        Some((t_enter, t_exit))
    }
}

/// Node payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvhNode {
    Interior { left: u32, right: u32 },
    /// Range `start..start + count` of the triangle permutation
    Leaf { start: u32, count: u32 },
}

/// Flattened BVH
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    pub(crate) node_min: Vec<Vec3>,
    pub(crate) node_max: Vec<Vec3>,
    pub(crate) nodes: Vec<BvhNode>,
    /// Original triangle index for each leaf slot
    pub(crate) order: Vec<u32>,
    pub(crate) v0: Vec<Vec3>,
    pub(crate) e1: Vec<Vec3>,
    pub(crate) e2: Vec<Vec3>,
}

impl Bvh {
    /// A tree with no triangles; every query misses
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.order.len()
    }

    /// Node payload by index
    #[inline]
    pub fn node(&self, index: usize) -> BvhNode {
        self.nodes[index]
    }

    /// Bounds of a node
    #[inline]
    pub fn node_bounds(&self, index: usize) -> Aabb {
        Aabb::new(self.node_min[index], self.node_max[index])
    }

    /// Bounds of the whole mesh, None for an empty tree
    pub fn bounds(&self) -> Option<Aabb> {
        (!self.is_empty()).then(|| self.node_bounds(0))
    }

    /// Triangle permutation in leaf order
    #[inline]
    pub fn triangle_order(&self) -> &[u32] {
        &self.order
    }

    /// Iterate `(node_index, start, count)` for every leaf
    pub fn leaves(&self) -> impl Iterator<Item = (usize, u32, u32)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, node)| match *node {
            BvhNode::Leaf { start, count } => Some((i, start, count)),
            BvhNode::Interior { .. } => None,
        })
    }

    /// Depth of the deepest leaf (root = 1), 0 for an empty tree
    pub fn depth(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((index, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let BvhNode::Interior { left, right } = self.nodes[index] {
                stack.push((left as usize, depth + 1));
                stack.push((right as usize, depth + 1));
            }
        }
        max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_largest_axis() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 5.0, 2.0));
        assert_eq!(aabb.largest_axis(), 1);
        assert!(Aabb::empty().is_empty());
    }

    #[test]
    fn test_ray_interval_hit_and_miss() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let origin = Vec3::new(0.0, 0.0, -5.0);
        let (t0, t1) = aabb.ray_interval(origin, Vec3::Z.recip()).unwrap();
        assert!((t0 - 4.0).abs() < 1e-6);
        assert!((t1 - 6.0).abs() < 1e-6);

        let offset = Vec3::new(3.0, 0.0, -5.0);
        assert!(aabb.ray_interval(offset, Vec3::Z.recip()).is_none());

        // Pointing away
        assert!(aabb.ray_interval(origin, (-Vec3::Z).recip()).is_none());
    }

    #[test]
    fn test_ray_interval_from_inside() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let (t0, t1) = aabb.ray_interval(Vec3::ZERO, Vec3::X.recip()).unwrap();
        assert_eq!(t0, 0.0);
        assert!((t1 - 1.0).abs() < 1e-6);
    }
}
