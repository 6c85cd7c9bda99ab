//! Ray-mesh intersection.
//!
//! Triangle tests use the Moller-Trumbore algorithm. [`Bvh::cast_ray`]
//! walks the hierarchy with an explicit stack and tests whole leaves at a
//! time over the tree's leaf-ordered vertex arrays.

use glam::{Mat4, Vec2, Vec3};
use tracing::debug;

use crate::constants::RAY_EPSILON;
use crate::spatial::{Bvh, BvhNode};

/// A ray in mesh space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at distance `t`
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Linear blend between two rays (origins and directions)
    pub fn lerp(&self, other: &Ray, s: f32) -> Ray {
        Ray::new(
            self.origin.lerp(other.origin, s),
            self.direction.lerp(other.direction, s),
        )
    }

    /// Pick ray through a normalized device coordinate.
    ///
    /// Expects glam's `[0, 1]` depth range with 0 at the near plane. Returns
    /// None if the matrix is degenerate.
    pub fn from_ndc(inv_view_proj: Mat4, ndc: Vec2) -> Option<Ray> {
        let near = inv_view_proj.project_point3(ndc.extend(0.0));
        let far = inv_view_proj.project_point3(ndc.extend(1.0));
        if !near.is_finite() {
            return None;
        }
        let direction = (far - near).try_normalize()?;
        Some(Ray::new(near, direction))
    }

    /// Pick ray through a viewport pixel (origin top-left, Y down)
    pub fn from_screen(inv_view_proj: Mat4, screen: Vec2, viewport: Vec2) -> Option<Ray> {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return None;
        }
        let ndc = Vec2::new(
            2.0 * screen.x / viewport.x - 1.0,
            1.0 - 2.0 * screen.y / viewport.y,
        );
        Self::from_ndc(inv_view_proj, ndc)
    }
}

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray
    pub t: f32,
    /// Barycentric weight of vertex 1
    pub u: f32,
    /// Barycentric weight of vertex 2
    pub v: f32,
}

/// Closest hit returned by [`Bvh::cast_ray`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhHit {
    /// Index into the mesh triangle list
    pub triangle: u32,
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

/// Moller-Trumbore with precomputed edges `e1 = v1 - v0`, `e2 = v2 - v0`
#[inline]
fn intersect_edges(origin: Vec3, dir: Vec3, v0: Vec3, e1: Vec3, e2: Vec3) -> Option<TriangleHit> {
    let pvec = dir.cross(e2);
    let det = e1.dot(pvec);

    // Parallel to the triangle plane
    if det.abs() < RAY_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = origin - v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(e1);
    let v = dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(qvec) * inv_det;
    if t <= RAY_EPSILON {
        return None;
    }
    Some(TriangleHit { t, u, v })
}

/// Moller-Trumbore ray-triangle intersection
pub fn ray_triangle_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<TriangleHit> {
    intersect_edges(ray_origin, ray_dir, v0, v1 - v0, v2 - v0)
}

/// Interpolate a Vec3 attribute using barycentric coordinates.
pub fn interpolate_vec3(v0: Vec3, v1: Vec3, v2: Vec3, u: f32, v: f32) -> Vec3 {
    let w = 1.0 - u - v;
    v0 * w + v1 * u + v2 * v
}

/// Interpolate a Vec2 attribute (like UVs) using barycentric coordinates.
pub fn interpolate_vec2(v0: Vec2, v1: Vec2, v2: Vec2, u: f32, v: f32) -> Vec2 {
    let w = 1.0 - u - v;
    v0 * w + v1 * u + v2 * v
}

/// Test every triangle of a leaf range; returns the slot and hit closer than `max_t`
#[inline]
fn intersect_leaf(
    bvh: &Bvh,
    origin: Vec3,
    dir: Vec3,
    start: usize,
    count: usize,
    max_t: f32,
) -> Option<(usize, TriangleHit)> {
    let end = start + count;
    let v0 = &bvh.v0[start..end];
    let e1 = &bvh.e1[start..end];
    let e2 = &bvh.e2[start..end];

    let mut best: Option<(usize, TriangleHit)> = None;
    let mut best_t = max_t;
    for i in 0..count {
        if let Some(hit) = intersect_edges(origin, dir, v0[i], e1[i], e2[i])
            && hit.t < best_t
        {
            best_t = hit.t;
            best = Some((start + i, hit));
        }
    }
    best
}

impl Bvh {
    /// Closest hit along a ray, None on a miss or an empty tree
    pub fn cast_ray(&self, origin: Vec3, direction: Vec3) -> Option<BvhHit> {
        if self.is_empty() || !origin.is_finite() || !direction.is_finite() {
            return None;
        }
        let inv_dir = direction.recip();

        let (root_enter, _) = self.node_bounds(0).ray_interval(origin, inv_dir)?;
        let mut stack: Vec<(u32, f32)> = Vec::with_capacity(64);
        stack.push((0, root_enter));

        let mut best: Option<(usize, TriangleHit)> = None;
        let mut best_t = f32::INFINITY;

        while let Some((index, t_enter)) = stack.pop() {
            if t_enter > best_t {
                continue;
            }
            match self.nodes[index as usize] {
                BvhNode::Leaf { start, count } => {
                    if let Some((slot, hit)) =
                        intersect_leaf(self, origin, direction, start as usize, count as usize, best_t)
                    {
                        best_t = hit.t;
                        best = Some((slot, hit));
                    }
                }
                BvhNode::Interior { left, right } => {
                    let hit_left = self.node_bounds(left as usize).ray_interval(origin, inv_dir);
                    let hit_right = self.node_bounds(right as usize).ray_interval(origin, inv_dir);
                    match (hit_left, hit_right) {
                        (Some((tl, _)), Some((tr, _))) => {
                            // Near child is popped first
                            if tl <= tr {
                                stack.push((right, tr));
                                stack.push((left, tl));
                            } else {
                                stack.push((left, tl));
                                stack.push((right, tr));
                            }
                        }
                        (Some((tl, _)), None) => stack.push((left, tl)),
                        (None, Some((tr, _))) => stack.push((right, tr)),
                        (None, None) => {}
                    }
                }
            }
        }

        best.map(|(slot, hit)| BvhHit {
            triangle: self.order[slot],
            t: hit.t,
            u: hit.u,
            v: hit.v,
        })
    }

    /// Cast a [`Ray`]
    #[inline]
    pub fn cast(&self, ray: &Ray) -> Option<BvhHit> {
        self.cast_ray(ray.origin, ray.direction)
    }
}

/// Brute-force closest hit over every triangle
pub fn raycast_triangles(
    ray_origin: Vec3,
    ray_dir: Vec3,
    positions: &[Vec3],
    triangles: &[[u32; 3]],
) -> Option<BvhHit> {
    let mut closest: Option<BvhHit> = None;
    for (tri_idx, &[a, b, c]) in triangles.iter().enumerate() {
        let Some(hit) = ray_triangle_intersection(
            ray_origin,
            ray_dir,
            positions[a as usize],
            positions[b as usize],
            positions[c as usize],
        ) else {
            continue;
        };
        let dominated = closest.is_some_and(|prev| hit.t >= prev.t);
        if !dominated {
            closest = Some(BvhHit {
                triangle: tri_idx as u32,
                t: hit.t,
                u: hit.u,
                v: hit.v,
            });
        }
    }
    if closest.is_none() {
        debug!("raycast_triangles: miss");
    }
    closest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes;

    const EPSILON: f32 = 1e-5;

    fn unit_triangle() -> (Vec3, Vec3, Vec3) {
        (
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_ray_triangle_hit() {
        let (v0, v1, v2) = unit_triangle();
        let origin = Vec3::new(0.25, 0.25, 1.0);
        let hit = ray_triangle_intersection(origin, -Vec3::Z, v0, v1, v2).unwrap();
        assert!((hit.t - 1.0).abs() < EPSILON);
        assert!((hit.u - 0.25).abs() < EPSILON);
        assert!((hit.v - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_ray_triangle_miss_and_behind() {
        let (v0, v1, v2) = unit_triangle();
        assert!(ray_triangle_intersection(Vec3::new(2.0, 2.0, 1.0), -Vec3::Z, v0, v1, v2).is_none());
        assert!(ray_triangle_intersection(Vec3::new(0.25, 0.25, 1.0), Vec3::Z, v0, v1, v2).is_none());
    }

    #[test]
    fn test_ray_parallel_to_triangle() {
        let (v0, v1, v2) = unit_triangle();
        assert!(ray_triangle_intersection(Vec3::new(-1.0, 0.2, 0.0), Vec3::X, v0, v1, v2).is_none());
    }

    #[test]
    fn test_interpolate_vec2() {
        let (a, b, c) = (Vec2::ZERO, Vec2::X, Vec2::Y);
        assert!((interpolate_vec2(a, b, c, 1.0, 0.0) - b).length() < EPSILON);
        assert!((interpolate_vec2(a, b, c, 0.0, 1.0) - c).length() < EPSILON);
        let center = (a + b + c) / 3.0;
        assert!((interpolate_vec2(a, b, c, 1.0 / 3.0, 1.0 / 3.0) - center).length() < EPSILON);
    }

    #[test]
    fn test_bvh_picks_closest_of_stacked_quads() {
        let mut positions = Vec::new();
        let mut triangles = Vec::new();
        for layer in 0..40u32 {
            let z = layer as f32 * -0.5;
            let base = positions.len() as u32;
            positions.extend_from_slice(&[
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(1.0, -1.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(-1.0, 1.0, z),
            ]);
            triangles.push([base, base + 1, base + 2]);
            triangles.push([base, base + 2, base + 3]);
        }
        let bvh = Bvh::build(&positions, &triangles, 4);
        let hit = bvh.cast_ray(Vec3::new(0.1, 0.3, 5.0), -Vec3::Z).unwrap();
        assert!((hit.t - 5.0).abs() < EPSILON);
        assert!(hit.triangle < 2);

        // From between layers looking down
        let hit = bvh.cast_ray(Vec3::new(0.1, 0.3, -3.2), -Vec3::Z).unwrap();
        assert!((hit.t - 0.3).abs() < EPSILON);
    }

    #[test]
    fn test_bvh_matches_brute_force_on_sphere() {
        let mesh = test_meshes::uv_sphere(1.0, 24, 48);
        let bvh = Bvh::build(mesh.positions(), mesh.triangles(), 16);

        let mut seed = 7u32;
        let mut next = || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
        };
        for _ in 0..300 {
            let origin = Vec3::new(next(), next(), next()) * 3.0;
            let target = Vec3::new(next(), next(), next()) * 0.8;
            let dir = (target - origin).normalize();
            let fast = bvh.cast_ray(origin, dir);
            let slow = raycast_triangles(origin, dir, mesh.positions(), mesh.triangles());
            match (fast, slow) {
                (Some(a), Some(b)) => assert!((a.t - b.t).abs() < 1e-4),
                (None, None) => {}
                other => panic!("mismatch: {other:?}"),
            }
        }
    }

    #[test]
    fn test_empty_bvh_misses() {
        let bvh = Bvh::empty();
        assert!(bvh.cast_ray(Vec3::ZERO, Vec3::Z).is_none());
    }

    #[test]
    fn test_ray_from_ndc_center() {
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let ray = Ray::from_ndc((proj * view).inverse(), Vec2::ZERO).unwrap();
        assert!((ray.direction - -Vec3::Z).length() < 1e-3);
        assert!((ray.origin.x).abs() < 1e-3 && (ray.origin.y).abs() < 1e-3);
    }
}
