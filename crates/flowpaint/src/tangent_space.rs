//! Per-vertex tangent frames and projection of world directions onto the
//! surface.
//!
//! Frames are accumulated per triangle from position edges and UV deltas
//! (Lengyel's method), then orthonormalized per vertex against the normal.
//! At a hit point the three vertex frames are blended barycentrically and
//! re-orthonormalized, and a world direction is expressed in (T, B).

use glam::{Mat3, Vec2, Vec3};
use tracing::{info, warn};

use crate::constants::{TANGENT_EPSILON, UV_DET_EPSILON};
use crate::raycast::interpolate_vec3;

/// Tangent perpendicular to `normal` built from the world axis least aligned
/// with it
pub fn fallback_tangent(normal: Vec3) -> Vec3 {
    let a = normal.abs();
    let axis = if a.x <= a.y && a.x <= a.z {
        Vec3::X
    } else if a.y <= a.z {
        Vec3::Y
    } else {
        Vec3::Z
    };
    (axis - normal * normal.dot(axis)).normalize_or(Vec3::X)
}

/// Immutable tangent/bitangent/normal per vertex
#[derive(Debug, Clone, Default)]
pub struct TangentFrames {
    tangents: Vec<Vec3>,
    bitangents: Vec<Vec3>,
    normals: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl TangentFrames {
    /// Compute frames for a mesh. `uvs` is the UV set that defines the
    /// tangent directions.
    pub fn precompute(
        positions: &[Vec3],
        normals: &[Vec3],
        uvs: &[Vec2],
        triangles: &[[u32; 3]],
    ) -> Self {
        let vertex_count = positions.len();
        let mut tan1 = vec![Vec3::ZERO; vertex_count];
        let mut tan2 = vec![Vec3::ZERO; vertex_count];
        let mut skipped = 0usize;

        for &[i0, i1, i2] in triangles {
            let (i0, i1, i2) = (i0 as usize, i1 as usize, i2 as usize);
            let e1 = positions[i1] - positions[i0];
            let e2 = positions[i2] - positions[i0];
            let duv1 = uvs[i1] - uvs[i0];
            let duv2 = uvs[i2] - uvs[i0];

            let det = duv1.x * duv2.y - duv2.x * duv1.y;
            if det.abs() < UV_DET_EPSILON {
                skipped += 1;
                continue;
            }
            let r = 1.0 / det;
            let sdir = (e1 * duv2.y - e2 * duv1.y) * r;
            let tdir = (e2 * duv1.x - e1 * duv2.x) * r;

            for i in [i0, i1, i2] {
                tan1[i] += sdir;
                tan2[i] += tdir;
            }
        }

        let mut fallbacks = 0usize;
        let mut tangents = Vec::with_capacity(vertex_count);
        let mut bitangents = Vec::with_capacity(vertex_count);
        let mut unit_normals = Vec::with_capacity(vertex_count);

        for i in 0..vertex_count {
            let n = normals
                .get(i)
                .and_then(|n| n.try_normalize())
                .unwrap_or(Vec3::Y);

            let projected = tan1[i] - n * n.dot(tan1[i]);
            let t = if projected.length() > TANGENT_EPSILON {
                projected.normalize()
            } else {
                fallbacks += 1;
                fallback_tangent(n)
            };

            let mut b = n.cross(t).normalize();
            if b.dot(tan2[i]) < 0.0 {
                b = -b;
            }

            tangents.push(t);
            bitangents.push(b);
            unit_normals.push(n);
        }

        if skipped > 0 || fallbacks > 0 {
            warn!(
                "TangentFrames::precompute: {} degenerate UV triangles skipped, {} vertices using fallback tangent",
                skipped, fallbacks
            );
        }
        info!(
            "TangentFrames::precompute: {} vertices, {} triangles",
            vertex_count,
            triangles.len()
        );

        Self {
            tangents,
            bitangents,
            normals: unit_normals,
            triangles: triangles.to_vec(),
        }
    }

    #[inline]
    pub fn tangents(&self) -> &[Vec3] {
        &self.tangents
    }

    #[inline]
    pub fn bitangents(&self) -> &[Vec3] {
        &self.bitangents
    }

    #[inline]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.tangents.len()
    }

    /// Orthonormal (T, B, N) at barycentric (u, v) of a triangle
    ///
    /// u weights vertex 1, v weights vertex 2, vertex 0 gets `1 - u - v`.
    pub fn basis_at(&self, tri_index: usize, u: f32, v: f32) -> (Vec3, Vec3, Vec3) {
        let [i0, i1, i2] = self.triangles[tri_index].map(|i| i as usize);
        let lerp = |attr: &[Vec3]| interpolate_vec3(attr[i0], attr[i1], attr[i2], u, v);

        let n = lerp(&self.normals).try_normalize().unwrap_or(Vec3::Y);
        let raw_t = lerp(&self.tangents);
        let raw_b = lerp(&self.bitangents);

        let t = (raw_t - n * n.dot(raw_t))
            .try_normalize()
            .unwrap_or_else(|| fallback_tangent(n));
        let mut b = n.cross(t);
        if b.dot(raw_b) < 0.0 {
            b = -b;
        }
        (t, b, n)
    }

    /// Express a world direction in the surface's (T, B) plane at a hit
    ///
    /// The direction is normalized first; the result is its tangent-plane
    /// part, shorter than 1 when the direction leaves the surface.
    pub fn world_dir_to_tangent_plane(&self, world_dir: Vec3, tri_index: usize, u: f32, v: f32) -> Vec2 {
        let (t, b, n) = self.basis_at(tri_index, u, v);
        let world_to_tangent = Mat3::from_cols(t, b, n).transpose();
        let local = world_to_tangent * world_dir.normalize_or_zero();
        Vec2::new(local.x, local.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::test_meshes;

    #[test]
    fn test_quad_frames_follow_uvs() {
        let mesh = test_meshes::quad();
        let frames = TangentFrames::precompute(
            mesh.positions(),
            mesh.normals(),
            mesh.uv_set(0).unwrap(),
            mesh.triangles(),
        );
        for i in 0..4 {
            assert!((frames.tangents()[i] - Vec3::X).length() < 1e-5);
            assert!((frames.bitangents()[i] - Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn test_flipped_uvs_flip_bitangent() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let normals = vec![Vec3::Z; 3];
        // V runs opposite to +Y
        let uvs = vec![Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 0.0)];
        let frames = TangentFrames::precompute(&positions, &normals, &uvs, &[[0, 1, 2]]);
        assert!((frames.bitangents()[0] + Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_degenerate_uvs_use_fallback() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let normals = vec![Vec3::Z; 3];
        let uvs = vec![Vec2::ZERO; 3];
        let frames = TangentFrames::precompute(&positions, &normals, &uvs, &[[0, 1, 2]]);
        for i in 0..3 {
            let t = frames.tangents()[i];
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!(t.dot(Vec3::Z).abs() < 1e-5);
        }
    }

    #[test]
    fn test_fallback_tangent_is_perpendicular() {
        for n in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(1.0, 2.0, -3.0).normalize()] {
            let t = fallback_tangent(n);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!(t.dot(n).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sphere_frames_orthonormal() {
        let mesh = test_meshes::uv_sphere(1.0, 12, 24);
        let frames = TangentFrames::precompute(
            mesh.positions(),
            mesh.normals(),
            mesh.uv_set(0).unwrap(),
            mesh.triangles(),
        );
        for i in 0..frames.vertex_count() {
            let (t, b, n) = (frames.tangents()[i], frames.bitangents()[i], frames.normals()[i]);
            assert!((t.length() - 1.0).abs() < 1e-4);
            assert!((b.length() - 1.0).abs() < 1e-4);
            assert!(t.dot(n).abs() < 1e-4);
            assert!(b.dot(t).abs() < 1e-4);
        }
    }

    #[test]
    fn test_world_dir_on_quad() {
        let mesh = test_meshes::quad();
        let frames = TangentFrames::precompute(
            mesh.positions(),
            mesh.normals(),
            mesh.uv_set(0).unwrap(),
            mesh.triangles(),
        );
        let flow = frames.world_dir_to_tangent_plane(Vec3::new(3.0, 0.0, 0.0), 0, 0.2, 0.3);
        assert!((flow - Vec2::X).length() < 1e-5);

        let flow = frames.world_dir_to_tangent_plane(Vec3::new(1.0, 1.0, 0.0), 1, 0.3, 0.3);
        let expected = Vec2::splat(std::f32::consts::FRAC_1_SQRT_2);
        assert!((flow - expected).length() < 1e-5);

        // Motion along the normal has no tangent-plane component
        let flow = frames.world_dir_to_tangent_plane(Vec3::Z, 0, 0.2, 0.3);
        assert!(flow.length() < 1e-5);
    }
}
