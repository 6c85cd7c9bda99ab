//! The paintable 3D surface: mesh, BVH and tangent frames built together

use glam::{Vec2, Vec3};
use tracing::info;

use crate::mesh::{Mesh, MeshError};
use crate::raycast::{Ray, interpolate_vec2, interpolate_vec3};
use crate::spatial::Bvh;
use crate::tangent_space::TangentFrames;

/// Minimum world-space motion that yields a direction
const MIN_WORLD_MOTION: f32 = 1e-7;

/// A ray hit resolved against mesh attributes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub triangle: u32,
    pub t: f32,
    /// Barycentric weight of vertex 1
    pub u: f32,
    /// Barycentric weight of vertex 2
    pub v: f32,
    pub position: Vec3,
    /// UV in the active set (unwrapped; may lie outside `[0, 1)`)
    pub uv: Vec2,
    pub normal: Vec3,
}

/// Mesh plus its acceleration structures
///
/// Built once on import. A session only casts rays once this exists, so the
/// BVH and frames are always complete when queried.
#[derive(Debug, Clone)]
pub struct SurfaceModel {
    mesh: Mesh,
    bvh: Bvh,
    frames: TangentFrames,
    uv_set: usize,
}

impl SurfaceModel {
    /// Build the BVH and tangent frames for `mesh` using UV set `uv_set`
    pub fn build(mesh: Mesh, leaf_size: usize, uv_set: usize) -> Result<Self, MeshError> {
        let uvs = mesh.uv_set(uv_set).ok_or(MeshError::UvSetOutOfRange {
            index: uv_set,
            count: mesh.uv_set_count(),
        })?;

        let bvh = Bvh::build(mesh.positions(), mesh.triangles(), leaf_size);
        let frames = TangentFrames::precompute(mesh.positions(), mesh.normals(), uvs, mesh.triangles());
        info!(
            "SurfaceModel::build: {} vertices, {} triangles, uv set {}",
            mesh.vertex_count(),
            mesh.triangle_count(),
            uv_set
        );

        Ok(Self {
            mesh,
            bvh,
            frames,
            uv_set,
        })
    }

    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[inline]
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    #[inline]
    pub fn frames(&self) -> &TangentFrames {
        &self.frames
    }

    #[inline]
    pub fn uv_set(&self) -> usize {
        self.uv_set
    }

    /// Closest hit with interpolated position, UV and normal
    pub fn cast(&self, ray: &Ray) -> Option<SurfaceHit> {
        let hit = self.bvh.cast(ray)?;
        let [i0, i1, i2] = self.mesh.triangles()[hit.triangle as usize].map(|i| i as usize);
        let uvs = self.mesh.uv_set(self.uv_set)?;
        let normals = self.mesh.normals();

        let uv = interpolate_vec2(uvs[i0], uvs[i1], uvs[i2], hit.u, hit.v);
        let normal = interpolate_vec3(normals[i0], normals[i1], normals[i2], hit.u, hit.v)
            .normalize_or(Vec3::Y);

        Some(SurfaceHit {
            triangle: hit.triangle,
            t: hit.t,
            u: hit.u,
            v: hit.v,
            position: ray.at(hit.t),
            uv,
            normal,
        })
    }

    /// Paint direction for motion between two hits, in the tangent frame at
    /// `to`. None when the motion is too small or normal to the surface.
    pub fn flow_direction(&self, from: &SurfaceHit, to: &SurfaceHit) -> Option<Vec2> {
        self.flow_at(to.position - from.position, to)
    }

    /// Project world-space `motion` into the tangent frame at `hit`
    pub fn flow_at(&self, motion: Vec3, hit: &SurfaceHit) -> Option<Vec2> {
        if !motion.is_finite() || motion.length() < MIN_WORLD_MOTION {
            return None;
        }
        self.frames
            .world_dir_to_tangent_plane(motion, hit.triangle as usize, hit.u, hit.v)
            .try_normalize()
    }
}
