//! Immutable triangle mesh supplied by the import collaborator.
//!
//! The engine never parses files; it receives already-decoded attribute
//! arrays and validates them once here.

#[cfg(feature = "bevy")]
mod bevy_adapter;

use glam::{Vec2, Vec3};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("Index count {0} is not divisible by 3")]
    IndexCount(usize),
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("Attribute {attribute} has {actual} entries, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Vertex {0} has a non-finite position")]
    NonFinitePosition(usize),
    #[error("Mesh has no position attribute")]
    NoPositions,
    #[error("Mesh has no triangle indices")]
    NoIndices,
    #[error("UV set {index} requested, mesh has {count}")]
    UvSetOutOfRange { index: usize, count: usize },
}

/// Triangle mesh: positions, normals, one or more UV sets and indices
#[derive(Debug, Clone)]
pub struct Mesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uv_sets: Vec<Vec<Vec2>>,
    indices: Vec<[u32; 3]>,
}

impl Mesh {
    /// Build and validate a mesh.
    ///
    /// `normals` may be empty, in which case area-weighted face normals are
    /// synthesized. `uv_sets` may be empty, in which case a single all-zero
    /// set is created (tangent frames then use their per-vertex fallback).
    pub fn new(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        uv_sets: Vec<Vec<Vec2>>,
        indices: Vec<u32>,
    ) -> Result<Self, MeshError> {
        let vertex_count = positions.len();

        if indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(indices.len()));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        if let Some(i) = positions.iter().position(|p| !p.is_finite()) {
            return Err(MeshError::NonFinitePosition(i));
        }

        let triangles: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();

        let normals = if normals.is_empty() {
            debug!("Mesh::new: synthesizing normals for {} vertices", vertex_count);
            face_weighted_normals(&positions, &triangles)
        } else if normals.len() != vertex_count {
            return Err(MeshError::AttributeLength {
                attribute: "normal",
                expected: vertex_count,
                actual: normals.len(),
            });
        } else {
            normals
        };

        let mut uv_sets = uv_sets;
        if let Some(set) = uv_sets.iter().find(|s| s.len() != vertex_count) {
            return Err(MeshError::AttributeLength {
                attribute: "uv",
                expected: vertex_count,
                actual: set.len(),
            });
        }
        if uv_sets.is_empty() {
            warn!("Mesh::new: no UV sets supplied, painting will map every hit to UV (0, 0)");
            uv_sets.push(vec![Vec2::ZERO; vertex_count]);
        }

        if triangles.is_empty() {
            warn!("Mesh::new: mesh has no triangles");
        }

        Ok(Self {
            positions,
            normals,
            uv_sets,
            indices: triangles,
        })
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    #[inline]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.indices
    }

    /// UV set by index, None if out of range
    #[inline]
    pub fn uv_set(&self, index: usize) -> Option<&[Vec2]> {
        self.uv_sets.get(index).map(Vec::as_slice)
    }

    #[inline]
    pub fn uv_set_count(&self) -> usize {
        self.uv_sets.len()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Vertex positions of a triangle
    pub fn triangle_positions(&self, tri_index: usize) -> (Vec3, Vec3, Vec3) {
        let [i0, i1, i2] = self.indices[tri_index];
        (
            self.positions[i0 as usize],
            self.positions[i1 as usize],
            self.positions[i2 as usize],
        )
    }
}

/// Per-vertex normals from summed (area-weighted) face normals
fn face_weighted_normals(positions: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for &[i0, i1, i2] in triangles {
        let p0 = positions[i0 as usize];
        let p1 = positions[i1 as usize];
        let p2 = positions[i2 as usize];
        // Unnormalized cross product is proportional to triangle area
        let face = (p1 - p0).cross(p2 - p0);
        normals[i0 as usize] += face;
        normals[i1 as usize] += face;
        normals[i2 as usize] += face;
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
    }
    normals
}

#[cfg(test)]
pub(crate) mod test_meshes {
    use super::*;

    /// Unit quad in the XY plane, UVs matching positions
    pub fn quad() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let normals = vec![Vec3::Z; 4];
        let uvs = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        Mesh::new(positions, normals, vec![uvs], vec![0, 1, 2, 0, 2, 3]).unwrap()
    }

    /// UV sphere with `rings * segments * 2` triangles
    pub fn uv_sphere(radius: f32, rings: u32, segments: u32) -> Mesh {
        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        for r in 0..=rings {
            let v = r as f32 / rings as f32;
            let theta = v * std::f32::consts::PI;
            for s in 0..=segments {
                let u = s as f32 / segments as f32;
                let phi = u * std::f32::consts::TAU;
                let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                positions.push(n * radius);
                normals.push(n);
                uvs.push(Vec2::new(u, v));
            }
        }
        let mut indices = Vec::new();
        let stride = segments + 1;
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        Mesh::new(positions, normals, vec![uvs], indices).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_mesh() {
        let mesh = test_meshes::quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.uv_set_count(), 1);
        assert_eq!(mesh.triangles()[1], [0, 2, 3]);
    }

    #[test]
    fn test_rejects_bad_index_count() {
        let result = Mesh::new(vec![Vec3::ZERO; 3], vec![], vec![], vec![0, 1]);
        assert_eq!(result.unwrap_err(), MeshError::IndexCount(2));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let result = Mesh::new(vec![Vec3::ZERO; 3], vec![], vec![], vec![0, 1, 7]);
        assert!(matches!(
            result,
            Err(MeshError::IndexOutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_uvs() {
        let result = Mesh::new(
            vec![Vec3::ZERO; 3],
            vec![],
            vec![vec![Vec2::ZERO; 2]],
            vec![0, 1, 2],
        );
        assert!(matches!(
            result,
            Err(MeshError::AttributeLength { attribute: "uv", .. })
        ));
    }

    #[test]
    fn test_synthesizes_missing_attributes() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let mesh = Mesh::new(positions, vec![], vec![], vec![0, 1, 2]).unwrap();
        assert_eq!(mesh.uv_set_count(), 1);
        for n in mesh.normals() {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_empty_mesh_is_valid() {
        let mesh = Mesh::new(vec![], vec![], vec![], vec![]).unwrap();
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_sphere_triangle_count() {
        let mesh = test_meshes::uv_sphere(1.0, 8, 16);
        assert_eq!(mesh.triangle_count(), 8 * 16 * 2);
    }
}
