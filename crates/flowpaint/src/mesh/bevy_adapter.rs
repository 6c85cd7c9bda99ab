//! Conversion from Bevy render meshes

use bevy::mesh::{Indices, VertexAttributeValues};
use glam::{Vec2, Vec3};

use super::{Mesh, MeshError};

fn float2(values: &VertexAttributeValues) -> Option<Vec<Vec2>> {
    match values {
        VertexAttributeValues::Float32x2(v) => Some(v.iter().map(|&uv| Vec2::from(uv)).collect()),
        _ => None,
    }
}

impl Mesh {
    /// Extract positions, normals, UV0/UV1 and indices from a Bevy mesh.
    ///
    /// Missing normals are synthesized by [`Mesh::new`].
    pub fn from_bevy_mesh(mesh: &bevy::mesh::Mesh) -> Result<Self, MeshError> {
        use bevy::mesh::Mesh as BevyMesh;

        let positions: Vec<Vec3> = mesh
            .attribute(BevyMesh::ATTRIBUTE_POSITION)
            .and_then(|attr| attr.as_float3())
            .ok_or(MeshError::NoPositions)?
            .iter()
            .map(|&p| Vec3::from(p))
            .collect();

        let normals: Vec<Vec3> = mesh
            .attribute(BevyMesh::ATTRIBUTE_NORMAL)
            .and_then(|attr| attr.as_float3())
            .map(|n| n.iter().map(|&n| Vec3::from(n)).collect())
            .unwrap_or_default();

        let uv_sets: Vec<Vec<Vec2>> = [BevyMesh::ATTRIBUTE_UV_0, BevyMesh::ATTRIBUTE_UV_1]
            .into_iter()
            .map_while(|attribute| mesh.attribute(attribute).and_then(float2))
            .collect();

        let indices: Vec<u32> = match mesh.indices() {
            Some(Indices::U16(idx)) => idx.iter().map(|&i| i as u32).collect(),
            Some(Indices::U32(idx)) => idx.to_vec(),
            None => return Err(MeshError::NoIndices),
        };

        Self::new(positions, normals, uv_sets, indices)
    }
}
