//! Surface mesh buffers produced per chunk.
//!
//! The mesh is a flat triangle list: every face contributes six independent
//! vertices and there is no index buffer.

use cgmath::Point3;

use crate::engine_state::voxels::voxel::block_side::BlockSide;

use super::face::{corner_tex_coords, face_corners, ATLAS_REGION, FACE_TRIANGLES, VERTICES_PER_FACE};

/// An interleaved vertex, laid out for direct upload to a GPU buffer.
///
/// # Memory Layout
/// - Position: 3x f32 (12 bytes)
/// - Normal: 3x f32 (12 bytes)
/// - Texture Coordinates: 2x f32 (8 bytes)
///
/// Total size: 32 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position relative to the chunk origin
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// UV texture coordinates into the shared atlas
    pub tex_coords: [f32; 2],
}

/// Flat vertex / normal / texcoord buffers of one chunk.
///
/// All three buffers always have the same length, a multiple of six.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMesh {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
}

impl ChunkMesh {
    /// Creates an empty mesh with room for exactly `faces` faces.
    pub fn with_face_capacity(faces: usize) -> Self {
        let vertices = faces * VERTICES_PER_FACE;
        ChunkMesh {
            positions: Vec::with_capacity(vertices),
            normals: Vec::with_capacity(vertices),
            texcoords: Vec::with_capacity(vertices),
        }
    }

    /// Appends the two triangles of `side` of the voxel at `local`.
    pub fn push_face(&mut self, local: Point3<usize>, side: BlockSide) {
        let corners = face_corners(side);
        let tex_coords = corner_tex_coords(ATLAS_REGION);
        let normal = side.normal();
        let offset = [local.x as f32, local.y as f32, local.z as f32];

        for corner in FACE_TRIANGLES {
            let [x, y, z] = corners[corner];
            self.positions
                .push([x + offset[0], y + offset[1], z + offset[2]]);
            self.normals.push(normal);
            self.texcoords.push(tex_coords[corner]);
        }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn texcoords(&self) -> &[[f32; 2]] {
        &self.texcoords
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn face_count(&self) -> usize {
        self.positions.len() / VERTICES_PER_FACE
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The mesh as one interleaved buffer. Cast it with
    /// `bytemuck::cast_slice` to get upload-ready bytes.
    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.texcoords)
            .map(|((position, normal), tex_coords)| Vertex {
                position: *position,
                normal: *normal,
                tex_coords: *tex_coords,
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn vertex_capacity(&self) -> usize {
        self.positions
            .capacity()
            .min(self.normals.capacity())
            .min(self.texcoords.capacity())
    }
}
