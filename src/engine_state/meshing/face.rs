//! Quad geometry for a single voxel face.
//!
//! Every face is a unit square on one side of the voxel's unit cube, wound
//! counter-clockwise when seen from outside and split into two triangles.

use crate::engine_state::voxels::voxel::block_side::BlockSide;

/// A rectangle of the shared texture atlas, in normalised coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRegion {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

/// The atlas rectangle sampled by every face of every voxel type.
pub const ATLAS_REGION: TextureRegion = TextureRegion {
    u0: 0.25,
    v0: 0.0,
    u1: 0.5,
    v1: 1.0,
};

/// Corner indices of the two triangles of a quad.
pub const FACE_TRIANGLES: [usize; 6] = [0, 1, 2, 0, 2, 3];

/// Vertices emitted per face.
pub const VERTICES_PER_FACE: usize = FACE_TRIANGLES.len();

/// Corners of a face on the unit cube at the origin, counter-clockwise from
/// the lower-left corner as seen from outside.
pub fn face_corners(side: BlockSide) -> [[f32; 3]; 4] {
    match side {
        BlockSide::BACK => [
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
        ],
        BlockSide::FRONT => [
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ],
        BlockSide::RIGHT => [
            [1.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 1.0, 1.0],
        ],
        BlockSide::LEFT => [
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [0.0, 1.0, 0.0],
        ],
        BlockSide::TOP => [
            [0.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ],
        BlockSide::BOTTOM => [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
        ],
    }
}

/// Texture coordinates of the four corners, matching [`face_corners`].
pub fn corner_tex_coords(region: TextureRegion) -> [[f32; 2]; 4] {
    [
        [region.u0, region.v1],
        [region.u1, region.v1],
        [region.u1, region.v0],
        [region.u0, region.v0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    #[test]
    fn winding_agrees_with_normal() {
        for side in BlockSide::all() {
            let corners = face_corners(side);
            for triangle in FACE_TRIANGLES.chunks(3) {
                let a = corners[triangle[0]];
                let b = corners[triangle[1]];
                let c = corners[triangle[2]];
                assert_eq!(cross(sub(b, a), sub(c, a)), side.normal(), "{:?}", side);
            }
        }
    }

    #[test]
    fn corners_lie_on_the_face_plane() {
        for side in BlockSide::all() {
            let normal = side.normal();
            let axis = normal.iter().position(|n| *n != 0.0).unwrap();
            let plane = if normal[axis] > 0.0 { 1.0 } else { 0.0 };
            assert!(face_corners(side).iter().all(|c| c[axis] == plane));
        }
    }
}
