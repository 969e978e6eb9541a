//! # Block Side Module
//!
//! The six axis-aligned faces of a voxel, in the fixed order the mesh builder
//! emits them.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel.
///
/// The discriminants follow the emission order used when meshing:
/// [BACK, FRONT, RIGHT, LEFT, TOP, BOTTOM]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The back face (facing negative Z)
    BACK = 0,

    /// The front face (facing positive Z)
    FRONT = 1,

    /// The right face (facing positive X)
    RIGHT = 2,

    /// The left face (facing negative X)
    LEFT = 3,

    /// The top face (facing positive Y)
    TOP = 4,

    /// The bottom face (facing negative Y)
    BOTTOM = 5,
}

impl BlockSide {
    /// Returns all six faces in emission order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::BACK,
            BlockSide::FRONT,
            BlockSide::RIGHT,
            BlockSide::LEFT,
            BlockSide::TOP,
            BlockSide::BOTTOM,
        ]
    }

    /// Unit step from a voxel to the neighbour this face touches.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
        }
    }

    /// Outward face normal.
    pub fn normal(self) -> [f32; 3] {
        let offset = self.offset();
        [offset.x as f32, offset.y as f32, offset.z as f32]
    }

    /// The face on the other side of the voxel.
    pub fn opposite(self) -> BlockSide {
        match self {
            BlockSide::BACK => BlockSide::FRONT,
            BlockSide::FRONT => BlockSide::BACK,
            BlockSide::RIGHT => BlockSide::LEFT,
            BlockSide::LEFT => BlockSide::RIGHT,
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::BOTTOM => BlockSide::TOP,
        }
    }

    /// Maps an outward unit step back to the face it leaves through.
    pub fn from_offset(offset: Vector3<i32>) -> Option<BlockSide> {
        BlockSide::all()
            .into_iter()
            .find(|side| side.offset() == offset)
    }
}
