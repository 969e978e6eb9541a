//! # Voxel Type Module
//!
//! The kinds of voxel a chunk can contain and their compact integer encoding.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::VoxelTypeSize;

/// Enumerates all possible voxel types in the world.
///
/// `AIR` is the only non-solid type. The `FromPrimitive` derive allows
/// decoding the compact `VoxelTypeSize` stored in each [`Voxel`](super::Voxel).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, FromPrimitive)]
pub enum VoxelType {
    /// Empty space, never meshed.
    #[default]
    AIR,

    /// Top soil layer of the Perlin terrain.
    GRASS,

    /// A few voxels of soil below the grass.
    DIRT,

    /// Everything deeper below the surface.
    STONE,
}

impl VoxelType {
    /// Decodes a stored voxel type. Unknown values decode to `AIR`.
    pub fn from_int(vtype: VoxelTypeSize) -> Self {
        FromPrimitive::from_u8(vtype).unwrap_or(VoxelType::AIR)
    }

    /// Whether this type occludes the faces of its neighbours.
    pub fn is_solid(self) -> bool {
        self != VoxelType::AIR
    }
}
