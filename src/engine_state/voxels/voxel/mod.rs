//! # Voxel Module
//!
//! The single cell of a voxel grid: its type plus the adjacency counts cached
//! by the last mesh build.

use voxel_type::VoxelType;

pub mod block_side;
pub mod voxel_type;

/// The underlying integer type used to store voxel types in memory.
pub type VoxelTypeSize = u8;

/// A single voxel cell.
///
/// `neighbor_count` and `border_count` are derived data. They are rewritten by
/// [`VoxelGrid::refresh_adjacency`](crate::engine_state::voxels::chunk::VoxelGrid::refresh_adjacency)
/// every time the owning chunk is meshed and are zero on a freshly generated grid.
///
/// # Memory Layout
/// `#[repr(C)]` with three bytes, so a grid can be viewed as raw bytes.
#[repr(C)]
#[derive(Copy, Clone, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct Voxel {
    /// The type of this voxel, encoded as a `VoxelTypeSize`.
    pub voxel_type: VoxelTypeSize,
    /// Solid axis-adjacent cells inside the same grid (0..=6).
    pub neighbor_count: u8,
    /// Axis directions in which this cell touches the grid boundary (0..=6).
    pub border_count: u8,
}

impl Voxel {
    /// Creates a new voxel of the specified type with empty adjacency data.
    pub fn new(voxel_type: VoxelType) -> Self {
        Voxel {
            voxel_type: voxel_type as VoxelTypeSize,
            neighbor_count: 0,
            border_count: 0,
        }
    }

    pub fn voxel_type(&self) -> VoxelType {
        VoxelType::from_int(self.voxel_type)
    }

    pub fn is_solid(&self) -> bool {
        self.voxel_type().is_solid()
    }

    /// True when every direction is covered by a solid neighbour or the grid
    /// edge, according to the cached counts.
    pub fn is_enclosed(&self) -> bool {
        self.neighbor_count + self.border_count == 6
    }
}
