//! # Chunk Iteration Module
//!
//! Iteration over the solid cells of a [`VoxelGrid`], driven by its solid bit
//! mask so runs of air are skipped without touching the voxel array.

use bitvec::slice::IterOnes;
use cgmath::Point3;

use crate::engine_state::voxels::voxel::Voxel;

use super::voxel_grid::VoxelGrid;

/// An iterator over all solid voxels of a grid together with their local
/// coordinates, in storage order.
pub struct SolidVoxelIterator<'a> {
    /// Reference to the grid being iterated over
    grid: &'a VoxelGrid,
    /// Indices of the set bits of the solid mask
    solid_indices: IterOnes<'a, usize, bitvec::order::Lsb0>,
}

impl<'a> SolidVoxelIterator<'a> {
    pub(super) fn new(
        grid: &'a VoxelGrid,
        solid_indices: IterOnes<'a, usize, bitvec::order::Lsb0>,
    ) -> Self {
        SolidVoxelIterator {
            grid,
            solid_indices,
        }
    }
}

impl<'a> Iterator for SolidVoxelIterator<'a> {
    type Item = (Point3<usize>, &'a Voxel);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.solid_indices.next()?;
        Some((self.grid.position_of(index), &self.grid.voxels()[index]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.solid_indices.size_hint()
    }
}
