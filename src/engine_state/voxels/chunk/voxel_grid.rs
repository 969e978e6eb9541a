//! # Voxel Grid Module
//!
//! Dense storage for the voxels of one chunk.
//!
//! ## Storage
//!
//! Cells live in a flat `Vec<Voxel>` in row-major order (`x` fastest, then
//! `y`, then `z`), so every in-range cell is addressed in O(1). A `BitVec`
//! mirrors which cells are solid: neighbour checks during meshing only touch
//! the bit mask, and iteration over solid cells can skip air words at once.

use bitvec::vec::BitVec;
use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::voxel::{block_side::BlockSide, voxel_type::VoxelType, Voxel};

use super::chunk_iteration::SolidVoxelIterator;

/// Result of addressing a cell that may lie outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLookup<'a> {
    InBounds(&'a Voxel),
    OutOfBounds,
}

impl<'a> GridLookup<'a> {
    /// The voxel, if the lookup was in range.
    pub fn voxel(self) -> Option<&'a Voxel> {
        match self {
            GridLookup::InBounds(voxel) => Some(voxel),
            GridLookup::OutOfBounds => None,
        }
    }
}

/// A fixed-size 3D array of voxels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoxelGrid {
    extents: Vector3<usize>,
    voxels: Vec<Voxel>,
    /// One bit per cell, set when the cell is solid. Same indexing as `voxels`.
    solid_array: BitVec,
}

impl VoxelGrid {
    /// Creates a grid of the given extents filled with air.
    pub fn new(extents: Vector3<usize>) -> Self {
        let len = extents.x * extents.y * extents.z;
        VoxelGrid {
            extents,
            voxels: vec![Voxel::new(VoxelType::AIR); len],
            solid_array: BitVec::repeat(false, len),
        }
    }

    /// Creates a grid by asking `voxel_at` for the type of every cell.
    ///
    /// Cells are visited in storage order, so a deterministic closure yields a
    /// bit-identical grid.
    pub fn from_fn(
        extents: Vector3<usize>,
        mut voxel_at: impl FnMut(Point3<usize>) -> VoxelType,
    ) -> Self {
        let len = extents.x * extents.y * extents.z;
        let mut voxels = Vec::with_capacity(len);
        let mut solid_array = BitVec::with_capacity(len);

        for z in 0..extents.z {
            for y in 0..extents.y {
                for x in 0..extents.x {
                    let voxel_type = voxel_at(Point3::new(x, y, z));
                    solid_array.push(voxel_type.is_solid());
                    voxels.push(Voxel::new(voxel_type));
                }
            }
        }

        VoxelGrid {
            extents,
            voxels,
            solid_array,
        }
    }

    pub fn extents(&self) -> Vector3<usize> {
        self.extents
    }

    /// Number of cells in the grid.
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// All cells in storage order.
    pub fn voxels(&self) -> &[Voxel] {
        &self.voxels
    }

    /// Storage index of a local coordinate, or `None` when out of range.
    pub fn index_of(&self, local: Point3<usize>) -> Option<usize> {
        if local.x >= self.extents.x || local.y >= self.extents.y || local.z >= self.extents.z {
            return None;
        }
        Some(local.x + self.extents.x * (local.y + self.extents.y * local.z))
    }

    /// Local coordinate of a storage index.
    pub fn position_of(&self, index: usize) -> Point3<usize> {
        let x = index % self.extents.x;
        let y = (index / self.extents.x) % self.extents.y;
        let z = index / (self.extents.x * self.extents.y);
        Point3::new(x, y, z)
    }

    pub fn get(&self, local: Point3<usize>) -> GridLookup<'_> {
        match self.index_of(local) {
            Some(index) => GridLookup::InBounds(&self.voxels[index]),
            None => GridLookup::OutOfBounds,
        }
    }

    /// Like [`VoxelGrid::get`] but accepts coordinates that may be negative.
    pub fn get_signed(&self, local: Point3<i32>) -> GridLookup<'_> {
        match Self::to_unsigned(local) {
            Some(local) => self.get(local),
            None => GridLookup::OutOfBounds,
        }
    }

    /// Replaces the type of a cell. Returns `false` if the cell is out of range.
    ///
    /// Cached adjacency counts are reset for the changed cell; callers that
    /// need fresh counts must rebuild them with [`VoxelGrid::refresh_adjacency`].
    pub fn set(&mut self, local: Point3<usize>, voxel_type: VoxelType) -> bool {
        match self.index_of(local) {
            Some(index) => {
                self.voxels[index] = Voxel::new(voxel_type);
                self.solid_array.set(index, voxel_type.is_solid());
                true
            }
            None => false,
        }
    }

    /// Checks if the cell at the given local coordinates is solid.
    ///
    /// # Returns
    /// `true` if the cell is solid, `false` if it is air or out of bounds.
    pub fn is_solid(&self, local: Point3<i32>) -> bool {
        Self::to_unsigned(local)
            .and_then(|local| self.index_of(local))
            .map_or(false, |index| self.solid_array[index])
    }

    /// Number of the six axis-adjacent cells that are inside the grid and solid.
    pub fn neighbor_count(&self, local: Point3<usize>) -> u8 {
        let origin = local.cast::<i32>().unwrap_or(Point3::new(-1, -1, -1));
        BlockSide::all()
            .into_iter()
            .filter(|side| self.is_solid(origin + side.offset()))
            .count() as u8
    }

    /// Number of the six axis directions in which the cell sits on the outer
    /// boundary of the grid.
    ///
    /// Both ends of an axis count, so an axis of extent 1 contributes two.
    pub fn border_count(&self, local: Point3<usize>) -> u8 {
        let mut count = 0;
        for (coordinate, extent) in [
            (local.x, self.extents.x),
            (local.y, self.extents.y),
            (local.z, self.extents.z),
        ] {
            if coordinate == 0 {
                count += 1;
            }
            if coordinate + 1 == extent {
                count += 1;
            }
        }
        count
    }

    /// Recomputes the cached `neighbor_count` / `border_count` of every solid
    /// cell. Air cells keep zero counts.
    pub fn refresh_adjacency(&mut self) {
        for index in 0..self.voxels.len() {
            let local = self.position_of(index);
            let (neighbor_count, border_count) = if self.solid_array[index] {
                (self.neighbor_count(local), self.border_count(local))
            } else {
                (0, 0)
            };
            let voxel = &mut self.voxels[index];
            voxel.neighbor_count = neighbor_count;
            voxel.border_count = border_count;
        }
    }

    /// Number of solid cells.
    pub fn solid_count(&self) -> usize {
        self.solid_array.count_ones()
    }

    /// Iterates over the solid cells in storage order.
    pub fn iter_solid(&self) -> SolidVoxelIterator<'_> {
        SolidVoxelIterator::new(self, self.solid_array.iter_ones())
    }

    fn to_unsigned(local: Point3<i32>) -> Option<Point3<usize>> {
        local.cast::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extents(x: usize, y: usize, z: usize) -> Vector3<usize> {
        Vector3::new(x, y, z)
    }

    #[test]
    fn out_of_range_lookups_are_distinct() {
        let grid = VoxelGrid::new(extents(2, 3, 4));

        assert!(matches!(grid.get(Point3::new(1, 2, 3)), GridLookup::InBounds(_)));
        assert_eq!(grid.get(Point3::new(2, 0, 0)), GridLookup::OutOfBounds);
        assert_eq!(grid.get_signed(Point3::new(0, -1, 0)), GridLookup::OutOfBounds);
        assert!(!grid.is_solid(Point3::new(-1, 0, 0)));
        assert!(!grid.is_solid(Point3::new(0, 0, 4)));
    }

    #[test]
    fn index_and_position_are_inverse() {
        let grid = VoxelGrid::new(extents(3, 4, 5));
        for index in 0..grid.len() {
            assert_eq!(grid.index_of(grid.position_of(index)), Some(index));
        }
    }

    #[test]
    fn set_updates_solid_mask() {
        let mut grid = VoxelGrid::new(extents(2, 2, 2));
        assert!(grid.set(Point3::new(1, 0, 1), VoxelType::STONE));
        assert!(!grid.set(Point3::new(2, 0, 0), VoxelType::STONE));

        assert!(grid.is_solid(Point3::new(1, 0, 1)));
        assert_eq!(grid.solid_count(), 1);

        grid.set(Point3::new(1, 0, 1), VoxelType::AIR);
        assert_eq!(grid.solid_count(), 0);
    }

    #[test]
    fn border_count_of_corners_and_centre() {
        let grid = VoxelGrid::new(extents(3, 3, 3));
        assert_eq!(grid.border_count(Point3::new(0, 0, 0)), 3);
        assert_eq!(grid.border_count(Point3::new(1, 0, 1)), 1);
        assert_eq!(grid.border_count(Point3::new(1, 1, 1)), 0);

        let flat = VoxelGrid::new(extents(1, 3, 3));
        assert_eq!(flat.border_count(Point3::new(0, 1, 1)), 2);
    }

    #[test]
    fn refresh_adjacency_caches_counts() {
        let mut grid = VoxelGrid::from_fn(extents(3, 3, 3), |_| VoxelType::DIRT);
        grid.refresh_adjacency();

        let centre = grid.get(Point3::new(1, 1, 1)).voxel().copied().unwrap();
        assert_eq!(centre.neighbor_count, 6);
        assert_eq!(centre.border_count, 0);
        assert!(centre.is_enclosed());

        let corner = grid.get(Point3::new(2, 2, 2)).voxel().copied().unwrap();
        assert_eq!(corner.neighbor_count, 3);
        assert_eq!(corner.border_count, 3);
    }

    #[test]
    fn iter_solid_visits_solid_cells_in_storage_order() {
        let grid = VoxelGrid::from_fn(extents(4, 2, 2), |p| {
            if (p.x + p.y + p.z) % 2 == 0 {
                VoxelType::STONE
            } else {
                VoxelType::AIR
            }
        });

        let visited: Vec<_> = grid.iter_solid().map(|(position, _)| position).collect();
        assert_eq!(visited.len(), grid.solid_count());
        assert!(visited
            .windows(2)
            .all(|pair| grid.index_of(pair[0]) < grid.index_of(pair[1])));
        assert!(visited.iter().all(|p| grid.is_solid(p.cast().unwrap())));
    }
}
