//! # Chunk Module
//!
//! This module provides the `Chunk` struct: one cubic region of the world,
//! its voxel grid, its surface mesh once built, and the `active` / `visible`
//! flags driven by the streaming manager.
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──generate──▶ Generated ──mesh──▶ Meshed
//! ```
//!
//! `Pending` is the state of a required coordinate that has no chunk yet. A
//! chunk is created already `Generated`. Independently of that, a chunk is
//! `active` until it drifts past the unload distance; deactivation is final and
//! the chunk is evicted by the next maintenance pass.

use cgmath::{Point3, Vector3};

use crate::engine_state::meshing::{build_chunk_mesh, ChunkMesh, CullingMode};

pub mod chunk_iteration;
pub mod voxel_grid;

pub use voxel_grid::{GridLookup, VoxelGrid};

/// The dimension (width, height, depth) of a chunk in voxels.
pub const CHUNK_DIMENSION: usize = 16;

/// Extents of every grid produced by the terrain generator.
pub const CHUNK_EXTENTS: Vector3<usize> = Vector3 {
    x: CHUNK_DIMENSION,
    y: CHUNK_DIMENSION,
    z: CHUNK_DIMENSION,
};

/// Where a chunk coordinate is in the generate / mesh pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Required but not generated yet.
    Pending,
    /// Voxel grid populated, no surface mesh.
    Generated,
    /// Surface mesh built.
    Meshed,
}

/// Max-axis distance between two chunk coordinates.
pub fn chebyshev_distance(a: Point3<i32>, b: Point3<i32>) -> u32 {
    a.x.abs_diff(b.x).max(a.y.abs_diff(b.y)).max(a.z.abs_diff(b.z))
}

/// Coordinate of the chunk of the given extents that contains a world-space
/// position. Non-finite components map to 0.
pub fn chunk_coordinate_of(position: Point3<f32>, extents: Vector3<usize>) -> Point3<i32> {
    let axis = |value: f32, extent: usize| -> i32 {
        if extent == 0 || !value.is_finite() {
            return 0;
        }
        (value / extent as f32).floor() as i32
    };
    Point3::new(
        axis(position.x, extents.x),
        axis(position.y, extents.y),
        axis(position.z, extents.z),
    )
}

/// A cubic region of voxels, the unit of generation, streaming and meshing.
#[derive(Debug)]
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not voxel coordinates).
    position: Point3<i32>,
    grid: VoxelGrid,
    mesh: Option<ChunkMesh>,
    active: bool,
    visible: bool,
}

impl Chunk {
    /// Wraps a freshly generated grid. The chunk starts active and hidden; the
    /// next lifecycle pass decides its visibility.
    pub fn new(position: Point3<i32>, grid: VoxelGrid) -> Self {
        Chunk {
            position,
            grid,
            mesh: None,
            active: true,
            visible: false,
        }
    }

    pub fn position(&self) -> Point3<i32> {
        self.position
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn mesh(&self) -> Option<&ChunkMesh> {
        self.mesh.as_ref()
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn state(&self) -> ChunkState {
        if self.has_mesh() {
            ChunkState::Meshed
        } else {
            ChunkState::Generated
        }
    }

    /// World-space position of the chunk's minimum corner, in voxels.
    ///
    /// Computed in `i64` since chunk coordinates near the `i32` limits
    /// multiplied by the extents leave the `i32` range.
    pub fn world_origin(&self) -> Point3<i64> {
        let axis = |chunk: i32, extent: usize| -> i64 {
            i64::from(chunk).saturating_mul(i64::try_from(extent).unwrap_or(i64::MAX))
        };
        let extents = self.grid.extents();
        Point3::new(
            axis(self.position.x, extents.x),
            axis(self.position.y, extents.y),
            axis(self.position.z, extents.z),
        )
    }

    /// World-space centre of the chunk's bounding box.
    pub fn world_center(&self) -> Point3<f32> {
        let origin = self.world_origin();
        let extents = self.grid.extents();
        Point3::new(
            origin.x as f32 + extents.x as f32 / 2.0,
            origin.y as f32 + extents.y as f32 / 2.0,
            origin.z as f32 + extents.z as f32 / 2.0,
        )
    }

    /// Builds the surface mesh on the calling thread, refreshing the cached
    /// adjacency counts first. Rebuilding an unchanged grid yields an equal mesh.
    pub fn build_mesh(&mut self, mode: CullingMode) {
        self.grid.refresh_adjacency();
        self.mesh = Some(build_chunk_mesh(&self.grid, mode));
    }

    /// Installs a mesh built elsewhere from a copy of this chunk's grid.
    ///
    /// `grid` must be that copy, carrying the adjacency counts of the build.
    pub fn install_mesh(&mut self, grid: VoxelGrid, mesh: ChunkMesh) {
        self.grid = grid;
        self.mesh = Some(mesh);
    }

    /// Applies the distance policy for an observer at `distance` chunks.
    ///
    /// Returns `true` if the chunk is (now) inactive. Once inactive a chunk
    /// never becomes active or visible again.
    pub fn update_lifecycle(&mut self, distance: u32, view_distance: u32, unload_distance: u32) -> bool {
        if !self.active {
            return true;
        }

        if distance > unload_distance {
            self.active = false;
            self.visible = false;
            return true;
        }

        self.visible = distance <= view_distance;
        false
    }
}
