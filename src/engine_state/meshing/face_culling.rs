//! Face-culling mesher.
//!
//! Walks every solid voxel of a grid and emits one quad for each side whose
//! neighbour is air or outside the grid. Neighbouring chunks are never
//! consulted, so faces on a chunk boundary are always emitted when the
//! voxel is considered at all.
//!
//! The output is built in two passes: the first counts faces so the buffers
//! are allocated at their exact final size, the second fills them. Voxels are
//! visited with `x` outermost and `z` innermost, and sides in
//! [`BlockSide::all`] order, so the same grid always gives the same buffers.

use cgmath::Point3;
use log::trace;
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::engine_state::voxels::{chunk::VoxelGrid, voxel::block_side::BlockSide};

use super::{face::VERTICES_PER_FACE, mesh::ChunkMesh};

/// Which solid voxels are skipped before their sides are tested.
///
/// The two modes disagree only on solid voxels at the grid border whose
/// in-grid neighbours are all solid. `Exact` gives them faces on their border
/// sides, so a lone solid chunk is drawn as a closed cube and face counts
/// equal the number of exposed sides. It does not honour "every voxel with
/// neighbours plus borders equal to six contributes nothing". `EnclosedSkip`
/// honours that rule and pays for it with missing border faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullingMode {
    /// Only voxels with six solid in-grid neighbours are skipped. The mesh has
    /// exactly one quad per solid voxel side that faces air or the grid border.
    #[default]
    Exact,
    /// Voxels whose solid neighbours plus grid borders add up to six are
    /// skipped. Buried voxels on the grid border then contribute no faces,
    /// leaving holes where a neighbouring chunk is air.
    EnclosedSkip,
}

impl CullingMode {
    fn skips(self, neighbor_count: u8, border_count: u8) -> bool {
        match self {
            CullingMode::Exact => neighbor_count == 6,
            CullingMode::EnclosedSkip => neighbor_count + border_count == 6,
        }
    }
}

/// Sides of the voxel at `local` that would receive a face, in
/// [`BlockSide::all`] order. Empty for air and for skipped voxels.
pub fn exposed_sides(grid: &VoxelGrid, local: Point3<usize>, mode: CullingMode) -> Vec<BlockSide> {
    let signed = match local.cast::<i32>() {
        Some(signed) => signed,
        None => return Vec::new(),
    };

    if !grid.is_solid(signed) {
        return Vec::new();
    }

    if mode.skips(grid.neighbor_count(local), grid.border_count(local)) {
        return Vec::new();
    }

    BlockSide::all()
        .into_iter()
        .filter(|side| !grid.is_solid(signed + side.offset()))
        .collect()
}

/// Number of faces [`build_chunk_mesh`] emits for `grid`.
pub fn count_faces(grid: &VoxelGrid, mode: CullingMode) -> usize {
    let mut faces = 0;
    for_each_face(grid, mode, |_, _| faces += 1);
    faces
}

/// Builds the surface mesh of `grid`, positions relative to the grid origin.
pub fn build_chunk_mesh(grid: &VoxelGrid, mode: CullingMode) -> ChunkMesh {
    let start = Instant::now();

    let faces = count_faces(grid, mode);
    let mut mesh = ChunkMesh::with_face_capacity(faces);
    for_each_face(grid, mode, |local, side| mesh.push_face(local, side));

    debug_assert_eq!(mesh.vertex_count(), faces * VERTICES_PER_FACE);

    trace!(
        "Meshed {} faces from {} solid voxels in {:?}",
        faces,
        grid.solid_count(),
        start.elapsed()
    );

    mesh
}

fn for_each_face(grid: &VoxelGrid, mode: CullingMode, mut emit: impl FnMut(Point3<usize>, BlockSide)) {
    let extents = grid.extents();

    for x in 0..extents.x {
        for y in 0..extents.y {
            for z in 0..extents.z {
                let local = Point3::new(x, y, z);
                for side in exposed_sides(grid, local, mode) {
                    emit(local, side);
                }
            }
        }
    }
}
