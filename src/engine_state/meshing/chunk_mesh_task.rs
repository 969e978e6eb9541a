//! Task for building chunk meshes on a worker thread.
//!
//! The streaming thread copies the grid of a chunk that needs a mesh, wraps
//! it in a `ChunkMeshGenerationTask` and publishes it. The result is applied
//! to a [`MeshSink`], which installs the mesh into the shared world if the
//! chunk is still there, still active and from the same epoch.

use std::collections::HashMap;

use cgmath::Point3;
use log::{trace, warn};
use web_time::Instant;

use crate::{
    core::MtResource,
    engine_state::{
        task_management::task::{Task, TaskResult},
        voxels::{
            chunk::VoxelGrid,
            world::{MeshInstall, World},
        },
    },
};

use super::{face_culling::build_chunk_mesh, mesh::ChunkMesh, CullingMode};

/// Where finished meshes go.
pub struct MeshSink {
    world: MtResource<World>,
    /// Chunks with a task published but not applied yet, with the epoch the
    /// task was published in.
    pending: HashMap<Point3<i32>, u64>,
    installed: usize,
}

impl MeshSink {
    pub fn new(world: MtResource<World>) -> Self {
        MeshSink {
            world,
            pending: HashMap::new(),
            installed: 0,
        }
    }

    pub fn is_pending(&self, position: Point3<i32>) -> bool {
        self.pending.contains_key(&position)
    }

    /// Records that a task for `position` was published in `epoch`. Returns
    /// `false` if one already is in flight.
    pub fn mark_pending(&mut self, position: Point3<i32>, epoch: u64) -> bool {
        if self.pending.contains_key(&position) {
            return false;
        }
        self.pending.insert(position, epoch);
        true
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Forgets the chunks published before `epoch`. Their results, if they
    /// still arrive, are dropped by the world.
    pub fn retain_epoch(&mut self, epoch: u64) {
        self.pending.retain(|_, pending_epoch| *pending_epoch == epoch);
    }

    /// Forgets every chunk in flight, so each one still lacking a mesh is
    /// published again. Used when tasks were lost and their chunks are unknown.
    pub fn clear_pending(&mut self) -> usize {
        let cleared = self.pending.len();
        self.pending.clear();
        cleared
    }

    /// Returns the number of meshes installed since the last call.
    pub fn take_installed(&mut self) -> usize {
        std::mem::take(&mut self.installed)
    }
}

/// Builds the mesh of one chunk from a private copy of its grid.
pub struct ChunkMeshGenerationTask {
    position: Point3<i32>,
    grid: VoxelGrid,
    /// World epoch the grid was copied in.
    epoch: u64,
    mode: CullingMode,
}

impl ChunkMeshGenerationTask {
    pub fn new(position: Point3<i32>, grid: VoxelGrid, epoch: u64, mode: CullingMode) -> Self {
        ChunkMeshGenerationTask {
            position,
            grid,
            epoch,
            mode,
        }
    }
}

impl Task<MeshSink> for ChunkMeshGenerationTask {
    fn process(self: Box<Self>) -> Box<dyn TaskResult<MeshSink> + Send> {
        let start = Instant::now();
        let ChunkMeshGenerationTask {
            position,
            mut grid,
            epoch,
            mode,
        } = *self;

        grid.refresh_adjacency();
        let mesh = build_chunk_mesh(&grid, mode);

        trace!(
            "Built mesh for chunk {:?} ({} vertices) in {:?}",
            position,
            mesh.vertex_count(),
            start.elapsed()
        );

        Box::new(ChunkMeshGenerationTaskResult {
            position,
            grid,
            mesh,
            epoch,
        })
    }
}

/// A finished mesh together with the grid copy it was built from.
pub struct ChunkMeshGenerationTaskResult {
    position: Point3<i32>,
    grid: VoxelGrid,
    mesh: ChunkMesh,
    epoch: u64,
}

impl TaskResult<MeshSink> for ChunkMeshGenerationTaskResult {
    fn handle_result(self: Box<Self>, sink: &mut MeshSink) {
        let ChunkMeshGenerationTaskResult {
            position,
            grid,
            mesh,
            epoch,
        } = *self;

        if sink.pending.get(&position) == Some(&epoch) {
            sink.pending.remove(&position);
        }

        match sink.world.get_mut().install_mesh(position, grid, mesh, epoch) {
            MeshInstall::Installed => sink.installed += 1,
            MeshInstall::AlreadyMeshed => {
                warn!("Chunk {:?} was meshed twice, keeping the first mesh", position)
            }
            outcome => trace!("Dropped mesh for chunk {:?}: {:?}", position, outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;
    use crate::engine_state::voxels::terrain::{TerrainGenerator, TerrainShape};

    fn shared_world() -> MtResource<World> {
        let generator = TerrainGenerator::with_extents(3, TerrainShape::Solid, Vector3::new(2, 2, 2));
        let mut world = World::new(generator);
        world.add_chunk_at(Point3::new(0, 0, 0));
        MtResource::new(world)
    }

    fn run(task: ChunkMeshGenerationTask, sink: &mut MeshSink) {
        Box::new(task).process().handle_result(sink);
    }

    #[test]
    fn result_installs_mesh_into_world() {
        let world = shared_world();
        let mut sink = MeshSink::new(world.clone());
        let (position, grid) = world.get().chunks_needing_mesh(|_| false).remove(0);
        let epoch = world.get().epoch();

        assert!(sink.mark_pending(position, epoch));
        assert!(!sink.mark_pending(position, epoch));
        run(ChunkMeshGenerationTask::new(position, grid, epoch, CullingMode::Exact), &mut sink);

        assert!(!sink.is_pending(position));
        assert_eq!(sink.take_installed(), 1);
        assert_eq!(sink.take_installed(), 0);

        let world = world.get();
        let chunk = world.get_chunk_at(position).unwrap();
        assert_eq!(chunk.mesh().map(|mesh| mesh.face_count()), Some(24));
        // The installed grid carries the adjacency counts of the build.
        assert!(chunk.grid().voxels().iter().all(|voxel| voxel.neighbor_count == 3));
    }

    #[test]
    fn result_from_an_older_epoch_is_dropped() {
        let world = shared_world();
        let mut sink = MeshSink::new(world.clone());
        let (position, grid) = world.get().chunks_needing_mesh(|_| false).remove(0);
        let epoch = world.get().epoch();

        assert!(sink.mark_pending(position, epoch));
        world.get_mut().reseed(4);
        world.get_mut().add_chunk_at(position);
        sink.retain_epoch(world.get().epoch());
        assert!(!sink.is_pending(position));
        assert!(sink.mark_pending(position, world.get().epoch()));
        run(ChunkMeshGenerationTask::new(position, grid, epoch, CullingMode::Exact), &mut sink);

        assert_eq!(sink.take_installed(), 0);
        assert!(!world.get().get_chunk_at(position).unwrap().has_mesh());
        // The newer task for the same chunk is still tracked.
        assert!(sink.is_pending(position));
    }

    #[test]
    fn cleared_chunks_can_be_published_again() {
        let world = shared_world();
        let mut sink = MeshSink::new(world.clone());
        let (position, grid) = world.get().chunks_needing_mesh(|_| false).remove(0);
        let epoch = world.get().epoch();

        assert!(sink.mark_pending(position, epoch));
        assert_eq!(sink.clear_pending(), 1);
        assert_eq!(world.get().chunks_needing_mesh(|p| sink.is_pending(p)).len(), 1);

        assert!(sink.mark_pending(position, epoch));
        run(ChunkMeshGenerationTask::new(position, grid, epoch, CullingMode::Exact), &mut sink);
        assert_eq!(sink.take_installed(), 1);
        assert_eq!(sink.pending_len(), 0);
    }
}
