//! # World Module
//!
//! This module provides the `World` struct: the arena that owns every loaded
//! chunk, keyed by chunk coordinate, together with the terrain generator that
//! fills new chunks.
//!
//! ## Architecture
//!
//! Only chunks around the observer are kept in memory, which allows an
//! effectively infinite world. The map key is the chunk's identity: at most one
//! chunk exists per coordinate at any time.
//!
//! ## Epochs
//!
//! Reseeding or clearing bumps `epoch`. Work started from an older epoch
//! (a grid generated with the previous seed, a mesh built from a discarded
//! chunk) is rejected on insertion, so a world never mixes seeds.
//!
//! ## Performance Considerations
//!
//! - Chunk lookup is O(1) using a hash map
//! - Every method here is short and bounded by the number of loaded chunks;
//!   generation and meshing are meant to run outside the owning lock

use cgmath::{InnerSpace, Point3, Vector3, Zero};
use log::warn;
use std::collections::HashMap;

use crate::engine_state::meshing::{ChunkMesh, CullingMode};

use super::{
    chunk::{chebyshev_distance, chunk_coordinate_of, Chunk, ChunkState, VoxelGrid},
    terrain::TerrainGenerator,
};

/// Outcome of handing a mesh built off-lock back to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshInstall {
    Installed,
    /// Built before a reseed or clear.
    Stale,
    /// The chunk was evicted while its mesh was being built.
    Missing,
    Inactive,
    AlreadyMeshed,
}

/// The first solid voxel hit by [`World::raycast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World voxel coordinate of the solid voxel.
    pub voxel: Point3<i32>,
    /// The empty voxel the ray crossed just before the hit.
    pub previous: Point3<i32>,
    /// Normal of the face the ray entered through; zero if the ray started inside.
    pub normal: Vector3<i32>,
    /// Distance along the normalised ray to the entry point.
    pub distance: f32,
}

/// Counters over the loaded chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub chunks: usize,
    pub active: usize,
    pub visible: usize,
    pub meshed: usize,
    pub voxels: usize,
    pub vertices: usize,
    pub triangles: usize,
}

/// Represents the voxel world: a sparse 3D grid of chunks.
pub struct World {
    /// A mapping from chunk coordinates to chunk data.
    chunks: HashMap<Point3<i32>, Chunk>,
    generator: TerrainGenerator,
    epoch: u64,
}

impl World {
    /// Creates a new, empty world filled by `generator`.
    pub fn new(generator: TerrainGenerator) -> Self {
        World {
            chunks: HashMap::new(),
            generator,
            epoch: 0,
        }
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, position: Point3<i32>) -> bool {
        self.chunks.contains_key(&position)
    }

    pub fn get_chunk_at(&self, position: Point3<i32>) -> Option<&Chunk> {
        self.chunks.get(&position)
    }

    pub fn get_chunk_at_mut(&mut self, position: Point3<i32>) -> Option<&mut Chunk> {
        self.chunks.get_mut(&position)
    }

    /// All loaded chunks, in no particular order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn state_of(&self, position: Point3<i32>) -> ChunkState {
        self.chunks
            .get(&position)
            .map_or(ChunkState::Pending, Chunk::state)
    }

    /// Generates and adds the chunk at `position` on the calling thread.
    ///
    /// Does nothing and returns `false` if a chunk already exists there.
    pub fn add_chunk_at(&mut self, position: Point3<i32>) -> bool {
        if self.chunks.contains_key(&position) {
            return false;
        }

        let grid = self.generator.generate(position);
        self.chunks.insert(position, Chunk::new(position, grid));
        true
    }

    /// Adds a chunk generated outside the lock from the generator of `epoch`.
    ///
    /// Returns `false` without inserting if the coordinate is taken or the
    /// world has been reseeded or cleared since.
    pub fn insert_generated(&mut self, position: Point3<i32>, grid: VoxelGrid, epoch: u64) -> bool {
        if epoch != self.epoch || self.chunks.contains_key(&position) {
            return false;
        }

        self.chunks.insert(position, Chunk::new(position, grid));
        true
    }

    /// Applies the distance policy to every chunk for an observer at `observer`.
    ///
    /// Returns how many chunks are inactive after the pass.
    pub fn refresh_lifecycle(
        &mut self,
        observer: Point3<i32>,
        view_distance: u32,
        unload_distance: u32,
    ) -> usize {
        let mut inactive = 0;
        for (position, chunk) in self.chunks.iter_mut() {
            if chunk.position() != *position {
                warn!(
                    "Chunk stored at {:?} reports position {:?}, skipping",
                    position,
                    chunk.position()
                );
                continue;
            }

            let distance = chebyshev_distance(*position, observer);
            if chunk.update_lifecycle(distance, view_distance, unload_distance) {
                inactive += 1;
            }
        }
        inactive
    }

    /// Removes every inactive chunk and hands them back to the caller.
    pub fn evict_inactive(&mut self) -> Vec<Chunk> {
        let positions: Vec<Point3<i32>> = self
            .chunks
            .iter()
            .filter(|(_, chunk)| !chunk.is_active())
            .map(|(position, _)| *position)
            .collect();

        positions
            .into_iter()
            .filter_map(|position| self.chunks.remove(&position))
            .collect()
    }

    /// Grids of the active chunks that still lack a mesh, copied so they can be
    /// meshed without holding the world.
    pub fn chunks_needing_mesh(
        &self,
        mut skip: impl FnMut(Point3<i32>) -> bool,
    ) -> Vec<(Point3<i32>, VoxelGrid)> {
        self.chunks
            .values()
            .filter(|chunk| chunk.is_active() && !chunk.has_mesh() && !skip(chunk.position()))
            .map(|chunk| (chunk.position(), chunk.grid().clone()))
            .collect()
    }

    /// Installs a mesh built from a copy of the chunk's grid taken in `epoch`.
    pub fn install_mesh(
        &mut self,
        position: Point3<i32>,
        grid: VoxelGrid,
        mesh: ChunkMesh,
        epoch: u64,
    ) -> MeshInstall {
        if epoch != self.epoch {
            return MeshInstall::Stale;
        }

        match self.chunks.get_mut(&position) {
            None => MeshInstall::Missing,
            Some(chunk) if !chunk.is_active() => MeshInstall::Inactive,
            Some(chunk) if chunk.has_mesh() => MeshInstall::AlreadyMeshed,
            Some(chunk) => {
                chunk.install_mesh(grid, mesh);
                MeshInstall::Installed
            }
        }
    }

    /// Builds the mesh of every active chunk lacking one on the calling thread.
    ///
    /// Returns the number of meshes built.
    pub fn mesh_pending_chunks(&mut self, mode: CullingMode) -> usize {
        let mut built = 0;
        for chunk in self.chunks.values_mut() {
            if chunk.is_active() && !chunk.has_mesh() {
                chunk.build_mesh(mode);
                built += 1;
            }
        }
        built
    }

    /// Drops every chunk. They are regenerated by the next sweep.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.epoch += 1;
    }

    /// Switches the generator to `seed` and drops every chunk generated with
    /// the previous one.
    pub fn reseed(&mut self, seed: u32) {
        self.generator.reseed(seed);
        self.clear();
    }

    /// Coordinate of the chunk containing a world-space position.
    pub fn chunk_containing(&self, position: Point3<f32>) -> Point3<i32> {
        chunk_coordinate_of(position, self.generator.extents())
    }

    /// Whether the voxel at world voxel coordinates is solid. Voxels of chunks
    /// that are not loaded count as empty.
    pub fn is_solid_at(&self, voxel: Point3<i32>) -> bool {
        let extents = self.generator.extents();
        let Some(extents) = extents.cast::<i32>() else {
            return false;
        };
        if extents.x == 0 || extents.y == 0 || extents.z == 0 {
            return false;
        }

        let chunk_position = Point3::new(
            voxel.x.div_euclid(extents.x),
            voxel.y.div_euclid(extents.y),
            voxel.z.div_euclid(extents.z),
        );
        let local = Point3::new(
            voxel.x.rem_euclid(extents.x),
            voxel.y.rem_euclid(extents.y),
            voxel.z.rem_euclid(extents.z),
        );

        self.chunks
            .get(&chunk_position)
            .map_or(false, |chunk| chunk.grid().is_solid(local))
    }

    /// Walks the voxels crossed by a ray (DDA) and returns the first solid one
    /// within `max_distance`.
    pub fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RayHit> {
        let length = direction.magnitude();
        if !length.is_finite() || length <= f32::EPSILON || !(max_distance >= 0.0) {
            return None;
        }
        let direction = direction / length;

        let mut voxel = Point3::new(
            origin.x.floor() as i32,
            origin.y.floor() as i32,
            origin.z.floor() as i32,
        );
        let step = Vector3::new(
            Self::step_of(direction.x),
            Self::step_of(direction.y),
            Self::step_of(direction.z),
        );
        let t_delta = Vector3::new(
            Self::delta_of(direction.x),
            Self::delta_of(direction.y),
            Self::delta_of(direction.z),
        );
        let mut t_max = Vector3::new(
            Self::first_boundary(origin.x, voxel.x, direction.x),
            Self::first_boundary(origin.y, voxel.y, direction.y),
            Self::first_boundary(origin.z, voxel.z, direction.z),
        );

        let mut previous = voxel;
        let mut normal = Vector3::zero();
        let mut distance = 0.0_f32;

        loop {
            if self.is_solid_at(voxel) {
                return Some(RayHit {
                    voxel,
                    previous,
                    normal,
                    distance,
                });
            }

            previous = voxel;
            if t_max.x < t_max.y && t_max.x < t_max.z {
                distance = t_max.x;
                voxel.x = voxel.x.saturating_add(step.x);
                t_max.x += t_delta.x;
                normal = Vector3::new(-step.x, 0, 0);
            } else if t_max.y < t_max.z {
                distance = t_max.y;
                voxel.y = voxel.y.saturating_add(step.y);
                t_max.y += t_delta.y;
                normal = Vector3::new(0, -step.y, 0);
            } else {
                distance = t_max.z;
                voxel.z = voxel.z.saturating_add(step.z);
                t_max.z += t_delta.z;
                normal = Vector3::new(0, 0, -step.z);
            }

            if distance > max_distance {
                return None;
            }
        }
    }

    /// Counters over every loaded chunk.
    pub fn stats(&self) -> WorldStats {
        let mut stats = WorldStats::default();
        for chunk in self.chunks.values() {
            stats.chunks += 1;
            stats.voxels += chunk.grid().len();
            if chunk.is_active() {
                stats.active += 1;
            }
            if chunk.is_visible() {
                stats.visible += 1;
            }
            if let Some(mesh) = chunk.mesh() {
                stats.meshed += 1;
                stats.vertices += mesh.vertex_count();
                stats.triangles += mesh.triangle_count();
            }
        }
        stats
    }

    fn step_of(direction: f32) -> i32 {
        if direction > 0.0 {
            1
        } else if direction < 0.0 {
            -1
        } else {
            0
        }
    }

    fn delta_of(direction: f32) -> f32 {
        if direction == 0.0 {
            f32::INFINITY
        } else {
            (1.0 / direction).abs()
        }
    }

    /// Ray parameter at which the ray leaves the starting voxel along one axis.
    fn first_boundary(origin: f32, voxel: i32, direction: f32) -> f32 {
        if direction > 0.0 {
            (voxel as f32 + 1.0 - origin) / direction
        } else if direction < 0.0 {
            (voxel as f32 - origin) / direction
        } else {
            f32::INFINITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::terrain::TerrainShape;

    fn world(shape: TerrainShape) -> World {
        World::new(TerrainGenerator::with_extents(
            42,
            shape,
            Vector3::new(4, 4, 4),
        ))
    }

    #[test]
    fn add_chunk_at_keeps_coordinates_unique() {
        let mut world = world(TerrainShape::Solid);
        assert!(world.add_chunk_at(Point3::new(0, 0, 0)));
        assert!(!world.add_chunk_at(Point3::new(0, 0, 0)));
        assert_eq!(world.len(), 1);
        assert_eq!(world.state_of(Point3::new(0, 0, 0)), ChunkState::Generated);
        assert_eq!(world.state_of(Point3::new(1, 0, 0)), ChunkState::Pending);
    }

    #[test]
    fn stale_generation_is_rejected_after_reseed() {
        let mut world = world(TerrainShape::Perlin);
        let epoch = world.epoch();
        let grid = world.generator().generate(Point3::new(0, 0, 0));

        world.reseed(7);
        assert_eq!(world.generator().seed(), 7);
        assert!(!world.insert_generated(Point3::new(0, 0, 0), grid.clone(), epoch));
        assert!(world.insert_generated(Point3::new(0, 0, 0), grid, world.epoch()));
    }

    #[test]
    fn lifecycle_marks_then_evicts_far_chunks() {
        let mut world = world(TerrainShape::Solid);
        for x in -1..=3 {
            world.add_chunk_at(Point3::new(x, 0, 0));
        }

        let inactive = world.refresh_lifecycle(Point3::new(3, 0, 0), 1, 2);
        assert_eq!(inactive, 2);
        assert!(world.get_chunk_at(Point3::new(2, 0, 0)).unwrap().is_visible());
        assert!(!world.get_chunk_at(Point3::new(1, 0, 0)).unwrap().is_visible());
        assert!(world.get_chunk_at(Point3::new(1, 0, 0)).unwrap().is_active());

        let evicted = world.evict_inactive();
        let mut positions: Vec<_> = evicted.iter().map(|c| c.position().x).collect();
        positions.sort();
        assert_eq!(positions, vec![-1, 0]);
        assert!(evicted.iter().all(|c| !c.is_active() && !c.is_visible()));
        assert_eq!(world.len(), 3);
    }

    #[test]
    fn mesh_install_checks_epoch_and_presence() {
        let mut world = world(TerrainShape::Solid);
        world.add_chunk_at(Point3::new(0, 0, 0));
        let pending = world.chunks_needing_mesh(|_| false);
        assert_eq!(pending.len(), 1);

        let (position, mut grid) = pending.into_iter().next().unwrap();
        grid.refresh_adjacency();
        let mesh = crate::engine_state::meshing::build_chunk_mesh(&grid, CullingMode::Exact);

        assert_eq!(
            world.install_mesh(Point3::new(5, 5, 5), grid.clone(), mesh.clone(), world.epoch()),
            MeshInstall::Missing
        );
        assert_eq!(
            world.install_mesh(position, grid.clone(), mesh.clone(), world.epoch() + 1),
            MeshInstall::Stale
        );
        assert_eq!(
            world.install_mesh(position, grid.clone(), mesh.clone(), world.epoch()),
            MeshInstall::Installed
        );
        assert_eq!(
            world.install_mesh(position, grid, mesh, world.epoch()),
            MeshInstall::AlreadyMeshed
        );
        assert!(world.chunks_needing_mesh(|_| false).is_empty());
    }

    #[test]
    fn raycast_hits_first_solid_voxel() {
        let mut world = world(TerrainShape::Solid);
        world.add_chunk_at(Point3::new(0, 0, 0));

        let hit = world
            .raycast(Point3::new(-5.5, 1.5, 1.5), Vector3::new(2.0, 0.0, 0.0), 20.0)
            .unwrap();
        assert_eq!(hit.voxel, Point3::new(0, 1, 1));
        assert_eq!(hit.previous, Point3::new(-1, 1, 1));
        assert_eq!(hit.normal, Vector3::new(-1, 0, 0));
        assert!((hit.distance - 5.5).abs() < 1e-4);

        assert!(world
            .raycast(Point3::new(-5.5, 1.5, 1.5), Vector3::new(1.0, 0.0, 0.0), 3.0)
            .is_none());
        assert!(world
            .raycast(Point3::new(-5.5, 1.5, 1.5), Vector3::new(0.0, 0.0, 0.0), 30.0)
            .is_none());
    }

    #[test]
    fn chunk_containing_floors_world_positions() {
        let world = world(TerrainShape::Empty);
        assert_eq!(world.chunk_containing(Point3::new(0.0, 3.9, 4.0)), Point3::new(0, 0, 1));
        assert_eq!(world.chunk_containing(Point3::new(-0.1, -4.0, -4.1)), Point3::new(-1, -1, -2));
        assert_eq!(world.chunk_containing(Point3::new(f32::NAN, 9.0, 0.0)), Point3::new(0, 2, 0));
    }

    #[test]
    fn is_solid_at_handles_negative_coordinates() {
        let mut world = world(TerrainShape::Solid);
        world.add_chunk_at(Point3::new(-1, -1, -1));

        assert!(world.is_solid_at(Point3::new(-1, -1, -1)));
        assert!(world.is_solid_at(Point3::new(-4, -4, -4)));
        assert!(!world.is_solid_at(Point3::new(-5, -1, -1)));
        assert!(!world.is_solid_at(Point3::new(0, 0, 0)));
    }

    #[test]
    fn stats_count_meshes() {
        let mut world = world(TerrainShape::Solid);
        world.add_chunk_at(Point3::new(0, 0, 0));
        world.add_chunk_at(Point3::new(1, 0, 0));
        assert_eq!(world.mesh_pending_chunks(CullingMode::Exact), 2);

        let stats = world.stats();
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.meshed, 2);
        assert_eq!(stats.voxels, 128);
        // A solid 4x4x4 cube exposes 6 * 16 faces, each two triangles.
        assert_eq!(stats.triangles, 2 * 2 * 96);
        assert_eq!(stats.vertices, 3 * stats.triangles);
    }
}
