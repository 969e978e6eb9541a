//! Borrowed, read-only views of the streamed world.

use std::sync::RwLockReadGuard;

use cgmath::{Point3, Vector3};

use crate::engine_state::{
    meshing::ChunkMesh,
    voxels::{
        chunk::Chunk,
        world::{RayHit, World, WorldStats},
    },
};

/// A consistent view of the loaded chunks.
///
/// The snapshot holds the world's read lock: the streaming thread cannot
/// insert, flag or evict chunks until it is dropped. Take one per frame and
/// drop it before doing anything slow.
pub struct ChunkSnapshot<'a> {
    world: RwLockReadGuard<'a, World>,
}

/// Everything a renderer needs to draw one chunk.
#[derive(Debug, Clone, Copy)]
pub struct RenderableChunk<'a> {
    pub coordinate: Point3<i32>,
    /// World-space position of the chunk's minimum corner. Mesh positions are
    /// relative to it.
    pub origin: Point3<i64>,
    pub mesh: &'a ChunkMesh,
}

impl<'a> ChunkSnapshot<'a> {
    pub(crate) fn new(world: RwLockReadGuard<'a, World>) -> Self {
        ChunkSnapshot { world }
    }

    /// Active chunks, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.world.chunks().filter(|chunk| chunk.is_active())
    }

    /// Number of active chunks.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The active chunk at `coordinate`.
    pub fn get(&self, coordinate: Point3<i32>) -> Option<&Chunk> {
        self.world
            .get_chunk_at(coordinate)
            .filter(|chunk| chunk.is_active())
    }

    pub fn contains(&self, coordinate: Point3<i32>) -> bool {
        self.get(coordinate).is_some()
    }

    /// Visible chunks.
    pub fn visible(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.iter().filter(|chunk| chunk.is_visible())
    }

    /// Visible chunks that have a mesh.
    pub fn renderable(&self) -> impl Iterator<Item = RenderableChunk<'_>> + '_ {
        self.visible().filter_map(|chunk| {
            chunk.mesh().map(|mesh| RenderableChunk {
                coordinate: chunk.position(),
                origin: chunk.world_origin(),
                mesh,
            })
        })
    }

    pub fn stats(&self) -> WorldStats {
        self.world.stats()
    }

    pub fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RayHit> {
        self.world.raycast(origin, direction, max_distance)
    }

    /// The underlying world, including chunks flagged inactive but not
    /// evicted yet.
    pub fn world(&self) -> &World {
        &self.world
    }
}
