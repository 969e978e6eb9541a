//! # Terrain Generator
//!
//! Pure function from `(seed, chunk coordinate)` to a populated [`VoxelGrid`].
//!
//! Several generation strategies are supported:
//! - Perlin noise for natural-looking terrain (height field plus caves)
//! - Checkerboard pattern for testing
//! - Solid chunks (all voxels filled)
//! - Empty chunks (all voxels air)
//!
//! A generator only reads its own fields while generating, so a shared
//! reference can be used from several threads at once. Reseeding needs `&mut`,
//! which gives exclusion against concurrent generation for free.

use cgmath::{Point3, Vector3};
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::{
    chunk::{VoxelGrid, CHUNK_EXTENTS},
    voxel::voxel_type::VoxelType,
};

/// Scaling factor applied to world coordinates when sampling the height field.
pub const HEIGHT_SCALE_FACTOR: f64 = 0.01;
/// Scaling factor applied to world coordinates when sampling cave noise.
pub const CAVE_SCALE_FACTOR: f64 = 0.05;
/// World height around which the surface oscillates.
pub const BASE_HEIGHT: f64 = 8.0;
/// Maximum deviation of the surface from `BASE_HEIGHT`.
pub const HEIGHT_AMPLITUDE: f64 = 24.0;
/// Cave noise magnitude below which solid ground is carved out.
pub const CAVE_THRESHOLD: f64 = 0.08;
/// Caves never open closer than this to the surface.
pub const CAVE_MIN_DEPTH: i64 = 4;
/// Thickness of the dirt layer under the grass.
pub const DIRT_DEPTH: i64 = 3;

/// The method used to populate new chunks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainShape {
    /// Seeded height field with caves.
    #[default]
    Perlin,
    /// Alternates solid and air cells in all three axes.
    Checkerboard,
    /// Every cell solid.
    Solid,
    /// Every cell air.
    Empty,
}

/// Deterministic chunk generator.
#[derive(Clone, Debug)]
pub struct TerrainGenerator {
    seed: u32,
    shape: TerrainShape,
    extents: Vector3<usize>,
    height: Perlin,
    caves: Perlin,
}

impl TerrainGenerator {
    /// Creates a generator producing grids of [`CHUNK_EXTENTS`].
    pub fn new(seed: u32, shape: TerrainShape) -> Self {
        Self::with_extents(seed, shape, CHUNK_EXTENTS)
    }

    /// Creates a generator producing grids of the given extents.
    pub fn with_extents(seed: u32, shape: TerrainShape, extents: Vector3<usize>) -> Self {
        TerrainGenerator {
            seed,
            shape,
            extents,
            height: Perlin::new(seed),
            caves: Perlin::new(seed.wrapping_add(1)),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn shape(&self) -> TerrainShape {
        self.shape
    }

    pub fn extents(&self) -> Vector3<usize> {
        self.extents
    }

    /// Replaces the seed for every later call to [`TerrainGenerator::generate`].
    /// Grids generated before are not affected.
    pub fn reseed(&mut self, seed: u32) {
        *self = Self::with_extents(seed, self.shape, self.extents);
    }

    /// Generates the grid of the chunk at `position` (chunk coordinates).
    ///
    /// The same seed, shape and position always give a bit-identical grid.
    pub fn generate(&self, position: Point3<i32>) -> VoxelGrid {
        match self.shape {
            TerrainShape::Perlin => self.perlin(position),
            TerrainShape::Checkerboard => VoxelGrid::from_fn(self.extents, |local| {
                let world = self.to_world(position, local);
                if (world.x + world.y + world.z).rem_euclid(2) == 0 {
                    VoxelType::STONE
                } else {
                    VoxelType::AIR
                }
            }),
            TerrainShape::Solid => VoxelGrid::from_fn(self.extents, |_| VoxelType::STONE),
            TerrainShape::Empty => VoxelGrid::new(self.extents),
        }
    }

    /// Surface height of the world column at (`x`, `z`).
    pub fn surface_height(&self, x: i64, z: i64) -> i64 {
        let sample = self
            .height
            .get(Self::to_perlin_pos2(x, z, HEIGHT_SCALE_FACTOR));
        let detail = self
            .height
            .get(Self::to_perlin_pos2(x, z, HEIGHT_SCALE_FACTOR * 4.0));
        (BASE_HEIGHT + HEIGHT_AMPLITUDE * (sample + 0.25 * detail)).floor() as i64
    }

    fn perlin(&self, position: Point3<i32>) -> VoxelGrid {
        let origin = self.to_world(position, Point3::new(0, 0, 0));

        // One height sample per column, indexed x + Sx * z.
        let mut heights = Vec::with_capacity(self.extents.x * self.extents.z);
        for z in 0..self.extents.z as i64 {
            for x in 0..self.extents.x as i64 {
                heights.push(self.surface_height(origin.x + x, origin.z + z));
            }
        }

        VoxelGrid::from_fn(self.extents, |local| {
            let world = self.to_world(position, local);
            let height = heights[local.x + self.extents.x * local.z];
            let depth = height - world.y;

            if depth < 0 {
                return VoxelType::AIR;
            }

            if depth >= CAVE_MIN_DEPTH {
                let cave_sample = self.caves.get([
                    world.x as f64 * CAVE_SCALE_FACTOR,
                    world.y as f64 * CAVE_SCALE_FACTOR,
                    world.z as f64 * CAVE_SCALE_FACTOR,
                ]);
                if cave_sample.abs() < CAVE_THRESHOLD {
                    return VoxelType::AIR;
                }
            }

            match depth {
                0 => VoxelType::GRASS,
                d if d <= DIRT_DEPTH => VoxelType::DIRT,
                _ => VoxelType::STONE,
            }
        })
    }

    /// World voxel coordinate of a local cell of the chunk at `position`.
    fn to_world(&self, position: Point3<i32>, local: Point3<usize>) -> Point3<i64> {
        Point3::new(
            position.x as i64 * self.extents.x as i64 + local.x as i64,
            position.y as i64 * self.extents.y as i64 + local.y as i64,
            position.z as i64 * self.extents.z as i64 + local.z as i64,
        )
    }

    fn to_perlin_pos2(x: i64, z: i64, scale_factor: f64) -> [f64; 2] {
        [x as f64 * scale_factor, z as f64 * scale_factor]
    }
}
