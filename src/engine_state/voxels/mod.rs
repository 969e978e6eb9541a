//! # Voxel Data
//!
//! This module contains the data side of the world: what a voxel is, how
//! voxels are grouped into chunks, how chunks are generated and where they
//! are kept.
//!
//! ## Architecture
//!
//! * **Voxel**: a cell type plus cached adjacency counts
//! * **Chunk**: a fixed-size grid of voxels with its mesh and streaming flags
//! * **Terrain**: the deterministic, seeded chunk generator
//! * **World**: the map of loaded chunks keyed by chunk coordinate
//!
//! ## Data Flow
//!
//! 1. The streaming thread asks the terrain generator for missing chunks
//! 2. New grids are inserted into the world unless it was reseeded meanwhile
//! 3. Grid copies of unmeshed chunks go to the mesh workers
//! 4. Finished meshes are installed back into their chunks
//!
//! ## Thread Safety
//!
//! Nothing here locks. The world is shared through
//! [`MtResource`](crate::core::MtResource) and every method is short enough to
//! run under its write lock.

pub mod chunk;
pub mod terrain;
pub mod voxel;
pub mod world;
