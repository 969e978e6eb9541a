//! # Engine State Module
//!
//! ## Key Components
//!
//! * `voxels` - Voxel data, chunks, terrain generation and the chunk arena
//! * `meshing` - Surface extraction from chunk grids
//! * `task_management` - Worker threads for mesh building
//! * `streaming` - The background loop keeping chunks around the observer
//!
//! `streaming` ties the others together: it generates chunks into the
//! `voxels::world::World`, hands grid copies to `meshing` tasks through a
//! `task_management::TaskManager` and exposes read-only snapshots.

pub mod meshing;
pub mod streaming;
pub mod task_management;
pub mod voxels;
