#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Cube World
//!
//! An infinite, streamed voxel world: chunks of cubes are generated from a
//! seeded noise field around a moving observer, turned into triangle meshes
//! on worker threads and dropped again once the observer is far away.
//!
//! ## Key Modules
//!
//! * `config` - `WorldConfig`, the streaming radii, seed and terrain shape
//! * `core` - Shared-resource utilities used across threads
//! * `engine_state` - Voxels, meshing, task management and streaming
//! * `error` - Configuration and streaming errors
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cgmath::Point3;
//! use cube_world::{WorldConfig, WorldStreamer};
//!
//! let mut streamer = WorldStreamer::new(WorldConfig::default())?;
//! streamer.start()?;
//!
//! // Every frame:
//! streamer.set_observer_position(Point3::new(12.0, 40.0, -3.5));
//! for chunk in streamer.chunk_snapshot().renderable() {
//!     // upload chunk.mesh at chunk.origin
//! }
//!
//! streamer.stop();
//! # Ok::<(), cube_world::StreamingError>(())
//! ```
//!
//! Rendering is left to the host: meshes are plain position / normal /
//! texcoord buffers, or interleaved [`Vertex`] values ready for upload.

use std::{path::Path, thread, time::Duration};

use cgmath::Point3;
use log::{info, warn};

pub mod config;
pub mod core;
pub mod engine_state;
pub mod error;

pub use config::WorldConfig;
pub use engine_state::{
    meshing::{build_chunk_mesh, ChunkMesh, CullingMode, Vertex},
    streaming::{ChunkSnapshot, RenderableChunk, SweepReport, WorldStreamer},
    voxels::{
        chunk::{Chunk, ChunkState, VoxelGrid, CHUNK_DIMENSION},
        terrain::{TerrainGenerator, TerrainShape},
        voxel::{block_side::BlockSide, voxel_type::VoxelType, Voxel},
        world::{RayHit, World, WorldStats},
    },
};
pub use error::{ConfigError, StreamingError};

/// Initializes `env_logger`, reading the filter from `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    let _ = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init();
}

/// Headless demo: streams the world around an observer walking along +X and
/// logs what is loaded.
///
/// `config_path` names an optional JSON config, see [`WorldConfig`].
pub fn run(config_path: Option<&Path>, steps: usize) -> Result<(), StreamingError> {
    init_logging();
    info!("Logger initialized");

    let config = match config_path {
        Some(path) => WorldConfig::from_json_file(path)?,
        None => WorldConfig::default(),
    };
    info!(
        "Streaming with render distance {}, view distance {}, unload distance {}, seed {}",
        config.render_distance, config.view_distance, config.unload_distance, config.seed
    );

    let mut streamer = WorldStreamer::new(config)?;
    streamer.start()?;

    let step_length = CHUNK_DIMENSION as f32 / 4.0;
    for step in 0..steps {
        let position = Point3::new(step as f32 * step_length, 20.0, 0.0);
        streamer.set_observer_position(position);
        thread::sleep(Duration::from_millis(50));

        let snapshot = streamer.chunk_snapshot();
        let stats = snapshot.stats();
        info!(
            "Step {}: observer in chunk {:?}, {} chunks, {} visible, {} renderable, {} triangles",
            step,
            streamer.observer_chunk(),
            stats.chunks,
            stats.visible,
            snapshot.renderable().count(),
            stats.triangles
        );
    }

    if streamer.chunk_snapshot().is_empty() {
        warn!("No chunks were streamed in");
    }

    streamer.stop();
    Ok(())
}
