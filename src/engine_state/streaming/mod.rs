//! # World Streaming
//!
//! `WorldStreamer` keeps the chunks around a moving observer generated,
//! flagged and meshed on a background thread while the foreground only
//! reports the observer position and reads snapshots.
//!
//! ## Threads
//!
//! - The caller's thread: `set_observer_position`, `chunk_snapshot`,
//!   `reseed`, `clear`, `stats`, `raycast`.
//! - One streaming thread running [`sweep`] passes every
//!   `sweep_interval_ms`.
//! - `mesh_workers` mesh threads owned by the streaming thread.
//!
//! The world lives behind an [`MtResource`]: the streaming thread takes the
//! write lock only for short insert / flag / install steps, so a snapshot
//! never waits for generation or meshing.
//!
//! ## Stopping
//!
//! `stop` clears the running flag, waits for the streaming thread to finish
//! the chunk it is working on, joins the mesh workers and releases every
//! chunk. The streamer can be started again afterwards.

pub mod snapshot;
pub mod sweep;

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
};

use cgmath::{Point3, Vector3};
use log::{error, info, warn};

use crate::{
    config::WorldConfig,
    core::MtResource,
    engine_state::{
        task_management::TaskManager,
        voxels::{
            chunk::chunk_coordinate_of,
            terrain::TerrainGenerator,
            world::{RayHit, World, WorldStats},
        },
    },
    error::StreamingError,
};

pub use snapshot::{ChunkSnapshot, RenderableChunk};
pub use sweep::{render_offsets, SweepReport};

use sweep::StreamingLoop;

/// State shared between the streamer handle and its background thread.
pub(crate) struct SharedState {
    pub(crate) config: WorldConfig,
    pub(crate) world: MtResource<World>,
    /// Chunk coordinate of the observer.
    observer: Mutex<Point3<i32>>,
    /// Extents of generated chunks, fixed for the streamer's lifetime.
    extents: Vector3<usize>,
    pub(crate) running: AtomicBool,
}

impl SharedState {
    pub(crate) fn observer_chunk(&self) -> Point3<i32> {
        *self.observer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_observer_chunk(&self, chunk: Point3<i32>) {
        *self.observer.lock().unwrap_or_else(PoisonError::into_inner) = chunk;
    }
}

/// Streams chunks around an observer.
pub struct WorldStreamer {
    shared: Arc<SharedState>,
    worker: Option<JoinHandle<()>>,
}

impl WorldStreamer {
    /// Creates a stopped streamer generating terrain from `config`.
    pub fn new(config: WorldConfig) -> Result<Self, StreamingError> {
        let generator = TerrainGenerator::new(config.seed, config.terrain);
        Self::with_generator(config, generator)
    }

    /// Creates a stopped streamer with a custom generator. The generator's
    /// seed and shape take precedence over the ones in `config`.
    pub fn with_generator(
        config: WorldConfig,
        generator: TerrainGenerator,
    ) -> Result<Self, StreamingError> {
        config.validate()?;
        if config.render_distance > config.unload_distance {
            warn!(
                "render_distance {} exceeds unload_distance {}, chunks past the unload distance are evicted by the sweep that generates them",
                config.render_distance, config.unload_distance
            );
        }

        let extents = generator.extents();
        Ok(WorldStreamer {
            shared: Arc::new(SharedState {
                config,
                world: MtResource::new(World::new(generator)),
                observer: Mutex::new(Point3::new(0, 0, 0)),
                extents,
                running: AtomicBool::new(false),
            }),
            worker: None,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.shared.config
    }

    /// Spawns the streaming thread.
    pub fn start(&mut self) -> Result<(), StreamingError> {
        if self.worker.is_some() {
            return Err(StreamingError::AlreadyRunning);
        }

        let tasks = TaskManager::new(self.shared.config.mesh_workers).map_err(StreamingError::Spawn)?;
        let streaming_loop = StreamingLoop::new(Arc::clone(&self.shared), tasks);

        self.shared.running.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name("world-streaming".to_string())
            .spawn(move || streaming_loop.run());

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                Err(StreamingError::Spawn(err))
            }
        }
    }

    /// Stops the streaming thread and releases every chunk.
    ///
    /// Blocks until the chunk being generated or meshed is finished. Does
    /// nothing but release the chunks if the streamer was not running.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("The streaming thread panicked");
            }
        }

        let released = {
            let mut world = self.shared.world.get_mut();
            let released = world.len();
            world.clear();
            released
        };
        if released > 0 {
            info!("Released {} chunks", released);
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some() && self.shared.running.load(Ordering::Acquire)
    }

    /// Runs one sweep on the calling thread, meshing inline.
    ///
    /// Fails with [`StreamingError::AlreadyRunning`] while the background
    /// thread is sweeping.
    pub fn sweep_once(&self) -> Result<SweepReport, StreamingError> {
        if self.worker.is_some() {
            return Err(StreamingError::AlreadyRunning);
        }

        let tasks = TaskManager::new(0).map_err(StreamingError::Spawn)?;
        let mut streaming_loop = StreamingLoop::new(Arc::clone(&self.shared), tasks);
        Ok(streaming_loop.sweep(&|| true))
    }

    /// Records the observer's world-space position. Never waits for the
    /// streaming thread.
    pub fn set_observer_position(&self, position: Point3<f32>) {
        self.shared
            .set_observer_chunk(chunk_coordinate_of(position, self.shared.extents));
    }

    /// Records the observer's position as a chunk coordinate.
    pub fn set_observer_chunk(&self, chunk: Point3<i32>) {
        self.shared.set_observer_chunk(chunk);
    }

    pub fn observer_chunk(&self) -> Point3<i32> {
        self.shared.observer_chunk()
    }

    /// A read-only view of the loaded chunks. See [`ChunkSnapshot`] for the
    /// locking caveat.
    pub fn chunk_snapshot(&self) -> ChunkSnapshot<'_> {
        ChunkSnapshot::new(self.shared.world.get())
    }

    /// Seed of the terrain generator.
    pub fn seed(&self) -> u32 {
        self.shared.world.get().generator().seed()
    }

    /// Switches to `seed`. Every existing chunk is discarded and the world is
    /// regenerated by the following sweeps; chunks of both seeds never coexist.
    pub fn reseed(&self, seed: u32) {
        self.shared.world.get_mut().reseed(seed);
        info!("World reseeded with {}", seed);
    }

    /// Reseeds with a random seed and returns it.
    pub fn reseed_random(&self) -> u32 {
        let seed = fastrand::u32(..);
        self.reseed(seed);
        seed
    }

    /// Discards every chunk. They are regenerated by the following sweeps.
    pub fn clear(&self) {
        let mut world = self.shared.world.get_mut();
        if !world.is_empty() {
            info!("Cleared {} chunks", world.len());
        }
        world.clear();
    }

    pub fn stats(&self) -> WorldStats {
        self.shared.world.get().stats()
    }

    /// First solid voxel along a ray, within the loaded chunks.
    pub fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RayHit> {
        self.shared.world.get().raycast(origin, direction, max_distance)
    }
}

impl Drop for WorldStreamer {
    fn drop(&mut self) {
        if self.worker.is_some() {
            warn!("WorldStreamer dropped while running, stopping it");
            self.stop();
        }
    }
}
