//! One maintenance pass over the world, and the loop that repeats it.
//!
//! A sweep runs three phases against the shared world:
//!
//! 1. **Generate**: every coordinate inside the render cube around the
//!    observer that has no chunk is generated, nearest first. Generation runs
//!    without the world lock; each grid is inserted under a short write lock
//!    and rejected if the world was reseeded meanwhile.
//! 2. **Lifecycle**: active / visible flags are refreshed and inactive chunks
//!    are evicted, both under one write lock, so no reader ever sees an
//!    inactive chunk.
//! 3. **Mesh**: finished meshes are installed, then a mesh task is published
//!    for every active chunk that lacks a mesh and has none in flight.

use std::{
    sync::{atomic::Ordering, Arc},
    thread,
    time::Duration,
};

use cgmath::{Point3, Vector3};
use log::{debug, info, trace, warn};
use web_time::Instant;

use crate::engine_state::{
    meshing::{ChunkMeshGenerationTask, MeshSink},
    task_management::TaskManager,
    voxels::chunk::{chebyshev_distance, Chunk},
};

use super::SharedState;

/// What a single sweep changed.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Chunks generated and inserted.
    pub generated: usize,
    /// Meshes installed.
    pub meshed: usize,
    /// Chunks deactivated and removed from the world, handed over for
    /// disposal.
    pub evicted: Vec<Chunk>,
    /// Mesh tasks still queued or on a worker.
    pub meshes_in_flight: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.generated == 0 && self.meshed == 0 && self.evicted.is_empty()
    }
}

/// Offsets of the cube of radius `radius`, sorted nearest first.
///
/// Ties are broken by the offset itself so the order is stable.
pub fn render_offsets(radius: u32) -> Vec<Vector3<i32>> {
    let radius = radius.min(i32::MAX as u32) as i32;
    let mut offsets = Vec::new();
    for x in -radius..=radius {
        for y in -radius..=radius {
            for z in -radius..=radius {
                offsets.push(Vector3::new(x, y, z));
            }
        }
    }

    let origin = Point3::new(0, 0, 0);
    offsets.sort_by_key(|offset| {
        (
            chebyshev_distance(origin + *offset, origin),
            offset.x * offset.x + offset.y * offset.y + offset.z * offset.z,
            offset.x,
            offset.y,
            offset.z,
        )
    });
    offsets
}

/// `observer + offset`, or `None` when the coordinate leaves the `i32` range.
fn offset_chunk(observer: Point3<i32>, offset: Vector3<i32>) -> Option<Point3<i32>> {
    Some(Point3::new(
        observer.x.checked_add(offset.x)?,
        observer.y.checked_add(offset.y)?,
        observer.z.checked_add(offset.z)?,
    ))
}

/// The state owned by whoever drives the sweeps: the background thread, or a
/// caller of `WorldStreamer::sweep_once`.
pub(crate) struct StreamingLoop {
    shared: Arc<SharedState>,
    tasks: TaskManager<MeshSink>,
    sink: MeshSink,
    offsets: Vec<Vector3<i32>>,
    seen_epoch: u64,
}

impl StreamingLoop {
    pub(crate) fn new(shared: Arc<SharedState>, tasks: TaskManager<MeshSink>) -> Self {
        let sink = MeshSink::new(shared.world.clone());
        let offsets = render_offsets(shared.config.render_distance.unsigned_abs());
        let seen_epoch = shared.world.get().epoch();
        StreamingLoop {
            shared,
            tasks,
            sink,
            offsets,
            seen_epoch,
        }
    }

    /// Sweeps until `running` is cleared. Workers are joined on return.
    pub(crate) fn run(mut self) {
        info!(
            "Streaming started with {} mesh workers",
            self.tasks.num_workers()
        );
        let interval = Duration::from_millis(self.shared.config.sweep_interval_ms);

        let shared = Arc::clone(&self.shared);
        let keep_going = move || shared.running.load(Ordering::Acquire);

        while keep_going() {
            self.sweep(&keep_going);
            thread::sleep(interval);
        }

        info!(
            "Streaming stopped, {} queued mesh tasks discarded",
            self.tasks.discard_queued_tasks()
        );
    }

    /// Runs one generate / lifecycle / mesh pass.
    ///
    /// Generation stops early, after the chunk in progress, once
    /// `keep_going` returns `false`.
    pub(crate) fn sweep(&mut self, keep_going: &dyn Fn() -> bool) -> SweepReport {
        let start = Instant::now();

        let observer = self.shared.observer_chunk();
        let generated = self.generate_missing(observer, keep_going);
        let generated_at = start.elapsed();

        let evicted = self.refresh_lifecycle(observer);
        let meshed = self.mesh_pending();

        let report = SweepReport {
            generated,
            meshed,
            evicted,
            meshes_in_flight: self.sink.pending_len(),
        };

        if !report.is_empty() {
            debug!(
                "Sweep at {:?}: {} generated, {} meshed, {} evicted, {} meshes in flight",
                observer,
                report.generated,
                report.meshed,
                report.evicted.len(),
                report.meshes_in_flight
            );
        }
        trace!(
            "Sweep took {:?} (generation {:?})",
            start.elapsed(),
            generated_at
        );

        report
    }

    fn generate_missing(&mut self, observer: Point3<i32>, keep_going: &dyn Fn() -> bool) -> usize {
        let (generator, epoch, missing) = {
            let world = self.shared.world.get();
            let missing: Vec<Point3<i32>> = self
                .offsets
                .iter()
                .filter_map(|offset| offset_chunk(observer, *offset))
                .filter(|position| !world.contains(*position))
                .collect();
            (world.generator().clone(), world.epoch(), missing)
        };

        let mut generated = 0;
        for position in missing {
            if !keep_going() {
                break;
            }

            let grid = generator.generate(position);
            let mut world = self.shared.world.get_mut();
            if world.epoch() != epoch {
                trace!("World reseeded during generation, restarting next sweep");
                break;
            }
            if world.insert_generated(position, grid, epoch) {
                generated += 1;
            }
        }
        generated
    }

    fn refresh_lifecycle(&mut self, observer: Point3<i32>) -> Vec<Chunk> {
        let config = &self.shared.config;
        let mut world = self.shared.world.get_mut();
        world.refresh_lifecycle(
            observer,
            config.view_distance.unsigned_abs(),
            config.unload_distance.unsigned_abs(),
        );
        world.evict_inactive()
    }

    fn mesh_pending(&mut self) -> usize {
        self.tasks.process_completed_tasks(&mut self.sink);
        self.recover_lost_meshes();

        let (epoch, grids) = {
            let world = self.shared.world.get();
            let epoch = world.epoch();
            if epoch != self.seen_epoch {
                let discarded = self.tasks.discard_queued_tasks();
                self.sink.retain_epoch(epoch);
                self.seen_epoch = epoch;
                debug!("World epoch is now {}, {} queued meshes discarded", epoch, discarded);
            }

            let sink = &self.sink;
            (epoch, world.chunks_needing_mesh(|position| sink.is_pending(position)))
        };

        let culling = self.shared.config.culling;
        for (position, grid) in grids {
            if self.sink.mark_pending(position, epoch) {
                self.tasks.publish_task(Box::new(ChunkMeshGenerationTask::new(
                    position, grid, epoch, culling,
                )));
            }
        }

        self.tasks.process_queued_tasks();
        self.tasks.process_completed_tasks(&mut self.sink);
        self.recover_lost_meshes();
        self.sink.take_installed()
    }

    /// Releases every pending chunk once a worker took tasks down with it, so
    /// the next pass publishes them again. Duplicates from live workers are
    /// rejected by the world.
    fn recover_lost_meshes(&mut self) {
        let lost = self.tasks.take_lost_tasks();
        if lost > 0 {
            let discarded = self.tasks.discard_queued_tasks();
            let released = self.sink.clear_pending();
            warn!(
                "{} mesh tasks lost to a stopped worker, {} chunks released and {} queued tasks discarded",
                lost, released, discarded
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_cover_the_cube_nearest_first() {
        let offsets = render_offsets(2);
        assert_eq!(offsets.len(), 125);
        assert_eq!(offsets[0], Vector3::new(0, 0, 0));

        let origin = Point3::new(0, 0, 0);
        let distances: Vec<u32> = offsets
            .iter()
            .map(|offset| chebyshev_distance(origin + *offset, origin))
            .collect();
        assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(distances.iter().filter(|d| **d <= 1).count(), 27);
    }

    #[test]
    fn offsets_past_the_coordinate_limits_are_dropped() {
        let edge = Point3::new(i32::MAX, 0, i32::MIN);
        assert_eq!(offset_chunk(edge, Vector3::new(1, 0, 0)), None);
        assert_eq!(offset_chunk(edge, Vector3::new(0, 0, -1)), None);
        assert_eq!(
            offset_chunk(edge, Vector3::new(-1, 1, 1)),
            Some(Point3::new(i32::MAX - 1, 1, i32::MIN + 1))
        );
        let kept = render_offsets(1)
            .into_iter()
            .filter_map(|offset| offset_chunk(edge, offset))
            .count();
        assert_eq!(kept, 12);
    }

    #[test]
    fn zero_radius_is_the_observer_chunk() {
        assert_eq!(render_offsets(0), vec![Vector3::new(0, 0, 0)]);
    }
}
