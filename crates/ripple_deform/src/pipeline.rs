//! # Double-Buffered Mesh Pipeline
//!
//! Drives one displacement job per frame across two host calls.
//!
//! ## State Machine
//!
//! ```text
//!              on_schedule_tick                on_schedule_tick
//!            (snapshot, allocate,               (no-op: one job
//!             copy indices, spawn)               in flight max)
//!   ┌──────┐ ─────────────────────▶ ┌───────────┐ ◀──┐
//!   │ Idle │                        │ Scheduled │ ───┘
//!   └──────┘ ◀───────────────────── └───────────┘
//!              on_complete_tick
//!            (join, release snapshot,
//!             publish, recompute normals)
//! ```
//!
//! ## Buffers
//!
//! The renderer reads the mesh's live geometry (buffer N). The job writes a
//! freshly allocated output (buffer N+1). The two never alias: the output
//! only becomes live at publish, and the next output is not allocated until
//! the state machine is back in `Idle`.
//!
//! ## Teardown
//!
//! Dropping the pipeline while `Scheduled` joins the job and releases the
//! snapshot and output without publishing.

use std::sync::Arc;

use rayon::ThreadPool;
use ripple_core::{MeshProvider, UpdateFlags};
use tracing::{debug, trace, warn};

use crate::config::{validate_scalar, DeformerConfig};
use crate::displacement::{Displacement, RadialSine};
use crate::error::{DeformError, DeformResult};
use crate::job::{CompletedJob, JobHandle, JobParams};

/// Observable pipeline state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// No job in flight.
    Idle,
    /// A job is in flight.
    Scheduled,
}

/// What a schedule tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A new job was launched.
    Scheduled {
        /// Frame number of the job.
        frame: u64,
    },
    /// A job was already in flight; nothing was allocated or launched.
    AlreadyInFlight,
}

/// What a complete tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompleteOutcome {
    /// The job's output is now the mesh's live geometry.
    Published {
        /// Frame number of the job.
        frame: u64,
        /// Vertices published.
        vertex_count: usize,
    },
    /// Nothing was in flight.
    Idle,
}

/// Lifetime counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Jobs launched.
    pub frames_scheduled: u64,
    /// Outputs published.
    pub frames_published: u64,
    /// Schedule ticks ignored because a job was in flight.
    pub skipped_schedules: u64,
    /// Output buffers allocated.
    pub buffers_allocated: u64,
    /// Outputs discarded because the mesh topology changed mid-flight.
    pub topology_resyncs: u64,
    /// Jobs joined and discarded at teardown.
    pub drained_on_shutdown: u64,
}

struct InFlight {
    handle: JobHandle,
    frame: u64,
}

enum Stage {
    Idle,
    Scheduled(InFlight),
}

/// Schedules, joins and publishes one displacement job per frame.
pub struct DeformPipeline<D: Displacement + 'static = RadialSine> {
    config: DeformerConfig,
    displacement: Arc<D>,
    pool: Option<Arc<ThreadPool>>,
    stage: Stage,
    stats: PipelineStats,
    next_frame: u64,
}

impl DeformPipeline<RadialSine> {
    /// Creates a pipeline using the radial sine wave.
    ///
    /// # Errors
    ///
    /// Fails if `config` is invalid or its worker pool cannot be built.
    pub fn new(config: DeformerConfig) -> DeformResult<Self> {
        Self::with_displacement(config, RadialSine)
    }
}

impl<D: Displacement + 'static> DeformPipeline<D> {
    /// Creates a pipeline using a custom displacement policy.
    ///
    /// # Errors
    ///
    /// Fails if `config` is invalid or its worker pool cannot be built.
    pub fn with_displacement(config: DeformerConfig, displacement: D) -> DeformResult<Self> {
        config.validate()?;
        let pool = config.build_thread_pool()?;
        Ok(Self {
            config,
            displacement: Arc::new(displacement),
            pool,
            stage: Stage::Idle,
            stats: PipelineStats::default(),
            next_frame: 0,
        })
    }

    /// Current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DeformerConfig {
        &self.config
    }

    /// Speed used by the next scheduled job.
    #[inline]
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.config.speed
    }

    /// Sets the speed for the next scheduled job. A job in flight keeps the
    /// value it was scheduled with.
    ///
    /// # Errors
    ///
    /// [`DeformError::InvalidConfig`] if `speed` is not finite.
    pub fn set_speed(&mut self, speed: f64) -> DeformResult<()> {
        validate_scalar("speed", speed)?;
        self.config.speed = speed;
        Ok(())
    }

    /// Amplitude used by the next scheduled job.
    #[inline]
    #[must_use]
    pub fn amplitude(&self) -> f64 {
        self.config.amplitude
    }

    /// Sets the amplitude for the next scheduled job. A job in flight keeps
    /// the value it was scheduled with.
    ///
    /// # Errors
    ///
    /// [`DeformError::InvalidConfig`] if `amplitude` is not finite.
    pub fn set_amplitude(&mut self, amplitude: f64) -> DeformResult<()> {
        validate_scalar("amplitude", amplitude)?;
        self.config.amplitude = amplitude;
        Ok(())
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> PipelineState {
        match self.stage {
            Stage::Idle => PipelineState::Idle,
            Stage::Scheduled(_) => PipelineState::Scheduled,
        }
    }

    /// Returns true while a job is in flight.
    #[inline]
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self.stage, Stage::Scheduled(_))
    }

    /// Parameters of the job in flight, if any.
    #[must_use]
    pub fn in_flight_params(&self) -> Option<JobParams> {
        match &self.stage {
            Stage::Idle => None,
            Stage::Scheduled(in_flight) => Some(in_flight.handle.params()),
        }
    }

    /// Returns true if a job is in flight and has finished. Never blocks.
    #[must_use]
    pub fn is_job_complete(&self) -> bool {
        match &self.stage {
            Stage::Idle => false,
            Stage::Scheduled(in_flight) => in_flight.handle.is_complete(),
        }
    }

    /// Lifetime counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Frame start: snapshot the mesh and launch a job, unless one is in flight.
    ///
    /// # Errors
    ///
    /// [`DeformError::Mesh`] if the mesh cannot be snapshotted (no vertices,
    /// non-16-bit indices). No buffer stays allocated and no job is launched.
    pub fn on_schedule_tick<M: MeshProvider + ?Sized>(
        &mut self,
        mesh: &M,
        time: f64,
    ) -> DeformResult<ScheduleOutcome> {
        if let Stage::Scheduled(in_flight) = &self.stage {
            self.stats.skipped_schedules += 1;
            trace!("schedule tick ignored, frame {} still in flight", in_flight.frame);
            return Ok(ScheduleOutcome::AlreadyInFlight);
        }

        let snapshot = mesh.acquire_snapshot()?;
        let mut output = mesh.allocate_writable(snapshot.vertex_count(), snapshot.index_count());
        self.stats.buffers_allocated += 1;

        // Indices never change, copy them now instead of on the workers.
        output.copy_indices_from(snapshot.indices());
        output.set_submesh(*snapshot.submesh());

        let params = JobParams {
            speed: self.config.speed,
            amplitude: self.config.amplitude,
            time,
        };
        let frame = self.next_frame;
        self.next_frame += 1;

        debug!(
            "frame {}: scheduling displacement of {} vertices (t={}, speed={}, amplitude={})",
            frame,
            snapshot.vertex_count(),
            time,
            params.speed,
            params.amplitude
        );

        let handle = JobHandle::spawn(
            self.pool.as_deref(),
            snapshot,
            output,
            params,
            Arc::clone(&self.displacement),
            self.config.chunk_size,
        );
        self.stage = Stage::Scheduled(InFlight { handle, frame });
        self.stats.frames_scheduled += 1;

        Ok(ScheduleOutcome::Scheduled { frame })
    }

    /// Frame end: join the job, publish its output, recompute normals.
    ///
    /// # Errors
    ///
    /// - [`DeformError::JoinTimeout`] if a join timeout is configured and
    ///   expires. The job stays in flight.
    /// - [`DeformError::TopologyChanged`] if the mesh's vertex or index count
    ///   changed since the snapshot. The output is discarded and the pipeline
    ///   is `Idle`, so the next schedule tick resynchronizes.
    /// - [`DeformError::Mesh`] if the mesh rejects the publish.
    pub fn on_complete_tick<M: MeshProvider + ?Sized>(
        &mut self,
        mesh: &mut M,
    ) -> DeformResult<CompleteOutcome> {
        let Stage::Scheduled(in_flight) = std::mem::replace(&mut self.stage, Stage::Idle) else {
            return Ok(CompleteOutcome::Idle);
        };

        let completed = match self.config.join_timeout() {
            Some(timeout) => match in_flight.handle.join_timeout(timeout) {
                Ok(completed) => completed,
                Err(err @ DeformError::JoinTimeout { .. }) => {
                    warn!("frame {}: {}", in_flight.frame, err);
                    self.stage = Stage::Scheduled(in_flight);
                    return Err(err);
                }
                Err(err) => return Err(err),
            },
            None => in_flight.handle.join()?,
        };

        self.publish(mesh, in_flight.frame, completed)
    }

    /// Joins any job in flight and releases its buffers without publishing.
    /// Returns true if a job was drained. Also runs on drop.
    pub fn shutdown(&mut self) -> bool {
        self.drain()
    }

    fn publish<M: MeshProvider + ?Sized>(
        &mut self,
        mesh: &mut M,
        frame: u64,
        completed: CompletedJob,
    ) -> DeformResult<CompleteOutcome> {
        let CompletedJob { snapshot, output } = completed;
        let vertex_count = snapshot.vertex_count();
        let index_count = snapshot.index_count();

        if mesh.vertex_count() != vertex_count || mesh.index_count() != index_count {
            let err = DeformError::TopologyChanged {
                expected_vertices: vertex_count,
                expected_indices: index_count,
                actual_vertices: mesh.vertex_count(),
                actual_indices: mesh.index_count(),
            };
            warn!("frame {}: {}, discarding output", frame, err);
            self.stats.topology_resyncs += 1;
            return Err(err);
        }

        // Last frame's geometry; the output replaces it.
        snapshot.release();

        mesh.mark_dynamic();
        mesh.apply_and_dispose(output, UpdateFlags::FAST_PATH)?;
        mesh.recalculate_normals();
        self.stats.frames_published += 1;

        trace!("frame {}: published {} vertices", frame, vertex_count);
        Ok(CompleteOutcome::Published {
            frame,
            vertex_count,
        })
    }
}

impl<D: Displacement + 'static> DeformPipeline<D> {
    fn drain(&mut self) -> bool {
        let Stage::Scheduled(in_flight) = std::mem::replace(&mut self.stage, Stage::Idle) else {
            return false;
        };
        debug!("draining frame {} before teardown", in_flight.frame);
        // Buffers are released when the result drops, unpublished.
        if let Err(err) = in_flight.handle.join() {
            warn!("frame {}: {} during teardown", in_flight.frame, err);
        }
        self.stats.drained_on_shutdown += 1;
        true
    }
}

impl<D: Displacement + 'static> Drop for DeformPipeline<D> {
    fn drop(&mut self) {
        self.drain();
    }
}
