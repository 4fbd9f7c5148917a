//! # Parallel Displacement Job
//!
//! Rewrites every vertex of a snapshot into an output buffer:
//!
//! ```text
//! output[i] = snapshot[i] with position.y += offset(snapshot[i].position, params)
//! ```
//!
//! ## Work Split
//!
//! ```text
//! output: [ 0 .. 63 ][ 64 .. 127 ][ 128 .. 191 ] ... [ .. n ]
//!            worker A    worker B     worker A          worker C
//! ```
//!
//! Each chunk is a disjoint `&mut` slice, so workers need no locks and the
//! result for vertex `i` never depends on which worker wrote it.
//!
//! ## Ownership While In Flight
//!
//! [`JobHandle::spawn`] moves the snapshot and the output buffer into the
//! worker task. The coordinator keeps only the receiving end of a one-slot
//! channel; joining hands both back as a [`CompletedJob`].

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use glam::Vec3;
use rayon::prelude::*;
use rayon::ThreadPool;
use ripple_core::{MeshSnapshot, OutputBuffer, VertexRecord};

use crate::displacement::Displacement;
use crate::error::{DeformError, DeformResult};

/// Vertices per work item.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Scalar parameters captured when a job is scheduled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JobParams {
    /// Multiplier on time.
    pub speed: f64,
    /// Multiplier on the offset.
    pub amplitude: f64,
    /// Time value for this job.
    pub time: f64,
}

/// Everything one displacement pass reads: the snapshot, the parameters and
/// the policy. Writes go to the slice handed to [`run`](Self::run).
pub struct DisplacementJob<'a, D: Displacement + ?Sized> {
    snapshot: &'a MeshSnapshot,
    params: JobParams,
    displacement: &'a D,
}

impl<'a, D: Displacement + ?Sized> DisplacementJob<'a, D> {
    /// Describes a pass over `snapshot`.
    #[must_use]
    pub fn new(snapshot: &'a MeshSnapshot, params: JobParams, displacement: &'a D) -> Self {
        Self {
            snapshot,
            params,
            displacement,
        }
    }

    /// Parameters of the pass.
    #[inline]
    #[must_use]
    pub fn params(&self) -> JobParams {
        self.params
    }

    /// Computes vertex `index` into `out`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the snapshot.
    #[inline]
    pub fn execute(&self, index: usize, out: &mut VertexRecord) {
        let source = &self.snapshot[index];
        let [x, y, z] = source.position;
        let offset = self.displacement.offset(
            Vec3::new(x, y, z),
            self.params.time,
            self.params.speed,
            self.params.amplitude,
        );

        #[allow(clippy::cast_possible_truncation)]
        let displaced_y = (f64::from(y) + offset) as f32;

        *out = VertexRecord {
            position: [x, displaced_y, z],
            ..*source
        };
    }

    /// Computes every vertex in parallel on the current rayon pool.
    ///
    /// # Panics
    ///
    /// Panics if `output` is smaller than the snapshot or `chunk_size` is zero.
    pub fn run(&self, output: &mut [VertexRecord], chunk_size: usize) {
        let count = self.checked_len(output);
        assert!(chunk_size > 0, "Chunk size must be greater than zero");

        output[..count]
            .par_chunks_mut(chunk_size)
            .enumerate()
            .for_each(|(chunk, slots)| {
                let base = chunk * chunk_size;
                for (offset, slot) in slots.iter_mut().enumerate() {
                    self.execute(base + offset, slot);
                }
            });
    }

    /// Computes every vertex on the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if `output` is smaller than the snapshot.
    pub fn run_serial(&self, output: &mut [VertexRecord]) {
        let count = self.checked_len(output);
        for (index, slot) in output[..count].iter_mut().enumerate() {
            self.execute(index, slot);
        }
    }

    fn checked_len(&self, output: &[VertexRecord]) -> usize {
        let count = self.snapshot.vertex_count();
        assert!(
            output.len() >= count,
            "Output buffer undersized! {} slots for {} vertices.",
            output.len(),
            count
        );
        count
    }
}

/// A finished job: the snapshot it read and the buffer it filled.
#[derive(Debug)]
pub struct CompletedJob {
    /// The snapshot the job read. Release it before publishing.
    pub snapshot: MeshSnapshot,
    /// The filled output buffer.
    pub output: OutputBuffer,
}

/// Handle to a job running on the worker pool.
#[derive(Debug)]
pub struct JobHandle {
    receiver: Receiver<CompletedJob>,
    params: JobParams,
    vertex_count: usize,
    index_count: usize,
}

impl JobHandle {
    /// Moves `snapshot` and `output` into a worker task and starts the pass.
    ///
    /// Runs on `pool` if given, else on the global rayon pool. The chunked
    /// loop inside runs on the same pool.
    ///
    /// # Panics
    ///
    /// The worker panics (a fatal contract violation) if `output` has fewer
    /// vertex slots than the snapshot has vertices.
    pub fn spawn<D>(
        pool: Option<&ThreadPool>,
        snapshot: MeshSnapshot,
        mut output: OutputBuffer,
        params: JobParams,
        displacement: Arc<D>,
        chunk_size: usize,
    ) -> Self
    where
        D: Displacement + ?Sized + 'static,
    {
        let (sender, receiver) = bounded(1);
        let vertex_count = snapshot.vertex_count();
        let index_count = snapshot.index_count();

        let work = move || {
            DisplacementJob::new(&snapshot, params, &*displacement)
                .run(output.vertices_mut(), chunk_size);
            // The receiver is only gone if the handle was leaked.
            let _ = sender.send(CompletedJob { snapshot, output });
        };

        match pool {
            Some(pool) => pool.spawn(work),
            None => rayon::spawn(work),
        }

        Self {
            receiver,
            params,
            vertex_count,
            index_count,
        }
    }

    /// Parameters the job was scheduled with.
    #[inline]
    #[must_use]
    pub fn params(&self) -> JobParams {
        self.params
    }

    /// Vertex count of the snapshot the job reads.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Index count of the snapshot the job reads.
    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// Returns true once the result is ready. Never blocks.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Blocks until the job finishes.
    ///
    /// # Errors
    ///
    /// [`DeformError::JobDisconnected`] if the worker died without a result.
    pub fn join(self) -> DeformResult<CompletedJob> {
        self.receiver.recv().map_err(|_| DeformError::JobDisconnected)
    }

    /// Blocks until the job finishes or `timeout` passes. On timeout the
    /// handle stays valid and the job keeps running.
    ///
    /// # Errors
    ///
    /// - [`DeformError::JoinTimeout`] if the job is still running
    /// - [`DeformError::JobDisconnected`] if the worker died without a result
    pub fn join_timeout(&self, timeout: Duration) -> DeformResult<CompletedJob> {
        self.receiver.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => DeformError::JoinTimeout {
                waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            RecvTimeoutError::Disconnected => DeformError::JobDisconnected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::displacement::{displace, RadialSine};
    use ripple_core::{primitives, IndexBuffer, Mesh, MeshGeometry, MeshProvider};

    fn reference_mesh() -> Mesh {
        Mesh::new(MeshGeometry::new(
            vec![
                VertexRecord::new([0.0, 0.0, 0.0]).with_uvs([0.1, 0.2], [0.3, 0.4]),
                VertexRecord::new([1.0, 0.0, 0.0]).with_normal([0.0, 0.0, 1.0]),
                VertexRecord::new([0.0, 0.0, 6.0]),
            ],
            IndexBuffer::U16(vec![0, 1, 2]),
        ))
    }

    fn wavy_plane() -> Mesh {
        let mut geometry = primitives::plane(40, 12.0);
        let params = JobParams {
            speed: 1.3,
            amplitude: 0.7,
            time: 0.4,
        };
        // One pass first so positions are not all on y = 0.
        let seed = Mesh::new(geometry.clone());
        let snapshot = seed.acquire_snapshot().expect("valid mesh");
        let mut out = vec![VertexRecord::default(); snapshot.vertex_count()];
        DisplacementJob::new(&snapshot, params, &RadialSine).run_serial(&mut out);
        geometry = MeshGeometry::new(out, geometry.indices().clone());
        Mesh::new(geometry)
    }

    const PARAMS: JobParams = JobParams {
        speed: 2.0,
        amplitude: 0.25,
        time: 0.0,
    };

    #[test]
    fn test_reference_scenario() {
        let mesh = reference_mesh();
        let snapshot = mesh.acquire_snapshot().expect("valid mesh");
        let mut out = vec![VertexRecord::default(); 3];

        DisplacementJob::new(&snapshot, PARAMS, &RadialSine).run(&mut out, DEFAULT_CHUNK_SIZE);

        let expected = [6.0_f64.sin() * 0.25, 5.0_f64.sin() * 0.25, 0.0];
        for (v, offset) in out.iter().zip(expected) {
            #[allow(clippy::cast_possible_truncation)]
            let y = offset as f32;
            assert_eq!(v.position[1], y);
        }
        assert!((out[0].position[1] - (-0.0697)).abs() < 1e-3);
        assert!((out[1].position[1] - (-0.2397)).abs() < 1e-3);
    }

    #[test]
    fn test_attributes_preserved() {
        let mesh = wavy_plane();
        let snapshot = mesh.acquire_snapshot().expect("valid mesh");
        let mut out = vec![VertexRecord::default(); snapshot.vertex_count()];
        let params = JobParams {
            speed: 2.0,
            amplitude: 0.25,
            time: 3.5,
        };

        DisplacementJob::new(&snapshot, params, &RadialSine).run(&mut out, 7);

        for (i, (after, before)) in out.iter().zip(snapshot.vertices()).enumerate() {
            assert_eq!(after.normal, before.normal, "normal of {i}");
            assert_eq!(after.tangent, before.tangent, "tangent of {i}");
            assert_eq!(after.uv0, before.uv0, "uv0 of {i}");
            assert_eq!(after.uv1, before.uv1, "uv1 of {i}");
            assert_eq!(after.position[0], before.position[0]);
            assert_eq!(after.position[2], before.position[2]);

            let offset = displace(before.position_vec(), 3.5, 2.0, 0.25);
            #[allow(clippy::cast_possible_truncation)]
            let y = (f64::from(before.position[1]) + offset) as f32;
            assert_eq!(after.position[1], y, "height of {i}");
        }
    }

    #[test]
    fn test_zero_amplitude_round_trip() {
        let mesh = wavy_plane();
        let snapshot = mesh.acquire_snapshot().expect("valid mesh");
        let mut out = vec![VertexRecord::default(); snapshot.vertex_count()];
        let params = JobParams {
            speed: 2.0,
            amplitude: 0.0,
            time: 17.0,
        };

        DisplacementJob::new(&snapshot, params, &RadialSine).run(&mut out, DEFAULT_CHUNK_SIZE);

        assert_eq!(out.as_slice(), snapshot.vertices());
    }

    #[test]
    fn test_parallel_matches_serial_any_pool() {
        let mesh = wavy_plane();
        let snapshot = mesh.acquire_snapshot().expect("valid mesh");
        let params = JobParams {
            speed: 2.0,
            amplitude: 0.25,
            time: 9.75,
        };
        let job = DisplacementJob::new(&snapshot, params, &RadialSine);

        let mut serial = vec![VertexRecord::default(); snapshot.vertex_count()];
        job.run_serial(&mut serial);
        let serial_bytes = VertexRecord::slice_as_bytes(&serial).to_vec();

        for threads in [1, 2, 4, 8] {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .expect("pool");
            for chunk_size in [1, 13, DEFAULT_CHUNK_SIZE, 4096] {
                let mut parallel = vec![VertexRecord::default(); snapshot.vertex_count()];
                pool.install(|| job.run(&mut parallel, chunk_size));
                assert_eq!(
                    VertexRecord::slice_as_bytes(&parallel),
                    serial_bytes.as_slice(),
                    "{threads} threads, chunk {chunk_size}"
                );
            }
        }
    }

    #[test]
    fn test_oversized_output_tail_untouched() {
        let mesh = reference_mesh();
        let snapshot = mesh.acquire_snapshot().expect("valid mesh");
        let sentinel = VertexRecord::new([9.0, 9.0, 9.0]);
        let mut out = vec![sentinel; 5];

        DisplacementJob::new(&snapshot, PARAMS, &RadialSine).run(&mut out, 2);

        assert_eq!(out[3], sentinel);
        assert_eq!(out[4], sentinel);
    }

    #[test]
    #[should_panic(expected = "Output buffer undersized")]
    fn test_undersized_output_panics() {
        let mesh = reference_mesh();
        let snapshot = mesh.acquire_snapshot().expect("valid mesh");
        let mut out = vec![VertexRecord::default(); 2];
        DisplacementJob::new(&snapshot, PARAMS, &RadialSine).run_serial(&mut out);
    }

    #[test]
    fn test_spawned_job_hands_back_ownership() {
        let mesh = reference_mesh();
        let snapshot = mesh.acquire_snapshot().expect("valid mesh");
        let output = mesh.allocate_writable(snapshot.vertex_count(), snapshot.index_count());

        let handle = JobHandle::spawn(
            None,
            snapshot,
            output,
            PARAMS,
            Arc::new(RadialSine),
            DEFAULT_CHUNK_SIZE,
        );
        assert_eq!(handle.vertex_count(), 3);
        assert_eq!(handle.index_count(), 3);
        assert_eq!(handle.params(), PARAMS);

        let done = handle.join().expect("job completes");
        assert_eq!(mesh.live_snapshots(), 1);
        assert_eq!(mesh.live_output_buffers(), 1);
        assert_eq!(done.output.vertices()[2].position, [0.0, 0.0, 6.0]);

        drop(done);
        assert_eq!(mesh.live_snapshots(), 0);
        assert_eq!(mesh.live_output_buffers(), 0);
    }

    #[test]
    fn test_join_timeout_on_dedicated_pool() {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .expect("pool");
        let mesh = reference_mesh();
        let snapshot = mesh.acquire_snapshot().expect("valid mesh");
        let output = mesh.allocate_writable(snapshot.vertex_count(), snapshot.index_count());

        let handle = JobHandle::spawn(
            Some(&pool),
            snapshot,
            output,
            PARAMS,
            Arc::new(RadialSine),
            DEFAULT_CHUNK_SIZE,
        );
        let done = handle
            .join_timeout(Duration::from_secs(30))
            .expect("job completes well within the timeout");
        assert_eq!(done.output.vertex_capacity(), 3);
        assert!(!handle.is_complete());
    }
}
