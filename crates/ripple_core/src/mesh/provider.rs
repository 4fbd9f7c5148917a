//! # Mesh Provider
//!
//! The four operations a host mesh offers the displacement pipeline, and
//! [`Mesh`], the in-memory implementation.
//!
//! ## Publish Model
//!
//! ```text
//!   geometry: Arc<G0> ──snapshot──▶ job reads G0
//!        │
//!   apply_and_dispose(buffer)        (pointer swap, G0 untouched)
//!        ▼
//!   geometry: Arc<G1>
//! ```
//!
//! Normals are recomputed copy-on-write: if a snapshot still shares the live
//! geometry, it is cloned before being touched.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use super::buffer::OutputBuffer;
use super::flags::UpdateFlags;
use super::geometry::{IndexBuffer, MeshGeometry, SubMeshDescriptor};
use super::lease::LiveCounter;
use super::normals;
use super::snapshot::MeshSnapshot;
use crate::error::MeshResult;

/// Host mesh storage as seen by the displacement pipeline.
pub trait MeshProvider {
    /// Takes a read-only view of the live geometry.
    ///
    /// # Errors
    ///
    /// Fails if the geometry has no vertices, non-16-bit indices, or no
    /// triangle submesh.
    fn acquire_snapshot(&self) -> MeshResult<MeshSnapshot>;

    /// Allocates a fresh, zeroed buffer with the given capacities.
    fn allocate_writable(&self, vertex_count: usize, index_count: usize) -> OutputBuffer;

    /// Publishes `buffer` as the live geometry, consuming it.
    ///
    /// # Errors
    ///
    /// Fails only when index validation is enabled and finds a bad index or
    /// submesh range. The live geometry is unchanged on failure.
    fn apply_and_dispose(&mut self, buffer: OutputBuffer, flags: UpdateFlags) -> MeshResult<()>;

    /// Rebuilds normals of the live geometry from its triangles.
    fn recalculate_normals(&mut self);

    /// Hints that the geometry is rewritten frequently.
    fn mark_dynamic(&mut self);

    /// Vertex count of the live geometry.
    fn vertex_count(&self) -> usize;

    /// Index count of the live geometry.
    fn index_count(&self) -> usize;
}

/// Notification sent to mesh subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshEvent {
    /// The live geometry was replaced.
    GeometryChanged {
        /// Revision after the change.
        revision: u64,
        /// Vertex count of the new geometry.
        vertex_count: usize,
    },
}

/// In-memory mesh with atomic publish and view accounting.
#[derive(Debug)]
pub struct Mesh {
    geometry: Arc<MeshGeometry>,
    revision: u64,
    dynamic: bool,
    snapshots: LiveCounter,
    buffers: LiveCounter,
    allocations: AtomicUsize,
    subscribers: Mutex<Vec<Sender<MeshEvent>>>,
}

impl Mesh {
    /// Creates a mesh owning `geometry`.
    #[must_use]
    pub fn new(geometry: MeshGeometry) -> Self {
        Self {
            geometry: Arc::new(geometry),
            revision: 0,
            dynamic: false,
            snapshots: LiveCounter::new(),
            buffers: LiveCounter::new(),
            allocations: AtomicUsize::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// The live geometry.
    #[inline]
    #[must_use]
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    /// Shared handle to the live geometry.
    #[inline]
    #[must_use]
    pub fn geometry_arc(&self) -> &Arc<MeshGeometry> {
        &self.geometry
    }

    /// Replaces the live geometry outright, topology included.
    pub fn set_geometry(&mut self, geometry: MeshGeometry) {
        self.swap_geometry(geometry, UpdateFlags::empty());
    }

    /// Incremented on every geometry replacement.
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns true once [`MeshProvider::mark_dynamic`] was called.
    #[inline]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Snapshots acquired and not yet released.
    #[inline]
    #[must_use]
    pub fn live_snapshots(&self) -> usize {
        self.snapshots.live()
    }

    /// Output buffers allocated and neither published nor dropped.
    #[inline]
    #[must_use]
    pub fn live_output_buffers(&self) -> usize {
        self.buffers.live()
    }

    /// Output buffers allocated over the mesh's lifetime.
    #[inline]
    #[must_use]
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Subscribes to geometry changes.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<MeshEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Rescans positions into the cached bounds.
    pub fn recalculate_bounds(&mut self) {
        Arc::make_mut(&mut self.geometry).recalculate_bounds();
    }

    fn swap_geometry(&mut self, geometry: MeshGeometry, flags: UpdateFlags) {
        self.geometry = Arc::new(geometry);
        self.revision += 1;

        if !flags.contains(UpdateFlags::DONT_NOTIFY_MESH_USERS) {
            self.notify(MeshEvent::GeometryChanged {
                revision: self.revision,
                vertex_count: self.geometry.vertex_count(),
            });
        }
    }

    fn notify(&self, event: MeshEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sender| sender.send(event).is_ok());
    }
}

impl MeshProvider for Mesh {
    fn acquire_snapshot(&self) -> MeshResult<MeshSnapshot> {
        MeshSnapshot::new(Arc::clone(&self.geometry), self.revision, self.snapshots.lease())
    }

    fn allocate_writable(&self, vertex_count: usize, index_count: usize) -> OutputBuffer {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        OutputBuffer::new(vertex_count, index_count, self.buffers.lease())
    }

    fn apply_and_dispose(&mut self, buffer: OutputBuffer, flags: UpdateFlags) -> MeshResult<()> {
        let (vertices, indices, submesh) = buffer.into_parts();
        let submesh =
            submesh.unwrap_or_else(|| SubMeshDescriptor::triangles(indices.len(), vertices.len()));

        let geometry = if flags.contains(UpdateFlags::DONT_RECALCULATE_BOUNDS) {
            MeshGeometry::with_bounds(
                vertices,
                IndexBuffer::U16(indices),
                vec![submesh],
                self.geometry.bounds(),
            )
        } else {
            MeshGeometry::with_submeshes(vertices, IndexBuffer::U16(indices), vec![submesh])
        };

        if !flags.contains(UpdateFlags::DONT_VALIDATE_INDICES) {
            geometry.validate()?;
        }

        self.swap_geometry(geometry, flags);
        tracing::trace!("mesh published revision {}", self.revision);
        Ok(())
    }

    fn recalculate_normals(&mut self) {
        let geometry = Arc::make_mut(&mut self.geometry);
        let indices = geometry.indices().clone();
        let submeshes = geometry.submeshes().to_vec();
        normals::recalculate_normals(geometry.vertices_mut(), &indices, &submeshes);
    }

    fn mark_dynamic(&mut self) {
        self.dynamic = true;
    }

    fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    fn index_count(&self) -> usize {
        self.geometry.index_count()
    }
}
