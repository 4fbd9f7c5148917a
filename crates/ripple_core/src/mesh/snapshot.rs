//! # Mesh Snapshot
//!
//! A read-only view of the geometry that was live when it was acquired.
//!
//! The snapshot holds the same `Arc<MeshGeometry>` the mesh held at that
//! moment. Publishing replaces the mesh's `Arc`, it never writes through it,
//! so the view stays stable for as long as it lives. Dropping the snapshot
//! releases it; ownership makes a double release impossible.

use std::ops::Index;
use std::sync::Arc;

use super::geometry::{MeshGeometry, SubMeshDescriptor, Topology};
use super::lease::Lease;
use crate::error::{MeshError, MeshResult};
use crate::vertex::VertexRecord;

/// Immutable view of one mesh's vertices, 16-bit indices and first submesh.
#[derive(Debug)]
pub struct MeshSnapshot {
    geometry: Arc<MeshGeometry>,
    submesh: SubMeshDescriptor,
    revision: u64,
    _lease: Lease,
}

impl MeshSnapshot {
    /// Validates `geometry` and wraps it in a snapshot.
    ///
    /// # Errors
    ///
    /// - [`MeshError::EmptyMesh`] if there are no vertices
    /// - [`MeshError::UnsupportedIndexFormat`] if indices are not `u16`
    /// - [`MeshError::MissingSubMesh`] if there is no submesh
    /// - [`MeshError::UnsupportedTopology`] if the first submesh is not triangles
    pub fn new(geometry: Arc<MeshGeometry>, revision: u64, lease: Lease) -> MeshResult<Self> {
        if geometry.vertex_count() == 0 {
            return Err(MeshError::EmptyMesh);
        }
        if geometry.indices().as_u16().is_none() {
            return Err(MeshError::UnsupportedIndexFormat(geometry.indices().format()));
        }
        let submesh = *geometry.submeshes().first().ok_or(MeshError::MissingSubMesh)?;
        if submesh.topology != Topology::Triangles {
            return Err(MeshError::UnsupportedTopology(submesh.topology));
        }

        Ok(Self {
            geometry,
            submesh,
            revision,
            _lease: lease,
        })
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    /// Number of indices.
    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.geometry.index_count()
    }

    /// All vertex records.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[VertexRecord] {
        self.geometry.vertices()
    }

    /// Vertex at `index`, or `None` past the end.
    #[inline]
    #[must_use]
    pub fn vertex(&self, index: usize) -> Option<&VertexRecord> {
        self.geometry.vertices().get(index)
    }

    /// The index sequence, for bulk copy.
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[u16] {
        // Checked to be u16 in `new`.
        self.geometry.indices().as_u16().unwrap_or_default()
    }

    /// Vertex data as raw bytes.
    #[inline]
    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        VertexRecord::slice_as_bytes(self.vertices())
    }

    /// Index data as raw bytes.
    #[inline]
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.indices())
    }

    /// The submesh the snapshot describes.
    #[inline]
    #[must_use]
    pub fn submesh(&self) -> &SubMeshDescriptor {
        &self.submesh
    }

    /// Revision of the mesh when the snapshot was taken.
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns true if the snapshot reads `geometry` itself, not a copy.
    #[inline]
    #[must_use]
    pub fn shares_geometry(&self, geometry: &Arc<MeshGeometry>) -> bool {
        Arc::ptr_eq(&self.geometry, geometry)
    }

    /// Releases the snapshot. Same as dropping it.
    #[inline]
    pub fn release(self) {}
}

impl Index<usize> for MeshSnapshot {
    type Output = VertexRecord;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.geometry.vertices()[index]
    }
}
