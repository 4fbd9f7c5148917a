//! # Output Buffer
//!
//! The write target of one displacement cycle. Freshly allocated, zeroed,
//! and owned by exactly one party at a time: the pipeline, then the job,
//! then the mesh it is published into. Dropping it unpublished releases it.

use super::geometry::SubMeshDescriptor;
use super::lease::Lease;
use crate::vertex::VertexRecord;

/// Exclusively owned vertex and 16-bit index storage for one cycle.
#[derive(Debug)]
pub struct OutputBuffer {
    vertices: Vec<VertexRecord>,
    indices: Vec<u16>,
    submesh: Option<SubMeshDescriptor>,
    _lease: Lease,
}

impl OutputBuffer {
    /// Allocates zeroed storage for `vertex_count` vertices and `index_count` indices.
    #[must_use]
    pub fn new(vertex_count: usize, index_count: usize, lease: Lease) -> Self {
        Self {
            vertices: vec![VertexRecord::default(); vertex_count],
            indices: vec![0; index_count],
            submesh: None,
            _lease: lease,
        }
    }

    /// Number of vertex slots.
    #[inline]
    #[must_use]
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    /// Number of index slots.
    #[inline]
    #[must_use]
    pub fn index_capacity(&self) -> usize {
        self.indices.len()
    }

    /// Vertex slots.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[VertexRecord] {
        &self.vertices
    }

    /// Mutable vertex slots.
    #[inline]
    pub fn vertices_mut(&mut self) -> &mut [VertexRecord] {
        &mut self.vertices
    }

    /// Index slots.
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Fills the index slots from `source`.
    ///
    /// # Panics
    ///
    /// Panics if `source` does not have exactly `index_capacity()` entries.
    /// That is a mismatch between the snapshot and the allocation, never a
    /// runtime condition.
    pub fn copy_indices_from(&mut self, source: &[u16]) {
        assert_eq!(
            source.len(),
            self.indices.len(),
            "Index copy size mismatch! Output buffer allocated for a different topology."
        );
        self.indices.copy_from_slice(source);
    }

    /// Sets the submesh published with this buffer.
    #[inline]
    pub fn set_submesh(&mut self, submesh: SubMeshDescriptor) {
        self.submesh = Some(submesh);
    }

    /// The submesh set so far, if any.
    #[inline]
    #[must_use]
    pub fn submesh(&self) -> Option<&SubMeshDescriptor> {
        self.submesh.as_ref()
    }

    /// Splits the buffer into its storage. The lease is released here.
    #[must_use]
    pub fn into_parts(self) -> (Vec<VertexRecord>, Vec<u16>, Option<SubMeshDescriptor>) {
        (self.vertices, self.indices, self.submesh)
    }
}
