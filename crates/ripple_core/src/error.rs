//! # Mesh Error Types
//!
//! All errors that can occur while reading or publishing mesh geometry.

use thiserror::Error;

use crate::mesh::{IndexFormat, Topology};

/// Errors that can occur in the mesh data model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// The mesh has no vertices to snapshot.
    #[error("mesh has zero vertices")]
    EmptyMesh,

    /// The index buffer is not 16-bit unsigned.
    #[error("unsupported index format {0:?}: snapshots require 16-bit unsigned indices")]
    UnsupportedIndexFormat(IndexFormat),

    /// The mesh has no submesh descriptor.
    #[error("mesh has no submesh")]
    MissingSubMesh,

    /// The first submesh is not a triangle list.
    #[error("unsupported topology {0:?}: only triangle lists can be displaced")]
    UnsupportedTopology(Topology),

    /// An index refers to a vertex that does not exist.
    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Position of the offending entry in the index buffer.
        position: usize,
        /// The index value.
        index: u32,
        /// Number of vertices in the buffer.
        vertex_count: usize,
    },

    /// A submesh range does not fit the buffers it describes.
    #[error(
        "submesh {submesh} covers indices {index_start}..{index_end} but the buffer holds {index_count}"
    )]
    SubMeshOutOfRange {
        /// Submesh slot.
        submesh: usize,
        /// First index of the range.
        index_start: usize,
        /// One past the last index of the range.
        index_end: usize,
        /// Number of indices in the buffer.
        index_count: usize,
    },

    /// Raw vertex bytes are not a whole number of records.
    #[error("vertex byte buffer of {len} bytes is not a multiple of the {stride}-byte stride")]
    MisalignedVertexBytes {
        /// Length of the byte buffer.
        len: usize,
        /// Size of one vertex record.
        stride: usize,
    },
}

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;
