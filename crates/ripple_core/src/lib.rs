//! # RIPPLE Core
//!
//! Mesh data model for per-frame procedural displacement:
//! - A fixed-layout vertex record that is viewable as a flat buffer
//! - Read-only snapshots of the live geometry
//! - Freshly allocated output buffers, one per cycle
//! - An in-memory host mesh that publishes buffers atomically
//!
//! ## Architecture Rules
//!
//! 1. **Published geometry is immutable** - a publish swaps in a new geometry,
//!    it never writes into the one a snapshot is reading
//! 2. **Every view is accounted for** - snapshots and output buffers carry a
//!    lease so the host can see when they are released
//!
//! ## Example
//!
//! ```rust,ignore
//! use ripple_core::{Mesh, MeshProvider, UpdateFlags, primitives};
//!
//! let mut mesh = Mesh::new(primitives::plane(16, 10.0));
//! let snapshot = mesh.acquire_snapshot()?;
//! let mut output = mesh.allocate_writable(snapshot.vertex_count(), snapshot.index_count());
//! output.vertices_mut().copy_from_slice(snapshot.vertices());
//! output.copy_indices_from(snapshot.indices());
//! drop(snapshot);
//! mesh.apply_and_dispose(output, UpdateFlags::FAST_PATH)?;
//! mesh.recalculate_normals();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod mesh;
pub mod vertex;

pub use error::{MeshError, MeshResult};
pub use mesh::{
    primitives, recalculate_normals, Bounds, IndexBuffer, IndexFormat, Lease, LiveCounter, Mesh,
    MeshEvent, MeshGeometry, MeshProvider, MeshSnapshot, OutputBuffer, SubMeshDescriptor,
    Topology, UpdateFlags,
};
pub use vertex::{VertexAttribute, VertexRecord, VERTEX_STRIDE};
