//! # Mesh Storage and Views
//!
//! ```text
//!          acquire_snapshot()                 apply_and_dispose()
//!   Mesh ───────────────────▶ MeshSnapshot          ▲
//!    │                        (Arc<MeshGeometry>)   │
//!    │  allocate_writable()                         │
//!    └──────────────────────▶ OutputBuffer ─────────┘
//!                              (exclusive)
//! ```
//!
//! The live geometry sits behind an `Arc`. A snapshot clones the `Arc`, a
//! publish replaces it, so an in-flight snapshot keeps reading the geometry
//! it was taken from no matter what the host does to the mesh.

mod buffer;
mod flags;
mod geometry;
mod lease;
mod normals;
pub mod primitives;
mod provider;
mod snapshot;

pub use buffer::OutputBuffer;
pub use flags::UpdateFlags;
pub use geometry::{Bounds, IndexBuffer, IndexFormat, MeshGeometry, SubMeshDescriptor, Topology};
pub use lease::{Lease, LiveCounter};
pub use normals::recalculate_normals;
pub use provider::{Mesh, MeshEvent, MeshProvider};
pub use snapshot::MeshSnapshot;
