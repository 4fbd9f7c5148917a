//! # RIPPLE Deform
//!
//! Per-frame procedural displacement of a mesh, computed in parallel and
//! published without ever writing the geometry the renderer is reading.
//!
//! ## Frame Timeline
//!
//! ```text
//! frame N   on_schedule_tick ──┐                       ┌── on_complete_tick
//!                              │ snapshot + allocate   │ join, publish,
//!                              │ spawn job             │ recompute normals
//!                              ▼                       │
//! workers            [ chunk 0 ][ chunk 1 ] ... [ chunk k ]
//!                    (overlaps the rest of the frame's work)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use ripple_core::{Mesh, primitives};
//! use ripple_deform::{DeformPipeline, DeformerConfig};
//!
//! let mut mesh = Mesh::new(primitives::plane(64, 10.0));
//! let mut pipeline = DeformPipeline::new(DeformerConfig::default())?;
//!
//! loop {
//!     pipeline.on_schedule_tick(&mesh, clock.elapsed_secs())?;
//!     // ... the rest of the frame ...
//!     pipeline.on_complete_tick(&mut mesh)?;
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod displacement;
pub mod error;
pub mod job;
pub mod pipeline;

pub use config::DeformerConfig;
pub use displacement::{displace, Displacement, RadialSine, WAVE_PHASE};
pub use error::{DeformError, DeformResult};
pub use job::{CompletedJob, DisplacementJob, JobHandle, JobParams, DEFAULT_CHUNK_SIZE};
pub use pipeline::{
    CompleteOutcome, DeformPipeline, PipelineState, PipelineStats, ScheduleOutcome,
};
