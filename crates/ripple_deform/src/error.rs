//! # Deform Error Types

use ripple_core::MeshError;
use thiserror::Error;

/// Errors that can occur while scheduling or publishing displacement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeformError {
    /// The mesh could not be snapshotted or published.
    #[error("mesh error: {0}")]
    Mesh(#[from] MeshError),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// The mesh topology changed while a job was in flight. The job's output
    /// was discarded; the next schedule tick resynchronizes.
    #[error(
        "mesh topology changed mid-flight: job ran on {expected_vertices} vertices / {expected_indices} indices, mesh now has {actual_vertices} / {actual_indices}"
    )]
    TopologyChanged {
        /// Vertex count the job was scheduled against.
        expected_vertices: usize,
        /// Index count the job was scheduled against.
        expected_indices: usize,
        /// Vertex count of the live mesh at publish.
        actual_vertices: usize,
        /// Index count of the live mesh at publish.
        actual_indices: usize,
    },

    /// The in-flight job did not finish within the configured join timeout.
    /// The job is still in flight.
    #[error("displacement job did not complete within {waited_ms}ms")]
    JoinTimeout {
        /// How long the join waited.
        waited_ms: u64,
    },

    /// The worker dropped its result channel without sending.
    #[error("displacement job ended without producing output")]
    JobDisconnected,

    /// The dedicated worker pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

/// Result type for deform operations.
pub type DeformResult<T> = Result<T, DeformError>;
