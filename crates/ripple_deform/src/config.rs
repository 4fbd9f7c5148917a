//! # Deformer Configuration
//!
//! Loaded once at startup, from code or a TOML file:
//!
//! ```toml
//! speed = 2.0
//! amplitude = 0.25
//! chunk_size = 64
//! worker_threads = 4      # omit to share the global rayon pool
//! join_timeout_ms = 250   # omit to wait for the job indefinitely
//! ```

use std::sync::Arc;
use std::time::Duration;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{DeformError, DeformResult};
use crate::job::DEFAULT_CHUNK_SIZE;

/// Tunables for a [`DeformPipeline`](crate::DeformPipeline).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeformerConfig {
    /// Multiplier on time.
    pub speed: f64,
    /// Multiplier on the displacement.
    pub amplitude: f64,
    /// Vertices per parallel work item.
    pub chunk_size: usize,
    /// Size of a dedicated worker pool. `None` uses the global rayon pool.
    pub worker_threads: Option<usize>,
    /// Upper bound on the frame-end join. `None` waits indefinitely.
    pub join_timeout_ms: Option<u64>,
}

impl Default for DeformerConfig {
    fn default() -> Self {
        Self {
            speed: 2.0,
            amplitude: 0.25,
            chunk_size: DEFAULT_CHUNK_SIZE,
            worker_threads: None,
            join_timeout_ms: None,
        }
    }
}

impl DeformerConfig {
    /// Default config with the given speed and amplitude.
    #[must_use]
    pub fn new(speed: f64, amplitude: f64) -> Self {
        Self {
            speed,
            amplitude,
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// [`DeformError::ConfigParse`] on malformed TOML or unknown keys,
    /// [`DeformError::InvalidConfig`] on out-of-range values.
    pub fn from_toml_str(source: &str) -> DeformResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| DeformError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value.
    ///
    /// # Errors
    ///
    /// [`DeformError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> DeformResult<()> {
        validate_scalar("speed", self.speed)?;
        validate_scalar("amplitude", self.amplitude)?;
        if self.chunk_size == 0 {
            return Err(DeformError::InvalidConfig(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(DeformError::InvalidConfig(
                "worker_threads must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }

    /// The join timeout as a duration.
    #[inline]
    #[must_use]
    pub fn join_timeout(&self) -> Option<Duration> {
        self.join_timeout_ms.map(Duration::from_millis)
    }

    /// Builds the dedicated worker pool, if one is configured.
    ///
    /// # Errors
    ///
    /// [`DeformError::ThreadPool`] if the pool cannot be created.
    pub fn build_thread_pool(&self) -> DeformResult<Option<Arc<ThreadPool>>> {
        let Some(threads) = self.worker_threads else {
            return Ok(None);
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("ripple-deform-{i}"))
            .build()
            .map_err(|e| DeformError::ThreadPool(e.to_string()))?;
        Ok(Some(Arc::new(pool)))
    }
}

pub(crate) fn validate_scalar(name: &str, value: f64) -> DeformResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DeformError::InvalidConfig(format!(
            "{name} must be finite, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeformerConfig::default();
        assert_eq!(config.speed, 2.0);
        assert_eq!(config.amplitude, 0.25);
        assert_eq!(config.chunk_size, 64);
        assert!(config.join_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = DeformerConfig::from_toml_str(
            r"
            speed = 1.5
            amplitude = 0.5
            worker_threads = 3
            join_timeout_ms = 250
            ",
        )
        .expect("valid config");

        assert_eq!(config.speed, 1.5);
        assert_eq!(config.amplitude, 0.5);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.worker_threads, Some(3));
        assert_eq!(config.join_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(
            DeformerConfig::from_toml_str("").expect("empty is valid"),
            DeformerConfig::default()
        );
    }

    #[test]
    fn test_rejects_unknown_key() {
        let err = DeformerConfig::from_toml_str("sped = 2.0").unwrap_err();
        assert!(matches!(err, DeformError::ConfigParse(_)));
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = DeformerConfig::from_toml_str("chunk_size = 0").unwrap_err();
        assert!(matches!(err, DeformError::InvalidConfig(_)));

        let err = DeformerConfig::from_toml_str("worker_threads = 0").unwrap_err();
        assert!(matches!(err, DeformError::InvalidConfig(_)));

        let config = DeformerConfig::new(f64::NAN, 0.25);
        assert!(matches!(config.validate(), Err(DeformError::InvalidConfig(_))));

        let config = DeformerConfig::new(2.0, f64::INFINITY);
        assert!(matches!(config.validate(), Err(DeformError::InvalidConfig(_))));
    }

    #[test]
    fn test_thread_pool() {
        assert!(DeformerConfig::default()
            .build_thread_pool()
            .expect("no pool")
            .is_none());

        let config = DeformerConfig {
            worker_threads: Some(2),
            ..DeformerConfig::default()
        };
        let pool = config.build_thread_pool().expect("pool").expect("configured");
        assert_eq!(pool.current_num_threads(), 2);
    }
}
