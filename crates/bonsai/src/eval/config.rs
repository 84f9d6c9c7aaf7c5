//! Batch evaluation configuration with builder pattern.
//!
//! # Example
//!
//! ```
//! use bonsai::EvalConfig;
//!
//! // All defaults: auto thread count, 64 points per block
//! let config = EvalConfig::builder().build().unwrap();
//!
//! let config = EvalConfig::builder()
//!     .n_threads(4)
//!     .block_size(256)
//!     .build()
//!     .unwrap();
//! ```

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Default number of points scored per work unit.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Block size must be at least 1.
    InvalidBlockSize,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBlockSize => write!(f, "block_size must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// EvalConfig
// =============================================================================

/// Resource settings for [`evaluate`](super::evaluate).
///
/// These never change results: block size and thread count only decide how
/// work is split.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct EvalConfig {
    /// Number of threads. 0 = auto, 1 = sequential. Default: 0.
    #[builder(default)]
    pub n_threads: usize,

    /// Points per work unit. Default: 64.
    #[builder(default = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,
}

/// Custom finishing function that validates the config.
impl<S: eval_config_builder::IsComplete> EvalConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBlockSize`] if `block_size == 0`.
    pub fn build(self) -> Result<EvalConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl EvalConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        Ok(())
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            n_threads: 0,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
