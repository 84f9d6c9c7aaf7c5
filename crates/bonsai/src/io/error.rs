//! Errors raised while loading model and normalization blobs.

use thiserror::Error;

/// Which blob a size check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blob {
    /// Model header plus parameter tensors.
    Model,
    /// Mean and variance vectors.
    MeanVar,
}

impl std::fmt::Display for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::MeanVar => write!(f, "mean/variance"),
        }
    }
}

/// Errors that can occur while loading a model or its normalization state.
///
/// All of these are fatal: nothing is partially loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// Buffer does not start with the model magic.
    #[error("not a bonsai model blob")]
    NotAModel,

    /// Blob was written by a newer format version.
    #[error("unsupported model format version {0}")]
    UnsupportedVersion(u8),

    /// Buffer length disagrees with the size implied by the declared dimensions.
    #[error("{blob} blob size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        blob: Blob,
        expected: usize,
        actual: usize,
    },

    /// Hyperparameters or normalization values are unusable.
    #[error("invalid model: {0}")]
    InvalidModel(String),
}
