//! bonsai: inference for Bonsai shallow-tree classifiers.
//!
//! Bonsai models are tiny, single-tree classifiers designed for devices with a
//! few kilobytes of memory. A point is projected into a low-dimensional space,
//! routed down a complete binary tree by learned hyperplanes, and scored by
//! summing tanh-gated linear votes from every internal node on its path.
//!
//! # Key Types
//!
//! - [`BonsaiModel`] / [`HyperParams`] - Learned parameters and their shapes
//! - [`Normalizer`] - Per-feature mean/variance normalization
//! - [`BonsaiPredictor`] / [`Scratch`] - Single-point scoring
//! - [`evaluate`] / [`EvalConfig`] - Labeled batch evaluation
//!
//! # Loading a Model
//!
//! ```ignore
//! use bonsai::{BonsaiModel, BonsaiPredictor, Normalizer};
//!
//! let model = BonsaiModel::from_bytes(&std::fs::read("model.bin")?)?;
//! let normalizer = Normalizer::from_bytes(&std::fs::read("meanvar.bin")?, model.params().data_dim)?;
//! let predictor = BonsaiPredictor::new(model, normalizer)?;
//!
//! let scores = predictor.predict_dense(&features)?;
//! ```

// Re-export approx traits for users who want to compare scores
pub use approx;

pub mod data;
pub mod eval;
pub mod inference;
pub mod io;
pub mod repr;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use repr::{BonsaiModel, HyperParams, NodeId};

pub use io::ReadError;

pub use inference::{BonsaiPredictor, Normalizer, ScoreError, ScoringMode, Scratch};

pub use eval::{
    evaluate, ConfigError, EvalConfig, EvalError, EvalSummary, Evaluation, LabelError,
    PointPrediction,
};

pub use utils::{run_with_threads, Parallelism};
