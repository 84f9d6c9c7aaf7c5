//! Inference pipeline for Bonsai models.
//!
//! # Module Structure
//!
//! - [`normalize`]: mean/variance normalization with a pinned bias feature
//! - [`traversal`]: hyperplane routing from the root to a leaf
//! - [`scorer`]: gated per-class scoring along a path, [`ScoringMode`]
//! - [`predictor`]: [`BonsaiPredictor`] tying the stages together
//!
//! # Quick Start
//!
//! ```ignore
//! use bonsai::inference::BonsaiPredictor;
//!
//! let predictor = BonsaiPredictor::from_bytes(&model_blob, &mean_var_blob)?;
//!
//! let mut scratch = predictor.scratch();
//! let mut scores = vec![0.0; predictor.n_classes()];
//! predictor.score_sparse(&indices, &values, &mut scratch, &mut scores)?;
//! ```

pub mod normalize;
pub mod predictor;
pub mod scorer;
pub mod traversal;

pub use normalize::Normalizer;
pub use predictor::{BonsaiPredictor, ScoreError, Scratch};
pub use scorer::{project_into, score_class, score_path_into, ScoringMode};
pub use traversal::{left_child, right_child, route, route_into};
