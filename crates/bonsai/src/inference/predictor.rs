//! Single-point scoring.
//!
//! [`BonsaiPredictor`] ties a model to its normalization state and runs the
//! full pipeline for one point:
//!
//! ```text
//! raw ─▶ normalize ─▶ project ─▶ route ─▶ score classes ─▶ scores[K]
//! ```
//!
//! The predictor is immutable. All per-point buffers live in a [`Scratch`]
//! owned by the caller, so one predictor can serve many threads, each with
//! its own scratch.

use ndarray::{Array1, ArrayView1};
use thiserror::Error;

use super::normalize::Normalizer;
use super::scorer::{project_into, score_path_into};
use super::traversal::route_into;
use crate::io::ReadError;
use crate::repr::{BonsaiModel, HyperParams, NodeId};

/// Malformed single-point input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    /// Dense input has the wrong number of features.
    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Sparse input references a feature past the model's dimensionality.
    #[error("feature index {index} out of range for {n_features} features")]
    FeatureOutOfRange { index: usize, n_features: usize },

    /// Sparse indices and values differ in length.
    #[error("sparse input has {n_indices} indices but {n_values} values")]
    SparseLengthMismatch { n_indices: usize, n_values: usize },
}

/// Reusable per-point buffers.
///
/// Create one per thread with [`BonsaiPredictor::scratch`] and pass it to
/// every scoring call; nothing is allocated per point.
#[derive(Debug, Clone)]
pub struct Scratch {
    point: Array1<f32>,
    projected: Array1<f32>,
    path: Vec<NodeId>,
}

impl Scratch {
    /// Buffers sized for the given model shape.
    pub fn new(params: &HyperParams) -> Self {
        Self {
            point: Array1::zeros(params.data_dim),
            projected: Array1::zeros(params.projection_dim),
            path: Vec::with_capacity(params.path_len()),
        }
    }

    /// Normalized point from the last scoring call.
    pub fn point(&self) -> ArrayView1<'_, f32> {
        self.point.view()
    }

    /// Projected point from the last scoring call.
    pub fn projected(&self) -> ArrayView1<'_, f32> {
        self.projected.view()
    }

    /// Visited nodes from the last scoring call.
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }
}

/// Scores points against a Bonsai model.
#[derive(Debug, Clone)]
pub struct BonsaiPredictor {
    model: BonsaiModel,
    normalizer: Normalizer,
}

impl BonsaiPredictor {
    /// Pair a model with its normalization state.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidModel`] if the normalizer's dimensionality
    /// differs from the model's.
    pub fn new(model: BonsaiModel, normalizer: Normalizer) -> Result<Self, ReadError> {
        if normalizer.data_dim() != model.params().data_dim {
            return Err(ReadError::InvalidModel(format!(
                "normalizer has {} features but the model expects {}",
                normalizer.data_dim(),
                model.params().data_dim
            )));
        }
        Ok(Self { model, normalizer })
    }

    /// Load both blobs and build a predictor.
    pub fn from_bytes(model_bytes: &[u8], mean_var_bytes: &[u8]) -> Result<Self, ReadError> {
        let model = BonsaiModel::from_bytes(model_bytes)?;
        let normalizer = Normalizer::from_bytes(mean_var_bytes, model.params().data_dim)?;
        Self::new(model, normalizer)
    }

    #[inline]
    pub fn model(&self) -> &BonsaiModel {
        &self.model
    }

    #[inline]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    #[inline]
    pub fn params(&self) -> &HyperParams {
        self.model.params()
    }

    /// Number of scores produced per point (`K`).
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.model.params().num_classes
    }

    /// Non-zero parameter count of the underlying model.
    #[inline]
    pub fn total_non_zeros(&self) -> usize {
        self.model.total_non_zeros()
    }

    /// Fresh scratch buffers for this predictor.
    pub fn scratch(&self) -> Scratch {
        Scratch::new(self.model.params())
    }

    /// Score an already-normalized point (length `D`, bias included).
    ///
    /// Writes `K` scores; entries past `K_i` are zero.
    ///
    /// # Panics
    ///
    /// Panics if `point.len() != D` or `scores.len() != K`.
    pub fn prediction_score(
        &self,
        point: ArrayView1<'_, f32>,
        scratch: &mut Scratch,
        scores: &mut [f32],
    ) {
        self.score_point(point, &mut scratch.projected, &mut scratch.path, scores);
    }

    /// Normalize and score a dense raw point of `D - 1` features.
    ///
    /// # Panics
    ///
    /// Panics if `scores.len() != K`.
    pub fn score_dense(
        &self,
        raw: &[f32],
        scratch: &mut Scratch,
        scores: &mut [f32],
    ) -> Result<(), ScoreError> {
        self.normalizer.normalize_dense_into(raw, &mut scratch.point)?;
        self.score_scratch_point(scratch, scores);
        Ok(())
    }

    /// Normalize and score a sparse raw point.
    ///
    /// The point is materialized densely first, so the result is identical to
    /// [`score_dense`](Self::score_dense) on the same logical values.
    ///
    /// # Panics
    ///
    /// Panics if `scores.len() != K`.
    pub fn score_sparse(
        &self,
        indices: &[usize],
        values: &[f32],
        scratch: &mut Scratch,
        scores: &mut [f32],
    ) -> Result<(), ScoreError> {
        self.normalizer
            .normalize_sparse_into(indices, values, &mut scratch.point)?;
        self.score_scratch_point(scratch, scores);
        Ok(())
    }

    /// Allocating variant of [`score_dense`](Self::score_dense).
    pub fn predict_dense(&self, raw: &[f32]) -> Result<Vec<f32>, ScoreError> {
        let mut scratch = self.scratch();
        let mut scores = vec![0.0; self.n_classes()];
        self.score_dense(raw, &mut scratch, &mut scores)?;
        Ok(scores)
    }

    /// Allocating variant of [`score_sparse`](Self::score_sparse).
    pub fn predict_sparse(&self, indices: &[usize], values: &[f32]) -> Result<Vec<f32>, ScoreError> {
        let mut scratch = self.scratch();
        let mut scores = vec![0.0; self.n_classes()];
        self.score_sparse(indices, values, &mut scratch, &mut scores)?;
        Ok(scores)
    }

    fn score_scratch_point(&self, scratch: &mut Scratch, scores: &mut [f32]) {
        let Scratch {
            point,
            projected,
            path,
        } = scratch;
        self.score_point(point.view(), projected, path, scores);
    }

    fn score_point(
        &self,
        point: ArrayView1<'_, f32>,
        projected: &mut Array1<f32>,
        path: &mut Vec<NodeId>,
        scores: &mut [f32],
    ) {
        assert_eq!(scores.len(), self.n_classes(), "scores length must equal num_classes");

        scores.fill(0.0);
        project_into(&self.model, point, projected);
        route_into(&self.model, projected.view(), path);
        score_path_into(&self.model, projected.view(), path, scores);
    }
}
