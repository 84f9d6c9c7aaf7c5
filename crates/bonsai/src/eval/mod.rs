//! Labeled batch evaluation.
//!
//! [`evaluate`] scores every column of a sparse feature matrix, takes the
//! argmax class, and compares it with the one-hot label column.
//!
//! Points are split into blocks of [`EvalConfig::block_size`] columns. Blocks
//! may run in parallel; each worker keeps its own [`Scratch`], and per-block
//! counts are reduced in block order, so the result does not depend on the
//! thread count.

mod config;

use std::borrow::Cow;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use sprs::CsMat;
use thiserror::Error;

use crate::inference::{BonsaiPredictor, ScoreError, Scratch};
use crate::utils::run_with_threads;

pub use config::{ConfigError, EvalConfig, DEFAULT_BLOCK_SIZE};

// =============================================================================
// Errors
// =============================================================================

/// A label column that is not a valid one-hot vector.
///
/// Isolated to its point: the point is still scored but does not count toward
/// accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LabelError {
    #[error("point {point} has no single label equal to 1.0")]
    InvalidLabel { point: usize },
}

/// Whole-batch evaluation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Feature or label matrix has the wrong shape.
    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error(transparent)]
    Score(#[from] ScoreError),
}

// =============================================================================
// Results
// =============================================================================

/// Predicted class of one point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPrediction {
    /// Argmax class, shifted to 1-based if the model says so.
    pub label: usize,
    /// Winning score.
    pub score: f32,
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// One entry per point, in column order.
    pub predictions: Vec<PointPrediction>,
    /// Validly labeled points predicted correctly.
    pub n_correct: usize,
    /// Validly labeled points.
    pub n_evaluated: usize,
    /// `n_correct / n_evaluated`, or 0.0 if nothing was evaluated.
    pub accuracy: f64,
    /// Points excluded from accuracy, in column order.
    pub label_errors: Vec<LabelError>,
    /// Model sparsity.
    pub total_non_zeros: usize,
}

impl Evaluation {
    pub fn n_points(&self) -> usize {
        self.predictions.len()
    }

    /// Flat summary for logs and JSON output.
    pub fn summary(&self, predictor: &BonsaiPredictor) -> EvalSummary {
        let params = predictor.params();
        EvalSummary {
            n_points: self.n_points(),
            n_evaluated: self.n_evaluated,
            n_correct: self.n_correct,
            n_invalid_labels: self.label_errors.len(),
            accuracy: self.accuracy,
            total_non_zeros: self.total_non_zeros,
            tree_depth: params.tree_depth,
            projection_dim: params.projection_dim,
            data_dim: params.data_dim,
            num_classes: params.num_classes,
            sigma: params.sigma,
        }
    }
}

/// Serializable run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSummary {
    pub n_points: usize,
    pub n_evaluated: usize,
    pub n_correct: usize,
    pub n_invalid_labels: usize,
    pub accuracy: f64,
    pub total_non_zeros: usize,
    pub tree_depth: usize,
    pub projection_dim: usize,
    pub data_dim: usize,
    pub num_classes: usize,
    pub sigma: f32,
}

// =============================================================================
// Evaluation
// =============================================================================

/// Score a labeled dataset and report accuracy.
///
/// `features` has one column per point and either `D - 1` rows (raw features)
/// or `D` rows (the bias row is ignored). `labels` is `K x n_points` one-hot.
/// Either matrix may be CSR or CSC.
///
/// # Errors
///
/// Returns [`EvalError::Shape`] if row or column counts don't fit the model
/// or each other.
pub fn evaluate(
    predictor: &BonsaiPredictor,
    features: &CsMat<f32>,
    labels: &CsMat<f32>,
    config: &EvalConfig,
) -> Result<Evaluation, EvalError> {
    check_shapes(predictor, features, labels)?;

    let features = to_csc(features);
    let labels = to_csc(labels);
    let n_points = features.cols();
    let block_size = config.block_size.max(1);
    let n_blocks = n_points.div_ceil(block_size);

    tracing::debug!(n_points, n_blocks, block_size, n_threads = config.n_threads, "evaluating");

    let n_classes = predictor.n_classes();
    let one_indexed = predictor.params().one_indexed;
    let blocks = run_with_threads(config.n_threads, |parallelism| {
        parallelism.maybe_par_map_init(
            0..n_blocks,
            || (predictor.scratch(), vec![0.0f32; n_classes]),
            |(scratch, scores), block| {
                let start = block * block_size;
                let end = (start + block_size).min(n_points);
                score_block(
                    predictor,
                    &features,
                    &labels,
                    start..end,
                    one_indexed,
                    scratch,
                    scores,
                )
            },
        )
    });

    let mut evaluation = Evaluation {
        predictions: Vec::with_capacity(n_points),
        n_correct: 0,
        n_evaluated: 0,
        accuracy: 0.0,
        label_errors: Vec::new(),
        total_non_zeros: predictor.total_non_zeros(),
    };
    for block in blocks {
        let block = block?;
        evaluation.predictions.extend(block.predictions);
        evaluation.n_correct += block.n_correct;
        evaluation.n_evaluated += block.n_evaluated;
        evaluation.label_errors.extend(block.label_errors);
    }
    if evaluation.n_evaluated > 0 {
        evaluation.accuracy = evaluation.n_correct as f64 / evaluation.n_evaluated as f64;
    }

    for err in &evaluation.label_errors {
        tracing::warn!(%err, "excluded from accuracy");
    }
    tracing::info!(
        accuracy = evaluation.accuracy,
        n_points,
        n_evaluated = evaluation.n_evaluated,
        n_correct = evaluation.n_correct,
        total_non_zeros = evaluation.total_non_zeros,
        "evaluation finished"
    );

    Ok(evaluation)
}

/// Index of the largest score; on ties the later index wins.
///
/// # Panics
///
/// Panics if `scores` is empty.
pub fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    let mut max = scores[0];
    for (class, &score) in scores.iter().enumerate() {
        if score >= max {
            max = score;
            best = class;
        }
    }
    best
}

/// Class of a one-hot label column, or `None` unless exactly one stored value
/// is non-zero and it equals 1.0.
pub fn one_hot_class(indices: &[usize], values: &[f32]) -> Option<usize> {
    let mut class = None;
    for (&row, &value) in indices.iter().zip(values) {
        if value == 0.0 {
            continue;
        }
        if value != 1.0 || class.is_some() {
            return None;
        }
        class = Some(row);
    }
    class
}

// =============================================================================
// Internals
// =============================================================================

#[derive(Debug, Default)]
struct BlockResult {
    predictions: Vec<PointPrediction>,
    n_correct: usize,
    n_evaluated: usize,
    label_errors: Vec<LabelError>,
}

fn check_shapes(
    predictor: &BonsaiPredictor,
    features: &CsMat<f32>,
    labels: &CsMat<f32>,
) -> Result<(), EvalError> {
    let params = predictor.params();
    let raw_dim = params.data_dim - 1;

    if features.rows() != raw_dim && features.rows() != params.data_dim {
        return Err(EvalError::Shape(format!(
            "features have {} rows, expected {} or {}",
            features.rows(),
            raw_dim,
            params.data_dim
        )));
    }
    if labels.rows() != params.num_classes {
        return Err(EvalError::Shape(format!(
            "labels have {} rows, expected {}",
            labels.rows(),
            params.num_classes
        )));
    }
    if features.cols() != labels.cols() {
        return Err(EvalError::Shape(format!(
            "{} feature columns but {} label columns",
            features.cols(),
            labels.cols()
        )));
    }
    Ok(())
}

fn to_csc(matrix: &CsMat<f32>) -> Cow<'_, CsMat<f32>> {
    if matrix.is_csc() {
        Cow::Borrowed(matrix)
    } else {
        Cow::Owned(matrix.to_csc())
    }
}

fn score_block(
    predictor: &BonsaiPredictor,
    features: &CsMat<f32>,
    labels: &CsMat<f32>,
    points: Range<usize>,
    one_indexed: bool,
    scratch: &mut Scratch,
    scores: &mut [f32],
) -> Result<BlockResult, ScoreError> {
    let mut result = BlockResult {
        predictions: Vec::with_capacity(points.len()),
        ..Default::default()
    };

    for point in points {
        let column = features.outer_view(point);
        let (indices, values) = match &column {
            Some(col) => (col.indices(), col.data()),
            None => (&[][..], &[][..]),
        };
        predictor.score_sparse(indices, values, scratch, scores)?;

        let predicted = argmax(scores);
        result.predictions.push(PointPrediction {
            label: if one_indexed { predicted + 1 } else { predicted },
            score: scores[predicted],
        });

        let label = labels.outer_view(point);
        let truth = label
            .as_ref()
            .and_then(|col| one_hot_class(col.indices(), col.data()));
        match truth {
            Some(class) => {
                result.n_evaluated += 1;
                if class == predicted {
                    result.n_correct += 1;
                }
            }
            None => result.label_errors.push(LabelError::InvalidLabel { point }),
        }
    }

    Ok(result)
}
