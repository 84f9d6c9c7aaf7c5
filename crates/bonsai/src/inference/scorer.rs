//! Gated path scoring.
//!
//! Each internal node `n` on a point's path votes for class `c` with
//!
//! ```text
//! (W[c][n] · x) * tanh(sigma * (V[c][n] · x))
//! ```
//!
//! and the class score is the sum of those votes. Leaves carry no parameters.

use ndarray::linalg::general_mat_vec_mul;
use ndarray::{Array1, ArrayView1};

use crate::repr::{BonsaiModel, NodeId};

/// Sign convention applied to the accumulated class scores.
///
/// Binary models encode the class in the score's polarity and are negated;
/// multiclass models use scores as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    /// At most two internal classes; scores are negated.
    Binary,
    /// One accumulator per class; scores are kept.
    Multiclass,
}

impl ScoringMode {
    /// Pick the mode for a model with `internal_classes` accumulators.
    #[inline]
    pub fn for_internal_classes(internal_classes: usize) -> Self {
        if internal_classes <= 2 {
            Self::Binary
        } else {
            Self::Multiclass
        }
    }

    /// Factor every class score is multiplied by.
    #[inline]
    pub fn polarity(self) -> f32 {
        match self {
            Self::Binary => -1.0,
            Self::Multiclass => 1.0,
        }
    }
}

/// Project a normalized point: `projected = (1 / P) * Z · point`.
///
/// # Panics
///
/// Panics if `point.len() != D` or `projected.len() != P`.
pub fn project_into(model: &BonsaiModel, point: ArrayView1<'_, f32>, projected: &mut Array1<f32>) {
    let scale = 1.0 / model.params().projection_dim as f32;
    projected.fill(0.0);
    general_mat_vec_mul(scale, &model.projection(), &point, 0.0, projected);
}

/// Accumulated gated score of `class` along `path`, before polarity.
///
/// Nodes at or beyond the internal-node count are skipped.
pub fn score_class(
    model: &BonsaiModel,
    projected: ArrayView1<'_, f32>,
    path: &[NodeId],
    class: usize,
) -> f32 {
    let params = model.params();
    let sigma = params.sigma;

    path.iter()
        .map(|&node| node as usize)
        .filter(|&node| node < params.internal_nodes)
        .map(|node| {
            let wz = model.weight(class, node).dot(&projected);
            let vz = model.gate(class, node).dot(&projected);
            wz * (sigma * vz).tanh()
        })
        .sum()
}

/// Write the signed score of every internal class into `scores[..K_i]`.
///
/// # Panics
///
/// Panics if `scores` is shorter than `K_i`.
pub fn score_path_into(
    model: &BonsaiModel,
    projected: ArrayView1<'_, f32>,
    path: &[NodeId],
    scores: &mut [f32],
) {
    let polarity = model.scoring_mode().polarity();
    let internal_classes = model.params().internal_classes;

    for (class, score) in scores[..internal_classes].iter_mut().enumerate() {
        *score = polarity * score_class(model, projected, path, class);
    }
}
