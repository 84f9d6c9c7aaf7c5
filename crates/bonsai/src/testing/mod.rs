//! Synthetic models and data for tests and benchmarks.
//!
//! Everything here is deterministic for a given seed.

pub mod data;

use ndarray::{Array1, Array2, Array3};
use rand::prelude::*;

use crate::inference::Normalizer;
use crate::repr::{BonsaiModel, HyperParams};

pub use data::{random_classes, random_raw_point, random_sparse_features, synthetic_dataset};

/// Fraction of parameters left at exactly zero in [`random_model`].
const ZERO_FRACTION: f32 = 0.25;

/// Random model with the given shape.
///
/// Entries are uniform in `[-1, 1)`, with roughly a quarter of them zeroed so
/// sparsity counts are non-trivial.
///
/// # Panics
///
/// Panics if `params` is invalid.
pub fn random_model(params: HyperParams, seed: u64) -> BonsaiModel {
    let mut rng = StdRng::seed_from_u64(seed);
    let (k, i, p, d) = (
        params.internal_classes,
        params.internal_nodes,
        params.projection_dim,
        params.data_dim,
    );

    let mut sample = || {
        if rng.r#gen::<f32>() < ZERO_FRACTION {
            0.0
        } else {
            rng.r#gen::<f32>() * 2.0 - 1.0
        }
    };

    let z = Array2::from_shape_simple_fn((p, d), &mut sample);
    let w = Array3::from_shape_simple_fn((k, i, p), &mut sample);
    let v = Array3::from_shape_simple_fn((k, i, p), &mut sample);
    let theta = Array2::from_shape_simple_fn((i, p), &mut sample);

    BonsaiModel::new(params, z, w, v, theta).expect("random model must be valid")
}

/// Random normalizer for `data_dim` features (bias included).
///
/// Means are uniform in `[-0.5, 0.5)`, variances in `[0.5, 2.0)`.
pub fn random_normalizer(data_dim: usize, seed: u64) -> Normalizer {
    let mut rng = StdRng::seed_from_u64(seed ^ 0x9e37_79b9);
    let mean = Array1::from_shape_simple_fn(data_dim, || rng.r#gen::<f32>() - 0.5);
    let variance = Array1::from_shape_simple_fn(data_dim, || 0.5 + rng.r#gen::<f32>() * 1.5);
    Normalizer::new(mean, variance).expect("random normalizer must be valid")
}

/// Copy of `model` with every `W` entry negated.
///
/// With at most two internal classes this flips the sign of every score.
pub fn negated_weights(model: &BonsaiModel) -> BonsaiModel {
    BonsaiModel::new(
        *model.params(),
        model.projection().to_owned(),
        model.weights().mapv(|x| -x),
        model.gates().clone(),
        model.hyperplanes().to_owned(),
    )
    .expect("negating weights keeps shapes")
}
