//! Synthetic labeled data.

use rand::prelude::*;
use sprs::CsMat;

use crate::data::{one_hot_labels, ColumnBuilder};

/// Raw dense point with `n_features` values (bias excluded).
///
/// Each entry is non-zero with probability 0.3 and then uniform in `[-2, 2)`,
/// matching the value range of [`random_sparse_features`].
pub fn random_raw_point(n_features: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_features)
        .map(|_| {
            if rng.gen_bool(0.3) {
                rng.r#gen::<f32>() * 4.0 - 2.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Random sparse feature matrix (`n_features x n_points`, CSC).
///
/// Each entry is present with probability `density`; present values are
/// uniform in `[-2, 2)`.
pub fn random_sparse_features(n_features: usize, n_points: usize, density: f64, seed: u64) -> CsMat<f32> {
    assert!((0.0..=1.0).contains(&density));
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = ColumnBuilder::new(n_features);
    let mut entries = Vec::new();

    for _ in 0..n_points {
        entries.clear();
        for row in 0..n_features {
            if rng.gen_bool(density) {
                entries.push((row, rng.r#gen::<f32>() * 4.0 - 2.0));
            }
        }
        builder.push_column(&mut entries);
    }
    builder.build()
}

/// Uniformly random class per point.
pub fn random_classes(n_points: usize, num_classes: usize, seed: u64) -> Vec<Option<usize>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_points)
        .map(|_| Some(rng.gen_range(0..num_classes)))
        .collect()
}

/// Random features with random one-hot labels.
///
/// Returns `(features, labels)`.
pub fn synthetic_dataset(
    n_features: usize,
    n_points: usize,
    num_classes: usize,
    seed: u64,
) -> (CsMat<f32>, CsMat<f32>) {
    let features = random_sparse_features(n_features, n_points, 0.3, seed);
    let labels = one_hot_labels(&random_classes(n_points, num_classes, seed.wrapping_add(1)), num_classes);
    (features, labels)
}
