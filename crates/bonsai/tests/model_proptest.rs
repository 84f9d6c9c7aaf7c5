//! Property-based tests for loading and scoring.
//!
//! Models are generated directly from proptest strategies so shrinking
//! produces small counterexamples.

use ndarray::{Array1, Array2, Array3};
use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use bonsai::inference::{route, score_path_into};
use bonsai::testing::{negated_weights, synthetic_dataset};
use bonsai::{evaluate, BonsaiModel, BonsaiPredictor, EvalConfig, HyperParams, Normalizer};

// =============================================================================
// Arbitrary Model Generators
// =============================================================================

fn arb_value() -> impl Strategy<Value = f32> {
    prop_oneof![
        1 => Just(0.0f32),
        4 => -4.0f32..4.0,
    ]
}

/// Valid hyperparameters with `num_classes` drawn from `classes`, including
/// single-score binary models.
fn arb_params(classes: std::ops::RangeInclusive<usize>) -> impl Strategy<Value = HyperParams> {
    (1usize..=10, 1usize..=5, 0usize..=4, classes, 0.1f32..4.0, any::<bool>()).prop_map(
        |(d, p, depth, k, sigma, single)| {
            let params = HyperParams::new(d, p, depth, k, sigma);
            if k == 2 && single {
                params.with_internal_classes(1)
            } else {
                params
            }
        },
    )
}

fn arb_model() -> impl Strategy<Value = BonsaiModel> {
    arb_model_from(arb_params(2..=5))
}

fn arb_model_from(params: impl Strategy<Value = HyperParams>) -> impl Strategy<Value = BonsaiModel> {
    params.prop_flat_map(|params| {
        let (k, i, p, d) = (
            params.internal_classes,
            params.internal_nodes,
            params.projection_dim,
            params.data_dim,
        );
        (
            prop_vec(arb_value(), p * d),
            prop_vec(arb_value(), k * i * p),
            prop_vec(arb_value(), k * i * p),
            prop_vec(arb_value(), i * p),
        )
            .prop_map(move |(z, w, v, theta)| {
                BonsaiModel::new(
                    params,
                    Array2::from_shape_vec((p, d), z).unwrap(),
                    Array3::from_shape_vec((k, i, p), w).unwrap(),
                    Array3::from_shape_vec((k, i, p), v).unwrap(),
                    Array2::from_shape_vec((i, p), theta).unwrap(),
                )
                .unwrap()
            })
    })
}

/// A predictor plus one raw point of matching dimensionality.
fn arb_predictor_and_point() -> impl Strategy<Value = (BonsaiPredictor, Vec<f32>)> {
    arb_model().prop_flat_map(|model| {
        let d = model.params().data_dim;
        (
            prop_vec(-1.0f32..1.0, d),
            prop_vec(0.25f32..4.0, d),
            prop_vec(arb_value(), d - 1),
        )
            .prop_map(move |(mean, variance, raw)| {
                let normalizer = Normalizer::new(Array1::from(mean), Array1::from(variance)).unwrap();
                (BonsaiPredictor::new(model.clone(), normalizer).unwrap(), raw)
            })
    })
}

fn bits(values: impl IntoIterator<Item = f32>) -> Vec<u32> {
    values.into_iter().map(f32::to_bits).collect()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Blob round-trip gives bit-identical parameters.
    #[test]
    fn blob_roundtrip_is_bit_identical(model in arb_model()) {
        let loaded = BonsaiModel::from_bytes(&model.to_bytes()).unwrap();

        prop_assert_eq!(loaded.params(), model.params());
        prop_assert_eq!(bits(loaded.projection().iter().copied()), bits(model.projection().iter().copied()));
        prop_assert_eq!(bits(loaded.weights().iter().copied()), bits(model.weights().iter().copied()));
        prop_assert_eq!(bits(loaded.gates().iter().copied()), bits(model.gates().iter().copied()));
        prop_assert_eq!(bits(loaded.hyperplanes().iter().copied()), bits(model.hyperplanes().iter().copied()));
        prop_assert_eq!(loaded.total_non_zeros(), model.total_non_zeros());
    }

    /// Dense and sparse input for the same logical point score identically.
    #[test]
    fn dense_and_sparse_agree((predictor, raw) in arb_predictor_and_point()) {
        let (indices, values): (Vec<usize>, Vec<f32>) = raw
            .iter()
            .enumerate()
            .filter(|(_, v)| v.to_bits() != 0)
            .map(|(i, &v)| (i, v))
            .unzip();

        let dense = predictor.predict_dense(&raw).unwrap();
        let sparse = predictor.predict_sparse(&indices, &values).unwrap();
        prop_assert_eq!(bits(dense.iter().copied()), bits(sparse.iter().copied()));
        prop_assert_eq!(dense.len(), predictor.n_classes());
    }

    /// Every path runs from the root to a leaf through parent-child links.
    #[test]
    fn path_shape((model, x) in arb_model().prop_flat_map(|m| {
        let p = m.params().projection_dim;
        (Just(m), prop_vec(-5.0f32..5.0, p))
    })) {
        let params = *model.params();
        let path = route(&model, Array1::from(x).view());

        prop_assert_eq!(path.len(), params.tree_depth + 1);
        prop_assert_eq!(path[0], 0);
        prop_assert!(*path.last().unwrap() as usize >= params.internal_nodes);
        for pair in path.windows(2) {
            let parent = pair[0] as usize;
            prop_assert!(parent < params.internal_nodes);
            prop_assert!(pair[1] as usize == 2 * parent + 1 || pair[1] as usize == 2 * parent + 2);
        }
    }

    /// With at most two internal classes, negating W negates every score.
    #[test]
    fn binary_polarity((model, x) in arb_model_from(arb_params(2..=2))
        .prop_flat_map(|m| {
            let p = m.params().projection_dim;
            (Just(m), prop_vec(-5.0f32..5.0, p))
        }))
    {
        let x = Array1::from(x);
        let negated = negated_weights(&model);
        let path = route(&model, x.view());
        prop_assert_eq!(&route(&negated, x.view()), &path);

        let k = model.params().internal_classes;
        let mut a = vec![0.0; k];
        let mut b = vec![0.0; k];
        score_path_into(&model, x.view(), &path, &mut a);
        score_path_into(&negated, x.view(), &path, &mut b);
        for (sa, sb) in a.iter().zip(&b) {
            prop_assert_eq!(*sa, -*sb);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Accuracy stays in [0, 1] and does not depend on the thread count.
    #[test]
    fn accuracy_bounds((predictor, _) in arb_predictor_and_point(), seed in any::<u64>()) {
        let params = *predictor.params();
        let (features, labels) = synthetic_dataset(params.data_dim - 1, 40, params.num_classes, seed);

        let sequential = EvalConfig::builder().n_threads(1).build().unwrap();
        let parallel = EvalConfig::builder().n_threads(2).block_size(3).build().unwrap();
        let a = evaluate(&predictor, &features, &labels, &sequential).unwrap();
        let b = evaluate(&predictor, &features, &labels, &parallel).unwrap();

        prop_assert!((0.0..=1.0).contains(&a.accuracy));
        prop_assert_eq!(a.n_evaluated, 40);
        prop_assert_eq!(a, b);
    }
}
