//! Model and mean/variance blob parsing.

use bonsai::io::{Blob, HEADER_SIZE, MAGIC};
use bonsai::testing::{random_model, random_normalizer};
use bonsai::{BonsaiModel, BonsaiPredictor, HyperParams, Normalizer, ReadError};
use rstest::rstest;

fn sample_blob() -> (BonsaiModel, Vec<u8>) {
    let params = HyperParams::new(9, 4, 2, 3, 0.8);
    let model = random_model(params, 21);
    let bytes = model.to_bytes();
    (model, bytes)
}

/// Expected length: header plus Z, W, V and Theta.
fn expected_len(d: usize, p: usize, i: usize, k: usize) -> usize {
    40 + 4 * (p * d + 2 * k * i * p + i * p)
}

#[test]
fn blob_length_matches_layout() {
    let (_, bytes) = sample_blob();
    assert_eq!(bytes.len(), expected_len(9, 4, 3, 3));
    assert_eq!(&bytes[..4], MAGIC);
}

#[test]
fn roundtrip_preserves_model() {
    let (model, bytes) = sample_blob();
    let loaded = BonsaiModel::from_bytes(&bytes).unwrap();
    assert_eq!(loaded, model);
    assert_eq!(loaded.total_non_zeros(), model.total_non_zeros());
}

#[test]
fn tensors_follow_documented_order() {
    // D = 2, P = 1, depth 1, binary with 2 internal classes.
    let params = HyperParams::new(2, 1, 1, 2, 1.0);
    let mut bytes = bonsai::io::ModelHeader::from_params(&params).to_bytes().to_vec();
    for value in [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let model = BonsaiModel::from_bytes(&bytes).unwrap();
    assert_eq!(model.projection().iter().copied().collect::<Vec<_>>(), vec![1.0, 2.0]);
    assert_eq!(model.weight(0, 0).to_vec(), vec![3.0]);
    assert_eq!(model.weight(1, 0).to_vec(), vec![4.0]);
    assert_eq!(model.gate(0, 0).to_vec(), vec![5.0]);
    assert_eq!(model.gate(1, 0).to_vec(), vec![6.0]);
    assert_eq!(model.hyperplane(0).to_vec(), vec![7.0]);
}

#[rstest]
#[case(-1)]
#[case(1)]
#[case(-4)]
fn wrong_length_is_size_mismatch(#[case] delta: isize) {
    let (_, mut bytes) = sample_blob();
    let expected = bytes.len();
    if delta < 0 {
        bytes.truncate(expected - delta.unsigned_abs());
    } else {
        bytes.extend(std::iter::repeat(0).take(delta as usize));
    }

    let err = BonsaiModel::from_bytes(&bytes).unwrap_err();
    assert_eq!(
        err,
        ReadError::SizeMismatch {
            blob: Blob::Model,
            expected,
            actual: bytes.len(),
        }
    );
}

#[test]
fn short_header_is_size_mismatch() {
    let (_, bytes) = sample_blob();
    let err = BonsaiModel::from_bytes(&bytes[..HEADER_SIZE - 1]).unwrap_err();
    assert!(matches!(err, ReadError::SizeMismatch { expected: HEADER_SIZE, .. }));
    assert!(matches!(
        BonsaiModel::from_bytes(&[]),
        Err(ReadError::SizeMismatch { actual: 0, .. })
    ));
}

#[test]
fn bad_magic_and_version() {
    let (_, mut bytes) = sample_blob();
    bytes[4] = 99;
    assert_eq!(BonsaiModel::from_bytes(&bytes).unwrap_err(), ReadError::UnsupportedVersion(99));

    bytes[0] = b'X';
    assert_eq!(BonsaiModel::from_bytes(&bytes).unwrap_err(), ReadError::NotAModel);
}

#[rstest]
#[case::zero_projection(12, 0)]
#[case::internal_nodes(20, 5)]
#[case::internal_classes(24, 7)]
#[case::num_classes(28, 1)]
fn inconsistent_header_is_invalid_model(#[case] offset: usize, #[case] value: u32) {
    let (_, mut bytes) = sample_blob();
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    assert!(matches!(BonsaiModel::from_bytes(&bytes), Err(ReadError::InvalidModel(_))));
}

#[test]
fn non_finite_sigma_is_invalid_model() {
    let (_, mut bytes) = sample_blob();
    bytes[32..36].copy_from_slice(&f32::NAN.to_le_bytes());
    assert!(matches!(BonsaiModel::from_bytes(&bytes), Err(ReadError::InvalidModel(_))));
}

#[test]
fn binary_single_internal_class_is_accepted() {
    let params = HyperParams::new(5, 3, 3, 2, 1.0).with_internal_classes(1);
    let model = random_model(params, 2);
    let bytes = model.to_bytes();
    assert_eq!(bytes.len(), expected_len(5, 3, 7, 1));
    assert_eq!(BonsaiModel::from_bytes(&bytes).unwrap(), model);
}

#[test]
fn one_indexed_flag_roundtrips() {
    let params = HyperParams::new(4, 2, 1, 3, 1.0).with_one_indexed(true);
    let model = random_model(params, 0);
    let loaded = BonsaiModel::from_bytes(&model.to_bytes()).unwrap();
    assert!(loaded.params().one_indexed);
}

#[test]
fn mean_var_blob() {
    let normalizer = random_normalizer(6, 4);
    let bytes = normalizer.to_bytes();
    assert_eq!(bytes.len(), 2 * 4 * 6);
    assert_eq!(Normalizer::from_bytes(&bytes, 6).unwrap(), normalizer);

    let err = Normalizer::from_bytes(&bytes[..bytes.len() - 4], 6).unwrap_err();
    assert_eq!(
        err,
        ReadError::SizeMismatch {
            blob: Blob::MeanVar,
            expected: 48,
            actual: 44,
        }
    );
}

#[test]
fn predictor_checks_both_blobs() {
    let (_, bytes) = sample_blob();
    let meanvar = random_normalizer(9, 1).to_bytes();
    assert!(BonsaiPredictor::from_bytes(&bytes, &meanvar).is_ok());

    let wrong_dim = random_normalizer(8, 1).to_bytes();
    assert!(matches!(
        BonsaiPredictor::from_bytes(&bytes, &wrong_dim),
        Err(ReadError::SizeMismatch { blob: Blob::MeanVar, .. })
    ));
}
