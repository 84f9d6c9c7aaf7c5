//! Feature normalization.
//!
//! Every raw point is shifted by the training mean and divided by the training
//! variance, feature by feature. The last coordinate is the bias feature: it is
//! never normalized and always ends up as exactly `1.0`.

use ndarray::{s, Array1, ArrayView1, Zip};

use super::ScoreError;
use crate::io::{read_mean_var, write_mean_var, ReadError};

/// Per-feature mean/variance normalization with a trailing bias feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
    mean: Array1<f32>,
    variance: Array1<f32>,
}

impl Normalizer {
    /// Create a normalizer from mean and variance vectors of length `D`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidModel`] if the vectors are empty or differ
    /// in length, or if any non-bias entry has zero or non-finite variance
    /// or a non-finite mean.
    pub fn new(mean: Array1<f32>, variance: Array1<f32>) -> Result<Self, ReadError> {
        if mean.is_empty() || mean.len() != variance.len() {
            return Err(ReadError::InvalidModel(format!(
                "mean has {} entries and variance has {}, expected the same non-zero count",
                mean.len(),
                variance.len()
            )));
        }

        let bias = mean.len() - 1;
        for (f, (&m, &v)) in mean.iter().zip(variance.iter()).take(bias).enumerate() {
            if v == 0.0 {
                return Err(ReadError::InvalidModel(format!("variance of feature {f} is zero")));
            }
            if !m.is_finite() || !v.is_finite() {
                return Err(ReadError::InvalidModel(format!(
                    "feature {f} has non-finite mean {m} or variance {v}"
                )));
            }
        }

        Ok(Self { mean, variance })
    }

    /// Normalizer that leaves features unchanged (zero mean, unit variance).
    pub fn identity(data_dim: usize) -> Self {
        Self {
            mean: Array1::zeros(data_dim),
            variance: Array1::ones(data_dim),
        }
    }

    /// Load from a mean/variance blob for `data_dim` features.
    pub fn from_bytes(bytes: &[u8], data_dim: usize) -> Result<Self, ReadError> {
        let (mean, variance) = read_mean_var(bytes, data_dim)?;
        Self::new(mean, variance)
    }

    /// Serialize into a mean/variance blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        write_mean_var(self.mean.view(), self.variance.view())
    }

    /// Feature count `D`, bias included.
    #[inline]
    pub fn data_dim(&self) -> usize {
        self.mean.len()
    }

    #[inline]
    pub fn mean(&self) -> ArrayView1<'_, f32> {
        self.mean.view()
    }

    #[inline]
    pub fn variance(&self) -> ArrayView1<'_, f32> {
        self.variance.view()
    }

    /// Normalize a dense raw point of `D - 1` features into `out` (length `D`).
    ///
    /// # Panics
    ///
    /// Panics if `out.len() != D`.
    pub fn normalize_dense_into(&self, raw: &[f32], out: &mut Array1<f32>) -> Result<(), ScoreError> {
        let n_raw = self.data_dim() - 1;
        if raw.len() != n_raw {
            return Err(ScoreError::DimensionMismatch {
                expected: n_raw,
                actual: raw.len(),
            });
        }
        assert_eq!(out.len(), self.data_dim(), "output length must equal data_dim");

        out.slice_mut(s![..n_raw]).assign(&ArrayView1::from(raw));
        out[n_raw] = 0.0;
        self.finish(out);
        Ok(())
    }

    /// Normalize a sparse raw point into `out` (length `D`).
    ///
    /// Features not listed are zero before normalization. If an index repeats,
    /// the later value wins. An entry at the bias index is accepted and
    /// discarded.
    ///
    /// # Panics
    ///
    /// Panics if `out.len() != D`.
    pub fn normalize_sparse_into(
        &self,
        indices: &[usize],
        values: &[f32],
        out: &mut Array1<f32>,
    ) -> Result<(), ScoreError> {
        if indices.len() != values.len() {
            return Err(ScoreError::SparseLengthMismatch {
                n_indices: indices.len(),
                n_values: values.len(),
            });
        }
        assert_eq!(out.len(), self.data_dim(), "output length must equal data_dim");

        out.fill(0.0);
        for (&index, &value) in indices.iter().zip(values) {
            if index >= self.data_dim() {
                return Err(ScoreError::FeatureOutOfRange {
                    index,
                    n_features: self.data_dim(),
                });
            }
            out[index] = value;
        }
        self.finish(out);
        Ok(())
    }

    /// Allocating variant of [`normalize_dense_into`](Self::normalize_dense_into).
    pub fn normalize_dense(&self, raw: &[f32]) -> Result<Array1<f32>, ScoreError> {
        let mut out = Array1::zeros(self.data_dim());
        self.normalize_dense_into(raw, &mut out)?;
        Ok(out)
    }

    /// Allocating variant of [`normalize_sparse_into`](Self::normalize_sparse_into).
    pub fn normalize_sparse(&self, indices: &[usize], values: &[f32]) -> Result<Array1<f32>, ScoreError> {
        let mut out = Array1::zeros(self.data_dim());
        self.normalize_sparse_into(indices, values, &mut out)?;
        Ok(out)
    }

    /// Shift and scale everything but the bias, then pin the bias to 1.
    fn finish(&self, out: &mut Array1<f32>) {
        let bias = self.data_dim() - 1;
        Zip::from(out.slice_mut(s![..bias]))
            .and(self.mean.slice(s![..bias]))
            .and(self.variance.slice(s![..bias]))
            .for_each(|x, &m, &v| *x = (*x - m) / v);
        out[bias] = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn normalizer() -> Normalizer {
        // Bias slot carries junk statistics on purpose: it must be ignored.
        Normalizer::new(array![1.0, 2.0, -1.0, 5.0], array![2.0, 0.5, 4.0, 0.0]).unwrap()
    }

    #[test]
    fn dense_normalization() {
        let out = normalizer().normalize_dense(&[3.0, 2.0, 1.0]).unwrap();
        assert_abs_diff_eq!(out, array![1.0, 0.0, 0.5, 1.0], epsilon = 1e-6);
    }

    #[test]
    fn bias_is_exactly_one() {
        let out = normalizer().normalize_dense(&[100.0, -50.0, 7.0]).unwrap();
        assert_eq!(out[3], 1.0);

        let out = normalizer().normalize_sparse(&[3], &[42.0]).unwrap();
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn sparse_matches_dense() {
        let n = normalizer();
        let dense = n.normalize_dense(&[0.0, 4.0, 0.0]).unwrap();
        let sparse = n.normalize_sparse(&[1], &[4.0]).unwrap();
        assert_eq!(dense, sparse);
    }

    #[test]
    fn sparse_duplicate_last_wins() {
        let out = normalizer().normalize_sparse(&[0, 0], &[9.0, 3.0]).unwrap();
        assert_abs_diff_eq!(out[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn scratch_is_fully_overwritten() {
        let n = normalizer();
        let mut out = Array1::from_elem(4, f32::NAN);
        n.normalize_sparse_into(&[], &[], &mut out).unwrap();
        assert!(out.iter().all(|x| x.is_finite()));

        let mut out = Array1::from_elem(4, f32::NAN);
        n.normalize_dense_into(&[1.0, 2.0, -1.0], &mut out).unwrap();
        assert_eq!(out, array![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn rejects_zero_variance() {
        let err = Normalizer::new(array![0.0, 0.0, 0.0], array![1.0, 0.0, 1.0]).unwrap_err();
        assert!(matches!(err, ReadError::InvalidModel(ref msg) if msg.contains("feature 1")));
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(Normalizer::new(array![0.0, 0.0], array![1.0]).is_err());
        assert!(Normalizer::new(Array1::zeros(0), Array1::zeros(0)).is_err());
    }

    #[test]
    fn rejects_bad_input() {
        let n = normalizer();
        assert_eq!(
            n.normalize_dense(&[1.0, 2.0]).unwrap_err(),
            ScoreError::DimensionMismatch { expected: 3, actual: 2 }
        );
        assert_eq!(
            n.normalize_sparse(&[4], &[1.0]).unwrap_err(),
            ScoreError::FeatureOutOfRange { index: 4, n_features: 4 }
        );
        assert_eq!(
            n.normalize_sparse(&[0, 1], &[1.0]).unwrap_err(),
            ScoreError::SparseLengthMismatch { n_indices: 2, n_values: 1 }
        );
    }

    #[test]
    fn blob_roundtrip() {
        let n = normalizer();
        let decoded = Normalizer::from_bytes(&n.to_bytes(), 4).unwrap();
        assert_eq!(decoded, n);
    }

    #[test]
    fn blob_with_zero_variance_is_invalid() {
        let bytes = write_mean_var(array![0.0f32, 0.0].view(), array![0.0f32, 1.0].view());
        assert!(matches!(Normalizer::from_bytes(&bytes, 2), Err(ReadError::InvalidModel(_))));
    }
}
