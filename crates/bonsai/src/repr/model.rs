//! Bonsai model parameters.

use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2};

use super::HyperParams;
use crate::inference::ScoringMode;
use crate::io::ReadError;

/// Learned parameters of a Bonsai tree.
///
/// All tensors are stored as owned `ndarray` buffers:
///
/// ```text
/// z[[p, d]]          projection, shape [P, D]
/// w[[c, n, p]]       per-class linear scorer, shape [K_i, I, P]
/// v[[c, n, p]]       per-class gate pre-activation, shape [K_i, I, P]
/// theta[[n, p]]      routing hyperplane, shape [I, P]
/// ```
///
/// The model is immutable once built and can be shared freely across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct BonsaiModel {
    params: HyperParams,
    z: Array2<f32>,
    w: Array3<f32>,
    v: Array3<f32>,
    theta: Array2<f32>,
}

impl BonsaiModel {
    /// Build a model from owned tensors.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidModel`] if the hyperparameters are
    /// inconsistent or a tensor's shape disagrees with them.
    pub fn new(
        params: HyperParams,
        z: Array2<f32>,
        w: Array3<f32>,
        v: Array3<f32>,
        theta: Array2<f32>,
    ) -> Result<Self, ReadError> {
        params.validate()?;

        let (k, i, p, d) = (
            params.internal_classes,
            params.internal_nodes,
            params.projection_dim,
            params.data_dim,
        );
        check_shape("Z", z.shape(), &[p, d])?;
        check_shape("W", w.shape(), &[k, i, p])?;
        check_shape("V", v.shape(), &[k, i, p])?;
        check_shape("Theta", theta.shape(), &[i, p])?;

        Ok(Self { params, z, w, v, theta })
    }

    /// Create a model with every parameter set to zero.
    pub fn zeros(params: HyperParams) -> Result<Self, ReadError> {
        params.validate()?;
        let (k, i, p, d) = (
            params.internal_classes,
            params.internal_nodes,
            params.projection_dim,
            params.data_dim,
        );

        Ok(Self {
            params,
            z: Array2::zeros((p, d)),
            w: Array3::zeros((k, i, p)),
            v: Array3::zeros((k, i, p)),
            theta: Array2::zeros((i, p)),
        })
    }

    /// Load a model from its flat binary blob.
    ///
    /// See [`crate::io::native`] for the layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ReadError> {
        crate::io::read_model(bytes)
    }

    /// Serialize into the flat binary blob read by [`from_bytes`](Self::from_bytes).
    pub fn to_bytes(&self) -> Vec<u8> {
        crate::io::write_model(self)
    }

    /// Hyperparameters.
    #[inline]
    pub fn params(&self) -> &HyperParams {
        &self.params
    }

    /// Sign convention for class scores.
    #[inline]
    pub fn scoring_mode(&self) -> ScoringMode {
        self.params.scoring_mode()
    }

    /// Projection matrix `Z`, shape `[P, D]`.
    #[inline]
    pub fn projection(&self) -> ArrayView2<'_, f32> {
        self.z.view()
    }

    /// Linear scorer `W[class][node]`, length `P`.
    ///
    /// # Panics
    ///
    /// Panics if `class >= K_i` or `node >= I`.
    #[inline]
    pub fn weight(&self, class: usize, node: usize) -> ArrayView1<'_, f32> {
        self.debug_check(class, node);
        self.w.slice(s![class, node, ..])
    }

    /// Gate pre-activation `V[class][node]`, length `P`.
    ///
    /// # Panics
    ///
    /// Panics if `class >= K_i` or `node >= I`.
    #[inline]
    pub fn gate(&self, class: usize, node: usize) -> ArrayView1<'_, f32> {
        self.debug_check(class, node);
        self.v.slice(s![class, node, ..])
    }

    /// Routing hyperplane `Theta[node]`, length `P`.
    ///
    /// # Panics
    ///
    /// Panics if `node >= I`.
    #[inline]
    pub fn hyperplane(&self, node: usize) -> ArrayView1<'_, f32> {
        debug_assert!(
            node < self.params.internal_nodes,
            "node {} out of range (internal nodes: {})",
            node,
            self.params.internal_nodes
        );
        self.theta.row(node)
    }

    /// All weights, shape `[K_i, I, P]`.
    #[inline]
    pub fn weights(&self) -> &Array3<f32> {
        &self.w
    }

    /// All gates, shape `[K_i, I, P]`.
    #[inline]
    pub fn gates(&self) -> &Array3<f32> {
        &self.v
    }

    /// All hyperplanes, shape `[I, P]`.
    #[inline]
    pub fn hyperplanes(&self) -> ArrayView2<'_, f32> {
        self.theta.view()
    }

    /// Number of non-zero parameters across `Z`, `W`, `V` and `Theta`.
    ///
    /// Used to report model sparsity.
    pub fn total_non_zeros(&self) -> usize {
        count_non_zeros(self.z.iter())
            + count_non_zeros(self.w.iter())
            + count_non_zeros(self.v.iter())
            + count_non_zeros(self.theta.iter())
    }

    #[inline]
    fn debug_check(&self, class: usize, node: usize) {
        debug_assert!(
            class < self.params.internal_classes,
            "class {} out of range (internal classes: {})",
            class,
            self.params.internal_classes
        );
        debug_assert!(
            node < self.params.internal_nodes,
            "node {} out of range (internal nodes: {})",
            node,
            self.params.internal_nodes
        );
    }
}

fn count_non_zeros<'a>(values: impl Iterator<Item = &'a f32>) -> usize {
    values.filter(|&&x| x != 0.0).count()
}

fn check_shape(name: &str, actual: &[usize], expected: &[usize]) -> Result<(), ReadError> {
    if actual != expected {
        return Err(ReadError::InvalidModel(format!(
            "{} has shape {:?}, expected {:?}",
            name, actual, expected
        )));
    }
    Ok(())
}
