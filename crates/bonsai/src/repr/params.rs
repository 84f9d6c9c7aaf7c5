//! Model hyperparameters.

use crate::inference::ScoringMode;
use crate::io::ReadError;

/// Deepest tree a model may declare.
///
/// Keeps node indices (and `2^(depth + 1)`) comfortably inside `u32`.
pub const MAX_TREE_DEPTH: usize = 30;

/// Shape and scoring hyperparameters of a Bonsai model.
///
/// Fixed when the model is loaded. Node `n` of the complete binary tree has
/// children `2n + 1` and `2n + 2`; nodes `0..internal_nodes` carry parameters,
/// everything past that is an implicit leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HyperParams {
    /// Input dimensionality `D`, including the trailing bias feature.
    pub data_dim: usize,
    /// Projected dimensionality `P`.
    pub projection_dim: usize,
    /// Depth of the tree (root only = 0).
    pub tree_depth: usize,
    /// Internal node count `I = 2^depth - 1`.
    pub internal_nodes: usize,
    /// Number of score accumulators `K_i`.
    pub internal_classes: usize,
    /// Number of output classes `K`.
    pub num_classes: usize,
    /// Gate sharpness.
    pub sigma: f32,
    /// Whether predicted labels are reported 1-based.
    pub one_indexed: bool,
}

impl HyperParams {
    /// Create hyperparameters, deriving the internal node and class counts.
    ///
    /// Binary tasks (`num_classes <= 2`) get two internal classes.
    pub fn new(
        data_dim: usize,
        projection_dim: usize,
        tree_depth: usize,
        num_classes: usize,
        sigma: f32,
    ) -> Self {
        let internal_nodes = if tree_depth <= MAX_TREE_DEPTH {
            (1usize << tree_depth) - 1
        } else {
            usize::MAX
        };

        Self {
            data_dim,
            projection_dim,
            tree_depth,
            internal_nodes,
            internal_classes: if num_classes <= 2 { 2 } else { num_classes },
            num_classes,
            sigma,
            one_indexed: false,
        }
    }

    /// Report predicted labels 1-based.
    pub fn with_one_indexed(mut self, one_indexed: bool) -> Self {
        self.one_indexed = one_indexed;
        self
    }

    /// Override the number of internal classes (e.g. 1 for a single-score binary model).
    pub fn with_internal_classes(mut self, internal_classes: usize) -> Self {
        self.internal_classes = internal_classes;
        self
    }

    /// Total node count of the complete tree, leaves included.
    #[inline]
    pub fn total_nodes(&self) -> usize {
        2 * self.internal_nodes + 1
    }

    /// Length of every root-to-leaf path.
    #[inline]
    pub fn path_len(&self) -> usize {
        self.tree_depth + 1
    }

    /// Sign convention for the per-class scores.
    #[inline]
    pub fn scoring_mode(&self) -> ScoringMode {
        ScoringMode::for_internal_classes(self.internal_classes)
    }

    /// Number of `f32` parameters stored in the model.
    ///
    /// Returns `None` on overflow.
    pub fn n_parameters(&self) -> Option<usize> {
        let z = self.projection_dim.checked_mul(self.data_dim)?;
        let per_class = self
            .internal_classes
            .checked_mul(self.internal_nodes)?
            .checked_mul(self.projection_dim)?;
        let theta = self.internal_nodes.checked_mul(self.projection_dim)?;

        z.checked_add(per_class.checked_mul(2)?)?.checked_add(theta)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::InvalidModel`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), ReadError> {
        if self.data_dim == 0 {
            return Err(invalid("data_dim must be at least 1 (bias feature)"));
        }
        if self.projection_dim == 0 {
            return Err(invalid("projection_dim must be at least 1"));
        }
        if self.tree_depth > MAX_TREE_DEPTH {
            return Err(invalid(format!(
                "tree_depth {} exceeds the maximum of {}",
                self.tree_depth, MAX_TREE_DEPTH
            )));
        }

        let expected_nodes = (1usize << self.tree_depth) - 1;
        if self.internal_nodes != expected_nodes {
            return Err(invalid(format!(
                "internal_nodes is {} but a tree of depth {} has {}",
                self.internal_nodes, self.tree_depth, expected_nodes
            )));
        }

        if self.num_classes < 2 {
            return Err(invalid(format!(
                "num_classes must be at least 2, got {}",
                self.num_classes
            )));
        }

        let classes_ok = if self.num_classes <= 2 {
            matches!(self.internal_classes, 1 | 2)
        } else {
            self.internal_classes == self.num_classes
        };
        if !classes_ok {
            return Err(invalid(format!(
                "internal_classes {} is inconsistent with num_classes {}",
                self.internal_classes, self.num_classes
            )));
        }

        if !self.sigma.is_finite() {
            return Err(invalid(format!("sigma must be finite, got {}", self.sigma)));
        }

        if self.n_parameters().is_none() {
            return Err(invalid("parameter count overflows usize"));
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ReadError {
    ReadError::InvalidModel(msg.into())
}
