//! Runtime representation of Bonsai models.
//!
//! - [`HyperParams`]: tree shape, class counts and gate sharpness
//! - [`BonsaiModel`]: projection, per-node weights/gates and hyperplanes

mod model;
mod params;

pub use model::BonsaiModel;
pub use params::{HyperParams, MAX_TREE_DEPTH};

/// Index of a node in the complete binary tree (root = 0).
pub type NodeId = u32;
