//! Root-to-leaf routing.
//!
//! Routing is deterministic: at internal node `n` the projected point goes to
//! the left child `2n + 1` when `Theta[n] · x > 0` and to the right child
//! `2n + 2` otherwise. A product of exactly zero (or NaN) goes right.

use ndarray::ArrayView1;

use crate::repr::{BonsaiModel, NodeId};

/// Left child of `node`.
#[inline]
pub const fn left_child(node: usize) -> usize {
    2 * node + 1
}

/// Right child of `node`.
#[inline]
pub const fn right_child(node: usize) -> usize {
    2 * node + 2
}

/// Route a projected point from the root to a leaf, writing the visited nodes into `path`.
///
/// `path` is cleared first. On return it holds `depth + 1` node indices, the
/// root first and a leaf (index `>= I`) last.
pub fn route_into(model: &BonsaiModel, projected: ArrayView1<'_, f32>, path: &mut Vec<NodeId>) {
    let internal_nodes = model.params().internal_nodes;

    path.clear();
    path.push(0);

    let mut node = 0usize;
    while node < internal_nodes {
        let margin = model.hyperplane(node).dot(&projected);
        node = if margin > 0.0 {
            left_child(node)
        } else {
            right_child(node)
        };
        path.push(node as NodeId);
    }
}

/// Allocating variant of [`route_into`].
pub fn route(model: &BonsaiModel, projected: ArrayView1<'_, f32>) -> Vec<NodeId> {
    let mut path = Vec::with_capacity(model.params().path_len());
    route_into(model, projected, &mut path);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::HyperParams;
    use crate::testing::random_model;
    use ndarray::{array, Array1, Array2, Array3};

    /// Depth-2 model (3 internal nodes) over a 2-d projection with the given hyperplanes.
    fn depth2_model(theta: Array2<f32>) -> BonsaiModel {
        let params = HyperParams::new(3, 2, 2, 2, 1.0);
        BonsaiModel::new(
            params,
            Array2::zeros((2, 3)),
            Array3::zeros((2, 3, 2)),
            Array3::zeros((2, 3, 2)),
            theta,
        )
        .unwrap()
    }

    #[test]
    fn positive_margin_goes_left() {
        let model = depth2_model(array![[1.0, 0.0], [0.0, 1.0], [0.0, 1.0]]);
        assert_eq!(route(&model, array![1.0, 1.0].view()), vec![0, 1, 3]);
        assert_eq!(route(&model, array![1.0, -1.0].view()), vec![0, 1, 4]);
        assert_eq!(route(&model, array![-1.0, 1.0].view()), vec![0, 2, 5]);
        assert_eq!(route(&model, array![-1.0, -1.0].view()), vec![0, 2, 6]);
    }

    #[test]
    fn zero_margin_goes_right() {
        // Orthogonal hyperplanes give an exact zero at every node.
        let model = depth2_model(array![[1.0, -1.0], [2.0, -2.0], [0.5, -0.5]]);
        assert_eq!(route(&model, array![3.0, 3.0].view()), vec![0, 2, 6]);

        let model = depth2_model(Array2::zeros((3, 2)));
        assert_eq!(route(&model, array![5.0, -7.0].view()), vec![0, 2, 6]);
    }

    #[test]
    fn nan_margin_goes_right() {
        let model = depth2_model(array![[1.0, 0.0], [1.0, 0.0], [1.0, 0.0]]);
        assert_eq!(route(&model, array![f32::NAN, 0.0].view()), vec![0, 2, 6]);
    }

    #[test]
    fn depth_zero_is_a_single_leaf() {
        let params = HyperParams::new(3, 2, 0, 2, 1.0);
        let model = BonsaiModel::zeros(params).unwrap();
        assert_eq!(route(&model, array![1.0, 1.0].view()), vec![0]);
    }

    #[test]
    fn path_shape_invariant() {
        for depth in 0..6 {
            let params = HyperParams::new(6, 4, depth, 3, 1.0);
            let model = random_model(params, depth as u64);
            for seed in 0..20u64 {
                let x = Array1::from_iter((0..4).map(|i| ((seed * 7 + i) as f32).sin()));
                let path = route(&model, x.view());

                assert_eq!(path.len(), depth + 1);
                assert_eq!(path[0], 0);
                assert!(*path.last().unwrap() as usize >= params.internal_nodes);
                for pair in path.windows(2) {
                    let (parent, child) = (pair[0] as usize, pair[1] as usize);
                    assert!(child == left_child(parent) || child == right_child(parent));
                }
            }
        }
    }

    #[test]
    fn route_into_reuses_buffer() {
        let model = depth2_model(array![[1.0, 0.0], [0.0, 1.0], [0.0, 1.0]]);
        let mut path = vec![99, 98, 97, 96, 95];
        route_into(&model, array![1.0, 1.0].view(), &mut path);
        assert_eq!(path, vec![0, 1, 3]);
    }
}
