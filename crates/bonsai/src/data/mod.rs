//! Labeled test data in sparse column-major form.
//!
//! Evaluation consumes two [`CsMat`] matrices with one column per point:
//! features (`D - 1` or `D` rows) and one-hot labels (`K` rows). This module
//! builds them, either from a LIBSVM file ([`libsvm`]) or from explicit columns.

pub mod libsvm;

use sprs::CsMat;

pub use libsvm::{load_libsvm, parse_libsvm, LibSvmDataset, LibSvmError};

// =============================================================================
// Column Builder
// =============================================================================

/// Incrementally assembles a CSC matrix one column at a time.
///
/// Entries within a column may arrive in any order. If a row repeats, the
/// later value wins.
#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    n_rows: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f32>,
}

impl ColumnBuilder {
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            indptr: vec![0],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Number of columns pushed so far.
    pub fn n_cols(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Stored entries so far.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Append a column given as `(row, value)` pairs.
    ///
    /// # Panics
    ///
    /// Panics if a row index is `>= n_rows`.
    pub fn push_column(&mut self, entries: &mut [(usize, f32)]) {
        // Stable sort keeps file order among duplicates.
        entries.sort_by_key(|&(row, _)| row);

        let start = self.indices.len();
        for &(row, value) in entries.iter() {
            assert!(row < self.n_rows, "row {} out of range for {} rows", row, self.n_rows);
            if self.indices.len() > start && self.indices.last() == Some(&row) {
                if let Some(last) = self.data.last_mut() {
                    *last = value;
                }
            } else {
                self.indices.push(row);
                self.data.push(value);
            }
        }
        self.indptr.push(self.indices.len());
    }

    /// Finish into a `n_rows x n_cols` CSC matrix.
    pub fn build(self) -> CsMat<f32> {
        let shape = (self.n_rows, self.n_cols());
        CsMat::new_csc(shape, self.indptr, self.indices, self.data)
    }
}

/// One-hot label matrix (`num_classes x classes.len()`, CSC).
///
/// `None` or an out-of-range class leaves the column empty, which evaluation
/// reports as an invalid label.
pub fn one_hot_labels(classes: &[Option<usize>], num_classes: usize) -> CsMat<f32> {
    let mut builder = ColumnBuilder::new(num_classes);
    for class in classes {
        match class {
            Some(c) if *c < num_classes => builder.push_column(&mut [(*c, 1.0)]),
            _ => builder.push_column(&mut []),
        }
    }
    builder.build()
}
