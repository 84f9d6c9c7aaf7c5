//! LIBSVM text loader.
//!
//! One point per line: `<label> <index>:<value> ...` with 1-based feature
//! indices. Blank lines and lines starting with `#` are skipped, as is any
//! trailing `# comment`.
//!
//! Labels are integer class ids. When the model uses 1-based labels, label `l`
//! maps to class `l - 1`. A label that falls outside `[0, K)` after that shift
//! still yields a point, with an empty label column.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sprs::CsMat;
use thiserror::Error;

use super::{one_hot_labels, ColumnBuilder};

/// Failure to read a LIBSVM file.
#[derive(Debug, Error)]
pub enum LibSvmError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid label '{token}'")]
    InvalidLabel { line: usize, token: String },

    #[error("line {line}: invalid feature token '{token}'")]
    InvalidFeature { line: usize, token: String },

    /// Feature indices are 1-based.
    #[error("line {line}: feature index 0 (indices are 1-based)")]
    ZeroIndex { line: usize },

    #[error("line {line}: feature index {index} exceeds {n_features} features")]
    IndexOutOfRange {
        line: usize,
        index: usize,
        n_features: usize,
    },
}

/// Parsed test set.
#[derive(Debug, Clone)]
pub struct LibSvmDataset {
    /// `n_features x n_points`, CSC.
    pub features: CsMat<f32>,
    /// `num_classes x n_points` one-hot, CSC.
    pub labels: CsMat<f32>,
    /// Zero-based class per point, `None` if out of range.
    pub classes: Vec<Option<usize>>,
}

impl LibSvmDataset {
    pub fn n_points(&self) -> usize {
        self.classes.len()
    }
}

/// Parse LIBSVM text with `n_features` raw features (`D - 1`, no bias).
pub fn parse_libsvm<R: BufRead>(
    reader: R,
    n_features: usize,
    num_classes: usize,
    one_indexed: bool,
) -> Result<LibSvmDataset, LibSvmError> {
    let mut features = ColumnBuilder::new(n_features);
    let mut classes = Vec::new();
    let mut entries: Vec<(usize, f32)> = Vec::new();

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_idx + 1;
        let content = match line.split_once('#') {
            Some((before, _)) => before,
            None => line.as_str(),
        }
        .trim();
        if content.is_empty() {
            continue;
        }

        let mut parts = content.split_whitespace();
        let label_token = parts.next().unwrap_or_default();
        classes.push(parse_class(label_token, line_no, num_classes, one_indexed)?);

        entries.clear();
        for token in parts {
            entries.push(parse_feature(token, line_no, n_features)?);
        }
        features.push_column(&mut entries);
    }

    let labels = one_hot_labels(&classes, num_classes);
    tracing::debug!(
        n_points = classes.len(),
        n_features,
        nnz = features.nnz(),
        "parsed libsvm test set"
    );

    Ok(LibSvmDataset {
        features: features.build(),
        labels,
        classes,
    })
}

/// Read and parse a LIBSVM file.
pub fn load_libsvm(
    path: &Path,
    n_features: usize,
    num_classes: usize,
    one_indexed: bool,
) -> Result<LibSvmDataset, LibSvmError> {
    let file = File::open(path)?;
    parse_libsvm(BufReader::new(file), n_features, num_classes, one_indexed)
}

fn parse_class(
    token: &str,
    line: usize,
    num_classes: usize,
    one_indexed: bool,
) -> Result<Option<usize>, LibSvmError> {
    let invalid = || LibSvmError::InvalidLabel {
        line,
        token: token.to_string(),
    };

    // Accept "2", "+1" and "2.0"; reject fractional labels.
    let value: f64 = token.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(invalid());
    }

    let class = if one_indexed { value - 1.0 } else { value };
    if class < 0.0 || class >= num_classes as f64 {
        return Ok(None);
    }
    Ok(Some(class as usize))
}

fn parse_feature(token: &str, line: usize, n_features: usize) -> Result<(usize, f32), LibSvmError> {
    let invalid = || LibSvmError::InvalidFeature {
        line,
        token: token.to_string(),
    };

    let (index, value) = token.split_once(':').ok_or_else(invalid)?;
    let index: usize = index.parse().map_err(|_| invalid())?;
    let value: f32 = value.parse().map_err(|_| invalid())?;

    if index == 0 {
        return Err(LibSvmError::ZeroIndex { line });
    }
    if index > n_features {
        return Err(LibSvmError::IndexOutOfRange {
            line,
            index,
            n_features,
        });
    }
    Ok((index - 1, value))
}
