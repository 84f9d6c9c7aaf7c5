//! Flat binary blobs for Bonsai models and their normalization state.
//!
//! # Model Blob
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Header (40 bytes)                        │
//! ├────────────────────────────────────────────────────────────┤
//! │  Z      P*D f32          projection, row-major              │
//! │  W      K_i*I*P f32      class-major, then node             │
//! │  V      K_i*I*P f32      class-major, then node             │
//! │  Theta  I*P f32          node-major                         │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! All values are little-endian. The blob length must match the size implied
//! by the header exactly; no trailing bytes are tolerated.
//!
//! # Mean/Variance Blob
//!
//! `D` little-endian `f32` means followed by `D` variances, nothing else.

use ndarray::{Array1, Array2, Array3, ArrayView1};

use super::{Blob, ReadError};
use crate::repr::{BonsaiModel, HyperParams};

// ============================================================================
// Constants
// ============================================================================

/// Magic bytes identifying a Bonsai model blob.
pub const MAGIC: &[u8; 4] = b"BNSI";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the model header in bytes.
pub const HEADER_SIZE: usize = 40;

const F32_SIZE: usize = std::mem::size_of::<f32>();

/// Header flag: predicted labels are reported 1-based.
const FLAG_ONE_INDEXED: u8 = 1 << 0;

// ============================================================================
// Model Header
// ============================================================================

/// 40-byte header carrying the model hyperparameters.
///
/// # Layout
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     Magic ("BNSI")
/// 4       1     Format version
/// 5       1     Flags (bit 0: one-indexed labels)
/// 6       2     Reserved
/// 8       4     Data dimension D
/// 12      4     Projection dimension P
/// 16      4     Tree depth
/// 20      4     Internal nodes I
/// 24      4     Internal classes K_i
/// 28      4     Classes K
/// 32      4     Sigma (f32)
/// 36      4     Reserved
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelHeader {
    pub version: u8,
    pub one_indexed: bool,
    pub data_dim: u32,
    pub projection_dim: u32,
    pub tree_depth: u32,
    pub internal_nodes: u32,
    pub internal_classes: u32,
    pub num_classes: u32,
    pub sigma: f32,
}

impl ModelHeader {
    /// Header describing the given hyperparameters.
    pub fn from_params(params: &HyperParams) -> Self {
        Self {
            version: FORMAT_VERSION,
            one_indexed: params.one_indexed,
            data_dim: to_u32(params.data_dim),
            projection_dim: to_u32(params.projection_dim),
            tree_depth: to_u32(params.tree_depth),
            internal_nodes: to_u32(params.internal_nodes),
            internal_classes: to_u32(params.internal_classes),
            num_classes: to_u32(params.num_classes),
            sigma: params.sigma,
        }
    }

    /// Hyperparameters as declared, not yet validated.
    pub fn params(&self) -> HyperParams {
        HyperParams {
            data_dim: self.data_dim as usize,
            projection_dim: self.projection_dim as usize,
            tree_depth: self.tree_depth as usize,
            internal_nodes: self.internal_nodes as usize,
            internal_classes: self.internal_classes as usize,
            num_classes: self.num_classes as usize,
            sigma: self.sigma,
            one_indexed: self.one_indexed,
        }
    }

    /// Serialize header to 40 bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];

        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version;
        buf[5] = if self.one_indexed { FLAG_ONE_INDEXED } else { 0 };

        buf[8..12].copy_from_slice(&self.data_dim.to_le_bytes());
        buf[12..16].copy_from_slice(&self.projection_dim.to_le_bytes());
        buf[16..20].copy_from_slice(&self.tree_depth.to_le_bytes());
        buf[20..24].copy_from_slice(&self.internal_nodes.to_le_bytes());
        buf[24..28].copy_from_slice(&self.internal_classes.to_le_bytes());
        buf[28..32].copy_from_slice(&self.num_classes.to_le_bytes());
        buf[32..36].copy_from_slice(&self.sigma.to_le_bytes());

        buf
    }

    /// Parse header from 40 bytes.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, ReadError> {
        if &buf[0..4] != MAGIC {
            return Err(ReadError::NotAModel);
        }

        let version = buf[4];
        if version > FORMAT_VERSION {
            return Err(ReadError::UnsupportedVersion(version));
        }

        let u32_at = |offset: usize| {
            u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
        };

        Ok(Self {
            version,
            one_indexed: buf[5] & FLAG_ONE_INDEXED != 0,
            data_dim: u32_at(8),
            projection_dim: u32_at(12),
            tree_depth: u32_at(16),
            internal_nodes: u32_at(20),
            internal_classes: u32_at(24),
            num_classes: u32_at(28),
            sigma: f32::from_bits(u32_at(32)),
        })
    }
}

#[inline]
fn to_u32(value: usize) -> u32 {
    debug_assert!(value <= u32::MAX as usize, "dimension {} does not fit in u32", value);
    value as u32
}

// ============================================================================
// Model Blob
// ============================================================================

/// Exact blob size for the given hyperparameters, header included.
pub fn model_blob_size(params: &HyperParams) -> Option<usize> {
    params
        .n_parameters()?
        .checked_mul(F32_SIZE)?
        .checked_add(HEADER_SIZE)
}

/// Parse a model blob.
///
/// The header is validated and the total length checked against the size it
/// implies before any tensor is copied.
///
/// # Errors
///
/// - [`ReadError::SizeMismatch`] if the buffer is shorter than a header or its
///   length differs from the declared size
/// - [`ReadError::NotAModel`] / [`ReadError::UnsupportedVersion`] for a foreign header
/// - [`ReadError::InvalidModel`] for inconsistent hyperparameters
pub fn read_model(bytes: &[u8]) -> Result<BonsaiModel, ReadError> {
    let header_bytes: &[u8; HEADER_SIZE] = bytes
        .get(..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or(ReadError::SizeMismatch {
            blob: Blob::Model,
            expected: HEADER_SIZE,
            actual: bytes.len(),
        })?;

    let header = ModelHeader::from_bytes(header_bytes)?;
    let params = header.params();
    params.validate()?;

    let expected = model_blob_size(&params)
        .ok_or_else(|| ReadError::InvalidModel("model size overflows usize".into()))?;
    if bytes.len() != expected {
        return Err(ReadError::SizeMismatch {
            blob: Blob::Model,
            expected,
            actual: bytes.len(),
        });
    }

    let (k, i, p, d) = (
        params.internal_classes,
        params.internal_nodes,
        params.projection_dim,
        params.data_dim,
    );

    let mut reader = TensorReader::new(&bytes[HEADER_SIZE..]);
    let z = Array2::from_shape_vec((p, d), reader.take(p * d)).map_err(shape_error)?;
    let w = Array3::from_shape_vec((k, i, p), reader.take(k * i * p)).map_err(shape_error)?;
    let v = Array3::from_shape_vec((k, i, p), reader.take(k * i * p)).map_err(shape_error)?;
    let theta = Array2::from_shape_vec((i, p), reader.take(i * p)).map_err(shape_error)?;
    debug_assert!(reader.is_empty());

    tracing::debug!(
        data_dim = d,
        projection_dim = p,
        depth = params.tree_depth,
        internal_classes = k,
        num_classes = params.num_classes,
        "loaded bonsai model"
    );

    BonsaiModel::new(params, z, w, v, theta)
}

/// Serialize a model into the blob layout read by [`read_model`].
pub fn write_model(model: &BonsaiModel) -> Vec<u8> {
    let params = model.params();
    // Size is known to fit: the model was validated on construction.
    let size = model_blob_size(params).unwrap_or(HEADER_SIZE);

    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&ModelHeader::from_params(params).to_bytes());
    extend_f32(&mut buf, model.projection().iter());
    extend_f32(&mut buf, model.weights().iter());
    extend_f32(&mut buf, model.gates().iter());
    extend_f32(&mut buf, model.hyperplanes().iter());

    debug_assert_eq!(buf.len(), size);
    buf
}

fn shape_error(e: ndarray::ShapeError) -> ReadError {
    ReadError::InvalidModel(format!("tensor shape: {e}"))
}

// ============================================================================
// Mean/Variance Blob
// ============================================================================

/// Parse a mean/variance blob for `data_dim` features.
///
/// # Errors
///
/// Returns [`ReadError::SizeMismatch`] unless the buffer holds exactly
/// `2 * data_dim` values.
pub fn read_mean_var(
    bytes: &[u8],
    data_dim: usize,
) -> Result<(Array1<f32>, Array1<f32>), ReadError> {
    let expected = data_dim * 2 * F32_SIZE;
    if bytes.len() != expected {
        return Err(ReadError::SizeMismatch {
            blob: Blob::MeanVar,
            expected,
            actual: bytes.len(),
        });
    }

    let mut reader = TensorReader::new(bytes);
    let mean = Array1::from_vec(reader.take(data_dim));
    let variance = Array1::from_vec(reader.take(data_dim));
    Ok((mean, variance))
}

/// Serialize mean and variance vectors into the layout read by [`read_mean_var`].
pub fn write_mean_var(mean: ArrayView1<'_, f32>, variance: ArrayView1<'_, f32>) -> Vec<u8> {
    let mut buf = Vec::with_capacity((mean.len() + variance.len()) * F32_SIZE);
    extend_f32(&mut buf, mean.iter());
    extend_f32(&mut buf, variance.iter());
    buf
}

// ============================================================================
// Helpers
// ============================================================================

fn extend_f32<'a>(buf: &mut Vec<u8>, values: impl Iterator<Item = &'a f32>) {
    for value in values {
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Sequential little-endian `f32` reader over a length-checked buffer.
struct TensorReader<'a> {
    bytes: &'a [u8],
}

impl<'a> TensorReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Take the next `n` values.
    ///
    /// Callers check the total length up front, so running short is a bug.
    fn take(&mut self, n: usize) -> Vec<f32> {
        let (head, rest) = self.bytes.split_at(n * F32_SIZE);
        self.bytes = rest;
        head.chunks_exact(F32_SIZE)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
