//! Binary model I/O and result reporting.
//!
//! - [`native`]: the flat model blob and the mean/variance blob
//! - [`report`]: prediction streams and run summaries written after evaluation

mod error;
pub mod native;
pub mod report;

pub use error::{Blob, ReadError};
pub use native::{
    read_mean_var, read_model, write_mean_var, write_model, ModelHeader, FORMAT_VERSION,
    HEADER_SIZE, MAGIC,
};
