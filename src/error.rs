//! Failure kinds with a fixed shape.
//!
//! Everything else travels as `anyhow::Error` with context attached at the
//! call site.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Failed to load image {path:?}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Model produced no embedding output")]
    NoOutput,

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding has zero or non-finite norm")]
    ZeroNorm,

    #[error("Model file {path:?} is missing and downloads are disabled")]
    ModelUnavailable { path: PathBuf },
}
