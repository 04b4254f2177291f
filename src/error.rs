use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between an image path and a feature row.
///
/// Degenerate inputs (uniform images, empty masks) are not errors: they are
/// turned into zero-filled feature blocks so batch matrices stay rectangular.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported image size {width}x{height}")]
    UnsupportedImageSize { width: u32, height: u32 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("feature selection is empty")]
    EmptySelection,

    #[error("failed to read parameters from {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("batch cancelled")]
    Cancelled,

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
