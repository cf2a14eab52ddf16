//! Error types for the coinscan-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the coinscan library.
#[derive(Error, Debug)]
pub enum CoinscanError {
    /// Input resolution or decoding error.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning an input into pixels.
///
/// These are the only conditions that short-circuit an extraction.
#[derive(Error, Debug)]
pub enum InputError {
    /// The input carries no usable path.
    #[error("input does not resolve to a path")]
    Unresolvable,

    /// The resolved path does not exist or cannot be read.
    #[error("image not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but its bytes are not a decodable image.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Errors reported by a recognition capability for a single call.
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The capability could not run (not initialized, inference failure).
    #[error("recognition unavailable: {0}")]
    Unavailable(String),

    /// Failed to load recognition models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The capability returned data of an unknown shape.
    #[error("malformed recognition result: {0}")]
    Malformed(String),
}

/// Errors related to the OCR pipeline itself.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Fractional region violates `0 <= x1 < x2 <= 1` or `0 <= y1 < y2 <= 1`.
    #[error("invalid region: {0}")]
    InvalidRegion(String),
}

/// A token that cannot be coerced to a number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing left after trimming.
    #[error("empty numeric token")]
    Empty,

    /// Neither a grouped integer nor a plain decimal.
    #[error("invalid numeric token: {0:?}")]
    InvalidNumber(String),
}

/// Result type for the coinscan library.
pub type Result<T> = std::result::Result<T, CoinscanError>;
