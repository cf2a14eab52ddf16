//! Core library for reading a game currency balance from images.
//!
//! This crate provides:
//! - Image classification (digit crop vs full screenshot) and region selection
//! - Preprocessing variant chains (upscale, bilateral, CLAHE, sharpen, Otsu, closing)
//! - Normalization of loosely structured recognition output
//! - Numeric token parsing and currency candidate rules (k/w/万/m, grouped, bare)
//! - Candidate selection and end-to-end orchestration

pub mod currency;
pub mod error;
pub mod input;
pub mod models;
pub mod ocr;

pub use currency::money;
pub use currency::{
    Candidate, CandidateExtractor, CandidateRule, CurrencyExtractor, Extraction,
    ExtractionSource, parse_number, select_candidate,
};
pub use error::{CoinscanError, InputError, OcrError, ParseError, RecognitionError, Result};
pub use input::{ImageInput, load_image};
pub use models::config::CoinscanConfig;
pub use ocr::{
    ImageKind, LazyCapability, RecognitionAdapter, RecognitionCapability, RecognitionMode,
    RecognizedItem, Region, RegionSelector,
};
#[cfg(feature = "native")]
pub use ocr::PureOcrCapability;
