//! OCR pipeline: region selection, variant generation and recognition plumbing.

mod adapter;
mod lazy;
mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;
mod region;

pub use adapter::{RecognitionAdapter, normalize_items};
pub use lazy::LazyCapability;
pub use preprocessing::{ImagePreprocessor, Variant, clahe};
#[cfg(feature = "native")]
pub use pure_engine::PureOcrCapability;
pub use region::{ImageKind, PixelRect, PlacedRegion, Region, RegionSelector, intensity_stddev};

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::RecognitionError;

/// Which half of the recognition capability to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionMode {
    /// Locate text lines, then read them. Results carry geometry.
    DetectAndRecognize,
    /// Read the whole image as one line. Results carry no geometry.
    RecognizeOnly,
}

/// An opaque text recognition backend.
///
/// The result is returned as loosely structured JSON because backends
/// disagree on nesting; [`RecognitionAdapter`] owns all interpretation.
pub trait RecognitionCapability {
    /// Run recognition on an image.
    fn recognize(
        &self,
        image: &DynamicImage,
        mode: RecognitionMode,
    ) -> Result<serde_json::Value, RecognitionError>;
}

impl<T: RecognitionCapability + ?Sized> RecognitionCapability for &T {
    fn recognize(
        &self,
        image: &DynamicImage,
        mode: RecognitionMode,
    ) -> Result<serde_json::Value, RecognitionError> {
        (**self).recognize(image, mode)
    }
}

impl<T: RecognitionCapability + ?Sized> RecognitionCapability for Box<T> {
    fn recognize(
        &self,
        image: &DynamicImage,
        mode: RecognitionMode,
    ) -> Result<serde_json::Value, RecognitionError> {
        (**self).recognize(image, mode)
    }
}

impl<T: RecognitionCapability + ?Sized> RecognitionCapability for Arc<T> {
    fn recognize(
        &self,
        image: &DynamicImage,
        mode: RecognitionMode,
    ) -> Result<serde_json::Value, RecognitionError> {
        (**self).recognize(image, mode)
    }
}

/// A recognized text fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedItem {
    /// Recognized text content.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Horizontal center in variant pixels, when the backend localized the text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal_center: Option<f32>,
}

impl RecognizedItem {
    /// Create an item without geometry.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            horizontal_center: None,
        }
    }

    /// Attach a horizontal center.
    pub fn with_center(mut self, center: f32) -> Self {
        self.horizontal_center = Some(center);
        self
    }
}
