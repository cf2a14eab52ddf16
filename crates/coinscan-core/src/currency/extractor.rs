//! End-to-end extraction: load, classify, scan regions, select.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::input::{ImageInput, load_image};
use crate::models::config::CoinscanConfig;
use crate::ocr::{
    ImageKind, ImagePreprocessor, RecognitionAdapter, RecognitionCapability, RecognizedItem,
    Region, RegionSelector, Variant,
};

use super::{Candidate, CandidateExtractor, select_candidate};

/// Where the winning reading came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ExtractionSource {
    /// The whole image read as a digit crop.
    DirectDigits { variant: String },
    /// A screenshot region, by priority index.
    Region { index: usize, region: Region },
}

/// Full report of one extraction.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// Selected amount in raw units.
    pub raw: Option<u64>,
    /// How the image was classified.
    pub kind: ImageKind,
    /// Which path produced `raw`.
    pub source: Option<ExtractionSource>,
    /// Every candidate that took part in the final selection.
    pub candidates: Vec<Candidate>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Reads a currency balance from game screenshots or digit crops.
///
/// Stateless between calls: the same image and capability always give the
/// same answer. Not meant to be shared across threads while a lazily
/// initialized capability is still loading.
pub struct CurrencyExtractor<C> {
    selector: RegionSelector,
    preprocessor: ImagePreprocessor,
    adapter: RecognitionAdapter<C>,
    candidates: CandidateExtractor,
    debug_dir: Option<PathBuf>,
}

impl<C: RecognitionCapability> CurrencyExtractor<C> {
    /// Create an extractor with the default tuning.
    pub fn new(capability: C) -> Self {
        Self::from_config(capability, &CoinscanConfig::default())
    }

    /// Create an extractor from configuration.
    pub fn from_config(capability: C, config: &CoinscanConfig) -> Self {
        Self {
            selector: RegionSelector::from_config(&config.regions),
            preprocessor: ImagePreprocessor::from_config(&config.preprocessing),
            adapter: RecognitionAdapter::from_config(capability, &config.recognition),
            candidates: CandidateExtractor::from_config(&config.candidates),
            debug_dir: config.debug_dir.clone(),
        }
    }

    /// Write every generated variant to `dir` as PNG.
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    /// The underlying recognition capability.
    pub fn capability(&self) -> &C {
        self.adapter.capability()
    }

    /// Extract the amount from an image reference.
    ///
    /// Returns `None` when the input cannot be loaded or nothing plausible
    /// was read. Never fails otherwise.
    pub fn extract(&self, input: &ImageInput) -> Option<u64> {
        match self.try_extract(input) {
            Ok(report) => report.raw,
            Err(e) => {
                warn!("Skipping extraction: {}", e);
                None
            }
        }
    }

    /// Load an image reference and run the pipeline, surfacing load failures.
    pub fn try_extract(&self, input: &ImageInput) -> crate::Result<Extraction> {
        let image = load_image(input)?;
        Ok(self.extract_image(&image))
    }

    /// Extract the amount from an image file.
    pub fn extract_path(&self, path: impl AsRef<Path>) -> Option<u64> {
        self.extract(&ImageInput::from(path.as_ref()))
    }

    /// Run the pipeline on decoded pixels and report how the answer was found.
    pub fn extract_image(&self, image: &DynamicImage) -> Extraction {
        let start = Instant::now();
        let kind = self.selector.classify(image);
        info!(
            "Extracting from {}x{} image classified as {:?}",
            image.width(),
            image.height(),
            kind
        );

        let mut report = Extraction {
            raw: None,
            kind,
            source: None,
            candidates: Vec::new(),
            processing_time_ms: 0,
        };

        let found = match kind {
            ImageKind::DirectDigits => self
                .read_direct(image)
                .or_else(|| {
                    debug!("Digit crop produced nothing, scanning regions");
                    self.scan_regions(image)
                }),
            ImageKind::FullScreenshot => self.scan_regions(image),
        };

        if let Some((raw, source, candidates)) = found {
            info!("Selected {} from {:?}", raw, source);
            report.raw = Some(raw);
            report.source = Some(source);
            report.candidates = candidates;
        } else {
            info!("No amount found");
        }

        report.processing_time_ms = start.elapsed().as_millis() as u64;
        report
    }

    /// Recognize-only over the digit-crop variants. The first variant with a
    /// candidate wins, taking its largest value.
    fn read_direct(&self, image: &DynamicImage) -> Option<(u64, ExtractionSource, Vec<Candidate>)> {
        let variants = match self.preprocessor.variants_for(image, ImageKind::DirectDigits) {
            Ok(variants) => variants,
            Err(e) => {
                warn!("Digit crop preprocessing failed: {}", e);
                return None;
            }
        };

        for variant in &variants {
            self.dump_variant("direct", variant);

            let items = self.adapter.recognize_direct(variant);
            let candidates = self.positive_candidates(&items, variant);
            debug!(
                "Direct variant {}: {} items, {} candidates",
                variant.name,
                items.len(),
                candidates.len()
            );

            if let Some(raw) = candidates.iter().map(|c| c.raw_value).max() {
                let source = ExtractionSource::DirectDigits {
                    variant: variant.name.to_string(),
                };
                return Some((raw, source, candidates));
            }
        }

        None
    }

    /// Scan regions in priority order. The first region with any candidate
    /// is decisive; candidates from all of its variants are pooled.
    fn scan_regions(&self, image: &DynamicImage) -> Option<(u64, ExtractionSource, Vec<Candidate>)> {
        for placed in self.selector.regions_for(image) {
            let crop = placed.rect.crop(image);
            let variants = match self
                .preprocessor
                .variants_for(&crop, ImageKind::FullScreenshot)
            {
                Ok(variants) => variants,
                Err(e) => {
                    warn!("Region {} preprocessing failed: {}", placed.index, e);
                    continue;
                }
            };

            let mut pooled = Vec::new();
            for variant in &variants {
                self.dump_variant(&format!("region{}", placed.index), variant);

                let items = self.adapter.recognize_localized(variant);
                if items.is_empty() {
                    continue;
                }
                pooled.extend(self.positive_candidates(&items, variant));
            }

            debug!(
                "Region {} ({:?}): {} candidates",
                placed.index,
                placed.rect,
                pooled.len()
            );

            if let Some(raw) = select_candidate(&pooled) {
                let source = ExtractionSource::Region {
                    index: placed.index,
                    region: placed.region,
                };
                return Some((raw, source, pooled));
            }
        }

        None
    }

    fn positive_candidates(
        &self,
        items: &[RecognizedItem],
        variant: &Variant,
    ) -> Vec<Candidate> {
        let mut candidates = self
            .candidates
            .extract_candidates(items, variant.image.width());
        candidates.retain(|c| c.raw_value > 0);
        candidates
    }

    fn dump_variant(&self, prefix: &str, variant: &Variant) {
        let Some(dir) = &self.debug_dir else {
            return;
        };

        let path = dir.join(format!("{}_{}.png", prefix, variant.name));
        let saved = std::fs::create_dir_all(dir)
            .map_err(image::ImageError::IoError)
            .and_then(|_| variant.image.save(&path));

        if let Err(e) = saved {
            warn!("Failed to write debug image {}: {}", path.display(), e);
        }
    }
}
