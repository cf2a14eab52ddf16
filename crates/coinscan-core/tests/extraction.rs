//! End-to-end extraction scenarios with a scripted recognition capability.

use std::cell::RefCell;

use coinscan_core::{
    CandidateRule, CoinscanConfig, CurrencyExtractor, ExtractionSource, ImageInput, ImageKind,
    RecognitionCapability, RecognitionError, RecognitionMode,
};
use image::{DynamicImage, GrayImage, Luma};
use serde_json::{Value, json};

/// Answers each call from a closure over (variant width, mode, call number).
struct Scripted<F> {
    respond: F,
    calls: RefCell<Vec<(u32, RecognitionMode)>>,
}

impl<F> Scripted<F>
where
    F: Fn(u32, RecognitionMode, usize) -> Result<Value, RecognitionError>,
{
    fn new(respond: F) -> Self {
        Self {
            respond,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn widths(&self) -> Vec<u32> {
        self.calls.borrow().iter().map(|(w, _)| *w).collect()
    }
}

impl<F> RecognitionCapability for Scripted<F>
where
    F: Fn(u32, RecognitionMode, usize) -> Result<Value, RecognitionError>,
{
    fn recognize(
        &self,
        image: &DynamicImage,
        mode: RecognitionMode,
    ) -> Result<Value, RecognitionError> {
        let call = {
            let mut calls = self.calls.borrow_mut();
            calls.push((image.width(), mode));
            calls.len() - 1
        };
        (self.respond)(image.width(), mode, call)
    }
}

fn checkerboard(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Luma([0])
        } else {
            Luma([255])
        }
    }))
}

fn blank(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([40])))
}

/// Width of the screenshot variants generated for region `index`.
fn variant_width(index: usize, width: u32, height: u32) -> u32 {
    let config = CoinscanConfig::default();
    config.regions.boxes[index]
        .to_pixels(width, height)
        .expect("region fits")
        .width
        * 3
}

/// A detect+recognize page with one fragment centered at `center`.
fn localized(text: &str, center: f32) -> Value {
    json!([[[
        [[center - 10.0, 0.0], [center + 10.0, 0.0], [center + 10.0, 20.0], [center - 10.0, 20.0]],
        [text, 0.9]
    ]]])
}

fn empty_page() -> Value {
    json!([[]])
}

#[test]
fn digit_crop_reads_unit_tagged_value() {
    let capability = Scripted::new(|_, mode, _| {
        assert_eq!(mode, RecognitionMode::RecognizeOnly);
        Ok(json!([[["12345k", 0.92]]]))
    });
    let extractor = CurrencyExtractor::new(capability);

    let report = extractor.extract_image(&blank(300, 80));
    assert_eq!(report.kind, ImageKind::DirectDigits);
    assert_eq!(report.raw, Some(12_345_000));
    assert_eq!(report.candidates[0].rule, CandidateRule::UnitTagged);
}

#[test]
fn screenshot_stops_at_first_productive_region() {
    let (w, h) = (800, 450);
    let first = variant_width(0, w, h);
    let second = variant_width(1, w, h);
    let third = variant_width(2, w, h);

    let capability = Scripted::new(move |width, _, _| {
        if width == second {
            Ok(json!([[
                [[[0.1 * width as f32, 0.0], [0.3 * width as f32, 0.0], [0.3 * width as f32, 20.0], [0.1 * width as f32, 20.0]], ["8,650", 0.88]],
                [[[0.7 * width as f32, 0.0], [0.9 * width as f32, 0.0], [0.9 * width as f32, 20.0], [0.7 * width as f32, 20.0]], ["3w", 0.95]]
            ]]))
        } else {
            Ok(empty_page())
        }
    });
    let extractor = CurrencyExtractor::new(capability);

    let report = extractor.extract_image(&checkerboard(w, h));
    assert_eq!(report.kind, ImageKind::FullScreenshot);
    assert_eq!(report.raw, Some(86_500_000));
    assert!(matches!(
        report.source,
        Some(ExtractionSource::Region { index: 1, .. })
    ));

    let widths = extractor.capability().widths();
    assert_eq!(widths.iter().filter(|w| **w == first).count(), 8);
    assert_eq!(widths.iter().filter(|w| **w == second).count(), 8);
    assert!(!widths.contains(&third));
}

#[test]
fn growth_marker_is_not_a_balance() {
    let (w, h) = (800, 450);
    let first = variant_width(0, w, h);

    let capability = Scripted::new(move |width, _, _| {
        if width == first {
            Ok(localized("647,736+", 100.0))
        } else {
            Ok(localized("2,500", 50.0))
        }
    });
    let extractor = CurrencyExtractor::new(capability);

    let report = extractor.extract_image(&checkerboard(w, h));
    assert_eq!(report.raw, Some(25_000_000));
    assert!(matches!(
        report.source,
        Some(ExtractionSource::Region { index: 1, .. })
    ));
}

#[test]
fn blank_image_yields_none() {
    let capability = Scripted::new(|_, _, _| Ok(empty_page()));
    let extractor = CurrencyExtractor::new(capability);

    let report = extractor.extract_image(&blank(600, 300));
    assert_eq!(report.kind, ImageKind::DirectDigits);
    assert_eq!(report.raw, None);
    assert!(report.source.is_none());
}

#[test]
fn digit_crop_falls_through_to_regions() {
    let capability = Scripted::new(|_, mode, _| match mode {
        RecognitionMode::RecognizeOnly => Ok(empty_page()),
        RecognitionMode::DetectAndRecognize => Ok(localized("5k", 30.0)),
    });
    let extractor = CurrencyExtractor::new(capability);

    let report = extractor.extract_image(&blank(200, 60));
    assert_eq!(report.kind, ImageKind::DirectDigits);
    assert_eq!(report.raw, Some(5_000));
    assert!(matches!(
        report.source,
        Some(ExtractionSource::Region { index: 0, .. })
    ));
}

#[test]
fn failing_variant_is_skipped() {
    let capability = Scripted::new(|_, _, call| {
        if call == 0 {
            Err(RecognitionError::Malformed("scripted failure".to_string()))
        } else {
            Ok(localized("8,650", 40.0))
        }
    });
    let extractor = CurrencyExtractor::new(capability);

    let report = extractor.extract_image(&checkerboard(800, 450));
    assert_eq!(report.raw, Some(86_500_000));
    assert!(matches!(
        report.source,
        Some(ExtractionSource::Region { index: 0, .. })
    ));
    assert_eq!(report.candidates.len(), 7);
}

#[test]
fn unavailable_capability_yields_none() {
    let capability = Scripted::new(|_, _, _| {
        Err(RecognitionError::Unavailable("no models".to_string()))
    });
    let extractor = CurrencyExtractor::new(capability);

    assert_eq!(extractor.extract_image(&checkerboard(800, 450)).raw, None);
}

#[test]
fn extraction_is_idempotent() {
    let capability = Scripted::new(|_, _, _| Ok(localized("1,234,567", 60.0)));
    let extractor = CurrencyExtractor::new(capability);
    let image = checkerboard(800, 450);

    let first = extractor.extract_image(&image);
    let second = extractor.extract_image(&image);
    assert_eq!(first.raw, Some(1_230_000));
    assert_eq!(first.raw, second.raw);
    assert_eq!(first.source, second.source);
}

#[test]
fn missing_file_yields_none() {
    let capability = Scripted::new(|_, _, _| Ok(json!([[["100k", 0.9]]])));
    let extractor = CurrencyExtractor::new(capability);

    assert_eq!(extractor.extract_path("/nonexistent/balance.png"), None);

    let record: ImageInput =
        serde_json::from_value(json!({"name": "/nonexistent/balance.png"})).unwrap();
    assert_eq!(extractor.extract(&record), None);
    assert!(extractor.capability().widths().is_empty());
}

#[test]
fn reads_image_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("digits.png");
    blank(150, 50).save(&path).unwrap();

    let capability = Scripted::new(|_, _, _| Ok(json!([[["3.2w", 0.9]]])));
    let extractor = CurrencyExtractor::new(capability);

    assert_eq!(extractor.extract_path(&path), Some(32_000));
}
