//! Image classification and screenshot region priority.

use image::{DynamicImage, GenericImageView, GrayImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::RegionConfig;

/// A rectangle in fractional (0-1) image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Absolute pixel bounds of a region on a concrete image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Create a region, checking its invariants.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self, OcrError> {
        let region = Self::new_unchecked(x1, y1, x2, y2);
        region.validate()?;
        Ok(region)
    }

    pub(crate) const fn new_unchecked(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Check `0 <= x1 < x2 <= 1` and `0 <= y1 < y2 <= 1`.
    pub fn validate(&self) -> Result<(), OcrError> {
        let ordered = |lo: f32, hi: f32| (0.0..=1.0).contains(&lo) && lo < hi && hi <= 1.0;
        if ordered(self.x1, self.x2) && ordered(self.y1, self.y2) {
            Ok(())
        } else {
            Err(OcrError::InvalidRegion(format!(
                "({}, {}, {}, {})",
                self.x1, self.y1, self.x2, self.y2
            )))
        }
    }

    /// Convert to pixel bounds, truncating and clamping to the image.
    ///
    /// Returns `None` when the region collapses to zero pixels.
    pub fn to_pixels(&self, width: u32, height: u32) -> Option<PixelRect> {
        let scale = |frac: f32, size: u32| ((size as f64 * frac as f64) as u32).min(size);

        let x1 = scale(self.x1, width);
        let y1 = scale(self.y1, height);
        let x2 = scale(self.x2, width);
        let y2 = scale(self.y2, height);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(PixelRect {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        })
    }
}

impl PixelRect {
    /// Crop this rectangle out of an image.
    pub fn crop(&self, image: &DynamicImage) -> DynamicImage {
        image.crop_imm(self.x, self.y, self.width, self.height)
    }
}

/// How an input image should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    /// Already a tight crop of the digits.
    DirectDigits,
    /// A complete UI screenshot needing localization.
    FullScreenshot,
}

/// A region placed on a concrete image, with its priority index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedRegion {
    pub index: usize,
    pub region: Region,
    pub rect: PixelRect,
}

/// Decides between the digit-crop and screenshot paths and lists screenshot regions.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    direct_max_width: u32,
    direct_max_height: u32,
    direct_max_stddev: f32,
    regions: Vec<Region>,
}

impl RegionSelector {
    /// Create a selector with the default tuning.
    pub fn new() -> Self {
        Self::from_config(&RegionConfig::default())
    }

    /// Create a selector from configuration.
    pub fn from_config(config: &RegionConfig) -> Self {
        Self {
            direct_max_width: config.direct_max_width,
            direct_max_height: config.direct_max_height,
            direct_max_stddev: config.direct_max_stddev,
            regions: config.boxes.clone(),
        }
    }

    /// Classify an image as a digit crop or a full screenshot.
    pub fn classify(&self, image: &DynamicImage) -> ImageKind {
        let (width, height) = image.dimensions();
        if width <= self.direct_max_width && height <= self.direct_max_height {
            return ImageKind::DirectDigits;
        }

        let stddev = intensity_stddev(&image.to_luma8());
        debug!("Intensity stddev {:.2} for {}x{}", stddev, width, height);

        if stddev < self.direct_max_stddev as f64 {
            ImageKind::DirectDigits
        } else {
            ImageKind::FullScreenshot
        }
    }

    /// Regions to scan on this image, in priority order.
    ///
    /// Regions that truncate to zero pixels on this image are left out.
    pub fn regions_for(&self, image: &DynamicImage) -> Vec<PlacedRegion> {
        let (width, height) = image.dimensions();
        self.regions
            .iter()
            .enumerate()
            .filter_map(|(index, region)| {
                region.to_pixels(width, height).map(|rect| PlacedRegion {
                    index,
                    region: *region,
                    rect,
                })
            })
            .collect()
    }
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// Population standard deviation of grayscale intensities.
pub fn intensity_stddev(gray: &GrayImage) -> f64 {
    let count = gray.width() as f64 * gray.height() as f64;
    if count == 0.0 {
        return 0.0;
    }

    let (sum, sum_sq) = gray.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p[0] as f64;
        (s + v, sq + v * v)
    });

    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(width, height, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        }))
    }

    #[test]
    fn test_small_image_is_direct() {
        let selector = RegionSelector::new();
        assert_eq!(selector.classify(&checkerboard(500, 200)), ImageKind::DirectDigits);
    }

    #[test]
    fn test_plain_large_image_is_direct() {
        let selector = RegionSelector::new();
        let plain = DynamicImage::ImageLuma8(GrayImage::from_pixel(1280, 720, Luma([30])));
        assert_eq!(selector.classify(&plain), ImageKind::DirectDigits);
    }

    #[test]
    fn test_textured_large_image_is_screenshot() {
        let selector = RegionSelector::new();
        assert_eq!(selector.classify(&checkerboard(1280, 720)), ImageKind::FullScreenshot);
        // Wide but short still counts as a screenshot when textured.
        assert_eq!(selector.classify(&checkerboard(501, 100)), ImageKind::FullScreenshot);
    }

    #[test]
    fn test_stddev() {
        let flat = GrayImage::from_pixel(10, 10, Luma([77]));
        assert_eq!(intensity_stddev(&flat), 0.0);

        let board = checkerboard(64, 64).to_luma8();
        assert!((intensity_stddev(&board) - 127.5).abs() < 1e-9);
    }

    #[test]
    fn test_region_validation() {
        assert!(Region::new(0.68, 0.0, 0.86, 0.16).is_ok());
        assert!(Region::new(0.5, 0.0, 0.5, 0.1).is_err());
        assert!(Region::new(0.1, 0.2, 0.3, 1.2).is_err());
        assert!(Region::new(-0.1, 0.0, 0.3, 0.2).is_err());
    }

    #[test]
    fn test_to_pixels_truncates() {
        let region = Region::new(0.68, 0.0, 0.86, 0.16).unwrap();
        let rect = region.to_pixels(1920, 1080).unwrap();
        assert_eq!(rect, PixelRect { x: 1305, y: 0, width: 346, height: 172 });

        // Collapses on a tiny image.
        assert_eq!(region.to_pixels(2, 2), None);
    }

    #[test]
    fn test_regions_for_keeps_priority_order() {
        let selector = RegionSelector::new();
        let placed = selector.regions_for(&checkerboard(800, 450));
        let indices: Vec<usize> = placed.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(placed[0].rect.width < placed[1].rect.width);
        assert!(placed[1].rect.width < placed[2].rect.width);
    }
}
