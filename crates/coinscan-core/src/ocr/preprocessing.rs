//! Variant generation for OCR.
//!
//! Which rendering reads best is unpredictable, so every stage of the chain
//! is handed to the recognizer as its own variant.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::filter::{bilateral_filter, filter3x3};
use imageproc::morphology::close;
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::PreprocessConfig;

use super::ImageKind;

/// 3x3 sharpening kernel (identity plus Laplacian).
const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];

/// A named rendering of a pixel region.
#[derive(Debug, Clone)]
pub struct Variant {
    pub name: &'static str,
    pub image: DynamicImage,
}

impl Variant {
    fn gray(name: &'static str, image: GrayImage) -> Self {
        Self {
            name,
            image: DynamicImage::ImageLuma8(image),
        }
    }
}

/// Image preprocessor producing the fixed variant chains.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    screenshot_scale: f32,
    direct_scale: f32,
    bilateral_radius: u32,
    bilateral_sigma_color: f32,
    bilateral_sigma_space: f32,
    clahe_clip_limit: f32,
    clahe_grid: u32,
    close_radius: u8,
}

impl ImagePreprocessor {
    /// Create a preprocessor with the default tuning.
    pub fn new() -> Self {
        Self::from_config(&PreprocessConfig::default())
    }

    /// Create a preprocessor from configuration.
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            screenshot_scale: config.screenshot_scale,
            direct_scale: config.direct_scale,
            bilateral_radius: config.bilateral_radius,
            bilateral_sigma_color: config.bilateral_sigma_color,
            bilateral_sigma_space: config.bilateral_sigma_space,
            clahe_clip_limit: config.clahe_clip_limit,
            clahe_grid: config.clahe_grid,
            close_radius: config.close_radius,
        }
    }

    /// Variants for the given extraction path, in the order they should be tried.
    pub fn variants_for(
        &self,
        region: &DynamicImage,
        kind: ImageKind,
    ) -> Result<Vec<Variant>, OcrError> {
        match kind {
            ImageKind::DirectDigits => self.direct_variants(region),
            ImageKind::FullScreenshot => self.screenshot_variants(region),
        }
    }

    /// Edge-preserving smoothing over a `2 * radius + 1` square window.
    fn smooth(&self, gray: &GrayImage) -> GrayImage {
        bilateral_filter(
            gray,
            2 * self.bilateral_radius + 1,
            self.bilateral_sigma_color,
            self.bilateral_sigma_space,
        )
    }

    /// Full chain for a screenshot region: eight variants.
    pub fn screenshot_variants(&self, region: &DynamicImage) -> Result<Vec<Variant>, OcrError> {
        let big = self.enlarge(region, self.screenshot_scale)?;
        let gray = big.to_luma8();

        let smooth = self.smooth(&gray);
        let equalized = clahe(&smooth, self.clahe_clip_limit, self.clahe_grid);
        let sharp = sharpen(&equalized);

        let binary = otsu_binarize(&sharp);
        let binary_inv = inverted(&binary);
        let closed = close(&binary, Norm::LInf, self.close_radius);
        let closed_inv = inverted(&closed);

        debug!(
            "Generated screenshot variants at {}x{}",
            gray.width(),
            gray.height()
        );

        Ok(vec![
            Variant {
                name: "enlarged",
                image: big,
            },
            Variant::gray("gray_bilateral", smooth),
            Variant::gray("gray_clahe", equalized),
            Variant::gray("gray_sharp", sharp),
            Variant::gray("binary_otsu", binary),
            Variant::gray("binary_otsu_inv", binary_inv),
            Variant::gray("binary_closed", closed),
            Variant::gray("binary_closed_inv", closed_inv),
        ])
    }

    /// Reduced chain for a digit crop: four variants.
    pub fn direct_variants(&self, image: &DynamicImage) -> Result<Vec<Variant>, OcrError> {
        let big = self.enlarge(image, self.direct_scale)?;
        let gray = sharpen(&big.to_luma8());
        let inv = inverted(&gray);

        let binary = otsu_binarize(&gray);
        let binary_inv = otsu_binarize(&inv);

        Ok(vec![
            Variant::gray("gray_sharp", gray),
            Variant::gray("gray_inv", inv),
            Variant::gray("binary_otsu", binary),
            Variant::gray("binary_otsu_inv", binary_inv),
        ])
    }

    /// Upscale with cubic interpolation.
    fn enlarge(&self, image: &DynamicImage, scale: f32) -> Result<DynamicImage, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::Preprocessing(format!(
                "empty region {}x{}",
                width, height
            )));
        }

        let new_width = ((width as f32 * scale).round() as u32).max(1);
        let new_height = ((height as f32 * scale).round() as u32).max(1);

        Ok(image.resize_exact(new_width, new_height, FilterType::CatmullRom))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn sharpen(gray: &GrayImage) -> GrayImage {
    filter3x3::<_, f32, u8>(gray, &SHARPEN_KERNEL)
}

/// Global Otsu threshold: pixels above the level become white.
fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    threshold(gray, otsu_level(gray))
}

fn inverted(gray: &GrayImage) -> GrayImage {
    let mut out = gray.clone();
    imageops::invert(&mut out);
    out
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `grid` x `grid` mesh of tiles; each tile gets a
/// clipped-histogram equalization table and pixels blend the tables of the
/// four nearest tile centers.
pub fn clahe(gray: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let grid = grid.max(1);
    let tile_w = width.div_ceil(grid.min(width));
    let tile_h = height.div_ceil(grid.min(height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }

            let area = (x1 - x0) * (y1 - y0);
            luts.push(clipped_equalization(&mut hist, area, clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32, v: usize| luts[(ty * tiles_x + tx) as usize][v] as f32;

    GrayImage::from_fn(width, height, |x, y| {
        let v = gray.get_pixel(x, y)[0] as usize;

        let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;

        let tx0 = fx.floor().clamp(0.0, (tiles_x - 1) as f32) as u32;
        let ty0 = fy.floor().clamp(0.0, (tiles_y - 1) as f32) as u32;
        let tx1 = (tx0 + 1).min(tiles_x - 1);
        let ty1 = (ty0 + 1).min(tiles_y - 1);

        let ax = (fx - tx0 as f32).clamp(0.0, 1.0);
        let ay = (fy - ty0 as f32).clamp(0.0, 1.0);

        let top = lut_at(tx0, ty0, v) * (1.0 - ax) + lut_at(tx1, ty0, v) * ax;
        let bottom = lut_at(tx0, ty1, v) * (1.0 - ax) + lut_at(tx1, ty1, v) * ax;

        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

/// Clip a tile histogram, spread the excess evenly and build its CDF table.
fn clipped_equalization(hist: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);

    let mut excess = 0u32;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let bonus = excess / 256;
    let residual = (excess % 256) as usize;
    for (i, count) in hist.iter_mut().enumerate() {
        *count += bonus + u32::from(i < residual);
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (i, count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * 255.0 / area as f32).round().min(255.0) as u8;
    }
    lut
}
