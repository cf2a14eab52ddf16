//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoinscanError, Result};
use crate::ocr::Region;

/// Main configuration for the coinscan pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinscanConfig {
    /// Image classification and region priority list.
    pub regions: RegionConfig,

    /// Variant generation tuning.
    pub preprocessing: PreprocessConfig,

    /// Confidence floors per recognition mode.
    pub recognition: RecognitionConfig,

    /// Candidate rule ceilings.
    pub candidates: CandidateConfig,

    /// Model configuration.
    pub models: ModelConfig,

    /// Write every generated variant here as PNG when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_dir: Option<PathBuf>,
}

/// Region selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Images at most this wide (and at most `direct_max_height` tall) are digit crops.
    pub direct_max_width: u32,

    /// Height limit paired with `direct_max_width`.
    pub direct_max_height: u32,

    /// Grayscale standard deviation below which an image counts as plain background.
    pub direct_max_stddev: f32,

    /// Fractional boxes tried in order on full screenshots, tightest first.
    pub boxes: Vec<Region>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            direct_max_width: 500,
            direct_max_height: 200,
            direct_max_stddev: 40.0,
            boxes: vec![
                Region::new_unchecked(0.68, 0.00, 0.86, 0.16),
                Region::new_unchecked(0.64, 0.00, 0.88, 0.18),
                Region::new_unchecked(0.60, 0.00, 0.90, 0.20),
            ],
        }
    }
}

/// Preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Magnification applied to screenshot regions.
    pub screenshot_scale: f32,

    /// Magnification applied to digit crops.
    pub direct_scale: f32,

    /// Bilateral filter radius (7 pixel diameter at 3).
    pub bilateral_radius: u32,

    /// Bilateral filter intensity sigma.
    pub bilateral_sigma_color: f32,

    /// Bilateral filter spatial sigma.
    pub bilateral_sigma_space: f32,

    /// CLAHE clip limit, relative to a uniform histogram.
    pub clahe_clip_limit: f32,

    /// CLAHE tiles per axis.
    pub clahe_grid: u32,

    /// Morphological closing radius (3x3 square at 1).
    pub close_radius: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            screenshot_scale: 3.0,
            direct_scale: 4.0,
            bilateral_radius: 3,
            bilateral_sigma_color: 40.0,
            bilateral_sigma_space: 40.0,
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
            close_radius: 1,
        }
    }
}

/// Recognition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Confidence floor for detect+recognize results.
    pub localized_min_confidence: f32,

    /// Confidence floor for recognize-only results on digit crops.
    pub direct_min_confidence: f32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            localized_min_confidence: 0.2,
            direct_min_confidence: 0.08,
        }
    }
}

/// Candidate rule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    /// Largest grouped bare number accepted.
    pub grouped_ceiling: u64,

    /// Grouped values from here up are full integers rounded to the nearest w.
    pub grouped_full_integer_floor: u64,

    /// Largest bare number accepted by the fallback rule (read as k).
    pub bare_ceiling: f64,

    /// Largest raw amount a unit-tagged token may produce.
    pub unit_tagged_ceiling: u64,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            grouped_ceiling: 9_999_999,
            grouped_full_integer_floor: 100_000,
            bare_ceiling: 200_000.0,
            unit_tagged_ceiling: 1_000_000_000_000,
        }
    }
}

/// Model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "rec.onnx".to_string(),
            dictionary: "dict.txt".to_string(),
        }
    }
}

impl ModelConfig {
    /// Get full path to a model file.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.model_dir.join(file_name)
    }
}

impl CoinscanConfig {
    /// Load configuration from a JSON file and validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| CoinscanError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CoinscanError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check region invariants and tuning values.
    pub fn validate(&self) -> Result<()> {
        if self.regions.boxes.is_empty() {
            return Err(CoinscanError::Config(
                "regions.boxes must contain at least one region".to_string(),
            ));
        }
        for (i, region) in self.regions.boxes.iter().enumerate() {
            region
                .validate()
                .map_err(|e| CoinscanError::Config(format!("regions.boxes[{}]: {}", i, e)))?;
        }

        let p = &self.preprocessing;
        if !(p.screenshot_scale > 0.0 && p.direct_scale > 0.0) {
            return Err(CoinscanError::Config(
                "preprocessing scales must be positive".to_string(),
            ));
        }
        if p.clahe_grid == 0 {
            return Err(CoinscanError::Config(
                "preprocessing.clahe_grid must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
