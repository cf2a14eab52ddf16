//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod extract;

use std::path::{Path, PathBuf};

use anyhow::Context;
use coinscan_core::{
    CoinscanConfig, CurrencyExtractor, ExtractionSource, LazyCapability, PureOcrCapability,
    RecognitionError,
};

type Init = Box<dyn Fn() -> Result<PureOcrCapability, RecognitionError>>;

/// Native capability, loaded on the first recognition call.
pub type NativeCapability = LazyCapability<PureOcrCapability, Init>;

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("coinscan")
        .join("config.json")
}

/// Load the explicit config file, else the default one if present, else defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<CoinscanConfig> {
    if let Some(path) = path {
        return Ok(CoinscanConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        Ok(CoinscanConfig::from_file(&default_path)?)
    } else {
        Ok(CoinscanConfig::default())
    }
}

/// Build an extractor backed by the native models named in `config`.
///
/// The models are loaded here so a missing or broken model directory fails
/// the command instead of reading as "not found".
pub fn native_extractor(
    config: &CoinscanConfig,
) -> anyhow::Result<CurrencyExtractor<NativeCapability>> {
    let models = config.models.clone();
    let init: Init = Box::new(move || PureOcrCapability::from_config(&models));
    let extractor = CurrencyExtractor::from_config(LazyCapability::new(init), config);

    extractor.capability().get().with_context(|| {
        format!(
            "Cannot load OCR models from {}",
            config.models.model_dir.display()
        )
    })?;

    Ok(extractor)
}

/// Short label for where a value came from.
pub fn describe_source(source: Option<&ExtractionSource>) -> String {
    match source {
        Some(ExtractionSource::DirectDigits { variant }) => format!("direct:{}", variant),
        Some(ExtractionSource::Region { index, .. }) => format!("region:{}", index),
        None => String::new(),
    }
}
