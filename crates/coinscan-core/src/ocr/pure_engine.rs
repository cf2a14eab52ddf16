//! Recognition capability backed by `pure-onnx-ocr`.

use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use pure_onnx_ocr::engine::{OcrEngine, OcrEngineBuilder};
use pure_onnx_ocr::{
    RecDictionary, RecInferenceSession, RecPostProcessor, RecPostProcessorConfig,
    RecPreProcessor, RecPreProcessorConfig, RecTextRegion,
};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::RecognitionError;
use crate::models::config::ModelConfig;

use super::{RecognitionCapability, RecognitionMode};

/// PaddleOCR models run through `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// Detect+recognize runs the full engine. Recognize-only skips detection and
/// feeds the whole image to the recognizer as a single text line.
pub struct PureOcrCapability {
    engine: OcrEngine,
    line: LineRecognizer,
}

/// Recognition stage alone, for images that are already one text line.
struct LineRecognizer {
    preprocessor: RecPreProcessor,
    session: RecInferenceSession,
    postprocessor: RecPostProcessor,
}

/// One recognized fragment, already reduced to what the output shapes need.
struct Fragment {
    quad: [[f32; 2]; 4],
    text: String,
    confidence: f32,
}

/// The two ways a backend can read an image.
trait TextReader {
    /// Locate text lines, then read each one.
    fn read_lines(&self, image: &DynamicImage) -> Result<Vec<Fragment>, RecognitionError>;

    /// Read the whole image as one line, without detection.
    fn read_whole(&self, image: &DynamicImage) -> Result<Option<(String, f32)>, RecognitionError>;
}

impl PureOcrCapability {
    /// Load detection and recognition models from the configured directory.
    pub fn from_config(models: &ModelConfig) -> Result<Self, RecognitionError> {
        let det_path = models.path(&models.detection_model);
        let rec_path = models.path(&models.recognition_model);
        let dict_path = models.path(&models.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(RecognitionError::ModelLoad(format!(
                    "{} not found",
                    path.display()
                )));
            }
        }

        let engine = OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| RecognitionError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        let session = RecInferenceSession::load(&rec_path).map_err(|e| {
            RecognitionError::ModelLoad(format!("{}: {}", rec_path.display(), e))
        })?;
        let dictionary = RecDictionary::from_path(&dict_path).map_err(|e| {
            RecognitionError::ModelLoad(format!("{}: {}", dict_path.display(), e))
        })?;
        let postprocessor = RecPostProcessor::new(
            Arc::new(dictionary),
            RecPostProcessorConfig::default(),
        );

        info!("Loaded pure-onnx-ocr engine from {}", models.model_dir.display());

        Ok(Self {
            engine,
            line: LineRecognizer {
                preprocessor: RecPreProcessor::new(RecPreProcessorConfig::default()),
                session,
                postprocessor,
            },
        })
    }
}

impl TextReader for PureOcrCapability {
    fn read_lines(&self, image: &DynamicImage) -> Result<Vec<Fragment>, RecognitionError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| RecognitionError::Unavailable(format!("pure-onnx-ocr: {}", e)))?;

        debug!(
            "pure-onnx-ocr returned {} fragments for {}x{} in {}ms",
            results.len(),
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(results
            .iter()
            .map(|r| Fragment {
                quad: polygon_to_quad(&r.bounding_box),
                text: r.text.replace("[UNK]", ""),
                confidence: r.confidence,
            })
            .collect())
    }

    fn read_whole(&self, image: &DynamicImage) -> Result<Option<(String, f32)>, RecognitionError> {
        let (width, height) = image.dimensions();
        let region = RecTextRegion {
            x: 0,
            y: 0,
            width,
            height,
        };
        let unavailable =
            |e: String| RecognitionError::Unavailable(format!("pure-onnx-ocr: {}", e));

        let batch = self
            .line
            .preprocessor
            .process(image, &[region])
            .map_err(|e| unavailable(e.to_string()))?;
        let output = self
            .line
            .session
            .run(&batch)
            .map_err(|e| unavailable(e.to_string()))?;
        let sequences = self
            .line
            .postprocessor
            .process(&output)
            .map_err(|e| unavailable(e.to_string()))?;

        Ok(sequences
            .into_iter()
            .next()
            .map(|seq| (seq.text.replace("[UNK]", ""), seq.confidence)))
    }
}

impl RecognitionCapability for PureOcrCapability {
    fn recognize(
        &self,
        image: &DynamicImage,
        mode: RecognitionMode,
    ) -> Result<Value, RecognitionError> {
        read_page(self, image, mode)
    }
}

fn read_page<R: TextReader>(
    reader: &R,
    image: &DynamicImage,
    mode: RecognitionMode,
) -> Result<Value, RecognitionError> {
    match mode {
        RecognitionMode::DetectAndRecognize => {
            Ok(detect_and_recognize_page(&reader.read_lines(image)?))
        }
        RecognitionMode::RecognizeOnly => Ok(recognize_only_page(reader.read_whole(image)?)),
    }
}

/// `[[ [quad, [text, score]], ... ]]`
fn detect_and_recognize_page(fragments: &[Fragment]) -> Value {
    let page: Vec<Value> = fragments
        .iter()
        .map(|f| json!([f.quad, [f.text, f.confidence]]))
        .collect();
    json!([page])
}

/// `[[ [text, score] ]]`, or an empty page when nothing was read.
fn recognize_only_page(line: Option<(String, f32)>) -> Value {
    match line {
        Some((text, confidence)) if !text.trim().is_empty() => json!([[[text, confidence]]]),
        _ => json!([[]]),
    }
}

/// First four exterior points of the detection polygon.
fn polygon_to_quad(polygon: &pure_onnx_ocr::Polygon<f64>) -> [[f32; 2]; 4] {
    let mut quad = [[0.0f32; 2]; 4];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        quad[i] = [coord.x as f32, coord.y as f32];
    }
    quad
}
