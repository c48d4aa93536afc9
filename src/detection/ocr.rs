use image::DynamicImage;
pub use ocrs::{ImageSource, OcrEngine}; // Re-export for use in other modules
use ocrs::{OcrEngineParams, TextItem};
use rten::Model;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::detection::orientation::Rotation;
use crate::models::{BoundingBox, OcrToken, TokenStream};

/// ocrs does not report per-word confidence, so every word it returns gets this score.
pub const OCRS_WORD_CONFIDENCE: u8 = 90;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error(
        "OCR models not found, expected:\n  - {}\n  - {}",
        detection.display(),
        recognition.display()
    )]
    ModelsMissing {
        detection: PathBuf,
        recognition: PathBuf,
    },
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("could not parse OCR engine output: {0}")]
    Parse(String),
    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page segmentation and language settings handed to the engine on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrMode {
    /// Tesseract-style page segmentation mode; 6 treats the image as one uniform block of text.
    pub page_segmentation: u8,
    pub language: String,
}

impl Default for OcrMode {
    fn default() -> Self {
        Self {
            page_segmentation: 6,
            language: "eng".to_string(),
        }
    }
}

/// Abstraction over an OCR engine.
pub trait OcrBackend: Send + Sync {
    /// Full recognized text, lines separated by `\n`.
    fn recognize_text(&self, image: &DynamicImage, mode: &OcrMode) -> Result<String, OcrError>;

    /// Word tokens in reading order.
    fn recognize_tokens(
        &self,
        image: &DynamicImage,
        mode: &OcrMode,
    ) -> Result<TokenStream, OcrError>;

    /// Clockwise rotation needed to make the text upright, if the engine can tell.
    fn detect_orientation(&self, _image: &DynamicImage) -> Result<Option<Rotation>, OcrError> {
        Ok(None)
    }

    fn name(&self) -> &str;
}

/// Default model location used by `ocrs-cli`.
pub fn default_model_dir() -> Result<PathBuf, OcrError> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| OcrError::Engine("neither HOME nor USERPROFILE is set".to_string()))?;
    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

/// Pure-Rust OCR through `ocrs`.
pub struct OcrsBackend {
    engine: OcrEngine,
}

impl OcrsBackend {
    /// Load `text-detection.rten` and `text-recognition.rten` from `model_dir`.
    #[instrument(level = "debug")]
    pub fn from_model_dir(model_dir: &Path) -> Result<Self, OcrError> {
        let detection_model_path = model_dir.join("text-detection.rten");
        let recognition_model_path = model_dir.join("text-recognition.rten");

        if !detection_model_path.exists() || !recognition_model_path.exists() {
            return Err(OcrError::ModelsMissing {
                detection: detection_model_path,
                recognition: recognition_model_path,
            });
        }

        let detection_model = Model::load_file(&detection_model_path)
            .map_err(|e| OcrError::Engine(format!("loading detection model: {e}")))?;
        let recognition_model = Model::load_file(&recognition_model_path)
            .map_err(|e| OcrError::Engine(format!("loading recognition model: {e}")))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| OcrError::Engine(e.to_string()))?;

        Ok(Self { engine })
    }

    fn prepare(&self, image: &DynamicImage) -> Result<ocrs::OcrInput, OcrError> {
        let img = image.to_rgb8();
        let img_source = ImageSource::from_bytes(img.as_raw(), img.dimensions())
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        self.engine
            .prepare_input(img_source)
            .map_err(|e| OcrError::Engine(e.to_string()))
    }

    fn log_mode(mode: &OcrMode) {
        // ocrs has a single Latin model and does its own layout analysis.
        if mode.language != "eng" {
            debug!(language = %mode.language, "ocrs ignores the requested language");
        }
    }
}

impl OcrBackend for OcrsBackend {
    #[instrument(level = "debug", skip(self, image))]
    fn recognize_text(&self, image: &DynamicImage, mode: &OcrMode) -> Result<String, OcrError> {
        Self::log_mode(mode);
        let ocr_input = self.prepare(image)?;
        self.engine
            .get_text(&ocr_input)
            .map_err(|e| OcrError::Engine(e.to_string()))
    }

    #[instrument(level = "debug", skip(self, image))]
    fn recognize_tokens(
        &self,
        image: &DynamicImage,
        mode: &OcrMode,
    ) -> Result<TokenStream, OcrError> {
        Self::log_mode(mode);
        let ocr_input = self.prepare(image)?;
        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| OcrError::Engine(e.to_string()))?;
        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);
        let lines = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| OcrError::Engine(e.to_string()))?;

        let mut tokens = Vec::new();
        for line in lines.iter().flatten() {
            for word in line.words() {
                let text = word.to_string();
                if text.trim().is_empty() {
                    continue;
                }
                let rect = word.bounding_rect();
                let bbox = BoundingBox {
                    x: (rect.left() as f32).max(0.0) as u32,
                    y: (rect.top() as f32).max(0.0) as u32,
                    width: (rect.width() as f32).max(0.0) as u32,
                    height: (rect.height() as f32).max(0.0) as u32,
                };
                tokens.push(OcrToken::new(text, OCRS_WORD_CONFIDENCE, bbox));
            }
        }
        debug!(count = tokens.len(), "ocrs tokens recognized");
        Ok(tokens)
    }

    fn name(&self) -> &str {
        "ocrs"
    }
}
