use std::path::PathBuf;

use crate::detection::ocr::{default_model_dir, OcrBackend, OcrError, OcrMode, OcrsBackend};
use crate::detection::tesseract::TesseractBackend;

/// Which OCR engine to run and where to find it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineConfig {
    /// Pure-Rust engine; needs `text-detection.rten` and `text-recognition.rten`.
    Ocrs { model_dir: PathBuf },
    /// External `tesseract` binary.
    Tesseract { command: PathBuf },
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::Ocrs {
            model_dir: default_model_dir().unwrap_or_else(|_| PathBuf::from(".cache/ocrs")),
        }
    }
}

impl EngineConfig {
    pub fn build_backend(&self) -> Result<Box<dyn OcrBackend>, OcrError> {
        match self {
            EngineConfig::Ocrs { model_dir } => Ok(Box::new(OcrsBackend::from_model_dir(model_dir)?)),
            EngineConfig::Tesseract { command } => Ok(Box::new(TesseractBackend::new(command.clone()))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub ocr: OcrMode,
    pub engine: EngineConfig,
    /// Dump intermediate images here; must be empty or absent.
    pub debug_dir: Option<PathBuf>,
}
