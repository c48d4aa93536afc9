use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::decode::open_image;
use crate::detection::ocr::{OcrBackend, OcrMode};
use crate::error::ExtractError;
use crate::fields::address::AddressExtractor;
use crate::fields::classify::{classify, Candidate, Classification};
use crate::fields::front::FrontFieldExtractor;
use crate::models::{AddressFields, FieldRecord};

/// Debug output directories, numbered in the order the stages run.
pub mod stage {
    pub const INPUT: &str = "00_input";
    pub const GENERAL_PASS: &str = "01_general_pass";
    pub const NUMBER_PASS: &str = "02_number_pass";
    pub const CARD_MASK: &str = "03_card_mask";
    pub const CARD_RECTIFIED: &str = "04_card_rectified";
    pub const BACK_ROI: &str = "05_back_roi";
    pub const BACK_UPRIGHT: &str = "06_back_upright";
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Context available to every extraction stage
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub mode: OcrMode,
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    pub fn new(mode: OcrMode) -> Self {
        Self { mode, debug: None }
    }

    /// Write `image` to `<output_dir>/<stage>/<label>.png` when debug mode is on.
    pub fn save_debug(
        &self,
        stage: &str,
        label: &str,
        image: &DynamicImage,
    ) -> Result<(), ExtractError> {
        let Some(debug_config) = self.debug.as_ref().filter(|d| d.enabled) else {
            return Ok(());
        };

        let stage_dir = debug_config.output_dir.join(stage);
        std::fs::create_dir_all(&stage_dir)?;

        let output_path = stage_dir.join(format!("{label}.png"));
        image
            .save(&output_path)
            .map_err(|source| ExtractError::DebugOutput {
                path: output_path.clone(),
                source,
            })?;
        debug!("debug: saved {}/{}.png", stage, label);
        Ok(())
    }
}

/// Turns a pair of card photos into one [`FieldRecord`].
///
/// Holds no mutable state, so one pipeline can serve concurrent callers.
pub struct Pipeline {
    backend: Box<dyn OcrBackend>,
    context: PipelineContext,
    front: FrontFieldExtractor,
    back: AddressExtractor,
}

impl Pipeline {
    /// Pipeline with default extractors around an already built engine.
    pub fn with_backend(backend: Box<dyn OcrBackend>, mode: OcrMode) -> Self {
        Self {
            backend,
            context: PipelineContext::new(mode),
            front: FrontFieldExtractor::default(),
            back: AddressExtractor::default(),
        }
    }

    /// Build the engine named in `config` and wrap it.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ExtractError> {
        let backend = config.engine.build_backend()?;
        info!(engine = backend.name(), "OCR engine ready");
        let pipeline = Self::with_backend(backend, config.ocr);
        match config.debug_dir {
            Some(dir) => pipeline.with_debug(dir),
            None => Ok(pipeline),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self, ExtractError> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(ExtractError::DebugDirNotEmpty(output_dir));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });

        Ok(self)
    }

    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }

    /// Front-face fields of a single image.
    pub fn extract_front(&self, image: &DynamicImage) -> Result<FieldRecord, ExtractError> {
        self.front.extract(image, self.backend(), &self.context, "front")
    }

    /// Address block of a single back-face image.
    pub fn extract_back(&self, image: &DynamicImage) -> Result<AddressFields, ExtractError> {
        self.back.extract(image, self.backend(), &self.context, "back")
    }

    /// Decide which of two images is the front.
    #[instrument(level = "debug", skip_all)]
    pub fn classify<'a>(
        &self,
        first: &'a DynamicImage,
        second: &'a DynamicImage,
    ) -> Result<Classification<&'a DynamicImage>, ExtractError> {
        self.context.save_debug(stage::INPUT, "first", first)?;
        self.context.save_debug(stage::INPUT, "second", second)?;

        let first = Candidate {
            source: first,
            fields: self
                .front
                .extract(first, self.backend(), &self.context, "first")?,
        };
        let second = Candidate {
            source: second,
            fields: self
                .front
                .extract(second, self.backend(), &self.context, "second")?,
        };
        let front_label = if first.fields.gender.is_some() { "first" } else { "second" };
        let outcome = classify(first, second);
        match &outcome {
            Classification::Resolved { .. } => info!(front = front_label, "front face identified"),
            Classification::Ambiguous(reason) => info!(%reason, "front face not identified"),
        }
        Ok(outcome)
    }

    /// Full extraction for an unordered image pair.
    #[instrument(skip_all)]
    pub fn extract(
        &self,
        first: &DynamicImage,
        second: &DynamicImage,
    ) -> Result<FieldRecord, ExtractError> {
        let (front, back) = match self.classify(first, second)? {
            Classification::Resolved { front, back } => (front, back),
            Classification::Ambiguous(reason) => {
                return Err(ExtractError::FrontBackUndetermined(reason));
            }
        };

        // Only classification aborts a pair; a failed back face leaves the address absent.
        let address = match self.extract_back(back.source) {
            Ok(address) => address,
            Err(e @ ExtractError::DebugOutput { .. }) => return Err(e),
            Err(ExtractError::CardNotFound) => {
                warn!("no card found on the back image, address left empty");
                AddressFields::default()
            }
            Err(e) => {
                warn!(error = %e, "address extraction failed, address left empty");
                AddressFields::default()
            }
        };

        Ok(front.fields.with_address(address))
    }

    /// [`Pipeline::extract`] on two image files.
    pub fn extract_files(&self, first: &Path, second: &Path) -> Result<FieldRecord, ExtractError> {
        let first = open_image(first)?;
        let second = open_image(second)?;
        self.extract(&first, &second)
    }
}
