use image::DynamicImage;
use std::sync::Arc;

use crate::detection::preprocessing::{self, BilateralParams};
use crate::error::ExtractError;
use crate::pipeline::PipelineContext;

/// A single image-to-image preprocessing transform.
pub trait ImageStep: Send + Sync {
    fn apply(&self, image: DynamicImage) -> DynamicImage;

    /// Human-readable name for this step (used in logs and debug file names)
    fn name(&self) -> &str;
}

/// Convert image to grayscale
pub struct GrayscaleStep;

impl ImageStep for GrayscaleStep {
    fn apply(&self, image: DynamicImage) -> DynamicImage {
        DynamicImage::ImageLuma8(preprocessing::to_grayscale(&image))
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Edge-preserving bilateral smoothing
pub struct BilateralSmoothStep {
    pub params: BilateralParams,
}

impl ImageStep for BilateralSmoothStep {
    fn apply(&self, image: DynamicImage) -> DynamicImage {
        let gray = image.to_luma8();
        DynamicImage::ImageLuma8(preprocessing::bilateral_smooth(&gray, &self.params))
    }

    fn name(&self) -> &str {
        "Bilateral Smoothing"
    }
}

/// Global Otsu binarization
pub struct OtsuBinarizeStep;

impl ImageStep for OtsuBinarizeStep {
    fn apply(&self, image: DynamicImage) -> DynamicImage {
        let gray = image.to_luma8();
        DynamicImage::ImageLuma8(preprocessing::binarize_otsu(&gray))
    }

    fn name(&self) -> &str {
        "Otsu Binarization"
    }
}

/// An ordered list of steps run back to back, dumping each intermediate
/// image into `stage` when debug output is enabled.
#[derive(Clone)]
pub struct StepChain {
    stage: &'static str,
    steps: Vec<Arc<dyn ImageStep>>,
}

impl StepChain {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            steps: Vec::new(),
        }
    }

    pub fn add_step(mut self, step: Arc<dyn ImageStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn run(
        &self,
        input: &DynamicImage,
        context: &PipelineContext,
        label: &str,
    ) -> Result<DynamicImage, ExtractError> {
        let mut image = input.clone();
        for (idx, step) in self.steps.iter().enumerate() {
            tracing::trace!(stage = self.stage, step = step.name(), "running step");
            image = step.apply(image);
            let file_stem = format!(
                "{}_{:02}_{}",
                label,
                idx + 1,
                step.name().to_lowercase().replace(" ", "_")
            );
            context.save_debug(self.stage, &file_stem, &image)?;
        }
        Ok(image)
    }
}

impl std::fmt::Debug for StepChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepChain")
            .field("stage", &self.stage)
            .field("steps", &self.step_names())
            .finish()
    }
}
