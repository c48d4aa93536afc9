use image::DynamicImage;
use tracing::{debug, warn};

use crate::detection::ocr::OcrBackend;

/// Clockwise quarter-turn rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl Rotation {
    /// Accepts any multiple of 90; other angles have no quarter-turn equivalent.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Clockwise90),
            180 => Some(Rotation::Clockwise180),
            270 => Some(Rotation::Clockwise270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }
}

/// Ask the engine which way the text in `image` faces.
///
/// Orientation is a refinement, so an engine error or an unknown result
/// both mean "leave it as is".
pub fn detect_orientation(backend: &dyn OcrBackend, image: &DynamicImage) -> Rotation {
    match backend.detect_orientation(image) {
        Ok(Some(rotation)) => rotation,
        Ok(None) => {
            debug!(engine = backend.name(), "orientation unknown, assuming upright");
            Rotation::None
        }
        Err(e) => {
            warn!(engine = backend.name(), error = %e, "orientation detection failed, assuming upright");
            Rotation::None
        }
    }
}

/// Rotate `image` clockwise.
pub fn rotate(image: &DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => image.clone(),
        Rotation::Clockwise90 => image.rotate90(),
        Rotation::Clockwise180 => image.rotate180(),
        Rotation::Clockwise270 => image.rotate270(),
    }
}
