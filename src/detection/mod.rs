pub mod card;
pub mod contours;
pub mod geometry;
pub mod ocr;
pub mod orientation;
pub mod preprocessing;
pub mod steps;
pub mod tesseract;

pub use card::{CardOutline, CardRectifier, RectifiedCard};
pub use geometry::{order_points, rectify};
pub use ocr::{OcrBackend, OcrError, OcrMode, OcrsBackend};
pub use orientation::{detect_orientation, rotate, Rotation};
pub use tesseract::TesseractBackend;
