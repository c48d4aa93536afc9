use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use idcard_ocr::core::db::RecordDb;
use idcard_ocr::detection::ocr::{OcrBackend, OcrError, OcrMode};
use idcard_ocr::detection::Rotation;
use idcard_ocr::models::BoundingBox;
use idcard_ocr::{OcrToken, TokenStream};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::rect::Rect;

pub const BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);
pub const CARD_WHITE: Rgb<u8> = Rgb([250, 250, 250]);

/// Size of the back photo and the region the card occupies in it.
pub const BACK_PHOTO_SIZE: (u32, u32) = (400, 300);
pub const BACK_CARD: (i32, i32, u32, u32) = (50, 40, 300, 200);

/// The right half of the rectified back card (299x199 after rectification).
pub const BACK_ROI_SIZE: (u32, u32) = (150, 199);

/// Front photos are a different size so the scripted engine can tell them apart.
pub const FRONT_PHOTO_SIZE: (u32, u32) = (420, 300);

pub const FRONT_TEXT: &str = "Government of India\nSita Devi\nDOB: 12/03/1990\nFEMALE\n1234 5678 9012\n";
pub const BACK_TEXT: &str = "Unique Identification Authority of India\n\nAddress:\nW/O Ramesh, 12 Main Street\nBengaluru, Karnataka 560001\n1947 help@uidai\n";

/// A white card on a dark background.
pub fn card_photo(size: (u32, u32), card: (i32, i32, u32, u32)) -> DynamicImage {
    let mut img = RgbImage::from_pixel(size.0, size.1, BACKGROUND);
    let (x, y, w, h) = card;
    draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), CARD_WHITE);
    DynamicImage::ImageRgb8(img)
}

pub fn back_photo() -> DynamicImage {
    card_photo(BACK_PHOTO_SIZE, BACK_CARD)
}

pub fn front_photo() -> DynamicImage {
    card_photo(FRONT_PHOTO_SIZE, (40, 40, 340, 220))
}

/// A white card drawn as an arbitrary convex quadrilateral.
pub fn skewed_card_photo(size: (u32, u32), corners: [(i32, i32); 4]) -> DynamicImage {
    let mut img = RgbImage::from_pixel(size.0, size.1, BACKGROUND);
    let poly: Vec<imageproc::point::Point<i32>> = corners
        .iter()
        .map(|&(x, y)| imageproc::point::Point::new(x, y))
        .collect();
    draw_polygon_mut(&mut img, &poly, CARD_WHITE);
    DynamicImage::ImageRgb8(img)
}

/// A round white blob: its outline never simplifies to four corners.
pub fn disc_photo() -> DynamicImage {
    let mut img = RgbImage::from_pixel(400, 300, BACKGROUND);
    draw_filled_circle_mut(&mut img, (200, 150), 80, CARD_WHITE);
    DynamicImage::ImageRgb8(img)
}

/// No card-coloured pixels at all.
pub fn dark_photo() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 300, BACKGROUND))
}

pub fn token(text: &str, confidence: u8) -> OcrToken {
    OcrToken::new(text, confidence, BoundingBox::default())
}

/// Tokens whose only valid name pair is "Sita Devi".
pub fn front_tokens() -> TokenStream {
    vec![
        token("Government", 93),
        token("of", 95),
        token("India", 94),
        token("Sita", 91),
        token("Devi", 89),
        token("DOB:", 90),
        token("12/03/1990", 88),
        token("FEMALE", 92),
    ]
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    pub text: String,
    pub tokens: TokenStream,
}

/// An OCR engine that answers from a script keyed by input image size.
///
/// Unknown sizes read as blank.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    pages: HashMap<(u32, u32), ScriptedPage>,
    orientation: Option<Rotation>,
    fail_orientation: bool,
    failing_sizes: HashSet<(u32, u32)>,
    seen: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, size: (u32, u32), text: &str, tokens: TokenStream) -> Self {
        self.pages.insert(
            size,
            ScriptedPage {
                text: text.to_string(),
                tokens,
            },
        );
        self
    }

    pub fn with_orientation(mut self, rotation: Rotation) -> Self {
        self.orientation = Some(rotation);
        self
    }

    pub fn with_failing_orientation(mut self) -> Self {
        self.fail_orientation = true;
        self
    }

    /// Make text and token recognition fail for images of `size`.
    pub fn with_failing_page(mut self, size: (u32, u32)) -> Self {
        self.failing_sizes.insert(size);
        self
    }

    /// Sizes of every image passed to `recognize_text` or `recognize_tokens`.
    pub fn seen_sizes(&self) -> Vec<(u32, u32)> {
        self.seen.lock().expect("poisoned").clone()
    }

    fn page(&self, image: &DynamicImage) -> Result<ScriptedPage, OcrError> {
        let size = (image.width(), image.height());
        self.seen.lock().expect("poisoned").push(size);
        if self.failing_sizes.contains(&size) {
            return Err(OcrError::Engine("scripted recognition failure".to_string()));
        }
        Ok(self.pages.get(&size).cloned().unwrap_or_default())
    }
}

impl OcrBackend for ScriptedBackend {
    fn recognize_text(&self, image: &DynamicImage, _mode: &OcrMode) -> Result<String, OcrError> {
        Ok(self.page(image)?.text)
    }

    fn recognize_tokens(
        &self,
        image: &DynamicImage,
        _mode: &OcrMode,
    ) -> Result<TokenStream, OcrError> {
        Ok(self.page(image)?.tokens)
    }

    fn detect_orientation(&self, _image: &DynamicImage) -> Result<Option<Rotation>, OcrError> {
        if self.fail_orientation {
            return Err(OcrError::Engine("scripted orientation failure".to_string()));
        }
        Ok(self.orientation)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A backend scripted with the standard front and back pages.
pub fn card_backend() -> ScriptedBackend {
    ScriptedBackend::new()
        .with_page(FRONT_PHOTO_SIZE, FRONT_TEXT, front_tokens())
        .with_page(BACK_ROI_SIZE, BACK_TEXT, Vec::new())
}

/// Creates a RecordDb in a temporary directory.
/// Returns both the database and the temp directory (which must be kept alive).
pub async fn create_test_db() -> (RecordDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let db = RecordDb::open(dir.path().join("records.db"))
        .await
        .expect("Failed to create test database");
    (db, dir)
}
