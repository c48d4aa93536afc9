use std::sync::OnceLock;

use image::DynamicImage;
use regex::Regex;
use tracing::{debug, instrument};

use crate::detection::card::CardRectifier;
use crate::detection::ocr::OcrBackend;
use crate::detection::orientation::{detect_orientation, rotate};
use crate::detection::preprocessing::to_grayscale;
use crate::error::ExtractError;
use crate::models::AddressFields;
use crate::pipeline::{stage, PipelineContext};

fn re_pincode() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\b\d{6}\b").expect("invalid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Seeking,
    Capturing,
}

/// Collect the lines after the `Address` label up to the first line
/// carrying a six-digit postal code.
///
/// Blank lines are ignored and the label line is dropped. Text before the
/// code on its own line (usually the city) is kept as the last piece of the
/// address; anything after it, such as a trailing country name, is not.
pub fn parse_address(text: &str) -> AddressFields {
    let mut state = ParseState::Seeking;
    let mut lines: Vec<String> = Vec::new();
    let mut pincode = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        match state {
            ParseState::Seeking => {
                if line.to_lowercase().contains("address") {
                    state = ParseState::Capturing;
                }
            }
            ParseState::Capturing => {
                if let Some(code) = re_pincode().find(line) {
                    pincode = Some(code.as_str().to_string());
                    let prefix = line[..code.start()]
                        .trim_matches(|c: char| c.is_whitespace() || c == ',' || c == '-');
                    if !prefix.is_empty() {
                        lines.push(prefix.to_string());
                    }
                    break;
                }
                lines.push(line.to_string());
            }
        }
    }

    let address = lines.join(" ").trim().to_string();
    AddressFields {
        address: (!address.is_empty()).then_some(address),
        pincode,
    }
}

/// The half of a rectified back face that holds the English address:
/// the right half of a landscape card, the bottom half of a portrait one.
pub fn region_of_interest(card: &DynamicImage) -> DynamicImage {
    let (width, height) = (card.width(), card.height());
    if width >= height {
        let left = width / 2;
        card.crop_imm(left, 0, width - left, height)
    } else {
        let top = height / 2;
        card.crop_imm(0, top, width, height - top)
    }
}

/// Reads the address block off a back-face photo.
#[derive(Debug, Clone, Default)]
pub struct AddressExtractor {
    pub rectifier: CardRectifier,
}

impl AddressExtractor {
    #[instrument(level = "debug", skip(self, image, backend, context))]
    pub fn extract(
        &self,
        image: &DynamicImage,
        backend: &dyn OcrBackend,
        context: &PipelineContext,
        label: &str,
    ) -> Result<AddressFields, ExtractError> {
        let card = self.rectifier.rectify(image, context, label)?;

        let roi = region_of_interest(&card.image);
        context.save_debug(stage::BACK_ROI, label, &roi)?;

        let rotation = detect_orientation(backend, &roi);
        let upright = rotate(&roi, rotation);
        debug!(degrees = rotation.degrees(), "address region rotated upright");
        context.save_debug(stage::BACK_UPRIGHT, label, &upright)?;

        let gray = DynamicImage::ImageLuma8(to_grayscale(&upright));
        let text = backend.recognize_text(&gray, &context.mode)?;
        let fields = parse_address(&text);
        debug!(?fields, "address parsed");
        Ok(fields)
    }
}
